// Pluggable sample sources
//
// The detector only needs newline-delimited text with a receive timestamp per
// line. Every transport implements `SampleSource`; a new one is added by:
// 1. Implementing the SampleSource trait
// 2. Adding a variant to SourceConfig
// 3. Constructing it in `create_source`
//
// Current implementations:
// - Serial: accelerometer attached over a serial link (e.g. Arduino on /dev/ttyACM0)
// - File: replay of a recorded stream, optionally paced line by line
// - TCP: newline-delimited stream from a network bridge
// - Stdin: piped input

mod file;
mod lines;
mod stdin;
mod tcp;

#[cfg(target_family = "unix")]
mod serial;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

pub use file::FileSource;
pub use lines::LineReader;
pub use stdin::StdinSource;
pub use tcp::TcpSource;

#[cfg(target_family = "unix")]
pub use serial::SerialSource;

/// One raw line as received, without its terminator
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub bytes: Vec<u8>,
    pub received_at: Instant,
}

impl RawLine {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            received_at: Instant::now(),
        }
    }
}

/// Source configuration, tagged for JSON config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceConfig {
    /// Serial port (e.g. /dev/ttyACM0)
    #[cfg(target_family = "unix")]
    #[serde(rename = "serial")]
    Serial {
        port: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        /// Wait after opening before the first read, letting the device reset
        #[serde(default = "default_settle_secs")]
        settle_secs: f64,
    },

    /// Recorded stream replayed from disk
    #[serde(rename = "file")]
    File {
        path: String,
        /// Delay between lines in milliseconds (simulates real time)
        #[serde(default)]
        line_delay_ms: Option<u64>,
    },

    /// TCP client connection
    #[serde(rename = "tcp")]
    Tcp { host: String, port: u16 },

    /// Standard input
    #[serde(rename = "stdin")]
    Stdin,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_settle_secs() -> f64 {
    2.0
}

/// A lazily opened, unbounded stream of raw lines.
///
/// `read_line` must be cancel safe: the detector wraps every call in a
/// timeout and a cancellation select, and a dropped call must not lose bytes
/// already received.
#[async_trait]
pub trait SampleSource: Send {
    /// Open the underlying transport. Failure here aborts the run.
    async fn open(&mut self) -> Result<()>;

    /// Next line, or `Ok(None)` once the stream has ended.
    async fn read_line(&mut self) -> Result<Option<RawLine>>;

    /// Release the transport. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Construct a source from configuration
pub fn create_source(config: SourceConfig) -> Box<dyn SampleSource> {
    match config {
        #[cfg(target_family = "unix")]
        SourceConfig::Serial {
            port,
            baud_rate,
            settle_secs,
        } => Box::new(SerialSource::new(
            port,
            baud_rate,
            crate::config::secs_to_duration(settle_secs),
        )),

        SourceConfig::File { path, line_delay_ms } => Box::new(FileSource::new(
            path,
            line_delay_ms.map(std::time::Duration::from_millis),
        )),

        SourceConfig::Tcp { host, port } => Box::new(TcpSource::new(host, port)),

        SourceConfig::Stdin => Box::new(StdinSource::new()),
    }
}
