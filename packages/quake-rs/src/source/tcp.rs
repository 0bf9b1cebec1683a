// TCP sample source
//
// Connects to a bridge that forwards the sensor's newline-delimited text
// (e.g. `socat` in front of a remote serial port).

use super::{LineReader, RawLine, SampleSource};
use crate::error::{QuakeError, Result};
use async_trait::async_trait;
use tokio::net::TcpStream;

pub struct TcpSource {
    host: String,
    port: u16,
    reader: Option<LineReader<TcpStream>>,
}

impl TcpSource {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            reader: None,
        }
    }
}

#[async_trait]
impl SampleSource for TcpSource {
    async fn open(&mut self) -> Result<()> {
        if self.reader.is_some() {
            return Ok(());
        }

        let addr = format!("{}:{}", self.host, self.port);
        log::info!("Connecting to TCP: {}", addr);

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| QuakeError::SourceOpen(format!("TCP connection to {} failed: {}", addr, e)))?;

        self.reader = Some(LineReader::new(stream));
        log::info!("TCP connected successfully");
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<RawLine>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| QuakeError::Transport("TCP source is not connected".to_string()))?;

        match reader.next_line().await {
            Ok(Some(line)) => Ok(Some(line)),
            Ok(None) => {
                log::info!("TCP connection closed by peer");
                Ok(None)
            }
            Err(e) => Err(QuakeError::Transport(format!("TCP read failed: {}", e))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.reader = None;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}
