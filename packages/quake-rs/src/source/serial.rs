// Serial port sample source (Unix-only)
//
// Reads newline-delimited `x,y,z` text from an accelerometer board
// (e.g. /dev/ttyACM0 at 9600 baud). Boards that reset on connect need a short
// settle delay before their first line is meaningful.

use super::{LineReader, RawLine, SampleSource};
use crate::error::{QuakeError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

pub struct SerialSource {
    port: String,
    baud_rate: u32,
    settle: Duration,
    reader: Option<LineReader<SerialStream>>,
}

impl SerialSource {
    pub fn new(port: String, baud_rate: u32, settle: Duration) -> Self {
        Self {
            port,
            baud_rate,
            settle,
            reader: None,
        }
    }
}

#[async_trait]
impl SampleSource for SerialSource {
    async fn open(&mut self) -> Result<()> {
        if self.reader.is_some() {
            return Ok(());
        }

        log::info!("Opening serial port: {} at {} baud", self.port, self.baud_rate);

        let stream = tokio_serial::new(&self.port, self.baud_rate)
            .open_native_async()
            .map_err(|e| QuakeError::SourceOpen(format!("{}: {}", self.port, e)))?;

        self.reader = Some(LineReader::new(stream));
        log::info!("Connected to {} at {} baud", self.port, self.baud_rate);

        if !self.settle.is_zero() {
            log::debug!("Waiting {:?} for the serial link to settle", self.settle);
            tokio::time::sleep(self.settle).await;
        }

        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<RawLine>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| QuakeError::Transport("serial port is not open".to_string()))?;

        match reader.next_line().await {
            Ok(Some(line)) => Ok(Some(line)),
            Ok(None) => {
                log::warn!("Serial port closed unexpectedly");
                Ok(None)
            }
            Err(e) => Err(QuakeError::Transport(format!("serial read failed: {}", e))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.reader.take().is_some() {
            log::info!("Serial port {} closed", self.port);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("serial://{}@{}", self.port, self.baud_rate)
    }
}
