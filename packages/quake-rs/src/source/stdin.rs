use super::{LineReader, RawLine, SampleSource};
use crate::error::{QuakeError, Result};
use async_trait::async_trait;
use tokio::io::Stdin;

/// Reads samples piped into the process
pub struct StdinSource {
    reader: Option<LineReader<Stdin>>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self { reader: None }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleSource for StdinSource {
    async fn open(&mut self) -> Result<()> {
        if self.reader.is_none() {
            self.reader = Some(LineReader::new(tokio::io::stdin()));
        }
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<RawLine>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| QuakeError::Transport("stdin source is not open".to_string()))?;

        reader
            .next_line()
            .await
            .map_err(|e| QuakeError::Transport(format!("stdin read failed: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        self.reader = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "stdin".to_string()
    }
}
