// File-based source that replays a recorded stream
//
// Useful for:
// - Exercising the detector without hardware attached
// - Re-running a captured event with different thresholds
//
// With `line_delay` set, lines are released no faster than one per delay so
// the wall-clock capture window sees a realistic arrival rate.

use super::{LineReader, RawLine, SampleSource};
use crate::error::{QuakeError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::File;
use tokio::time::{sleep_until, Instant};

pub struct FileSource {
    path: PathBuf,
    line_delay: Option<Duration>,
    reader: Option<LineReader<File>>,
    next_due: Option<Instant>,
    lines_served: u64,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, line_delay: Option<Duration>) -> Self {
        Self {
            path: path.into(),
            line_delay,
            reader: None,
            next_due: None,
            lines_served: 0,
        }
    }
}

#[async_trait]
impl SampleSource for FileSource {
    async fn open(&mut self) -> Result<()> {
        if self.reader.is_some() {
            return Ok(());
        }

        let file = File::open(&self.path)
            .await
            .map_err(|e| QuakeError::SourceOpen(format!("{}: {}", self.path.display(), e)))?;

        self.reader = Some(LineReader::new(file));
        self.lines_served = 0;
        self.next_due = None;

        log::info!(
            "Replaying {} (line delay: {:?})",
            self.path.display(),
            self.line_delay
        );
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<RawLine>> {
        // The due time is stored rather than a fresh sleep per call, so a
        // read interrupted by a timeout resumes the same wait.
        if let Some(due) = self.next_due {
            sleep_until(due).await;
        }

        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| QuakeError::Transport("file source is not open".to_string()))?;

        let line = reader
            .next_line()
            .await
            .map_err(|e| QuakeError::Transport(format!("file read failed: {}", e)))?;

        match line {
            Some(line) => {
                self.lines_served += 1;
                self.next_due = self.line_delay.map(|d| Instant::now() + d);
                Ok(Some(line))
            }
            None => {
                log::info!(
                    "Reached end of {} after {} lines",
                    self.path.display(),
                    self.lines_served
                );
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.reader = None;
        self.next_due = None;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}
