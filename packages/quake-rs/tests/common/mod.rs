#![allow(dead_code)]

use async_trait::async_trait;
use quake_rs::{AlertId, AlertService, EarthquakeReport, QuakeError, RawLine, Result, SampleSource};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// One scripted stream event
#[derive(Debug, Clone)]
pub enum Script {
    /// Deliver `text` this long after the previous event
    Line(Duration, String),
    /// Fail one read with a transport error
    Fail,
    /// Never deliver anything again
    Hold,
    /// End of stream
    End,
}

pub fn line(after_ms: u64, text: &str) -> Script {
    Script::Line(Duration::from_millis(after_ms), text.to_string())
}

/// Deterministic source for paused-clock tests
pub struct ScriptedSource {
    script: VecDeque<Script>,
    current: Option<(Instant, Vec<u8>)>,
    fail_open: bool,
    cancel_on_close: Option<CancellationToken>,
    pub opened: Arc<AtomicBool>,
    pub closed: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: script.into(),
            current: None,
            fail_open: false,
            cancel_on_close: None,
            opened: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }

    /// Fire `token` when the detector releases the stream, i.e. right
    /// after ingestion ends and before reporting starts
    pub fn cancel_on_close(mut self, token: CancellationToken) -> Self {
        self.cancel_on_close = Some(token);
        self
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    async fn open(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(QuakeError::SourceOpen("no such device".to_string()));
        }
        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<RawLine>> {
        if self.current.is_none() {
            match self.script.pop_front() {
                Some(Script::Line(after, text)) => {
                    self.current = Some((Instant::now() + after, text.into_bytes()));
                }
                Some(Script::Fail) => {
                    return Err(QuakeError::Transport("device reset".to_string()));
                }
                Some(Script::Hold) => {
                    self.script.push_front(Script::Hold);
                    std::future::pending::<()>().await;
                }
                Some(Script::End) | None => return Ok(None),
            }
        }

        // Due time is kept across dropped calls so timeouts don't reset it
        if let Some((due, _)) = &self.current {
            sleep_until(*due).await;
        }

        Ok(self.current.take().map(|(_, bytes)| RawLine::new(bytes)))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_close {
            token.cancel();
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// In-memory alerting service that records every call
#[derive(Default)]
pub struct RecordingAlerts {
    pub fail_submit: bool,
    pub calls: Mutex<Vec<String>>,
    pub reports: Mutex<Vec<EarthquakeReport>>,
}

impl RecordingAlerts {
    pub fn failing() -> Self {
        Self {
            fail_submit: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertService for RecordingAlerts {
    async fn submit(&self, report: &EarthquakeReport) -> Result<AlertId> {
        self.calls.lock().unwrap().push("submit".to_string());
        self.reports.lock().unwrap().push(report.clone());
        if self.fail_submit {
            return Err(QuakeError::Protocol("alert creation returned 500".to_string()));
        }
        Ok(AlertId(7))
    }

    async fn deactivate(&self, id: AlertId) -> Result<()> {
        self.calls.lock().unwrap().push(format!("deactivate {}", id));
        Ok(())
    }
}

pub fn shared(alerts: RecordingAlerts) -> Arc<RecordingAlerts> {
    Arc::new(alerts)
}
