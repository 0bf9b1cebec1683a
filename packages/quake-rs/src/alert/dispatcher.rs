use super::{AlertId, AlertService, EarthquakeReport};
use crate::config::AlertLifecycle;
use crate::error::{QuakeError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Progress of one published report
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    Submitted { alert_id: AlertId },
    SubmitFailed { error: String },
    Deactivated { alert_id: AlertId },
    DeactivateFailed { alert_id: AlertId, error: String },
    Cancelled,
}

struct DispatchJob {
    report: EarthquakeReport,
    events: mpsc::Sender<DispatchEvent>,
}

/// Background worker that submits reports and later deactivates them.
///
/// Detection publishes a finished report and keeps going; network latency
/// and the post-submit delay are absorbed here. Jobs run one at a time in
/// publish order. Failures are reported as events and never retried.
pub struct AlertDispatcher {
    submit_tx: mpsc::Sender<DispatchJob>,
    worker: JoinHandle<()>,
}

impl AlertDispatcher {
    pub fn spawn(
        service: Arc<dyn AlertService>,
        lifecycle: AlertLifecycle,
        deactivate_after: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (submit_tx, mut submit_rx) = mpsc::channel::<DispatchJob>(16);

        let worker = tokio::spawn(async move {
            loop {
                let job = tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        log::info!("Alert dispatcher cancelled");
                        // Queued jobs still get an answer
                        submit_rx.close();
                        while let Some(job) = submit_rx.recv().await {
                            let _ = job.events.send(DispatchEvent::Cancelled).await;
                        }
                        break;
                    }

                    job = submit_rx.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };

                process_job(service.as_ref(), lifecycle, deactivate_after, &cancel, job).await;
            }
            log::debug!("Alert dispatcher stopped");
        });

        Self { submit_tx, worker }
    }

    /// Queue a report. The returned receiver yields the job's events and
    /// closes once the job is finished.
    pub async fn publish(&self, report: EarthquakeReport) -> Result<mpsc::Receiver<DispatchEvent>> {
        let (events, rx) = mpsc::channel(4);
        self.submit_tx
            .send(DispatchJob { report, events })
            .await
            .map_err(|_| QuakeError::ChannelClosed)?;
        Ok(rx)
    }

    /// Stop accepting jobs and wait for queued ones to finish
    pub async fn shutdown(self) {
        drop(self.submit_tx);
        if let Err(e) = self.worker.await {
            log::warn!("Alert dispatcher task failed: {}", e);
        }
    }
}

async fn process_job(
    service: &dyn AlertService,
    lifecycle: AlertLifecycle,
    deactivate_after: Duration,
    cancel: &CancellationToken,
    job: DispatchJob,
) {
    let DispatchJob { report, events } = job;
    let emit = |event: DispatchEvent| {
        let events = events.clone();
        async move {
            // Receiver may already be gone; the job still runs to completion.
            let _ = events.send(event).await;
        }
    };

    let submitted = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            emit(DispatchEvent::Cancelled).await;
            return;
        }
        result = service.submit(&report) => result,
    };

    let alert_id = match submitted {
        Ok(id) => {
            log::info!("Alert {} created", id);
            emit(DispatchEvent::Submitted { alert_id: id }).await;
            id
        }
        Err(e) => {
            log::error!("Failed to submit alert: {}", e);
            emit(DispatchEvent::SubmitFailed { error: e.to_string() }).await;
            return;
        }
    };

    if lifecycle != AlertLifecycle::Full {
        return;
    }

    log::info!(
        "Waiting {:.1}s before marking alert {} inactive",
        deactivate_after.as_secs_f64(),
        alert_id
    );

    let deactivated = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            emit(DispatchEvent::Cancelled).await;
            return;
        }
        result = async {
            tokio::time::sleep(deactivate_after).await;
            service.deactivate(alert_id).await
        } => result,
    };

    match deactivated {
        Ok(()) => {
            log::info!("Alert {} marked inactive", alert_id);
            emit(DispatchEvent::Deactivated { alert_id }).await;
        }
        Err(e) => {
            log::error!("Failed to deactivate alert {}: {}", alert_id, e);
            emit(DispatchEvent::DeactivateFailed {
                alert_id,
                error: e.to_string(),
            })
            .await;
        }
    }
}
