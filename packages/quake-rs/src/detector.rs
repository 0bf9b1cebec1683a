use crate::alert::{AlertDispatcher, AlertId, AlertService, DispatchEvent, EarthquakeReport};
use crate::config::{AlertConfig, AlertLifecycle, DetectorConfig};
use crate::detection::{
    epicentral_distance_km, Calibrator, DeviationMonitor, PeakCapture, SWaveDetector, SWaveOutcome,
};
use crate::error::{QuakeError, Result};
use crate::parser::{parse_line, ParseOutcome, SkipReason};
use crate::source::SampleSource;
use crate::types::{CalibrationBaseline, Phase, Sample, WaveEvent};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why the run reached `Done`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Calibration, P-wave and S-wave were all captured
    Completed,
    /// Cooperative cancellation while in `phase`
    Interrupted { phase: Phase },
    /// The stream ended or failed irrecoverably while in `phase`
    StreamEnded { phase: Phase },
    /// The optional S-wave time limit elapsed
    SWaveTimedOut,
}

/// Counters collected while reading the stream
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub lines_read: u64,
    pub samples_accepted: u64,
    pub lines_skipped: u64,
    pub transport_errors: u64,
    pub discarded_while_buffering: u64,
}

/// What happened to the report once handed to the alerting service
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertOutcome {
    pub alert_id: Option<AlertId>,
    pub deactivated: bool,
    pub cancelled: bool,
    pub errors: Vec<String>,
}

/// Everything a finished run produced, including partial results
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRun {
    pub run_id: String,
    pub baseline: Option<CalibrationBaseline>,
    pub p_wave: Option<WaveEvent>,
    pub s_wave: Option<WaveEvent>,
    pub time_delta_secs: Option<f64>,
    pub distance_km: Option<f64>,
    pub report: Option<EarthquakeReport>,
    pub alert: Option<AlertOutcome>,
    pub termination: Termination,
    pub phases: Vec<Phase>,
    pub stats: RunStats,
}

impl DetectionRun {
    fn new(run_id: String) -> Self {
        Self {
            run_id,
            baseline: None,
            p_wave: None,
            s_wave: None,
            time_delta_secs: None,
            distance_km: None,
            report: None,
            alert: None,
            termination: Termination::Interrupted { phase: Phase::Idle },
            phases: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Baseline, P-wave and S-wave are all present
    pub fn is_complete(&self) -> bool {
        self.baseline.is_some() && self.p_wave.is_some() && self.s_wave.is_some()
    }
}

/// Result of one bounded read from the stream
enum Step {
    Sample(Sample),
    DeadlineReached,
    StreamEnded,
    Cancelled,
}

/// Single-event P/S-wave detector.
///
/// Drives `Idle → Calibrating → Buffering → Monitoring → CapturingP →
/// WaitingS → Reporting → Deactivating → Done`. `run` consumes the detector;
/// `Done` is terminal and a new detector is needed for another event.
pub struct Detector {
    config: DetectorConfig,
    alerts: Option<Arc<dyn AlertService>>,
    cancel: CancellationToken,
    run_id: String,
    phases: Vec<Phase>,
    stats: RunStats,
    consecutive_transport_errors: u32,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            alerts: None,
            cancel: CancellationToken::new(),
            run_id: Uuid::new_v4().to_string(),
            phases: vec![Phase::Idle],
            stats: RunStats::default(),
            consecutive_transport_errors: 0,
        })
    }

    /// Report detected events to `service`
    pub fn with_alert_service(mut self, service: Arc<dyn AlertService>) -> Self {
        self.alerts = Some(service);
        self
    }

    /// Use an externally owned token for cancellation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run one detection cycle against `source`.
    ///
    /// The source is closed on every exit path. Returns `Err` only when the
    /// source cannot be opened or the stream ends before calibration; all
    /// other endings (interruption, stream loss, S-wave timeout) come back as
    /// a [`DetectionRun`] carrying whatever was captured.
    pub async fn run<S: SampleSource + ?Sized>(mut self, source: &mut S) -> Result<DetectionRun> {
        let mut run = DetectionRun::new(self.run_id.clone());
        log::info!("Run {} starting on {}", self.run_id, source.describe());

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = source.open() => Some(result),
        };

        match opened {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                log::error!("Failed to open {}: {}", source.describe(), e);
                self.release(source).await;
                return Err(e);
            }
            None => {
                log::info!("Run {} interrupted before the stream opened", self.run_id);
                self.release(source).await;
                return Ok(self.finish(run));
            }
        }

        let alert_config = self.config.alert.clone().unwrap_or_default();
        let dispatcher = self.alerts.clone().map(|service| {
            AlertDispatcher::spawn(
                service,
                alert_config.lifecycle,
                alert_config.deactivate_after(),
                self.cancel.clone(),
            )
        });

        let detected = self.detect(source, &mut run).await;

        // Ingestion is over either way; release the stream before any
        // network work starts.
        self.release(source).await;

        match detected {
            Ok(termination) => run.termination = termination,
            Err(e) => {
                self.enter(Phase::Done);
                if let Some(dispatcher) = dispatcher {
                    dispatcher.shutdown().await;
                }
                return Err(e);
            }
        }

        if run.termination == Termination::Completed {
            self.report(&mut run, &alert_config, dispatcher.as_ref()).await;
        }

        if let Some(dispatcher) = dispatcher {
            dispatcher.shutdown().await;
        }

        Ok(self.finish(run))
    }

    async fn detect<S: SampleSource + ?Sized>(
        &mut self,
        source: &mut S,
        run: &mut DetectionRun,
    ) -> Result<Termination> {
        // Calibrating
        self.enter(Phase::Calibrating);
        let mut calibrator = Calibrator::new(self.config.calibration_index);
        let baseline = loop {
            match self.next_sample(source, None).await {
                Step::Sample(sample) => {
                    if let Some(baseline) = calibrator.offer(&sample) {
                        break baseline;
                    }
                }
                Step::DeadlineReached => continue,
                Step::StreamEnded => {
                    log::error!(
                        "Stream ended after {} of {} calibration samples",
                        calibrator.accepted(),
                        calibrator.required()
                    );
                    return Err(QuakeError::CalibrationIncomplete {
                        accepted: calibrator.accepted(),
                        required: calibrator.required(),
                    });
                }
                Step::Cancelled => return Ok(self.interrupted()),
            }
        };
        run.baseline = Some(baseline);
        log::info!(
            "Calibration data captured: ({}, {}, {})",
            baseline.x0,
            baseline.y0,
            baseline.z0
        );

        // Buffering
        self.enter(Phase::Buffering);
        log::info!(
            "Entering buffer period for {:.1} seconds",
            self.config.buffer_time().as_secs_f64()
        );
        let settle_until = Instant::now().checked_add(self.config.buffer_time());
        loop {
            match self.next_sample(source, settle_until).await {
                Step::Sample(_) => self.stats.discarded_while_buffering += 1,
                Step::DeadlineReached => break,
                Step::StreamEnded => return Ok(self.stream_ended()),
                Step::Cancelled => return Ok(self.interrupted()),
            }
        }

        // Monitoring
        self.enter(Phase::Monitoring);
        log::info!("Calibration period complete. Monitoring for shaking");
        let monitor = DeviationMonitor::new(baseline, self.config.threshold);
        let onset = loop {
            match self.next_sample(source, None).await {
                Step::Sample(sample) => {
                    if let Some(deviation) = monitor.check(&sample) {
                        log::info!(
                            "P-wave detected (dx={:.4}, dy={:.4}, dz={:.4})",
                            deviation.dx,
                            deviation.dy,
                            deviation.dz
                        );
                        break sample;
                    }
                }
                Step::DeadlineReached => continue,
                Step::StreamEnded => return Ok(self.stream_ended()),
                Step::Cancelled => return Ok(self.interrupted()),
            }
        };

        // CapturingP
        self.enter(Phase::CapturingP);
        log::info!(
            "Starting capture period ({:.1} seconds)",
            self.config.capture_duration().as_secs_f64()
        );
        let mut capture = PeakCapture::start(baseline, onset.observed_at, self.config.capture_duration());
        let mut carried = None;
        loop {
            match self.next_sample(source, capture.deadline()).await {
                Step::Sample(sample) if capture.contains(sample.observed_at) => capture.observe(&sample),
                Step::Sample(sample) => {
                    carried = Some(sample);
                    break;
                }
                Step::DeadlineReached => break,
                Step::StreamEnded => return Ok(self.stream_ended()),
                Step::Cancelled => return Ok(self.interrupted()),
            }
        }
        log::debug!("Capture window closed after {} samples", capture.samples_observed());
        let p_wave = capture.finish();
        run.p_wave = Some(p_wave);
        log::info!("P wave captured: {}", p_wave.amplitude);

        // WaitingS
        self.enter(Phase::WaitingS);
        let s_detector = SWaveDetector::new(baseline, &p_wave);
        let outcome = match carried.and_then(|sample| s_detector.check(&sample)) {
            Some(event) => SWaveOutcome::Detected(event),
            None => match self.wait_for_s_wave(source, &s_detector).await {
                Some(outcome) => outcome,
                None => return Ok(self.stream_ended()),
            },
        };

        let s_wave = match outcome {
            SWaveOutcome::Detected(event) => event,
            SWaveOutcome::Cancelled => return Ok(self.interrupted()),
            SWaveOutcome::TimedOut => {
                log::warn!("No S wave within {:?}", self.config.swave_timeout());
                return Ok(Termination::SWaveTimedOut);
            }
        };
        run.s_wave = Some(s_wave);
        log::info!("S wave captured: {}", s_wave.amplitude);

        let delta = s_wave
            .occurred_at
            .saturating_duration_since(p_wave.occurred_at)
            .as_secs_f64();
        let distance = epicentral_distance_km(delta);
        run.time_delta_secs = Some(delta);
        run.distance_km = Some(distance);
        log::info!(
            "Earthquake distance from sensor: {:.2} km (P-S delay {:.3}s)",
            distance,
            delta
        );

        Ok(Termination::Completed)
    }

    /// Block until a crossing, cancellation or the optional timeout.
    /// `None` means the stream ended first.
    async fn wait_for_s_wave<S: SampleSource + ?Sized>(
        &mut self,
        source: &mut S,
        detector: &SWaveDetector,
    ) -> Option<SWaveOutcome> {
        let deadline = self
            .config
            .swave_timeout()
            .and_then(|t| Instant::now().checked_add(t));
        loop {
            match self.next_sample(source, deadline).await {
                Step::Sample(sample) => {
                    if let Some(event) = detector.check(&sample) {
                        return Some(SWaveOutcome::Detected(event));
                    }
                }
                Step::DeadlineReached => return Some(SWaveOutcome::TimedOut),
                Step::StreamEnded => return None,
                Step::Cancelled => return Some(SWaveOutcome::Cancelled),
            }
        }
    }

    async fn report(
        &mut self,
        run: &mut DetectionRun,
        alert_config: &AlertConfig,
        dispatcher: Option<&AlertDispatcher>,
    ) {
        let (Some(p_wave), Some(s_wave), Some(delta), Some(distance)) =
            (run.p_wave, run.s_wave, run.time_delta_secs, run.distance_km)
        else {
            return;
        };

        self.enter(Phase::Reporting);
        let report = EarthquakeReport::new(
            p_wave.amplitude,
            s_wave.amplitude,
            alert_config.sensor_id,
            distance,
            delta,
            alert_config.lifecycle,
        );
        run.report = Some(report.clone());

        let Some(dispatcher) = dispatcher else {
            log::warn!("No alerting service configured; event not reported");
            return;
        };

        let mut outcome = AlertOutcome::default();
        if self.cancel.is_cancelled() {
            log::info!("Run {} cancelled before the report was handed off", self.run_id);
            outcome.cancelled = true;
            run.termination = self.interrupted();
            run.alert = Some(outcome);
            return;
        }

        let mut events = match dispatcher.publish(report).await {
            Ok(events) => events,
            Err(e) => {
                log::error!("Failed to hand report to alert dispatcher: {}", e);
                outcome.errors.push(e.to_string());
                if self.cancel.is_cancelled() {
                    outcome.cancelled = true;
                    run.termination = self.interrupted();
                }
                run.alert = Some(outcome);
                return;
            }
        };

        let mut settled = false;
        while let Some(event) = events.recv().await {
            match event {
                DispatchEvent::Submitted { alert_id } => {
                    settled = true;
                    outcome.alert_id = Some(alert_id);
                    if alert_config.lifecycle == AlertLifecycle::Full {
                        self.enter(Phase::Deactivating);
                    }
                }
                DispatchEvent::SubmitFailed { error } => {
                    settled = true;
                    outcome.errors.push(error);
                }
                DispatchEvent::Deactivated { .. } => outcome.deactivated = true,
                DispatchEvent::DeactivateFailed { error, .. } => outcome.errors.push(error),
                DispatchEvent::Cancelled => outcome.cancelled = true,
            }
        }

        // A job dropped by a stopping worker closes the channel silently
        if !settled && !outcome.cancelled {
            log::warn!("Alert dispatcher stopped before submitting the report");
            outcome.cancelled = true;
        }

        if outcome.cancelled {
            run.termination = self.interrupted();
        }
        run.alert = Some(outcome);
    }

    /// Next parsed sample, skipping malformed lines and transient transport
    /// faults. With a deadline, returns `DeadlineReached` once it passes.
    async fn next_sample<S: SampleSource + ?Sized>(
        &mut self,
        source: &mut S,
        deadline: Option<Instant>,
    ) -> Step {
        let read_timeout = self.config.read_timeout();

        loop {
            let bound = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Step::DeadlineReached;
                    }
                    (deadline - now).min(read_timeout)
                }
                None => read_timeout,
            };

            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Step::Cancelled,
                read = tokio::time::timeout(bound, source.read_line()) => read,
            };

            let line = match read {
                Err(_) => {
                    log::trace!("No sample within {:?}", bound);
                    continue;
                }
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => return Step::StreamEnded,
                Ok(Err(e)) => {
                    self.stats.transport_errors += 1;
                    self.consecutive_transport_errors += 1;
                    if self.consecutive_transport_errors >= self.config.max_consecutive_transport_errors {
                        log::error!(
                            "Giving up after {} consecutive transport errors: {}",
                            self.consecutive_transport_errors,
                            e
                        );
                        return Step::StreamEnded;
                    }
                    log::warn!("Failed to read line, skipping: {}", e);
                    continue;
                }
            };

            self.consecutive_transport_errors = 0;
            self.stats.lines_read += 1;

            match parse_line(&line.bytes, line.received_at) {
                ParseOutcome::Sample(sample) => {
                    self.stats.samples_accepted += 1;
                    log::debug!(
                        "Reading {}: x={}, y={}, z={}",
                        self.stats.samples_accepted,
                        sample.x,
                        sample.y,
                        sample.z
                    );
                    return Step::Sample(sample);
                }
                ParseOutcome::Skip(SkipReason::Empty) => continue,
                ParseOutcome::Skip(reason) => {
                    self.stats.lines_skipped += 1;
                    log::warn!(
                        "Invalid data format ({}): {}",
                        reason,
                        String::from_utf8_lossy(&line.bytes).trim()
                    );
                }
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        if let Some(previous) = self.phases.last() {
            log::info!("Phase {} -> {}", previous, phase);
        }
        self.phases.push(phase);
    }

    fn current_phase(&self) -> Phase {
        self.phases.last().copied().unwrap_or_default()
    }

    fn interrupted(&self) -> Termination {
        let phase = self.current_phase();
        log::info!("Run interrupted during {}", phase);
        Termination::Interrupted { phase }
    }

    fn stream_ended(&self) -> Termination {
        let phase = self.current_phase();
        log::warn!("Stream ended during {}", phase);
        Termination::StreamEnded { phase }
    }

    async fn release<S: SampleSource + ?Sized>(&self, source: &mut S) {
        if let Err(e) = source.close().await {
            log::warn!("Failed to close {}: {}", source.describe(), e);
        }
    }

    fn finish(mut self, mut run: DetectionRun) -> DetectionRun {
        if self.current_phase() != Phase::Done {
            self.enter(Phase::Done);
        }
        run.phases = self.phases;
        run.stats = self.stats;
        log::info!("Run {} finished: {:?}", run.run_id, run.termination);
        run
    }
}
