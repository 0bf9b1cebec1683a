use crate::types::{CalibrationBaseline, Deviation, Sample, WaveEvent};
use std::time::Duration;
use tokio::time::Instant;

/// Fixed wall-clock window that tracks per-axis running maxima from onset.
///
/// The window is time-bounded, not count-bounded: the caller offers every
/// sample it receives before [`PeakCapture::deadline`] and then calls
/// [`PeakCapture::finish`]. A window too long to represent as an instant has
/// no deadline.
#[derive(Debug, Clone)]
pub struct PeakCapture {
    baseline: CalibrationBaseline,
    started_at: Instant,
    deadline: Option<Instant>,
    maxima: Deviation,
    samples: usize,
}

impl PeakCapture {
    pub fn start(baseline: CalibrationBaseline, started_at: Instant, duration: Duration) -> Self {
        Self {
            baseline,
            started_at,
            deadline: started_at.checked_add(duration),
            maxima: Deviation::default(),
            samples: 0,
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a sample observed at `at` falls inside the window
    pub fn contains(&self, at: Instant) -> bool {
        self.deadline.map_or(true, |deadline| at < deadline)
    }

    /// Fold one in-window sample into the running maxima
    pub fn observe(&mut self, sample: &Sample) {
        let deviation = self.baseline.deviation(sample);
        self.maxima = self.maxima.max_with(&deviation);
        self.samples += 1;
    }

    pub fn running_maxima(&self) -> Deviation {
        self.maxima
    }

    pub fn samples_observed(&self) -> usize {
        self.samples
    }

    /// Close the window. Amplitude is `0` if no sample was observed.
    pub fn finish(self) -> WaveEvent {
        WaveEvent {
            amplitude: self.maxima.amplitude(),
            occurred_at: self.started_at,
        }
    }
}
