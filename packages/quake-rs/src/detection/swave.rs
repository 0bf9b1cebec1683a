use crate::types::{CalibrationBaseline, Sample, WaveEvent};

/// How the S-wave wait ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SWaveOutcome {
    Detected(WaveEvent),
    Cancelled,
    TimedOut,
}

/// Waits for the first sample whose instantaneous deviation reaches the
/// P-wave peak amplitude
#[derive(Debug, Clone, Copy)]
pub struct SWaveDetector {
    baseline: CalibrationBaseline,
    peak_amplitude: f64,
}

impl SWaveDetector {
    pub fn new(baseline: CalibrationBaseline, p_wave: &WaveEvent) -> Self {
        Self {
            baseline,
            peak_amplitude: p_wave.amplitude,
        }
    }

    pub fn peak_amplitude(&self) -> f64 {
        self.peak_amplitude
    }

    /// Instantaneous per-axis-max deviation, compared with `>=`.
    /// No running maximum is kept between calls.
    pub fn check(&self, sample: &Sample) -> Option<WaveEvent> {
        let amplitude = self.baseline.deviation(sample).amplitude();
        (amplitude >= self.peak_amplitude).then_some(WaveEvent {
            amplitude,
            occurred_at: sample.observed_at,
        })
    }

    /// Scan an ordered batch and return the first crossing
    pub fn first_crossing<'a, I>(&self, samples: I) -> Option<WaveEvent>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        samples.into_iter().find_map(|s| self.check(s))
    }
}
