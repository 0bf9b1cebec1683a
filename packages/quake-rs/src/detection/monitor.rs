use crate::types::{CalibrationBaseline, Deviation, Sample};

/// Watches post-baseline samples for a per-axis threshold breach
#[derive(Debug, Clone, Copy)]
pub struct DeviationMonitor {
    baseline: CalibrationBaseline,
    threshold: f64,
}

impl DeviationMonitor {
    pub fn new(baseline: CalibrationBaseline, threshold: f64) -> Self {
        Self { baseline, threshold }
    }

    /// Returns the sample's deviation when any single axis is strictly above
    /// the threshold. The first such sample is the P-wave onset.
    pub fn check(&self, sample: &Sample) -> Option<Deviation> {
        let deviation = self.baseline.deviation(sample);
        deviation.exceeds(self.threshold).then_some(deviation)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}
