use crate::types::{CalibrationBaseline, Sample};

/// Counts accepted samples and captures the baseline at `calibration_index`
#[derive(Debug, Clone)]
pub struct Calibrator {
    calibration_index: u64,
    accepted: u64,
    baseline: Option<CalibrationBaseline>,
}

impl Calibrator {
    pub fn new(calibration_index: u64) -> Self {
        Self {
            calibration_index,
            accepted: 0,
            baseline: None,
        }
    }

    /// Offer the next accepted sample.
    ///
    /// Returns the baseline exactly once, for the sample whose 1-based count
    /// equals the calibration index. Samples offered afterwards are ignored.
    pub fn offer(&mut self, sample: &Sample) -> Option<CalibrationBaseline> {
        if self.baseline.is_some() {
            return None;
        }

        self.accepted += 1;
        if self.accepted == self.calibration_index {
            let baseline = CalibrationBaseline::from_sample(sample);
            self.baseline = Some(baseline);
            return Some(baseline);
        }
        None
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn required(&self) -> u64 {
        self.calibration_index
    }

    pub fn baseline(&self) -> Option<CalibrationBaseline> {
        self.baseline
    }
}
