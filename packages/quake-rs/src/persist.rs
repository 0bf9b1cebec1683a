use crate::detector::DetectionRun;
use crate::error::Result;
use crate::types::CalibrationBaseline;
use std::path::Path;

/// The three-line wave data artifact written after a complete event
#[derive(Debug, Clone, PartialEq)]
pub struct WaveDataRecord {
    pub baseline: CalibrationBaseline,
    pub p_wave: f64,
    pub s_wave: f64,
}

impl WaveDataRecord {
    /// Only a run with baseline, P-wave and S-wave produces a record
    pub fn from_run(run: &DetectionRun) -> Option<Self> {
        Some(Self {
            baseline: run.baseline?,
            p_wave: run.p_wave?.amplitude,
            s_wave: run.s_wave?.amplitude,
        })
    }

    pub fn render(&self) -> String {
        // `{:?}` keeps a trailing `.0` on integral values (1.0, not 1)
        format!(
            "Calibration data: {:?},{:?},{:?}\nP wave: {:?}\nS wave: {:?}\n",
            self.baseline.x0, self.baseline.y0, self.baseline.z0, self.p_wave, self.s_wave
        )
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.render())?;
        log::info!("Wave data saved to {}", path.as_ref().display());
        Ok(())
    }
}

/// Write the artifact if the run captured a full event.
/// Returns whether a file was written.
pub fn save_wave_data<P: AsRef<Path>>(run: &DetectionRun, path: P) -> Result<bool> {
    match WaveDataRecord::from_run(run) {
        Some(record) => {
            record.write_to(path)?;
            Ok(true)
        }
        None => {
            log::info!("Wave data was not captured");
            Ok(false)
        }
    }
}
