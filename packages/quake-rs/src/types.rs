use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// One triaxial accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Monotonic time at which the line carrying this sample was received
    pub observed_at: Instant,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64, observed_at: Instant) -> Self {
        Self { x, y, z, observed_at }
    }
}

/// At-rest reference reading, fixed once per run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBaseline {
    pub x0: f64,
    pub y0: f64,
    pub z0: f64,
}

impl CalibrationBaseline {
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            x0: sample.x,
            y0: sample.y,
            z0: sample.z,
        }
    }

    /// Per-axis absolute deviation of `sample` from this baseline
    pub fn deviation(&self, sample: &Sample) -> Deviation {
        Deviation {
            dx: (sample.x - self.x0).abs(),
            dy: (sample.y - self.y0).abs(),
            dz: (sample.z - self.z0).abs(),
        }
    }
}

/// Per-axis absolute difference between a sample and the baseline
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Deviation {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Deviation {
    /// Largest single-axis deviation. Never a vector magnitude.
    pub fn amplitude(&self) -> f64 {
        self.dx.max(self.dy).max(self.dz)
    }

    /// True when at least one axis is strictly above `threshold`
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.dx > threshold || self.dy > threshold || self.dz > threshold
    }

    /// Axis-wise maximum of two deviations
    pub fn max_with(&self, other: &Deviation) -> Deviation {
        Deviation {
            dx: self.dx.max(other.dx),
            dy: self.dy.max(other.dy),
            dz: self.dz.max(other.dz),
        }
    }
}

/// A measured wave: P-wave peak or S-wave crossing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaveEvent {
    pub amplitude: f64,
    #[serde(skip)]
    pub occurred_at: Instant,
}

/// Detector state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Calibrating,
    Buffering,
    Monitoring,
    CapturingP,
    WaitingS,
    Reporting,
    Deactivating,
    Done,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Calibrating => "calibrating",
            Phase::Buffering => "buffering",
            Phase::Monitoring => "monitoring",
            Phase::CapturingP => "capturing_p",
            Phase::WaitingS => "waiting_s",
            Phase::Reporting => "reporting",
            Phase::Deactivating => "deactivating",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}
