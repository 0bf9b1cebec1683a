// Detection components driven by the orchestrator
//
// Each stage is a small synchronous state holder fed one sample at a time:
// - `calibrator`: fixes the at-rest baseline at a configured sample count
// - `monitor`: per-axis threshold check that signals P-wave onset
// - `capture`: running per-axis maxima over the fixed P-wave window
// - `swave`: first sample whose deviation reaches the P-wave peak
// - `distance`: two-velocity epicentral distance model
//
// None of these block or read the stream themselves; timing and I/O live in
// `crate::detector`.

pub mod calibrator;
pub mod capture;
pub mod distance;
pub mod monitor;
pub mod swave;

pub use calibrator::Calibrator;
pub use capture::PeakCapture;
pub use distance::{epicentral_distance_km, P_WAVE_VELOCITY_KM_S, S_WAVE_VELOCITY_KM_S};
pub use monitor::DeviationMonitor;
pub use swave::{SWaveDetector, SWaveOutcome};
