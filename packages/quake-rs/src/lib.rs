pub mod alert;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod parser;
pub mod persist;
pub mod source;
pub mod types;

pub use alert::{AlertDispatcher, AlertId, AlertService, DispatchEvent, EarthquakeReport, HttpAlertClient};
pub use config::{AlertConfig, AlertLifecycle, DetectorConfig};
pub use detection::{epicentral_distance_km, SWaveOutcome};
pub use detector::{AlertOutcome, DetectionRun, Detector, RunStats, Termination};
pub use error::{QuakeError, Result};
pub use parser::{parse_line, ParseOutcome, SkipReason};
pub use persist::{save_wave_data, WaveDataRecord};
pub use source::{create_source, RawLine, SampleSource, SourceConfig};
pub use types::*;
