use crate::error::{QuakeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Alert payload richness and lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertLifecycle {
    /// Report distance and time delta, then deactivate the alert after a delay
    #[default]
    Full,
    /// Report amplitudes only; the alert is left active
    Basic,
}

/// Alerting service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Collection endpoint; alerts are updated at `{endpoint}/{id}`
    pub endpoint: String,
    pub sensor_id: i64,
    pub lifecycle: AlertLifecycle,
    /// Delay between a successful submit and deactivation
    pub deactivate_after_secs: f64,
    pub request_timeout_secs: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            sensor_id: 1,
            lifecycle: AlertLifecycle::Full,
            deactivate_after_secs: 5.0,
            request_timeout_secs: 10.0,
        }
    }
}

impl AlertConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn deactivate_after(&self) -> Duration {
        secs_to_duration(self.deactivate_after_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        secs_to_duration(self.request_timeout_secs)
    }
}

/// Immutable detector configuration, built once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// 1-based count of accepted samples at which the baseline is fixed
    pub calibration_index: u64,
    /// Per-axis deviation that must be exceeded to declare onset
    pub threshold: f64,
    pub capture_duration_secs: f64,
    /// Settling delay after calibration; samples received meanwhile are dropped
    pub buffer_time_secs: f64,
    /// Upper bound on a single read; no data within it is "no sample yet"
    pub read_timeout_secs: f64,
    /// Optional limit on the S-wave wait. `None` waits indefinitely.
    pub swave_timeout_secs: Option<f64>,
    /// Consecutive transport failures tolerated before the stream is abandoned
    pub max_consecutive_transport_errors: u32,
    pub alert: Option<AlertConfig>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            calibration_index: 100,
            threshold: 0.05,
            capture_duration_secs: 3.0,
            buffer_time_secs: 5.0,
            read_timeout_secs: 1.0,
            swave_timeout_secs: None,
            max_consecutive_transport_errors: 10,
            alert: None,
        }
    }
}

impl DetectorConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: DetectorConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.calibration_index == 0 {
            return Err(QuakeError::InvalidConfig(
                "calibration_index must be at least 1".to_string(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(QuakeError::InvalidConfig(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }

        check_secs("capture_duration_secs", self.capture_duration_secs)?;
        check_secs("buffer_time_secs", self.buffer_time_secs)?;
        check_secs("read_timeout_secs", self.read_timeout_secs)?;
        if self.read_timeout_secs == 0.0 {
            return Err(QuakeError::InvalidConfig(
                "read_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(secs) = self.swave_timeout_secs {
            check_secs("swave_timeout_secs", secs)?;
        }

        if let Some(alert) = &self.alert {
            if alert.endpoint.trim().is_empty() {
                return Err(QuakeError::InvalidConfig(
                    "alert endpoint must not be empty".to_string(),
                ));
            }
            check_secs("deactivate_after_secs", alert.deactivate_after_secs)?;
            check_secs("request_timeout_secs", alert.request_timeout_secs)?;
        }

        Ok(())
    }

    pub fn capture_duration(&self) -> Duration {
        secs_to_duration(self.capture_duration_secs)
    }

    pub fn buffer_time(&self) -> Duration {
        secs_to_duration(self.buffer_time_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        secs_to_duration(self.read_timeout_secs)
    }

    pub fn swave_timeout(&self) -> Option<Duration> {
        self.swave_timeout_secs.map(secs_to_duration)
    }
}

/// Saturating conversion for values that already passed `check_secs`
pub(crate) fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

fn check_secs(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(QuakeError::InvalidConfig(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )));
    }
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(QuakeError::InvalidConfig(format!(
            "{} is too large to be a duration: {}",
            name, value
        )));
    }
    Ok(())
}
