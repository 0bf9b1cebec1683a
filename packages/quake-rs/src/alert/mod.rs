// Alerting service boundary
//
// The detector owns the contract (`AlertService`); `HttpAlertClient` is the
// REST implementation and `AlertDispatcher` moves submit/deactivate off the
// detection path onto a background task.

pub mod dispatcher;
pub mod http;

use crate::config::AlertLifecycle;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use dispatcher::{AlertDispatcher, DispatchEvent};
pub use http::HttpAlertClient;

/// Identifier assigned by the alerting service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub i64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event payload submitted to the alerting service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeReport {
    #[serde(rename = "pwave")]
    pub pwave_amplitude: f64,
    #[serde(rename = "swave")]
    pub swave_amplitude: f64,
    #[serde(rename = "sensorid")]
    pub sensor_id: i64,
    pub active: bool,
    #[serde(rename = "distance", default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(rename = "time", default, skip_serializing_if = "Option::is_none")]
    pub time_delta_sec: Option<f64>,
}

impl EarthquakeReport {
    /// Build a report; `Basic` lifecycle omits distance and time delta
    pub fn new(
        pwave_amplitude: f64,
        swave_amplitude: f64,
        sensor_id: i64,
        distance_km: f64,
        time_delta_sec: f64,
        lifecycle: AlertLifecycle,
    ) -> Self {
        let full = lifecycle == AlertLifecycle::Full;
        Self {
            pwave_amplitude,
            swave_amplitude,
            sensor_id,
            active: true,
            distance_km: full.then_some(distance_km),
            time_delta_sec: full.then_some(time_delta_sec),
        }
    }
}

/// One alert record echoed back by the service. Only `id` is retained.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertRecord {
    #[serde(default)]
    pub id: Option<i64>,
}

/// Body of a successful creation call
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedAlerts {
    #[serde(default)]
    pub data: Vec<AlertRecord>,
}

/// The newest alert is assumed to carry the largest identifier
pub fn select_alert_id(records: &[AlertRecord]) -> Option<AlertId> {
    records.iter().filter_map(|r| r.id).max().map(AlertId)
}

/// Contract the detector needs from the alerting service
#[async_trait]
pub trait AlertService: Send + Sync {
    /// Create the alert and resolve its identifier
    async fn submit(&self, report: &EarthquakeReport) -> Result<AlertId>;

    /// Mark a previously created alert inactive
    async fn deactivate(&self, id: AlertId) -> Result<()>;
}
