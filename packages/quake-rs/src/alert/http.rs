use super::{select_alert_id, AlertId, AlertService, CreatedAlerts, EarthquakeReport};
use crate::config::AlertConfig;
use crate::error::{QuakeError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

/// REST client for the alerts collection.
///
/// `POST {endpoint}` creates an alert (expects 201 and `{"data": [{"id": ..}, ..]}`),
/// `PUT {endpoint}/{id}` with `{"active": false}` deactivates it (expects 200).
pub struct HttpAlertClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAlertClient {
    pub fn new(config: &AlertConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| QuakeError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn alert_url(&self, id: AlertId) -> String {
        format!("{}/{}", self.endpoint, id)
    }
}

#[async_trait]
impl AlertService for HttpAlertClient {
    async fn submit(&self, report: &EarthquakeReport) -> Result<AlertId> {
        log::debug!("POST {} {:?}", self.endpoint, report);

        let response = self.client.post(&self.endpoint).json(report).send().await?;
        let status = response.status();

        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(QuakeError::Protocol(format!(
                "alert creation returned {} (expected 201): {}",
                status, body
            )));
        }

        let created: CreatedAlerts = response
            .json()
            .await
            .map_err(|e| QuakeError::Protocol(format!("unreadable creation response: {}", e)))?;

        select_alert_id(&created.data).ok_or_else(|| {
            QuakeError::Protocol("creation response contained no alert id".to_string())
        })
    }

    async fn deactivate(&self, id: AlertId) -> Result<()> {
        let url = self.alert_url(id);
        log::debug!("PUT {} active=false", url);

        let response = self
            .client
            .put(&url)
            .json(&json!({ "active": false }))
            .send()
            .await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(QuakeError::Protocol(format!(
                "alert {} update returned {} (expected 200): {}",
                id, status, body
            )));
        }

        Ok(())
    }
}
