use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info};

use crate::config::BackendConfig;
use crate::error::{HealthError, Result};
use crate::metrics::{normalize, SubmissionBatch};
use crate::probes::{RawMetricSet, TestType};

/// Client for the metrics intake API.
///
/// Starts unauthenticated. [`validate_credentials`](Self::validate_credentials)
/// must succeed before [`submit`](Self::submit) performs any I/O.
#[derive(Debug)]
pub struct MetricsClient {
    http: Client,
    base_url: String,
    api_key_header: String,
    api_key: SecretString,
    host: String,
    validated: bool,
}

impl MetricsClient {
    pub fn new(api_key: SecretString, host: impl Into<String>, config: &BackendConfig) -> Result<Self> {
        let host = host.into();
        info!(%host, base_url = %config.base_url, "initializing metrics client");

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("network-health/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_header: config.api_key_header.clone(),
            api_key,
            host,
            validated: false,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Check the API key against the backend's read-only validation endpoint.
    ///
    /// Every call re-checks. Any failure leaves the client unauthenticated.
    pub async fn validate_credentials(&mut self) -> Result<()> {
        self.validated = false;
        let url = format!("{}/v1/validate", self.base_url);
        debug!(%url, "validating credentials");

        let response = self
            .http
            .get(&url)
            .header(self.api_key_header.as_str(), self.api_key.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), %body, "validation rejected");
            error!(status = status.as_u16(), reason = reason(status), "failed to validate credentials");
            return Err(HealthError::AuthenticationFailed {
                status: status.as_u16(),
                reason: reason(status).to_string(),
            });
        }

        self.validated = true;
        info!("credentials validated");
        Ok(())
    }

    /// POST one batch to the series endpoint. Single attempt, no retry.
    pub async fn submit(&self, batch: &SubmissionBatch) -> Result<()> {
        if !self.validated {
            return Err(HealthError::NotAuthenticated);
        }

        let url = format!("{}/v2/series", self.base_url);
        debug!(%url, points = batch.len(), "submitting series");

        let response = self
            .http
            .post(&url)
            .header(self.api_key_header.as_str(), self.api_key.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                status = status.as_u16(),
                reason = reason(status),
                %body,
                "failed to submit metrics"
            );
            return Err(HealthError::SubmissionFailed {
                status: status.as_u16(),
                reason: reason(status).to_string(),
            });
        }

        Ok(())
    }

    /// Normalize `metrics` under this client's host and submit them.
    pub async fn submit_metrics(&self, metrics: &RawMetricSet, test_type: TestType) -> Result<()> {
        info!(%test_type, "generating data body");
        let batch = normalize(metrics, &self.host, test_type)?;
        info!(%test_type, points = batch.len(), "submitting data body");
        self.submit(&batch).await?;
        info!(%test_type, "submitted metric data");
        Ok(())
    }
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("unknown status")
}
