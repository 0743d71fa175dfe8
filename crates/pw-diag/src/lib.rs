//! Diagnostic action logging for PlastiWatch.
//!
//! Every user-visible action is reported to a fixed endpoint as a small JSON
//! document. The call is fire-and-forget: the response status is logged and
//! nothing is parsed or retried.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use pw_core::Action;
use serde::Serialize;
use thiserror::Error;

/// Placeholder endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.example.com/plastiwatch/log";

/// Value of the `device` field in every payload.
pub const DEVICE: &str = "apple_watch";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Diagnostic client errors.
#[derive(Debug, Error)]
pub enum DiagError {
    /// The endpoint is not an http(s) URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// JSON body of a diagnostic log call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionLog {
    pub action: Action,
    /// ISO-8601 with millisecond precision.
    pub timestamp: String,
    pub device: &'static str,
}

impl ActionLog {
    pub fn new(action: Action, at: DateTime<Utc>) -> Self {
        Self {
            action,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            device: DEVICE,
        }
    }
}

/// Diagnostic logging client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client posting to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, DiagError> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DiagError> {
        let endpoint = endpoint.into();
        let trimmed = endpoint.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(DiagError::InvalidEndpoint(endpoint));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DiagError::ClientBuild)?;

        Ok(Self {
            http,
            endpoint: trimmed.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one action log and return the HTTP status code.
    pub async fn send(&self, log: &ActionLog) -> Result<u16, DiagError> {
        let response = self.http.post(&self.endpoint).json(log).send().await?;
        Ok(response.status().as_u16())
    }

    /// Send and log the outcome. Never fails.
    pub async fn report(&self, log: ActionLog) {
        match self.send(&log).await {
            Ok(status) => {
                tracing::debug!(action = %log.action, status, "diagnostic log sent");
            }
            Err(err) => {
                tracing::warn!(action = %log.action, error = %err, "diagnostic log failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serializes_expected_fields() {
        let at = DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap();
        let log = ActionLog::new(Action::ActivityConfirmed, at);
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "action": "activity_confirmed",
                "timestamp": "2023-11-14T22:13:20.250Z",
                "device": "apple_watch",
            })
        );
    }

    #[test]
    fn test_client_rejects_non_http_endpoint() {
        assert!(matches!(
            Client::new("ftp://example.com"),
            Err(DiagError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            Client::new(""),
            Err(DiagError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_client_accepts_default_endpoint() {
        let client = Client::new(DEFAULT_ENDPOINT).unwrap();
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
        assert!(format!("{client:?}").contains(DEFAULT_ENDPOINT));
    }

    #[tokio::test]
    async fn test_report_swallows_connection_errors() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let client =
            Client::with_timeout("http://127.0.0.1:9/log", Duration::from_millis(200)).unwrap();
        client
            .report(ActionLog::new(Action::StartMonitoring, Utc::now()))
            .await;
    }
}
