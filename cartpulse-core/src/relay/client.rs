//! HTTP client for the conversion-tracking API
//!
//! Issues one outbound call per ingested event with a bounded timeout.
//! Delivery is at-most-once: failures are classified and returned, not
//! retried — the caller accepts the loss in exchange for bounded
//! latency and a universally-successful client-facing tracking call.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::RelayConfig;
use crate::error::{Error, RelayError, Result};
use crate::types::{AnalyticsEvent, RequestContext};

use super::payload::ConversionPayload;

/// HTTP client for the external conversion endpoint.
pub struct ConversionClient {
    http_client: reqwest::Client,
    endpoint_url: String,
    site_origin: String,
    timeout: Duration,
}

impl ConversionClient {
    /// Create a client from configuration.
    ///
    /// Returns `None` when the relay is disabled or not fully
    /// configured — ingestion then runs store-only.
    pub fn new(config: &RelayConfig) -> Result<Option<Self>> {
        if !config.is_ready() {
            return Ok(None);
        }
        config.validate()?;

        let endpoint_url = config
            .endpoint_url
            .clone()
            .ok_or_else(|| Error::Config("relay.endpoint_url is required".to_string()))?;

        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| Error::Config("relay.access_token is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = format!("Bearer {}", access_token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| Error::Config(format!("invalid access_token: {}", e)))?,
        );

        let timeout = Duration::from_secs(config.timeout_secs);
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Some(Self {
            http_client,
            endpoint_url,
            site_origin: config.site_origin.clone(),
            timeout,
        }))
    }

    /// Dispatch one event to the conversion endpoint.
    ///
    /// Network error, timeout, and non-success status all classify as
    /// [`RelayError`]; none of them is retried here.
    pub async fn dispatch(
        &self,
        event: &AnalyticsEvent,
        ctx: &RequestContext,
    ) -> std::result::Result<(), RelayError> {
        let payload = ConversionPayload::build(event, ctx, &self.site_origin);

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(
                event_type = %event.event_type,
                event_id = ?event.event_id,
                "Dispatched conversion event"
            );
            Ok(())
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(RelayError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn classify_send_error(&self, e: reqwest::Error) -> RelayError {
        if e.is_timeout() {
            RelayError::Timeout(self.timeout)
        } else {
            RelayError::Request(e.to_string())
        }
    }

    /// The origin used to build `event_source_url`
    pub fn site_origin(&self) -> &str {
        &self.site_origin
    }
}
