//! HTTP clients for talking to the two upstream processors.
//!
//! Two distinct `reqwest::Client`s are constructed once at process start and
//! shared across requests: a larger, keep-alive pool for payment POSTs and a
//! smaller one for health GETs. Neither client retries internally — retries
//! are the Dispatcher's job.

use crate::config::{GatewayConfig, ProcessorUrls};
use crate::domain::{EnrichedPayment, HealthSnapshot, ProcessorIdentity};
use crate::error::UpstreamError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone)]
pub struct UpstreamClients {
    payment_client: reqwest::Client,
    health_client: reqwest::Client,
    urls: ProcessorUrls,
    payment_timeout: Duration,
    probe_timeout: Duration,
}

impl UpstreamClients {
    pub fn new(config: &GatewayConfig) -> reqwest::Result<Self> {
        let payment_client = reqwest::Client::builder()
            .pool_max_idle_per_host(200)
            .tcp_keepalive(Duration::from_secs(60))
            .cookie_store(false)
            .no_proxy()
            .timeout(config.dispatch.payment_timeout)
            .build()?;

        let health_client = reqwest::Client::builder()
            .pool_max_idle_per_host(50)
            .cookie_store(false)
            .no_proxy()
            .timeout(config.health.probe_timeout)
            .build()?;

        Ok(Self {
            payment_client,
            health_client,
            urls: config.processors.clone(),
            payment_timeout: config.dispatch.payment_timeout,
            probe_timeout: config.health.probe_timeout,
        })
    }

    fn base_url(&self, processor: ProcessorIdentity) -> &str {
        match processor {
            ProcessorIdentity::Primary => &self.urls.primary,
            ProcessorIdentity::Fallback => &self.urls.fallback,
        }
    }

    /// `POST {base}/payments`. Success iff the response status is 2xx; any
    /// other status, a timeout, or a transport error is reported as `Err`
    /// and never propagates beyond the Dispatcher as an exception.
    pub async fn post_payment(
        &self,
        processor: ProcessorIdentity,
        payment: &EnrichedPayment,
    ) -> Result<(), UpstreamError> {
        let name = processor.as_key();
        let url = format!("{}/payments", self.base_url(processor));

        let send = self
            .payment_client
            .post(&url)
            .header("Connection", "keep-alive")
            .json(payment)
            .send();

        let response = tokio::time::timeout(self.payment_timeout, send)
            .await
            .map_err(|_| UpstreamError::Timeout {
                processor: name,
                millis: self.payment_timeout.as_millis() as u64,
            })?
            .map_err(|source| UpstreamError::Transport {
                processor: name,
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(UpstreamError::Status {
                processor: name,
                status: response.status().as_u16(),
            })
        }
    }

    /// `GET {base}/payments/service-health`. Non-2xx, timeout, transport
    /// error, or a body missing required fields all collapse to `None` —
    /// absence, not an error, is the contract here.
    pub async fn fetch_health(&self, processor: ProcessorIdentity) -> Option<HealthSnapshot> {
        let name = processor.as_key();
        let url = format!("{}/payments/service-health", self.base_url(processor));

        let send = self.health_client.get(&url).send();
        let response = match tokio::time::timeout(self.probe_timeout, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(source)) => {
                tracing::warn!(processor = name, error = %source, "health probe transport error");
                return None;
            }
            Err(_) => {
                tracing::warn!(processor = name, "health probe timed out");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(processor = name, status = %response.status(), "health probe non-2xx");
            return None;
        }

        match response.json::<RawHealthBody>().await {
            Ok(body) => body.into_snapshot(),
            Err(source) => {
                let error = UpstreamError::Decode { processor: name, source };
                tracing::warn!(%error, "health probe body undecodable");
                None
            }
        }
    }
}

/// Lenient DTO for the upstream health endpoint: extra fields are ignored by
/// serde's default behavior, and either field being absent yields `None`
/// from [`RawHealthBody::into_snapshot`].
#[derive(Debug, Deserialize)]
struct RawHealthBody {
    failing: Option<bool>,
    #[serde(rename = "minResponseTime")]
    min_response_time: Option<u64>,
}

impl RawHealthBody {
    fn into_snapshot(self) -> Option<HealthSnapshot> {
        Some(HealthSnapshot {
            failing: self.failing?,
            min_response_time_ms: self.min_response_time?,
        })
    }
}
