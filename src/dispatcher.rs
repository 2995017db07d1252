//! Dispatcher: the hot path. Builds the enriched payment once, then
//! runs a bounded primary-then-fallback retry loop, updating the circuit
//! breaker and summary store as it goes.

use crate::circuit::CircuitBreaker;
use crate::config::{DispatchConfig, HealthConfig};
use crate::decider::Decider;
use crate::domain::{EnrichedPayment, PaymentRequest, ProcessorIdentity};
use crate::error::DispatchExhausted;
use crate::health::HealthCache;
use crate::summary::SummaryStore;
use crate::upstream::UpstreamClients;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub processor: ProcessorIdentity,
}

pub struct Dispatcher {
    breaker: CircuitBreaker,
    health: HealthCache,
    summary: Arc<SummaryStore>,
    upstream: Arc<UpstreamClients>,
    dispatch: DispatchConfig,
    health_config: HealthConfig,
}

impl Dispatcher {
    pub fn new(
        breaker: CircuitBreaker,
        health: HealthCache,
        summary: Arc<SummaryStore>,
        upstream: Arc<UpstreamClients>,
        dispatch: DispatchConfig,
        health_config: HealthConfig,
    ) -> Self {
        Self {
            breaker,
            health,
            summary,
            upstream,
            dispatch,
            health_config,
        }
    }

    pub async fn process_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<DispatchOutcome, DispatchExhausted> {
        // Fixed once and reused across every retry so requestedAt never
        // changes for a given request.
        let enriched = EnrichedPayment::new(request, Utc::now());

        for attempt in 0..self.dispatch.max_tries {
            let decider = Decider::new(&self.breaker, &self.health, self.health_config);
            let preferred = decider.pick_primary_first().await;
            let other = preferred.other();

            if let Some(outcome) = self.try_processor(preferred, &enriched, request).await {
                return Ok(outcome);
            }
            if let Some(outcome) = self.try_processor(other, &enriched, request).await {
                return Ok(outcome);
            }

            if attempt + 1 < self.dispatch.max_tries {
                if let Some(delay) = self.dispatch.backoff.get(attempt) {
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        tracing::warn!(
            correlation_id = %request.correlation_id,
            "dispatch exhausted retry budget against both processors"
        );
        Err(DispatchExhausted)
    }

    /// Attempts one processor. On success, records success to the breaker
    /// first and only then increments the summary counter — that ordering
    /// is pinned so a crash between the two never shows a payment counted
    /// without a corresponding breaker observation. On failure, records
    /// failure and returns `None` so the caller can try the other
    /// processor.
    async fn try_processor(
        &self,
        processor: ProcessorIdentity,
        enriched: &EnrichedPayment,
        request: PaymentRequest,
    ) -> Option<DispatchOutcome> {
        match self.upstream.post_payment(processor, enriched).await {
            Ok(()) => {
                self.breaker.record_success(processor).await;
                self.summary.increment(processor, request.amount_cents);
                Some(DispatchOutcome { processor })
            }
            Err(error) => {
                tracing::warn!(
                    processor = %processor,
                    correlation_id = %request.correlation_id,
                    %error,
                    "payment attempt failed"
                );
                self.breaker.record_failure(processor).await;
                None
            }
        }
    }
}
