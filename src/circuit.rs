//! CircuitBreaker: a three-state machine per processor, persisted in
//! the shared coordination store so every replica observes (and converges
//! on) the same breaker state without a distributed lock.
//!
//! Unlike a sliding failure-rate window wrapping a single `tower::Service`,
//! this breaker needs simple, explicit failure/success counters shared
//! across replicas via Redis rather than an in-process ring buffer. It
//! keeps the familiar *shape* of that style of breaker — a tagged
//! `CircuitState` enum, a builder-supplied threshold configuration, and a
//! read-observe-transition discipline on every access — without the
//! in-process window.

use crate::config::CircuitBreakerConfig;
use crate::domain::ProcessorIdentity;
use crate::store::CoordinationStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tagged state enum, serialized as a short string rather than a magic
/// integer — the persisted form should read as plainly as the in-memory one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_state_change_at: DateTime<Utc>,
}

impl CircuitRecord {
    fn closed_at(now: DateTime<Utc>) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_at: None,
            last_state_change_at: now,
        }
    }
}

fn record_key(processor: ProcessorIdentity) -> String {
    format!("circuit_breaker:{}", processor.as_key())
}

pub struct CircuitBreaker {
    store: Arc<dyn CoordinationStore>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(store: Arc<dyn CoordinationStore>, config: CircuitBreakerConfig) -> Self {
        Self { store, config }
    }

    /// Reads the current state, applying the lazy Open -> HalfOpen cooldown
    /// promotion on the way out. On coordination-store failure, degrades to
    /// the default `Closed` record rather than propagating — the breaker is
    /// advisory.
    pub async fn get_state(&self, processor: ProcessorIdentity) -> CircuitRecord {
        let now = Utc::now();
        let mut record = self.read(processor).await.unwrap_or_else(|| CircuitRecord::closed_at(now));

        if record.state == CircuitState::Open {
            let elapsed = now.signed_duration_since(record.last_state_change_at);
            if elapsed.to_std().unwrap_or_default() > self.config.cooldown {
                record.state = CircuitState::HalfOpen;
                record.success_count = 0;
                record.last_state_change_at = now;
                tracing::info!(processor = %processor, "circuit breaker cooldown elapsed, probing half-open");
                self.write(processor, &record).await;
            }
        }

        record
    }

    /// `RecordSuccess`. No-op in `Closed` (success doesn't reset the failure
    /// counter there — only an open->closed transition does). Increments
    /// `success_count` in `HalfOpen`, closing the breaker once
    /// `success_threshold` is reached.
    pub async fn record_success(&self, processor: ProcessorIdentity) {
        let mut record = self.get_state(processor).await;

        match record.state {
            CircuitState::Closed => return,
            CircuitState::Open => return, // dropped: no observations while open
            CircuitState::HalfOpen => {
                record.success_count += 1;
                if record.success_count >= self.config.success_threshold {
                    record.state = CircuitState::Closed;
                    record.failure_count = 0;
                    record.success_count = 0;
                    record.last_state_change_at = Utc::now();
                    tracing::info!(processor = %processor, "circuit breaker closed after successful probes");
                }
            }
        }

        self.write(processor, &record).await;
    }

    /// `RecordFailure`. Increments `failure_count` in `Closed` until it
    /// trips to `Open`; any failure in `HalfOpen` reopens immediately;
    /// dropped while already `Open`.
    pub async fn record_failure(&self, processor: ProcessorIdentity) {
        let mut record = self.get_state(processor).await;
        let now = Utc::now();

        match record.state {
            CircuitState::Open => return,
            CircuitState::Closed => {
                record.failure_count += 1;
                record.last_failure_at = Some(now);
                if record.failure_count >= self.config.failure_threshold {
                    record.state = CircuitState::Open;
                    record.failure_count = 0;
                    record.success_count = 0;
                    record.last_state_change_at = now;
                    tracing::info!(processor = %processor, "circuit breaker opened after failure threshold");
                }
            }
            CircuitState::HalfOpen => {
                record.state = CircuitState::Open;
                record.failure_count = 0;
                record.success_count = 0;
                record.last_failure_at = Some(now);
                record.last_state_change_at = now;
                tracing::info!(processor = %processor, "circuit breaker reopened on half-open probe failure");
            }
        }

        self.write(processor, &record).await;
    }

    async fn read(&self, processor: ProcessorIdentity) -> Option<CircuitRecord> {
        match self.store.get(&record_key(processor)).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(record) => Some(record),
                Err(source) => {
                    let error = crate::error::StoreError::Decode { key: record_key(processor), source };
                    tracing::warn!(processor = %processor, %error, "discarding malformed circuit_breaker record");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(processor = %processor, %error, "circuit breaker read degraded to closed default");
                None
            }
        }
    }

    async fn write(&self, processor: ProcessorIdentity, record: &CircuitRecord) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(%error, "failed to serialize circuit breaker record");
                return;
            }
        };
        if let Err(error) = self
            .store
            .set(&record_key(processor), &payload, self.config.record_ttl)
            .await
        {
            tracing::warn!(processor = %processor, %error, "circuit breaker write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(Arc::new(InMemoryStore::new()), CircuitBreakerConfig::default())
    }

    #[tokio::test]
    async fn closed_by_default() {
        let cb = breaker();
        let record = cb.get_state(ProcessorIdentity::Primary).await;
        assert_eq!(record.state, CircuitState::Closed);
        assert_eq!(record.failure_count, 0);
    }

    #[tokio::test]
    async fn opens_after_failure_threshold_and_resets_counters() {
        let cb = breaker();
        for _ in 0..4 {
            cb.record_failure(ProcessorIdentity::Primary).await;
        }
        let record = cb.get_state(ProcessorIdentity::Primary).await;
        assert_eq!(record.state, CircuitState::Closed);
        assert_eq!(record.failure_count, 4);

        cb.record_failure(ProcessorIdentity::Primary).await;
        let record = cb.get_state(ProcessorIdentity::Primary).await;
        assert_eq!(record.state, CircuitState::Open);
        assert_eq!(record.failure_count, 0);
        assert_eq!(record.success_count, 0);
    }

    #[tokio::test]
    async fn dropped_observations_while_open() {
        let cb = breaker();
        for _ in 0..5 {
            cb.record_failure(ProcessorIdentity::Primary).await;
        }
        assert_eq!(
            cb.get_state(ProcessorIdentity::Primary).await.state,
            CircuitState::Open
        );

        cb.record_failure(ProcessorIdentity::Primary).await;
        cb.record_success(ProcessorIdentity::Primary).await;
        let record = cb.get_state(ProcessorIdentity::Primary).await;
        assert_eq!(record.state, CircuitState::Open);
        assert_eq!(record.failure_count, 0);
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold() {
        let cb = CircuitBreaker::new(
            Arc::new(InMemoryStore::new()),
            CircuitBreakerConfig {
                cooldown: std::time::Duration::from_millis(0),
                ..CircuitBreakerConfig::default()
            },
        );
        for _ in 0..5 {
            cb.record_failure(ProcessorIdentity::Primary).await;
        }
        // cooldown is zero, so the very next read promotes Open -> HalfOpen.
        let record = cb.get_state(ProcessorIdentity::Primary).await;
        assert_eq!(record.state, CircuitState::HalfOpen);

        cb.record_success(ProcessorIdentity::Primary).await;
        cb.record_success(ProcessorIdentity::Primary).await;
        assert_eq!(
            cb.get_state(ProcessorIdentity::Primary).await.state,
            CircuitState::HalfOpen
        );
        cb.record_success(ProcessorIdentity::Primary).await;
        assert_eq!(
            cb.get_state(ProcessorIdentity::Primary).await.state,
            CircuitState::Closed
        );
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let cb = CircuitBreaker::new(
            Arc::new(InMemoryStore::new()),
            CircuitBreakerConfig {
                cooldown: std::time::Duration::from_millis(0),
                ..CircuitBreakerConfig::default()
            },
        );
        for _ in 0..5 {
            cb.record_failure(ProcessorIdentity::Primary).await;
        }
        assert_eq!(
            cb.get_state(ProcessorIdentity::Primary).await.state,
            CircuitState::HalfOpen
        );
        cb.record_failure(ProcessorIdentity::Primary).await;
        assert_eq!(
            cb.get_state(ProcessorIdentity::Primary).await.state,
            CircuitState::Open
        );
    }
}
