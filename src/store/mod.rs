//! The `CoordinationStore` abstraction over the shared key/value store.
//!
//! The store is treated as an external collaborator providing atomic
//! increments, get/set with TTL, strings, and delete — so the trait is
//! deliberately narrow: it only has the operations the health cache, circuit
//! breaker, and summary store actually use. `redis_store` is the production
//! implementation; `memory` is an in-process fake used by tests and,
//! indirectly, by the in-memory degraded-mode story for local development.

mod memory;
mod redis_store;

pub use memory::{DisabledStore, InMemoryStore};
pub use redis_store::RedisStore;

use crate::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;

/// Operations the resilience engine needs from the shared coordination
/// store. Every method degrades to a caller-visible `Err` rather than
/// panicking; callers are responsible for the "degrade on failure" policy —
/// this trait only reports, it never itself decides to swallow.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Reads a string value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a string value with a TTL, replacing any prior value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically increments an integer counter (creating it at `delta` if
    /// absent) and returns the resulting value. Used for `payment_summary`
    /// request counts.
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError>;

    /// Atomically increments a counter by a fractional amount, used for the
    /// `payment_summary` amount counters. Amounts are modeled as an integer
    /// minor-unit counter, so `incr_by` already covers it, but the method is
    /// kept distinct in the trait for call-site clarity (amount vs.
    /// request-count semantics).
    async fn incr_amount(&self, key: &str, delta_cents: i64) -> Result<i64, StoreError> {
        self.incr_by(key, delta_cents).await
    }

    /// Deletes a key if present. Used by `SummaryStore::reset`.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Lightweight reachability check for the `/health/ready` endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
