//! SummaryStore: aggregate counters per processor.
//!
//! Amounts are tracked as integer cents, a minor-unit counter, to keep the
//! atomic increments exact; the public `get` result converts back to a
//! two-decimal `Decimal` at the boundary.

use crate::domain::{cents_to_decimal, ProcessorIdentity};
use crate::store::CoordinationStore;
use rust_decimal::Decimal;
use std::sync::Arc;

fn requests_key(processor: ProcessorIdentity) -> String {
    format!("payment_summary:{}:requests", processor.as_key())
}

fn amount_key(processor: ProcessorIdentity) -> String {
    format!("payment_summary:{}:amount", processor.as_key())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessorTotals {
    pub total_requests: i64,
    pub total_amount_cents: i64,
}

impl ProcessorTotals {
    pub fn total_amount(&self) -> Decimal {
        cents_to_decimal(self.total_amount_cents)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryTotals {
    pub primary: ProcessorTotals,
    pub fallback: ProcessorTotals,
}

pub struct SummaryStore {
    store: Arc<dyn CoordinationStore>,
}

impl SummaryStore {
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self { store }
    }

    /// Fire-and-forget: the counters need not be durable before the HTTP
    /// response is sent, so the caller does not await this beyond spawning
    /// it. Only ever called after upstream has confirmed success — never
    /// speculatively.
    pub fn increment(&self, processor: ProcessorIdentity, amount_cents: i64) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(error) = store.incr_by(&requests_key(processor), 1).await {
                tracing::warn!(processor = %processor, %error, "summary request-count increment failed");
            }
            if let Err(error) = store.incr_amount(&amount_key(processor), amount_cents).await {
                tracing::warn!(processor = %processor, %error, "summary amount increment failed");
            }
        });
    }

    /// The time-window parameters accepted at the ingress layer are
    /// intentionally not threaded through here: this gateway never
    /// time-buckets, and always returns the global totals.
    pub async fn get(&self) -> SummaryTotals {
        SummaryTotals {
            primary: self.read_processor(ProcessorIdentity::Primary).await,
            fallback: self.read_processor(ProcessorIdentity::Fallback).await,
        }
    }

    pub async fn reset(&self) {
        for processor in [ProcessorIdentity::Primary, ProcessorIdentity::Fallback] {
            if let Err(error) = self.store.delete(&requests_key(processor)).await {
                tracing::warn!(processor = %processor, %error, "failed to reset request counter");
            }
            if let Err(error) = self.store.delete(&amount_key(processor)).await {
                tracing::warn!(processor = %processor, %error, "failed to reset amount counter");
            }
        }
    }

    async fn read_processor(&self, processor: ProcessorIdentity) -> ProcessorTotals {
        let total_requests = self.read_counter(&requests_key(processor)).await;
        let total_amount_cents = self.read_counter(&amount_key(processor)).await;
        ProcessorTotals { total_requests, total_amount_cents }
    }

    async fn read_counter(&self, key: &str) -> i64 {
        match self.store.get(key).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(error) => {
                tracing::warn!(%key, %error, "summary counter read degraded to zero");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn increments_and_reads_back() {
        let store: Arc<dyn CoordinationStore> = Arc::new(InMemoryStore::new());
        let summary = SummaryStore::new(Arc::clone(&store));

        summary.increment(ProcessorIdentity::Primary, 1990);
        // increment is fire-and-forget; give the spawned task a chance to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let totals = summary.get().await;
        assert_eq!(totals.primary.total_requests, 1);
        assert_eq!(totals.primary.total_amount_cents, 1990);
        assert_eq!(totals.fallback.total_requests, 0);
    }

    #[tokio::test]
    async fn reset_clears_all_counters() {
        let store: Arc<dyn CoordinationStore> = Arc::new(InMemoryStore::new());
        let summary = SummaryStore::new(Arc::clone(&store));
        summary.increment(ProcessorIdentity::Fallback, 500);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        summary.reset().await;
        let totals = summary.get().await;
        assert_eq!(totals.fallback.total_requests, 0);
        assert_eq!(totals.fallback.total_amount_cents, 0);
    }
}
