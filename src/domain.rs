//! Shared data types that flow between the gateway's core components.
//!
//! These are the entities from the data model: requests as they arrive from
//! ingress, the enriched form the dispatcher actually sends upstream, and the
//! small set of identities and snapshots the resilience engine persists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A validated payment request as handed to the dispatcher.
///
/// Immutable and consumed once; `correlation_id` doubles as the idempotency
/// key upstream uses to de-duplicate retried deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRequest {
    pub correlation_id: Uuid,
    pub amount_cents: i64,
}

impl PaymentRequest {
    pub fn new(correlation_id: Uuid, amount: Decimal) -> Self {
        Self {
            correlation_id,
            amount_cents: decimal_to_cents(amount),
        }
    }

    pub fn amount(&self) -> Decimal {
        cents_to_decimal(self.amount_cents)
    }
}

/// Converts a positive, two-fractional-digit decimal into integer cents.
pub fn decimal_to_cents(amount: Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    (amount.round_dp(2) * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(0)
}

pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// The payload actually sent upstream. Built once per dispatch and reused,
/// unmodified, across every retry attempt so upstream observes a stable
/// creation time regardless of how many times it is retried.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedPayment {
    pub correlation_id: Uuid,
    /// Serialized as a bare JSON number (`19.9`), not a quoted string — the
    /// upstream wire contract calls for `amount` as a number with 2
    /// fractional digits.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub requested_at: DateTime<Utc>,
}

impl EnrichedPayment {
    pub fn new(request: PaymentRequest, requested_at: DateTime<Utc>) -> Self {
        Self {
            correlation_id: request.correlation_id,
            amount: request.amount(),
            requested_at,
        }
    }
}

/// The two upstream processors this gateway ever talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorIdentity {
    Primary,
    Fallback,
}

impl ProcessorIdentity {
    /// The other processor — used when building the cross-processor fallback.
    pub fn other(self) -> Self {
        match self {
            ProcessorIdentity::Primary => ProcessorIdentity::Fallback,
            ProcessorIdentity::Fallback => ProcessorIdentity::Primary,
        }
    }

    /// Stable lowercase tag used to key coordination-store records.
    pub fn as_key(self) -> &'static str {
        match self {
            ProcessorIdentity::Primary => "primary",
            ProcessorIdentity::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ProcessorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// A cached observation of an upstream processor's health, as reported by
/// its `service-health` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub failing: bool,
    pub min_response_time_ms: u64,
}
