//! The gateway's internal error taxonomy.
//!
//! Gives every resilience concern its own error variant, but specialized:
//! this binary has exactly one caller-visible failure (`DispatchExhausted`).
//! Everything else is logged and absorbed at the module boundary that
//! produced it — the store, the health probe, and the upstream client
//! degrade gracefully rather than propagate.

use thiserror::Error;

/// Errors surfaced by the coordination store (Redis). Always caught and
/// logged by callers; never reaches the caller of `processPayment`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("coordination store connection failed: {0}")]
    Connection(String),

    #[error("coordination store command timed out")]
    Timeout,

    #[error("coordination store returned malformed data for key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by calls to an upstream processor (payment POST or health
/// GET). Always converted to `None`/failure by the caller; kept as a typed
/// error only so call sites can log a reason.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {processor} timed out after {millis}ms")]
    Timeout { processor: &'static str, millis: u64 },

    #[error("transport error calling {processor}: {source}")]
    Transport {
        processor: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{processor} responded with non-2xx status {status}")]
    Status { processor: &'static str, status: u16 },

    #[error("{processor} returned a body that could not be decoded: {source}")]
    Decode {
        processor: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// The only error the core ever hands back to ingress: both processors
/// rejected every attempt within the retry budget.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("payment dispatch exhausted its retry budget against both processors")]
pub struct DispatchExhausted;
