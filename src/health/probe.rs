//! HealthProbe: the raw upstream health call.
//!
//! Deliberately thin: all the HTTP mechanics (timeout, JSON decoding,
//! leniency toward missing fields) live in [`crate::upstream::UpstreamClients`]
//! since they're shared with payment POSTs' client construction. This type
//! exists so the rest of the engine depends on a named component rather than
//! reaching into the upstream client directly.

use crate::domain::{HealthSnapshot, ProcessorIdentity};
use crate::upstream::UpstreamClients;
use std::sync::Arc;

#[derive(Clone)]
pub struct HealthProbe {
    clients: Arc<UpstreamClients>,
}

impl HealthProbe {
    pub fn new(clients: Arc<UpstreamClients>) -> Self {
        Self { clients }
    }

    /// Returns `None` on any non-2xx, timeout, transport error, or
    /// incomplete body — "absent" is the only failure mode this component
    /// exposes.
    pub async fn fetch_health(&self, processor: ProcessorIdentity) -> Option<HealthSnapshot> {
        self.clients.fetch_health(processor).await
    }
}
