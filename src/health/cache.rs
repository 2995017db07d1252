//! HealthCache: a distributed, TTL'd view of each processor's health,
//! coalesced per-replica so a cache miss never triggers more than one
//! outstanding upstream probe per processor on this replica.

use super::probe::HealthProbe;
use crate::config::HealthConfig;
use crate::domain::{HealthSnapshot, ProcessorIdentity};
use crate::store::CoordinationStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

fn cache_key(processor: ProcessorIdentity) -> String {
    format!("health_check:{}", processor.as_key())
}

pub struct HealthCache {
    store: Arc<dyn CoordinationStore>,
    probe: HealthProbe,
    config: HealthConfig,
    /// Per-processor single-slot mutual exclusion, populated lazily and
    /// never shrinking — exactly the two processor identities that exist.
    /// A single-flight gate narrowed from an arbitrary request-keyed map
    /// down to the two fixed keys this cache ever needs.
    inflight: HashMap<ProcessorIdentity, Arc<Mutex<()>>>,
}

impl HealthCache {
    pub fn new(store: Arc<dyn CoordinationStore>, probe: HealthProbe, config: HealthConfig) -> Self {
        let mut inflight = HashMap::with_capacity(2);
        inflight.insert(ProcessorIdentity::Primary, Arc::new(Mutex::new(())));
        inflight.insert(ProcessorIdentity::Fallback, Arc::new(Mutex::new(())));
        Self {
            store,
            probe,
            config,
            inflight,
        }
    }

    pub async fn get_health(&self, processor: ProcessorIdentity) -> Option<HealthSnapshot> {
        if let Some(snapshot) = self.read_cached(processor).await {
            tracing::debug!(processor = %processor, "health cache hit");
            return Some(snapshot);
        }

        let gate = self
            .inflight
            .get(&processor)
            .expect("inflight map is pre-populated with both processor identities")
            .clone();
        let _permit = gate.lock().await;

        // Double-check: another task on this replica may have populated the
        // cache while we waited for the gate.
        if let Some(snapshot) = self.read_cached(processor).await {
            tracing::debug!(processor = %processor, "health cache hit after gate wait");
            return Some(snapshot);
        }

        tracing::debug!(processor = %processor, "health cache miss, probing upstream");
        let snapshot = self.probe.fetch_health(processor).await?;
        self.write_behind(processor, snapshot);
        Some(snapshot)
    }

    async fn read_cached(&self, processor: ProcessorIdentity) -> Option<HealthSnapshot> {
        match self.store.get(&cache_key(processor)).await {
            Ok(Some(raw)) => match serde_json::from_str::<HealthSnapshot>(&raw) {
                Ok(snapshot) => Some(snapshot),
                Err(source) => {
                    let error = crate::error::StoreError::Decode { key: cache_key(processor), source };
                    tracing::warn!(processor = %processor, %error, "discarding malformed health_check cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(processor = %processor, %error, "health cache read degraded to miss");
                None
            }
        }
    }

    /// Writes the freshly-probed snapshot into the shared store without
    /// blocking the caller — cache population happens write-behind as long
    /// as the TTL is still honored.
    fn write_behind(&self, processor: ProcessorIdentity, snapshot: HealthSnapshot) {
        let store = Arc::clone(&self.store);
        let ttl = self.config.cache_ttl;
        tokio::spawn(async move {
            let payload = match serde_json::to_string(&snapshot) {
                Ok(payload) => payload,
                Err(error) => {
                    tracing::warn!(%error, "failed to serialize health snapshot");
                    return;
                }
            };
            if let Err(error) = store.set(&cache_key(processor), &payload, ttl).await {
                tracing::warn!(processor = %processor, %error, "health cache write failed");
            }
        });
    }
}
