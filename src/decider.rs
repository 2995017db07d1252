//! Decider: picks which processor to attempt first, given circuit
//! state and cached health. Read-only except for the lazy Open -> HalfOpen
//! promotion that happens inside `CircuitBreaker::get_state`.

use crate::circuit::{CircuitBreaker, CircuitState};
use crate::config::HealthConfig;
use crate::domain::{HealthSnapshot, ProcessorIdentity};
use crate::health::HealthCache;

pub struct Decider<'a> {
    breaker: &'a CircuitBreaker,
    health: &'a HealthCache,
    config: HealthConfig,
}

impl<'a> Decider<'a> {
    pub fn new(breaker: &'a CircuitBreaker, health: &'a HealthCache, config: HealthConfig) -> Self {
        Self { breaker, health, config }
    }

    /// Walks circuit state and cached health top-to-bottom to settle on
    /// which processor to try first. Independent reads (both circuit
    /// states up front, and both health snapshots once neither breaker is
    /// open) are fetched concurrently.
    pub async fn pick_primary_first(&self) -> ProcessorIdentity {
        use ProcessorIdentity::{Fallback, Primary};

        let (primary_state, fallback_state) = tokio::join!(
            self.breaker.get_state(Primary),
            self.breaker.get_state(Fallback)
        );
        let (primary_state, fallback_state) = (primary_state.state, fallback_state.state);

        // Primary is open: only route there if fallback is open too (both
        // down, fall through to primary as the default).
        if primary_state == CircuitState::Open {
            return if fallback_state == CircuitState::Open { Primary } else { Fallback };
        }

        // Primary is half-open: let a live probe decide whether it's ready
        // to take traffic again.
        if primary_state == CircuitState::HalfOpen {
            return match self.health.get_health(Primary).await {
                Some(health) if !health.failing => Primary,
                _ => Fallback,
            };
        }

        // Fallback is open and primary is already known not to be.
        if fallback_state == CircuitState::Open {
            return Primary;
        }

        // Fallback is half-open: same recovery-probe treatment as primary.
        if fallback_state == CircuitState::HalfOpen {
            return match self.health.get_health(Fallback).await {
                Some(health) if !health.failing => Fallback,
                _ => Primary,
            };
        }

        // Both breakers closed: prefer primary unless it's slow, in which
        // case fall over to a healthy fallback.
        let (primary_health, fallback_health) = tokio::join!(
            self.health.get_health(Primary),
            self.health.get_health(Fallback)
        );

        if is_fast_and_healthy(primary_health, self.config) {
            Primary
        } else if matches!(fallback_health, Some(h) if !h.failing) {
            Fallback
        } else {
            Primary
        }
    }
}

fn is_fast_and_healthy(snapshot: Option<HealthSnapshot>, config: HealthConfig) -> bool {
    match snapshot {
        Some(h) => !h.failing && h.min_response_time_ms < config.latency_threshold.as_millis() as u64,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerConfig;
    use crate::health::HealthProbe;
    use crate::store::InMemoryStore;
    use crate::upstream::UpstreamClients;
    use std::sync::Arc;

    async fn setup() -> (CircuitBreaker, HealthCache) {
        let store: Arc<dyn crate::store::CoordinationStore> = Arc::new(InMemoryStore::new());
        let breaker = CircuitBreaker::new(Arc::clone(&store), CircuitBreakerConfig::default());
        let config = crate::config::test_config("http://primary.invalid", "http://fallback.invalid");
        let clients = Arc::new(UpstreamClients::new(&config).unwrap());
        let probe = HealthProbe::new(clients);
        let health = HealthCache::new(store, probe, HealthConfig::default());
        (breaker, health)
    }

    #[tokio::test]
    async fn prefers_primary_when_both_closed_and_cache_empty() {
        let (breaker, health) = setup().await;
        let decider = Decider::new(&breaker, &health, HealthConfig::default());
        // Health cache is empty and the probe targets an invalid host, so
        // both reads resolve to "absent" -- the decider must still pick the
        // cheaper default, primary.
        assert_eq!(decider.pick_primary_first().await, ProcessorIdentity::Primary);
    }

    #[tokio::test]
    async fn avoids_open_primary() {
        let (breaker, health) = setup().await;
        for _ in 0..5 {
            breaker.record_failure(ProcessorIdentity::Primary).await;
        }
        let decider = Decider::new(&breaker, &health, HealthConfig::default());
        assert_eq!(decider.pick_primary_first().await, ProcessorIdentity::Fallback);
    }

    #[tokio::test]
    async fn both_open_falls_back_to_primary() {
        let (breaker, health) = setup().await;
        for _ in 0..5 {
            breaker.record_failure(ProcessorIdentity::Primary).await;
            breaker.record_failure(ProcessorIdentity::Fallback).await;
        }
        let decider = Decider::new(&breaker, &health, HealthConfig::default());
        assert_eq!(decider.pick_primary_first().await, ProcessorIdentity::Primary);
    }
}
