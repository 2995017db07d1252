//! `processor-gateway` — a stateless payment-dispatch gateway that forwards
//! validated payment requests to one of two upstream processors, coordinating
//! health and circuit-breaker state across replicas through a shared Redis
//! instance.
//!
//! The core resilience engine lives in [`health`], [`circuit`], [`decider`],
//! [`dispatcher`], and [`summary`]. Everything else (`config`, `error`,
//! `store`, `upstream`, `ingress`) is the ambient plumbing that makes the
//! engine a runnable service.

pub mod circuit;
pub mod config;
pub mod decider;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod health;
pub mod ingress;
pub mod store;
pub mod summary;
pub mod upstream;

use crate::circuit::CircuitBreaker;
use crate::config::GatewayConfig;
use crate::dispatcher::Dispatcher;
use crate::health::{HealthCache, HealthProbe};
use crate::store::CoordinationStore;
use crate::summary::SummaryStore;
use crate::upstream::UpstreamClients;
use std::sync::Arc;

/// The small set of long-lived components a replica constructs once at
/// process start and shares across every request handler — no dependency
/// injection container, just explicit construction and `Arc` sharing.
#[derive(Clone)]
pub struct GatewayApp {
    pub dispatcher: Arc<Dispatcher>,
    pub summary: Arc<SummaryStore>,
    pub store: Arc<dyn CoordinationStore>,
}

impl GatewayApp {
    pub fn build(config: &GatewayConfig, store: Arc<dyn CoordinationStore>) -> reqwest::Result<Self> {
        let upstream = Arc::new(UpstreamClients::new(config)?);
        let probe = HealthProbe::new(Arc::clone(&upstream));
        let health = HealthCache::new(Arc::clone(&store), probe, config.health);
        let breaker = CircuitBreaker::new(Arc::clone(&store), config.circuit_breaker);
        let summary = Arc::new(SummaryStore::new(Arc::clone(&store)));

        let dispatcher = Arc::new(Dispatcher::new(
            breaker,
            health,
            Arc::clone(&summary),
            upstream,
            config.dispatch.clone(),
            config.health,
        ));

        Ok(Self {
            dispatcher,
            summary,
            store,
        })
    }
}
