//! Exercises dispatch with the coordination store completely unreachable:
//! the dispatcher must still attempt primary then fallback and return the
//! correct outcome, degrading every advisory read/write to its default
//! rather than failing the payment itself.

use processor_gateway::circuit::CircuitBreaker;
use processor_gateway::config::{test_config, CircuitBreakerConfig};
use processor_gateway::dispatcher::Dispatcher;
use processor_gateway::domain::{PaymentRequest, ProcessorIdentity};
use processor_gateway::health::{HealthCache, HealthProbe};
use processor_gateway::store::{CoordinationStore, DisabledStore};
use processor_gateway::summary::SummaryStore;
use processor_gateway::upstream::UpstreamClients;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_dispatcher(primary: &MockServer, fallback: &MockServer) -> Dispatcher {
    let config = test_config(primary.uri(), fallback.uri());
    let store: Arc<dyn CoordinationStore> = Arc::new(DisabledStore);
    let upstream = Arc::new(UpstreamClients::new(&config).unwrap());
    let breaker = CircuitBreaker::new(Arc::clone(&store), CircuitBreakerConfig::default());
    let probe = HealthProbe::new(Arc::clone(&upstream));
    let health = HealthCache::new(Arc::clone(&store), probe, config.health);
    let summary = Arc::new(SummaryStore::new(store));
    Dispatcher::new(breaker, health, summary, upstream, config.dispatch, config.health)
}

/// With every store read failing, the breaker reads as closed and the
/// health cache reads as a miss for both processors on every call, so the
/// decider always falls through to the default preference, primary.
#[tokio::test]
async fn dispatch_still_succeeds_with_store_unreachable() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&primary)
        .await;

    let dispatcher = build_dispatcher(&primary, &fallback);
    let request = PaymentRequest::new(Uuid::new_v4(), "8.00".parse().unwrap());
    let outcome = dispatcher.process_payment(request).await.unwrap();
    assert_eq!(outcome.processor, ProcessorIdentity::Primary);
}

/// Primary failing still routes to fallback even though the breaker can
/// never durably record the failure -- the decision is made fresh each
/// call from whatever the (always-default) breaker state happens to be.
#[tokio::test]
async fn falls_back_when_primary_fails_even_without_durable_breaker_state() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&fallback)
        .await;

    let dispatcher = build_dispatcher(&primary, &fallback);
    let request = PaymentRequest::new(Uuid::new_v4(), "8.00".parse().unwrap());
    let outcome = dispatcher.process_payment(request).await.unwrap();
    assert_eq!(outcome.processor, ProcessorIdentity::Fallback);
}
