//! End-to-end dispatch scenarios driven against an in-memory coordination
//! store and wiremock stand-ins for the two upstream processors.

use processor_gateway::circuit::CircuitBreaker;
use processor_gateway::config::{test_config, CircuitBreakerConfig};
use processor_gateway::dispatcher::Dispatcher;
use processor_gateway::domain::{HealthSnapshot, PaymentRequest, ProcessorIdentity};
use processor_gateway::health::{HealthCache, HealthProbe};
use processor_gateway::store::{CoordinationStore, InMemoryStore};
use processor_gateway::summary::SummaryStore;
use processor_gateway::upstream::UpstreamClients;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    dispatcher: Dispatcher,
    summary: Arc<SummaryStore>,
    breaker: Arc<CircuitBreaker>,
    primary: MockServer,
    fallback: MockServer,
}

async fn harness() -> Harness {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let config = test_config(primary.uri(), fallback.uri());
    let store: Arc<dyn CoordinationStore> = Arc::new(InMemoryStore::new());
    let upstream = Arc::new(UpstreamClients::new(&config).unwrap());
    let breaker_for_dispatcher = CircuitBreaker::new(Arc::clone(&store), CircuitBreakerConfig::default());
    let breaker_for_assertions = Arc::new(CircuitBreaker::new(Arc::clone(&store), CircuitBreakerConfig::default()));
    let probe = HealthProbe::new(Arc::clone(&upstream));
    let health = HealthCache::new(Arc::clone(&store), probe, config.health);
    let summary = Arc::new(SummaryStore::new(Arc::clone(&store)));

    let dispatcher = Dispatcher::new(
        breaker_for_dispatcher,
        health,
        Arc::clone(&summary),
        upstream,
        config.dispatch.clone(),
        config.health,
    );

    Harness {
        dispatcher,
        summary,
        breaker: breaker_for_assertions,
        primary,
        fallback,
    }
}

async fn stub_health(server: &MockServer, snapshot: HealthSnapshot) {
    Mock::given(method("GET"))
        .and(path("/payments/service-health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "failing": snapshot.failing,
            "minResponseTime": snapshot.min_response_time_ms,
        })))
        .mount(server)
        .await;
}

async fn stub_payment(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Primary healthy, both stubs return 200 -> exactly one primary POST,
/// fallback untouched, summary incremented only for primary.
#[tokio::test]
async fn happy_path_primary_healthy() {
    let h = harness().await;
    stub_health(&h.primary, HealthSnapshot { failing: false, min_response_time_ms: 45 }).await;
    stub_payment(&h.primary, 200).await;

    let request = PaymentRequest::new(
        "4a7901b8-7d26-4d9d-aa19-4dc1c7cf60b3".parse::<Uuid>().unwrap(),
        "19.90".parse().unwrap(),
    );
    let outcome = h.dispatcher.process_payment(request).await.unwrap();
    assert_eq!(outcome.processor, ProcessorIdentity::Primary);

    let totals = h.summary.get().await;
    assert_eq!(totals.primary.total_requests, 1);
    assert_eq!(totals.primary.total_amount_cents, 1990);
    assert_eq!(totals.fallback.total_requests, 0);

    // The upstream wire contract requires `amount` as a bare JSON number,
    // not a quoted string.
    let posted = h.primary.received_requests().await.unwrap();
    let payment_post = posted.iter().find(|r| r.url.path() == "/payments").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&payment_post.body).unwrap();
    assert!(body["amount"].is_number(), "amount must serialize as a JSON number, got {}", body["amount"]);
    assert_eq!(body["amount"], serde_json::json!(19.9));
}

/// Primary reports high latency, fallback reports low latency -> the
/// decider routes to fallback even though primary is healthy (not failing).
#[tokio::test]
async fn primary_slow_fallback_faster() {
    let h = harness().await;
    stub_health(&h.primary, HealthSnapshot { failing: false, min_response_time_ms: 1200 }).await;
    stub_health(&h.fallback, HealthSnapshot { failing: false, min_response_time_ms: 250 }).await;
    stub_payment(&h.primary, 200).await;
    stub_payment(&h.fallback, 200).await;

    let request = PaymentRequest::new(Uuid::new_v4(), "10.00".parse().unwrap());
    let outcome = h.dispatcher.process_payment(request).await.unwrap();
    assert_eq!(outcome.processor, ProcessorIdentity::Fallback);

    let totals = h.summary.get().await;
    assert_eq!(totals.fallback.total_requests, 1);
    assert_eq!(totals.fallback.total_amount_cents, 1000);
    assert_eq!(totals.primary.total_requests, 0);
}

/// Primary reports failing and its POST fails, fallback succeeds ->
/// exactly one failure recorded against primary's breaker.
#[tokio::test]
async fn primary_failing_fallback_healthy() {
    let h = harness().await;
    stub_health(&h.primary, HealthSnapshot { failing: true, min_response_time_ms: 10 }).await;
    stub_payment(&h.primary, 500).await;
    stub_payment(&h.fallback, 200).await;

    let request = PaymentRequest::new(Uuid::new_v4(), "5.00".parse().unwrap());
    let outcome = h.dispatcher.process_payment(request).await.unwrap();
    assert_eq!(outcome.processor, ProcessorIdentity::Fallback);

    let record = h.breaker.get_state(ProcessorIdentity::Primary).await;
    assert_eq!(record.failure_count, 1);
}

/// Both processors reject every attempt -> exactly 2 * max_tries upstream
/// POSTs, failure surfaced, no summary counters move.
#[tokio::test]
async fn both_dead_failure_surfaced_after_bounded_attempts() {
    let h = harness().await;
    stub_payment(&h.primary, 500).await;
    stub_payment(&h.fallback, 500).await;

    let request = PaymentRequest::new(Uuid::new_v4(), "1.00".parse().unwrap());
    let result = h.dispatcher.process_payment(request).await;
    assert!(result.is_err());

    let primary_posts = h
        .primary
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/payments")
        .count();
    let fallback_posts = h
        .fallback
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/payments")
        .count();
    assert_eq!(primary_posts, 2);
    assert_eq!(fallback_posts, 2);

    let totals = h.summary.get().await;
    assert_eq!(totals.primary.total_requests, 0);
    assert_eq!(totals.fallback.total_requests, 0);

    let primary_record = h.breaker.get_state(ProcessorIdentity::Primary).await;
    let fallback_record = h.breaker.get_state(ProcessorIdentity::Fallback).await;
    assert_eq!(primary_record.failure_count, 2);
    assert_eq!(fallback_record.failure_count, 2);
}
