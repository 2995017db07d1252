//! Thin Axum front-end. Ingress is explicitly out of core scope — these
//! handlers do nothing but validate/deserialize the wire format and call
//! straight into the core; see `GatewayApp` for the components they share.

use crate::domain::PaymentRequest;
use crate::GatewayApp;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post};
use axum::Router;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn router(app: GatewayApp) -> Router {
    Router::new()
        .route("/payments", post(create_payment))
        .route("/payments-summary", get(payments_summary).delete(reset_summary))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .with_state(app)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody {
    correlation_id: Uuid,
    amount: Decimal,
}

async fn create_payment(
    State(app): State<GatewayApp>,
    Json(body): Json<CreatePaymentBody>,
) -> impl IntoResponse {
    if body.amount <= Decimal::ZERO || body.amount.scale() > 2 {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let request = PaymentRequest::new(body.correlation_id, body.amount);
    match app.dispatcher.process_payment(request).await {
        Ok(_outcome) => StatusCode::OK.into_response(),
        Err(_exhausted) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct SummaryWindow {
    #[allow(dead_code)]
    from: Option<String>,
    #[allow(dead_code)]
    to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessorSummary {
    total_requests: i64,
    /// Serialized as a bare JSON number, matching the upstream wire format
    /// rather than `rust_decimal`'s default quoted-string representation.
    #[serde(with = "rust_decimal::serde::float")]
    total_amount: Decimal,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    primary: ProcessorSummary,
    fallback: ProcessorSummary,
}

/// `from`/`to` are accepted for API compatibility and otherwise ignored —
/// this gateway never time-buckets and always reports the global totals,
/// matching the upstream system's documented (if unusual) behavior.
async fn payments_summary(
    State(app): State<GatewayApp>,
    Query(_window): Query<SummaryWindow>,
) -> impl IntoResponse {
    let totals = app.summary.get().await;
    Json(SummaryResponse {
        primary: ProcessorSummary {
            total_requests: totals.primary.total_requests,
            total_amount: totals.primary.total_amount(),
        },
        fallback: ProcessorSummary {
            total_requests: totals.fallback.total_requests,
            total_amount: totals.fallback.total_amount(),
        },
    })
}

async fn reset_summary(State(app): State<GatewayApp>) -> impl IntoResponse {
    app.summary.reset().await;
    StatusCode::OK
}

async fn health_live() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}

async fn health_ready(State(app): State<GatewayApp>) -> impl IntoResponse {
    match app.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ready" }))),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "degraded", "reason": "coordination store unreachable" })),
        ),
    }
}
