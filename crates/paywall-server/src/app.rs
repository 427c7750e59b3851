use std::sync::Arc;

use axum::{Json, Router, response::IntoResponse, routing::get};
use paywall_core::{provider::PaymentProvider, store::AccessStore};
use paywall_gate::{gate::AccessGate, routes};
use serde_json::json;
use tower_http::trace::TraceLayer;

/// The full service: paywall endpoints under `/api` plus `/health`.
pub fn build_app<P, S>(gate: Arc<AccessGate<P, S>>) -> Router
where
    P: PaymentProvider + 'static,
    S: AccessStore + 'static,
{
    Router::new()
        .route("/health", get(health))
        .nest("/api", routes::router(gate))
        .layer(TraceLayer::new_for_http())
}

/// `GET /health`
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
