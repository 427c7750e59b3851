//! HTTP endpoints over an [`AccessGate`].
//!
//! | Route | Operation |
//! |---|---|
//! | `POST /invoices` | [`AccessGate::request_invoice`] |
//! | `GET /invoices/{invoice_id}` | [`AccessGate::poll_invoice`] |
//! | `POST /invoices/{invoice_id}/settle` | [`AccessGate::settle_and_grant`] |
//! | `POST /access` | [`AccessGate::confirm_and_grant`] |
//! | `POST /content/render` | [`AccessGate::render_content`] |
//!
//! Every response is an [`Envelope`]; failures carry the status mapping of
//! [`GateError`].

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, header::SET_COOKIE},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use paywall_core::{
    provider::PaymentProvider,
    store::AccessStore,
    types::{InvoiceId, ResourceId},
};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::{
    errors::{ErrorResponse, GateError},
    gate::{AccessGate, AccessState, InvoicePoll, InvoiceRequest},
    response::Envelope,
    session::{Subject, session_layer},
};

/// Routes for `gate`, wrapped in the session middleware.
pub fn router<P, S>(gate: Arc<AccessGate<P, S>>) -> Router
where
    P: PaymentProvider + 'static,
    S: AccessStore + 'static,
{
    Router::new()
        .route("/invoices", post(create_invoice::<P, S>))
        .route("/invoices/{invoice_id}", get(check_invoice::<P, S>))
        .route("/invoices/{invoice_id}/settle", post(settle_invoice::<P, S>))
        .route("/access", post(grant_access::<P, S>))
        .route("/content/render", post(render_content::<P, S>))
        .layer(middleware::from_fn(session_layer))
        .with_state(gate)
}

type GateState<P, S> = State<Arc<AccessGate<P, S>>>;

fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, GateError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| GateError::invalid_request(rejection.body_text()))
}

/// Form clients send numbers as strings; accept both.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: String,
    #[serde(default)]
    pub currency: String,
    #[serde(alias = "currentPage")]
    pub redirect_url: Url,
    #[serde(alias = "postId")]
    pub resource_id: ResourceId,
}

#[derive(Debug, Serialize)]
pub struct InvoiceCreatedData {
    pub invoice_url: String,
    pub invoice_id: InvoiceId,
}

async fn create_invoice<P, S>(
    State(gate): GateState<P, S>,
    Extension(Subject(subject)): Extension<Subject>,
    payload: Result<Json<CreateInvoiceBody>, JsonRejection>,
) -> Result<Response, ErrorResponse>
where
    P: PaymentProvider + 'static,
    S: AccessStore + 'static,
{
    let body = json_payload(payload)?;
    let request = InvoiceRequest::builder()
        .amount(body.amount)
        .currency(body.currency)
        .redirect_url(body.redirect_url)
        .resource_id(body.resource_id)
        .subject_id(subject)
        .build();

    let created = gate.request_invoice(request).await?;

    let cookie = format!(
        "{}={}; Max-Age={}; Path=/",
        created.pending.cookie_name(),
        created.pending.cookie_value(),
        gate.config.pending_ttl_secs
    );
    let mut response = Envelope::success(InvoiceCreatedData {
        invoice_url: created.checkout_url,
        invoice_id: created.invoice_id,
    })
    .into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }

    Ok(response)
}

async fn check_invoice<P, S>(
    State(gate): GateState<P, S>,
    Path(invoice_id): Path<String>,
) -> Result<Envelope<InvoicePoll>, ErrorResponse>
where
    P: PaymentProvider + 'static,
    S: AccessStore + 'static,
{
    let poll = gate.poll_invoice(&InvoiceId::new(invoice_id)).await?;
    Ok(Envelope::success(poll))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantBody {
    #[serde(alias = "post_id", alias = "postId")]
    pub resource_id: ResourceId,
    pub duration: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantData {
    pub resource_id: ResourceId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleData {
    pub granted: bool,
    #[serde(flatten)]
    pub poll: InvoicePoll,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

async fn settle_invoice<P, S>(
    State(gate): GateState<P, S>,
    Extension(Subject(subject)): Extension<Subject>,
    Path(invoice_id): Path<String>,
    payload: Result<Json<GrantBody>, JsonRejection>,
) -> Result<Envelope<SettleData>, ErrorResponse>
where
    P: PaymentProvider + 'static,
    S: AccessStore + 'static,
{
    let body = json_payload(payload)?;
    let outcome = gate
        .settle_and_grant(
            &InvoiceId::new(invoice_id),
            body.resource_id,
            &subject,
            body.duration,
        )
        .await?;

    Ok(Envelope::success(SettleData {
        granted: outcome.is_granted(),
        expires_at: outcome.grant.as_ref().map(|grant| grant.expires_at()),
        poll: outcome.poll,
    }))
}

async fn grant_access<P, S>(
    State(gate): GateState<P, S>,
    Extension(Subject(subject)): Extension<Subject>,
    payload: Result<Json<GrantBody>, JsonRejection>,
) -> Result<Envelope<GrantData>, ErrorResponse>
where
    P: PaymentProvider + 'static,
    S: AccessStore + 'static,
{
    let body = json_payload(payload)?;
    let grant = gate
        .confirm_and_grant(body.resource_id, &subject, body.duration)
        .await?;

    Ok(Envelope::success(GrantData {
        resource_id: grant.resource_id(),
        expires_at: grant.expires_at(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderBody {
    #[serde(alias = "postId")]
    pub resource_id: ResourceId,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct RenderData {
    pub content: String,
    pub state: AccessState,
}

async fn render_content<P, S>(
    State(gate): GateState<P, S>,
    Extension(Subject(subject)): Extension<Subject>,
    payload: Result<Json<RenderBody>, JsonRejection>,
) -> Result<Envelope<RenderData>, ErrorResponse>
where
    P: PaymentProvider + 'static,
    S: AccessStore + 'static,
{
    let body = json_payload(payload)?;
    let content = gate
        .render_content(&body.content, body.resource_id, &subject)
        .await;
    let state = gate
        .access_state(body.resource_id, &subject)
        .await
        .unwrap_or(AccessState::Locked);

    Ok(Envelope::success(RenderData { content, state }))
}
