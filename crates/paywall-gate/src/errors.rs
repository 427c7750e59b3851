use http::StatusCode;
use paywall_core::{provider::ProviderError, store::StoreError};

use crate::response::{Envelope, Failure};

/// Failures surfaced by the access gate. None of them is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Missing or malformed caller input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider refused or garbled an invoice creation.
    #[error("Failed to create invoice: {reason}")]
    InvoiceCreationFailed {
        reason: String,
        upstream_body: Option<String>,
    },

    /// The provider failed while looking up an invoice.
    #[error("Payment provider error: {reason}")]
    Provider {
        reason: String,
        upstream_body: Option<String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// The invoice was already exchanged for a grant.
    #[error("Invoice '{0}' was already redeemed")]
    AlreadyRedeemed(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl GateError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        GateError::InvalidRequest(reason.into())
    }

    pub fn invoice_creation_failed(err: ProviderError) -> Self {
        GateError::InvoiceCreationFailed {
            reason: err.to_string(),
            upstream_body: err.upstream_body().map(str::to_string),
        }
    }

    pub fn from_lookup(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(invoice_id) => {
                GateError::NotFound(format!("Invoice '{invoice_id}'"))
            }
            other => GateError::Provider {
                reason: other.to_string(),
                upstream_body: other.upstream_body().map(str::to_string),
            },
        }
    }

    /// Machine-readable error kind used in the failure envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::InvalidRequest(_) => "invalid_request",
            GateError::InvoiceCreationFailed { .. } => "invoice_creation_failed",
            GateError::Provider { .. } => "provider_error",
            GateError::NotFound(_) => "not_found",
            GateError::AlreadyRedeemed(_) => "already_redeemed",
            GateError::Storage(_) => "storage_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GateError::InvoiceCreationFailed { .. } | GateError::Provider { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GateError::NotFound(_) => StatusCode::NOT_FOUND,
            GateError::AlreadyRedeemed(_) => StatusCode::CONFLICT,
            GateError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            GateError::InvoiceCreationFailed { upstream_body, .. }
            | GateError::Provider { upstream_body, .. } => upstream_body.as_deref(),
            _ => None,
        }
    }
}

impl From<paywall_core::errors::Error> for GateError {
    fn from(err: paywall_core::errors::Error) -> Self {
        GateError::InvalidRequest(err.to_string())
    }
}

/// A gate failure rendered as an HTTP response.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub body: Envelope<Failure>,
}

impl From<GateError> for ErrorResponse {
    fn from(err: GateError) -> Self {
        ErrorResponse {
            status: err.status_code(),
            body: Envelope::failure(Failure {
                status: err.kind().to_string(),
                message: err.to_string(),
                details: err.upstream_body().map(str::to_string),
            }),
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, axum::extract::Json(self.body)).into_response()
    }
}
