//! The JSON envelope every endpoint answers with.

use serde::{Deserialize, Serialize};

/// `{"success": bool, "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Envelope {
            success: true,
            data,
        }
    }
}

impl Envelope<Failure> {
    pub fn failure(failure: Failure) -> Self {
        Envelope {
            success: false,
            data: failure,
        }
    }
}

/// Payload of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Machine-readable error kind.
    pub status: String,
    pub message: String,
    /// Raw upstream response, when a payment provider call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(feature = "axum")]
impl<T: Serialize> axum::response::IntoResponse for Envelope<T> {
    fn into_response(self) -> axum::response::Response {
        axum::extract::Json(self).into_response()
    }
}
