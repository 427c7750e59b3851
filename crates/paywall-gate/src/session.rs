//! Visitor session cookie.
//!
//! [`session_layer`] makes sure every request carries a [`Subject`]: the value of
//! the `paywall_session` cookie, or a fresh UUIDv4 that is then set on the response.

use axum::{
    extract::Request,
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};
use paywall_core::types::SubjectId;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "paywall_session";

/// The visitor identity attached to a request by [`session_layer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub SubjectId);

pub async fn session_layer(mut req: Request, next: Next) -> Response {
    let (subject, issued) = match session_from_headers(req.headers()) {
        Some(subject) => (subject, false),
        None => (SubjectId::new(Uuid::new_v4().to_string()), true),
    };
    req.extensions_mut().insert(Subject(subject.clone()));

    let mut response = next.run(req).await;

    if issued {
        let cookie = format!("{SESSION_COOKIE}={subject}; HttpOnly; SameSite=Lax; Path=/");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

/// The session id from the `Cookie` headers, if it looks like one we issued.
pub fn session_from_headers(headers: &HeaderMap) -> Option<SubjectId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| is_session_token(value))
        .map(SubjectId::from)
}

fn is_session_token(value: &str) -> bool {
    (1..=128).contains(&value.len())
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
