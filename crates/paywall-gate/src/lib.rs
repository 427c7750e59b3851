//! # Paywall Gate
//!
//! The business policy of the paywall. [`AccessGate`](gate::AccessGate) ties a
//! [`PaymentProvider`](paywall_core::provider::PaymentProvider) to an
//! [`AccessStore`](paywall_core::store::AccessStore) and drives each
//! `(resource, subject)` pair through `Locked`, `PaymentPending` and `Granted`.
//!
//! ## Flow
//!
//! 1. **Request Invoice** ([`request_invoice`](gate::AccessGate::request_invoice)): validate the
//!    price, create an invoice and remember which resource it pays for.
//! 2. **Poll** ([`poll_invoice`](gate::AccessGate::poll_invoice)): map the provider status onto
//!    `settled`, `pending` or `unknown`.
//! 3. **Grant** ([`confirm_and_grant`](gate::AccessGate::confirm_and_grant) or
//!    [`settle_and_grant`](gate::AccessGate::settle_and_grant)): append a grant for the visitor.
//! 4. **Render** ([`render_content`](gate::AccessGate::render_content)): truncate or unwrap the
//!    marked content. Rendering fails closed.
//!
//! The visitor's subject id is always an explicit argument; session handling
//! belongs to the caller. With the `axum` feature, [`routes::router`] exposes the
//! operations over HTTP and [`session`] issues the session cookie.

#[cfg(feature = "axum")]
pub mod routes;
pub mod errors;
pub mod gate;
pub mod pending;
pub mod response;
#[cfg(feature = "axum")]
pub mod session;
