//! # Paywall Core
//!
//! Shared building blocks for gating content behind a cryptocurrency payment:
//!
//! - [`types`]: grants, invoices, prices and identifiers.
//! - [`provider`]: the [`PaymentProvider`](provider::PaymentProvider) trait implemented by
//!   the Coinsnap and BTCPay Server clients.
//! - [`store`]: the [`AccessStore`](store::AccessStore) trait for persisting grants.
//! - [`marker`]: the `[paywall_payment]` marker grammar and the content filters built on it.
//! - [`errors`]: validation errors for caller input.

pub mod errors;
pub mod marker;
pub mod provider;
pub mod store;
pub mod types;
