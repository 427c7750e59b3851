//! Invoice clients for the hosted Coinsnap API and self-hosted BTCPay Server.
//!
//! Both backends speak the same Greenfield-style REST dialect, so they share
//! the [`http::ApiClient`] plumbing and differ only in authentication and the
//! request body they expect. [`provider::Provider`] selects one of them from
//! [`provider::ProviderSettings`] at startup.

pub mod btcpay;
pub mod coinsnap;
pub mod errors;
pub mod http;
pub mod provider;
