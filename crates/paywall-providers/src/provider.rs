use std::{fmt::Debug, time::Duration};

use bon::Builder;
use paywall_core::{
    provider::{PaymentProvider, ProviderError},
    types::{CreateInvoice, Invoice, InvoiceId},
};
use serde::Deserialize;
use url::Url;

use crate::{
    btcpay::BtcPayClient,
    coinsnap::{COINSNAP_API_URL, CoinsnapClient},
    errors::ConfigError,
};

/// Which payment backend the paywall talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Coinsnap,
    Btcpay,
}

/// Flat payment settings, as stored by the site configuration.
///
/// Only the credentials of the selected backend are required.
#[derive(Builder, Clone, Deserialize)]
pub struct ProviderSettings {
    pub provider: ProviderKind,
    #[builder(into)]
    pub btcpay_store_id: Option<String>,
    #[builder(into)]
    pub btcpay_api_key: Option<String>,
    pub btcpay_url: Option<Url>,
    #[builder(into)]
    pub coinsnap_store_id: Option<String>,
    #[builder(into)]
    pub coinsnap_api_key: Option<String>,
    /// Override for the Coinsnap API endpoint; defaults to [`COINSNAP_API_URL`].
    pub coinsnap_url: Option<Url>,
    /// Upper bound for a single provider round-trip.
    #[serde(default = "default_request_timeout_secs")]
    #[builder(default = default_request_timeout_secs())]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ProviderSettings")
            .field("provider", &self.provider)
            .field("btcpay_store_id", &self.btcpay_store_id)
            .field("btcpay_api_key", &redact(&self.btcpay_api_key))
            .field("btcpay_url", &self.btcpay_url)
            .field("coinsnap_store_id", &self.coinsnap_store_id)
            .field("coinsnap_api_key", &redact(&self.coinsnap_api_key))
            .field("coinsnap_url", &self.coinsnap_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// The configured payment backend.
///
/// Selected once from [`ProviderSettings`]; every call is then dispatched
/// statically to the matching client.
#[derive(Debug, Clone)]
pub enum Provider {
    Coinsnap(CoinsnapClient),
    BtcPay(BtcPayClient),
}

impl Provider {
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        let provider = match settings.provider {
            ProviderKind::Coinsnap => {
                let store_id = required(&settings.coinsnap_store_id, "coinsnap_store_id")?;
                let api_key = required(&settings.coinsnap_api_key, "coinsnap_api_key")?;
                let base_url = match &settings.coinsnap_url {
                    Some(url) => url.clone(),
                    None => Url::parse(COINSNAP_API_URL)?,
                };
                Provider::Coinsnap(CoinsnapClient::with_client(
                    base_url, store_id, api_key, client,
                )?)
            }
            ProviderKind::Btcpay => {
                let store_id = required(&settings.btcpay_store_id, "btcpay_store_id")?;
                let api_key = required(&settings.btcpay_api_key, "btcpay_api_key")?;
                let base_url = settings
                    .btcpay_url
                    .clone()
                    .ok_or(ConfigError::Missing("btcpay_url"))?;
                Provider::BtcPay(BtcPayClient::with_client(
                    base_url, store_id, api_key, client,
                )?)
            }
        };

        #[cfg(feature = "tracing")]
        tracing::info!("Payment provider configured: {}", provider.name());

        Ok(provider)
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Coinsnap(_) => ProviderKind::Coinsnap,
            Provider::BtcPay(_) => ProviderKind::Btcpay,
        }
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

impl PaymentProvider for Provider {
    fn name(&self) -> &'static str {
        match self {
            Provider::Coinsnap(client) => client.name(),
            Provider::BtcPay(client) => client.name(),
        }
    }

    async fn create_invoice(&self, request: CreateInvoice) -> Result<Invoice, ProviderError> {
        match self {
            Provider::Coinsnap(client) => client.create_invoice(request).await,
            Provider::BtcPay(client) => client.create_invoice(request).await,
        }
    }

    async fn invoice_status(&self, invoice_id: &InvoiceId) -> Result<Invoice, ProviderError> {
        match self {
            Provider::Coinsnap(client) => client.invoice_status(invoice_id).await,
            Provider::BtcPay(client) => client.invoice_status(invoice_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_coinsnap_with_default_url() {
        let settings = ProviderSettings::builder()
            .provider(ProviderKind::Coinsnap)
            .coinsnap_store_id("store-1")
            .coinsnap_api_key("key-1")
            .build();

        let provider = Provider::from_settings(&settings).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Coinsnap);
        assert_eq!(provider.name(), "coinsnap");
        match provider {
            Provider::Coinsnap(client) => {
                assert_eq!(client.api.base_url.as_str(), "https://app.coinsnap.io/");
                assert_eq!(client.store_id, "store-1");
            }
            Provider::BtcPay(_) => panic!("expected the Coinsnap backend"),
        }
    }

    #[test]
    fn test_btcpay_requires_url() {
        let settings = ProviderSettings::builder()
            .provider(ProviderKind::Btcpay)
            .btcpay_store_id("store-1")
            .btcpay_api_key("key-1")
            .build();

        let err = Provider::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("btcpay_url")));
    }

    #[test]
    fn test_blank_credentials_are_missing() {
        let settings = ProviderSettings::builder()
            .provider(ProviderKind::Coinsnap)
            .coinsnap_store_id("  ")
            .coinsnap_api_key("key-1")
            .build();

        let err = Provider::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("coinsnap_store_id")));
    }

    #[test]
    fn test_settings_deserialize_flat_and_redact() {
        let settings: ProviderSettings = serde_json::from_value(serde_json::json!({
            "provider": "btcpay",
            "btcpay_store_id": "s1",
            "btcpay_api_key": "secret-key",
            "btcpay_url": "https://btcpay.example.com"
        }))
        .unwrap();

        assert_eq!(settings.provider, ProviderKind::Btcpay);
        assert_eq!(settings.request_timeout_secs, 30);

        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));

        let provider = Provider::from_settings(&settings).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Btcpay);
    }
}
