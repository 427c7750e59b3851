use http::{HeaderMap, HeaderName, HeaderValue};
use paywall_core::{
    provider::{PaymentProvider, ProviderError},
    types::{Amount, AnyJson, CreateInvoice, Currency, Invoice, InvoiceId},
};
use serde::{Serialize, Serializer};
use url::Url;

use crate::{
    errors::ConfigError,
    http::{ApiClient, InvoiceResponse},
};

/// Public Coinsnap API endpoint.
pub const COINSNAP_API_URL: &str = "https://app.coinsnap.io";

/// Client for the hosted Coinsnap invoice API.
#[derive(Debug, Clone)]
pub struct CoinsnapClient {
    pub api: ApiClient,
    pub store_id: String,
}

/// Body of `POST /api/v1/stores/{store}/invoices`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinsnapInvoiceRequest {
    #[serde(serialize_with = "amount_as_number")]
    pub amount: Amount,
    pub currency: Currency,
    pub redirect_url: Url,
    pub redirect_automatically: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AnyJson>,
}

impl From<CreateInvoice> for CoinsnapInvoiceRequest {
    fn from(request: CreateInvoice) -> Self {
        CoinsnapInvoiceRequest {
            amount: request.amount,
            currency: request.currency,
            redirect_url: request.redirect_url,
            redirect_automatically: true,
            metadata: request.metadata,
        }
    }
}

/// Coinsnap expects a JSON number for the amount. Prices a JSON number cannot
/// carry exactly are sent as strings instead.
fn amount_as_number<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
    let text = amount.as_str();
    match text.parse::<serde_json::Number>() {
        Ok(number) if trim_fraction(&number.to_string()) == trim_fraction(text) => {
            number.serialize(serializer)
        }
        _ => serializer.serialize_str(text),
    }
}

/// `2.50` and `2.0` as `2.5` and `2`.
fn trim_fraction(decimal: &str) -> &str {
    if decimal.contains('.') {
        decimal.trim_end_matches('0').trim_end_matches('.')
    } else {
        decimal
    }
}

impl CoinsnapClient {
    pub fn new(store_id: impl Into<String>, api_key: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(COINSNAP_API_URL)?;
        CoinsnapClient::with_client(base_url, store_id, api_key, reqwest::Client::new())
    }

    pub fn with_client(
        base_url: Url,
        store_id: impl Into<String>,
        api_key: &str,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let mut key =
            HeaderValue::from_str(api_key).map_err(|_| ConfigError::InvalidHeader("X-Api-Key"))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-api-key"), key);

        Ok(CoinsnapClient {
            api: ApiClient::new(base_url, client, headers),
            store_id: store_id.into(),
        })
    }

    fn invoices_path(&self) -> String {
        format!("api/v1/stores/{}/invoices", self.store_id)
    }
}

impl PaymentProvider for CoinsnapClient {
    fn name(&self) -> &'static str {
        "coinsnap"
    }

    async fn create_invoice(&self, request: CreateInvoice) -> Result<Invoice, ProviderError> {
        let body = CoinsnapInvoiceRequest::from(request);
        let invoice = self
            .api
            .post_json(&self.invoices_path(), &body)
            .await?
            .invoice::<InvoiceResponse>(true)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Coinsnap invoice created: id='{}', status='{}'",
            invoice.id,
            invoice.status
        );

        Ok(invoice)
    }

    async fn invoice_status(&self, invoice_id: &InvoiceId) -> Result<Invoice, ProviderError> {
        if !invoice_id.is_well_formed() {
            return Err(ProviderError::NotFound(invoice_id.clone()));
        }
        let raw = self
            .api
            .get_item(&self.invoices_path(), invoice_id.as_str())
            .await?;

        if raw.status == http::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(invoice_id.clone()));
        }

        raw.invoice::<InvoiceResponse>(false)
    }
}
