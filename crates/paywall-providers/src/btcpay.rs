use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use paywall_core::{
    provider::{PaymentProvider, ProviderError},
    types::{Amount, AnyJson, CreateInvoice, Currency, Invoice, InvoiceId},
};
use serde::Serialize;
use url::Url;

use crate::{
    errors::ConfigError,
    http::{ApiClient, InvoiceResponse},
};

/// Client for the Greenfield API of a self-hosted BTCPay Server.
#[derive(Debug, Clone)]
pub struct BtcPayClient {
    pub api: ApiClient,
    pub store_id: String,
}

/// Body of `POST /api/v1/stores/{store}/invoices`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcPayInvoiceRequest {
    pub amount: Amount,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AnyJson>,
    pub checkout: BtcPayCheckoutOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcPayCheckoutOptions {
    #[serde(rename = "redirectURL")]
    pub redirect_url: Url,
    pub redirect_automatically: bool,
}

impl From<CreateInvoice> for BtcPayInvoiceRequest {
    fn from(request: CreateInvoice) -> Self {
        BtcPayInvoiceRequest {
            amount: request.amount,
            currency: request.currency,
            metadata: request.metadata,
            checkout: BtcPayCheckoutOptions {
                redirect_url: request.redirect_url,
                redirect_automatically: true,
            },
        }
    }
}

impl BtcPayClient {
    pub fn new(base_url: Url, store_id: impl Into<String>, api_key: &str) -> Result<Self, ConfigError> {
        BtcPayClient::with_client(base_url, store_id, api_key, reqwest::Client::new())
    }

    pub fn with_client(
        base_url: Url,
        store_id: impl Into<String>,
        api_key: &str,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let mut token = HeaderValue::from_str(&format!("token {api_key}"))
            .map_err(|_| ConfigError::InvalidHeader("Authorization"))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        Ok(BtcPayClient {
            api: ApiClient::new(base_url, client, headers),
            store_id: store_id.into(),
        })
    }

    fn invoices_path(&self) -> String {
        format!("api/v1/stores/{}/invoices", self.store_id)
    }
}

impl PaymentProvider for BtcPayClient {
    fn name(&self) -> &'static str {
        "btcpay"
    }

    async fn create_invoice(&self, request: CreateInvoice) -> Result<Invoice, ProviderError> {
        let body = BtcPayInvoiceRequest::from(request);
        let invoice = self
            .api
            .post_json(&self.invoices_path(), &body)
            .await?
            .invoice::<InvoiceResponse>(true)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "BTCPay invoice created: id='{}', status='{}'",
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
