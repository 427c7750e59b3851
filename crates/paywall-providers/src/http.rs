//! JSON-over-HTTP plumbing shared by the provider clients.

use http::{HeaderMap, StatusCode};
use paywall_core::{
    provider::ProviderError,
    types::{AnyJson, Invoice, InvoiceId},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

/// A provider response converted into the common [`Invoice`] shape.
pub trait IntoInvoice {
    fn into_invoice(self) -> Invoice;
}

/// Invoice fields both Coinsnap and BTCPay Server return.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub checkout_link: Option<String>,
    #[serde(default)]
    pub metadata: Option<AnyJson>,
}

impl IntoInvoice for InvoiceResponse {
    fn into_invoice(self) -> Invoice {
        Invoice {
            id: InvoiceId::new(self.id),
            status: self.status,
            checkout_link: self.checkout_link.filter(|link| !link.trim().is_empty()),
            metadata: self.metadata,
        }
    }
}

/// A REST endpoint with fixed default headers.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub base_url: Url,
    pub client: reqwest::Client,
    pub headers: HeaderMap,
}

/// Status and body of a provider response, read in full before any parsing.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiClient {
    pub fn new(base_url: Url, client: reqwest::Client, headers: HeaderMap) -> Self {
        ApiClient {
            base_url: with_trailing_slash(base_url),
            client,
            headers,
        }
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ProviderError::Transport(format!("Invalid endpoint '{path}': {err}")))
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, ProviderError> {
        let url = self.endpoint(path)?;
        self.send(self.client.post(url).json(body)).await
    }

    /// `path` followed by `item` as a single percent-encoded segment.
    ///
    /// `/` in `item` is escaped and `.`/`..` are dropped, so the result never
    /// leaves `path`.
    pub fn item_endpoint(&self, path: &str, item: &str) -> Result<Url, ProviderError> {
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::Transport(format!("Base URL '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push(item);
        Ok(url)
    }

    pub async fn get_item(&self, path: &str, item: &str) -> Result<RawResponse, ProviderError> {
        let url = self.item_endpoint(path, item)?;
        self.send(self.client.get(url)).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<RawResponse, ProviderError> {
        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

impl RawResponse {
    /// Decode a successful response body.
    pub fn json<R: DeserializeOwned>(self) -> Result<R, ProviderError> {
        if !self.status.is_success() {
            return Err(ProviderError::Upstream {
                status: self.status.as_u16(),
                body: self.body,
            });
        }

        serde_json::from_str(&self.body).map_err(|err| ProviderError::MalformedResponse {
            reason: err.to_string(),
            body: self.body,
        })
    }

    /// Decode an invoice, optionally insisting on a checkout link.
    pub fn invoice<R>(self, require_checkout_link: bool) -> Result<Invoice, ProviderError>
    where
        R: IntoInvoice + DeserializeOwned,
    {
        let body = self.body.clone();
        let invoice = self.json::<R>()?.into_invoice();

        if require_checkout_link && invoice.checkout_link.is_none() {
            return Err(ProviderError::MalformedResponse {
                reason: "response has no checkoutLink".to_string(),
                body,
            });
        }

        Ok(invoice)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
