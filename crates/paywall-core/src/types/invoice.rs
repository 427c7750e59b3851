use bon::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{Amount, AnyJson, Currency, InvoiceId, ResourceId};

/// Settlement state of an invoice as seen by the paywall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Settled,
    Pending,
    Unknown,
}

impl InvoiceStatus {
    /// Map a provider status string onto the paywall's view of it.
    ///
    /// Coinsnap and BTCPay Server use slightly different vocabularies; both are
    /// matched case-insensitively.
    pub fn from_provider(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "settled" | "complete" | "completed" | "confirmed" | "paid" => InvoiceStatus::Settled,
            "new" | "pending" | "processing" | "unpaid" => InvoiceStatus::Pending,
            _ => InvoiceStatus::Unknown,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, InvoiceStatus::Settled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Settled => "settled",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Unknown => "unknown",
        }
    }
}

/// An invoice owned by the external payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    /// Raw status string as reported by the provider.
    pub status: String,
    /// Hosted checkout page, passed through exactly as the provider returned it.
    pub checkout_link: Option<String>,
    /// Metadata echoed back by the provider, as attached at creation.
    #[serde(default)]
    pub metadata: Option<AnyJson>,
}

impl Invoice {
    pub fn state(&self) -> InvoiceStatus {
        InvoiceStatus::from_provider(&self.status)
    }

    /// The `resourceId` the invoice was created for, read from its metadata.
    pub fn resource_id(&self) -> Option<ResourceId> {
        match self.metadata.as_ref()?.get("resourceId")? {
            AnyJson::Number(n) => n.as_u64().map(ResourceId),
            AnyJson::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Request for a new invoice.
#[derive(Builder, Debug, Clone)]
pub struct CreateInvoice {
    pub amount: Amount,
    pub currency: Currency,
    /// Where the provider sends the visitor once the payment completes.
    pub redirect_url: Url,
    /// Free-form metadata attached to the invoice on the provider side.
    pub metadata: Option<AnyJson>,
}
