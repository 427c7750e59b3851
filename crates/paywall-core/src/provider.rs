//! The payment backend seam.

use crate::types::{CreateInvoice, Invoice, InvoiceId};

/// Failures talking to a payment provider.
///
/// Every variant that originates from an HTTP response keeps the raw response
/// body so it can be surfaced to the caller for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Provider responded with HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed provider response ({reason}): {body}")]
    MalformedResponse { reason: String, body: String },

    #[error("Invoice '{0}' not found")]
    NotFound(InvoiceId),
}

impl ProviderError {
    /// Raw upstream body, when the failure came with one.
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            ProviderError::Upstream { body, .. } | ProviderError::MalformedResponse { body, .. } => {
                Some(body)
            }
            ProviderError::Transport(_) | ProviderError::NotFound(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// A payment backend able to issue invoices and report their status.
pub trait PaymentProvider: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Create a new invoice. A successful result always carries a checkout link.
    fn create_invoice(
        &self,
        request: CreateInvoice,
    ) -> impl Future<Output = Result<Invoice, ProviderError>> + Send;

    /// Fetch the current state of an invoice.
    fn invoice_status(
        &self,
        invoice_id: &InvoiceId,
    ) -> impl Future<Output = Result<Invoice, ProviderError>> + Send;
}
