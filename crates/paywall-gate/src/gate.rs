//! Access gate orchestration.
//!
//! For details, see the [`AccessGate`] struct documentation.

use bon::Builder;
use chrono::{Duration, Utc};
use paywall_core::{
    marker,
    provider::PaymentProvider,
    store::AccessStore,
    types::{
        AccessDuration, Amount, CreateInvoice, Currency, Grant, Invoice, InvoiceId,
        InvoiceStatus, ResourceId, SubjectId,
    },
};
use serde::Serialize;
use url::Url;

use crate::{
    errors::GateError,
    pending::{PendingInvoice, PendingInvoices},
};

/// Tunables of the gate.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// How long an issued invoice stays correlated with its resource.
    #[builder(default = 900)]
    pub pending_ttl_secs: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig::builder().build()
    }
}

impl GateConfig {
    pub fn pending_ttl(&self) -> Duration {
        Duration::seconds(i64::from(self.pending_ttl_secs))
    }
}

/// Caller input for [`AccessGate::request_invoice`].
///
/// Amount and currency stay raw strings here; the gate validates them.
#[derive(Builder, Debug, Clone)]
pub struct InvoiceRequest {
    #[builder(into)]
    pub amount: String,
    #[builder(into)]
    pub currency: String,
    pub redirect_url: Url,
    #[builder(into)]
    pub resource_id: ResourceId,
    /// Visitor the invoice is attributed to, when known.
    pub subject_id: Option<SubjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreated {
    pub invoice_id: InvoiceId,
    /// The provider's checkout link, unmodified.
    pub checkout_url: String,
    pub pending: PendingInvoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePoll {
    pub invoice_id: InvoiceId,
    pub status: InvoiceStatus,
    /// Status string exactly as the provider reported it.
    pub provider_status: String,
    /// Only set while the invoice is still pending.
    pub checkout_url: Option<String>,
    /// Resource the invoice was issued for, from the live correlation or the
    /// provider's copy of the invoice metadata.
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleOutcome {
    pub poll: InvoicePoll,
    /// The grant written, if the invoice was settled.
    pub grant: Option<Grant>,
}

impl SettleOutcome {
    pub fn is_granted(&self) -> bool {
        self.grant.is_some()
    }
}

/// Where a `(resource, subject)` pair stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Locked,
    PaymentPending,
    Granted,
}

/// The paywall's business policy.
///
/// ## Type Parameters
///
/// - `P`: the payment backend, see [`PaymentProvider`].
/// - `S`: where grants are kept, see [`AccessStore`].
///
/// ## Lifecycle
///
/// A pair starts `Locked`. [`request_invoice`](AccessGate::request_invoice) moves it
/// to `PaymentPending` for the configured pending TTL. A confirmed settlement,
/// through [`confirm_and_grant`](AccessGate::confirm_and_grant) or
/// [`settle_and_grant`](AccessGate::settle_and_grant), appends a grant and the pair
/// is `Granted` until the grant expires.
#[derive(Builder, Debug, Clone)]
pub struct AccessGate<P: PaymentProvider, S: AccessStore> {
    pub provider: P,
    pub store: S,
    #[builder(default)]
    pub config: GateConfig,
    #[builder(default)]
    pub pending: PendingInvoices,
}

impl<P: PaymentProvider, S: AccessStore> AccessGate<P, S> {
    /// Create an invoice for a resource and remember the correlation.
    pub async fn request_invoice(&self, request: InvoiceRequest) -> Result<InvoiceCreated, GateError> {
        let amount: Amount = non_empty(&request.amount, "amount")?.parse()?;
        let currency: Currency = non_empty(&request.currency, "currency")?.parse()?;

        let create = CreateInvoice::builder()
            .amount(amount)
            .currency(currency)
            .redirect_url(request.redirect_url)
            .metadata(serde_json::json!({ "resourceId": request.resource_id }))
            .build();

        let invoice = self.provider.create_invoice(create).await.map_err(|err| {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Invoice creation failed for resource {} via {}: {err}",
                request.resource_id,
                self.provider.name()
            );
            GateError::invoice_creation_failed(err)
        })?;

        let Some(checkout_url) = invoice.checkout_link.clone() else {
            return Err(GateError::InvoiceCreationFailed {
                reason: "Provider returned no checkout link".to_string(),
                upstream_body: None,
            });
        };

        let now = Utc::now();
        let pending = PendingInvoice {
            invoice_id: invoice.id.clone(),
            resource_id: request.resource_id,
            subject_id: request.subject_id.filter(|subject| !subject.is_blank()),
            created_at: now,
            expires_at: now + self.config.pending_ttl(),
        };
        self.pending.insert(pending.clone());

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Invoice {} issued for resource {}",
            invoice.id,
            request.resource_id
        );

        Ok(InvoiceCreated {
            invoice_id: invoice.id,
            checkout_url,
            pending,
        })
    }

    /// Look up an invoice and map its status.
    pub async fn poll_invoice(&self, invoice_id: &InvoiceId) -> Result<InvoicePoll, GateError> {
        let invoice = self.lookup_invoice(invoice_id).await?;
        let correlated = self
            .pending
            .get(invoice_id, Utc::now())
            .map(|pending| pending.resource_id);
        Ok(poll_of(invoice, correlated))
    }

    /// Grant `duration_hours` of access to a visitor whose payment the caller confirmed.
    pub async fn confirm_and_grant(
        &self,
        resource_id: ResourceId,
        subject_id: &SubjectId,
        duration_hours: i64,
    ) -> Result<Grant, GateError> {
        let duration = validate_grant(subject_id, duration_hours)?;
        let grant = self
            .store
            .grant_access(resource_id, subject_id, duration)
            .await?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Access to resource {} granted for {} until {}",
            resource_id,
            duration,
            grant.expires_at()
        );

        Ok(grant)
    }

    /// Verify settlement with the provider, then grant.
    ///
    /// The invoice must be tied to `resource_id`, either by the live correlation
    /// or by the `resourceId` in the provider's metadata, and each invoice is
    /// redeemed at most once. Nothing is written unless the provider reports the
    /// invoice as settled.
    pub async fn settle_and_grant(
        &self,
        invoice_id: &InvoiceId,
        resource_id: ResourceId,
        subject_id: &SubjectId,
        duration_hours: i64,
    ) -> Result<SettleOutcome, GateError> {
        let duration = validate_grant(subject_id, duration_hours)?;

        let correlated = self
            .pending
            .get(invoice_id, Utc::now())
            .map(|pending| pending.resource_id);
        check_issued_for(invoice_id, resource_id, correlated)?;

        let invoice = self.lookup_invoice(invoice_id).await?;
        let issued_for = invoice.resource_id();
        check_issued_for(invoice_id, resource_id, issued_for)?;
        if correlated.is_none() && issued_for.is_none() {
            return Err(GateError::invalid_request(format!(
                "invoice {invoice_id} is not tied to any resource"
            )));
        }

        let poll = poll_of(invoice, correlated);
        if !poll.status.is_settled() {
            return Ok(SettleOutcome { poll, grant: None });
        }

        if !self.store.redeem_invoice(invoice_id, Utc::now()).await? {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Invoice {} was already redeemed, refusing another grant for resource {}",
                invoice_id,
                resource_id
            );
            return Err(GateError::AlreadyRedeemed(invoice_id.to_string()));
        }
        self.pending.remove(invoice_id);

        let grant = self
            .store
            .grant_access(resource_id, subject_id, duration)
            .await
            .inspect_err(|_err| {
                #[cfg(feature = "tracing")]
                tracing::error!(
                    "Invoice {} redeemed but the grant for resource {} failed: {_err}",
                    invoice_id,
                    resource_id
                );
            })?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Invoice {} settled, access to resource {} granted until {}",
            invoice_id,
            resource_id,
            grant.expires_at()
        );

        Ok(SettleOutcome {
            poll,
            grant: Some(grant),
        })
    }

    /// Filter content for a visitor. Never fails: any doubt renders as locked.
    pub async fn render_content(
        &self,
        raw_content: &str,
        resource_id: ResourceId,
        subject_id: &SubjectId,
    ) -> String {
        if !marker::contains_marker(raw_content) {
            return raw_content.to_string();
        }

        if self.has_access_or_locked(resource_id, subject_id).await {
            marker::strip_markers(raw_content)
        } else {
            marker::truncate_at_marker(raw_content)
        }
    }

    pub async fn access_state(
        &self,
        resource_id: ResourceId,
        subject_id: &SubjectId,
    ) -> Result<AccessState, GateError> {
        if subject_id.is_blank() {
            return Ok(AccessState::Locked);
        }
        if self.store.has_valid_access(resource_id, subject_id).await? {
            return Ok(AccessState::Granted);
        }
        if self
            .pending
            .is_pending_for(resource_id, subject_id, Utc::now())
        {
            return Ok(AccessState::PaymentPending);
        }
        Ok(AccessState::Locked)
    }

    async fn lookup_invoice(&self, invoice_id: &InvoiceId) -> Result<Invoice, GateError> {
        if invoice_id.is_blank() {
            return Err(GateError::invalid_request("invoice id is required"));
        }
        if !invoice_id.is_well_formed() {
            return Err(GateError::invalid_request("invoice id is malformed"));
        }

        self.provider
            .invoice_status(invoice_id)
            .await
            .map_err(GateError::from_lookup)
    }

    async fn has_access_or_locked(&self, resource_id: ResourceId, subject_id: &SubjectId) -> bool {
        if subject_id.is_blank() {
            return false;
        }
        match self.store.has_valid_access(resource_id, subject_id).await {
            Ok(granted) => granted,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::error!(
                    "Access lookup for resource {} failed, rendering locked: {_err}",
                    resource_id
                );
                false
            }
        }
    }
}

/// `correlated` wins over the provider's metadata when both name a resource.
fn poll_of(invoice: Invoice, correlated: Option<ResourceId>) -> InvoicePoll {
    let status = invoice.state();
    let resource_id = correlated.or_else(|| invoice.resource_id());
    let checkout_url = match status {
        InvoiceStatus::Pending => invoice.checkout_link,
        InvoiceStatus::Settled | InvoiceStatus::Unknown => None,
    };

    InvoicePoll {
        invoice_id: invoice.id,
        status,
        provider_status: invoice.status,
        checkout_url,
        resource_id,
    }
}

fn check_issued_for(
    invoice_id: &InvoiceId,
    requested: ResourceId,
    issued_for: Option<ResourceId>,
) -> Result<(), GateError> {
    match issued_for {
        Some(issued) if issued != requested => Err(GateError::invalid_request(format!(
            "invoice {invoice_id} was issued for resource {issued}, not {requested}"
        ))),
        _ => Ok(()),
    }
}

fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, GateError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GateError::invalid_request(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn validate_grant(subject_id: &SubjectId, duration_hours: i64) -> Result<AccessDuration, GateError> {
    if subject_id.is_blank() {
        return Err(GateError::invalid_request("session not initialized"));
    }
    Ok(AccessDuration::hours(duration_hours)?)
}
