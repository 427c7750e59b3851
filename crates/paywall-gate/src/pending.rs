//! Short-lived correlation between an issued invoice and the resource it pays for.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use paywall_core::types::{InvoiceId, ResourceId, SubjectId};
use serde::Serialize;

/// An invoice that was issued but has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvoice {
    pub invoice_id: InvoiceId,
    pub resource_id: ResourceId,
    #[serde(skip)]
    pub subject_id: Option<SubjectId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingInvoice {
    pub fn is_live_at(&self, at: DateTime<Utc>) -> bool {
        at < self.expires_at
    }

    /// Name of the correlation cookie for this invoice's resource.
    pub fn cookie_name(&self) -> String {
        format!("paywall_initiated_{}", self.resource_id)
    }

    /// Form-encoded `{"invoice_id": .., "post_id": ..}`, the correlation cookie value.
    pub fn cookie_value(&self) -> String {
        let ids = serde_json::json!({
            "invoice_id": self.invoice_id,
            "post_id": self.resource_id,
        });
        url::form_urlencoded::byte_serialize(ids.to_string().as_bytes()).collect()
    }
}

/// In-process registry of pending invoices, keyed by invoice id.
///
/// Entries lapse after the gate's pending TTL. Lapsed entries are ignored on
/// read and dropped by [`PendingInvoices::purge_expired`].
#[derive(Debug, Clone, Default)]
pub struct PendingInvoices {
    entries: Arc<DashMap<InvoiceId, PendingInvoice>>,
}

impl PendingInvoices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, pending: PendingInvoice) {
        self.entries.insert(pending.invoice_id.clone(), pending);
    }

    /// The live entry for `invoice_id`, if any.
    pub fn get(&self, invoice_id: &InvoiceId, at: DateTime<Utc>) -> Option<PendingInvoice> {
        self.entries
            .get(invoice_id)
            .map(|entry| entry.value().clone())
            .filter(|pending| pending.is_live_at(at))
    }

    pub fn remove(&self, invoice_id: &InvoiceId) -> Option<PendingInvoice> {
        self.entries.remove(invoice_id).map(|(_, pending)| pending)
    }

    /// Whether `subject` has a live invoice for `resource_id`.
    pub fn is_pending_for(
        &self,
        resource_id: ResourceId,
        subject_id: &SubjectId,
        at: DateTime<Utc>,
    ) -> bool {
        self.entries.iter().any(|entry| {
            let pending = entry.value();
            pending.resource_id == resource_id
                && pending.subject_id.as_ref() == Some(subject_id)
                && pending.is_live_at(at)
        })
    }

    pub fn purge_expired(&self, at: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, pending| pending.is_live_at(at));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
