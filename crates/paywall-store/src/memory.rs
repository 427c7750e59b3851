use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use paywall_core::{
    store::{AccessStore, StoreError},
    types::{Grant, InvoiceId, ResourceId, SubjectId},
};

/// Grants held in process memory, keyed by `(resource, subject)`.
///
/// Cloning shares the underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccessStore {
    grants: Arc<DashMap<(ResourceId, SubjectId), Vec<DateTime<Utc>>>>,
    redeemed: Arc<DashMap<InvoiceId, DateTime<Utc>>>,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored grants, expired ones included.
    pub fn len(&self) -> usize {
        self.grants.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AccessStore for MemoryAccessStore {
    async fn has_valid_access_at(
        &self,
        resource_id: ResourceId,
        subject_id: &SubjectId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let valid = self
            .grants
            .get(&(resource_id, subject_id.clone()))
            .is_some_and(|expiries| expiries.iter().any(|expires_at| at < *expires_at));
        Ok(valid)
    }

    async fn insert_grant(&self, grant: Grant) -> Result<(), StoreError> {
        if grant.subject_id().is_blank() {
            return Err(StoreError::MissingSubject);
        }

        self.grants
            .entry((grant.resource_id(), grant.subject_id().clone()))
            .or_default()
            .push(grant.expires_at());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            resource_id = %grant.resource_id(),
            expires_at = %grant.expires_at(),
            "Grant stored in memory"
        );

        Ok(())
    }

    async fn redeem_invoice(
        &self,
        invoice_id: &InvoiceId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.redeemed.entry(invoice_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(at);
                Ok(true)
            }
        }
    }

    async fn prune_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut removed = 0u64;
        self.grants.retain(|_, expiries| {
            let len = expiries.len();
            expiries.retain(|expires_at| *expires_at > before);
            removed += (len - expiries.len()) as u64;
            !expiries.is_empty()
        });
        Ok(removed)
    }
}
