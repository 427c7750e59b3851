//! The grant persistence seam.

use chrono::{DateTime, Utc};

use crate::types::{AccessDuration, Grant, InvoiceId, ResourceId, SubjectId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Refusing to write a grant without a subject id")]
    MissingSubject,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Durable mapping from `(resource, subject)` to paid access windows.
///
/// Grants are append-only: validity is the existence of any grant for the
/// pair whose expiry lies in the future. Expired grants are filtered at read
/// time and may be removed with [`AccessStore::prune_expired`].
pub trait AccessStore: Send + Sync {
    /// Whether a grant for the pair is still valid at `at`.
    fn has_valid_access_at(
        &self,
        resource_id: ResourceId,
        subject_id: &SubjectId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Append a grant.
    fn insert_grant(&self, grant: Grant) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Claim `invoice_id` as exchanged for a grant.
    ///
    /// Returns `false` when the invoice was already claimed. The claim is atomic:
    /// of concurrent callers, exactly one sees `true`.
    fn redeem_invoice(
        &self,
        invoice_id: &InvoiceId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Delete grants that expired at or before `before`, returning how many were removed.
    fn prune_expired(
        &self,
        before: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn has_valid_access(
        &self,
        resource_id: ResourceId,
        subject_id: &SubjectId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        self.has_valid_access_at(resource_id, subject_id, Utc::now())
    }

    /// Grant `duration` of access starting now.
    fn grant_access(
        &self,
        resource_id: ResourceId,
        subject_id: &SubjectId,
        duration: AccessDuration,
    ) -> impl Future<Output = Result<Grant, StoreError>> + Send {
        async move {
            let grant = Grant::starting_at(resource_id, subject_id.clone(), duration, Utc::now())?;
            self.insert_grant(grant.clone()).await?;
            Ok(grant)
        }
    }
}
