use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    store::StoreError,
    types::{AccessDuration, ResourceId, SubjectId},
};

/// A paid access window for one subject on one resource.
///
/// A grant can only be built for a non-blank subject; an unkeyed grant could
/// never be matched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    resource_id: ResourceId,
    subject_id: SubjectId,
    expires_at: DateTime<Utc>,
}

impl Grant {
    pub fn new(
        resource_id: ResourceId,
        subject_id: SubjectId,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        if subject_id.is_blank() {
            return Err(StoreError::MissingSubject);
        }
        Ok(Grant {
            resource_id,
            subject_id,
            expires_at,
        })
    }

    /// A grant that starts at `now` and lasts `duration`.
    pub fn starting_at(
        resource_id: ResourceId,
        subject_id: SubjectId,
        duration: AccessDuration,
        now: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        Grant::new(resource_id, subject_id, now + duration.to_chrono())
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        at < self.expires_at
    }
}
