//! Periodic removal of long-expired grants and lapsed invoice correlations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use paywall_core::store::{AccessStore, StoreError};
use paywall_gate::pending::PendingInvoices;

/// One compaction pass at `now`. Returns the number of grants removed.
pub async fn compact_once<S: AccessStore>(
    store: &S,
    pending: &PendingInvoices,
    retention: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    pending.purge_expired(now);
    store.prune_expired(now - retention).await
}

/// Run [`compact_once`] every `interval`, forever. Failures are logged and retried
/// on the next tick.
pub async fn run_compaction<S: AccessStore>(
    store: S,
    pending: PendingInvoices,
    interval: Duration,
    retention: chrono::Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match compact_once(&store, &pending, retention, Utc::now()).await {
            Ok(0) => tracing::trace!("Compaction found no expired grants"),
            Ok(removed) => tracing::info!(removed, "Expired grants compacted"),
            Err(e) => tracing::warn!(error = %e, "Grant compaction failed"),
        }
    }
}
