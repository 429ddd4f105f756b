use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::services::storage::{parse_upload_timestamp, ImageStore, StorageError};

/// Counts from one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Delete temporary uploads older than `max_age`.
///
/// Reclaims images of jobs whose clients stopped polling, and anything a
/// failed cleanup left behind. Keys without a parseable timestamp are left
/// alone.
pub async fn sweep_expired(
    store: &dyn ImageStore,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<SweepReport, StorageError> {
    let cutoff = (now - max_age).timestamp();
    let keys = store.list_temp().await?;
    let mut report = SweepReport {
        scanned: keys.len(),
        ..Default::default()
    };

    for key in keys {
        let Some(uploaded_at) = parse_upload_timestamp(&key) else {
            debug!(key = %key, "Skipping key without upload timestamp");
            report.skipped += 1;
            continue;
        };
        if uploaded_at >= cutoff {
            continue;
        }
        match store.delete(&key).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to delete expired image");
                report.failed += 1;
            }
        }
    }

    info!(
        scanned = report.scanned,
        deleted = report.deleted,
        skipped = report.skipped,
        failed = report.failed,
        "Sweep complete"
    );
    Ok(report)
}
