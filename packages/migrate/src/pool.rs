//! Bounded-concurrency transfer worker pool.
//!
//! Runs each [`TransferTask`] as "download source bytes → upload to the
//! destination" with at most N tasks in flight, no ordering guarantee
//! among them. Downloads are retried up to [`MAX_DOWNLOAD_ATTEMPTS`]
//! times with a fixed delay; after exhaustion the object is skipped and
//! the rest of the folder continues. Uploads are not retried. Every
//! task resolves to a [`TaskOutcome`]; the pool never aborts early and
//! returns only once all submitted tasks have reached a terminal state.

use std::sync::Arc;
use std::time::Duration;

use bucket_bridge_migrate_models::{TaskOutcome, TransferTask};
use futures::stream::{self, StreamExt as _};

use crate::progress::ProgressCallback;
use crate::store::{DestObjects, SourceObjects};

/// Maximum number of download attempts per object (initial + retries).
pub const MAX_DOWNLOAD_ATTEMPTS: u32 = 3;

/// Fixed delay between download attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Content type used when the source did not report one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Transfers all `tasks` with at most `concurrency` in flight.
///
/// Returns one [`TaskOutcome`] per submitted task (in completion order,
/// which reflects arrival, not submission). The caller tallies the
/// outcomes; per-object failures are fully absorbed here.
pub async fn transfer_folder<S: SourceObjects, D: DestObjects>(
    source: &S,
    dest: &D,
    tasks: Vec<TransferTask>,
    concurrency: usize,
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<TaskOutcome> {
    stream::iter(tasks.into_iter().map(|task| async move {
        let outcome = transfer_one(source, dest, task).await;
        progress.inc(1);
        outcome
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await
}

/// Runs a single task to its terminal state.
async fn transfer_one<S: SourceObjects, D: DestObjects>(
    source: &S,
    dest: &D,
    task: TransferTask,
) -> TaskOutcome {
    let key = task.source_key;

    let bytes = match download_with_retry(source, &key).await {
        Ok(bytes) => bytes,
        Err(attempts) => {
            return TaskOutcome::SkippedDownload { key, attempts };
        }
    };

    let content_type = task.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
    let size = bytes.len();

    match dest.put_object(&key, bytes, content_type).await {
        Ok(()) => {
            #[allow(clippy::cast_precision_loss)] // display-only MB value
            let mb = size as f64 / 1_048_576.0;
            log::info!("  copied {key} ({mb:.1} MB, {content_type})");
            TaskOutcome::Transferred { key }
        }
        Err(e) => {
            log::warn!("  upload failed for {key}: {e}");
            TaskOutcome::FailedUpload { key }
        }
    }
}

/// Downloads `key`, retrying on any failure up to
/// [`MAX_DOWNLOAD_ATTEMPTS`] with [`RETRY_DELAY`] between attempts.
///
/// An empty or invalid body counts as a failed attempt exactly like a
/// transport error. Returns the number of attempts made on exhaustion.
async fn download_with_retry<S: SourceObjects>(source: &S, key: &str) -> Result<Vec<u8>, u32> {
    for attempt in 1..=MAX_DOWNLOAD_ATTEMPTS {
        match source.download_object(key).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if attempt < MAX_DOWNLOAD_ATTEMPTS => {
                log::warn!(
                    "  download attempt {attempt}/{MAX_DOWNLOAD_ATTEMPTS} failed for {key}: {e}, \
                     retrying in {RETRY_DELAY:?}..."
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => {
                log::warn!(
                    "  download attempt {attempt}/{MAX_DOWNLOAD_ATTEMPTS} failed for {key}: {e}, \
                     skipping object"
                );
            }
        }
    }

    Err(MAX_DOWNLOAD_ATTEMPTS)
}
