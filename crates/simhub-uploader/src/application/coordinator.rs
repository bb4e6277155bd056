//! The upload coordinator: single-shot and multipart paths.
//!
//! The multipart path runs a fixed pool of four workers over one shared
//! claim counter.  A worker's loop is: check the cancellation flag, claim
//! the next part index atomically, fetch that part's one-time URL, PUT the
//! byte range, record `{part_number, etag}`.  Claims are monotonic, so no
//! part is uploaded twice and out-of-order completions are harmless; the
//! manifest is sorted by part number before the completion call.
//!
//! First error wins.  The failing worker stores its error and raises the
//! cancellation flag; every other worker observes the flag before claiming
//! another part and exits.  No completion call is made after a failure,
//! and the stored error is what the caller sees.
//!
//! Progress is a shared byte counter updated with atomic adds (no lost
//! updates across workers) and published through a `tokio::sync::watch`
//! channel, so a caller can render a percentage without polling the pool.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::meta::UploadMetadata;
use crate::domain::plan::{normalize_etag, PartRecord, UploadPlan};
use crate::infrastructure::api::{ApiError, MultipartSession, UploadApi};

/// Number of concurrent part-upload workers.
pub const WORKER_COUNT: usize = 4;

/// What an upload can fail with.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A backend or object-store call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Aggregate progress of a running upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
}

impl Progress {
    /// Whole-number percentage; 100 for an empty payload.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            100
        } else {
            ((self.uploaded_bytes * 100) / self.total_bytes) as u8
        }
    }
}

/// How a finished upload was performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Single-shot path; carries the confirmation ticket.
    Single { ticket_id: String },
    /// Multipart path; carries the session and the number of parts.
    Multipart { session: MultipartSession, parts: u64 },
}

/// Drives uploads against an [`UploadApi`].
pub struct UploadCoordinator {
    api: Arc<dyn UploadApi>,
    progress_tx: watch::Sender<Progress>,
}

impl UploadCoordinator {
    pub fn new(api: Arc<dyn UploadApi>) -> Self {
        let (progress_tx, _) = watch::channel(Progress {
            uploaded_bytes: 0,
            total_bytes: 0,
        });
        Self { api, progress_tx }
    }

    /// Subscribes to progress updates for uploads run on this coordinator.
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress_tx.subscribe()
    }

    /// Uploads `data`, selecting the path by the multipart threshold.
    ///
    /// # Errors
    ///
    /// [`UploadError::Api`] from the first failing call; on the multipart
    /// path no completion call is made after a failure.
    pub async fn upload(
        &self,
        data: &[u8],
        meta: &UploadMetadata,
    ) -> Result<UploadOutcome, UploadError> {
        let plan = UploadPlan::new(data.len() as u64);
        if plan.is_multipart() {
            self.upload_multipart(plan, data, meta).await
        } else {
            self.upload_single(data, meta).await
        }
    }

    // ── Single-shot path ─────────────────────────────────────────────────────

    async fn upload_single(
        &self,
        data: &[u8],
        meta: &UploadMetadata,
    ) -> Result<UploadOutcome, UploadError> {
        let total = data.len() as u64;
        self.publish(0, total);

        let grant = self.api.issue_token(meta).await?;
        debug!(ticket = %grant.ticket_id, bytes = total, "single-shot upload started");

        self.api.put_object(&grant.presigned_url, data.to_vec()).await?;
        self.publish(total, total);

        self.api.confirm(&grant.ticket_id, meta).await?;
        info!(ticket = %grant.ticket_id, bytes = total, "single-shot upload confirmed");
        Ok(UploadOutcome::Single {
            ticket_id: grant.ticket_id,
        })
    }

    // ── Multipart path ───────────────────────────────────────────────────────

    async fn upload_multipart(
        &self,
        plan: UploadPlan,
        data: &[u8],
        meta: &UploadMetadata,
    ) -> Result<UploadOutcome, UploadError> {
        let part_count = plan.part_count();
        let total = plan.total_size();
        self.publish(0, total);

        let session = self.api.init_multipart(meta, part_count).await?;
        info!(
            upload_id = %session.upload_id,
            parts = part_count,
            bytes = total,
            "multipart upload started"
        );

        let next_index = AtomicUsize::new(0);
        let uploaded = AtomicU64::new(0);
        let cancelled = AtomicBool::new(false);
        let first_error: Mutex<Option<ApiError>> = Mutex::new(None);
        let records: Mutex<Vec<PartRecord>> = Mutex::new(Vec::with_capacity(part_count as usize));

        let workers = (0..WORKER_COUNT).map(|worker| {
            self.run_worker(
                worker,
                plan,
                data,
                &session,
                &next_index,
                &uploaded,
                &cancelled,
                &first_error,
                &records,
            )
        });
        join_all(workers).await;

        if let Some(error) = take_error(&first_error) {
            warn!(upload_id = %session.upload_id, %error, "multipart upload aborted");
            return Err(error.into());
        }

        let mut manifest = records.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        manifest.sort_by_key(|record| record.part_number);
        debug_assert_eq!(manifest.len() as u64, part_count);

        self.api.complete(&session, &manifest, meta).await?;
        info!(upload_id = %session.upload_id, parts = part_count, "multipart upload completed");
        Ok(UploadOutcome::Multipart {
            session,
            parts: part_count,
        })
    }

    /// One worker: claim, fetch URL, PUT, record, repeat.
    #[allow(clippy::too_many_arguments)]
    async fn run_worker(
        &self,
        worker: usize,
        plan: UploadPlan,
        data: &[u8],
        session: &MultipartSession,
        next_index: &AtomicUsize,
        uploaded: &AtomicU64,
        cancelled: &AtomicBool,
        first_error: &Mutex<Option<ApiError>>,
        records: &Mutex<Vec<PartRecord>>,
    ) {
        loop {
            // A sibling failed; stop claiming.
            if cancelled.load(Ordering::SeqCst) {
                debug!(worker, "cancellation observed, worker exiting");
                return;
            }

            let index = next_index.fetch_add(1, Ordering::SeqCst) as u64;
            if index >= plan.part_count() {
                return;
            }
            let part_number = (index + 1) as u32;
            let (start, end) = plan.part_range(index);

            let outcome = async {
                let url = self.api.part_url(session, part_number).await?;
                let etag = self
                    .api
                    .upload_part(&url, part_number, data[start as usize..end as usize].to_vec())
                    .await?;
                Ok::<String, ApiError>(etag)
            }
            .await;

            match outcome {
                Ok(etag) => {
                    let done = uploaded.fetch_add(end - start, Ordering::SeqCst) + (end - start);
                    self.publish(done, plan.total_size());
                    records
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push(PartRecord {
                            part_number,
                            etag: normalize_etag(&etag),
                        });
                    debug!(worker, part_number, bytes = end - start, "part uploaded");
                }
                Err(error) => {
                    warn!(worker, part_number, %error, "part upload failed, cancelling siblings");
                    first_error
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .get_or_insert(error);
                    cancelled.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    }

    fn publish(&self, uploaded_bytes: u64, total_bytes: u64) {
        self.progress_tx.send_replace(Progress {
            uploaded_bytes,
            total_bytes,
        });
    }
}

fn take_error(slot: &Mutex<Option<ApiError>>) -> Option<ApiError> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::api::{MockUploadApi, TokenGrant};

    fn meta() -> UploadMetadata {
        UploadMetadata {
            name: "asset".to_string(),
            type_key: "model".to_string(),
            ..UploadMetadata::default()
        }
    }

    #[tokio::test]
    async fn test_small_payload_takes_the_single_shot_path() {
        // Arrange
        let mut api = MockUploadApi::new();
        api.expect_issue_token().times(1).returning(|_| {
            Ok(TokenGrant {
                ticket_id: "t-1".to_string(),
                presigned_url: "https://store/put".to_string(),
            })
        });
        api.expect_put_object()
            .withf(|url, body| url == "https://store/put" && body.as_slice() == b"hello")
            .times(1)
            .returning(|_, _| Ok(()));
        api.expect_confirm()
            .withf(|ticket, _| ticket == "t-1")
            .times(1)
            .returning(|_, _| Ok(()));
        api.expect_init_multipart().never();

        let coordinator = UploadCoordinator::new(Arc::new(api));

        // Act
        let outcome = coordinator.upload(b"hello", &meta()).await.unwrap();

        // Assert
        assert_eq!(
            outcome,
            UploadOutcome::Single {
                ticket_id: "t-1".to_string()
            }
        );
        let progress = *coordinator.progress().borrow();
        assert_eq!(progress.uploaded_bytes, 5);
        assert_eq!(progress.percent(), 100);
    }

    #[tokio::test]
    async fn test_single_shot_failure_skips_confirm() {
        let mut api = MockUploadApi::new();
        api.expect_issue_token().returning(|_| {
            Ok(TokenGrant {
                ticket_id: "t-1".to_string(),
                presigned_url: "https://store/put".to_string(),
            })
        });
        api.expect_put_object().returning(|_, _| {
            Err(ApiError::Status {
                endpoint: "presigned-put",
                status: 500,
            })
        });
        api.expect_confirm().never();

        let coordinator = UploadCoordinator::new(Arc::new(api));
        let err = coordinator.upload(b"hello", &meta()).await.unwrap_err();
        assert!(matches!(err, UploadError::Api(ApiError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_empty_payload_reports_full_progress() {
        let mut api = MockUploadApi::new();
        api.expect_issue_token().returning(|_| {
            Ok(TokenGrant {
                ticket_id: "t-0".to_string(),
                presigned_url: "https://store/put".to_string(),
            })
        });
        api.expect_put_object().returning(|_, _| Ok(()));
        api.expect_confirm().returning(|_, _| Ok(()));

        let coordinator = UploadCoordinator::new(Arc::new(api));
        coordinator.upload(b"", &meta()).await.unwrap();
        assert_eq!(coordinator.progress().borrow().percent(), 100);
    }
}
