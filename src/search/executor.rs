//! Batch executor: turns one batch into the bytes of its export archive.
//!
//! Submits the export, polls a queued job with exponential backoff, and bounds
//! the whole wait by the configured export timeout. No retries happen here;
//! callers decide using [`SearchError::is_retryable`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::archive::is_zip;
use crate::error::SearchError;
use crate::search::batching::Batch;
use crate::search::parameters::ExportParameters;
use crate::transport::{ExportStatus, ExportSubmission, ExportTransport};

// ─────────────────────────────────────────────────────────────────────────────
// ExportSettings
// ─────────────────────────────────────────────────────────────────────────────

/// Waiting policy for one export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings {
    /// Upper bound for submit plus all polls.
    pub export_timeout: Duration,
    /// First poll delay.
    pub poll_initial: Duration,
    /// Poll delays double up to this value.
    pub poll_max: Duration,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            export_timeout: Duration::from_secs(600),
            poll_initial: Duration::from_millis(1000),
            poll_max: Duration::from_millis(10000),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BatchExecutor
// ─────────────────────────────────────────────────────────────────────────────

/// Executes batches against an [`ExportTransport`].
#[derive(Clone)]
pub struct BatchExecutor {
    transport: Arc<dyn ExportTransport>,
    settings: ExportSettings,
}

impl BatchExecutor {
    pub fn new(transport: Arc<dyn ExportTransport>, settings: ExportSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Runs the export for `batch` and returns the archive bytes.
    ///
    /// # Errors
    ///
    /// - `SearchError::ExportTimeout` if the archive is not ready within
    ///   `export_timeout`
    /// - `SearchError::Transport` if a request fails
    /// - `SearchError::ExportFormat` if the payload is not a ZIP archive
    pub async fn execute(&self, batch: &Batch) -> Result<Vec<u8>, SearchError> {
        let params = batch.options().to_parameters();
        let started = Instant::now();

        info!(
            "[EXPORT] Submitting batch {} (years {})",
            batch.index(),
            batch.year_label()
        );

        let bytes = match tokio::time::timeout(self.settings.export_timeout, self.run(&params)).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "[EXPORT] Batch {} not ready after {}s",
                    batch.index(),
                    self.settings.export_timeout.as_secs()
                );
                return Err(SearchError::ExportTimeout {
                    waited_secs: self.settings.export_timeout.as_secs(),
                });
            }
        };

        if !is_zip(&bytes) {
            return Err(SearchError::ExportFormat(format!(
                "batch {} returned {} bytes without a ZIP signature",
                batch.index(),
                bytes.len()
            )));
        }

        info!(
            "[EXPORT] Batch {} downloaded: {} bytes in {}ms",
            batch.index(),
            bytes.len(),
            started.elapsed().as_millis()
        );

        Ok(bytes)
    }

    async fn run(&self, params: &ExportParameters) -> Result<Vec<u8>, SearchError> {
        let job = match self.transport.submit_export(params).await? {
            ExportSubmission::Completed(bytes) => return Ok(bytes),
            ExportSubmission::Queued(job) => job,
        };

        debug!("[EXPORT] Export queued, polling for completion");

        let mut poll_interval = self.settings.poll_initial;
        let mut polls = 0u32;

        loop {
            tokio::time::sleep(poll_interval).await;
            polls += 1;

            match self.transport.poll_export(&job).await? {
                ExportStatus::Ready(bytes) => {
                    debug!("[EXPORT] Export ready after {} polls", polls);
                    return Ok(bytes);
                }
                ExportStatus::Pending => {
                    debug!("[EXPORT] Export pending, next poll in {}ms", poll_interval.as_millis());
                    poll_interval = poll_interval.saturating_mul(2).min(self.settings.poll_max);
                }
            }
        }
    }
}
