//! Transport seam between the batch executor and the export server.
//!
//! The server's export is asynchronous: a request either answers with the
//! finished archive right away or hands back a job that is polled until the
//! archive is ready. [`ExportTransport`] models exactly those two calls so the
//! executor owns the waiting policy and tests can substitute fakes.

mod http;

use std::future::Future;
use std::pin::Pin;

use crate::error::SearchError;
use crate::search::ExportParameters;

pub use http::{sanitize_url_for_logs, HttpTransport, LoggingMode};

/// Boxed future returned by transport calls.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SearchError>> + Send + 'a>>;

/// Handle for a queued export job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    /// Opaque identifier understood by the transport (for HTTP, the job URL).
    pub id: String,
}

/// Answer to an export submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSubmission {
    /// The archive was produced synchronously.
    Completed(Vec<u8>),
    /// The server queued a job; poll it until ready.
    Queued(ExportJob),
}

/// Answer to an export poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Pending,
    Ready(Vec<u8>),
}

/// Network access to the export server.
///
/// Implementations perform single requests only; retries, backoff and
/// timeouts belong to the caller.
pub trait ExportTransport: Send + Sync {
    /// Triggers an export for the given parameters.
    fn submit_export<'a>(
        &'a self,
        params: &'a ExportParameters,
    ) -> TransportFuture<'a, ExportSubmission>;

    /// Checks whether a queued export has finished.
    fn poll_export<'a>(&'a self, job: &'a ExportJob) -> TransportFuture<'a, ExportStatus>;
}
