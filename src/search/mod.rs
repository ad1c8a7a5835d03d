//! Search pipeline.
//!
//! This module provides:
//! - Query options and their encoding into export request parameters
//! - Batching strategies that split a query into export requests
//! - The batch executor (submit, poll with backoff, timeout)
//! - The lazy result sequence handed back to callers

mod batching;
mod executor;
mod options;
mod parameters;
mod result;

pub use batching::{Batch, BatchingStrategy};
pub use executor::{BatchExecutor, ExportSettings};
pub use options::{Authors, SearchDefaults, SearchOptions, SearchOptionsBuilder};
pub use parameters::ExportParameters;
pub use result::{SearchResult, SequenceState};
