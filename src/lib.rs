//! Batched export client for the KITopen publication database.
//!
//! A query is split into batches, each batch is exported by the server as a
//! ZIP archive holding one CSV table, and the rows come back as typed
//! publication records through a lazy, pull-based sequence.
//!
//! ```no_run
//! # async fn run() -> Result<(), kitopen::SearchError> {
//! use kitopen::{BatchingStrategy, KitOpen, KitOpenConfig, View};
//!
//! let kit = KitOpen::new(KitOpenConfig {
//!     batching: BatchingStrategy::YearBatching,
//!     ..KitOpenConfig::default()
//! })?;
//! let options = kit.options().author("MUSTERMANN, M*").start(2012).end(2013).view(View::full()).build()?;
//!
//! let mut result = kit.search(options)?;
//! while let Some(record) = result.next().await? {
//!     println!("{}", record);
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod kitopen;
pub mod publication;
pub mod search;
pub mod transport;

pub use crate::archive::ArchiveLayout;
pub use crate::config::KitOpenConfig;
pub use crate::error::{ErrorKind, SearchError};
pub use crate::kitopen::KitOpen;
pub use crate::publication::{Catalog, Field, FieldKind, Record, Value, View};
pub use crate::search::{
    Authors, Batch, BatchingStrategy, SearchDefaults, SearchOptions, SearchResult, SequenceState,
};
pub use crate::transport::{ExportTransport, HttpTransport};
