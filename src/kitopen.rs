//! Entry point: configuration plus transport, handing out result sequences.

use std::sync::Arc;

use serde_json::{Map, Value as Json};
use tracing::info;

use crate::config::KitOpenConfig;
use crate::error::SearchError;
use crate::publication::Catalog;
use crate::search::{BatchExecutor, SearchOptions, SearchOptionsBuilder, SearchResult};
use crate::transport::{ExportTransport, HttpTransport};

/// Client for KITopen publication exports.
///
/// Holds an immutable configuration. [`KitOpen::search`] never touches the
/// network; batches run when the returned sequence is pulled.
#[derive(Clone)]
pub struct KitOpen {
    config: KitOpenConfig,
    executor: BatchExecutor,
    catalog: Arc<Catalog>,
}

impl KitOpen {
    /// Creates a client that talks HTTP to `config.search_url`.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Configuration` if the configuration is invalid
    /// or the HTTP client cannot be built.
    pub fn new(config: KitOpenConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let transport = HttpTransport::from_config(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(
        config: KitOpenConfig,
        transport: Arc<dyn ExportTransport>,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let executor = BatchExecutor::new(transport, config.export_settings());
        Ok(Self {
            config,
            executor,
            catalog: Arc::new(Catalog::kitopen()),
        })
    }

    /// Replaces the field-to-column mapping used for materialization.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn config(&self) -> &KitOpenConfig {
        &self.config
    }

    /// Options builder seeded with the configured search defaults.
    pub fn options(&self) -> SearchOptionsBuilder {
        SearchOptionsBuilder::new(&self.config.defaults)
    }

    /// Plans the batches for `options` and returns the lazy result sequence.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Configuration` if the batching strategy cannot
    /// plan these options (year batching over an open range).
    pub fn search(&self, options: SearchOptions) -> Result<SearchResult, SearchError> {
        let batches = self.config.batching.plan(&options)?;

        info!(
            "[SEARCH] Planned {} batch(es) with {:?}, view {}",
            batches.len(),
            self.config.batching,
            options.view().name()
        );

        Ok(SearchResult::new(
            self.executor.clone(),
            batches,
            self.config.archive.clone(),
            Arc::clone(&self.catalog),
        ))
    }

    /// Like [`search`](Self::search), reading options from a key/value map
    /// with gaps filled from the configured defaults.
    pub fn search_map(&self, query: &Map<String, Json>) -> Result<SearchResult, SearchError> {
        let options = SearchOptions::from_map(query, &self.config.defaults)?;
        self.search(options)
    }
}
