//! Lazy result sequence over a batch plan.
//!
//! Batches are executed on demand, one at a time and in plan order. Each
//! batch's archive is parsed and materialized in full on a blocking thread,
//! then its records are handed out one by one. A failing batch stops the
//! sequence for good; records of later batches are never produced.

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use tracing::{info, warn};

use crate::archive::{self, ArchiveLayout};
use crate::error::SearchError;
use crate::publication::{Catalog, Record, View};
use crate::search::batching::Batch;
use crate::search::executor::BatchExecutor;

/// Observable position of a [`SearchResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceState {
    /// No batch executed yet.
    Pending,
    /// Yielding records of the batch at this index.
    InBatch(usize),
    /// Every batch was consumed.
    Exhausted,
    /// A batch failed; the error is returned on every later call.
    Failed(SearchError),
}

enum Cursor {
    Pending,
    InBatch {
        index: usize,
        records: std::vec::IntoIter<Record>,
    },
    Exhausted,
    Failed(SearchError),
}

/// Records of a search, pulled with [`SearchResult::next`].
///
/// Single pass: once exhausted, [`SearchResult::restart`] starts over and
/// executes every batch again.
pub struct SearchResult {
    executor: BatchExecutor,
    batches: Vec<Batch>,
    layout: ArchiveLayout,
    catalog: Arc<Catalog>,
    cursor: Cursor,
}

impl SearchResult {
    pub(crate) fn new(
        executor: BatchExecutor,
        batches: Vec<Batch>,
        layout: ArchiveLayout,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            executor,
            batches,
            layout,
            catalog,
            cursor: Cursor::Pending,
        }
    }

    /// The batch plan, in execution order.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn state(&self) -> SequenceState {
        match &self.cursor {
            Cursor::Pending => SequenceState::Pending,
            Cursor::InBatch { index, .. } => SequenceState::InBatch(*index),
            Cursor::Exhausted => SequenceState::Exhausted,
            Cursor::Failed(err) => SequenceState::Failed(err.clone()),
        }
    }

    /// Returns the next record, `Ok(None)` once all batches are consumed.
    ///
    /// Dropping the returned future before it completes leaves the cursor
    /// where it was; the interrupted batch runs again on the next call.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing batch, on this call and every
    /// later one until [`restart`](Self::restart).
    pub async fn next(&mut self) -> Result<Option<Record>, SearchError> {
        loop {
            let next_index = match &mut self.cursor {
                Cursor::Exhausted => return Ok(None),
                Cursor::Failed(err) => return Err(err.clone()),
                Cursor::InBatch { index, records } => match records.next() {
                    Some(record) => return Ok(Some(record)),
                    None => *index + 1,
                },
                Cursor::Pending => 0,
            };

            let Some(batch) = self.batches.get(next_index) else {
                info!("[SEARCH] Exhausted after {} batches", self.batches.len());
                self.cursor = Cursor::Exhausted;
                return Ok(None);
            };

            info!(
                "[SEARCH] Advancing to batch {}/{} (years {})",
                next_index + 1,
                self.batches.len(),
                batch.year_label()
            );

            match self.load_batch(batch).await {
                Ok(records) => {
                    info!("[SEARCH] Batch {} yielded {} records", next_index, records.len());
                    self.cursor = Cursor::InBatch {
                        index: next_index,
                        records: records.into_iter(),
                    };
                }
                Err(err) => {
                    warn!("[SEARCH] Batch {} failed: {}", next_index, err);
                    self.cursor = Cursor::Failed(err.clone());
                    return Err(err);
                }
            }
        }
    }

    /// Resets the sequence; the next call to [`next`](Self::next) executes
    /// the first batch again.
    pub fn restart(&mut self) {
        info!("[SEARCH] Restarting sequence of {} batches", self.batches.len());
        self.cursor = Cursor::Pending;
    }

    /// Drains the remaining records into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first batch error; records gathered so far are dropped.
    pub async fn collect_records(&mut self) -> Result<Vec<Record>, SearchError> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Adapts the sequence into a stream that ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Record, SearchError>> + Send {
        stream::try_unfold(self, |mut result| async move {
            Ok(result.next().await?.map(|record| (record, result)))
        })
    }

    async fn load_batch(&self, batch: &Batch) -> Result<Vec<Record>, SearchError> {
        let bytes = self.executor.execute(batch).await?;

        let layout = self.layout.clone();
        let view = batch.options().view().clone();
        let catalog = Arc::clone(&self.catalog);

        tokio::task::spawn_blocking(move || materialize_archive(&bytes, &layout, &view, &catalog))
            .await
            .map_err(|e| SearchError::ArchiveStructure(format!("archive parsing task failed: {}", e)))?
    }
}

impl fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResult")
            .field("batches", &self.batches.len())
            .field("state", &self.state())
            .finish()
    }
}

/// Parses the archive and materializes every row with `view`.
///
/// Stops at the first error; the spooled entry is removed when the rows go
/// out of scope.
fn materialize_archive(
    bytes: &[u8],
    layout: &ArchiveLayout,
    view: &View,
    catalog: &Catalog,
) -> Result<Vec<Record>, SearchError> {
    archive::parse(bytes, layout)?
        .map(|row| row.and_then(|row| Record::materialize(&row, view, catalog)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::{csv_text, zip_archive};
    use crate::publication::Field;
    use crate::search::{BatchingStrategy, ExportSettings, SearchOptions};
    use crate::transport::test_support::FakeTransport;
    use crate::transport::{ExportSubmission, ExportTransport};
    use futures_util::StreamExt;

    const BASIC_HEADER: &[&str] = &[
        "doi",
        "id",
        "title",
        "author",
        "year",
        "pof_structure",
        "impact_factor",
        "insert_date",
    ];

    /// Archive with one publication per title, all in `year`.
    fn year_archive(year: &str, titles: &[&str]) -> Vec<u8> {
        let rows: Vec<Vec<&str>> = titles
            .iter()
            .map(|title| vec!["10.1/x", "KIT-1", *title, "Mustermann M.", year, "", "1.5", "2020-01-01"])
            .collect();
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        let csv = csv_text(BASIC_HEADER, &rows);
        zip_archive(&[("Publikationen.csv", csv.as_str())])
    }

    /// Transport answering `2012` and `2013` slices with distinct archives.
    fn by_year_transport() -> Arc<FakeTransport> {
        Arc::new(FakeTransport::new(|params| {
            let archive = match params.get("year") {
                Some("2012-2012") => year_archive("2012", &["A", "B"]),
                Some("2013-2013") => year_archive("2013", &["C"]),
                _ => year_archive("2012", &["A", "B", "C"]),
            };
            Ok(ExportSubmission::Completed(archive))
        }))
    }

    fn result_for(fake: &Arc<FakeTransport>, strategy: BatchingStrategy) -> SearchResult {
        let options = SearchOptions::builder()
            .author("MUSTERMANN, M*")
            .start(2012)
            .end(2013)
            .build()
            .unwrap();
        let transport: Arc<dyn ExportTransport> = fake.clone();
        SearchResult::new(
            BatchExecutor::new(transport, ExportSettings::default()),
            strategy.plan(&options).unwrap(),
            ArchiveLayout::default(),
            Arc::new(Catalog::kitopen()),
        )
    }

    fn titles(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.get(Field::Title).and_then(|v| v.as_str()).unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn year_batches_execute_in_order() {
        let fake = by_year_transport();
        let mut result = result_for(&fake, BatchingStrategy::YearBatching);
        assert_eq!(result.batches().len(), 2);
        assert_eq!(result.state(), SequenceState::Pending);
        assert!(fake.submitted().is_empty());

        let first = result.next().await.unwrap().unwrap();
        assert_eq!(first.get(Field::Year).and_then(|v| v.as_i64()), Some(2012));
        assert_eq!(result.state(), SequenceState::InBatch(0));
        assert_eq!(fake.submitted_years(), vec!["2012-2012"]);

        let rest = result.collect_records().await.unwrap();
        assert_eq!(titles(&rest), vec!["B", "C"]);
        assert_eq!(fake.submitted_years(), vec!["2012-2012", "2013-2013"]);
        assert_eq!(result.state(), SequenceState::Exhausted);
    }

    #[tokio::test]
    async fn records_carry_exactly_the_view_fields() {
        let fake = by_year_transport();
        let mut result = result_for(&fake, BatchingStrategy::NoBatching);
        let record = result.next().await.unwrap().unwrap();

        let fields: Vec<Field> = record.fields().collect();
        assert_eq!(fields, View::basic().fields());
        assert_eq!(record.get(Field::ImpactFactor).and_then(|v| v.as_f64()), Some(1.5));
    }

    #[tokio::test]
    async fn end_signal_is_stable() {
        let fake = by_year_transport();
        let mut result = result_for(&fake, BatchingStrategy::YearBatching);
        result.collect_records().await.unwrap();

        assert_eq!(result.next().await.unwrap(), None);
        assert_eq!(result.next().await.unwrap(), None);
        assert_eq!(fake.submitted().len(), 2);
    }

    #[tokio::test]
    async fn restart_re_executes_identically() {
        let fake = by_year_transport();
        let mut result = result_for(&fake, BatchingStrategy::YearBatching);

        let first_pass = result.collect_records().await.unwrap();
        result.restart();
        assert_eq!(result.state(), SequenceState::Pending);
        let second_pass = result.collect_records().await.unwrap();

        assert_eq!(first_pass, second_pass);
        assert_eq!(
            fake.submitted_years(),
            vec!["2012-2012", "2013-2013", "2012-2012", "2013-2013"]
        );
    }

    #[tokio::test]
    async fn no_batching_is_idempotent() {
        let fake = by_year_transport();
        let first = result_for(&fake, BatchingStrategy::NoBatching)
            .collect_records()
            .await
            .unwrap();
        let second = result_for(&fake, BatchingStrategy::NoBatching)
            .collect_records()
            .await
            .unwrap();

        assert_eq!(titles(&first), vec!["A", "B", "C"]);
        assert_eq!(first, second);
        assert_eq!(fake.submitted_years(), vec!["2012-2013", "2012-2013"]);
    }

    #[tokio::test]
    async fn ambiguous_archive_fails_before_any_record() {
        let csv = csv_text(BASIC_HEADER, &[]);
        let fake = Arc::new(FakeTransport::completed(zip_archive(&[
            ("a/Publikationen.csv", csv.as_str()),
            ("b/Publikationen.csv", csv.as_str()),
        ])));
        let mut result = result_for(&fake, BatchingStrategy::NoBatching);

        let err = result.next().await.unwrap_err();
        assert!(matches!(err, SearchError::ArchiveStructure(_)));
    }

    #[tokio::test]
    async fn short_row_reports_its_position() {
        let csv = format!(
            "{}\n{}\n{}\n",
            BASIC_HEADER.join(","),
            "10.1/x,KIT-1,A,M.,2012,,1,2020-01-01",
            "10.1/y,KIT-2,B"
        );
        let fake = Arc::new(FakeTransport::completed(zip_archive(&[(
            "Publikationen.csv",
            csv.as_str(),
        )])));
        let mut result = result_for(&fake, BatchingStrategy::NoBatching);

        let err = result.next().await.unwrap_err();
        assert!(matches!(err, SearchError::RowFormat { row: 2, line: 3, .. }));
    }

    #[tokio::test]
    async fn failure_is_sticky_and_later_batches_never_run() {
        let fake = Arc::new(FakeTransport::new(|params| match params.get("year") {
            Some("2012-2012") => Err(SearchError::Transport {
                message: "Export server answered 503".to_string(),
                status: Some(503),
            }),
            _ => Ok(ExportSubmission::Completed(year_archive("2013", &["C"]))),
        }));
        let mut result = result_for(&fake, BatchingStrategy::YearBatching);

        let err = result.next().await.unwrap_err();
        assert!(matches!(err, SearchError::Transport { status: Some(503), .. }));
        assert_eq!(result.next().await.unwrap_err(), err);
        assert_eq!(result.state(), SequenceState::Failed(err));
        assert_eq!(fake.submitted_years(), vec!["2012-2012"]);
    }

    #[tokio::test]
    async fn empty_batch_advances_to_next() {
        let fake = Arc::new(FakeTransport::new(|params| {
            let archive = match params.get("year") {
                Some("2012-2012") => year_archive("2012", &[]),
                _ => year_archive("2013", &["C"]),
            };
            Ok(ExportSubmission::Completed(archive))
        }));
        let mut result = result_for(&fake, BatchingStrategy::YearBatching);

        let record = result.next().await.unwrap().unwrap();
        assert_eq!(titles(&[record]), vec!["C"]);
        assert_eq!(result.state(), SequenceState::InBatch(1));
    }

    #[tokio::test]
    async fn stream_yields_records_then_error() {
        let fake = Arc::new(FakeTransport::new(|params| match params.get("year") {
            Some("2012-2012") => Ok(ExportSubmission::Completed(year_archive("2012", &["A"]))),
            _ => Ok(ExportSubmission::Completed(b"not an archive".to_vec())),
        }));
        let items: Vec<_> = result_for(&fake, BatchingStrategy::YearBatching)
            .into_stream()
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(SearchError::ExportFormat(_))));
    }

    #[test]
    fn debug_shows_plan_size_and_state() {
        let fake = by_year_transport();
        let result = result_for(&fake, BatchingStrategy::YearBatching);
        assert_eq!(format!("{:?}", result), "SearchResult { batches: 2, state: Pending }");
    }
}
