//! Batching strategies: splitting one logical query into export requests.
//!
//! Large exports can run into a server-side timeout, so a query may be split
//! into several smaller requests. Every strategy returns a non-empty list of
//! batches that are disjoint, cover the query's year range exactly, and are
//! ordered ascending by year.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::search::options::SearchOptions;

// ─────────────────────────────────────────────────────────────────────────────
// Batch
// ─────────────────────────────────────────────────────────────────────────────

/// One physical export request derived from a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    index: usize,
    options: SearchOptions,
}

impl Batch {
    /// Position of this batch in its plan.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Year slice as `start-end`, with open bounds left empty.
    pub fn year_label(&self) -> String {
        let bound = |y: Option<i32>| y.map(|y| y.to_string()).unwrap_or_default();
        format!("{}-{}", bound(self.options.start()), bound(self.options.end()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BatchingStrategy
// ─────────────────────────────────────────────────────────────────────────────

/// How a query is split into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BatchingStrategy {
    /// A single request for the whole query.
    #[default]
    NoBatching,
    /// One request per year. Needs both year bounds.
    YearBatching,
    /// One request per window of `years` consecutive years. Needs both bounds.
    YearWindow { years: u32 },
}

impl BatchingStrategy {
    /// Splits `options` into an ordered list of batches.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Configuration` if a year-based strategy is used
    /// without both year bounds, or with a zero-width window.
    pub fn plan(&self, options: &SearchOptions) -> Result<Vec<Batch>, SearchError> {
        match *self {
            BatchingStrategy::NoBatching => Ok(vec![Batch {
                index: 0,
                options: options.clone(),
            }]),
            BatchingStrategy::YearBatching => plan_year_windows(options, 1),
            BatchingStrategy::YearWindow { years } => plan_year_windows(options, years),
        }
    }
}

fn plan_year_windows(options: &SearchOptions, width: u32) -> Result<Vec<Batch>, SearchError> {
    if width == 0 {
        return Err(SearchError::Configuration(
            "year window must span at least one year".to_string(),
        ));
    }

    let (start, end) = match (options.start(), options.end()) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(SearchError::Configuration(
                "year batching needs both a start and an end year".to_string(),
            ))
        }
    };

    // i64 so `from + width` cannot overflow near i32::MAX.
    let (start, end, width) = (i64::from(start), i64::from(end), i64::from(width));
    let mut batches = Vec::new();
    let mut from = start;

    while from <= end {
        let to = (from + width - 1).min(end);
        batches.push(Batch {
            index: batches.len(),
            options: options.with_years(from as i32, to as i32),
        });
        from = to + 1;
    }

    Ok(batches)
}
