//! Search options: the logical query handed to `KitOpen::search`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::SearchError;
use crate::publication::View;
use crate::search::parameters::ExportParameters;

/// Keys accepted by [`SearchOptions::from_map`].
const OPTION_KEYS: &[&str] = &["author", "start", "end", "view"];

// ─────────────────────────────────────────────────────────────────────────────
// Authors
// ─────────────────────────────────────────────────────────────────────────────

/// One author pattern or several alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Authors {
    Single(String),
    Any(Vec<String>),
}

impl Authors {
    /// Encoded form: alternatives joined with `" or "`.
    pub fn to_query(&self) -> String {
        match self {
            Authors::Single(pattern) => pattern.clone(),
            Authors::Any(patterns) => patterns.join(" or "),
        }
    }
}

impl From<&str> for Authors {
    fn from(pattern: &str) -> Self {
        Authors::Single(pattern.to_string())
    }
}

impl From<String> for Authors {
    fn from(pattern: String) -> Self {
        Authors::Single(pattern)
    }
}

impl From<Vec<String>> for Authors {
    fn from(patterns: Vec<String>) -> Self {
        Authors::Any(patterns)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SearchDefaults
// ─────────────────────────────────────────────────────────────────────────────

/// Values used for options a caller leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub author: Option<Authors>,
    pub start: Option<i32>,
    pub end: Option<i32>,
    pub view: View,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            author: Some(Authors::from("MUSTERMANN, M*")),
            start: Some(2000),
            end: None,
            view: View::basic(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SearchOptions
// ─────────────────────────────────────────────────────────────────────────────

/// A validated logical query.
///
/// Year bounds are inclusive; `None` means unbounded. Once built the options
/// are never mutated; batching derives new values with narrowed years.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    author: Option<Authors>,
    start: Option<i32>,
    end: Option<i32>,
    view: View,
}

impl SearchOptions {
    /// Builder seeded with [`SearchDefaults::default`].
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::new(&SearchDefaults::default())
    }

    /// Builds options from a key/value map, filling gaps from `defaults`.
    ///
    /// Accepted keys are `author` (string or array of strings), `start` and
    /// `end` (year as string or integer; empty string means unbounded) and
    /// `view` (`"basic"`, `"full"`, an array of field identifiers, or
    /// `{"name", "fields"}`).
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Configuration` for unknown keys, malformed
    /// values or `start > end`, and `SearchError::InvalidView` for bad views.
    pub fn from_map(map: &Map<String, Json>, defaults: &SearchDefaults) -> Result<Self, SearchError> {
        if let Some(unknown) = map.keys().find(|k| !OPTION_KEYS.contains(&k.as_str())) {
            return Err(SearchError::Configuration(format!(
                "unrecognized search option '{}'",
                unknown
            )));
        }

        let mut builder = SearchOptionsBuilder::new(defaults);

        if let Some(author) = map.get("author") {
            builder.author = Some(parse_authors(author)?);
        }
        if let Some(start) = map.get("start") {
            builder.start = parse_year("start", start)?;
        }
        if let Some(end) = map.get("end") {
            builder.end = parse_year("end", end)?;
        }
        if let Some(view) = map.get("view") {
            builder.view = View::deserialize(view).map_err(|e| SearchError::InvalidView(e.to_string()))?;
        }

        builder.build()
    }

    pub fn author(&self) -> Option<&Authors> {
        self.author.as_ref()
    }

    pub fn start(&self) -> Option<i32> {
        self.start
    }

    pub fn end(&self) -> Option<i32> {
        self.end
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Copy of these options restricted to `[start, end]`.
    pub(crate) fn with_years(&self, start: i32, end: i32) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..self.clone()
        }
    }

    /// Encodes the options as export request parameters.
    pub fn to_parameters(&self) -> ExportParameters {
        ExportParameters::from_options(self)
    }
}

impl fmt::Display for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = |y: Option<i32>| y.map(|y| y.to_string()).unwrap_or_default();
        write!(
            f,
            "SearchOptions(author=\"{}\", start=\"{}\", end=\"{}\", view={})",
            self.author.as_ref().map(Authors::to_query).unwrap_or_default(),
            year(self.start),
            year(self.end),
            self.view
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SearchOptionsBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`SearchOptions`].
#[derive(Debug, Clone)]
pub struct SearchOptionsBuilder {
    author: Option<Authors>,
    start: Option<i32>,
    end: Option<i32>,
    view: View,
}

impl SearchOptionsBuilder {
    pub fn new(defaults: &SearchDefaults) -> Self {
        Self {
            author: defaults.author.clone(),
            start: defaults.start,
            end: defaults.end,
            view: defaults.view.clone(),
        }
    }

    pub fn author(mut self, author: impl Into<Authors>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn start(mut self, year: i32) -> Self {
        self.start = Some(year);
        self
    }

    pub fn end(mut self, year: i32) -> Self {
        self.end = Some(year);
        self
    }

    /// Removes the lower year bound.
    pub fn open_start(mut self) -> Self {
        self.start = None;
        self
    }

    /// Removes the upper year bound.
    pub fn open_end(mut self) -> Self {
        self.end = None;
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    /// # Errors
    ///
    /// Returns `SearchError::Configuration` if `start > end`.
    pub fn build(self) -> Result<SearchOptions, SearchError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(SearchError::Configuration(format!(
                    "start year {} is after end year {}",
                    start, end
                )));
            }
        }

        Ok(SearchOptions {
            author: self.author,
            start: self.start,
            end: self.end,
            view: self.view,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Map value parsing
// ─────────────────────────────────────────────────────────────────────────────

fn parse_authors(value: &Json) -> Result<Authors, SearchError> {
    match value {
        Json::String(s) => Ok(Authors::Single(s.clone())),
        Json::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    SearchError::Configuration("author list must contain only strings".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Authors::Any),
        other => Err(SearchError::Configuration(format!(
            "author must be a string or a list of strings, got {}",
            other
        ))),
    }
}

fn parse_year(key: &str, value: &Json) -> Result<Option<i32>, SearchError> {
    let invalid = || SearchError::Configuration(format!("{} must be a year, got {}", key, value));

    match value {
        Json::Null => Ok(None),
        Json::String(s) if s.trim().is_empty() => Ok(None),
        Json::String(s) => s.trim().parse::<i32>().map(Some).map_err(|_| invalid()),
        Json::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publication::Field;
    use serde_json::json;

    fn map(value: Json) -> Map<String, Json> {
        match value {
            Json::Object(map) => map,
            _ => panic!("test input must be an object"),
        }
    }

    #[test]
    fn from_map_reads_all_keys() {
        let options = SearchOptions::from_map(
            &map(json!({"author": "MUSTERMANN, M*", "start": "2012", "end": "2013", "view": "full"})),
            &SearchDefaults::default(),
        )
        .unwrap();

        assert_eq!(options.author(), Some(&Authors::from("MUSTERMANN, M*")));
        assert_eq!(options.start(), Some(2012));
        assert_eq!(options.end(), Some(2013));
        assert_eq!(options.view(), &View::full());
    }

    #[test]
    fn from_map_fills_defaults() {
        let options = SearchOptions::from_map(&Map::new(), &SearchDefaults::default()).unwrap();
        assert_eq!(options.start(), Some(2000));
        assert_eq!(options.end(), None);
        assert_eq!(options.view(), &View::basic());
        assert!(options.author().is_some());
    }

    #[test]
    fn from_map_rejects_unknown_key() {
        let err = SearchOptions::from_map(&map(json!({"type": "article"})), &SearchDefaults::default())
            .unwrap_err();
        assert!(matches!(err, SearchError::Configuration(msg) if msg.contains("'type'")));
    }

    #[test]
    fn from_map_rejects_inverted_range() {
        let err = SearchOptions::from_map(
            &map(json!({"start": 2015, "end": 2010})),
            &SearchDefaults::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
    }

    #[test]
    fn from_map_year_forms() {
        let defaults = SearchDefaults::default();
        let open = SearchOptions::from_map(&map(json!({"start": "", "end": null})), &defaults).unwrap();
        assert_eq!(open.start(), None);
        assert_eq!(open.end(), None);

        assert!(SearchOptions::from_map(&map(json!({"start": "20x2"})), &defaults).is_err());
        assert!(SearchOptions::from_map(&map(json!({"start": true})), &defaults).is_err());
    }

    #[test]
    fn from_map_author_list() {
        let options = SearchOptions::from_map(
            &map(json!({"author": ["A*", "B*"]})),
            &SearchDefaults::default(),
        )
        .unwrap();
        assert_eq!(options.author().unwrap().to_query(), "A* or B*");

        assert!(SearchOptions::from_map(&map(json!({"author": [1]})), &SearchDefaults::default()).is_err());
    }

    #[test]
    fn from_map_custom_view_and_invalid_view() {
        let options = SearchOptions::from_map(
            &map(json!({"view": ["doi", "year"]})),
            &SearchDefaults::default(),
        )
        .unwrap();
        assert_eq!(options.view().fields(), &[Field::Doi, Field::Year]);

        let err = SearchOptions::from_map(&map(json!({"view": "tiny"})), &SearchDefaults::default())
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidView(_)));
    }

    #[test]
    fn builder_open_bounds() {
        let options = SearchOptions::builder().open_start().open_end().build().unwrap();
        assert_eq!(options.start(), None);
        assert_eq!(options.end(), None);
    }

    #[test]
    fn with_years_keeps_other_constraints() {
        let options = SearchOptions::builder()
            .author("X*")
            .start(2010)
            .end(2020)
            .view(View::full())
            .build()
            .unwrap();
        let narrowed = options.with_years(2015, 2015);
        assert_eq!(narrowed.start(), Some(2015));
        assert_eq!(narrowed.end(), Some(2015));
        assert_eq!(narrowed.author(), options.author());
        assert_eq!(narrowed.view(), options.view());
    }

    #[test]
    fn display_matches_query_shape() {
        let options = SearchOptions::builder().author("A*").start(2012).open_end().build().unwrap();
        assert_eq!(
            options.to_string(),
            "SearchOptions(author=\"A*\", start=\"2012\", end=\"\", view=View(name=basic, #fields=8))"
        );
    }
}
