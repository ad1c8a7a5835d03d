//! Encoding of search options into KITopen report request parameters.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::search::options::SearchOptions;

/// Fixed parameters of a publication export request.
const DEFAULT_PARAMETERS: &[(&str, &str)] = &[
    ("external_publications", "kit"),
    ("open_access_availability", "do_not_care"),
    ("full_text", "do_not_care"),
    ("key_figures", "number_of_publications"),
    ("year", "2015-"),
    ("consider_online_advance_publication_date", "true"),
    ("consider_additional_pof_structures", "false"),
    ("row", "type"),
    ("column", "year"),
    ("authors", "MUSTERMANN"),
    ("table_fields", "title"),
    ("format", "csv"),
    ("publications", "true"),
];

/// Query-string parameters for one export request.
///
/// Serializes as a flat map, so it can be passed to `reqwest`'s `.query()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExportParameters(BTreeMap<String, String>);

impl ExportParameters {
    /// Defaults overlaid with the author, year range and view of `options`.
    pub fn from_options(options: &SearchOptions) -> Self {
        let mut params: BTreeMap<String, String> = DEFAULT_PARAMETERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        if let Some(author) = options.author() {
            params.insert("authors".to_string(), author.to_query());
        }

        let bound = |y: Option<i32>| y.map(|y| y.to_string()).unwrap_or_default();
        params.insert(
            "year".to_string(),
            format!("{}-{}", bound(options.start()), bound(options.end())),
        );

        let fields: Vec<&str> = options.view().fields().iter().map(|f| f.as_str()).collect();
        params.insert("table_fields".to_string(), fields.join(","));

        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publication::View;

    #[test]
    fn encodes_author_years_and_view() {
        let options = SearchOptions::builder()
            .author("MUSTERMANN, M*")
            .start(2012)
            .end(2013)
            .build()
            .unwrap();

        let params = options.to_parameters();

        assert_eq!(params.get("authors"), Some("MUSTERMANN, M*"));
        assert_eq!(params.get("year"), Some("2012-2013"));
        assert_eq!(
            params.get("table_fields"),
            Some("doi,id,title,author,year,pof_structure,impact_factor,insert_date")
        );
        assert_eq!(params.get("format"), Some("csv"));
        assert_eq!(params.len(), DEFAULT_PARAMETERS.len());
    }

    #[test]
    fn open_bounds_encode_as_empty() {
        let options = SearchOptions::builder().start(2015).open_end().build().unwrap();
        assert_eq!(options.to_parameters().get("year"), Some("2015-"));

        let options = SearchOptions::builder().open_start().end(2001).build().unwrap();
        assert_eq!(options.to_parameters().get("year"), Some("-2001"));
    }

    #[test]
    fn author_alternatives_joined_with_or() {
        let options = SearchOptions::builder()
            .author(vec!["A*".to_string(), "B*".to_string()])
            .build()
            .unwrap();
        assert_eq!(options.to_parameters().get("authors"), Some("A* or B*"));
    }

    #[test]
    fn full_view_lists_every_field() {
        let options = SearchOptions::builder().view(View::full()).build().unwrap();
        let params = options.to_parameters();
        let fields = params.get("table_fields").unwrap();
        assert_eq!(fields.split(',').count(), View::full().len());
    }

    #[test]
    fn serializes_as_flat_map() {
        let options = SearchOptions::builder().build().unwrap();
        let json = serde_json::to_value(options.to_parameters()).unwrap();
        assert_eq!(json["publications"], "true");
        assert_eq!(json["row"], "type");
    }
}
