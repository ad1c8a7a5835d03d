use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::publication::catalog::Field;

/// Fields of the predefined `basic` view.
const BASIC_FIELDS: &[Field] = &[
    Field::Doi,
    Field::Id,
    Field::Title,
    Field::Author,
    Field::Year,
    Field::PofStructure,
    Field::ImpactFactor,
    Field::InsertDate,
];

/// A named, ordered selection of catalog fields.
///
/// The view decides which columns the export is asked for and which fields a
/// [`Record`](crate::Record) carries. Fields are unique and kept in the order
/// given at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    name: String,
    fields: Vec<Field>,
}

impl View {
    /// Creates a view, rejecting duplicate fields.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self, SearchError> {
        let name = name.into();
        if fields.is_empty() {
            return Err(SearchError::InvalidView(format!(
                "view '{}' has no fields",
                name
            )));
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(*field) {
                return Err(SearchError::InvalidView(format!(
                    "view '{}' lists field '{}' more than once",
                    name, field
                )));
            }
        }

        Ok(Self { name, fields })
    }

    /// Creates a view from field identifiers such as `"doi"` or `"title"`.
    pub fn from_identifiers(name: impl Into<String>, identifiers: &[&str]) -> Result<Self, SearchError> {
        let fields = identifiers
            .iter()
            .map(|id| id.parse::<Field>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(name, fields)
    }

    /// The minimal predefined view.
    pub fn basic() -> Self {
        Self {
            name: "basic".to_string(),
            fields: BASIC_FIELDS.to_vec(),
        }
    }

    /// Every catalog field, in catalog order.
    pub fn full() -> Self {
        Self {
            name: "full".to_string(),
            fields: Field::ALL.to_vec(),
        }
    }

    /// Resolves a predefined view by name.
    pub fn predefined(name: &str) -> Option<Self> {
        match name {
            "basic" => Some(Self::basic()),
            "full" => Some(Self::full()),
            _ => None,
        }
    }

    /// Returns a new view with `fields` appended, under the same name.
    pub fn extend(&self, fields: &[Field]) -> Result<Self, SearchError> {
        let mut all = self.fields.clone();
        all.extend_from_slice(fields);
        Self::new(self.name.clone(), all)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }
}

impl Default for View {
    fn default() -> Self {
        Self::basic()
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "View(name={}, #fields={})", self.name, self.fields.len())
    }
}

/// Wire form accepted by config files and query maps: a predefined name, a
/// bare list of identifiers, or a named list.
#[derive(Deserialize)]
#[serde(untagged)]
enum ViewRepr {
    Named(String),
    Fields(Vec<Field>),
    Custom { name: String, fields: Vec<Field> },
}

impl<'de> Deserialize<'de> for View {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let view = match ViewRepr::deserialize(deserializer)? {
            ViewRepr::Named(name) => View::predefined(&name).ok_or_else(|| {
                SearchError::InvalidView(format!("no predefined view named '{}'", name))
            }),
            ViewRepr::Fields(fields) => View::new("custom", fields),
            ViewRepr::Custom { name, fields } => View::new(name, fields),
        };
        view.map_err(serde::de::Error::custom)
    }
}
