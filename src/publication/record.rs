use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::archive::Row;
use crate::error::SearchError;
use crate::publication::catalog::{Catalog, Field, FieldKind};
use crate::publication::view::View;

// ─────────────────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────────────────

/// A coerced cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl Value {
    /// Coerces raw cell text according to the field kind.
    ///
    /// Text that does not parse as the expected kind is kept verbatim as
    /// [`Value::Text`].
    pub fn coerce(raw: &str, kind: FieldKind) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Empty;
        }

        let parsed = match kind {
            FieldKind::Text => None,
            FieldKind::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
            FieldKind::Float => trimmed
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .map(Value::Float),
            FieldKind::Flag => parse_flag(trimmed).map(Value::Flag),
        };

        parsed.unwrap_or_else(|| Value::Text(raw.to_string()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Flag(b) => write!(f, "{}", b),
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "ja" | "yes" | "true" | "1" | "x" => Some(true),
        "nein" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Record
// ─────────────────────────────────────────────────────────────────────────────

/// One exported publication, restricted to the fields of its view.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    view: String,
    values: Vec<(Field, Value)>,
}

impl Record {
    /// Builds a record from a parsed row, taking exactly the view's fields in
    /// view order.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::RowFormat` if the row lacks a column the view
    /// needs, meaning the export does not match the requested view.
    pub fn materialize(row: &Row, view: &View, catalog: &Catalog) -> Result<Self, SearchError> {
        let mut values = Vec::with_capacity(view.len());

        for &field in view.fields() {
            let column = catalog.column(field);
            let raw = row.get(column).ok_or_else(|| SearchError::RowFormat {
                row: row.number(),
                line: row.line(),
                message: format!(
                    "missing column '{}' required by view '{}'",
                    column,
                    view.name()
                ),
            })?;
            values.push((field, Value::coerce(raw, field.kind())));
        }

        Ok(Self {
            view: view.name().to_string(),
            values,
        })
    }

    /// Name of the view this record was materialized with.
    pub fn view_name(&self) -> &str {
        &self.view
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    /// Looks a value up by field identifier.
    pub fn get_by_name(&self, identifier: &str) -> Option<&Value> {
        identifier.parse::<Field>().ok().and_then(|f| self.get(f))
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.values.iter().map(|(f, _)| *f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &Value)> + '_ {
        self.values.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in &self.values {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Publication(view={}", self.view)?;
        for (field, value) in &self.values {
            write!(f, ", {}={}", field, value)?;
        }
        f.write_str(")")
    }
}
