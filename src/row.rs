//! Row types flowing through the pipeline.

use serde::Serialize;
use serde_json::{Map, Value};

/// The atomic unit produced by parsers and consumed by processors.
///
/// `headers` is set only for keyed sources, where every row carries its own
/// field names. Positional rows get their headers from the stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedRow {
    pub row_number: usize,
    pub headers: Option<Vec<String>>,
    pub values: Vec<Value>,
}

impl ExtendedRow {
    pub fn new(row_number: usize, headers: Option<Vec<String>>, values: Vec<Value>) -> Self {
        Self {
            row_number,
            headers,
            values,
        }
    }

    /// A positional row without headers.
    pub fn positional(row_number: usize, values: Vec<Value>) -> Self {
        Self::new(row_number, None, values)
    }

    /// Pair every header with its value. Missing values become `null`.
    pub fn keyed(&self) -> Option<Map<String, Value>> {
        let headers = self.headers.as_ref()?;
        Some(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), self.values.get(i).cloned().unwrap_or(Value::Null)))
                .collect(),
        )
    }
}

/// Projection applied by `Stream::iter` and `Stream::read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowShape {
    /// Ordered values only
    #[default]
    Plain,
    /// A header -> value mapping; requires resolved headers
    Keyed,
    /// The full `(row_number, headers, values)` triple
    Extended,
}

/// A projected row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Row {
    Plain(Vec<Value>),
    Keyed(Map<String, Value>),
    Extended(ExtendedRow),
}

impl Row {
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Row::Plain(values) => values,
            Row::Keyed(map) => map.into_iter().map(|(_, v)| v).collect(),
            Row::Extended(row) => row.values,
        }
    }

    pub fn as_plain(&self) -> Option<&[Value]> {
        match self {
            Row::Plain(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_keyed(&self) -> Option<&Map<String, Value>> {
        match self {
            Row::Keyed(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_extended(&self) -> Option<&ExtendedRow> {
        match self {
            Row::Extended(row) => Some(row),
            _ => None,
        }
    }
}

/// Render a cell the way delimited text would carry it.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split a decoded record into headers and values.
///
/// Lists become positional rows. Mappings become keyed rows with their
/// field names sorted, so keyed sources read the same way every time.
/// Anything else is returned as `Err` with a short description of its type.
pub fn record_to_row(record: Value) -> Result<(Option<Vec<String>>, Vec<Value>), String> {
    match record {
        Value::Array(values) => Ok((None, values)),
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let (headers, values) = entries.into_iter().unzip();
            Ok((Some(headers), values))
        }
        Value::Null => Err("null".into()),
        Value::Bool(_) => Err("a boolean".into()),
        Value::Number(_) => Err("a number".into()),
        Value::String(_) => Err("a string".into()),
    }
}
