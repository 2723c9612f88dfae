//! Processors the stream installs itself.

use serde_json::{Number, Value};

use super::{Processor, RowState};
use crate::config::SkipRow;
use crate::error::{SourceError, TabularError};
use crate::row::cell_to_string;

/// Drops positional rows up to and including the header row.
///
/// The header values themselves are captured by the stream from its sample;
/// this stage keeps the header row, and any preamble above it, out of the
/// data. Keyed rows carry their own field names and are never dropped.
#[derive(Debug, Clone)]
pub struct HeaderRow {
    row: usize,
}

impl HeaderRow {
    pub fn new(row: usize) -> Self {
        Self { row }
    }
}

impl Processor for HeaderRow {
    fn name(&self) -> &str {
        "header-row"
    }

    fn process(&mut self, row: &mut RowState) -> Result<(), TabularError> {
        if !row.is_keyed() && row.row_number <= self.row {
            row.skip = true;
        }
        Ok(())
    }
}

/// Puts the stream headers on every row.
///
/// Keyed rows are re-laid in stream header order, with `null` for fields the
/// row does not have. With `force_strings`, every value is rendered as text.
#[derive(Debug, Clone)]
pub struct AssignHeaders {
    headers: Option<Vec<String>>,
    force_strings: bool,
}

impl AssignHeaders {
    pub fn new(headers: Option<Vec<String>>, force_strings: bool) -> Self {
        Self {
            headers,
            force_strings,
        }
    }
}

impl Processor for AssignHeaders {
    fn name(&self) -> &str {
        "assign-headers"
    }

    fn process(&mut self, row: &mut RowState) -> Result<(), TabularError> {
        if let Some(headers) = &self.headers {
            if let Some(own) = row.headers.take() {
                let mut values = std::mem::take(&mut row.values);
                row.values = headers
                    .iter()
                    .map(|h| {
                        own.iter()
                            .position(|o| o == h)
                            .map(|i| std::mem::take(&mut values[i]))
                            .unwrap_or(Value::Null)
                    })
                    .collect();
            }
            row.headers = Some(headers.clone());
        }
        if self.force_strings {
            for value in &mut row.values {
                if !value.is_string() {
                    *value = Value::String(cell_to_string(value));
                }
            }
        }
        Ok(())
    }
}

/// Drops rows by number, by first-cell prefix, or when blank.
#[derive(Debug, Clone)]
pub struct SkipRows {
    rules: Vec<SkipRow>,
}

impl SkipRows {
    pub fn new(rules: Vec<SkipRow>) -> Self {
        Self { rules }
    }

    fn matches(&self, row: &RowState) -> bool {
        self.rules.iter().any(|rule| match rule {
            SkipRow::Number(n) => row.row_number == *n,
            SkipRow::Prefix(prefix) if prefix.is_empty() => row
                .values
                .iter()
                .all(|v| v.is_null() || v.as_str().is_some_and(|s| s.trim().is_empty())),
            SkipRow::Prefix(prefix) => row
                .values
                .first()
                .and_then(Value::as_str)
                .is_some_and(|s| s.starts_with(prefix.as_str())),
        })
    }
}

impl Processor for SkipRows {
    fn name(&self) -> &str {
        "skip-rows"
    }

    fn process(&mut self, row: &mut RowState) -> Result<(), TabularError> {
        if self.matches(row) {
            row.skip = true;
        }
        Ok(())
    }
}

/// Requires every row to keep the width and header set of the first one.
///
/// Rows already marked skipped are not measured. In lenient mode a
/// mismatching row is skipped instead of failing the iteration.
#[derive(Debug, Clone, Default)]
pub struct Strict {
    lenient: bool,
    target: String,
    first: Option<(usize, Option<Vec<String>>)>,
}

impl Strict {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            lenient: false,
            target: target.into(),
            first: None,
        }
    }

    pub fn lenient(target: impl Into<String>) -> Self {
        Self {
            lenient: true,
            ..Self::new(target)
        }
    }
}

impl Processor for Strict {
    fn name(&self) -> &str {
        "strict"
    }

    fn restart(&mut self) {
        self.first = None;
    }

    fn process(&mut self, row: &mut RowState) -> Result<(), TabularError> {
        if row.skip {
            return Ok(());
        }
        let Some((width, headers)) = &self.first else {
            self.first = Some((row.values.len(), row.headers.clone()));
            return Ok(());
        };
        if row.values.len() == *width && row.headers == *headers {
            return Ok(());
        }
        if self.lenient {
            tracing::debug!(row = row.row_number, "skipping row with a different shape");
            row.skip = true;
            return Ok(());
        }
        Err(TabularError::source(
            &self.target,
            SourceError::ShapeMismatch {
                row_number: row.row_number,
                expected: *width,
                found: row.values.len(),
            },
        ))
    }
}

/// Maps every value through a conversion, [`parse_literal`] by default.
pub struct ConvertValues {
    convert: Box<dyn FnMut(Value) -> Value + Send>,
}

impl ConvertValues {
    pub fn new(convert: impl FnMut(Value) -> Value + Send + 'static) -> Self {
        Self {
            convert: Box::new(convert),
        }
    }
}

impl Default for ConvertValues {
    fn default() -> Self {
        Self::new(parse_literal)
    }
}

impl std::fmt::Debug for ConvertValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertValues").finish_non_exhaustive()
    }
}

impl Processor for ConvertValues {
    fn name(&self) -> &str {
        "convert-values"
    }

    fn process(&mut self, row: &mut RowState) -> Result<(), TabularError> {
        for value in &mut row.values {
            *value = (self.convert)(std::mem::take(value));
        }
        Ok(())
    }
}

/// Read a string as an integer, a finite float, a boolean or null.
/// Anything else, and every non-string value, is returned unchanged.
pub fn parse_literal(value: Value) -> Value {
    let Value::String(text) = &value else {
        return value;
    };
    let s = text.trim();
    match s {
        "true" | "True" => return Value::Bool(true),
        "false" | "False" => return Value::Bool(false),
        "null" | "None" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::from(i);
    }
    let numeric = s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if numeric
        && let Ok(f) = s.parse::<f64>()
        && let Some(n) = Number::from_f64(f)
    {
        return Value::Number(n);
    }
    value
}
