//! JSON documents holding an array of rows.

use std::io::Read;

use serde::Deserialize;
use serde_json::Value;

use super::{Parser, closed_error, dispatch_record};
use crate::encoding::{TextStream, classify_read_error};
use crate::error::{SourceError, TabularError};
use crate::loader::{Loader, Mode};
use crate::row::ExtendedRow;
use crate::source::Source;

/// Options claimed by the JSON parser.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonOptions {
    /// Dotted path to the array of rows inside the document, e.g.
    /// `data.items` or `results.0.rows`
    pub prefix: Option<String>,
}

/// Parser for a JSON document whose rows are an array of lists or mappings.
///
/// The whole document is decoded at open; rows are then handed out one at a
/// time.
pub struct JsonParser {
    loader: Box<dyn Loader>,
    options: JsonOptions,
    force_parse: bool,
    target: String,
    encoding: Option<&'static str>,
    text: Option<TextStream>,
    rows: std::vec::IntoIter<Value>,
    row_number: usize,
}

impl JsonParser {
    pub fn new(loader: Box<dyn Loader>, options: JsonOptions, force_parse: bool) -> Self {
        Self {
            loader,
            options,
            force_parse,
            target: String::new(),
            encoding: None,
            text: None,
            rows: Vec::new().into_iter(),
            row_number: 0,
        }
    }

    /// Decode the document and select the row array.
    fn load_rows(&mut self) -> Result<(), TabularError> {
        let text = self.text.as_mut().ok_or_else(|| closed_error(&self.target))?;
        let mut content = String::new();
        text.read_to_string(&mut content)
            .map_err(|e| classify_read_error(&self.target, e))?;
        let document: Value = serde_json::from_str(&content).map_err(|e| {
            TabularError::source(&self.target, SourceError::Other(format!("invalid JSON: {e}")))
        })?;
        let selected = select(document, self.options.prefix.as_deref()).map_err(|message| {
            TabularError::source(&self.target, SourceError::Other(message))
        })?;
        match selected {
            Value::Array(rows) => {
                self.rows = rows.into_iter();
                Ok(())
            }
            other => Err(TabularError::source(
                &self.target,
                SourceError::Other(format!(
                    "expected an array of rows, got {}",
                    type_name(&other)
                )),
            )),
        }
    }
}

impl std::fmt::Debug for JsonParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonParser")
            .field("target", &self.target)
            .field("options", &self.options)
            .field("closed", &self.text.is_none())
            .finish()
    }
}

/// Walk a dotted path. Numeric segments index arrays.
fn select(document: Value, prefix: Option<&str>) -> Result<Value, String> {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return Ok(document);
    };
    let mut current = document;
    for segment in prefix.split('.') {
        current = match current {
            Value::Object(mut map) => map
                .remove(segment)
                .ok_or_else(|| format!("prefix {prefix:?}: no key {segment:?}"))?,
            Value::Array(mut items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| format!("prefix {prefix:?}: {segment:?} is not an index"))?;
                if index >= items.len() {
                    return Err(format!("prefix {prefix:?}: index {index} out of range"));
                }
                items.swap_remove(index)
            }
            other => {
                return Err(format!(
                    "prefix {prefix:?}: cannot descend into {}",
                    type_name(&other)
                ));
            }
        };
    }
    Ok(current)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Parser for JsonParser {
    fn open(&mut self, source: &mut Source, encoding: Option<&str>) -> Result<(), TabularError> {
        self.close();
        self.target = source.id();
        let handle = self.loader.load(source, Mode::Text, encoding)?;
        self.encoding = handle.encoding();
        self.text = Some(handle.into_text());
        self.row_number = 0;
        self.load_rows()
    }

    fn close(&mut self) {
        self.text = None;
        self.rows = Vec::new().into_iter();
    }

    fn closed(&self) -> bool {
        self.text.is_none()
    }

    fn reset(&mut self) -> Result<(), TabularError> {
        let text = self.text.as_mut().ok_or_else(|| closed_error(&self.target))?;
        text.rewind()?;
        self.row_number = 0;
        self.load_rows()
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding
    }

    fn next_row(&mut self) -> Result<Option<ExtendedRow>, TabularError> {
        if self.text.is_none() {
            return Err(closed_error(&self.target));
        }
        let Some(record) = self.rows.next() else {
            return Ok(None);
        };
        self.row_number += 1;
        dispatch_record(record, self.row_number, self.force_parse, &self.target).map(Some)
    }
}
