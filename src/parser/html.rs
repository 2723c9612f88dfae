//! Tables in HTML/XHTML markup, read with `quick-xml`.

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use serde_json::Value;

use super::{Parser, closed_error};
use crate::encoding::classify_read_error;
use crate::error::{SourceError, TabularError};
use crate::loader::{Loader, Mode};
use crate::row::ExtendedRow;
use crate::source::Source;

fn default_table() -> usize {
    1
}

/// Options claimed by the HTML parser.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HtmlOptions {
    /// 1-based position of the table in document order
    #[serde(default = "default_table")]
    pub table: usize,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            table: default_table(),
        }
    }
}

/// Parser for `<tr>` rows of `<td>`/`<th>` cells in the selected table.
///
/// The markup must be well formed enough for an XML reader; end tag names
/// are not checked, so unclosed void elements are tolerated. Tables nested
/// inside a cell are skipped.
pub struct HtmlParser {
    loader: Box<dyn Loader>,
    options: HtmlOptions,
    target: String,
    encoding: Option<&'static str>,
    rows: Option<Vec<Vec<Value>>>,
    cursor: usize,
}

impl HtmlParser {
    pub fn new(loader: Box<dyn Loader>, options: HtmlOptions) -> Self {
        Self {
            loader,
            options,
            target: String::new(),
            encoding: None,
            rows: None,
            cursor: 0,
        }
    }
}

impl std::fmt::Debug for HtmlParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlParser")
            .field("target", &self.target)
            .field("options", &self.options)
            .field("closed", &self.rows.is_none())
            .finish()
    }
}

/// Extract the rows of the `index`-th table (1-based).
pub(crate) fn extract_table(markup: &str, index: usize) -> Result<Option<Vec<Vec<String>>>, String> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = false;

    let mut seen = 0usize;
    let mut depth = 0usize;
    let mut selected: Option<usize> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("malformed markup at byte {}: {e}", reader.buffer_position()))?;
        let active = selected == Some(depth);
        match event {
            Event::Start(e) => match e.local_name().as_ref().to_ascii_lowercase().as_slice() {
                b"table" => {
                    depth += 1;
                    seen += 1;
                    if selected.is_none() && seen == index {
                        selected = Some(depth);
                    }
                }
                b"tr" if active => row = Some(Vec::new()),
                b"td" | b"th" if active && row.is_some() => cell = Some(String::new()),
                b"br" if active => {
                    if let Some(cell) = cell.as_mut() {
                        cell.push(' ');
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref().to_ascii_lowercase().as_slice() {
                b"td" | b"th" if active => {
                    if let Some(row) = row.as_mut() {
                        row.push(String::new());
                    }
                }
                b"br" if active => {
                    if let Some(cell) = cell.as_mut() {
                        cell.push(' ');
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref().to_ascii_lowercase().as_slice() {
                b"table" => {
                    if active {
                        break;
                    }
                    depth = depth.saturating_sub(1);
                }
                b"tr" if active => {
                    if let Some(done) = row.take() {
                        rows.push(done);
                    }
                }
                b"td" | b"th" if active => {
                    if let (Some(text), Some(row)) = (cell.take(), row.as_mut()) {
                        row.push(normalize(&text));
                    }
                }
                _ => {}
            },
            Event::Text(t) if active => {
                if let Some(cell) = cell.as_mut() {
                    cell.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::CData(t) if active => {
                if let Some(cell) = cell.as_mut() {
                    cell.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::GeneralRef(r) if active => {
                if let Some(cell) = cell.as_mut() {
                    match r.resolve_char_ref() {
                        Ok(Some(c)) => cell.push(c),
                        _ => {
                            let name = String::from_utf8_lossy(&r);
                            match quick_xml::escape::resolve_predefined_entity(&name) {
                                Some(resolved) => cell.push_str(resolved),
                                None if name == "nbsp" => cell.push(' '),
                                None => {
                                    cell.push('&');
                                    cell.push_str(&name);
                                    cell.push(';');
                                }
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if selected.is_none() {
        return Ok(None);
    }
    if let Some(mut last) = row.take() {
        if let Some(text) = cell.take() {
            last.push(normalize(&text));
        }
        rows.push(last);
    }
    Ok(Some(rows))
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Parser for HtmlParser {
    fn open(&mut self, source: &mut Source, encoding: Option<&str>) -> Result<(), TabularError> {
        self.close();
        self.target = source.id();
        let handle = self.loader.load(source, Mode::Text, encoding)?;
        self.encoding = handle.encoding();
        let mut text = handle.into_text();
        let mut markup = String::new();
        text.read_to_string(&mut markup)
            .map_err(|e| classify_read_error(&self.target, e))?;

        let table = extract_table(&markup, self.options.table)
            .map_err(|message| TabularError::source(&self.target, SourceError::Other(message)))?
            .ok_or_else(|| {
                TabularError::source(
                    &self.target,
                    SourceError::TableNotFound(self.options.table.to_string()),
                )
            })?;
        self.rows = Some(
            table
                .into_iter()
                .map(|cells| cells.into_iter().map(Value::String).collect())
                .collect(),
        );
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.rows = None;
    }

    fn closed(&self) -> bool {
        self.rows.is_none()
    }

    fn reset(&mut self) -> Result<(), TabularError> {
        if self.rows.is_none() {
            return Err(closed_error(&self.target));
        }
        self.cursor = 0;
        Ok(())
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding
    }

    fn next_row(&mut self) -> Result<Option<ExtendedRow>, TabularError> {
        let rows = self.rows.as_ref().ok_or_else(|| closed_error(&self.target))?;
        let Some(values) = rows.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(ExtendedRow::positional(self.cursor, values.clone())))
    }
}
