//! Tab separated values with backslash escapes.

use std::io::{BufRead, BufReader};

use serde_json::Value;

use super::{Parser, closed_error};
use crate::encoding::{TextStream, classify_read_error};
use crate::error::TabularError;
use crate::loader::{Loader, Mode};
use crate::row::ExtendedRow;
use crate::source::Source;

/// Parser for TSV: one record per line, fields split on tabs, and `\t`,
/// `\n`, `\r`, `\\` unescaped inside fields. Blank lines are skipped.
pub struct TsvParser {
    loader: Box<dyn Loader>,
    target: String,
    encoding: Option<&'static str>,
    reader: Option<BufReader<TextStream>>,
    line: String,
    row_number: usize,
}

impl TsvParser {
    /// TSV has no record shapes to reject, so `force_parse` has nothing to do.
    pub fn new(loader: Box<dyn Loader>, _force_parse: bool) -> Self {
        Self {
            loader,
            target: String::new(),
            encoding: None,
            reader: None,
            line: String::new(),
            row_number: 0,
        }
    }
}

impl std::fmt::Debug for TsvParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsvParser")
            .field("target", &self.target)
            .field("closed", &self.reader.is_none())
            .finish()
    }
}

/// Undo the TSV field escapes.
pub(crate) fn unescape(field: &str) -> String {
    if !field.contains('\\') {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl Parser for TsvParser {
    fn open(&mut self, source: &mut Source, encoding: Option<&str>) -> Result<(), TabularError> {
        self.close();
        self.target = source.id();
        let handle = self.loader.load(source, Mode::Text, encoding)?;
        self.encoding = handle.encoding();
        self.reader = Some(BufReader::new(handle.into_text()));
        self.row_number = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.reader = None;
    }

    fn closed(&self) -> bool {
        self.reader.is_none()
    }

    fn reset(&mut self) -> Result<(), TabularError> {
        let reader = self.reader.as_mut().ok_or_else(|| closed_error(&self.target))?;
        // A failed rewind leaves the reader where it was.
        reader.get_mut().rewind()?;
        if let Some(reader) = self.reader.take() {
            self.reader = Some(BufReader::new(reader.into_inner()));
        }
        self.row_number = 0;
        Ok(())
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding
    }

    fn next_row(&mut self) -> Result<Option<ExtendedRow>, TabularError> {
        let reader = self.reader.as_mut().ok_or_else(|| closed_error(&self.target))?;
        loop {
            self.line.clear();
            let n = reader
                .read_line(&mut self.line)
                .map_err(|e| classify_read_error(&self.target, e))?;
            if n == 0 {
                return Ok(None);
            }
            let line = self.line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }
            self.row_number += 1;
            let values = line
                .split('\t')
                .map(|field| Value::String(unescape(field)))
                .collect();
            return Ok(Some(ExtendedRow::positional(self.row_number, values)));
        }
    }
}
