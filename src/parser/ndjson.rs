//! Newline-delimited JSON.

use std::io::{BufRead, BufReader};

use serde_json::Value;

use super::{Parser, closed_error, dispatch_record};
use crate::encoding::{TextStream, classify_read_error};
use crate::error::{SourceError, TabularError};
use crate::loader::{Loader, Mode};
use crate::row::ExtendedRow;
use crate::source::Source;

/// Parser for one JSON list or mapping per line. Blank lines are skipped.
pub struct NdjsonParser {
    loader: Box<dyn Loader>,
    force_parse: bool,
    target: String,
    encoding: Option<&'static str>,
    reader: Option<BufReader<TextStream>>,
    line: String,
    row_number: usize,
}

impl NdjsonParser {
    pub fn new(loader: Box<dyn Loader>, force_parse: bool) -> Self {
        Self {
            loader,
            force_parse,
            target: String::new(),
            encoding: None,
            reader: None,
            line: String::new(),
            row_number: 0,
        }
    }
}

impl std::fmt::Debug for NdjsonParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdjsonParser")
            .field("target", &self.target)
            .field("closed", &self.reader.is_none())
            .finish()
    }
}

impl Parser for NdjsonParser {
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
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            self.row_number += 1;
            let record = match serde_json::from_str::<Value>(line) {
                Ok(record) => record,
                Err(_) if self.force_parse => {
                    return Ok(Some(ExtendedRow::positional(self.row_number, Vec::new())));
                }
                Err(e) => {
                    return Err(TabularError::source(
                        &self.target,
                        SourceError::MalformedRow {
                            row_number: self.row_number,
                            message: e.to_string(),
                        },
                    ));
                }
            };
            return dispatch_record(record, self.row_number, self.force_parse, &self.target)
                .map(Some);
        }
    }
}
