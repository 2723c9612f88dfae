//! Delimited text parser built on the `csv` crate.

use std::io::{self, Read};

use serde::Deserialize;
use serde_json::Value;

use super::{Parser, closed_error};
use crate::encoding::{TextStream, classify_read_error};
use crate::error::{ConfigError, SourceError, TabularError};
use crate::loader::{Loader, Mode};
use crate::row::ExtendedRow;
use crate::source::Source;

/// Records inspected when sniffing the delimiter.
pub const SNIFF_LINES: usize = 100;

/// Bytes decoded for the sniffer.
const SNIFF_BYTES: usize = 64 * 1024;

/// Delimiters the sniffer chooses between, in order of preference.
const CANDIDATES: &[u8] = b",;\t|";

/// Options claimed by the CSV parser.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvOptions {
    /// Field separator; sniffed from the content when absent
    pub delimiter: Option<String>,
    pub quote_char: Option<String>,
    /// Escape character inside quoted fields
    pub escape_char: Option<String>,
    /// Whether `""` inside a quoted field stands for one quote
    pub double_quote: Option<bool>,
    /// Drop whitespace that follows a delimiter
    pub skip_initial_space: bool,
}

impl CsvOptions {
    /// Validate the options and turn them into a dialect.
    pub fn dialect(&self, target: &str) -> Result<Dialect, TabularError> {
        let delimiter = single_byte(self.delimiter.as_deref(), "delimiter", target)?;
        let quote = single_byte(self.quote_char.as_deref(), "quote_char", target)?;
        let escape = single_byte(self.escape_char.as_deref(), "escape_char", target)?;
        Ok(Dialect {
            delimiter,
            quote: quote.unwrap_or(b'"'),
            escape,
            double_quote: self.double_quote.unwrap_or(escape.is_none()),
            skip_initial_space: self.skip_initial_space,
        })
    }
}

fn single_byte(value: Option<&str>, name: &str, target: &str) -> Result<Option<u8>, TabularError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(Some(*byte)),
        _ => Err(TabularError::options(
            target,
            ConfigError::InvalidOption {
                owner: "csv".into(),
                message: format!("{name} must be a single ASCII character, got {value:?}"),
            },
        )),
    }
}

/// A resolved CSV dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// `None` until sniffed
    pub delimiter: Option<u8>,
    pub quote: u8,
    pub escape: Option<u8>,
    pub double_quote: bool,
    pub skip_initial_space: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: b'"',
            escape: None,
            double_quote: true,
            skip_initial_space: false,
        }
    }
}

/// Guess the delimiter from a text sample.
///
/// A candidate wins when it appears the same, non-zero number of times
/// outside quotes in each of the first [`SNIFF_LINES`] records. Falls back
/// to a comma.
pub fn sniff_delimiter(sample: &str) -> u8 {
    let mut records = split_records(sample);
    // The last record may have been cut by the sample boundary.
    if records.len() > 1 && !sample.ends_with('\n') {
        records.pop();
    }
    records.truncate(SNIFF_LINES);
    if records.is_empty() {
        return b',';
    }

    CANDIDATES
        .iter()
        .copied()
        .find(|&candidate| {
            let mut counts = records.iter().map(|r| count_unquoted(r, candidate));
            let first = counts.next().unwrap_or(0);
            first > 0 && counts.all(|c| c == first)
        })
        .unwrap_or(b',')
}

/// Split text into logical records, honoring quoted newlines and skipping
/// blank lines.
fn split_records(sample: &str) -> Vec<&str> {
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in sample.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\n' if !in_quotes => {
                let record = sample[start..i].trim_end_matches('\r');
                if !record.is_empty() {
                    records.push(record);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = sample[start..].trim_end_matches('\r');
    if !tail.is_empty() {
        records.push(tail);
    }
    records
}

fn count_unquoted(record: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in record.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Text fed to the csv reader, with the spaces that follow a delimiter
/// outside quotes dropped when the dialect asks for it.
///
/// Dropping them before the record is parsed lets a quoted field written
/// after `, ` be unquoted as usual, and keeps spaces inside quotes.
struct InitialSpace {
    text: TextStream,
    dialect: Dialect,
    delimiter: u8,
    in_quotes: bool,
    escaped: bool,
    /// A quote just closed a quoted field; another one reopens it
    closed_quote: bool,
    field_start: bool,
    after_delimiter: bool,
}

impl InitialSpace {
    fn new(text: TextStream, dialect: Dialect, delimiter: u8) -> Self {
        Self {
            text,
            dialect,
            delimiter,
            in_quotes: false,
            escaped: false,
            closed_quote: false,
            field_start: true,
            after_delimiter: false,
        }
    }

    fn rewind(&mut self) -> Result<(), TabularError> {
        self.text.rewind()?;
        self.in_quotes = false;
        self.escaped = false;
        self.closed_quote = false;
        self.field_start = true;
        self.after_delimiter = false;
        Ok(())
    }

    fn keep(&mut self, byte: u8) -> bool {
        if self.in_quotes {
            if self.escaped {
                self.escaped = false;
            } else if Some(byte) == self.dialect.escape {
                self.escaped = true;
            } else if byte == self.dialect.quote {
                self.in_quotes = false;
                self.closed_quote = true;
            }
            return true;
        }
        if self.after_delimiter && byte == b' ' {
            return false;
        }
        let reopens = self.closed_quote && self.dialect.double_quote;
        self.closed_quote = false;
        self.after_delimiter = byte == self.delimiter;
        if byte == self.dialect.quote && (self.field_start || reopens) {
            self.in_quotes = true;
        }
        self.field_start = matches!(byte, b'\n' | b'\r') || byte == self.delimiter;
        true
    }
}

impl Read for InitialSpace {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.text.read(buf)?;
            if n == 0 || !self.dialect.skip_initial_space {
                return Ok(n);
            }
            let mut kept = 0;
            for i in 0..n {
                let byte = buf[i];
                if self.keep(byte) {
                    buf[kept] = byte;
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

/// Parser for comma separated values (and Google Sheets CSV exports).
///
/// Every cell is produced as a string; typing is left to processors.
pub struct CsvParser {
    loader: Box<dyn Loader>,
    dialect: Dialect,
    force_parse: bool,
    target: String,
    encoding: Option<&'static str>,
    delimiter: u8,
    reader: Option<csv::Reader<InitialSpace>>,
    record: csv::StringRecord,
    row_number: usize,
}

impl CsvParser {
    pub fn new(loader: Box<dyn Loader>, dialect: Dialect, force_parse: bool) -> Self {
        Self {
            loader,
            dialect,
            force_parse,
            target: String::new(),
            encoding: None,
            delimiter: dialect.delimiter.unwrap_or(b','),
            reader: None,
            record: csv::StringRecord::new(),
            row_number: 0,
        }
    }

    /// The delimiter in use, sniffed or configured.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn build_reader(&self, text: InitialSpace) -> csv::Reader<InitialSpace> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.dialect.quote)
            .escape(self.dialect.escape)
            .double_quote(self.dialect.double_quote)
            .from_reader(text)
    }
}

impl std::fmt::Debug for CsvParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvParser")
            .field("target", &self.target)
            .field("dialect", &self.dialect)
            .field("delimiter", &(self.delimiter as char))
            .field("closed", &self.reader.is_none())
            .finish()
    }
}

impl Parser for CsvParser {
    fn open(&mut self, source: &mut Source, encoding: Option<&str>) -> Result<(), TabularError> {
        self.close();
        self.target = source.id();
        let handle = self.loader.load(source, Mode::Text, encoding)?;
        self.encoding = handle.encoding();
        let mut text = handle.into_text();

        self.delimiter = match self.dialect.delimiter {
            Some(delimiter) => delimiter,
            None => {
                let sample = text
                    .peek_text(SNIFF_BYTES)
                    .map_err(|e| TabularError::io(&self.target, e))?;
                let sniffed = sniff_delimiter(&sample);
                tracing::debug!(
                    source = %self.target,
                    delimiter = %(sniffed as char).escape_default(),
                    "sniffed csv delimiter"
                );
                sniffed
            }
        };
        let text = InitialSpace::new(text, self.dialect, self.delimiter);
        self.reader = Some(self.build_reader(text));
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
            self.reader = Some(self.build_reader(reader.into_inner()));
        }
        self.row_number = 0;
        Ok(())
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding
    }

    fn next_row(&mut self) -> Result<Option<ExtendedRow>, TabularError> {
        let reader = self.reader.as_mut().ok_or_else(|| closed_error(&self.target))?;
        match reader.read_record(&mut self.record) {
            Ok(true) => {
                self.row_number += 1;
                let values = self
                    .record
                    .iter()
                    .map(|field| Value::String(field.to_string()))
                    .collect();
                Ok(Some(ExtendedRow::positional(self.row_number, values)))
            }
            Ok(false) => Ok(None),
            Err(e) => {
                let message = e.to_string();
                match e.into_kind() {
                    csv::ErrorKind::Io(io) => Err(classify_read_error(&self.target, io)),
                    _ if self.force_parse => {
                        self.row_number += 1;
                        Ok(Some(ExtendedRow::positional(self.row_number, Vec::new())))
                    }
                    _ => Err(TabularError::source(
                        &self.target,
                        SourceError::MalformedRow {
                            row_number: self.row_number + 1,
                            message,
                        },
                    )),
                }
            }
        }
    }
}
