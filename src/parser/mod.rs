//! Parsers decode an open stream into extended rows.
//!
//! Every format implements [`Parser`]: open, close, reset, and a pull-based
//! `next_row`. Row numbers are assigned by the parser itself, start at 1, and
//! restart at 1 after every reset.

#[cfg(feature = "csv")]
mod csv;
#[cfg(feature = "html")]
mod html;
mod json;
mod native;
mod ndjson;
#[cfg(feature = "spreadsheet")]
mod spreadsheet;
#[cfg(feature = "csv")]
mod tsv;

#[cfg(feature = "csv")]
pub use self::csv::{CsvOptions, CsvParser, Dialect, sniff_delimiter};
#[cfg(feature = "html")]
pub use html::{HtmlOptions, HtmlParser};
pub use json::{JsonOptions, JsonParser};
pub use native::NativeParser;
pub use ndjson::NdjsonParser;
#[cfg(feature = "spreadsheet")]
pub use spreadsheet::{SheetSelector, SpreadsheetOptions, SpreadsheetParser};
#[cfg(feature = "csv")]
pub use tsv::TsvParser;

use serde_json::Value;

use crate::config::{Options, claim};
use crate::error::{ConfigError, SourceError, TabularError};
use crate::format::FormatKind;
use crate::loader::Loader;
use crate::row::{ExtendedRow, record_to_row};
use crate::source::Source;

/// The contract shared by all format parsers.
pub trait Parser: Send + std::fmt::Debug {
    /// Acquire the stream, decode any structure, and prepare a fresh row
    /// producer. An open parser is closed first.
    fn open(&mut self, source: &mut Source, encoding: Option<&str>) -> Result<(), TabularError>;

    /// Release the stream. No-op when already closed.
    fn close(&mut self);

    /// True before the first `open` and after `close`.
    fn closed(&self) -> bool;

    /// Rewind to the first row without reopening the loader.
    fn reset(&mut self) -> Result<(), TabularError>;

    /// Name of the encoding in use, for text formats.
    fn encoding(&self) -> Option<&str> {
        None
    }

    /// Pull the next row, or `None` at the end.
    fn next_row(&mut self) -> Result<Option<ExtendedRow>, TabularError>;

    /// The current row sequence, borrowed from the parser.
    ///
    /// The borrow ends before the next `reset`, so a sequence can never keep
    /// yielding rows from before a reset.
    fn extended_rows(&mut self) -> ExtendedRows<'_>
    where
        Self: Sized,
    {
        ExtendedRows {
            parser: self,
            done: false,
        }
    }
}

/// Iterator adaptor over [`Parser::next_row`]. It ends after the first error.
pub struct ExtendedRows<'a> {
    parser: &'a mut (dyn Parser + 'a),
    done: bool,
}

impl<'a> ExtendedRows<'a> {
    pub fn new(parser: &'a mut (dyn Parser + 'a)) -> Self {
        Self {
            parser,
            done: false,
        }
    }
}

impl Iterator for ExtendedRows<'_> {
    type Item = Result<ExtendedRow, TabularError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Build the parser registered for `format`.
///
/// `loader` is `None` only for native sequences.
pub fn create(
    format: FormatKind,
    loader: Option<Box<dyn Loader>>,
    options: &Options,
    force_parse: bool,
    target: &str,
) -> Result<Box<dyn Parser>, TabularError> {
    let owner = format.to_string();
    let keys = format.options();
    let needs_loader = |loader: Option<Box<dyn Loader>>| {
        loader.ok_or_else(|| {
            TabularError::format(
                target,
                ConfigError::Incompatible {
                    scheme: "native".into(),
                    format: owner.clone(),
                },
            )
        })
    };

    let parser: Box<dyn Parser> = match format {
        #[cfg(feature = "csv")]
        FormatKind::Csv | FormatKind::Gsheet => {
            let opts: CsvOptions = claim(options, keys, &owner, target)?;
            Box::new(CsvParser::new(
                needs_loader(loader)?,
                opts.dialect(target)?,
                force_parse,
            ))
        }
        #[cfg(feature = "csv")]
        FormatKind::Tsv => Box::new(TsvParser::new(needs_loader(loader)?, force_parse)),
        FormatKind::Json => {
            let opts: JsonOptions = claim(options, keys, &owner, target)?;
            Box::new(JsonParser::new(needs_loader(loader)?, opts, force_parse))
        }
        FormatKind::Ndjson => Box::new(NdjsonParser::new(needs_loader(loader)?, force_parse)),
        #[cfg(feature = "spreadsheet")]
        FormatKind::Xls | FormatKind::Xlsx | FormatKind::Ods => {
            let opts: SpreadsheetOptions = claim(options, keys, &owner, target)?;
            Box::new(SpreadsheetParser::new(
                needs_loader(loader)?,
                format,
                opts,
            ))
        }
        #[cfg(feature = "html")]
        FormatKind::Html => {
            let opts: HtmlOptions = claim(options, keys, &owner, target)?;
            Box::new(HtmlParser::new(needs_loader(loader)?, opts))
        }
        FormatKind::Native => Box::new(NativeParser::new(force_parse)),
        #[allow(unreachable_patterns)]
        other => {
            return Err(TabularError::format(
                target,
                ConfigError::NotEnabled(other.to_string()),
            ));
        }
    };
    Ok(parser)
}

/// Turn a decoded record into an extended row, applying the force-parse
/// policy to records that are neither lists nor mappings.
pub(crate) fn dispatch_record(
    record: Value,
    row_number: usize,
    force_parse: bool,
    target: &str,
) -> Result<ExtendedRow, TabularError> {
    match record_to_row(record) {
        Ok((headers, values)) => Ok(ExtendedRow::new(row_number, headers, values)),
        Err(_) if force_parse => Ok(ExtendedRow::positional(row_number, Vec::new())),
        Err(found) => Err(TabularError::source(
            target,
            SourceError::UnsupportedRecord { row_number, found },
        )),
    }
}

/// Error returned when rows are pulled from a closed parser.
pub(crate) fn closed_error(target: &str) -> TabularError {
    TabularError::source(target, SourceError::Closed)
}
