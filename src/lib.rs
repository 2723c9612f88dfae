//! # tabstream
//!
//! One row iterator over tabular data, wherever it lives and however it is
//! encoded.
//!
//! ## Overview
//!
//! tabstream provides:
//! - **Classification**: scheme and format inferred from the source, with explicit overrides
//! - **Loaders**: local files, HTTP(S), inline text, open byte streams, native records
//! - **Parsers**: CSV, TSV, JSON, NDJSON, native sequences, and optionally
//!   spreadsheets (xls/xlsx/ods) and HTML tables
//! - **Sampling**: a bounded prefix of rows buffered at open for header and
//!   content checks
//! - **Processors**: a per-row chain that can rewrite, skip or stop rows
//! - **Resettable iteration**: cheap rewinds within the sample, parser resets beyond it
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tabstream::{RowShape, Stream};
//!
//! fn main() -> Result<(), tabstream::TabularError> {
//!     let mut stream = Stream::builder("text://id,name\n1,english\n2,foo\n")
//!         .format("csv")
//!         .header_row(1)
//!         .open()?;
//!
//!     assert_eq!(stream.headers(), Some(&["id".to_string(), "name".to_string()][..]));
//!     for row in stream.iter(RowShape::Keyed)? {
//!         println!("{:?}", row?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `csv` - CSV and TSV parsing, CSV writing (enabled by default)
//! - `remote` - HTTP(S) loading and Google Sheets links (enabled by default)
//! - `spreadsheet` - xls, xlsx and ods through calamine
//! - `html` - tables in HTML markup
//! - `yaml`, `toml` - `StreamConfig` files in those syntaxes
//! - `miette` - pretty error reporting with miette
//! - `cli` - the `tabstream` binary
//!
//! ## Iteration semantics
//!
//! - Every call to [`Stream::iter`] replays the sample, then continues with
//!   live parser rows, through a fresh pass of the processor chain.
//! - Output row numbers start at 1 and increase by one per emitted row.
//! - [`Stream::reset`] is free while only sampled rows were read. Past the
//!   sample it resets the parser, which fails with
//!   [`ErrorKind::NotSeekable`] on consumed forward-only streams.
//! - Content errors met while sampling surface when iteration reaches them.

pub mod cli;
pub mod config;
pub mod encoding;
pub mod error;
pub mod format;
pub mod io;
pub mod loader;
pub mod parser;
pub mod processor;
pub mod row;
pub mod source;
pub mod stream;
pub mod writer;

pub use config::{Headers, Options, SkipRow, StreamConfig};
pub use error::{ConfigError, ErrorKind, SourceError, TabularError};
pub use format::{FormatKind, SchemeKind};
pub use io::{FileOutput, InMemorySink, OutputTarget, StdoutOutput};
pub use processor::{Processor, RowState};
pub use row::{ExtendedRow, Row, RowShape};
pub use source::{NativeSource, Source};
pub use stream::{Rows, ShapeCheck, Stream, StreamBuilder};

// Miette re-exports
#[cfg(feature = "miette")]
pub use error::TabularDiagnostic;
