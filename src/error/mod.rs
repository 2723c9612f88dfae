//! Error types for tabstream.
//!
//! Every failure surfaced by the pipeline is a [`TabularError`]. Callers can
//! catch it broadly, or branch on [`TabularError::kind`] for the specific
//! condition:
//! - configuration errors (`Scheme`, `Format`, `Options`, `Headers`) are raised
//!   synchronously by `Stream::open`
//! - I/O errors (`Io`, `Http`, `Encoding`) come from loaders
//! - `Source` errors are content problems found while rows are produced
//! - `NotSeekable` is raised by a reset that cannot rewind the underlying bytes

use std::fmt;

use thiserror::Error;

/// The specific condition behind a [`TabularError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The transport scheme is unknown or not compiled in
    Scheme,
    /// The encoded format is unknown, undetectable or not compiled in
    Format,
    /// Options were not claimed by the resolved scheme/format or were ill-typed
    Options,
    /// The header configuration cannot be satisfied
    Headers,
    /// Filesystem or stream failure
    Io,
    /// Remote transport failure
    Http,
    /// The bytes cannot be decoded with the resolved encoding
    Encoding,
    /// The content does not match the shape expected for the format
    Source,
    /// A reset was requested on a stream that cannot rewind
    NotSeekable,
}

impl ErrorKind {
    /// Whether this kind is raised while configuring a stream.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ErrorKind::Scheme | ErrorKind::Format | ErrorKind::Options | ErrorKind::Headers
        )
    }

    /// Whether this kind originates from a loader.
    pub fn is_io(&self) -> bool {
        matches!(self, ErrorKind::Io | ErrorKind::Http | ErrorKind::Encoding)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Scheme => write!(f, "Scheme"),
            ErrorKind::Format => write!(f, "Format"),
            ErrorKind::Options => write!(f, "Options"),
            ErrorKind::Headers => write!(f, "Headers"),
            ErrorKind::Io => write!(f, "Io"),
            ErrorKind::Http => write!(f, "Http"),
            ErrorKind::Encoding => write!(f, "Encoding"),
            ErrorKind::Source => write!(f, "Source"),
            ErrorKind::NotSeekable => write!(f, "NotSeekable"),
        }
    }
}

/// A classified pipeline failure.
#[derive(Debug)]
pub struct TabularError {
    /// The specific condition
    pub kind: ErrorKind,
    /// Identifier of the source (path, URL, `<stream>`, `<native>`, ...)
    pub target: String,
    /// The underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl TabularError {
    pub fn new(
        kind: ErrorKind,
        target: impl Into<String>,
        error: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            error: error.into(),
        }
    }

    pub fn scheme(target: impl Into<String>, scheme: &str) -> Self {
        Self::new(
            ErrorKind::Scheme,
            target,
            ConfigError::UnsupportedScheme(scheme.to_string()),
        )
    }

    pub fn format(target: impl Into<String>, error: ConfigError) -> Self {
        Self::new(ErrorKind::Format, target, error)
    }

    pub fn options(target: impl Into<String>, error: ConfigError) -> Self {
        Self::new(ErrorKind::Options, target, error)
    }

    pub fn headers(target: impl Into<String>, error: ConfigError) -> Self {
        Self::new(ErrorKind::Headers, target, error)
    }

    pub fn io(target: impl Into<String>, error: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, target, error)
    }

    pub fn source(target: impl Into<String>, error: SourceError) -> Self {
        Self::new(ErrorKind::Source, target, error)
    }

    pub fn not_seekable(target: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::NotSeekable,
            target,
            "the underlying stream has been consumed and cannot be rewound",
        )
    }

    /// The specific condition behind this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for TabularError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.target, self.error)
    }
}

impl std::error::Error for TabularError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// Configuration problems detected while opening a stream.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scheme \"{0}\" is not supported")]
    UnsupportedScheme(String),

    #[error("format \"{0}\" is not supported")]
    UnsupportedFormat(String),

    #[error("format \"{0}\" is not enabled. Enable the corresponding feature.")]
    NotEnabled(String),

    #[error("format could not be detected; pass it explicitly")]
    UndetectedFormat,

    #[error("format \"{format}\" cannot be read over scheme \"{scheme}\"")]
    Incompatible { scheme: String, format: String },

    #[error("options not supported by the resolved scheme/format: {}", .0.join(", "))]
    Unclaimed(Vec<String>),

    #[error("invalid value for option(s) of \"{owner}\": {message}")]
    InvalidOption { owner: String, message: String },

    #[error("header row {row} is beyond the sample size {sample_size}")]
    HeaderRowBeyondSample { row: usize, sample_size: usize },

    #[error("header row numbers are 1-based")]
    HeaderRowZero,

    #[error("keyed rows require headers, but none were resolved")]
    NoHeaders,
}

/// Content problems found while producing rows.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("row {row_number}: {message}")]
    MalformedRow { row_number: usize, message: String },

    #[error("row {row_number}: expected a list or a mapping, got {found}")]
    UnsupportedRecord { row_number: usize, found: String },

    #[error("sheet {0} does not exist")]
    SheetNotFound(String),

    #[error("table {0} does not exist")]
    TableNotFound(String),

    #[error("content looks like HTML; pass allow_html to read it anyway")]
    LooksLikeHtml,

    #[error(
        "row {row_number}: shape changed from {expected} to {found} column(s) or header set differs"
    )]
    ShapeMismatch {
        row_number: usize,
        expected: usize,
        found: usize,
    },

    #[error("a one-shot iterator cannot be reset; pass a factory or a materialized list")]
    OneShotIterator,

    #[error("the source has already been consumed")]
    Consumed,

    #[error("the parser is closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "miette")]
mod miette_impl;

#[cfg(feature = "miette")]
pub use miette_impl::*;
