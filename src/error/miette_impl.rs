//! Miette integration for pretty error reporting.

use miette::{Diagnostic, Severity};
use thiserror::Error;

use super::{ErrorKind, TabularError};

/// A diagnostic wrapper for pipeline errors compatible with miette.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct TabularDiagnostic {
    /// The error message
    pub message: String,

    #[source]
    /// The underlying error source
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,

    #[help]
    /// Help text for the user
    pub help: Option<String>,

    #[diagnostic(severity)]
    /// Severity level
    pub severity: Severity,
}

fn help_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Scheme => "Pass a supported scheme: file, http, https, ftp, ftps, stream, text",
        ErrorKind::Format => "Pass the format explicitly or check that its feature is enabled",
        ErrorKind::Options => "Remove options that the chosen scheme and format do not declare",
        ErrorKind::Headers => "Pick a header row within the sample size, or list headers explicitly",
        ErrorKind::Io | ErrorKind::Http => "Check that the source exists and is reachable",
        ErrorKind::Encoding => "Pass the encoding explicitly",
        ErrorKind::Source => "Check that the content matches the format, or enable force_parse",
        ErrorKind::NotSeekable => "Buffer the source (e.g. http_stream = false) to allow resets",
    }
}

impl From<TabularError> for TabularDiagnostic {
    fn from(e: TabularError) -> Self {
        TabularDiagnostic {
            message: format!("[{}] on '{}'", e.kind, e.target),
            help: Some(help_for(e.kind).into()),
            source: Some(e.error),
            severity: Severity::Error,
        }
    }
}

impl From<TabularError> for miette::Report {
    fn from(e: TabularError) -> Self {
        miette::Report::new(TabularDiagnostic::from(e))
    }
}
