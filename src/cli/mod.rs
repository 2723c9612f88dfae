//! Command-line helpers for the `tabstream` binary.
//!
//! Flags map onto a [`StreamConfig`], so anything the CLI can do a config
//! file can do too. Flags win over the config file.

#[cfg(feature = "cli")]
mod sarge;

#[cfg(feature = "csv")]
use serde_json::Value;

use crate::config::{SkipRow, StreamConfig};
use crate::error::TabularError;
#[cfg(feature = "csv")]
use crate::row::cell_to_string;
use crate::stream::StreamBuilder;

/// Everything the `tabstream` binary accepts.
#[derive(Debug, Clone, Default)]
pub struct StreamArgs {
    pub source: Option<String>,
    pub scheme: Option<String>,
    pub format: Option<String>,
    pub encoding: Option<String>,
    /// 1-based header row
    pub headers: Option<usize>,
    pub sample_size: Option<usize>,
    /// Stop after this many rows
    pub limit: Option<usize>,
    pub force_parse: bool,
    pub skip_rows: SkipRowList,
    /// JSON, YAML or TOML stream configuration
    pub config: Option<String>,
}

/// A comma separated list of skip rules: row numbers, comment prefixes, or
/// `blank` for empty rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipRowList(pub Vec<SkipRow>);

impl SkipRowList {
    pub fn parse(text: &str) -> Self {
        let rules = text
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| match token.parse::<usize>() {
                Ok(n) => SkipRow::Number(n),
                Err(_) if token.eq_ignore_ascii_case("blank") => SkipRow::blank(),
                Err(_) => SkipRow::Prefix(token.to_string()),
            })
            .collect();
        SkipRowList(rules)
    }
}

impl StreamArgs {
    /// Merge the flags over the config file, if any.
    pub fn into_config(self) -> Result<StreamConfig, TabularError> {
        let mut config = match &self.config {
            Some(path) => StreamConfig::from_path(path)?,
            None => StreamConfig::default(),
        };
        if self.source.is_some() {
            config.source = self.source;
        }
        if self.scheme.is_some() {
            config.scheme = self.scheme;
        }
        if self.format.is_some() {
            config.format = self.format;
        }
        if self.encoding.is_some() {
            config.encoding = self.encoding;
        }
        if let Some(row) = self.headers {
            config.headers = Some(row.into());
        }
        if self.sample_size.is_some() {
            config.sample_size = self.sample_size;
        }
        config.force_parse |= self.force_parse;
        config.skip_rows.extend(self.skip_rows.0);
        Ok(config)
    }

    pub fn into_builder(self) -> Result<StreamBuilder, TabularError> {
        self.into_config()?.into_builder()
    }
}

/// Render one output line, quoting cells that hold delimiters, quotes or
/// line breaks.
#[cfg(feature = "csv")]
pub fn render_line(values: &[Value]) -> Result<String, TabularError> {
    if values.is_empty() {
        return Ok(String::new());
    }
    let io_err = |e: std::io::Error| TabularError::io("-", e);
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer
        .write_record(values.iter().map(cell_to_string))
        .map_err(|e| io_err(e.into()))?;
    let bytes = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    let line = String::from_utf8_lossy(&bytes);
    Ok(line.strip_suffix('\n').unwrap_or(&line).to_string())
}

/// Exit status for a failed run: 2 when the stream was misconfigured, 1 when
/// reading it failed.
pub fn exit_code(error: &TabularError) -> i32 {
    if error.kind().is_config() { 2 } else { 1 }
}
