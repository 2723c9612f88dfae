//! Declarative stream configuration.

use std::path::Path;

use serde::Deserialize;

use super::{Headers, Options, SkipRow};
use crate::error::{ConfigError, TabularError};
use crate::source::Source;
use crate::stream::{ShapeCheck, StreamBuilder};

/// A stream described as data, e.g. in a JSON, YAML or TOML file.
///
/// ```yaml
/// source: data/table.csv
/// headers: 1
/// skip_rows: ["#", ""]
/// options:
///   delimiter: ";"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Path, URL or inline text
    pub source: Option<String>,
    pub scheme: Option<String>,
    pub format: Option<String>,
    pub encoding: Option<String>,
    pub headers: Option<Headers>,
    pub sample_size: Option<usize>,
    pub force_parse: bool,
    pub force_strings: bool,
    pub skip_rows: Vec<SkipRow>,
    pub allow_html: bool,
    /// Fail on rows whose shape differs from the first row
    pub strict: bool,
    /// Skip such rows instead; implies `strict`
    pub lenient: bool,
    pub convert_values: bool,
    /// Scheme- and format-specific options
    pub options: Options,
}

impl StreamConfig {
    pub fn from_json_str(text: &str) -> Result<Self, TabularError> {
        serde_json::from_str(text).map_err(|e| invalid("json", e))
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self, TabularError> {
        serde_yaml::from_str(text).map_err(|e| invalid("yaml", e))
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(text: &str) -> Result<Self, TabularError> {
        toml::from_str(text).map_err(|e| invalid("toml", e))
    }

    /// Load a configuration file, picking the syntax from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TabularError> {
        let path = path.as_ref();
        let id = path.to_string_lossy().into_owned();
        let text = std::fs::read_to_string(path).map_err(|e| TabularError::io(&id, e))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            #[cfg(feature = "toml")]
            Some("toml") => Self::from_toml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    /// A builder for the configured source.
    pub fn into_builder(self) -> Result<StreamBuilder, TabularError> {
        let source = self.source.clone().ok_or_else(|| {
            TabularError::options(
                "<config>",
                ConfigError::InvalidOption {
                    owner: "config".into(),
                    message: "missing field `source`".into(),
                },
            )
        })?;
        Ok(self.builder_for(source))
    }

    /// A builder applying this configuration to another source, such as an
    /// open reader or a native sequence.
    pub fn builder_for(self, source: impl Into<Source>) -> StreamBuilder {
        let mut builder = StreamBuilder::new(source)
            .force_parse(self.force_parse)
            .force_strings(self.force_strings)
            .skip_rows(self.skip_rows)
            .allow_html(self.allow_html)
            .convert_values(self.convert_values)
            .options(self.options);
        if let Some(scheme) = self.scheme {
            builder = builder.scheme(scheme);
        }
        if let Some(format) = self.format {
            builder = builder.format(format);
        }
        if let Some(encoding) = self.encoding {
            builder = builder.encoding(encoding);
        }
        if let Some(headers) = self.headers {
            builder = builder.headers(headers);
        }
        if let Some(size) = self.sample_size {
            builder = builder.sample_size(size);
        }
        if self.lenient {
            builder = builder.shape_check(ShapeCheck::Lenient);
        } else if self.strict {
            builder = builder.shape_check(ShapeCheck::Strict);
        }
        builder
    }
}

fn invalid(syntax: &str, e: impl std::fmt::Display) -> TabularError {
    TabularError::options(
        "<config>",
        ConfigError::InvalidOption {
            owner: format!("{syntax} config"),
            message: e.to_string(),
        },
    )
}
