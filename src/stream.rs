//! The stream orchestrator.
//!
//! A [`Stream`] classifies its source, builds a loader and a parser for it,
//! buffers a sample of rows at open, resolves headers from that sample, and
//! hands out row iterators that replay the sample before pulling live rows
//! from the parser.
//!
//! ```no_run
//! use tabstream::{RowShape, Stream};
//!
//! # fn main() -> Result<(), tabstream::TabularError> {
//! let mut stream = Stream::builder("data/table.csv").header_row(1).open()?;
//! for row in stream.iter(RowShape::Keyed)? {
//!     println!("{:?}", row?);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde_json::Value;

use crate::config::{DEFAULT_SAMPLE_SIZE, Headers, Options, SkipRow, unclaimed};
use crate::encoding::Detection;
use crate::error::{ConfigError, ErrorKind, SourceError, TabularError};
use crate::format::{self, DEFAULT_SCHEME, FormatKind, SchemeKind, compatible};
use crate::io::{FileOutput, OutputTarget};
use crate::loader;
use crate::parser::{self, Parser};
use crate::processor::{
    self, AssignHeaders, ConvertValues, HeaderRow, Outcome, Processor, RowState, SkipRows, Strict,
};
use crate::row::{ExtendedRow, Row, RowShape, cell_to_string};
use crate::source::{Source, classify, gsheet_export_url};
use crate::writer;

/// How rows of different shapes are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeCheck {
    #[default]
    Off,
    /// A row whose width or header set differs from the first row fails
    Strict,
    /// Such rows are skipped
    Lenient,
}

#[derive(Debug, Clone)]
struct Settings {
    scheme: Option<String>,
    format: Option<String>,
    encoding: Option<String>,
    headers: Option<Headers>,
    sample_size: usize,
    force_parse: bool,
    force_strings: bool,
    skip_rows: Vec<SkipRow>,
    allow_html: bool,
    shape_check: ShapeCheck,
    convert_values: bool,
    options: Options,
    detection: Detection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheme: None,
            format: None,
            encoding: None,
            headers: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
            force_parse: false,
            force_strings: false,
            skip_rows: Vec::new(),
            allow_html: false,
            shape_check: ShapeCheck::Off,
            convert_values: false,
            options: Options::new(),
            detection: Detection::default(),
        }
    }
}

/// Fluent construction of a [`Stream`].
pub struct StreamBuilder {
    source: Source,
    settings: Settings,
    processors: Vec<Box<dyn Processor>>,
}

impl StreamBuilder {
    pub fn new(source: impl Into<Source>) -> Self {
        Self {
            source: source.into(),
            settings: Settings::default(),
            processors: Vec::new(),
        }
    }

    /// Override the detected scheme.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.settings.scheme = Some(scheme.into());
        self
    }

    /// Override the detected format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.settings.format = Some(format.into());
        self
    }

    /// Override the detected character encoding.
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.settings.encoding = Some(encoding.into());
        self
    }

    pub fn headers(mut self, headers: impl Into<Headers>) -> Self {
        self.settings.headers = Some(headers.into());
        self
    }

    /// Take headers from this 1-based row of the sample.
    pub fn header_row(self, row: usize) -> Self {
        self.headers(Headers::Row(row))
    }

    /// Rows buffered at open. Zero disables sampling and header inference.
    pub fn sample_size(mut self, size: usize) -> Self {
        self.settings.sample_size = size;
        self
    }

    /// Emit malformed rows as empty rows instead of failing.
    pub fn force_parse(mut self, yes: bool) -> Self {
        self.settings.force_parse = yes;
        self
    }

    /// Render every value as text.
    pub fn force_strings(mut self, yes: bool) -> Self {
        self.settings.force_strings = yes;
        self
    }

    pub fn skip_row(mut self, rule: SkipRow) -> Self {
        self.settings.skip_rows.push(rule);
        self
    }

    pub fn skip_rows(mut self, rules: impl IntoIterator<Item = SkipRow>) -> Self {
        self.settings.skip_rows.extend(rules);
        self
    }

    /// Read sources whose sample looks like an HTML page.
    pub fn allow_html(mut self, yes: bool) -> Self {
        self.settings.allow_html = yes;
        self
    }

    pub fn shape_check(mut self, check: ShapeCheck) -> Self {
        self.settings.shape_check = check;
        self
    }

    /// Fail on rows whose shape differs from the first row.
    pub fn strict(self) -> Self {
        self.shape_check(ShapeCheck::Strict)
    }

    /// Parse string values as literals with [`processor::parse_literal`].
    pub fn convert_values(mut self, yes: bool) -> Self {
        self.settings.convert_values = yes;
        self
    }

    /// Set a scheme- or format-specific option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.options.insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.settings.options.extend(options);
        self
    }

    /// Encoding detection settings.
    pub fn detection(mut self, detection: Detection) -> Self {
        self.settings.detection = detection;
        self
    }

    /// Append a processor; it runs after the built-in ones.
    pub fn processor(mut self, processor: impl Processor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Build the stream without opening it.
    pub fn build(self) -> Stream {
        Stream {
            source: self.source,
            settings: self.settings,
            processors: self.processors,
            state: None,
        }
    }

    /// Build and open the stream.
    pub fn open(self) -> Result<Stream, TabularError> {
        let mut stream = self.build();
        stream.open()?;
        Ok(stream)
    }
}

/// State that only exists while the stream is open.
struct Open {
    target: String,
    scheme: SchemeKind,
    format: FormatKind,
    parser: Box<dyn Parser>,
    sample: Vec<ExtendedRow>,
    /// Content error met while sampling, raised when iteration gets there
    deferred: Option<TabularError>,
    /// The parser ended within the sample
    exhausted: bool,
    /// Rows past the sample were pulled since the last sampling
    live: bool,
    headers: Option<Vec<String>>,
}

/// A tabular data stream over any supported source.
pub struct Stream {
    source: Source,
    settings: Settings,
    processors: Vec<Box<dyn Processor>>,
    state: Option<Open>,
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Stream");
        s.field("source", &self.source)
            .field("settings", &self.settings)
            .field("processors", &self.processors.len());
        if let Some(open) = &self.state {
            s.field("scheme", &open.scheme)
                .field("format", &open.format)
                .field("sample", &open.sample.len())
                .field("headers", &open.headers);
        }
        s.finish()
    }
}

impl Stream {
    pub fn builder(source: impl Into<Source>) -> StreamBuilder {
        StreamBuilder::new(source)
    }

    /// Whether `source` resolves to a supported scheme and format. Pure
    /// classification and lookup; nothing is opened.
    pub fn test(source: &Source, scheme: Option<&str>, format: Option<&str>) -> bool {
        let class = classify(source, scheme, format);
        let scheme = class.scheme.unwrap_or_else(|| DEFAULT_SCHEME.to_string());
        match class.format {
            Some(format) => format::is_supported(&scheme, &format),
            None => false,
        }
    }

    /// Open the stream, run `f`, and close it whatever `f` returns.
    pub fn scoped<T>(
        mut self,
        f: impl FnOnce(&mut Stream) -> Result<T, TabularError>,
    ) -> Result<T, TabularError> {
        self.open()?;
        let result = f(&mut self);
        self.close();
        result
    }

    /// Resolve scheme and format, open the parser, buffer the sample and
    /// resolve headers. An open stream is closed first.
    pub fn open(&mut self) -> Result<(), TabularError> {
        self.close();
        let target = self.source.id();
        let settings = &self.settings;

        if let Some(Headers::Row(row)) = settings.headers {
            if row == 0 {
                return Err(TabularError::headers(&target, ConfigError::HeaderRowZero));
            }
            if row > settings.sample_size {
                return Err(TabularError::headers(
                    &target,
                    ConfigError::HeaderRowBeyondSample {
                        row,
                        sample_size: settings.sample_size,
                    },
                ));
            }
        }

        let class = classify(
            &self.source,
            settings.scheme.as_deref(),
            settings.format.as_deref(),
        );
        let scheme = resolve_scheme(class.scheme, &target)?;
        let format = resolve_format(class.format, &target)?;
        if !compatible(scheme, format) {
            return Err(TabularError::format(
                &target,
                ConfigError::Incompatible {
                    scheme: scheme.to_string(),
                    format: format.to_string(),
                },
            ));
        }

        let leftover = unclaimed(&settings.options, &[scheme.options(), format.options()]);
        if !leftover.is_empty() {
            return Err(TabularError::options(
                &target,
                ConfigError::Unclaimed(leftover),
            ));
        }

        let detection = match settings.sample_size {
            0 => settings.detection.clone().disabled(),
            _ => settings.detection.clone(),
        };
        let loader = loader::create(
            scheme,
            detection,
            &settings.options,
            &target,
        )?;
        let mut parser = parser::create(
            format,
            loader,
            &settings.options,
            settings.force_parse,
            &target,
        )?;

        let mut export = match (&self.source, format) {
            (Source::Path(url), FormatKind::Gsheet) => gsheet_export_url(url).map(Source::Path),
            _ => None,
        };
        let source = match export.as_mut() {
            Some(export) => {
                tracing::debug!(source = %target, export = %export.id(), "reading sheet export");
                export
            }
            None => &mut self.source,
        };
        parser.open(source, self.settings.encoding.as_deref())?;

        let mut open = Open {
            target,
            scheme,
            format,
            parser,
            sample: Vec::new(),
            deferred: None,
            exhausted: false,
            live: false,
            headers: None,
        };
        if let Err(e) = self.prime(&mut open) {
            open.parser.close();
            return Err(e);
        }
        tracing::debug!(
            source = %open.target,
            scheme = %open.scheme,
            format = %open.format,
            encoding = ?open.parser.encoding(),
            sampled = open.sample.len(),
            headers = ?open.headers,
            "opened stream"
        );
        self.state = Some(open);
        Ok(())
    }

    /// Fill the sample, resolve headers and check the content.
    fn prime(&self, open: &mut Open) -> Result<(), TabularError> {
        open.sample.clear();
        open.deferred = None;
        open.exhausted = false;
        open.live = false;

        while open.sample.len() < self.settings.sample_size {
            match open.parser.next_row() {
                Ok(Some(row)) => open.sample.push(row),
                Ok(None) => {
                    open.exhausted = true;
                    break;
                }
                Err(e) if e.kind() == ErrorKind::Source => {
                    tracing::debug!(source = %open.target, error = %e, "deferring error met while sampling");
                    open.deferred = Some(e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        open.headers = match &self.settings.headers {
            Some(Headers::List(list)) => Some(list.clone()),
            Some(Headers::Row(n)) => open
                .sample
                .iter()
                .find(|row| row.row_number == *n)
                .map(|row| match &row.headers {
                    Some(keys) => keys.clone(),
                    None => row.values.iter().map(cell_to_string).collect(),
                }),
            None => open.sample.iter().find_map(|row| row.headers.clone()),
        };

        if !self.settings.allow_html
            && open.format.is_text()
            && open.format != FormatKind::Html
            && looks_like_html(&open.sample)
        {
            return Err(TabularError::source(&open.target, SourceError::LooksLikeHtml));
        }
        Ok(())
    }

    /// Release the parser and its stream. No-op when closed.
    pub fn close(&mut self) {
        if let Some(mut open) = self.state.take() {
            open.parser.close();
            tracing::debug!(source = %open.target, "closed stream");
        }
    }

    pub fn closed(&self) -> bool {
        self.state.is_none()
    }

    /// Rewind to the first row.
    ///
    /// When only sampled rows were read this just replays the sample.
    /// Otherwise the parser is reset, and the sample and headers are
    /// resolved again; that fails with `NotSeekable` for consumed
    /// forward-only streams.
    pub fn reset(&mut self) -> Result<(), TabularError> {
        let mut open = self.state.take().ok_or_else(|| self.closed_error())?;
        if !open.live {
            tracing::debug!(source = %open.target, "reset within the sample");
            self.state = Some(open);
            return Ok(());
        }
        let result = open.parser.reset().and_then(|()| self.prime(&mut open));
        tracing::debug!(source = %open.target, ok = result.is_ok(), "reset parser");
        self.state = Some(open);
        result
    }

    /// Headers resolved at open, if any.
    pub fn headers(&self) -> Option<&[String]> {
        self.state.as_ref()?.headers.as_deref()
    }

    /// Name of the encoding the parser decodes with.
    pub fn encoding(&self) -> Option<&str> {
        self.state.as_ref()?.parser.encoding()
    }

    pub fn scheme(&self) -> Option<SchemeKind> {
        self.state.as_ref().map(|open| open.scheme)
    }

    pub fn format(&self) -> Option<FormatKind> {
        self.state.as_ref().map(|open| open.format)
    }

    /// Values of the sampled rows after processing. The parser is not
    /// touched, so this can be called any number of times.
    pub fn sample(&mut self) -> Result<Vec<Vec<Value>>, TabularError> {
        let mut builtins = self.builtins()?;
        for p in &mut self.processors {
            p.restart();
        }
        let Some(open) = self.state.as_ref() else {
            return Err(self.closed_error());
        };
        let mut values = Vec::new();
        for row in &open.sample {
            let stages = builtins
                .iter_mut()
                .chain(self.processors.iter_mut())
                .map(|p| p.as_mut());
            match processor::apply(stages, row.clone())? {
                Outcome::Emit(state) => values.push(state.values),
                Outcome::Skip => continue,
                Outcome::Stop => break,
            }
        }
        Ok(values)
    }

    /// Iterate the rows: the sample first, then live parser rows.
    ///
    /// Each call starts a fresh pass of the processor chain. Output row
    /// numbers start at 1 and skipped rows do not use one up.
    pub fn iter(&mut self, shape: RowShape) -> Result<Rows<'_>, TabularError> {
        let builtins = self.builtins()?;
        for p in &mut self.processors {
            p.restart();
        }
        Ok(Rows {
            stream: self,
            shape,
            builtins,
            cursor: 0,
            emitted: 0,
            done: false,
        })
    }

    pub fn iter_rows(&mut self) -> Result<Rows<'_>, TabularError> {
        self.iter(RowShape::Plain)
    }

    pub fn iter_keyed(&mut self) -> Result<Rows<'_>, TabularError> {
        self.iter(RowShape::Keyed)
    }

    pub fn iter_extended(&mut self) -> Result<Rows<'_>, TabularError> {
        self.iter(RowShape::Extended)
    }

    /// Collect [`Stream::iter`], stopping after `limit` rows if given.
    pub fn read(&mut self, shape: RowShape, limit: Option<usize>) -> Result<Vec<Row>, TabularError> {
        let rows = self.iter(shape)?;
        match limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }

    /// Write the remaining rows to a file. The format defaults to the one
    /// matching the file extension.
    pub fn save(
        &mut self,
        path: impl AsRef<Path>,
        format: Option<FormatKind>,
    ) -> Result<usize, TabularError> {
        let path = path.as_ref();
        let format = match format {
            Some(format) => format,
            None => path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(FormatKind::for_extension)
                .ok_or_else(|| {
                    TabularError::format(path.to_string_lossy(), ConfigError::UndetectedFormat)
                })?,
        };
        self.save_to(&FileOutput::new(path), format)
    }

    /// Write the rows to any output target.
    pub fn save_to(
        &mut self,
        target: &dyn OutputTarget,
        format: FormatKind,
    ) -> Result<usize, TabularError> {
        let headers = self.headers().map(<[String]>::to_vec);
        let rows = self.iter(RowShape::Extended)?.map(|row| {
            row.map(|row| match row {
                Row::Extended(row) => row,
                other => ExtendedRow::positional(0, other.into_values()),
            })
        });
        writer::write_rows(rows, headers.as_deref(), format, target)
    }

    fn builtins(&self) -> Result<Vec<Box<dyn Processor>>, TabularError> {
        let open = self.state.as_ref().ok_or_else(|| self.closed_error())?;
        let settings = &self.settings;
        let mut stages: Vec<Box<dyn Processor>> = Vec::new();
        if let Some(Headers::Row(n)) = settings.headers {
            stages.push(Box::new(HeaderRow::new(n)));
        }
        if !settings.skip_rows.is_empty() {
            stages.push(Box::new(SkipRows::new(settings.skip_rows.clone())));
        }
        stages.push(Box::new(AssignHeaders::new(
            open.headers.clone(),
            settings.force_strings,
        )));
        match settings.shape_check {
            ShapeCheck::Off => {}
            ShapeCheck::Strict => stages.push(Box::new(Strict::new(&open.target))),
            ShapeCheck::Lenient => stages.push(Box::new(Strict::lenient(&open.target))),
        }
        if settings.convert_values {
            stages.push(Box::new(ConvertValues::default()));
        }
        Ok(stages)
    }

    fn closed_error(&self) -> TabularError {
        TabularError::source(self.source.id(), SourceError::Closed)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.close();
    }
}

fn resolve_scheme(name: Option<String>, target: &str) -> Result<SchemeKind, TabularError> {
    let name = name.unwrap_or_else(|| DEFAULT_SCHEME.to_string());
    let scheme: SchemeKind = name
        .parse()
        .map_err(|()| TabularError::scheme(target, &name))?;
    if !scheme.is_available() {
        return Err(TabularError::new(
            ErrorKind::Scheme,
            target,
            ConfigError::NotEnabled(name),
        ));
    }
    Ok(scheme)
}

fn resolve_format(name: Option<String>, target: &str) -> Result<FormatKind, TabularError> {
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return Err(TabularError::format(target, ConfigError::UndetectedFormat));
    };
    let format: FormatKind = name
        .parse()
        .map_err(|()| TabularError::format(target, ConfigError::UnsupportedFormat(name.clone())))?;
    if !format.is_available() {
        return Err(TabularError::format(target, ConfigError::NotEnabled(name)));
    }
    Ok(format)
}

/// Whether the sampled text reads like an HTML page.
fn looks_like_html(sample: &[ExtendedRow]) -> bool {
    sample.iter().any(|row| {
        row.values.iter().any(|value| {
            value.as_str().is_some_and(|s| {
                let s = s.trim_start().to_ascii_lowercase();
                s.starts_with("<!doctype html") || s.starts_with("<html")
            })
        })
    })
}

/// Iterator over a stream's rows. See [`Stream::iter`].
pub struct Rows<'a> {
    stream: &'a mut Stream,
    shape: RowShape,
    builtins: Vec<Box<dyn Processor>>,
    /// Position in the sample
    cursor: usize,
    /// Rows handed out so far
    emitted: usize,
    done: bool,
}

impl Rows<'_> {
    fn pull(&mut self) -> Result<Option<ExtendedRow>, TabularError> {
        let Some(open) = self.stream.state.as_mut() else {
            return Err(self.stream.closed_error());
        };
        if let Some(row) = open.sample.get(self.cursor) {
            self.cursor += 1;
            return Ok(Some(row.clone()));
        }
        if let Some(e) = open.deferred.take() {
            open.live = true;
            return Err(e);
        }
        if open.exhausted {
            return Ok(None);
        }
        open.live = true;
        open.parser.next_row()
    }

    fn advance(&mut self) -> Result<Option<Row>, TabularError> {
        loop {
            let Some(raw) = self.pull()? else {
                return Ok(None);
            };
            let stages = self
                .builtins
                .iter_mut()
                .chain(self.stream.processors.iter_mut())
                .map(|p| p.as_mut());
            match processor::apply(stages, raw)? {
                Outcome::Skip => continue,
                Outcome::Stop => return Ok(None),
                Outcome::Emit(state) => {
                    self.emitted += 1;
                    return self.project(state).map(Some);
                }
            }
        }
    }

    fn project(&self, state: RowState) -> Result<Row, TabularError> {
        match self.shape {
            RowShape::Plain => Ok(Row::Plain(state.values)),
            RowShape::Extended => Ok(Row::Extended(ExtendedRow::new(
                self.emitted,
                state.headers,
                state.values,
            ))),
            RowShape::Keyed => ExtendedRow::new(self.emitted, state.headers, state.values)
                .keyed()
                .map(Row::Keyed)
                .ok_or_else(|| {
                    TabularError::headers(self.stream.source.id(), ConfigError::NoHeaders)
                }),
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Row, TabularError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
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
