//! Source values and their classification into a scheme and a format.

mod classify;

use std::fmt;
use std::io::{Read, Seek};
use std::sync::Arc;

use serde_json::Value;

pub use classify::{Classification, classify, detect_format, detect_scheme, gsheet_export_url};

/// A `Read + Seek` trait object.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Iterator over native records.
pub type RecordIter = Box<dyn Iterator<Item = Value> + Send>;

/// Zero-argument factory returning a fresh record iterator.
pub type RecordFactory = Arc<dyn Fn() -> RecordIter + Send + Sync>;

/// An in-process sequence of records.
pub enum NativeSource {
    /// A materialized list; re-read from the start on every reset
    Rows(Arc<Vec<Value>>),
    /// A factory invoked again on every reset
    Factory(RecordFactory),
    /// A one-shot iterator. It cannot be reset and is rejected at open.
    Once(RecordIter),
}

impl NativeSource {
    pub fn rows(rows: Vec<Value>) -> Self {
        NativeSource::Rows(Arc::new(rows))
    }

    pub fn factory<F, I>(f: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = Value> + Send + 'static,
    {
        NativeSource::Factory(Arc::new(move || Box::new(f()) as RecordIter))
    }

    pub fn once<I>(iter: I) -> Self
    where
        I: Iterator<Item = Value> + Send + 'static,
    {
        NativeSource::Once(Box::new(iter))
    }
}

impl fmt::Debug for NativeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeSource::Rows(rows) => f.debug_tuple("Rows").field(&rows.len()).finish(),
            NativeSource::Factory(_) => f.write_str("Factory"),
            NativeSource::Once(_) => f.write_str("Once"),
        }
    }
}

/// Anything a stream can read rows from.
pub enum Source {
    /// A path, a URL, or inline text when the scheme is `text`
    Path(String),
    /// In-memory bytes
    Bytes(Vec<u8>),
    /// An already-open, forward-only byte stream
    Reader(Box<dyn Read + Send>),
    /// An already-open, seekable byte stream
    Seekable(Box<dyn ReadSeek + Send>),
    /// An in-process record sequence
    Native(NativeSource),
    /// A byte stream that has been handed to a loader
    Consumed,
}

impl Source {
    /// Wrap a one-shot reader.
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Source::Reader(Box::new(reader))
    }

    /// Wrap a seekable reader.
    pub fn seekable(reader: impl Read + Seek + Send + 'static) -> Self {
        Source::Seekable(Box::new(reader))
    }

    /// Whether the source exposes a byte stream rather than a location.
    pub fn is_stream(&self) -> bool {
        matches!(
            self,
            Source::Bytes(_) | Source::Reader(_) | Source::Seekable(_) | Source::Consumed
        )
    }

    /// Identifier used in errors and logs.
    pub fn id(&self) -> String {
        match self {
            Source::Path(p) => {
                if p.len() > 64 {
                    let cut = p.char_indices().nth(61).map(|(i, _)| i).unwrap_or(p.len());
                    format!("{}...", &p[..cut])
                } else {
                    p.clone()
                }
            }
            Source::Bytes(_) | Source::Reader(_) | Source::Seekable(_) | Source::Consumed => {
                "<stream>".into()
            }
            Source::Native(_) => "<native>".into(),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Source::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Source::Reader(_) => f.write_str("Reader"),
            Source::Seekable(_) => f.write_str("Seekable"),
            Source::Native(n) => f.debug_tuple("Native").field(n).finish(),
            Source::Consumed => f.write_str("Consumed"),
        }
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::Path(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source::Path(s)
    }
}

impl From<&std::path::Path> for Source {
    fn from(p: &std::path::Path) -> Self {
        Source::Path(p.to_string_lossy().into_owned())
    }
}

impl From<std::path::PathBuf> for Source {
    fn from(p: std::path::PathBuf) -> Self {
        Source::Path(p.to_string_lossy().into_owned())
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

impl From<NativeSource> for Source {
    fn from(native: NativeSource) -> Self {
        Source::Native(native)
    }
}

impl From<Vec<Value>> for Source {
    fn from(rows: Vec<Value>) -> Self {
        Source::Native(NativeSource::rows(rows))
    }
}
