//! Loaders turn a source into an open byte or text stream.
//!
//! This module provides:
//! - `Loader`: the capability set every transport implements
//! - `ByteStream` / `Handle`: what a loader hands to a parser
//! - one loader per scheme: local files, remote URLs, inline text, open streams
//!
//! Native sequences never go through a loader.

mod bytes;
mod local;
#[cfg(feature = "remote")]
mod remote;
mod stream;
mod text;

pub use bytes::ByteStream;
pub use local::LocalLoader;
#[cfg(feature = "remote")]
pub use remote::{RemoteLoader, RemoteOptions};
pub use stream::StreamLoader;
pub use text::TextLoader;

use crate::config::Options;
use crate::encoding::{Detection, TextStream, lookup};
use crate::error::TabularError;
use crate::format::SchemeKind;
use crate::source::Source;

/// How a parser wants its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Text,
    Binary,
}

/// An open stream handed to a parser.
#[derive(Debug)]
pub enum Handle {
    Text(TextStream),
    Binary {
        stream: ByteStream,
        /// Explicit encoding, if the caller gave one
        encoding: Option<&'static encoding_rs::Encoding>,
    },
}

impl Handle {
    pub fn into_text(self) -> TextStream {
        match self {
            Handle::Text(text) => text,
            Handle::Binary { stream, encoding } => {
                TextStream::new(stream, encoding.unwrap_or(encoding_rs::UTF_8))
            }
        }
    }

    pub fn into_binary(self) -> ByteStream {
        match self {
            Handle::Text(text) => text.into_inner(),
            Handle::Binary { stream, .. } => stream,
        }
    }

    /// Name of the resolved encoding, if any.
    pub fn encoding(&self) -> Option<&'static str> {
        match self {
            Handle::Text(text) => Some(text.encoding().name()),
            Handle::Binary { encoding, .. } => encoding.map(|e| e.name()),
        }
    }
}

/// A transport that can open a byte stream for a source.
pub trait Loader: Send + std::fmt::Debug {
    /// Open the raw byte stream for `source`.
    fn open_bytes(&mut self, source: &mut Source) -> Result<ByteStream, TabularError>;

    /// Encoding detection settings.
    fn detection(&self) -> &Detection;

    /// Open `source` in the requested mode.
    ///
    /// Text mode resolves the encoding from `encoding`, else from a leading
    /// byte sample, else the default, and wraps the bytes in a decoder.
    fn load(
        &mut self,
        source: &mut Source,
        mode: Mode,
        encoding: Option<&str>,
    ) -> Result<Handle, TabularError> {
        let mut stream = self.open_bytes(source)?;
        let explicit = encoding
            .map(|label| lookup(label, stream.id()))
            .transpose()?;
        match mode {
            Mode::Binary => Ok(Handle::Binary {
                stream,
                encoding: explicit,
            }),
            Mode::Text => {
                let encoding = match explicit {
                    Some(encoding) => encoding,
                    None => self.detection().detect(&mut stream)?,
                };
                Ok(Handle::Text(TextStream::new(stream, encoding)))
            }
        }
    }
}

/// Build the loader registered for `scheme`. Native sequences get none.
pub fn create(
    scheme: SchemeKind,
    detection: Detection,
    options: &Options,
    target: &str,
) -> Result<Option<Box<dyn Loader>>, TabularError> {
    let loader: Box<dyn Loader> = match scheme {
        SchemeKind::File => Box::new(LocalLoader::new(detection)),
        SchemeKind::Text => Box::new(TextLoader::new(detection)),
        SchemeKind::Stream => Box::new(StreamLoader::new(detection)),
        SchemeKind::Native => return Ok(None),
        #[cfg(feature = "remote")]
        SchemeKind::Http | SchemeKind::Https | SchemeKind::Ftp | SchemeKind::Ftps => {
            let opts: RemoteOptions =
                crate::config::claim(options, scheme.options(), &scheme.to_string(), target)?;
            Box::new(RemoteLoader::new(detection, opts))
        }
        #[cfg(not(feature = "remote"))]
        SchemeKind::Http | SchemeKind::Https | SchemeKind::Ftp | SchemeKind::Ftps => {
            let _ = options;
            return Err(TabularError::scheme(target, &scheme.to_string()));
        }
    };
    Ok(Some(loader))
}

/// Strip a `name://` prefix when present.
pub(crate) fn strip_prefix<'a>(location: &'a str, scheme: &str) -> &'a str {
    let prefix_len = scheme.len() + 3;
    match location.get(..prefix_len) {
        Some(head)
            if head.ends_with("://")
                && head
                    .get(..scheme.len())
                    .is_some_and(|s| s.eq_ignore_ascii_case(scheme)) =>
        {
            &location[prefix_len..]
        }
        _ => location,
    }
}
