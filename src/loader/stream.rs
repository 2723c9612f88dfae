//! Loader for already-open byte handles and in-memory bytes.

use super::{ByteStream, Loader};
use crate::encoding::Detection;
use crate::error::{SourceError, TabularError};
use crate::source::Source;

/// Loader for `Source::Bytes`, `Source::Seekable` and `Source::Reader`.
///
/// Handles are moved out of the source on first load; loading twice fails.
#[derive(Debug, Clone, Default)]
pub struct StreamLoader {
    detection: Detection,
}

impl StreamLoader {
    pub fn new(detection: Detection) -> Self {
        Self { detection }
    }
}

impl Loader for StreamLoader {
    fn open_bytes(&mut self, source: &mut Source) -> Result<ByteStream, TabularError> {
        let id = source.id();
        match std::mem::replace(source, Source::Consumed) {
            Source::Bytes(bytes) => {
                // Bytes can be handed out again, keep a copy in place.
                *source = Source::Bytes(bytes.clone());
                Ok(ByteStream::from_bytes(id, bytes))
            }
            Source::Seekable(reader) => Ok(ByteStream::seekable(id, reader)),
            Source::Reader(reader) => Ok(ByteStream::forward(id, reader)),
            Source::Consumed => Err(TabularError::source(id, SourceError::Consumed)),
            other => {
                *source = other;
                Err(TabularError::source(
                    id,
                    SourceError::Other("the stream scheme expects a byte stream".into()),
                ))
            }
        }
    }

    fn detection(&self) -> &Detection {
        &self.detection
    }
}
