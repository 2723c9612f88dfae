//! Inline text loader.

use super::{ByteStream, Loader, strip_prefix};
use crate::encoding::Detection;
use crate::error::{SourceError, TabularError};
use crate::source::Source;

/// Loader for text literals, with or without a `text://` prefix.
///
/// The literal is already a Rust string, so its bytes are UTF-8.
#[derive(Debug, Clone, Default)]
pub struct TextLoader {
    detection: Detection,
}

impl TextLoader {
    pub fn new(detection: Detection) -> Self {
        Self { detection }
    }
}

impl Loader for TextLoader {
    fn open_bytes(&mut self, source: &mut Source) -> Result<ByteStream, TabularError> {
        let Source::Path(literal) = source else {
            return Err(TabularError::source(
                source.id(),
                SourceError::Other("the text scheme expects a string".into()),
            ));
        };
        let text = strip_prefix(literal, "text");
        Ok(ByteStream::from_bytes("<text>", text.as_bytes().to_vec()))
    }

    fn detection(&self) -> &Detection {
        &self.detection
    }
}
