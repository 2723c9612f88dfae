//! Local filesystem loader.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use super::{ByteStream, Loader, strip_prefix};
use crate::encoding::Detection;
use crate::error::{SourceError, TabularError};
use crate::source::Source;

/// Loader for paths on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalLoader {
    detection: Detection,
}

impl LocalLoader {
    pub fn new(detection: Detection) -> Self {
        Self { detection }
    }
}

impl Loader for LocalLoader {
    fn open_bytes(&mut self, source: &mut Source) -> Result<ByteStream, TabularError> {
        let Source::Path(location) = source else {
            return Err(TabularError::source(
                source.id(),
                SourceError::Other("the file scheme expects a path".into()),
            ));
        };
        let path = PathBuf::from(strip_prefix(location, "file"));
        let file = File::open(&path).map_err(|e| TabularError::io(location.as_str(), e))?;
        tracing::debug!(path = %path.display(), "opened local file");
        Ok(ByteStream::seekable(
            location.clone(),
            Box::new(BufReader::new(file)),
        ))
    }

    fn detection(&self) -> &Detection {
        &self.detection
    }
}
