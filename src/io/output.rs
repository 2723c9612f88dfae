//! Output target trait definition.

use std::fmt::Debug;
use std::io::Write;

/// A destination a writer can open.
pub trait OutputTarget: Send + Sync + Debug {
    /// Identifier used in errors and logs. `-` for stdout, the path for files.
    fn id(&self) -> &str;

    /// Open the target for writing, truncating any existing content.
    fn open_overwrite(&self) -> std::io::Result<Box<dyn Write + Send>>;

    /// Open the target for appending to existing content.
    fn open_append(&self) -> std::io::Result<Box<dyn Write + Send>>;
}
