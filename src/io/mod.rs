//! Output targets for saving a stream.
//!
//! This module provides:
//! - `OutputTarget`: where `Stream::save_to` writes
//! - `FileOutput` and `StdoutOutput` for real destinations
//! - `InMemorySink` for tests and for callers that want the bytes back

mod memory;
mod output;
mod std_io;

pub use memory::InMemorySink;
pub use output::OutputTarget;
pub use std_io::{FileOutput, StdoutOutput};
