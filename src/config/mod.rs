//! Configuration types for streams.
//!
//! This module provides:
//! - `Headers`: where stream-level headers come from
//! - `SkipRow`: rows dropped by the built-in processor
//! - `Options`: untyped format/scheme options and the claiming logic that
//!   turns them into each variant's typed options struct
//! - `StreamConfig`: declarative stream definition loadable from JSON/YAML/TOML

mod options;
mod pipeline;

pub use options::{Options, claim, unclaimed};
pub use pipeline::StreamConfig;

use serde::{Deserialize, Serialize};

/// Rows sampled at open unless configured otherwise.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Where stream-level headers come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Headers {
    /// Use the values of this 1-based row of the sample as headers
    Row(usize),
    /// Use these names
    List(Vec<String>),
}

impl From<usize> for Headers {
    fn from(row: usize) -> Self {
        Headers::Row(row)
    }
}

impl From<Vec<String>> for Headers {
    fn from(list: Vec<String>) -> Self {
        Headers::List(list)
    }
}

impl From<&[&str]> for Headers {
    fn from(list: &[&str]) -> Self {
        Headers::List(list.iter().map(|s| s.to_string()).collect())
    }
}

/// A rule dropping rows before they reach the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkipRow {
    /// A 1-based source row number
    Number(usize),
    /// Rows whose first cell starts with this prefix; the empty prefix
    /// matches rows whose cells are all empty
    Prefix(String),
}

impl SkipRow {
    /// Matches rows whose cells are all empty.
    pub fn blank() -> Self {
        SkipRow::Prefix(String::new())
    }
}
