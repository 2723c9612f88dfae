use std::convert::Infallible;

use sarge::ArgumentType;

use crate::cli::SkipRowList;

impl ArgumentType for SkipRowList {
    type Error = Infallible;

    const REPEATABLE: bool = true;

    fn from_value(val: Option<&str>) -> sarge::ArgResult<Self> {
        Some(Ok(val.map(SkipRowList::parse).unwrap_or_default()))
    }

    fn default_value() -> Option<Self> {
        Some(SkipRowList::default())
    }
}
