//! Untyped option maps and their typed, per-variant views.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ConfigError, TabularError};

/// Format- and scheme-specific options keyed by name.
pub type Options = BTreeMap<String, Value>;

/// Extract the keys a variant declares and deserialize them into its typed
/// options struct. Missing keys take the struct's defaults.
pub fn claim<T: DeserializeOwned>(
    options: &Options,
    keys: &[&str],
    owner: &str,
    target: &str,
) -> Result<T, TabularError> {
    let subset: serde_json::Map<String, Value> = options
        .iter()
        .filter(|(k, _)| keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::from_value(Value::Object(subset)).map_err(|e| {
        TabularError::options(
            target,
            ConfigError::InvalidOption {
                owner: owner.to_string(),
                message: e.to_string(),
            },
        )
    })
}

/// Keys no declared option list claims, in sorted order.
pub fn unclaimed(options: &Options, declared: &[&[&str]]) -> Vec<String> {
    options
        .keys()
        .filter(|k| !declared.iter().any(|keys| keys.contains(&k.as_str())))
        .cloned()
        .collect()
}
