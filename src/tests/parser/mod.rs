mod ndjson_tests;
#[cfg(feature = "csv")]
mod tsv_tests;
