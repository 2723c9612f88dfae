//! Tests for the command-line helpers.

use std::io::Write;

use serde_json::{Value, json};

use crate::cli::{SkipRowList, StreamArgs, exit_code};
#[cfg(feature = "csv")]
use crate::cli::render_line;
use crate::config::{Headers, SkipRow};

#[test]
fn skip_row_list_parses_numbers_prefixes_and_blank() {
    assert_eq!(
        SkipRowList::parse("1, #,BLANK,,// "),
        SkipRowList(vec![
            SkipRow::Number(1),
            SkipRow::Prefix("#".into()),
            SkipRow::blank(),
            SkipRow::Prefix("//".into()),
        ])
    );
    assert_eq!(SkipRowList::parse(""), SkipRowList::default());
}

#[cfg(feature = "csv")]
#[test]
fn render_line_joins_cells() {
    let line = render_line(&[json!("a"), json!(1), Value::Null, json!(true)]).expect("line");
    assert_eq!(line, "a,1,,true");
    assert_eq!(render_line(&[]).expect("empty line"), "");
}

#[cfg(feature = "csv")]
#[test]
fn render_line_quotes_cells_that_need_it() {
    let line = render_line(&[json!("a,b"), json!("say \"hi\""), json!("two\nlines")])
        .expect("line");
    assert_eq!(line, "\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\"");
}

#[test]
fn configuration_errors_exit_with_usage_status() {
    let err = StreamArgs {
        source: Some("data.csv".into()),
        format: Some("nope".into()),
        ..StreamArgs::default()
    }
    .into_builder()
    .and_then(|builder| builder.open())
    .expect_err("unknown format");
    assert!(err.kind().is_config());
    assert_eq!(exit_code(&err), 2);

    let err = crate::TabularError::not_seekable("<stream>");
    assert_eq!(exit_code(&err), 1);
}

#[test]
fn flags_fill_an_empty_config() {
    let args = StreamArgs {
        source: Some("data.csv".into()),
        format: Some("csv".into()),
        headers: Some(1),
        force_parse: true,
        skip_rows: SkipRowList(vec![SkipRow::Number(3)]),
        ..StreamArgs::default()
    };
    let config = args.into_config().expect("config");
    assert_eq!(config.source.as_deref(), Some("data.csv"));
    assert_eq!(config.headers, Some(Headers::Row(1)));
    assert!(config.force_parse);
    assert_eq!(config.skip_rows, vec![SkipRow::Number(3)]);
}

#[test]
fn flags_override_the_config_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp file");
    file.write_all(br##"{"source": "a.csv", "sample_size": 5, "skip_rows": ["#"]}"##)
        .expect("write");

    let args = StreamArgs {
        source: Some("b.csv".into()),
        skip_rows: SkipRowList(vec![SkipRow::blank()]),
        config: Some(file.path().to_string_lossy().into_owned()),
        ..StreamArgs::default()
    };
    let config = args.into_config().expect("config");
    assert_eq!(config.source.as_deref(), Some("b.csv"));
    assert_eq!(config.sample_size, Some(5));
    assert_eq!(
        config.skip_rows,
        vec![SkipRow::Prefix("#".into()), SkipRow::blank()]
    );
}

#[test]
fn missing_source_is_reported() {
    assert!(StreamArgs::default().into_builder().is_err());
}
