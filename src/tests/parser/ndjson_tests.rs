//! Tests for newline-delimited JSON.

use serde_json::json;

use crate::error::{ErrorKind, SourceError};
use crate::loader::{StreamLoader, TextLoader};
use crate::parser::{NdjsonParser, Parser};
use crate::source::Source;

fn open(text: &str, force_parse: bool) -> NdjsonParser {
    let mut parser = NdjsonParser::new(Box::new(TextLoader::default()), force_parse);
    parser
        .open(&mut Source::from(format!("text://{text}")), None)
        .expect("open ndjson");
    parser
}

#[test]
fn one_record_per_line_skipping_blank_lines() {
    let mut parser = open("[1, 2]\n\n  \n{\"b\": 1, \"a\": 0}\n", false);
    let rows: Vec<_> = parser
        .extended_rows()
        .collect::<Result<_, _>>()
        .expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].values, vec![json!(1), json!(2)]);
    assert_eq!(rows[1].row_number, 2);
    assert_eq!(rows[1].headers, Some(vec!["a".to_string(), "b".to_string()]));
}

#[test]
fn malformed_lines_report_their_row_number() {
    let mut parser = open("[1]\n{bad\n[3]\n", false);
    let results: Vec<_> = parser.extended_rows().collect();
    assert_eq!(results.len(), 2, "iteration ends at the first error");
    let err = results[1].as_ref().expect_err("malformed line");
    assert_eq!(err.kind(), ErrorKind::Source);
    assert!(matches!(
        err.error.downcast_ref::<SourceError>(),
        Some(SourceError::MalformedRow { row_number: 2, .. })
    ));
}

#[test]
fn force_parse_turns_malformed_lines_into_empty_rows() {
    let mut parser = open("[1]\n{bad\n42\n[3]\n", true);
    let rows: Vec<_> = parser
        .extended_rows()
        .collect::<Result<_, _>>()
        .expect("forced rows");
    let widths: Vec<_> = rows.iter().map(|r| r.values.len()).collect();
    assert_eq!(widths, vec![1, 0, 0, 1]);
    assert_eq!(rows[3].row_number, 4);
}

#[test]
fn failed_reset_keeps_the_read_position() {
    let mut parser = NdjsonParser::new(Box::new(StreamLoader::default()), false);
    let mut source = Source::reader(std::io::Cursor::new(b"[1]\n[2]\n[3]\n".to_vec()));
    parser.open(&mut source, Some("utf-8")).expect("open");
    let first = parser.next_row().expect("row").expect("first row");
    assert_eq!(first.values, vec![json!(1)]);

    let err = parser.reset().expect_err("forward stream already read");
    assert_eq!(err.kind(), ErrorKind::NotSeekable);

    let second = parser.next_row().expect("row").expect("second row");
    assert_eq!(second.row_number, 2);
    assert_eq!(second.values, vec![json!(2)]);
}
