//! Tests for the TSV parser.

use serde_json::json;

use crate::loader::TextLoader;
use crate::parser::{Parser, TsvParser};
use crate::source::Source;

fn open(text: &str) -> TsvParser {
    let mut parser = TsvParser::new(Box::new(TextLoader::default()), false);
    parser
        .open(&mut Source::from(format!("text://{text}")), None)
        .expect("open tsv");
    parser
}

#[test]
fn fields_split_on_tabs_and_unescape() {
    let mut parser = open("a\\tb\tc\n\nx\\\\y\tz\\n\\q\n");
    let rows: Vec<_> = parser
        .extended_rows()
        .collect::<Result<_, _>>()
        .expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].row_number, 1);
    assert_eq!(rows[0].values, vec![json!("a\tb"), json!("c")]);
    assert_eq!(rows[1].row_number, 2);
    assert_eq!(rows[1].values, vec![json!("x\\y"), json!("z\n\\q")]);
}

#[test]
fn crlf_line_endings_are_stripped() {
    let mut parser = open("a\tb\r\n1\t2\r\n");
    let row = parser.next_row().expect("row").expect("some row");
    assert_eq!(row.values, vec![json!("a"), json!("b")]);
}

#[test]
fn reset_replays_from_the_first_line() {
    let mut parser = open("1\n2\n");
    parser.next_row().expect("first");
    parser.next_row().expect("second");
    assert!(parser.next_row().expect("end").is_none());
    parser.reset().expect("reset");
    let row = parser.next_row().expect("again").expect("some row");
    assert_eq!((row.row_number, row.values), (1, vec![json!("1")]));
}
