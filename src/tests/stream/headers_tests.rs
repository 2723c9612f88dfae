//! Tests for header resolution on delimited text.

use serde_json::{Value, json};

use super::{numbers, plain};
use crate::row::RowShape;
use crate::stream::Stream;

const TABLE: &str = "text://id,name\n1,english\n2,foo\n";

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn header_row_is_extracted_and_removed_from_the_data() {
    let mut stream = Stream::builder(TABLE)
        .format("csv")
        .header_row(1)
        .open()
        .expect("open");
    assert_eq!(stream.headers(), Some(&names(&["id", "name"])[..]));
    assert_eq!(
        plain(&mut stream),
        vec![
            vec![json!("1"), json!("english")],
            vec![json!("2"), json!("foo")],
        ]
    );
    assert_eq!(numbers(&mut stream), vec![1, 2]);
}

#[test]
fn keyed_rows_pair_headers_with_values() {
    let mut stream = Stream::builder(TABLE)
        .format("csv")
        .header_row(1)
        .open()
        .expect("open");
    let rows: Vec<Value> = stream
        .read(RowShape::Keyed, None)
        .expect("keyed")
        .into_iter()
        .map(|row| Value::Object(row.as_keyed().cloned().expect("keyed row")))
        .collect();
    assert_eq!(
        rows,
        vec![
            json!({"id": "1", "name": "english"}),
            json!({"id": "2", "name": "foo"}),
        ]
    );
}

#[test]
fn without_headers_every_row_is_data() {
    let mut stream = Stream::builder(TABLE).format("csv").open().expect("open");
    assert_eq!(stream.headers(), None);
    assert_eq!(plain(&mut stream).len(), 3);
}

#[test]
fn literal_headers_do_not_consume_a_row() {
    let mut stream = Stream::builder(TABLE)
        .format("csv")
        .headers(names(&["a", "b"]))
        .open()
        .expect("open");
    assert_eq!(stream.headers(), Some(&names(&["a", "b"])[..]));
    let rows = stream.read(RowShape::Keyed, None).expect("keyed");
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0].as_keyed().and_then(|row| row.get("a")),
        Some(&json!("id"))
    );
}

#[test]
fn short_rows_are_padded_with_null_in_keyed_form() {
    let mut stream = Stream::builder("text://id,name\n1\n")
        .format("csv")
        .header_row(1)
        .open()
        .expect("open");
    let rows = stream.read(RowShape::Keyed, None).expect("keyed");
    assert_eq!(
        Value::Object(rows[0].as_keyed().cloned().expect("keyed row")),
        json!({"id": "1", "name": null})
    );
}

#[test]
fn header_row_further_down() {
    let mut stream = Stream::builder("text://exported 2024-01-01\nid;name\n1;english\n")
        .format("csv")
        .option("delimiter", ";")
        .header_row(2)
        .open()
        .expect("open");
    assert_eq!(stream.headers(), Some(&names(&["id", "name"])[..]));
    assert_eq!(plain(&mut stream), vec![vec![json!("1"), json!("english")]]);
}

#[test]
fn headers_survive_a_reset_past_the_sample() {
    let mut stream = Stream::builder("text://h\n1\n2\n3\n4\n")
        .format("csv")
        .header_row(1)
        .sample_size(2)
        .open()
        .expect("open");
    let first = plain(&mut stream);
    assert_eq!(first.len(), 4);
    stream.reset().expect("reset");
    assert_eq!(stream.headers(), Some(&names(&["h"])[..]));
    assert_eq!(plain(&mut stream), first);
}

#[test]
fn header_row_on_empty_content_resolves_nothing() {
    let mut stream = Stream::builder("text://")
        .format("csv")
        .header_row(1)
        .open()
        .expect("open");
    assert_eq!(stream.headers(), None);
    assert!(plain(&mut stream).is_empty());
}

#[test]
fn byte_streams_detect_their_encoding() {
    let mut stream = Stream::builder(b"name\ncaf\xe9\n".to_vec())
        .format("csv")
        .header_row(1)
        .open()
        .expect("open");
    assert_eq!(stream.encoding(), Some("windows-1252"));
    assert_eq!(plain(&mut stream), vec![vec![json!("café")]]);
}

#[test]
fn zero_sample_size_skips_encoding_detection() {
    let mut stream = Stream::builder(b"name\ncaf\xe9\n".to_vec())
        .format("csv")
        .sample_size(0)
        .open()
        .expect("open");
    assert_eq!(stream.encoding(), Some("UTF-8"));
    assert_eq!(stream.headers(), None);
    let err = stream
        .read(RowShape::Plain, None)
        .expect_err("latin-1 bytes are not utf-8");
    assert_eq!(err.kind(), crate::error::ErrorKind::Encoding);

    let mut stream = Stream::builder(b"name\ncaf\xe9\n".to_vec())
        .format("csv")
        .sample_size(0)
        .encoding("latin1")
        .open()
        .expect("open with explicit encoding");
    assert_eq!(plain(&mut stream), vec![vec![json!("name")], vec![json!("café")]]);
}
