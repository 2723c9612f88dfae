//! Tests for the processor chain as seen through a stream.

use serde_json::{Value, json};

use super::{numbers, plain};
use crate::config::SkipRow;
use crate::error::{ErrorKind, SourceError, TabularError};
use crate::processor::{Processor, RowState};
use crate::row::RowShape;
use crate::stream::{ShapeCheck, Stream};

/// Ends the sequence after `max` emitted rows.
struct Limit {
    max: usize,
    seen: usize,
}

impl Processor for Limit {
    fn name(&self) -> &str {
        "limit"
    }

    fn restart(&mut self) {
        self.seen = 0;
    }

    fn process(&mut self, row: &mut RowState) -> Result<(), TabularError> {
        if row.skip {
            return Ok(());
        }
        if self.seen == self.max {
            row.stop = true;
        }
        self.seen += 1;
        Ok(())
    }
}

fn records() -> Vec<Value> {
    vec![
        json!(["# generated"]),
        json!(["id", "name"]),
        json!(["1", "english"]),
        json!(["", null]),
        json!(["2", "foo"]),
    ]
}

#[test]
fn skipped_rows_do_not_use_up_row_numbers() {
    let mut stream = Stream::builder(records())
        .skip_rows([SkipRow::Prefix("#".into()), SkipRow::blank()])
        .open()
        .expect("open");
    assert_eq!(
        plain(&mut stream),
        vec![
            vec![json!("id"), json!("name")],
            vec![json!("1"), json!("english")],
            vec![json!("2"), json!("foo")],
        ]
    );
    assert_eq!(numbers(&mut stream), vec![1, 2, 3]);
}

#[test]
fn header_row_after_a_preamble() {
    let mut stream = Stream::builder(records())
        .header_row(2)
        .skip_row(SkipRow::blank())
        .open()
        .expect("open");
    assert_eq!(
        stream.headers(),
        Some(&["id".to_string(), "name".to_string()][..])
    );
    let keyed = stream.read(RowShape::Keyed, None).expect("keyed");
    assert_eq!(keyed.len(), 2);
    assert_eq!(
        keyed[1].as_keyed().and_then(|row| row.get("name")),
        Some(&json!("foo"))
    );
}

#[test]
fn stop_ends_the_sequence_without_emitting_the_row() {
    let mut stream = Stream::builder(records())
        .processor(|row: &mut RowState| -> Result<(), TabularError> {
            if row.values.first() == Some(&json!("1")) {
                row.stop = true;
            }
            Ok(())
        })
        .open()
        .expect("open");
    assert_eq!(plain(&mut stream).len(), 2);
}

#[test]
fn user_processors_restart_on_every_pass() {
    let mut stream = Stream::builder(records())
        .sample_size(2)
        .processor(Limit { max: 3, seen: 0 })
        .open()
        .expect("open");
    assert_eq!(plain(&mut stream).len(), 3);
    stream.reset().expect("reset");
    assert_eq!(plain(&mut stream).len(), 3);
    assert_eq!(stream.sample().expect("sample").len(), 2);
}

#[test]
fn user_processors_see_stream_headers() {
    let mut stream = Stream::builder(records())
        .header_row(2)
        .processor(|row: &mut RowState| -> Result<(), TabularError> {
            let headers = row.headers.clone().unwrap_or_default();
            row.values.push(Value::String(headers.join("|")));
            Ok(())
        })
        .open()
        .expect("open");
    let rows = plain(&mut stream);
    assert_eq!(rows[0][2], json!("id|name"));
}

#[test]
fn processor_errors_end_the_iteration() {
    let mut stream = Stream::builder(records())
        .processor(|row: &mut RowState| -> Result<(), TabularError> {
            if row.row_number == 3 {
                return Err(TabularError::source(
                    "<native>",
                    SourceError::Other("rejected".into()),
                ));
            }
            Ok(())
        })
        .open()
        .expect("open");
    let results: Vec<_> = stream.iter(RowShape::Plain).expect("iter").collect();
    assert_eq!(results.len(), 3);
    assert!(results[2].is_err());
}

#[test]
fn force_strings_and_convert_values() {
    let mut stream = Stream::builder(vec![json!([1, null, true, "x"])])
        .force_strings(true)
        .open()
        .expect("open");
    assert_eq!(
        plain(&mut stream),
        vec![vec![json!("1"), json!(""), json!("true"), json!("x")]]
    );

    let mut stream = Stream::builder(vec![json!(["1", "2.5", "True", "x", ""])])
        .convert_values(true)
        .open()
        .expect("open");
    assert_eq!(
        plain(&mut stream),
        vec![vec![json!(1), json!(2.5), json!(true), json!("x"), json!("")]]
    );
}

#[test]
fn strict_fails_at_the_mismatching_row() {
    let mut stream = Stream::builder(vec![json!([1, 2]), json!([3, 4]), json!([5])])
        .strict()
        .open()
        .expect("open");
    let results: Vec<_> = stream.iter(RowShape::Plain).expect("iter").collect();
    assert_eq!(results.len(), 3);
    let err = results[2].as_ref().expect_err("mismatch");
    assert_eq!(err.kind(), ErrorKind::Source);
    assert!(matches!(
        err.error.downcast_ref::<SourceError>(),
        Some(SourceError::ShapeMismatch { row_number: 3, .. })
    ));
}

#[test]
fn lenient_drops_mismatching_rows() {
    let mut stream = Stream::builder(vec![json!([1, 2]), json!([5]), json!([3, 4])])
        .shape_check(ShapeCheck::Lenient)
        .open()
        .expect("open");
    assert_eq!(
        plain(&mut stream),
        vec![vec![json!(1), json!(2)], vec![json!(3), json!(4)]]
    );
}

#[test]
fn strict_accepts_keyed_rows_once_headers_are_assigned() {
    let mut stream = Stream::builder(vec![json!({"a": 1, "b": 2}), json!({"a": 3})])
        .strict()
        .open()
        .expect("open");
    assert_eq!(
        plain(&mut stream),
        vec![vec![json!(1), json!(2)], vec![json!(3), Value::Null]]
    );
}
