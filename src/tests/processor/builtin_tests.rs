//! Tests for the built-in processors.

use serde_json::{Value, json};

use crate::config::SkipRow;
use crate::error::{ErrorKind, SourceError};
use crate::processor::{
    AssignHeaders, ConvertValues, HeaderRow, Processor, RowState, SkipRows, Strict, parse_literal,
};
use crate::row::ExtendedRow;

fn positional(row_number: usize, values: Vec<Value>) -> RowState {
    RowState::new(ExtendedRow::positional(row_number, values))
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn header_row_drops_positional_rows_up_to_the_header() {
    let mut stage = HeaderRow::new(2);
    for (number, skipped) in [(1, true), (2, true), (3, false)] {
        let mut row = positional(number, vec![json!("x")]);
        stage.process(&mut row).expect("process");
        assert_eq!(row.skip, skipped, "row {number}");
    }

    let mut keyed = RowState::new(ExtendedRow::new(1, Some(names(&["a"])), vec![json!(1)]));
    stage.process(&mut keyed).expect("process keyed");
    assert!(!keyed.skip);
}

#[test]
fn assign_headers_sets_stream_headers_on_positional_rows() {
    let mut stage = AssignHeaders::new(Some(names(&["id", "name"])), false);
    let mut row = positional(1, vec![json!(1), json!("a")]);
    stage.process(&mut row).expect("process");
    assert_eq!(row.headers, Some(names(&["id", "name"])));
    assert_eq!(row.values, vec![json!(1), json!("a")]);
}

#[test]
fn assign_headers_remaps_keyed_rows() {
    let mut stage = AssignHeaders::new(Some(names(&["a", "b", "c"])), false);
    let mut row = RowState::new(ExtendedRow::new(
        1,
        Some(names(&["b", "a", "z"])),
        vec![json!(2), json!(1), json!(26)],
    ));
    stage.process(&mut row).expect("process");
    assert_eq!(row.headers, Some(names(&["a", "b", "c"])));
    assert_eq!(row.values, vec![json!(1), json!(2), Value::Null]);
}

#[test]
fn assign_headers_without_headers_leaves_rows_alone() {
    let mut stage = AssignHeaders::new(None, false);
    let mut row = positional(1, vec![json!(1)]);
    stage.process(&mut row).expect("process");
    assert_eq!(row.headers, None);
    assert_eq!(row.values, vec![json!(1)]);
}

#[test]
fn force_strings_renders_every_value() {
    let mut stage = AssignHeaders::new(None, true);
    let mut row = positional(1, vec![json!(1), json!(2.5), json!(true), Value::Null, json!("s")]);
    stage.process(&mut row).expect("process");
    assert_eq!(
        row.values,
        vec![json!("1"), json!("2.5"), json!("true"), json!(""), json!("s")]
    );
}

#[test]
fn skip_rows_by_number_prefix_and_blank() {
    let mut stage = SkipRows::new(vec![
        SkipRow::Number(1),
        SkipRow::Prefix("#".into()),
        SkipRow::blank(),
    ]);
    let cases = [
        (positional(1, vec![json!("header")]), true),
        (positional(2, vec![json!("# comment"), json!("x")]), true),
        (positional(3, vec![json!(""), Value::Null, json!("  ")]), true),
        (positional(4, vec![json!("data #1")]), false),
        (positional(5, vec![json!(5)]), false),
    ];
    for (mut row, skipped) in cases {
        stage.process(&mut row).expect("process");
        assert_eq!(row.skip, skipped, "row {}", row.row_number);
    }
}

#[test]
fn strict_fails_on_a_width_change() {
    let mut stage = Strict::new("t");
    stage
        .process(&mut positional(1, vec![json!(1), json!(2)]))
        .expect("first row");
    let err = stage
        .process(&mut positional(2, vec![json!(1)]))
        .expect_err("narrower row");
    assert_eq!(err.kind(), ErrorKind::Source);
    assert!(matches!(
        err.error.downcast_ref::<SourceError>(),
        Some(SourceError::ShapeMismatch {
            row_number: 2,
            expected: 2,
            found: 1
        })
    ));
}

#[test]
fn strict_ignores_skipped_rows_and_restarts() {
    let mut stage = Strict::new("t");
    let mut skipped = positional(1, vec![json!("only")]);
    skipped.skip = true;
    stage.process(&mut skipped).expect("skipped row");
    stage
        .process(&mut positional(2, vec![json!(1), json!(2)]))
        .expect("first measured row");

    stage.restart();
    stage
        .process(&mut positional(1, vec![json!(1)]))
        .expect("first row after restart");
}

#[test]
fn lenient_skips_instead_of_failing() {
    let mut stage = Strict::lenient("t");
    stage
        .process(&mut positional(1, vec![json!(1), json!(2)]))
        .expect("first row");
    let mut odd = positional(2, vec![json!(1), json!(2), json!(3)]);
    stage.process(&mut odd).expect("lenient");
    assert!(odd.skip);
}

#[test]
fn convert_values_uses_the_given_function() {
    let mut upper = ConvertValues::new(|v: Value| match v {
        Value::String(s) => Value::String(s.to_uppercase()),
        other => other,
    });
    let mut row = positional(1, vec![json!("abc"), json!(1)]);
    upper.process(&mut row).expect("process");
    assert_eq!(row.values, vec![json!("ABC"), json!(1)]);

    let mut literal = ConvertValues::default();
    let mut row = positional(1, vec![json!("12"), json!("x")]);
    literal.process(&mut row).expect("process");
    assert_eq!(row.values, vec![json!(12), json!("x")]);
}

#[test]
fn parse_literal_reads_numbers_booleans_and_null() {
    assert_eq!(parse_literal(json!("42")), json!(42));
    assert_eq!(parse_literal(json!(" -7 ")), json!(-7));
    assert_eq!(parse_literal(json!("2.5")), json!(2.5));
    assert_eq!(parse_literal(json!("1e3")), json!(1000.0));
    assert_eq!(parse_literal(json!("True")), json!(true));
    assert_eq!(parse_literal(json!("false")), json!(false));
    assert_eq!(parse_literal(json!("None")), Value::Null);
}

#[test]
fn parse_literal_keeps_everything_else() {
    for text in ["", "abc", "inf", "NaN", "1.2.3", "12abc", "0x1F"] {
        assert_eq!(parse_literal(json!(text)), json!(text), "{text:?}");
    }
    assert_eq!(parse_literal(json!(3)), json!(3));
    assert_eq!(parse_literal(json!([1])), json!([1]));
}
