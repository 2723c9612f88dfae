//! Tests for the two-tier reset.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::{numbers, plain};
use crate::error::ErrorKind;
use crate::row::RowShape;
use crate::source::{NativeSource, Source};
use crate::stream::Stream;

fn counted_factory(rows: usize) -> (NativeSource, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let source = NativeSource::factory(move || {
        let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
        (1..=rows).map(move |i| json!([i, call]))
    });
    (source, calls)
}

#[test]
fn read_reset_read_is_idempotent() {
    let (source, _) = counted_factory(7);
    let mut stream = Stream::builder(source).sample_size(3).open().expect("open");
    let first = stream.read(RowShape::Extended, None).expect("first read");
    stream.reset().expect("reset");
    let second = stream.read(RowShape::Extended, None).expect("second read");
    assert_eq!(first.len(), 7);
    assert_eq!(
        first.iter().map(|r| r.as_extended().map(|r| r.row_number)).collect::<Vec<_>>(),
        second.iter().map(|r| r.as_extended().map(|r| r.row_number)).collect::<Vec<_>>()
    );
}

#[test]
fn repeated_resets_keep_numbering_from_one() {
    let mut stream = Stream::builder(vec![json!([1]), json!([2]), json!([3])])
        .sample_size(1)
        .open()
        .expect("open");
    for _ in 0..3 {
        assert_eq!(numbers(&mut stream), vec![1, 2, 3]);
        stream.reset().expect("reset");
        stream.reset().expect("second reset in a row");
    }
}

#[test]
fn reset_within_the_sample_does_not_touch_the_parser() {
    let (source, calls) = counted_factory(3);
    let mut stream = Stream::builder(source).sample_size(10).open().expect("open");
    assert_eq!(plain(&mut stream).len(), 3);
    stream.reset().expect("reset");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (source, calls) = counted_factory(5);
    let mut stream = Stream::builder(source).sample_size(2).open().expect("open");
    let mut rows = stream.iter(RowShape::Plain).expect("iter");
    rows.next().expect("first row").expect("row");
    rows.next().expect("second row").expect("row");
    drop(rows);
    stream.reset().expect("reset");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn reset_past_the_sample_reinvokes_the_factory() {
    let (source, calls) = counted_factory(5);
    let mut stream = Stream::builder(source).sample_size(2).open().expect("open");
    assert_eq!(plain(&mut stream).len(), 5);
    stream.reset().expect("reset");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn factory_output_after_reset_is_whatever_it_yields() {
    let (source, _) = counted_factory(3);
    let mut stream = Stream::builder(source).sample_size(1).open().expect("open");
    assert_eq!(plain(&mut stream)[2], vec![json!(3), json!(1)]);
    stream.reset().expect("reset");
    assert_eq!(plain(&mut stream)[0], vec![json!(1), json!(2)]);
}

fn one_shot(text: &str) -> Source {
    Source::reader(Cursor::new(text.as_bytes().to_vec()))
}

#[test]
fn consumed_forward_stream_cannot_reset() {
    let mut stream = Stream::builder(one_shot("[1]\n[2]\n[3]\n"))
        .format("ndjson")
        .encoding("utf-8")
        .sample_size(1)
        .open()
        .expect("open");
    assert_eq!(plain(&mut stream).len(), 3);

    let err = stream.reset().expect_err("consumed stream");
    assert_eq!(err.kind(), ErrorKind::NotSeekable);
    assert_eq!(err.target, "<stream>");
}

#[test]
fn consumed_forward_stream_cannot_reset_with_detected_encoding() {
    let mut stream = Stream::builder(one_shot("[1]\n[2]\n[3]\n"))
        .format("ndjson")
        .sample_size(1)
        .open()
        .expect("open");
    assert_eq!(stream.encoding(), Some("UTF-8"));
    assert_eq!(plain(&mut stream).len(), 3);

    let err = stream.reset().expect_err("consumed stream");
    assert_eq!(err.kind(), ErrorKind::NotSeekable);
}

#[test]
fn forward_stream_is_fine_without_reset() {
    let mut stream = Stream::builder(one_shot("[1]\n[2]\n[3]\n"))
        .format("ndjson")
        .encoding("utf-8")
        .sample_size(1)
        .open()
        .expect("open");
    assert_eq!(plain(&mut stream).len(), 3);
    stream.close();
    assert!(stream.closed());
}

#[test]
fn forward_stream_resets_within_the_sample() {
    let mut stream = Stream::builder(one_shot("[1]\n[2]\n"))
        .format("ndjson")
        .encoding("utf-8")
        .open()
        .expect("open");
    assert_eq!(plain(&mut stream).len(), 2);
    stream.reset().expect("reset replays the sample");
    assert_eq!(plain(&mut stream).len(), 2);
}

#[test]
fn reopening_a_consumed_reader_fails() {
    let mut stream = Stream::builder(one_shot("[1]\n"))
        .format("ndjson")
        .open()
        .expect("open");
    let err = stream.open().expect_err("reader already handed out");
    assert_eq!(err.kind(), ErrorKind::Source);
}

#[test]
fn in_memory_bytes_reopen_and_reset() {
    let mut stream = Stream::builder(b"[1]\n[2]\n[3]\n".to_vec())
        .format("ndjson")
        .sample_size(1)
        .open()
        .expect("open");
    assert_eq!(plain(&mut stream).len(), 3);
    stream.reset().expect("seekable bytes rewind");
    assert_eq!(plain(&mut stream).len(), 3);
    stream.open().expect("reopen");
    assert_eq!(plain(&mut stream).len(), 3);
}
