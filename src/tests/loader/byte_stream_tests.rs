//! Tests for seekable and forward-only byte streams.

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::error::ErrorKind;
use crate::loader::ByteStream;

fn forward(bytes: &[u8]) -> ByteStream {
    ByteStream::forward("fwd", Box::new(Cursor::new(bytes.to_vec())))
}

fn read_all(stream: &mut ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    stream.read_to_end(&mut out).expect("read stream");
    out
}

#[test]
fn seekable_streams_peek_and_rewind_freely() {
    let mut stream = ByteStream::from_bytes("mem", b"abcdef".to_vec());
    assert!(stream.is_seekable());
    assert_eq!(stream.peek(3).expect("peek"), b"abc");
    assert_eq!(read_all(&mut stream), b"abcdef");
    stream.rewind().expect("rewind");
    assert_eq!(read_all(&mut stream), b"abcdef");

    stream.seek(SeekFrom::Start(4)).expect("seek");
    assert_eq!(read_all(&mut stream), b"ef");
}

#[test]
fn forward_stream_replays_its_peeked_head() {
    let mut stream = forward(b"abcdef");
    assert!(!stream.is_seekable());
    assert_eq!(stream.peek(3).expect("peek"), b"abc");
    assert_eq!(stream.peek(2).expect("peek again"), b"ab");
    assert_eq!(read_all(&mut stream), b"abcdef");
}

#[test]
fn forward_stream_rewinds_while_within_the_head() {
    let mut stream = forward(b"abc");
    assert_eq!(stream.peek(16).expect("peek"), b"abc");
    let mut two = [0u8; 2];
    stream.read_exact(&mut two).expect("read head");
    stream.rewind().expect("rewind within head");
    assert_eq!(read_all(&mut stream), b"abc");
}

#[test]
fn reaching_the_end_consumes_a_fully_peeked_stream() {
    let mut stream = forward(b"abc");
    assert_eq!(stream.peek(16).expect("peek"), b"abc");
    assert_eq!(read_all(&mut stream), b"abc");

    let err = stream.rewind().expect_err("exhausted stream");
    assert_eq!(err.kind(), ErrorKind::NotSeekable);
}

#[test]
fn forward_stream_cannot_rewind_past_the_head() {
    let mut stream = forward(b"abcdef");
    stream.peek(2).expect("peek");
    assert_eq!(read_all(&mut stream), b"abcdef");

    let err = stream.rewind().expect_err("consumed stream");
    assert_eq!(err.kind(), ErrorKind::NotSeekable);
    assert_eq!(err.target, "fwd");

    let err = stream.peek(1).expect_err("peek after streaming");
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
}

#[test]
fn forward_stream_refuses_to_seek() {
    let mut stream = forward(b"abc");
    let err = stream.seek(SeekFrom::Start(0)).expect_err("forward seek");
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
}

#[test]
fn buffering_keeps_the_position() {
    let mut stream = forward(b"abcdef");
    stream.peek(2).expect("peek");
    let mut two = [0u8; 2];
    stream.read_exact(&mut two).expect("read head");

    let mut buffered = stream.buffer().expect("buffer");
    assert!(buffered.is_seekable());
    assert_eq!(read_all(&mut buffered), b"cdef");
    buffered.rewind().expect("rewind");
    assert_eq!(read_all(&mut buffered), b"abcdef");
}

#[test]
fn into_reader_resumes_after_the_head() {
    let mut stream = forward(b"abcdef");
    stream.peek(4).expect("peek");
    let mut one = [0u8; 1];
    stream.read_exact(&mut one).expect("read");

    let mut rest = String::new();
    stream
        .into_reader()
        .read_to_string(&mut rest)
        .expect("read rest");
    assert_eq!(rest, "bcdef");
}
