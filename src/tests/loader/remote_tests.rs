//! Tests for the http loader against a local one-shot server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use serde_json::json;

use crate::encoding::Detection;
use crate::error::ErrorKind;
use crate::loader::{Loader, RemoteLoader, RemoteOptions};
use crate::row::RowShape;
use crate::source::Source;
use crate::stream::Stream;

/// Answer `responses.len()` requests in order, one per connection.
fn serve(responses: Vec<(&'static str, &'static str)>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        for (status, body) in responses {
            let (socket, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(socket.try_clone().expect("clone socket"));
            let mut line = String::new();
            while reader.read_line(&mut line).expect("read request") > 2 {
                line.clear();
            }
            let mut socket = socket;
            write!(
                socket,
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .expect("write response");
        }
    });
    (format!("http://{addr}"), handle)
}

fn loader(http_stream: bool) -> RemoteLoader {
    RemoteLoader::new(
        Detection::default(),
        RemoteOptions {
            http_timeout: 5,
            http_stream,
        },
    )
}

#[test]
fn error_statuses_are_http_errors() {
    let (base, server) = serve(vec![("404 Not Found", "gone")]);
    let url = format!("{base}/missing.csv");
    let err = loader(true)
        .open_bytes(&mut Source::from(url.clone()))
        .expect_err("404");
    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(err.target, url);
    assert!(err.to_string().contains("404"), "{err}");
    server.join().expect("server");
}

#[test]
fn refused_connections_are_http_errors() {
    let addr = TcpListener::bind("127.0.0.1:0")
        .expect("bind")
        .local_addr()
        .expect("local addr");
    // The listener is gone, nothing answers on the port.
    let err = loader(true)
        .open_bytes(&mut Source::from(format!("http://{addr}/data.csv")))
        .expect_err("refused");
    assert_eq!(err.kind(), ErrorKind::Http);
}

#[test]
fn buffered_bodies_are_seekable() {
    let (base, server) = serve(vec![("200 OK", "a,b\n1,2\n"), ("200 OK", "a,b\n1,2\n")]);

    let mut stream = loader(false)
        .open_bytes(&mut Source::from(format!("{base}/data.csv")))
        .expect("buffered");
    assert!(stream.is_seekable());
    let mut body = String::new();
    stream.read_to_string(&mut body).expect("read body");
    stream.rewind().expect("rewind");
    body.clear();
    stream.read_to_string(&mut body).expect("read again");
    assert_eq!(body, "a,b\n1,2\n");

    let streamed = loader(true)
        .open_bytes(&mut Source::from(format!("{base}/data.csv")))
        .expect("streamed");
    assert!(!streamed.is_seekable());
    server.join().expect("server");
}

#[test]
fn ftp_has_no_transport() {
    let err = loader(true)
        .open_bytes(&mut Source::from("ftp://example.com/data.csv"))
        .expect_err("ftp");
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn streams_read_over_http() {
    let body = "[1]\n[2]\n[3]\n";
    let (base, server) = serve(vec![("200 OK", body), ("200 OK", body)]);

    let mut streamed = Stream::builder(format!("{base}/rows.ndjson"))
        .format("ndjson")
        .sample_size(1)
        .open()
        .expect("open streamed");
    assert_eq!(streamed.read(RowShape::Plain, None).expect("rows").len(), 3);
    let err = streamed.reset().expect_err("streamed body");
    assert_eq!(err.kind(), ErrorKind::NotSeekable);

    let mut buffered = Stream::builder(format!("{base}/rows.ndjson"))
        .format("ndjson")
        .sample_size(1)
        .option("http_stream", false)
        .open()
        .expect("open buffered");
    let first: Vec<_> = buffered
        .read(RowShape::Plain, None)
        .expect("rows")
        .into_iter()
        .map(|row| row.into_values())
        .collect();
    buffered.reset().expect("reset buffered");
    assert_eq!(buffered.read(RowShape::Plain, None).expect("rows again").len(), 3);
    assert_eq!(first, vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]]);
    server.join().expect("server");
}
