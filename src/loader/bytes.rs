//! Byte streams handed from loaders to parsers.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::TabularError;
use crate::source::ReadSeek;

enum Inner {
    Seekable(Box<dyn ReadSeek + Send>),
    Forward {
        reader: Box<dyn Read + Send>,
        /// Bytes peeked from the head of the stream, replayed before `reader`
        head: Vec<u8>,
        pos: usize,
        /// Set once a byte past `head` has been handed out, or the end of
        /// the stream has been reached by a read
        streamed: bool,
    },
}

/// An open byte stream that is either seekable or forward-only.
///
/// Forward-only streams remember the bytes peeked from their head, so they can
/// be rewound as long as nothing beyond that head has been read and no read
/// has reached the end of the stream.
pub struct ByteStream {
    id: String,
    inner: Inner,
}

impl ByteStream {
    pub fn seekable(id: impl Into<String>, reader: Box<dyn ReadSeek + Send>) -> Self {
        Self {
            id: id.into(),
            inner: Inner::Seekable(reader),
        }
    }

    pub fn forward(id: impl Into<String>, reader: Box<dyn Read + Send>) -> Self {
        Self {
            id: id.into(),
            inner: Inner::Forward {
                reader,
                head: Vec::new(),
                pos: 0,
                streamed: false,
            },
        }
    }

    pub fn from_bytes(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::seekable(id, Box::new(io::Cursor::new(bytes)))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_seekable(&self) -> bool {
        matches!(self.inner, Inner::Seekable(_))
    }

    /// Read up to `limit` bytes from the current position without moving it.
    pub fn peek(&mut self, limit: usize) -> io::Result<Vec<u8>> {
        match &mut self.inner {
            Inner::Seekable(reader) => {
                let start = reader.stream_position()?;
                let mut sample = Vec::with_capacity(limit.min(64 * 1024));
                reader.by_ref().take(limit as u64).read_to_end(&mut sample)?;
                reader.seek(SeekFrom::Start(start))?;
                Ok(sample)
            }
            Inner::Forward {
                reader,
                head,
                pos,
                streamed,
            } => {
                if *streamed {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        "cannot peek a forward-only stream after it was read",
                    ));
                }
                let wanted = *pos + limit;
                if head.len() < wanted {
                    let missing = (wanted - head.len()) as u64;
                    reader.by_ref().take(missing).read_to_end(head)?;
                }
                let end = wanted.min(head.len());
                Ok(head[*pos..end].to_vec())
            }
        }
    }

    /// Reposition at offset zero.
    pub fn rewind(&mut self) -> Result<(), TabularError> {
        match &mut self.inner {
            Inner::Seekable(reader) => reader
                .seek(SeekFrom::Start(0))
                .map(|_| ())
                .map_err(|e| TabularError::io(&self.id, e)),
            Inner::Forward { pos, streamed, .. } => {
                if *streamed {
                    return Err(TabularError::not_seekable(&self.id));
                }
                *pos = 0;
                Ok(())
            }
        }
    }

    /// Read everything into memory, turning the stream seekable.
    pub fn buffer(self) -> io::Result<ByteStream> {
        match self.inner {
            Inner::Seekable(_) => Ok(self),
            Inner::Forward {
                mut reader,
                mut head,
                pos,
                ..
            } => {
                reader.read_to_end(&mut head)?;
                let mut cursor = io::Cursor::new(head);
                cursor.set_position(pos as u64);
                Ok(ByteStream::seekable(self.id, Box::new(cursor)))
            }
        }
    }

    /// Give up the underlying reader, positioned where this stream is.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self.inner {
            Inner::Seekable(reader) => Box::new(reader),
            Inner::Forward {
                reader, head, pos, ..
            } => {
                let head = io::Cursor::new(head[pos..].to_vec());
                Box::new(head.chain(reader))
            }
        }
    }
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Seekable(reader) => reader.read(buf),
            Inner::Forward {
                reader,
                head,
                pos,
                streamed,
            } => {
                if *pos < head.len() {
                    let n = buf.len().min(head.len() - *pos);
                    buf[..n].copy_from_slice(&head[*pos..*pos + n]);
                    *pos += n;
                    return Ok(n);
                }
                let n = reader.read(buf)?;
                if !buf.is_empty() {
                    *streamed = true;
                }
                Ok(n)
            }
        }
    }
}

impl Seek for ByteStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.inner {
            Inner::Seekable(reader) => reader.seek(pos),
            Inner::Forward { .. } => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "forward-only stream cannot seek",
            )),
        }
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("id", &self.id)
            .field("seekable", &self.is_seekable())
            .finish()
    }
}
