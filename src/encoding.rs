//! Character encoding detection and streaming transcoding to UTF-8.

use std::io::{self, Read};

use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};

use crate::error::{ErrorKind, TabularError};
use crate::loader::ByteStream;

/// Encoding used when nothing better is known.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Bytes fed to the detector.
pub const DEFAULT_BYTES_SAMPLE_SIZE: usize = 10_000;

/// Guesses below this confidence fall back to the default encoding.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// A detector's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Guess {
    /// Encoding label; `ascii` is reported as such and promoted later
    pub label: String,
    pub confidence: f32,
}

/// Statistical encoding detection over a leading byte sample.
pub trait EncodingDetector: Send + Sync {
    fn detect(&self, sample: &[u8]) -> Option<Guess>;
}

/// Detector used unless the caller plugs in another one.
///
/// Order of evidence: byte order mark, plain ASCII, valid UTF-8, and finally
/// a printable-character score under windows-1252.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleDetector;

impl EncodingDetector for SampleDetector {
    fn detect(&self, sample: &[u8]) -> Option<Guess> {
        if sample.is_empty() {
            return None;
        }
        if let Some((encoding, _)) = Encoding::for_bom(sample) {
            return Some(Guess {
                label: encoding.name().to_ascii_lowercase(),
                confidence: 1.0,
            });
        }
        if sample.is_ascii() {
            return Some(Guess {
                label: "ascii".into(),
                confidence: 1.0,
            });
        }
        match std::str::from_utf8(sample) {
            Ok(_) => {
                return Some(Guess {
                    label: "utf-8".into(),
                    confidence: 0.99,
                });
            }
            // A multi-byte sequence cut by the sample boundary
            Err(e) if e.error_len().is_none() => {
                return Some(Guess {
                    label: "utf-8".into(),
                    confidence: 0.99,
                });
            }
            Err(_) => {}
        }

        let (text, _, _) = encoding_rs::WINDOWS_1252.decode(sample);
        let total = text.chars().count().max(1);
        let printable = text
            .chars()
            .filter(|c| !c.is_control() || c.is_whitespace())
            .count();
        Some(Guess {
            label: "windows-1252".into(),
            confidence: printable as f32 / total as f32 * 0.9,
        })
    }
}

/// Encoding detection settings carried by loaders.
#[derive(Clone)]
pub struct Detection {
    pub sample_size: usize,
    pub confidence: f32,
    pub default: &'static Encoding,
    pub detector: std::sync::Arc<dyn EncodingDetector>,
}

impl Default for Detection {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_BYTES_SAMPLE_SIZE,
            confidence: DEFAULT_CONFIDENCE,
            default: UTF_8,
            detector: std::sync::Arc::new(SampleDetector),
        }
    }
}

impl std::fmt::Debug for Detection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detection")
            .field("sample_size", &self.sample_size)
            .field("confidence", &self.confidence)
            .field("default", &self.default.name())
            .finish()
    }
}

impl Detection {
    /// Turn a guess into an encoding, applying the threshold and the ASCII
    /// promotion.
    pub fn accept(&self, guess: Option<Guess>) -> &'static Encoding {
        let Some(guess) = guess else {
            return self.default;
        };
        if guess.confidence < self.confidence {
            tracing::warn!(
                label = %guess.label,
                confidence = guess.confidence,
                fallback = self.default.name(),
                "encoding guess below threshold"
            );
            return self.default;
        }
        if guess.label == "ascii" {
            return self.default;
        }
        Encoding::for_label(guess.label.as_bytes()).unwrap_or(self.default)
    }

    /// Detection that never samples and always answers the default.
    pub fn disabled(mut self) -> Self {
        self.sample_size = 0;
        self
    }

    /// Detect the encoding of a stream from its leading bytes. The stream
    /// position is left untouched. A zero sample size answers the default
    /// without reading.
    pub fn detect(&self, stream: &mut ByteStream) -> Result<&'static Encoding, TabularError> {
        if self.sample_size == 0 {
            tracing::debug!(
                source = %stream.id(),
                encoding = self.default.name(),
                "encoding detection disabled"
            );
            return Ok(self.default);
        }
        let sample = stream
            .peek(self.sample_size)
            .map_err(|e| TabularError::io(stream.id(), e))?;
        let encoding = self.accept(self.detector.detect(&sample));
        tracing::debug!(
            source = %stream.id(),
            sampled = sample.len(),
            encoding = encoding.name(),
            "detected encoding"
        );
        Ok(encoding)
    }
}

/// Look up an encoding by label.
pub fn lookup(label: &str, target: &str) -> Result<&'static Encoding, TabularError> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
        TabularError::new(
            ErrorKind::Encoding,
            target,
            format!("unknown encoding \"{label}\""),
        )
    })
}

const IN_BUF: usize = 8 * 1024;
const OUT_BUF: usize = 16 * 1024;

/// A UTF-8 view over a byte stream in any supported encoding.
///
/// Malformed input surfaces as an `InvalidData` I/O error rather than
/// replacement characters.
pub struct TextStream {
    inner: ByteStream,
    encoding: &'static Encoding,
    decoder: Decoder,
    in_buf: Box<[u8]>,
    in_start: usize,
    in_end: usize,
    out_buf: Box<[u8]>,
    out_start: usize,
    out_end: usize,
    eof: bool,
    finished: bool,
}

impl TextStream {
    pub fn new(inner: ByteStream, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            decoder: encoding.new_decoder_with_bom_removal(),
            in_buf: vec![0; IN_BUF].into_boxed_slice(),
            in_start: 0,
            in_end: 0,
            out_buf: vec![0; OUT_BUF].into_boxed_slice(),
            out_start: 0,
            out_end: 0,
            eof: false,
            finished: false,
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }

    /// Decode up to `limit` leading bytes without consuming them. Only
    /// meaningful before the first read.
    pub fn peek_text(&mut self, limit: usize) -> io::Result<String> {
        let bytes = self.inner.peek(limit)?;
        let (text, _) = self.encoding.decode_with_bom_removal(&bytes);
        Ok(text.into_owned())
    }

    /// Rewind the byte stream and restart decoding from scratch.
    pub fn rewind(&mut self) -> Result<(), TabularError> {
        self.inner.rewind()?;
        self.decoder = self.encoding.new_decoder_with_bom_removal();
        self.in_start = 0;
        self.in_end = 0;
        self.out_start = 0;
        self.out_end = 0;
        self.eof = false;
        self.finished = false;
        Ok(())
    }

    pub fn into_inner(self) -> ByteStream {
        self.inner
    }
}

impl std::fmt::Debug for TextStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStream")
            .field("id", &self.inner.id())
            .field("encoding", &self.encoding.name())
            .field("eof", &self.eof)
            .finish()
    }
}

impl Read for TextStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.out_start < self.out_end {
                let n = buf.len().min(self.out_end - self.out_start);
                buf[..n].copy_from_slice(&self.out_buf[self.out_start..self.out_start + n]);
                self.out_start += n;
                return Ok(n);
            }
            if self.finished || buf.is_empty() {
                return Ok(0);
            }
            if self.in_start == self.in_end && !self.eof {
                let n = self.inner.read(&mut self.in_buf)?;
                self.in_start = 0;
                self.in_end = n;
                self.eof = n == 0;
            }

            let (result, read, written) = self.decoder.decode_to_utf8_without_replacement(
                &self.in_buf[self.in_start..self.in_end],
                &mut self.out_buf,
                self.eof,
            );
            self.in_start += read;
            self.out_start = 0;
            self.out_end = written;

            match result {
                DecoderResult::InputEmpty => {
                    if self.eof {
                        self.finished = true;
                    }
                }
                DecoderResult::OutputFull => {}
                DecoderResult::Malformed(_, _) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("byte sequence is not valid {}", self.encoding.name()),
                    ));
                }
            }
        }
    }
}

/// Map an I/O error raised while reading decoded text to its error kind.
pub fn classify_read_error(target: &str, e: io::Error) -> TabularError {
    if e.kind() == io::ErrorKind::InvalidData {
        TabularError::new(ErrorKind::Encoding, target, e)
    } else {
        TabularError::io(target, e)
    }
}
