//! In-memory output target.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use super::OutputTarget;

/// Collects written bytes in a shared buffer. Clones share the buffer, so a
/// test can hand one clone to the stream and read the other.
#[derive(Debug, Clone)]
pub struct InMemorySink {
    id: String,
    buf: Arc<Mutex<Vec<u8>>>,
}

impl InMemorySink {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            buf: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl OutputTarget for InMemorySink {
    fn id(&self) -> &str {
        &self.id
    }

    fn open_overwrite(&self) -> io::Result<Box<dyn Write + Send>> {
        self.clear();
        self.open_append()
    }

    fn open_append(&self) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(SinkHandle {
            buf: Arc::clone(&self.buf),
        }))
    }
}

struct SinkHandle {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for SinkHandle {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .buf
            .lock()
            .map_err(|_| io::Error::other("in-memory sink lock poisoned"))?;
        guard.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
