//! Remote loader for http(s) and ftp(s) locations.

use std::time::Duration;

use serde::Deserialize;

use super::{ByteStream, Loader};
use crate::encoding::Detection;
use crate::error::{ErrorKind, SourceError, TabularError};
use crate::source::Source;

/// Default per-request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT: u64 = 30;

/// Options claimed by the remote loader.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteOptions {
    /// Per-request timeout in seconds
    pub http_timeout: u64,
    /// Stream the body instead of buffering it. Streamed bodies cannot be
    /// rewound once read past the detection sample.
    pub http_stream: bool,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            http_stream: true,
        }
    }
}

/// Loader fetching sources over the network with `ureq`.
#[derive(Debug, Clone, Default)]
pub struct RemoteLoader {
    detection: Detection,
    options: RemoteOptions,
}

impl RemoteLoader {
    pub fn new(detection: Detection, options: RemoteOptions) -> Self {
        Self { detection, options }
    }

    fn agent(&self) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.options.http_timeout))
            .user_agent(concat!("tabstream/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

impl Loader for RemoteLoader {
    fn open_bytes(&mut self, source: &mut Source) -> Result<ByteStream, TabularError> {
        let Source::Path(url) = source else {
            return Err(TabularError::source(
                source.id(),
                SourceError::Other("remote schemes expect a URL".into()),
            ));
        };

        let lowered = url.to_ascii_lowercase();
        if lowered.starts_with("ftp://") || lowered.starts_with("ftps://") {
            return Err(TabularError::io(
                url.as_str(),
                std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "no ftp transport is compiled in",
                ),
            ));
        }

        let response = match self.agent().get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(TabularError::new(
                    ErrorKind::Http,
                    url.as_str(),
                    format!("server answered {} {}", code, response.status_text()),
                ));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(TabularError::new(
                    ErrorKind::Http,
                    url.as_str(),
                    transport.to_string(),
                ));
            }
        };
        tracing::debug!(
            url = %url,
            status = response.status(),
            stream = self.options.http_stream,
            "fetched remote source"
        );

        let stream = ByteStream::forward(url.clone(), Box::new(response.into_reader()));
        if self.options.http_stream {
            Ok(stream)
        } else {
            stream
                .buffer()
                .map_err(|e| TabularError::new(ErrorKind::Http, url.as_str(), e))
        }
    }

    fn detection(&self) -> &Detection {
        &self.detection
    }
}
