//! HTTP transport for manifests and segments.
//!
//! [`HttpClient`] is the seam between the scheduler and the network, so tests
//! can substitute an in-memory client. [`ReqwestClient`] is the real
//! implementation on top of `reqwest::blocking`.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};

use crate::config::DownloadConfig;
use crate::error::FetchError;

/// Chunk size for streaming segment bodies to disk (1 MiB).
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Trait for the HTTP operations a job needs.
///
/// Implementations must be callable from many worker threads at once.
pub trait HttpClient: Send + Sync {
    /// Fetch a text document such as a manifest.
    ///
    /// `referer` is sent as the `Referer` header.
    fn get_text(&self, url: &str, referer: &str) -> Result<String, FetchError>;

    /// Stream `url` into `dest`, truncating any existing file.
    ///
    /// Returns the number of bytes written.
    fn download(&self, url: &str, referer: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Real HTTP client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
    manifest_timeout: Duration,
    segment_timeout: Duration,
}

impl ReqwestClient {
    /// Create a client with the timeouts and user agent from `config`.
    pub fn new(config: &DownloadConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let user_agent =
            HeaderValue::from_str(&config.user_agent).map_err(|e| FetchError::Transport {
                url: String::new(),
                reason: format!("invalid user agent: {}", e),
            })?;
        headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            manifest_timeout: config.manifest_timeout,
            segment_timeout: config.segment_timeout,
        })
    }

    fn send(
        &self,
        url: &str,
        referer: &str,
        timeout: Duration,
    ) -> Result<Response, FetchError> {
        let request = self.client.get(url).timeout(timeout);
        let request = match HeaderValue::from_str(referer) {
            Ok(value) => request.header(REFERER, value),
            Err(_) => request,
        };

        let response = request
            .send()
            .map_err(|e| map_reqwest_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

impl HttpClient for ReqwestClient {
    fn get_text(&self, url: &str, referer: &str) -> Result<String, FetchError> {
        self.send(url, referer, self.manifest_timeout)?
            .text()
            .map_err(|e| map_reqwest_error(url, self.manifest_timeout, e))
    }

    fn download(&self, url: &str, referer: &str, dest: &Path) -> Result<u64, FetchError> {
        let mut response = self.send(url, referer, self.segment_timeout)?;

        let io_err = |source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let file = File::create(dest).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| FetchError::Transport {
                    url: url.to_string(),
                    reason: format!("read error: {}", e),
                })?;

            if bytes_read == 0 {
                break;
            }

            writer.write_all(&buffer[..bytes_read]).map_err(io_err)?;
            written += bytes_read as u64;
        }

        writer.flush().map_err(io_err)?;
        Ok(written)
    }
}

fn map_reqwest_error(url: &str, timeout: Duration, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
