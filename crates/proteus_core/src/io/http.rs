//! HTTP range-request byte source.
//!
//! Every `read` turns into a single ranged `GET`. The object size is learned
//! from the first `Content-Range` header seen; request and byte budgets bound
//! the total effort a parse may spend on the wire.

use std::time::Duration;

use log::debug;

use super::ByteSource;
use crate::error::{Error, Result};

pub const DEFAULT_MAX_REQUESTS: u32 = 10;
pub const DEFAULT_MAX_BYTES: u64 = 4 * 1024 * 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-parse resource budget and request decoration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Maximum ranged GETs issued for one parse.
    pub max_requests: u32,
    /// Maximum bytes delivered to callers for one parse.
    pub max_bytes: u64,
    /// Extra request headers, sent verbatim with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            max_bytes: DEFAULT_MAX_BYTES,
            headers: Vec::new(),
        }
    }
}

/// What came back from one ranged request, reduced to the parts the source
/// classifies on.
#[derive(Debug, Clone)]
pub struct RangeResponse {
    pub status: u16,
    pub content_range: Option<String>,
    pub body: Vec<u8>,
}

/// The wire seam. Production uses [`ReqwestTransport`]; tests substitute a
/// scripted implementation.
pub trait RangeTransport: Send {
    /// Issue `GET url` with `Range: bytes=start-end` (inclusive) plus the
    /// given headers. Redirects are followed by the transport.
    fn get_range(
        &mut self,
        url: &str,
        start: u64,
        end: u64,
        headers: &[(String, String)],
    ) -> Result<RangeResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::InvalidInput(format!("HTTP client construction failed: {e}")))?;
        Ok(Self { client })
    }
}

impl RangeTransport for ReqwestTransport {
    fn get_range(
        &mut self,
        url: &str,
        start: u64,
        end: u64,
        headers: &[(String, String)],
    ) -> Result<RangeResponse> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::RANGE, format!("bytes={start}-{end}"));
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .map_err(|e| Error::InvalidInput(format!("request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let content_range = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .map_err(|e| Error::InvalidInput(format!("response body from {url} failed: {e}")))?
            .to_vec();

        Ok(RangeResponse {
            status,
            content_range,
            body,
        })
    }
}

pub struct HttpSource {
    url: String,
    transport: Box<dyn RangeTransport>,
    config: HttpConfig,
    pos: u64,
    size: Option<u64>,
    requests_made: u32,
    bytes_delivered: u64,
}

impl HttpSource {
    pub fn open(url: impl Into<String>, config: HttpConfig) -> Result<Self> {
        let transport = Box::new(ReqwestTransport::new()?);
        Ok(Self::with_transport(url, config, transport))
    }

    pub fn with_transport(
        url: impl Into<String>,
        config: HttpConfig,
        transport: Box<dyn RangeTransport>,
    ) -> Self {
        Self {
            url: url.into(),
            transport,
            config,
            pos: 0,
            size: None,
            requests_made: 0,
            bytes_delivered: 0,
        }
    }

    pub fn requests_made(&self) -> u32 {
        self.requests_made
    }

    pub fn bytes_delivered(&self) -> u64 {
        self.bytes_delivered
    }

    /// Size learned so far, without triggering a probe.
    pub fn known_size(&self) -> Option<u64> {
        self.size
    }

    fn issue(&mut self, start: u64, end: u64) -> Result<RangeResponse> {
        if self.requests_made >= self.config.max_requests {
            return Err(Error::RequestCapExceeded {
                limit: self.config.max_requests,
            });
        }
        self.requests_made += 1;
        debug!("GET {} bytes={start}-{end}", self.url);
        self.transport
            .get_range(&self.url, start, end, &self.config.headers)
    }

    /// Record a size learned from a `Content-Range` header. Never overwrites
    /// an already-known size.
    fn learn_size(&mut self, content_range: Option<&str>) {
        if self.size.is_some() {
            return;
        }
        if let Some(total) = content_range.and_then(parse_content_range_total) {
            debug!("{}: size {total} learned from Content-Range", self.url);
            self.size = Some(total);
        }
    }

    fn deliver(&mut self, body: &[u8], buf: &mut [u8]) -> usize {
        let n = body.len().min(buf.len());
        buf[..n].copy_from_slice(&body[..n]);
        self.pos += n as u64;
        self.bytes_delivered += n as u64;
        n
    }
}

impl ByteSource for HttpSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut wanted = buf.len() as u64;
        if let Some(size) = self.size {
            if self.pos >= size {
                // Provably past the end: no request needed.
                return Ok(0);
            }
            wanted = wanted.min(size - self.pos);
        }
        if self.bytes_delivered + wanted > self.config.max_bytes {
            return Err(Error::ByteCapExceeded {
                limit: self.config.max_bytes,
            });
        }

        let start = self.pos;
        let end = start + wanted - 1;
        let response = self.issue(start, end)?;

        match response.status {
            206 => {
                self.learn_size(response.content_range.as_deref());
                Ok(self.deliver(&response.body, &mut buf[..wanted as usize]))
            }
            200 => {
                // The server ignored the range; the body is treated as the
                // requested window, truncated to the asked-for length.
                self.learn_size(response.content_range.as_deref());
                if self.size.is_none() {
                    // A 200 carries the whole object.
                    self.size = Some(response.body.len() as u64);
                }
                Ok(self.deliver(&response.body, &mut buf[..wanted as usize]))
            }
            416 => {
                // Out of range: an empty read. A size learned earlier stays.
                self.learn_size(response.content_range.as_deref());
                Ok(0)
            }
            status @ 400..=499 => Err(Error::HttpRefused {
                status,
                message: String::from_utf8_lossy(&response.body).into_owned(),
            }),
            status @ 500..=599 => Err(Error::HttpTransient {
                status,
                message: String::from_utf8_lossy(&response.body).into_owned(),
            }),
            status => Err(Error::HttpRefused {
                status,
                message: "unexpected status for ranged GET".into(),
            }),
        }
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        if let Some(size) = self.size {
            if offset > size {
                return Err(Error::OutOfBounds { offset, size });
            }
        }
        self.pos = offset;
        Ok(())
    }

    fn pos(&self) -> u64 {
        self.pos
    }

    fn size(&mut self) -> Result<u64> {
        if let Some(size) = self.size {
            return Ok(size);
        }

        // Probe with a one-byte range; counted against the request cap.
        let response = self.issue(0, 0)?;
        match response.status {
            206 | 416 => self.learn_size(response.content_range.as_deref()),
            200 => {
                self.learn_size(response.content_range.as_deref());
                if self.size.is_none() {
                    self.size = Some(response.body.len() as u64);
                }
            }
            status @ 400..=499 => {
                return Err(Error::HttpRefused {
                    status,
                    message: String::from_utf8_lossy(&response.body).into_owned(),
                })
            }
            status => {
                return Err(Error::HttpTransient {
                    status,
                    message: String::from_utf8_lossy(&response.body).into_owned(),
                })
            }
        }

        self.size
            .ok_or_else(|| Error::InvalidInput(format!("cannot determine size of {}", self.url)))
    }
}

/// Extract the total length from `bytes X-Y/Z` (or the bare `X-Y/Z` some
/// servers send). A `*` total yields `None`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let value = value.trim();
    let value = value
        .strip_prefix("bytes")
        .map(str::trim_start)
        .unwrap_or(value);
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}
