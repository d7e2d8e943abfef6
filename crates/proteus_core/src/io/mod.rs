//! Byte-source abstraction shared by every parser.
//!
//! A [`ByteSource`] is a seekable, size-bounded window onto a local file, an
//! in-memory buffer, or a remote HTTP object. Parsers never see the backend;
//! they receive a fresh [`SourceWindow`] positioned at offset 0 and perform
//! small targeted reads through the safe-read helpers in [`crate::read`].

mod file;
mod http;
mod window;

pub use file::FileSource;
pub use http::{
    HttpConfig, HttpSource, RangeResponse, RangeTransport, ReqwestTransport, DEFAULT_MAX_BYTES,
    DEFAULT_MAX_REQUESTS,
};
pub use window::SourceWindow;

use crate::error::{Error, Result};

/// Random-access byte source with a known (or discoverable) total size.
///
/// `0 <= pos <= size` holds after every successful operation. `read` may
/// return fewer bytes than requested only at the end of the source.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes at the current position, advancing it by
    /// the number of bytes delivered.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Move the position to an absolute offset.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Current absolute position.
    fn pos(&self) -> u64;

    /// Total byte length. Remote backends may need to issue a probe request
    /// to learn it, hence `&mut self` and the fallible return.
    fn size(&mut self) -> Result<u64>;
}

/// A byte source over an in-memory buffer.
///
/// Mostly useful for parsing data that is already resident, and for tests.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Vec<u8>,
    pos: u64,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

impl ByteSource for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let start = self.pos.min(self.data.len() as u64) as usize;
        let available = &self.data[start..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        let size = self.data.len() as u64;
        if offset > size {
            return Err(Error::OutOfBounds { offset, size });
        }
        self.pos = offset;
        Ok(())
    }

    fn pos(&self) -> u64 {
        self.pos
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }
}
