//! Per-parser view of a shared byte source.

use super::ByteSource;
use crate::error::Result;

/// A fresh view over a shared source, handed to exactly one parser attempt.
///
/// Creating the window rewinds the source to offset 0, so a parser never
/// observes the seeks of a previous candidate. All bounds enforcement of the
/// underlying backend applies unchanged; the window adds nothing a parser
/// could use to escape it.
pub struct SourceWindow<'a> {
    inner: &'a mut dyn ByteSource,
}

impl<'a> SourceWindow<'a> {
    pub fn new(inner: &'a mut dyn ByteSource) -> Result<Self> {
        inner.seek(0)?;
        Ok(Self { inner })
    }
}

impl ByteSource for SourceWindow<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(offset)
    }

    fn pos(&self) -> u64 {
        self.inner.pos()
    }

    fn size(&mut self) -> Result<u64> {
        self.inner.size()
    }
}
