//! Local-file byte source.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use memmap2::Mmap;

use super::ByteSource;
use crate::error::{Error, Result};

/// A read-only byte source over a local file.
///
/// Mapping the file is the fast path; files that cannot be mapped (empty
/// files, some special files) fall back to plain positioned reads.
#[derive(Debug)]
pub enum FileSource {
    Mmap(MmapSource),
    Plain(PlainSource),
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match MmapSource::open(path) {
            Ok(source) => Ok(FileSource::Mmap(source)),
            Err(_) => Ok(FileSource::Plain(PlainSource::open(path)?)),
        }
    }

    #[inline]
    pub fn is_mmap(&self) -> bool {
        matches!(self, FileSource::Mmap(_))
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            FileSource::Mmap(s) => s.read(buf),
            FileSource::Plain(s) => s.read(buf),
        }
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        match self {
            FileSource::Mmap(s) => s.seek(offset),
            FileSource::Plain(s) => s.seek(offset),
        }
    }

    fn pos(&self) -> u64 {
        match self {
            FileSource::Mmap(s) => s.pos,
            FileSource::Plain(s) => s.pos,
        }
    }

    fn size(&mut self) -> Result<u64> {
        match self {
            FileSource::Mmap(s) => Ok(s.map.len() as u64),
            FileSource::Plain(s) => Ok(s.size),
        }
    }
}

#[derive(Debug)]
pub struct MmapSource {
    map: Mmap,
    pos: u64,
}

impl MmapSource {
    fn open(path: &Path) -> Result<Self> {
        let file = open_readonly(path)?;
        // Safety: the mapping is read-only and the file is opened read-only.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { map, pos: 0 })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let start = self.pos.min(self.map.len() as u64) as usize;
        let available = &self.map[start..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        let size = self.map.len() as u64;
        if offset > size {
            return Err(Error::OutOfBounds { offset, size });
        }
        self.pos = offset;
        Ok(())
    }
}

#[derive(Debug)]
pub struct PlainSource {
    file: File,
    size: u64,
    pos: u64,
}

impl PlainSource {
    fn open(path: &Path) -> Result<Self> {
        let mut file = open_readonly(path)?;

        #[cfg(target_os = "linux")]
        {
            use rustix::fs::{fadvise, Advice};

            // Parsers hop between the header and the tail.
            let _ = fadvise(&file, 0, None, Advice::Random);
        }

        let size = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;

        Ok(Self { file, size, pos: 0 })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file.seek(SeekFrom::Start(self.pos))?;
        let n = self.file.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.size {
            return Err(Error::OutOfBounds {
                offset,
                size: self.size,
            });
        }
        self.pos = offset;
        Ok(())
    }
}

fn open_readonly(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(false)
        .open(path)
        .map_err(|e| Error::InvalidInput(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn temp_file_with(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_and_reports_size() {
        let file = temp_file_with(b"Hello, World! This is test data.");
        let mut source = FileSource::open(file.path()).unwrap();

        assert_eq!(source.size().unwrap(), 32);

        let mut buf = [0u8; 13];
        assert_eq!(source.read(&mut buf).unwrap(), 13);
        assert_eq!(&buf, b"Hello, World!");

        source.seek(7).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(source.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"Worl");
        assert_eq!(source.pos(), 11);
    }

    #[test]
    fn short_read_at_end() {
        let file = temp_file_with(b"Short");
        let mut source = FileSource::open(file.path()).unwrap();

        let mut buf = [0u8; 100];
        assert_eq!(source.read(&mut buf).unwrap(), 5);
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn empty_file_falls_back_and_works() {
        let file = NamedTempFile::new().unwrap();
        let mut source = FileSource::open(file.path()).unwrap();

        assert_eq!(source.size().unwrap(), 0);
        let mut buf = [0u8; 8];
        assert_eq!(source.read(&mut buf).unwrap(), 0);
        assert!(source.seek(1).is_err());
    }

    #[test]
    fn seek_past_end_is_rejected() {
        let file = temp_file_with(b"abcdef");
        let mut source = FileSource::open(file.path()).unwrap();
        assert!(source.seek(6).is_ok());
        assert!(matches!(
            source.seek(7),
            Err(Error::OutOfBounds { offset: 7, size: 6 })
        ));
    }

    #[test]
    fn missing_file_is_invalid_input() {
        let err = FileSource::open("/no/such/file/anywhere").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
