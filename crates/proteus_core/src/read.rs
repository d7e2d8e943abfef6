//! Safe-read helpers layered over [`ByteSource`].
//!
//! Fixed-length reads that fail cleanly when the source ends early, plus the
//! endian-aware integer ladder parsers build their header decoding from. A
//! short read surfaces as [`Error::InsufficientData`], which dispatch treats
//! as "this parser does not recognize the file".

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::io::ByteSource;

pub trait ReadExt: ByteSource {
    /// Read exactly `n` bytes or fail with [`Error::InsufficientData`].
    fn read_exact_n(&mut self, n: usize) -> Result<Vec<u8>> {
        let offset = self.pos();
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            let got = self.read(&mut buf[filled..])?;
            if got == 0 {
                return Err(Error::InsufficientData {
                    offset,
                    needed: n,
                    got: filled,
                });
            }
            filled += got;
        }
        Ok(buf)
    }

    /// Read up to `n` bytes; short only when the source ends first.
    fn read_up_to(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            let got = self.read(&mut buf[filled..])?;
            if got == 0 {
                break;
            }
            filled += got;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    /// Advance the position by `n` bytes, validating bounds.
    fn skip(&mut self, n: u64) -> Result<()> {
        let target = self
            .pos()
            .checked_add(n)
            .ok_or_else(|| Error::InvalidInput("seek offset overflow".into()))?;
        self.seek(target)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact_n(1)?[0])
    }

    fn read_u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(&self.read_exact_n(2)?))
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(&self.read_exact_n(2)?))
    }

    fn read_u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(&self.read_exact_n(4)?))
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(&self.read_exact_n(4)?))
    }

    fn read_u64_be(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(&self.read_exact_n(8)?))
    }

    fn read_u64_le(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(&self.read_exact_n(8)?))
    }

    fn read_i32_le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(&self.read_exact_n(4)?))
    }

    fn read_u24_be(&mut self) -> Result<u32> {
        let b = self.read_exact_n(3)?;
        Ok(u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2]))
    }
}

impl<T: ByteSource + ?Sized> ReadExt for T {}
