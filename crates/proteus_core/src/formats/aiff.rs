//! AIFF/AIFC header parsing.

use byteorder::{BigEndian, ByteOrder};

use super::has_extension;
use crate::error::{Error, Result};
use crate::io::SourceWindow;
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{AudioInfo, Format, MediaInfo, Nature};

const FORM_MAGIC: &[u8; 4] = b"FORM";

const MAX_CHUNKS: u32 = 64;

pub struct AiffParser;

impl FormatParser for AiffParser {
    fn name(&self) -> &'static str {
        "aiff"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Audio]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Aiff]
    }

    fn priority(&self) -> i32 {
        2
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["aif", "aiff", "aifc"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let form = io.read_exact_n(12)?;
        if form[0..4] != *FORM_MAGIC {
            return Ok(None);
        }
        if &form[8..12] != b"AIFF" && &form[8..12] != b"AIFC" {
            return Ok(None);
        }

        for _ in 0..MAX_CHUNKS {
            let header = match io.read_exact_n(8) {
                Ok(header) => header,
                Err(Error::InsufficientData { .. }) => break,
                Err(err) => return Err(err),
            };
            let chunk_len = u64::from(BigEndian::read_u32(&header[4..8]));

            if &header[0..4] == b"COMM" {
                if chunk_len < 18 {
                    return Ok(None);
                }
                let body = io.read_exact_n(18)?;
                let channels = u32::from(BigEndian::read_u16(&body[0..2]));
                let num_frames = BigEndian::read_u32(&body[2..6]);
                let sample_rate = f64_from_extended(&body[8..18]);

                if !(sample_rate.is_finite() && sample_rate > 0.0) {
                    return Ok(None);
                }
                let duration = f64::from(num_frames) / sample_rate;
                return Ok(AudioInfo::new(
                    Format::Aiff,
                    sample_rate.round() as u32,
                    channels,
                    duration,
                )
                .map(MediaInfo::Audio));
            }

            // IFF chunks are word-aligned like RIFF's.
            io.skip(chunk_len + (chunk_len & 1))?;
        }

        Ok(None)
    }
}

/// Decode the 80-bit extended-precision float AIFF stores sample rates in:
/// 1 sign bit, 15 exponent bits, 64 mantissa bits with an explicit integer
/// bit.
fn f64_from_extended(bytes: &[u8]) -> f64 {
    debug_assert_eq!(bytes.len(), 10);
    let sign = if bytes[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = ((u16::from(bytes[0] & 0x7F) << 8) | u16::from(bytes[1])) as i32 - 16383;
    let mantissa = BigEndian::read_u64(&bytes[2..10]);

    if mantissa == 0 {
        return 0.0;
    }
    sign * mantissa as f64 * 2f64.powi(exponent - 63)
}
