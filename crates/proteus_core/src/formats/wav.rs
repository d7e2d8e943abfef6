//! RIFF/WAVE header parsing.

use byteorder::{ByteOrder, LittleEndian};

use super::has_extension;
use crate::error::{Error, Result};
use crate::io::SourceWindow;
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{AudioInfo, Format, MediaInfo, Nature};

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WAVE_FORM: &[u8; 4] = b"WAVE";

const MAX_CHUNKS: u32 = 64;

pub struct WavParser;

impl FormatParser for WavParser {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Audio]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Wav]
    }

    fn priority(&self) -> i32 {
        2
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["wav", "wave"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let riff = io.read_exact_n(12)?;
        if riff[0..4] != *RIFF_MAGIC || riff[8..12] != *WAVE_FORM {
            return Ok(None);
        }

        let mut fmt: Option<FmtChunk> = None;
        let mut fact_samples: Option<u32> = None;
        let mut data_len: Option<u64> = None;

        for _ in 0..MAX_CHUNKS {
            let header = match io.read_exact_n(8) {
                Ok(header) => header,
                Err(Error::InsufficientData { .. }) => break, // chunk list ends with the file
                Err(err) => return Err(err),
            };
            let chunk_len = u64::from(LittleEndian::read_u32(&header[4..8]));

            match &header[0..4] {
                b"fmt " => {
                    if chunk_len < 16 {
                        return Ok(None);
                    }
                    let body = io.read_exact_n(16)?;
                    fmt = Some(FmtChunk {
                        channels: u32::from(LittleEndian::read_u16(&body[2..4])),
                        sample_rate: LittleEndian::read_u32(&body[4..8]),
                        byte_rate: LittleEndian::read_u32(&body[8..12]),
                    });
                    io.skip(pad(chunk_len) - 16)?;
                }
                b"fact" => {
                    if chunk_len < 4 {
                        return Ok(None);
                    }
                    fact_samples = Some(io.read_u32_le()?);
                    io.skip(pad(chunk_len) - 4)?;
                }
                b"data" => {
                    data_len = Some(chunk_len);
                    // The payload itself is never read; identification has
                    // everything once fmt is known.
                    if fmt.is_some() {
                        break;
                    }
                    io.skip(pad(chunk_len))?;
                }
                _ => io.skip(pad(chunk_len))?,
            }
        }

        let Some(fmt) = fmt else {
            return Ok(None);
        };

        // fact carries the per-channel sample count for compressed streams;
        // plain PCM durations come from the payload length and byte rate.
        let duration = match (fact_samples, data_len) {
            (Some(samples), _) if fmt.sample_rate > 0 => {
                f64::from(samples) / f64::from(fmt.sample_rate)
            }
            (None, Some(len)) if fmt.byte_rate > 0 => len as f64 / f64::from(fmt.byte_rate),
            _ => return Ok(None),
        };

        Ok(
            AudioInfo::new(Format::Wav, fmt.sample_rate, fmt.channels, duration)
                .map(MediaInfo::Audio),
        )
    }
}

struct FmtChunk {
    channels: u32,
    sample_rate: u32,
    byte_rate: u32,
}

/// RIFF chunks are word-aligned; odd-length chunks carry one pad byte.
fn pad(len: u64) -> u64 {
    len + (len & 1)
}
