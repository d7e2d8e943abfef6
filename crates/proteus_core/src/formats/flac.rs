//! FLAC STREAMINFO parsing.

use byteorder::{BigEndian, ByteOrder};

use super::has_extension;
use crate::error::Result;
use crate::io::SourceWindow;
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{AudioInfo, Format, MediaInfo, Nature};

const FLAC_MAGIC: &[u8; 4] = b"fLaC";

const BLOCK_TYPE_STREAMINFO: u8 = 0;
const STREAMINFO_LEN: u32 = 34;

pub struct FlacParser;

impl FormatParser for FlacParser {
    fn name(&self) -> &'static str {
        "flac"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Audio]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Flac]
    }

    fn priority(&self) -> i32 {
        2
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["flac"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let magic = io.read_exact_n(4)?;
        if magic != *FLAC_MAGIC {
            return Ok(None);
        }

        // STREAMINFO is mandatory and always the first metadata block.
        let block_flags = io.read_u8()?;
        let block_type = block_flags & 0x7F;
        let block_len = io.read_u24_be()?;
        if block_type != BLOCK_TYPE_STREAMINFO || block_len != STREAMINFO_LEN {
            return Ok(None);
        }

        let body = io.read_exact_n(STREAMINFO_LEN as usize)?;
        // Bytes 10..18 pack: sample rate (20 bits), channels-1 (3 bits),
        // bits-per-sample-1 (5 bits), total samples (36 bits).
        let packed = BigEndian::read_u64(&body[10..18]);
        let sample_rate = (packed >> 44) as u32;
        let channels = ((packed >> 41) & 0x7) as u32 + 1;
        let total_samples = packed & 0xF_FFFF_FFFF;

        if sample_rate == 0 {
            return Ok(None);
        }
        let duration = total_samples as f64 / f64::from(sample_rate);

        Ok(
            AudioInfo::new(Format::Flac, sample_rate, channels, duration)
                .map(MediaInfo::Audio),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    fn build_flac(sample_rate: u32, channels: u32, total_samples: u64) -> Vec<u8> {
        let mut data = FLAC_MAGIC.to_vec();
        data.push(0x80 | BLOCK_TYPE_STREAMINFO); // last metadata block
        data.extend_from_slice(&STREAMINFO_LEN.to_be_bytes()[1..4]);

        let mut body = [0u8; 34];
        body[0..2].copy_from_slice(&4096u16.to_be_bytes()); // min block size
        body[2..4].copy_from_slice(&4096u16.to_be_bytes()); // max block size
        let packed: u64 = (u64::from(sample_rate) << 44)
            | (u64::from(channels - 1) << 41)
            | (15u64 << 36) // 16 bits per sample
            | total_samples;
        body[10..18].copy_from_slice(&packed.to_be_bytes());
        data.extend_from_slice(&body);
        data
    }

    fn parse(data: Vec<u8>) -> Option<MediaInfo> {
        let mut source = MemorySource::new(data);
        let mut window = SourceWindow::new(&mut source).unwrap();
        FlacParser.parse(&mut window).unwrap()
    }

    #[test]
    fn parses_streaminfo() {
        // 10 seconds at 44100 Hz.
        let MediaInfo::Audio(info) = parse(build_flac(44_100, 2, 441_000)).unwrap() else {
            panic!("expected an audio result");
        };
        assert_eq!(info.format, Format::Flac);
        assert_eq!(info.audio_sample_rate_hz, 44_100);
        assert_eq!(info.num_audio_channels, 2);
        assert!((info.media_duration_seconds - 10.0).abs() < 1e-9);
        assert_eq!(info.content_type, "audio/flac");
    }

    #[test]
    fn high_rate_multichannel() {
        let MediaInfo::Audio(info) = parse(build_flac(192_000, 6, 192_000)).unwrap() else {
            panic!("expected an audio result");
        };
        assert_eq!(info.audio_sample_rate_hz, 192_000);
        assert_eq!(info.num_audio_channels, 6);
        assert!((info.media_duration_seconds - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_total_samples_is_suppressed() {
        // A zero total-samples field means "unknown"; no duration, no result.
        assert!(parse(build_flac(44_100, 2, 0)).is_none());
    }

    #[test]
    fn wrong_first_block_is_rejected() {
        let mut data = build_flac(44_100, 2, 1000);
        data[4] = 0x84; // VORBIS_COMMENT first instead of STREAMINFO
        assert!(parse(data).is_none());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut data = build_flac(44_100, 2, 1000);
        data[0] = b'F';
        assert!(parse(data).is_none());
    }

    #[test]
    fn filename_hint() {
        assert!(FlacParser.likely_match("track.flac"));
        assert!(!FlacParser.likely_match("track.ogg"));
    }
}
