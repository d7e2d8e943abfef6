//! MPEG audio (MP3) header parsing.
//!
//! The first frame header supplies the sample rate and channel mode. The
//! duration comes from a Xing/Info frame count when one is present (VBR and
//! well-mastered CBR files), otherwise from the audio byte length and the
//! first frame's bitrate.

use byteorder::{BigEndian, ByteOrder};
use serde_json::json;

use super::has_extension;
use crate::error::Result;
use crate::io::{ByteSource, SourceWindow};
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{AudioInfo, Format, MediaInfo, Nature};

/// How far past the ID3 tag the first frame sync is searched for.
const SYNC_SCAN_WINDOW: usize = 16 * 1024;

const ID3_HEADER_LEN: u64 = 10;
const ID3_FOOTER_LEN: u64 = 10;
const ID3V1_TAG_LEN: u64 = 128;

pub struct Mp3Parser;

impl FormatParser for Mp3Parser {
    fn name(&self) -> &'static str {
        "mp3"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Audio]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Mp3]
    }

    fn priority(&self) -> i32 {
        3
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["mp3"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let audio_start = skip_id3v2(io)?;
        io.seek(audio_start)?;

        let window = io.read_up_to(SYNC_SCAN_WINDOW)?;
        let Some((sync_offset, header)) = find_first_frame(&window) else {
            return Ok(None);
        };

        let size = io.size()?;
        let mut audio_len = size.saturating_sub(audio_start + sync_offset as u64);
        if has_id3v1_tail(io, size)? {
            audio_len = audio_len.saturating_sub(ID3V1_TAG_LEN);
        }

        let frame_start = sync_offset;
        let (duration, mode) = match xing_frame_count(&window, frame_start, &header) {
            Some(frames) => (
                f64::from(frames) * f64::from(header.samples_per_frame)
                    / f64::from(header.sample_rate),
                "vbr",
            ),
            None => (
                audio_len as f64 * 8.0 / f64::from(header.bitrate_kbps) / 1000.0,
                "cbr",
            ),
        };

        Ok(
            AudioInfo::new(Format::Mp3, header.sample_rate, header.channels, duration).map(
                |mut info| {
                    info.intrinsics = Some(json!({
                        "bitrate_kbps": header.bitrate_kbps,
                        "mode": mode,
                    }));
                    MediaInfo::Audio(info)
                },
            ),
        )
    }
}

/// Offset of the audio data: past an ID3v2 tag when one leads the file.
fn skip_id3v2(io: &mut SourceWindow<'_>) -> Result<u64> {
    let header = io.read_exact_n(3)?;
    if header != *b"ID3" {
        return Ok(0);
    }
    let rest = io.read_exact_n(7)?;
    let flags = rest[2];
    let tag_len = syncsafe_u32(&rest[3..7]);
    let footer = if flags & 0x10 != 0 { ID3_FOOTER_LEN } else { 0 };
    Ok(ID3_HEADER_LEN + u64::from(tag_len) + footer)
}

/// ID3v2 sizes are 28 bits spread over four 7-bit bytes.
fn syncsafe_u32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| (acc << 7) | u32::from(b & 0x7F))
}

fn has_id3v1_tail(io: &mut SourceWindow<'_>, size: u64) -> Result<bool> {
    if size < ID3V1_TAG_LEN {
        return Ok(false);
    }
    io.seek(size - ID3V1_TAG_LEN)?;
    let tag = io.read_exact_n(3)?;
    Ok(tag == *b"TAG")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MpegVersion {
    V1,
    V2,
    V25,
}

#[derive(Debug, Clone, Copy)]
struct FrameHeader {
    version: MpegVersion,
    layer: u8,
    bitrate_kbps: u16,
    sample_rate: u32,
    channels: u32,
    mono: bool,
    samples_per_frame: u16,
}

/// Scan for the first offset that decodes as a valid frame header.
fn find_first_frame(window: &[u8]) -> Option<(usize, FrameHeader)> {
    for offset in 0..window.len().saturating_sub(3) {
        if window[offset] != 0xFF || window[offset + 1] & 0xE0 != 0xE0 {
            continue;
        }
        let raw = BigEndian::read_u32(&window[offset..offset + 4]);
        if let Some(header) = FrameHeader::decode(raw) {
            return Some((offset, header));
        }
    }
    None
}

impl FrameHeader {
    fn decode(raw: u32) -> Option<Self> {
        let version = match (raw >> 19) & 0x3 {
            0b00 => MpegVersion::V25,
            0b10 => MpegVersion::V2,
            0b11 => MpegVersion::V1,
            _ => return None,
        };
        let layer = match (raw >> 17) & 0x3 {
            0b01 => 3,
            0b10 => 2,
            0b11 => 1,
            _ => return None,
        };

        let bitrate_index = ((raw >> 12) & 0xF) as usize;
        if bitrate_index == 0 || bitrate_index == 15 {
            return None; // free-format and invalid
        }
        let bitrate_kbps = bitrate_table(version, layer)[bitrate_index];

        let rate_index = ((raw >> 10) & 0x3) as usize;
        if rate_index == 3 {
            return None;
        }
        let sample_rate = match version {
            MpegVersion::V1 => [44_100, 48_000, 32_000][rate_index],
            MpegVersion::V2 => [22_050, 24_000, 16_000][rate_index],
            MpegVersion::V25 => [11_025, 12_000, 8_000][rate_index],
        };

        let mono = (raw >> 6) & 0x3 == 0b11;
        let samples_per_frame = match (layer, version) {
            (1, _) => 384,
            (2, _) => 1152,
            (3, MpegVersion::V1) => 1152,
            (3, _) => 576,
            _ => unreachable!("layer is validated to be 1..=3 above"),
        };

        Some(Self {
            version,
            layer,
            bitrate_kbps,
            sample_rate,
            channels: if mono { 1 } else { 2 },
            mono,
            samples_per_frame,
        })
    }
}

fn bitrate_table(version: MpegVersion, layer: u8) -> [u16; 16] {
    match (version, layer) {
        (MpegVersion::V1, 1) => [
            0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0,
        ],
        (MpegVersion::V1, 2) => [
            0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0,
        ],
        (MpegVersion::V1, _) => [
            0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
        ],
        (_, 1) => [
            0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0,
        ],
        (_, _) => [
            0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
        ],
    }
}

/// Frame count from a Xing/Info header inside the first frame, when present.
fn xing_frame_count(window: &[u8], frame_start: usize, header: &FrameHeader) -> Option<u32> {
    let side_info_len = match (header.version, header.mono) {
        (MpegVersion::V1, false) => 32,
        (MpegVersion::V1, true) => 17,
        (_, false) => 17,
        (_, true) => 9,
    };
    let tag_offset = frame_start + 4 + side_info_len;
    let tag = window.get(tag_offset..tag_offset + 4)?;
    if tag != b"Xing" && tag != b"Info" {
        return None;
    }

    let flags = BigEndian::read_u32(window.get(tag_offset + 4..tag_offset + 8)?);
    if flags & 0x1 == 0 {
        return None; // no frame count stored
    }
    Some(BigEndian::read_u32(
        window.get(tag_offset + 8..tag_offset + 12)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    /// MPEG-1 Layer III header: 128 kbps, 44100 Hz, stereo.
    const FRAME_HEADER_CBR: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

    fn build_cbr_mp3(audio_len: usize) -> Vec<u8> {
        let mut data = FRAME_HEADER_CBR.to_vec();
        data.resize(audio_len, 0x55);
        data
    }

    fn build_xing_mp3(frames: u32) -> Vec<u8> {
        let mut data = FRAME_HEADER_CBR.to_vec();
        data.resize(4 + 32, 0x00); // stereo MPEG-1 side info
        data.extend_from_slice(b"Xing");
        data.extend_from_slice(&0x0001u32.to_be_bytes()); // frames flag
        data.extend_from_slice(&frames.to_be_bytes());
        data.resize(data.len() + 256, 0x55);
        data
    }

    fn id3v2_prefix(tag_len: u32) -> Vec<u8> {
        let mut data = b"ID3".to_vec();
        data.extend_from_slice(&[0x04, 0x00, 0x00]); // version, flags
        data.extend_from_slice(&[
            ((tag_len >> 21) & 0x7F) as u8,
            ((tag_len >> 14) & 0x7F) as u8,
            ((tag_len >> 7) & 0x7F) as u8,
            (tag_len & 0x7F) as u8,
        ]);
        data.extend_from_slice(&vec![0x00; tag_len as usize]);
        data
    }

    fn parse(data: Vec<u8>) -> Option<MediaInfo> {
        let mut source = MemorySource::new(data);
        let mut window = SourceWindow::new(&mut source).unwrap();
        Mp3Parser.parse(&mut window).unwrap()
    }

    #[test]
    fn frame_header_decoding() {
        let header = FrameHeader::decode(u32::from_be_bytes(FRAME_HEADER_CBR)).unwrap();
        assert_eq!(header.version, MpegVersion::V1);
        assert_eq!(header.layer, 3);
        assert_eq!(header.bitrate_kbps, 128);
        assert_eq!(header.sample_rate, 44_100);
        assert_eq!(header.channels, 2);
        assert_eq!(header.samples_per_frame, 1152);
    }

    #[test]
    fn cbr_duration_from_byte_length() {
        // 128 kbps = 16000 bytes/s; 160000 bytes = 10 seconds.
        let MediaInfo::Audio(info) = parse(build_cbr_mp3(160_000)).unwrap() else {
            panic!("expected an audio result");
        };
        assert_eq!(info.format, Format::Mp3);
        assert_eq!(info.audio_sample_rate_hz, 44_100);
        assert_eq!(info.num_audio_channels, 2);
        assert!((info.media_duration_seconds - 10.0).abs() < 1e-6);
        assert_eq!(info.content_type, "audio/mpeg");
    }

    #[test]
    fn xing_frame_count_wins() {
        // 1000 frames * 1152 samples / 44100 Hz ≈ 26.122 s.
        let MediaInfo::Audio(info) = parse(build_xing_mp3(1000)).unwrap() else {
            panic!("expected an audio result");
        };
        assert!((info.media_duration_seconds - 26.122).abs() < 1e-3);
        assert_eq!(info.intrinsics.as_ref().unwrap()["mode"], "vbr");
    }

    #[test]
    fn id3v2_tag_is_skipped() {
        let mut data = id3v2_prefix(500);
        data.extend_from_slice(&build_cbr_mp3(16_000)); // 1 second
        let MediaInfo::Audio(info) = parse(data).unwrap() else {
            panic!("expected an audio result");
        };
        assert!((info.media_duration_seconds - 1.0).abs() < 1e-6);
    }

    #[test]
    fn id3v1_tail_is_excluded_from_the_estimate() {
        let mut data = build_cbr_mp3(16_000);
        data.extend_from_slice(b"TAG");
        data.extend_from_slice(&[0x20; 125]);
        let MediaInfo::Audio(info) = parse(data).unwrap() else {
            panic!("expected an audio result");
        };
        assert!((info.media_duration_seconds - 1.0).abs() < 1e-6);
    }

    #[test]
    fn garbage_before_sync_is_tolerated() {
        let mut data = vec![0x00, 0x12, 0x34];
        data.extend_from_slice(&build_cbr_mp3(16_000));
        assert!(parse(data).is_some());
    }

    #[test]
    fn syncsafe_decoding() {
        assert_eq!(syncsafe_u32(&[0x00, 0x00, 0x02, 0x01]), 257);
        assert_eq!(syncsafe_u32(&[0x00, 0x00, 0x7F, 0x7F]), 16_383);
    }

    #[test]
    fn non_audio_bytes_are_rejected() {
        assert!(parse(vec![0x00; 4096]).is_none());
    }

    #[test]
    fn reserved_version_is_rejected() {
        // Version bits 01 are reserved.
        assert!(FrameHeader::decode(0xFFEB_9000).is_none());
    }

    #[test]
    fn filename_hint() {
        assert!(Mp3Parser.likely_match("song.mp3"));
        assert!(!Mp3Parser.likely_match("song.flac"));
    }
}
