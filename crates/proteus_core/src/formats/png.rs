//! PNG header parsing, including APNG animation detection.

use byteorder::{BigEndian, ByteOrder};
use serde_json::json;

use super::has_extension;
use crate::error::Result;
use crate::io::SourceWindow;
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{ColorMode, Format, ImageInfo, MediaInfo, Nature};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const IHDR_LENGTH: u32 = 13;

pub struct PngParser;

impl FormatParser for PngParser {
    fn name(&self) -> &'static str {
        "png"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Image]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Png]
    }

    fn priority(&self) -> i32 {
        1
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["png", "apng"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let signature = io.read_exact_n(8)?;
        if signature != PNG_SIGNATURE {
            return Ok(None);
        }

        let chunk_length = io.read_u32_be()?;
        let chunk_type = io.read_exact_n(4)?;
        if chunk_type != *b"IHDR" || chunk_length != IHDR_LENGTH {
            return Ok(None);
        }

        let ihdr = io.read_exact_n(IHDR_LENGTH as usize)?;
        let width = BigEndian::read_u32(&ihdr[0..4]);
        let height = BigEndian::read_u32(&ihdr[4..8]);
        let bit_depth = ihdr[8];
        let color_type = ihdr[9];
        let interlace = ihdr[12];

        let (color_mode, has_transparency) = match color_type {
            0 => (ColorMode::Grayscale, true),
            2 => (ColorMode::Rgb, false),
            3 => (ColorMode::Indexed, false),
            4 => (ColorMode::Grayscale, true),
            6 => (ColorMode::Rgba, true),
            _ => return Ok(None),
        };

        let mut info = match ImageInfo::new(Format::Png, width, height, color_mode, has_transparency)
        {
            Some(info) => info,
            None => return Ok(None),
        };

        // An acTL chunk directly after IHDR marks an animated PNG. A missing
        // or truncated follow-up chunk just means "not animated".
        match read_actl(io) {
            Ok(Some(frames)) => {
                info.has_multiple_frames = Some(true);
                info.num_animation_or_video_frames = Some(frames);
            }
            Ok(None) => {}
            Err(err) if err.is_parser_local() => {}
            Err(err) => return Err(err),
        }

        info.intrinsics = Some(json!({
            "bit_depth": bit_depth,
            "interlaced": interlace == 1,
        }));

        Ok(Some(MediaInfo::Image(info)))
    }
}

/// Read the chunk after IHDR; `Some(num_frames)` when it is a well-formed
/// acTL.
fn read_actl(io: &mut SourceWindow<'_>) -> Result<Option<u32>> {
    io.skip(4)?; // IHDR CRC

    let chunk_length = io.read_u32_be()?;
    let chunk_type = io.read_exact_n(4)?;
    if chunk_type != *b"acTL" || chunk_length != 8 {
        return Ok(None);
    }

    let num_frames = io.read_u32_be()?;
    let _loop_count = io.read_u32_be()?;
    Ok(Some(num_frames))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::io::MemorySource;

    fn ihdr(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Vec<u8> {
        let mut chunk = Vec::new();
        chunk.extend_from_slice(&13u32.to_be_bytes());
        chunk.extend_from_slice(b"IHDR");
        chunk.extend_from_slice(&width.to_be_bytes());
        chunk.extend_from_slice(&height.to_be_bytes());
        chunk.extend_from_slice(&[bit_depth, color_type, 0, 0, 0]);
        chunk.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]); // CRC, not verified here
        chunk
    }

    fn minimal_png(width: u32, height: u32, color_type: u8) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&ihdr(width, height, 8, color_type));
        // A bare IDAT chunk header so the stream continues plausibly.
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(b"IDAT");
        data.extend_from_slice(&[0x00; 4]);
        data
    }

    fn parse(data: Vec<u8>) -> Option<MediaInfo> {
        let mut source = MemorySource::new(data);
        let mut window = SourceWindow::new(&mut source).unwrap();
        PngParser.parse(&mut window).unwrap()
    }

    #[test]
    fn recognizes_rgba_png() {
        let result = parse(minimal_png(180, 180, 6)).unwrap();
        let MediaInfo::Image(info) = result else {
            panic!("expected an image result");
        };
        assert_eq!(info.format, Format::Png);
        assert_eq!(info.width_px, 180);
        assert_eq!(info.height_px, 180);
        assert_eq!(info.color_mode, ColorMode::Rgba);
        assert!(info.has_transparency);
        assert_eq!(info.has_multiple_frames, None);
        assert_eq!(info.content_type, "image/png");
    }

    #[rstest]
    #[case(0, ColorMode::Grayscale, true)]
    #[case(2, ColorMode::Rgb, false)]
    #[case(3, ColorMode::Indexed, false)]
    #[case(4, ColorMode::Grayscale, true)]
    #[case(6, ColorMode::Rgba, true)]
    fn color_type_mapping(
        #[case] color_type: u8,
        #[case] mode: ColorMode,
        #[case] transparency: bool,
    ) {
        let MediaInfo::Image(info) = parse(minimal_png(10, 20, color_type)).unwrap() else {
            panic!("expected an image result");
        };
        assert_eq!(info.color_mode, mode);
        assert_eq!(info.has_transparency, transparency);
    }

    #[test]
    fn unknown_color_type_is_rejected() {
        assert!(parse(minimal_png(10, 10, 5)).is_none());
        assert!(parse(minimal_png(10, 10, 7)).is_none());
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(parse(minimal_png(0, 10, 2)).is_none());
        assert!(parse(minimal_png(10, 0, 2)).is_none());
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let mut data = minimal_png(10, 10, 2);
        data[0] = 0x88;
        assert!(parse(data).is_none());
    }

    #[test]
    fn detects_animated_png() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&ihdr(180, 180, 8, 6));
        data.extend_from_slice(&8u32.to_be_bytes());
        data.extend_from_slice(b"acTL");
        data.extend_from_slice(&12u32.to_be_bytes()); // num_frames
        data.extend_from_slice(&0u32.to_be_bytes()); // loop_count
        data.extend_from_slice(&[0x00; 4]); // acTL CRC

        let MediaInfo::Image(info) = parse(data).unwrap() else {
            panic!("expected an image result");
        };
        assert_eq!(info.has_multiple_frames, Some(true));
        assert_eq!(info.num_animation_or_video_frames, Some(12));
    }

    #[test]
    fn truncated_after_ihdr_still_identifies() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&ihdr(64, 64, 8, 2));
        let MediaInfo::Image(info) = parse(data).unwrap() else {
            panic!("expected an image result");
        };
        assert_eq!(info.width_px, 64);
        assert_eq!(info.has_multiple_frames, None);
    }

    #[test]
    fn short_input_is_not_recognized() {
        let mut source = MemorySource::new(PNG_SIGNATURE[..4].to_vec());
        let mut window = SourceWindow::new(&mut source).unwrap();
        let err = PngParser.parse(&mut window).unwrap_err();
        assert!(err.is_parser_local());
    }

    #[test]
    fn filename_hint() {
        assert!(PngParser.likely_match("shot.png"));
        assert!(PngParser.likely_match("anim.APNG"));
        assert!(!PngParser.likely_match("shot.jpg"));
    }
}
