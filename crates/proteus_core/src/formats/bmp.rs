//! BMP header parsing.

use byteorder::{ByteOrder, LittleEndian};

use super::has_extension;
use crate::error::Result;
use crate::io::SourceWindow;
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{ColorMode, Format, ImageInfo, MediaInfo, Nature};

const BMP_MAGIC: &[u8; 2] = b"BM";

pub struct BmpParser;

impl FormatParser for BmpParser {
    fn name(&self) -> &'static str {
        "bmp"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Image]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Bmp]
    }

    fn priority(&self) -> i32 {
        2
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["bmp", "dib"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let file_header = io.read_exact_n(14)?;
        if file_header[0..2] != *BMP_MAGIC {
            return Ok(None);
        }

        let dib_size = io.read_u32_le()?;
        let (width, height, bits_per_pixel) = match dib_size {
            // BITMAPCOREHEADER: 16-bit dimensions.
            12 => {
                let core = io.read_exact_n(8)?;
                let width = i64::from(LittleEndian::read_u16(&core[0..2]));
                let height = i64::from(LittleEndian::read_u16(&core[2..4]));
                let bpp = LittleEndian::read_u16(&core[6..8]);
                (width, height, bpp)
            }
            // BITMAPINFOHEADER and its extensions: signed 32-bit dimensions,
            // negative height meaning top-down row order.
            s if s >= 40 => {
                let info = io.read_exact_n(12)?;
                let width = i64::from(LittleEndian::read_i32(&info[0..4]));
                let height = i64::from(LittleEndian::read_i32(&info[4..8]));
                let bpp = LittleEndian::read_u16(&info[10..12]);
                (width, height, bpp)
            }
            _ => return Ok(None),
        };

        if width <= 0 || height == 0 {
            return Ok(None);
        }
        let height = height.unsigned_abs();
        let width = width as u64;
        if width > u64::from(u32::MAX) || height > u64::from(u32::MAX) {
            return Ok(None);
        }

        let color_mode = if bits_per_pixel <= 8 {
            ColorMode::Indexed
        } else {
            ColorMode::Rgb
        };

        Ok(
            ImageInfo::new(Format::Bmp, width as u32, height as u32, color_mode, false)
                .map(MediaInfo::Image),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    fn build_bmp(width: i32, height: i32, bpp: u16) -> Vec<u8> {
        let mut data = BMP_MAGIC.to_vec();
        data.extend_from_slice(&100u32.to_le_bytes()); // file size, unreliable
        data.extend_from_slice(&[0u8; 4]); // reserved
        data.extend_from_slice(&54u32.to_le_bytes()); // pixel data offset
        data.extend_from_slice(&40u32.to_le_bytes()); // BITMAPINFOHEADER
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes()); // planes
        data.extend_from_slice(&bpp.to_le_bytes());
        data.extend_from_slice(&[0u8; 24]); // rest of the info header
        data
    }

    fn parse(data: Vec<u8>) -> Option<MediaInfo> {
        let mut source = MemorySource::new(data);
        let mut window = SourceWindow::new(&mut source).unwrap();
        BmpParser.parse(&mut window).unwrap()
    }

    #[test]
    fn parses_truecolor_bmp() {
        let MediaInfo::Image(info) = parse(build_bmp(800, 600, 24)).unwrap() else {
            panic!("expected an image result");
        };
        assert_eq!(info.format, Format::Bmp);
        assert_eq!(info.width_px, 800);
        assert_eq!(info.height_px, 600);
        assert_eq!(info.color_mode, ColorMode::Rgb);
        assert_eq!(info.content_type, "image/bmp");
    }

    #[test]
    fn top_down_height_is_normalized() {
        let MediaInfo::Image(info) = parse(build_bmp(320, -240, 32)).unwrap() else {
            panic!("expected an image result");
        };
        assert_eq!(info.height_px, 240);
    }

    #[test]
    fn paletted_bmp_is_indexed() {
        let MediaInfo::Image(info) = parse(build_bmp(16, 16, 8)).unwrap() else {
            panic!("expected an image result");
        };
        assert_eq!(info.color_mode, ColorMode::Indexed);
    }

    #[test]
    fn core_header_is_supported() {
        let mut data = BMP_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 12]); // rest of the file header
        data.extend_from_slice(&12u32.to_le_bytes()); // BITMAPCOREHEADER
        data.extend_from_slice(&64u16.to_le_bytes());
        data.extend_from_slice(&32u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&24u16.to_le_bytes());

        let MediaInfo::Image(info) = parse(data).unwrap() else {
            panic!("expected an image result");
        };
        assert_eq!(info.width_px, 64);
        assert_eq!(info.height_px, 32);
    }

    #[test]
    fn zero_or_negative_width_is_rejected() {
        assert!(parse(build_bmp(0, 10, 24)).is_none());
        assert!(parse(build_bmp(-5, 10, 24)).is_none());
        assert!(parse(build_bmp(10, 0, 24)).is_none());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut data = build_bmp(10, 10, 24);
        data[0] = b'X';
        assert!(parse(data).is_none());
    }

    #[test]
    fn filename_hint() {
        assert!(BmpParser.likely_match("img.bmp"));
        assert!(!BmpParser.likely_match("img.png"));
    }
}
