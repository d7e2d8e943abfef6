//! JPEG header parsing: dimensions from the SOF segment, orientation from
//! the EXIF APP1 segment.

use byteorder::{BigEndian, ByteOrder};

use super::has_extension;
use super::tiff::orientation_from_tiff;
use crate::error::Result;
use crate::io::SourceWindow;
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{ColorMode, Format, ImageInfo, MediaInfo, Nature, Orientation};

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP1: u8 = 0xE1;
const EXIF_PREAMBLE: &[u8; 6] = b"Exif\0\0";

/// Bail out on streams with absurd marker counts instead of scanning
/// forever.
const MAX_MARKERS: u32 = 1024;

pub struct JpegParser;

impl FormatParser for JpegParser {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Image]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Jpg]
    }

    fn priority(&self) -> i32 {
        0
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["jpg", "jpeg", "jpe"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let soi = io.read_exact_n(2)?;
        if soi != [MARKER_PREFIX, SOI] {
            return Ok(None);
        }

        let mut orientation: Option<Orientation> = None;

        for _ in 0..MAX_MARKERS {
            if io.read_u8()? != MARKER_PREFIX {
                return Ok(None);
            }
            let mut code = io.read_u8()?;
            while code == MARKER_PREFIX {
                // Fill bytes before a marker are legal.
                code = io.read_u8()?;
            }

            match code {
                0x00 => continue,                       // stuffed byte, not a marker
                0x01 | 0xD0..=0xD7 => continue,         // standalone markers
                EOI | SOS => return Ok(None),           // entropy data next; no SOF seen
                code if is_frame_marker(code) => {
                    let segment = read_segment(io)?;
                    if segment.len() < 6 {
                        return Ok(None);
                    }
                    let height = BigEndian::read_u16(&segment[1..3]);
                    let width = BigEndian::read_u16(&segment[3..5]);
                    let color_mode = match segment[5] {
                        1 => ColorMode::Grayscale,
                        3 => ColorMode::Rgb,
                        4 => ColorMode::Cmyk,
                        _ => return Ok(None),
                    };

                    return Ok(ImageInfo::new(
                        Format::Jpg,
                        u32::from(width),
                        u32::from(height),
                        color_mode,
                        false,
                    )
                    .map(|mut info| {
                        info.orientation = orientation;
                        MediaInfo::Image(info)
                    }));
                }
                APP1 => {
                    let segment = read_segment(io)?;
                    if orientation.is_none() && segment.starts_with(EXIF_PREAMBLE) {
                        orientation = orientation_from_tiff(&segment[EXIF_PREAMBLE.len()..]);
                    }
                }
                _ => {
                    let length = io.read_u16_be()?;
                    if length < 2 {
                        return Ok(None);
                    }
                    io.skip(u64::from(length) - 2)?;
                }
            }
        }

        Ok(None)
    }
}

/// SOF0..SOF15 carry the frame dimensions; DHT, JPG and DAC share the range
/// but are table/extension segments.
fn is_frame_marker(code: u8) -> bool {
    matches!(code, 0xC0..=0xCF) && !matches!(code, 0xC4 | 0xC8 | 0xCC)
}

/// Read one length-prefixed segment body (the length field counts itself).
fn read_segment(io: &mut SourceWindow<'_>) -> Result<Vec<u8>> {
    let length = io.read_u16_be()?;
    if length < 2 {
        return Ok(Vec::new());
    }
    io.read_exact_n(length as usize - 2)
}
