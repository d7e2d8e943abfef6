//! Photoshop document header parsing.

use byteorder::{BigEndian, ByteOrder};

use super::has_extension;
use crate::error::Result;
use crate::io::SourceWindow;
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{ColorMode, Format, ImageInfo, MediaInfo, Nature};

const PSD_MAGIC: &[u8; 4] = b"8BPS";

pub struct PsdParser;

impl FormatParser for PsdParser {
    fn name(&self) -> &'static str {
        "psd"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Image]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Psd]
    }

    fn priority(&self) -> i32 {
        2
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["psd", "psb"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let header = io.read_exact_n(26)?;
        if header[0..4] != *PSD_MAGIC {
            return Ok(None);
        }
        let version = BigEndian::read_u16(&header[4..6]);
        if version != 1 {
            return Ok(None);
        }

        let channels = BigEndian::read_u16(&header[12..14]);
        let height = BigEndian::read_u32(&header[14..18]);
        let width = BigEndian::read_u32(&header[18..22]);
        let mode = BigEndian::read_u16(&header[24..26]);

        let (color_mode, base_channels) = match mode {
            0 | 1 => (ColorMode::Grayscale, 1),
            2 => (ColorMode::Indexed, 1),
            3 => (ColorMode::Rgb, 3),
            4 => (ColorMode::Cmyk, 4),
            _ => return Ok(None),
        };
        // An extra channel beyond the base set is an alpha channel.
        let has_transparency = channels > base_channels;

        Ok(
            ImageInfo::new(Format::Psd, width, height, color_mode, has_transparency)
                .map(MediaInfo::Image),
        )
    }
}
