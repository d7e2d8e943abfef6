//! TIFF header parsing, plus the IFD walker shared with EXIF extraction.

use super::has_extension;
use crate::error::Result;
use crate::io::{ByteSource, SourceWindow};
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{ColorMode, Format, ImageInfo, MediaInfo, Nature, Orientation};

const TIFF_MAGIC: u16 = 42;

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_ORIENTATION: u16 = 274;

const ENTRY_LEN: usize = 12;
const MAX_IFD_ENTRIES: u16 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TiffEndian {
    Little,
    Big,
}

impl TiffEndian {
    pub(crate) fn from_header(bytes: &[u8]) -> Option<Self> {
        match bytes.get(0..2)? {
            b"II" => Some(TiffEndian::Little),
            b"MM" => Some(TiffEndian::Big),
            _ => None,
        }
    }

    pub(crate) fn read_u16(self, buf: &[u8], offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = buf.get(offset..offset + 2)?.try_into().ok()?;
        Some(match self {
            TiffEndian::Little => u16::from_le_bytes(bytes),
            TiffEndian::Big => u16::from_be_bytes(bytes),
        })
    }

    pub(crate) fn read_u32(self, buf: &[u8], offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = buf.get(offset..offset + 4)?.try_into().ok()?;
        Some(match self {
            TiffEndian::Little => u32::from_le_bytes(bytes),
            TiffEndian::Big => u32::from_be_bytes(bytes),
        })
    }
}

/// One decoded IFD entry. Only inline SHORT/LONG values are materialized;
/// that covers every tag identification cares about.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IfdEntry {
    pub tag: u16,
    pub value: Option<u32>,
}

pub(crate) fn parse_ifd_entry(endian: TiffEndian, entry: &[u8]) -> Option<IfdEntry> {
    let tag = endian.read_u16(entry, 0)?;
    let field_type = endian.read_u16(entry, 2)?;
    let count = endian.read_u32(entry, 4)?;

    let value = match (field_type, count) {
        (3, 1) => endian.read_u16(entry, 8).map(u32::from), // SHORT
        (4, 1) => endian.read_u32(entry, 8),                // LONG
        _ => None,
    };

    Some(IfdEntry { tag, value })
}

/// EXIF orientation from an in-memory TIFF structure (the payload of a JPEG
/// APP1 segment after the `Exif\0\0` preamble).
pub(crate) fn orientation_from_tiff(buf: &[u8]) -> Option<Orientation> {
    let endian = TiffEndian::from_header(buf)?;
    if endian.read_u16(buf, 2)? != TIFF_MAGIC {
        return None;
    }

    let ifd_offset = endian.read_u32(buf, 4)? as usize;
    let count = endian.read_u16(buf, ifd_offset)?;
    if count > MAX_IFD_ENTRIES {
        return None;
    }

    for i in 0..count as usize {
        let start = ifd_offset + 2 + i * ENTRY_LEN;
        let entry = parse_ifd_entry(endian, buf.get(start..start + ENTRY_LEN)?)?;
        if entry.tag == TAG_ORIENTATION {
            return Orientation::from_exif(entry.value? as u16);
        }
    }
    None
}

pub struct TiffParser;

impl FormatParser for TiffParser {
    fn name(&self) -> &'static str {
        "tiff"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Image]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Tif]
    }

    fn priority(&self) -> i32 {
        2
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["tif", "tiff"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let header = io.read_exact_n(8)?;
        let endian = match TiffEndian::from_header(&header) {
            Some(endian) => endian,
            None => return Ok(None),
        };
        if endian.read_u16(&header, 2) != Some(TIFF_MAGIC) {
            return Ok(None);
        }

        let ifd_offset = match endian.read_u32(&header, 4) {
            Some(offset) => u64::from(offset),
            None => return Ok(None),
        };
        io.seek(ifd_offset)?;

        let count_bytes = io.read_exact_n(2)?;
        let count = match endian.read_u16(&count_bytes, 0) {
            Some(count) if (1..=MAX_IFD_ENTRIES).contains(&count) => count,
            _ => return Ok(None),
        };
        let entries = io.read_exact_n(count as usize * ENTRY_LEN)?;

        let mut width = None;
        let mut height = None;
        let mut photometric = None;
        let mut orientation = None;

        for chunk in entries.chunks_exact(ENTRY_LEN) {
            let Some(entry) = parse_ifd_entry(endian, chunk) else {
                continue;
            };
            match entry.tag {
                TAG_IMAGE_WIDTH => width = entry.value,
                TAG_IMAGE_LENGTH => height = entry.value,
                TAG_PHOTOMETRIC => photometric = entry.value,
                TAG_ORIENTATION => {
                    orientation = entry.value.and_then(|v| Orientation::from_exif(v as u16))
                }
                _ => {}
            }
        }

        let (Some(width), Some(height)) = (width, height) else {
            return Ok(None);
        };

        let color_mode = match photometric {
            Some(0) | Some(1) => ColorMode::Grayscale,
            Some(3) => ColorMode::Indexed,
            Some(5) => ColorMode::Cmyk,
            _ => ColorMode::Rgb,
        };

        Ok(ImageInfo::new(Format::Tif, width, height, color_mode, false).map(|mut info| {
            info.orientation = orientation;
            MediaInfo::Image(info)
        }))
    }
}
