//! MP4/QuickTime container parsing: box walk for duration and dimensions.

use super::has_extension;
use crate::error::Result;
use crate::io::{ByteSource, SourceWindow};
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{Format, MediaInfo, Nature, VideoInfo};

const MAX_BOXES: u32 = 64;

pub struct Mp4Parser;

impl FormatParser for Mp4Parser {
    fn name(&self) -> &'static str {
        "mp4"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Video]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Mp4, Format::Mov]
    }

    fn priority(&self) -> i32 {
        3
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["mp4", "m4v", "mov", "qt"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let Some(first) = read_box_header(io)? else {
            return Ok(None);
        };
        if first.box_type != *b"ftyp" {
            return Ok(None);
        }
        let brand = io.read_exact_n(4)?;
        let format = if &brand[..] == b"qt  " {
            Format::Mov
        } else {
            Format::Mp4
        };
        io.seek(first.end)?;

        let mut duration = None;
        let mut dimensions = None;

        let size = io.size()?;
        for _ in 0..MAX_BOXES {
            if io.pos() >= size {
                break;
            }
            let Some(header) = read_box_header(io)? else {
                break;
            };
            if header.box_type == *b"moov" {
                scan_moov(io, header.end, &mut duration, &mut dimensions)?;
                break;
            }
            io.seek(header.end.min(size))?;
        }

        let (Some(duration), Some((width, height))) = (duration, dimensions) else {
            return Ok(None);
        };

        Ok(VideoInfo::new(format, width, height, duration).map(MediaInfo::Video))
    }
}

struct BoxHeader {
    box_type: [u8; 4],
    /// Absolute offset just past the box.
    end: u64,
}

/// Read one box header at the current position. `None` for structurally
/// impossible sizes.
fn read_box_header(io: &mut SourceWindow<'_>) -> Result<Option<BoxHeader>> {
    let start = io.pos();
    let short_size = io.read_u32_be()?;
    let type_bytes = io.read_exact_n(4)?;
    let mut box_type = [0u8; 4];
    box_type.copy_from_slice(&type_bytes);

    let total = match short_size {
        0 => {
            // Box extends to the end of the file.
            let size = io.size()?;
            return Ok(Some(BoxHeader {
                box_type,
                end: size,
            }));
        }
        1 => io.read_u64_be()?,
        n => u64::from(n),
    };
    if total < 8 {
        return Ok(None);
    }
    Ok(Some(BoxHeader {
        box_type,
        end: start + total,
    }))
}

/// Scan the children of a moov box for mvhd (duration) and the first tkhd
/// with a visual presentation size.
fn scan_moov(
    io: &mut SourceWindow<'_>,
    moov_end: u64,
    duration: &mut Option<f64>,
    dimensions: &mut Option<(u32, u32)>,
) -> Result<()> {
    for _ in 0..MAX_BOXES {
        if io.pos() >= moov_end {
            break;
        }
        let Some(header) = read_box_header(io)? else {
            break;
        };
        match &header.box_type {
            b"mvhd" => {
                *duration = read_mvhd_duration(io)?;
            }
            b"trak" => {
                // Descend; tkhd is a direct child.
                continue;
            }
            b"tkhd" => {
                if dimensions.is_none() {
                    *dimensions = read_tkhd_dimensions(io)?;
                }
            }
            _ => {}
        }
        io.seek(header.end.min(moov_end))?;
    }
    Ok(())
}

fn read_mvhd_duration(io: &mut SourceWindow<'_>) -> Result<Option<f64>> {
    let version = io.read_u8()?;
    io.skip(3)?; // flags

    let (timescale, duration) = match version {
        0 => {
            io.skip(8)?; // creation + modification
            let timescale = io.read_u32_be()?;
            let duration = u64::from(io.read_u32_be()?);
            (timescale, duration)
        }
        1 => {
            io.skip(16)?;
            let timescale = io.read_u32_be()?;
            let duration = io.read_u64_be()?;
            (timescale, duration)
        }
        _ => return Ok(None),
    };

    if timescale == 0 {
        return Ok(None);
    }
    Ok(Some(duration as f64 / f64::from(timescale)))
}

fn read_tkhd_dimensions(io: &mut SourceWindow<'_>) -> Result<Option<(u32, u32)>> {
    let version = io.read_u8()?;
    io.skip(3)?;

    // Fixed fields up to the 16.16 width/height pair.
    let lead = match version {
        0 => 20,
        1 => 32,
        _ => return Ok(None),
    };
    io.skip(lead)?;
    io.skip(8 + 2 + 2 + 2 + 2 + 36)?; // reserved, layer, group, volume, matrix

    let width = io.read_u32_be()? >> 16;
    let height = io.read_u32_be()? >> 16;
    if width == 0 || height == 0 {
        return Ok(None);
    }
    Ok(Some((width, height)))
}
