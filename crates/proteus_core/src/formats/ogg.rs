//! Ogg Vorbis header parsing.
//!
//! Identification reads the identification header at the front of the
//! stream; the duration comes from the granule position of the last valid
//! page, located by scanning one maximum page length from the tail and
//! validating candidates by page CRC.

use byteorder::{ByteOrder, LittleEndian};
use memchr::memmem;

use super::has_extension;
use crate::error::Result;
use crate::io::{ByteSource, SourceWindow};
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{AudioInfo, Format, MediaInfo, Nature};

const OGG_MAGIC: &[u8; 4] = b"OggS";
const VORBIS_MAGIC: &[u8; 6] = b"vorbis";

/// Maximum size of one Ogg page: 27-byte header, 255 segment-table entries,
/// 255 * 255 payload bytes.
const MAX_PAGE_SIZE: u64 = 65_307;

const PAGE_HEADER_LEN: usize = 27;

pub struct OggParser;

impl FormatParser for OggParser {
    fn name(&self) -> &'static str {
        "ogg"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Audio]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Ogg]
    }

    fn priority(&self) -> i32 {
        2
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["ogg", "oga"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let magic = io.read_exact_n(4)?;
        if magic != *OGG_MAGIC {
            return Ok(None);
        }

        // Vorbis identification header: it sits at a fixed offset inside the
        // first page (27-byte page header + 1-byte segment table).
        io.seek(28)?;
        let ident = io.read_exact_n(16)?;
        let packet_type = ident[0];
        if packet_type != 1 || ident[1..7] != *VORBIS_MAGIC {
            return Ok(None);
        }
        let num_channels = u32::from(ident[11]);
        let sample_rate = LittleEndian::read_u32(&ident[12..16]);
        if sample_rate == 0 {
            return Ok(None);
        }

        let size = io.size()?;
        let tail_len = size.min(MAX_PAGE_SIZE);
        io.seek(size - tail_len)?;
        let tail = io.read_exact_n(tail_len as usize)?;

        let granule_position = match last_valid_granule(&tail) {
            Some(granule) => granule,
            None => return Ok(None),
        };

        let duration = granule_position as f64 / f64::from(sample_rate);
        Ok(
            AudioInfo::new(Format::Ogg, sample_rate, num_channels, duration)
                .map(MediaInfo::Audio),
        )
    }
}

/// Granule position of the last CRC-valid page inside `tail`.
///
/// `OggS` can occur inside page payloads; candidates are tried back to
/// front and only a page whose checksum verifies wins.
fn last_valid_granule(tail: &[u8]) -> Option<u64> {
    let offsets: Vec<usize> = memmem::find_iter(tail, OGG_MAGIC).collect();
    offsets
        .iter()
        .rev()
        .find_map(|&offset| page_granule(&tail[offset..]))
}

/// Validate an Ogg page starting at the head of `page`; returns its granule
/// position when the structure and checksum hold up.
fn page_granule(page: &[u8]) -> Option<u64> {
    if page.len() < PAGE_HEADER_LEN {
        return None;
    }

    let num_segments = page[26] as usize;
    if num_segments == 0 {
        return None;
    }

    let header_len = PAGE_HEADER_LEN + num_segments;
    if page.len() < header_len {
        return None;
    }

    let payload_len: usize = page[PAGE_HEADER_LEN..header_len]
        .iter()
        .map(|&b| b as usize)
        .sum();
    let page_len = header_len + payload_len;
    if page.len() < page_len {
        return None;
    }

    let stored_checksum = LittleEndian::read_u32(&page[22..26]);
    if page_checksum(&page[..page_len]) != stored_checksum {
        return None;
    }

    Some(LittleEndian::read_u64(&page[6..14]))
}

/// Page CRC: register initialized to 0, checksum bytes (22..26) treated as
/// zero, then `reg = (reg << 8) ^ LOOKUP[(reg >> 24) ^ byte]` per input byte.
fn page_checksum(page: &[u8]) -> u32 {
    let mut reg: u32 = 0;
    for (i, &byte) in page.iter().enumerate() {
        let byte = if (22..26).contains(&i) { 0 } else { byte };
        reg = (reg << 8) ^ CRC_LOOKUP[(((reg >> 24) & 0xFF) as u8 ^ byte) as usize];
    }
    reg
}

const CRC_LOOKUP: [u32; 256] = generate_crc_table();

const fn generate_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let poly: u32 = 0x04C1_1DB7;

    let mut i = 0usize;
    while i < 256 {
        let mut reg = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            if reg & 0x8000_0000 != 0 {
                reg = (reg << 1) ^ poly;
            } else {
                reg <<= 1;
            }
            j += 1;
        }
        table[i] = reg;
        i += 1;
    }
    table
}
