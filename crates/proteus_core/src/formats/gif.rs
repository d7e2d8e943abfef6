//! GIF header parsing with frame counting for animations.

use byteorder::{ByteOrder, LittleEndian};

use super::has_extension;
use crate::error::Result;
use crate::io::SourceWindow;
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{ColorMode, Format, ImageInfo, MediaInfo, Nature};

const GIF87A: &[u8; 6] = b"GIF87a";
const GIF89A: &[u8; 6] = b"GIF89a";

const TRAILER: u8 = 0x3B;
const IMAGE_SEPARATOR: u8 = 0x2C;
const EXTENSION: u8 = 0x21;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;

/// The block walk happens over an in-memory window of at most this many
/// bytes; animations whose frame table extends past it report the frames
/// seen inside the window.
const SCAN_WINDOW: usize = 512 * 1024;

pub struct GifParser;

impl FormatParser for GifParser {
    fn name(&self) -> &'static str {
        "gif"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Image]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Gif]
    }

    fn priority(&self) -> i32 {
        2
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["gif"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let header = io.read_exact_n(6)?;
        if header != *GIF87A && header != *GIF89A {
            return Ok(None);
        }

        let descriptor = io.read_exact_n(7)?;
        let width = u32::from(LittleEndian::read_u16(&descriptor[0..2]));
        let height = u32::from(LittleEndian::read_u16(&descriptor[2..4]));
        let packed = descriptor[4];

        let mut cursor = BlockCursor::new(io.read_up_to(SCAN_WINDOW)?);
        if packed & 0x80 != 0 {
            cursor.skip(3 * (1usize << ((packed & 0x07) + 1)));
        }

        let scan = walk_blocks(&mut cursor);

        Ok(
            ImageInfo::new(Format::Gif, width, height, ColorMode::Indexed, scan.transparency)
                .map(|mut info| {
                    if scan.frames > 0 {
                        info.has_multiple_frames = Some(scan.frames > 1);
                        info.num_animation_or_video_frames = Some(scan.frames);
                    }
                    MediaInfo::Image(info)
                }),
        )
    }
}

#[derive(Default)]
struct BlockScan {
    frames: u32,
    transparency: bool,
}

/// Walk the data-stream blocks after the logical screen descriptor, counting
/// image descriptors and noting transparency flags. Truncated streams keep
/// whatever was counted up to the cut.
fn walk_blocks(cursor: &mut BlockCursor) -> BlockScan {
    let mut scan = BlockScan::default();

    while let Some(introducer) = cursor.next_u8() {
        match introducer {
            TRAILER => break,
            IMAGE_SEPARATOR => {
                scan.frames += 1;
                // Image descriptor: position, dimensions, packed flags.
                let Some(descriptor) = cursor.take(9) else {
                    break;
                };
                let packed = descriptor[8];
                if packed & 0x80 != 0 {
                    cursor.skip(3 * (1usize << ((packed & 0x07) + 1)));
                }
                cursor.skip(1); // LZW minimum code size
                if !cursor.skip_sub_blocks() {
                    break;
                }
            }
            EXTENSION => {
                let Some(label) = cursor.next_u8() else {
                    break;
                };
                if label == GRAPHIC_CONTROL_LABEL {
                    if let Some(block) = cursor.peek_first_sub_block() {
                        if block.first().is_some_and(|packed| packed & 0x01 != 0) {
                            scan.transparency = true;
                        }
                    }
                }
                if !cursor.skip_sub_blocks() {
                    break;
                }
            }
            _ => break, // unknown introducer: stop counting, keep the result
        }
    }

    scan
}

struct BlockCursor {
    data: Vec<u8>,
    pos: usize,
}

impl BlockCursor {
    fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    fn next_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let slice = self.data.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(slice)
    }

    fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.data.len());
    }

    fn peek_first_sub_block(&self) -> Option<&[u8]> {
        let len = *self.data.get(self.pos)? as usize;
        self.data.get(self.pos + 1..self.pos + 1 + len)
    }

    /// Advance past a chain of length-prefixed sub-blocks, including the
    /// zero terminator. `false` when the stream ends mid-chain.
    fn skip_sub_blocks(&mut self) -> bool {
        loop {
            let Some(len) = self.next_u8() else {
                return false;
            };
            if len == 0 {
                return true;
            }
            if self.pos + len as usize > self.data.len() {
                return false;
            }
            self.pos += len as usize;
        }
    }
}
