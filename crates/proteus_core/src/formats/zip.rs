//! ZIP archive identification via the end-of-central-directory record, with
//! OOXML word-document reclassification.

use byteorder::{ByteOrder, LittleEndian};
use memchr::memmem;

use super::has_extension;
use crate::error::Result;
use crate::io::{ByteSource, SourceWindow};
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{DocumentInfo, Format, MediaInfo, Nature};

const LOCAL_FILE_SIG: &[u8; 4] = b"PK\x03\x04";
const EMPTY_ARCHIVE_SIG: &[u8; 4] = b"PK\x05\x06";
const SPANNED_SIG: &[u8; 4] = b"PK\x07\x08";
const EOCD_SIG: &[u8; 4] = b"PK\x05\x06";
const CENTRAL_SIG: &[u8; 4] = b"PK\x01\x02";

/// EOCD record (22 bytes) plus the maximum trailing comment.
const EOCD_SEARCH_LEN: u64 = 22 + 65_535;

const CENTRAL_HEADER_LEN: usize = 46;
const MAX_DIRECTORY_BYTES: usize = 512 * 1024;
const MAX_NAMES: usize = 2048;

pub struct ZipParser;

impl FormatParser for ZipParser {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Document]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Zip, Format::Docx]
    }

    fn priority(&self) -> i32 {
        4
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["zip", "docx", "xlsx", "pptx"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let magic = io.read_exact_n(4)?;
        if magic != *LOCAL_FILE_SIG && magic != *EMPTY_ARCHIVE_SIG && magic != *SPANNED_SIG {
            return Ok(None);
        }

        let size = io.size()?;
        let tail_len = size.min(EOCD_SEARCH_LEN);
        io.seek(size - tail_len)?;
        let tail = io.read_exact_n(tail_len as usize)?;

        let Some(eocd_offset) = memmem::rfind(&tail, EOCD_SIG) else {
            return Ok(None);
        };
        let eocd = &tail[eocd_offset..];
        if eocd.len() < 22 {
            return Ok(None);
        }

        let entry_count = LittleEndian::read_u16(&eocd[10..12]);
        let directory_offset = u64::from(LittleEndian::read_u32(&eocd[16..20]));

        let format = if entry_count > 0 && directory_offset < size {
            io.seek(directory_offset)?;
            let directory = io.read_up_to(MAX_DIRECTORY_BYTES)?;
            if is_word_document(&directory, entry_count) {
                Format::Docx
            } else {
                Format::Zip
            }
        } else {
            Format::Zip
        };

        Ok(Some(MediaInfo::Document(DocumentInfo::new(format))))
    }
}

/// Walk central-directory entry names looking for the OOXML content-types
/// manifest together with the word-processing part.
fn is_word_document(directory: &[u8], entry_count: u16) -> bool {
    let mut has_content_types = false;
    let mut has_word_part = false;

    let mut pos = 0usize;
    for _ in 0..entry_count.min(MAX_NAMES as u16) {
        let Some(header) = directory.get(pos..pos + CENTRAL_HEADER_LEN) else {
            break;
        };
        if &header[0..4] != CENTRAL_SIG {
            break;
        }
        let name_len = LittleEndian::read_u16(&header[28..30]) as usize;
        let extra_len = LittleEndian::read_u16(&header[30..32]) as usize;
        let comment_len = LittleEndian::read_u16(&header[32..34]) as usize;

        let Some(name) = directory.get(pos + CENTRAL_HEADER_LEN..pos + CENTRAL_HEADER_LEN + name_len)
        else {
            break;
        };
        if name == b"[Content_Types].xml" {
            has_content_types = true;
        }
        if name.starts_with(b"word/") {
            has_word_part = true;
        }
        if has_content_types && has_word_part {
            return true;
        }

        pos += CENTRAL_HEADER_LEN + name_len + extra_len + comment_len;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    fn central_entry(name: &[u8]) -> Vec<u8> {
        let mut entry = CENTRAL_SIG.to_vec();
        entry.extend_from_slice(&[0u8; 24]); // versions through uncompressed size
        entry.extend_from_slice(&(name.len() as u16).to_le_bytes());
        entry.extend_from_slice(&0u16.to_le_bytes()); // extra
        entry.extend_from_slice(&0u16.to_le_bytes()); // comment
        entry.extend_from_slice(&[0u8; 12]); // disk, attrs, local offset
        entry.extend_from_slice(name);
        entry
    }

    fn build_zip(names: &[&[u8]]) -> Vec<u8> {
        let mut data = LOCAL_FILE_SIG.to_vec();
        data.extend_from_slice(&[0u8; 26]); // rest of a minimal local header
        let directory_offset = data.len() as u32;

        let mut directory = Vec::new();
        for name in names {
            directory.extend_from_slice(&central_entry(name));
        }
        data.extend_from_slice(&directory);

        data.extend_from_slice(EOCD_SIG);
        data.extend_from_slice(&[0u8; 4]); // disk numbers
        data.extend_from_slice(&(names.len() as u16).to_le_bytes());
        data.extend_from_slice(&(names.len() as u16).to_le_bytes());
        data.extend_from_slice(&(directory.len() as u32).to_le_bytes());
        data.extend_from_slice(&directory_offset.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes()); // comment length
        data
    }

    fn parse(data: Vec<u8>) -> Option<MediaInfo> {
        let mut source = MemorySource::new(data);
        let mut window = SourceWindow::new(&mut source).unwrap();
        ZipParser.parse(&mut window).unwrap()
    }

    #[test]
    fn plain_zip_is_a_document() {
        let result = parse(build_zip(&[b"readme.txt", b"src/lib.rs"])).unwrap();
        let MediaInfo::Document(info) = result else {
            panic!("expected a document result");
        };
        assert_eq!(info.format, Format::Zip);
        assert_eq!(info.content_type, "application/zip");
    }

    #[test]
    fn word_document_is_reclassified() {
        let result = parse(build_zip(&[
            b"[Content_Types].xml",
            b"_rels/.rels",
            b"word/document.xml",
        ]))
        .unwrap();
        let MediaInfo::Document(info) = result else {
            panic!("expected a document result");
        };
        assert_eq!(info.format, Format::Docx);
        assert!(info.content_type.contains("wordprocessingml"));
    }

    #[test]
    fn spreadsheet_stays_zip() {
        // Other OOXML flavors keep the generic classification.
        let result = parse(build_zip(&[b"[Content_Types].xml", b"xl/workbook.xml"])).unwrap();
        let MediaInfo::Document(info) = result else {
            panic!("expected a document result");
        };
        assert_eq!(info.format, Format::Zip);
    }

    #[test]
    fn empty_archive_is_recognized() {
        let mut data = EOCD_SIG.to_vec();
        data.extend_from_slice(&[0u8; 18]);
        let MediaInfo::Document(info) = parse(data).unwrap() else {
            panic!("expected a document result");
        };
        assert_eq!(info.format, Format::Zip);
    }

    #[test]
    fn missing_eocd_is_rejected() {
        let mut data = LOCAL_FILE_SIG.to_vec();
        data.extend_from_slice(&[0u8; 64]);
        assert!(parse(data).is_none());
    }

    #[test]
    fn non_zip_is_rejected() {
        assert!(parse(b"not a zip at all".to_vec()).is_none());
    }

    #[test]
    fn filename_hint() {
        assert!(ZipParser.likely_match("bundle.zip"));
        assert!(ZipParser.likely_match("report.docx"));
        assert!(!ZipParser.likely_match("report.pdf"));
    }
}
