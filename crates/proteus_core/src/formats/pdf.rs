//! PDF identification.

use super::has_extension;
use crate::error::Result;
use crate::io::SourceWindow;
use crate::read::ReadExt;
use crate::registry::FormatParser;
use crate::types::{DocumentInfo, Format, MediaInfo, Nature};

const PDF_MAGIC: &[u8; 5] = b"%PDF-";

pub struct PdfParser;

impl FormatParser for PdfParser {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn natures(&self) -> &'static [Nature] {
        &[Nature::Document]
    }

    fn formats(&self) -> &'static [Format] {
        &[Format::Pdf]
    }

    fn priority(&self) -> i32 {
        4
    }

    fn likely_match(&self, filename: &str) -> bool {
        has_extension(filename, &["pdf"])
    }

    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
        let magic = io.read_exact_n(5)?;
        if magic != *PDF_MAGIC {
            return Ok(None);
        }
        // The version digits follow the magic; malformed ones still identify
        // as PDF, so they are not validated here.
        Ok(Some(MediaInfo::Document(DocumentInfo::new(Format::Pdf))))
    }
}
