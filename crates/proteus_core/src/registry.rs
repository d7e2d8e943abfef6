//! Parser registry.
//!
//! Parsers are long-lived, stateless values registered once at startup. The
//! registry is populated by an explicit list rather than module-load side
//! effects, then shared immutably by every parse.

use std::sync::OnceLock;

use crate::error::Result;
use crate::formats;
use crate::io::SourceWindow;
use crate::types::{Format, MediaInfo, Nature};

/// A format-specific header decoder.
///
/// Implementations must be stateless or internally re-entrant: one instance
/// serves every concurrent parse.
pub trait FormatParser: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn natures(&self) -> &'static [Nature];

    fn formats(&self) -> &'static [Format];

    /// Dispatch order among candidates; lower runs earlier, ties broken by
    /// registration order. 0 is reserved for the most common format (JPEG).
    fn priority(&self) -> i32 {
        0
    }

    /// Filename-based hint that biases dispatch order. Never exclusionary:
    /// a `false` here only demotes the parser to the later band.
    fn likely_match(&self, filename: &str) -> bool;

    /// Attempt to recognize the stream. `Ok(None)` means "not this format";
    /// safe-read failures bubbling out via `?` mean the same thing to the
    /// dispatch loop.
    fn parse(&self, io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>>;
}

struct Registration {
    parser: Box<dyn FormatParser>,
    order: usize,
}

/// Registry of format parsers keyed by nature, format and priority.
pub struct ParserRegistry {
    entries: Vec<Registration>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registry with every built-in parser, in the canonical order.
    pub fn with_default_parsers() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(formats::JpegParser));
        registry.register(Box::new(formats::PngParser));
        registry.register(Box::new(formats::GifParser));
        registry.register(Box::new(formats::BmpParser));
        registry.register(Box::new(formats::TiffParser));
        registry.register(Box::new(formats::PsdParser));
        registry.register(Box::new(formats::OggParser));
        registry.register(Box::new(formats::WavParser));
        registry.register(Box::new(formats::AiffParser));
        registry.register(Box::new(formats::FlacParser));
        registry.register(Box::new(formats::Mp3Parser));
        registry.register(Box::new(formats::Mp4Parser));
        registry.register(Box::new(formats::ZipParser));
        registry.register(Box::new(formats::PdfParser));
        registry
    }

    /// The process-wide registry, built on first use and immutable after.
    pub fn global() -> &'static ParserRegistry {
        static REGISTRY: OnceLock<ParserRegistry> = OnceLock::new();
        REGISTRY.get_or_init(ParserRegistry::with_default_parsers)
    }

    pub fn register(&mut self, parser: Box<dyn FormatParser>) {
        let order = self.entries.len();
        self.entries.push(Registration { parser, order });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Select and order the parsers to try for one input.
    ///
    /// Candidates are filtered by the requested natures and formats, then
    /// split into two bands: parsers whose filename hint fires run first.
    /// Within each band, priority then registration order decide.
    pub fn candidates(
        &self,
        natures: Option<&[Nature]>,
        formats: Option<&[Format]>,
        filename: Option<&str>,
    ) -> Vec<&dyn FormatParser> {
        let mut selected: Vec<&Registration> = self
            .entries
            .iter()
            .filter(|entry| match natures {
                Some(wanted) => entry.parser.natures().iter().any(|n| wanted.contains(n)),
                None => true,
            })
            .filter(|entry| match formats {
                Some(wanted) => entry.parser.formats().iter().any(|f| wanted.contains(f)),
                None => true,
            })
            .collect();

        selected.sort_by_key(|entry| {
            let hinted = filename.is_some_and(|f| entry.parser.likely_match(f));
            (!hinted, entry.parser.priority(), entry.order)
        });

        selected
            .into_iter()
            .map(|entry| entry.parser.as_ref())
            .collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_default_parsers()
    }
}
