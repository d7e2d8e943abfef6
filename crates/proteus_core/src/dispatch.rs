//! Candidate selection and the parse loop.

use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::io::{ByteSource, FileSource, HttpConfig, HttpSource, SourceWindow};
use crate::registry::ParserRegistry;
use crate::types::{Format, MediaInfo, Nature};

/// Whether dispatch stops at the first recognizing parser or runs them all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultsMode {
    #[default]
    First,
    All,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseOptions {
    pub results: ResultsMode,
    /// Restrict candidates to parsers producing at least one of these
    /// natures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natures: Option<Vec<Nature>>,
    /// Restrict candidates to parsers handling at least one of these
    /// formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<Format>>,
    /// Extra HTTP request headers. Accepted and ignored for local parses.
    #[serde(skip)]
    pub headers: Vec<(String, String)>,
}

/// Identify a local file.
///
/// Returns every recognized interpretation in `All` mode, at most one in
/// `First` mode. An empty vector means no registered parser recognized the
/// input.
pub fn parse_file_at(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Vec<MediaInfo>> {
    let path = path.as_ref();
    let mut source = FileSource::open(path)?;
    let filename = path.file_name().and_then(|n| n.to_str()).map(str::to_owned);
    dispatch(
        ParserRegistry::global(),
        &mut source,
        filename.as_deref(),
        options,
    )
}

/// Identify a remote object via HTTP range requests.
pub fn parse_http(url: &str, options: &ParseOptions) -> Result<Vec<MediaInfo>> {
    let config = HttpConfig {
        headers: options.headers.clone(),
        ..HttpConfig::default()
    };
    let mut source = HttpSource::open(url, config)?;
    let filename = filename_from_url(url);
    dispatch(
        ParserRegistry::global(),
        &mut source,
        filename.as_deref(),
        options,
    )
}

/// Run the ordered candidates of `registry` against `source`.
///
/// Each candidate sees a fresh window at offset 0. Parser-local failures
/// (short reads, structure mismatches) count as "not this format";
/// infrastructure failures abort the whole parse.
pub fn dispatch(
    registry: &ParserRegistry,
    source: &mut dyn ByteSource,
    filename: Option<&str>,
    options: &ParseOptions,
) -> Result<Vec<MediaInfo>> {
    let candidates = registry.candidates(
        options.natures.as_deref(),
        options.formats.as_deref(),
        filename,
    );

    let mut results = Vec::new();
    for parser in candidates {
        let mut window = SourceWindow::new(&mut *source)?;
        match parser.parse(&mut window) {
            Ok(Some(info)) => {
                debug!("{}: recognized as {}", parser.name(), info.format());
                results.push(info);
                if options.results == ResultsMode::First {
                    break;
                }
            }
            Ok(None) => {
                debug!("{}: no match", parser.name());
            }
            Err(err) if err.is_parser_local() => {
                debug!("{}: no match ({err})", parser.name());
            }
            Err(err) => return Err(err),
        }
    }

    Ok(results)
}

/// Trailing path segment of a URL, with query and fragment stripped. Used
/// only as an ordering hint.
fn filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
    let (_, name) = path.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::io::MemorySource;
    use crate::registry::FormatParser;

    struct AlwaysHttpError;

    impl FormatParser for AlwaysHttpError {
        fn name(&self) -> &'static str {
            "boom"
        }
        fn natures(&self) -> &'static [Nature] {
            &[Nature::Image]
        }
        fn formats(&self) -> &'static [Format] {
            &[Format::Png]
        }
        fn likely_match(&self, _filename: &str) -> bool {
            false
        }
        fn parse(&self, _io: &mut SourceWindow<'_>) -> Result<Option<MediaInfo>> {
            Err(Error::HttpRefused {
                status: 403,
                message: "Forbidden".into(),
            })
        }
    }

    #[test]
    fn filename_from_url_extracts_last_segment() {
        assert_eq!(
            filename_from_url("https://example.com/a/b/photo.png"),
            Some("photo.png".to_string())
        );
        assert_eq!(
            filename_from_url("https://example.com/a/photo.png?x=1#frag"),
            Some("photo.png".to_string())
        );
        assert_eq!(filename_from_url("https://example.com/"), None);
        assert_eq!(filename_from_url("https://example.com"), None);
    }

    #[test]
    fn empty_input_yields_no_results() {
        let registry = ParserRegistry::with_default_parsers();
        let mut source = MemorySource::new(Vec::new());

        let first = dispatch(&registry, &mut source, None, &ParseOptions::default()).unwrap();
        assert!(first.is_empty());

        let all = dispatch(
            &registry,
            &mut source,
            None,
            &ParseOptions {
                results: ResultsMode::All,
                ..ParseOptions::default()
            },
        )
        .unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn unrecognized_bytes_yield_no_results() {
        let registry = ParserRegistry::with_default_parsers();
        let mut source = MemorySource::new(vec![0u8; 64]);
        let results = dispatch(&registry, &mut source, None, &ParseOptions::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn infrastructure_errors_abort_dispatch() {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(AlwaysHttpError));

        let mut source = MemorySource::new(vec![0u8; 8]);
        let err = dispatch(&registry, &mut source, None, &ParseOptions::default()).unwrap_err();
        assert_eq!(err.http_status(), Some(403));
    }
}
