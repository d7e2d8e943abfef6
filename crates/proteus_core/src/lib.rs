//! proteus_core - media format identification and metadata extraction.
//!
//! Given a byte source (a local file or an HTTP(S) URL), determine the file
//! format and extract header-level intrinsic metadata (dimensions, color
//! mode, sample rate, duration, orientation) without decoding the payload.
//!
//! ```no_run
//! use proteus_core::{parse_file_at, ParseOptions};
//!
//! # fn main() -> proteus_core::Result<()> {
//! let results = parse_file_at("photo.jpg", &ParseOptions::default())?;
//! if let Some(info) = results.first() {
//!     println!("{} ({})", info.format(), info.content_type());
//! }
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod formats;
pub mod io;
pub mod read;
pub mod registry;
pub mod types;

pub use dispatch::{dispatch, parse_file_at, parse_http, ParseOptions, ResultsMode};
pub use error::{Error, Result};
pub use io::{
    ByteSource, FileSource, HttpConfig, HttpSource, MemorySource, SourceWindow,
};
pub use read::ReadExt;
pub use registry::{FormatParser, ParserRegistry};
pub use types::{
    AudioInfo, ColorMode, DocumentInfo, Format, ImageInfo, MediaInfo, Nature, Orientation,
    VideoInfo,
};
