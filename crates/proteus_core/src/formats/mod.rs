//! Format-specific header decoders.
//!
//! Every parser follows the same contract: gate on magic bytes with small
//! bounded reads, decode only what identification needs, and return a fully
//! populated record or nothing. Payloads are never decoded.

mod aiff;
mod bmp;
mod flac;
mod gif;
mod jpeg;
mod mp3;
mod mp4;
mod ogg;
mod pdf;
mod png;
mod psd;
mod tiff;
mod wav;
mod zip;

pub use aiff::AiffParser;
pub use bmp::BmpParser;
pub use flac::FlacParser;
pub use gif::GifParser;
pub use jpeg::JpegParser;
pub use mp3::Mp3Parser;
pub use mp4::Mp4Parser;
pub use ogg::OggParser;
pub use pdf::PdfParser;
pub use png::PngParser;
pub use psd::PsdParser;
pub use tiff::TiffParser;
pub use wav::WavParser;
pub use zip::ZipParser;

/// Case-insensitive extension check used by the filename hints.
pub(crate) fn has_extension(filename: &str, extensions: &[&str]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)),
        None => false,
    }
}
