//! Result records and the vocabulary types they are built from.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// The high-level media kind a parser produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Nature {
    Image,
    Audio,
    Document,
    Video,
}

impl fmt::Display for Nature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Nature::Image => "image",
            Nature::Audio => "audio",
            Nature::Document => "document",
            Nature::Video => "video",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Nature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Nature::Image),
            "audio" => Ok(Nature::Audio),
            "document" => Ok(Nature::Document),
            "video" => Ok(Nature::Video),
            other => Err(format!("unknown nature: {other}")),
        }
    }
}

/// Short symbolic tag for a concrete file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Jpg,
    Png,
    Gif,
    Bmp,
    Tif,
    Psd,
    Ogg,
    Wav,
    Aiff,
    Flac,
    Mp3,
    Zip,
    Docx,
    Pdf,
    Mp4,
    Mov,
}

impl Format {
    pub fn tag(self) -> &'static str {
        match self {
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::Bmp => "bmp",
            Format::Tif => "tif",
            Format::Psd => "psd",
            Format::Ogg => "ogg",
            Format::Wav => "wav",
            Format::Aiff => "aiff",
            Format::Flac => "flac",
            Format::Mp3 => "mp3",
            Format::Zip => "zip",
            Format::Docx => "docx",
            Format::Pdf => "pdf",
            Format::Mp4 => "mp4",
            Format::Mov => "mov",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Format::Jpg => "image/jpeg",
            Format::Png => "image/png",
            Format::Gif => "image/gif",
            Format::Bmp => "image/bmp",
            Format::Tif => "image/tiff",
            Format::Psd => "image/vnd.adobe.photoshop",
            Format::Ogg => "audio/ogg",
            Format::Wav => "audio/x-wav",
            Format::Aiff => "audio/x-aiff",
            Format::Flac => "audio/flac",
            Format::Mp3 => "audio/mpeg",
            Format::Zip => "application/zip",
            Format::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Format::Pdf => "application/pdf",
            Format::Mp4 => "video/mp4",
            Format::Mov => "video/quicktime",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Format::Jpg),
            "png" => Ok(Format::Png),
            "gif" => Ok(Format::Gif),
            "bmp" => Ok(Format::Bmp),
            "tif" | "tiff" => Ok(Format::Tif),
            "psd" => Ok(Format::Psd),
            "ogg" => Ok(Format::Ogg),
            "wav" => Ok(Format::Wav),
            "aif" | "aiff" => Ok(Format::Aiff),
            "flac" => Ok(Format::Flac),
            "mp3" => Ok(Format::Mp3),
            "zip" => Ok(Format::Zip),
            "docx" => Ok(Format::Docx),
            "pdf" => Ok(Format::Pdf),
            "mp4" => Ok(Format::Mp4),
            "mov" => Ok(Format::Mov),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Grayscale,
    Rgb,
    Rgba,
    Indexed,
    Cmyk,
}

/// EXIF-style orientation of the stored pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    LeftTop,
    RightTop,
    RightBottom,
    LeftBottom,
}

impl Orientation {
    /// Map the EXIF orientation tag value (1..=8). Anything else is treated
    /// as absent.
    pub fn from_exif(value: u16) -> Option<Self> {
        match value {
            1 => Some(Orientation::TopLeft),
            2 => Some(Orientation::TopRight),
            3 => Some(Orientation::BottomRight),
            4 => Some(Orientation::BottomLeft),
            5 => Some(Orientation::LeftTop),
            6 => Some(Orientation::RightTop),
            7 => Some(Orientation::RightBottom),
            8 => Some(Orientation::LeftBottom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub format: Format,
    pub width_px: u32,
    pub height_px: u32,
    pub color_mode: ColorMode,
    pub has_transparency: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_multiple_frames: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_animation_or_video_frames: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    pub content_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intrinsics: Option<serde_json::Value>,
}

impl ImageInfo {
    /// Returns `None` unless both dimensions are strictly positive.
    pub fn new(
        format: Format,
        width_px: u32,
        height_px: u32,
        color_mode: ColorMode,
        has_transparency: bool,
    ) -> Option<Self> {
        if width_px == 0 || height_px == 0 {
            return None;
        }
        Some(Self {
            format,
            width_px,
            height_px,
            color_mode,
            has_transparency,
            has_multiple_frames: None,
            num_animation_or_video_frames: None,
            orientation: None,
            content_type: format.content_type(),
            intrinsics: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub format: Format,
    pub audio_sample_rate_hz: u32,
    pub num_audio_channels: u32,
    pub media_duration_seconds: f64,
    pub content_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intrinsics: Option<serde_json::Value>,
}

impl AudioInfo {
    /// Returns `None` unless the sample rate and channel count are non-zero
    /// and the duration is strictly positive and finite.
    pub fn new(
        format: Format,
        audio_sample_rate_hz: u32,
        num_audio_channels: u32,
        media_duration_seconds: f64,
    ) -> Option<Self> {
        if audio_sample_rate_hz == 0 || num_audio_channels == 0 {
            return None;
        }
        if !media_duration_seconds.is_finite() || media_duration_seconds <= 0.0 {
            return None;
        }
        Some(Self {
            format,
            audio_sample_rate_hz,
            num_audio_channels,
            media_duration_seconds,
            content_type: format.content_type(),
            intrinsics: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub format: Format,
    pub content_type: &'static str,
}

impl DocumentInfo {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            content_type: format.content_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub format: Format,
    pub width_px: u32,
    pub height_px: u32,
    pub media_duration_seconds: f64,
    pub content_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intrinsics: Option<serde_json::Value>,
}

impl VideoInfo {
    /// Returns `None` unless dimensions are strictly positive and the
    /// duration is strictly positive and finite.
    pub fn new(
        format: Format,
        width_px: u32,
        height_px: u32,
        media_duration_seconds: f64,
    ) -> Option<Self> {
        if width_px == 0 || height_px == 0 {
            return None;
        }
        if !media_duration_seconds.is_finite() || media_duration_seconds <= 0.0 {
            return None;
        }
        Some(Self {
            format,
            width_px,
            height_px,
            media_duration_seconds,
            content_type: format.content_type(),
            intrinsics: None,
        })
    }
}

/// A fully-populated identification result, tagged by nature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "nature", rename_all = "lowercase")]
pub enum MediaInfo {
    Image(ImageInfo),
    Audio(AudioInfo),
    Document(DocumentInfo),
    Video(VideoInfo),
}

impl MediaInfo {
    pub fn nature(&self) -> Nature {
        match self {
            MediaInfo::Image(_) => Nature::Image,
            MediaInfo::Audio(_) => Nature::Audio,
            MediaInfo::Document(_) => Nature::Document,
            MediaInfo::Video(_) => Nature::Video,
        }
    }

    pub fn format(&self) -> Format {
        match self {
            MediaInfo::Image(info) => info.format,
            MediaInfo::Audio(info) => info.format,
            MediaInfo::Document(info) => info.format,
            MediaInfo::Video(info) => info.format,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MediaInfo::Image(info) => info.content_type,
            MediaInfo::Audio(info) => info.content_type,
            MediaInfo::Document(info) => info.content_type,
            MediaInfo::Video(info) => info.content_type,
        }
    }
}
