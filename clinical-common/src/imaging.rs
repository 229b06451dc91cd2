//! Medical image analysis types.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kinds of image classification the gateway can route.
///
/// Each variant maps to exactly one image adapter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisType {
    ChestXray,
    SkinCancer,
    BrainTumor,
}

impl AnalysisType {
    /// All analysis types for iteration.
    pub const ALL: [AnalysisType; 3] = [
        AnalysisType::ChestXray,
        AnalysisType::SkinCancer,
        AnalysisType::BrainTumor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::ChestXray => "chest-xray",
            AnalysisType::SkinCancer => "skin-cancer",
            AnalysisType::BrainTumor => "brain-tumor",
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known analysis type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAnalysisType(pub String);

impl std::fmt::Display for UnknownAnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' (expected one of: chest-xray, skin-cancer, brain-tumor)",
            self.0
        )
    }
}

impl std::error::Error for UnknownAnalysisType {}

impl FromStr for AnalysisType {
    type Err = UnknownAnalysisType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownAnalysisType(s.to_string()))
    }
}

/// Image container formats accepted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// Default file extension, used when forwarding uploads without a name.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Webp => "webp",
        }
    }

    /// Map a declared MIME type to a format. Parameters are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/gif" => Some(ImageFormat::Gif),
            "image/bmp" | "image/x-ms-bmp" => Some(ImageFormat::Bmp),
            "image/tiff" => Some(ImageFormat::Tiff),
            "image/webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    /// Detect the format from magic bytes (never from the extension or header).
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }
        // BMP: "BM" followed by a 4-byte file size; require the full header length
        if bytes.len() >= 14 && bytes.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }
        if bytes.starts_with(&[b'I', b'I', 0x2A, 0x00]) || bytes.starts_with(&[b'M', b'M', 0x00, 0x2A]) {
            return Some(ImageFormat::Tiff);
        }
        if bytes.len() >= 12 && bytes[..4] == *b"RIFF" && bytes[8..12] == *b"WEBP" {
            return Some(ImageFormat::Webp);
        }
        None
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Gateway response for `POST /analyze/{analysis_type}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysisResult {
    /// Model certainty, in [0, 1].
    pub confidence: f64,
    /// Label name to probability. Values need not sum to 1.
    pub class_probabilities: BTreeMap<String, f64>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}
