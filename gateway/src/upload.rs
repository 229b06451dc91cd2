//! Image upload validation.

use axum::body::Bytes;
use clinical_common::{AnalysisType, ImageFormat};

use crate::error::{Error, Result};

/// Content type that carries no format claim and is checked by sniffing only.
const OPAQUE_CONTENT_TYPE: &str = "application/octet-stream";

/// An image upload as received, before any checks.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub analysis_type: String,
    /// Content type declared by the client, if any.
    pub content_type: Option<String>,
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// A validated image classification request.
#[derive(Debug, Clone)]
pub struct ImageAnalysisRequest {
    pub analysis_type: AnalysisType,
    /// Format detected from the image's magic bytes.
    pub format: ImageFormat,
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Parse an analysis type from its path segment.
pub fn parse_analysis_type(raw: &str) -> Result<AnalysisType> {
    raw.parse()
        .map_err(|e: clinical_common::UnknownAnalysisType| Error::UnsupportedAnalysisType(e.to_string()))
}

impl ImageUpload {
    /// Check type, size and format. The analysis type is checked first.
    pub fn validate(self, max_bytes: usize) -> Result<ImageAnalysisRequest> {
        let analysis_type = parse_analysis_type(&self.analysis_type)?;

        if self.bytes.is_empty() {
            return Err(Error::InvalidImage("image is empty".to_string()));
        }
        if self.bytes.len() > max_bytes {
            return Err(Error::InvalidImage(format!(
                "image is {} bytes, maximum is {}",
                self.bytes.len(),
                max_bytes
            )));
        }

        let format = ImageFormat::sniff(&self.bytes).ok_or_else(|| {
            Error::InvalidImage("unrecognized image format (expected JPEG, PNG, GIF, BMP, TIFF or WebP)".to_string())
        })?;

        if let Some(declared) = self.content_type.as_deref() {
            if !declared.trim().eq_ignore_ascii_case(OPAQUE_CONTENT_TYPE) {
                match ImageFormat::from_mime(declared) {
                    Some(claimed) if claimed == format => {}
                    Some(claimed) => {
                        return Err(Error::InvalidImage(format!(
                            "declared content type {} does not match image data ({})",
                            claimed, format
                        )))
                    }
                    None => {
                        return Err(Error::InvalidImage(format!(
                            "unsupported content type {}",
                            declared
                        )))
                    }
                }
            }
        }

        Ok(ImageAnalysisRequest {
            analysis_type,
            format,
            file_name: self.file_name,
            bytes: self.bytes,
        })
    }
}
