//! Image analysis endpoint.

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::post;
use axum::{Json, Router};
use clinical_common::ImageAnalysisResult;

use crate::error::{Error, Result};
use crate::state::AppState;
use crate::upload::{self, ImageUpload};

/// Multipart field names accepted for the image.
const IMAGE_FIELDS: [&str; 2] = ["file", "image"];
/// Room for multipart boundaries and part headers on top of the image cap.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(max_image_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze/:analysis_type", post(analyze))
        .layer(DefaultBodyLimit::max(max_image_bytes.saturating_add(MULTIPART_OVERHEAD)))
}

fn multipart_error(e: MultipartError) -> Error {
    Error::InvalidImage(format!("unreadable multipart body: {}", e))
}

/// POST /analyze/:analysis_type - Classify an uploaded medical image.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(analysis_type): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ImageAnalysisResult>> {
    // Reject unknown types before touching the body
    upload::parse_analysis_type(&analysis_type)?;

    let mut multipart =
        multipart.map_err(|e| Error::InvalidImage(format!("expected a multipart upload: {}", e)))?;

    let field = loop {
        match multipart.next_field().await.map_err(multipart_error)? {
            Some(field) if field.name().is_some_and(|name| IMAGE_FIELDS.contains(&name)) => {
                break field
            }
            Some(_) => continue,
            None => {
                return Err(Error::InvalidImage(
                    "missing multipart field 'file'".to_string(),
                ))
            }
        }
    };

    let upload = ImageUpload {
        analysis_type,
        content_type: field.content_type().map(String::from),
        file_name: field.file_name().map(String::from),
        bytes: field.bytes().await.map_err(multipart_error)?,
    };
    tracing::debug!(
        "Received {} byte image for {}",
        upload.bytes.len(),
        upload.analysis_type
    );

    let result = state.gateway.analyze_image(upload).await?;
    Ok(Json(result))
}
