//! HTTP API of the clinical gateway.

pub mod analyze;
pub mod chat;
pub mod health;
pub mod predict;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::Router;

use crate::config::GatewayConfig;
use crate::error::{Error, ValidationErrors};
use crate::state::AppState;

/// Build the API router.
pub fn router(config: &GatewayConfig) -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(predict::router())
        .merge(analyze::router(config.max_image_bytes))
        .merge(chat::router())
}

/// A body that is not a JSON object is reported as an invalid `body` field.
/// Wrongly typed fields inside an object are reported by validation.
pub(crate) fn body_rejection(rejection: JsonRejection) -> Error {
    let mut errors = ValidationErrors::default();
    errors.push("body", rejection.body_text());
    errors.into()
}
