//! Scripted assistant endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::body_rejection;
use crate::assistant::{self, Reply};
use crate::error::{Result, ValidationErrors};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub replies: Vec<Reply>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// POST /chat - Canned replies for the keywords in a message.
async fn chat(
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload.map_err(body_rejection)?;

    if request.message.trim().is_empty() {
        let mut errors = ValidationErrors::default();
        errors.push("message", "must not be blank");
        return Err(errors.into());
    }

    Ok(Json(ChatResponse {
        replies: assistant::respond(&request.message),
    }))
}
