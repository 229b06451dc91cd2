//! Clinical record prediction endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use clinical_common::PredictionResult;

use super::body_rejection;
use crate::error::Result;
use crate::state::AppState;
use crate::validation::ClinicalRecordInput;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/predict", post(predict))
}

/// POST /predict - Test recommendation for a clinical record.
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ClinicalRecordInput>, JsonRejection>,
) -> Result<Json<PredictionResult>> {
    let Json(input) = payload.map_err(body_rejection)?;
    let result = state.gateway.predict_clinical(input).await?;
    Ok(Json(result))
}
