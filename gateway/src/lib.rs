//! Clinical prediction gateway.
//!
//! Validates clinical records and medical images, routes them to the model
//! adapter for the request, enforces a deadline and normalizes the model's
//! output into a stable response contract.

pub mod adapter;
pub mod api;
pub mod assistant;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod normalize;
pub mod recommendations;
pub mod state;
pub mod test_util;
pub mod upload;
pub mod validation;

pub use adapter::{AdapterRegistry, ImageAdapter, TabularAdapter};
pub use config::Config;
pub use error::{Error, Result};
pub use gateway::{GatewayPolicy, PredictionGateway};
pub use state::AppState;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;

/// Build the CORS layer. A `*` entry allows any origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the application router.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .merge(api::router(&state.config.gateway))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
