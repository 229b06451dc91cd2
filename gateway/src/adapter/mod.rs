//! Model adapter abstraction layer.
//!
//! This module defines the traits that bind the gateway to concrete
//! inference backends (remote model services, in-process models, test
//! stubs). The gateway applies deadlines; adapters only report results or
//! failures.

mod registry;
mod remote;

pub use registry::{AdapterRegistry, AdapterRegistryBuilder, Slot};
pub use remote::{RemoteImageAdapter, RemoteTabularAdapter};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use clinical_common::{AnalysisType, ClinicalRecord};
use serde::{Deserialize, Serialize};

use crate::upload::ImageAnalysisRequest;

/// Failure reported by an adapter.
///
/// Failures are always explicit; an adapter never signals an error through
/// a sentinel probability.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    /// The backend could not be reached.
    #[error("unreachable: {0}")]
    Unavailable(String),

    /// The backend was reached but reported an error.
    #[error("failed: {0}")]
    Failed(String),

    /// The backend answered with something that is not a valid result.
    #[error("invalid output: {0}")]
    InvalidOutput(String),
}

pub type AdapterResult<T> = std::result::Result<AdapterOutput<T>, AdapterError>;

/// A raw adapter result together with how long the backend took.
#[derive(Debug, Clone)]
pub struct AdapterOutput<T> {
    pub raw: T,
    pub latency: Duration,
}

impl<T> AdapterOutput<T> {
    /// Wrap `raw`, measuring latency from `started`.
    pub fn since(started: Instant, raw: T) -> Self {
        Self {
            raw,
            latency: started.elapsed(),
        }
    }
}

/// Raw output of the tabular risk model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub prediction: f64,
    pub confidence: f64,
    #[serde(default)]
    pub recommended_tests: Vec<String>,
}

/// Raw output of an image classifier: a JSON object of arbitrary shape,
/// mostly label to probability.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawImageOutput(pub serde_json::Map<String, serde_json::Value>);

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for RawImageOutput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Adapter for the tabular risk classifier.
#[async_trait]
pub trait TabularAdapter: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    async fn predict(&self, record: &ClinicalRecord) -> AdapterResult<RawPrediction>;
}

/// Adapter for one image classifier.
#[async_trait]
pub trait ImageAdapter: Send + Sync {
    /// The analysis this adapter serves.
    fn analysis_type(&self) -> AnalysisType;

    async fn classify(&self, request: &ImageAnalysisRequest) -> AdapterResult<RawImageOutput>;
}
