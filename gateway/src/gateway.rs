//! The prediction gateway.
//!
//! Single entry point that turns raw requests into normalized model results:
//! validate, pick the adapter, call it under the deadline, normalize.
//! Requests are independent; the gateway holds no per-request state and
//! makes exactly one adapter attempt per request.

use std::future::Future;
use std::time::Duration;

use clinical_common::{ImageAnalysisResult, PredictionResult};
use tracing::Instrument;
use uuid::Uuid;

use crate::adapter::{AdapterOutput, AdapterRegistry, AdapterResult, Slot};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::normalize;
use crate::upload::ImageUpload;
use crate::validation::ClinicalRecordInput;

/// Limits applied to every request.
#[derive(Debug, Clone)]
pub struct GatewayPolicy {
    pub deadline: Duration,
    pub max_image_bytes: usize,
    pub recommendation_threshold: f64,
}

impl From<&GatewayConfig> for GatewayPolicy {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            deadline: config.deadline(),
            max_image_bytes: config.max_image_bytes,
            recommendation_threshold: config.recommendation_threshold,
        }
    }
}

impl Default for GatewayPolicy {
    fn default() -> Self {
        Self::from(&GatewayConfig::default())
    }
}

pub struct PredictionGateway {
    adapters: AdapterRegistry,
    policy: GatewayPolicy,
}

impl PredictionGateway {
    pub fn new(adapters: AdapterRegistry, policy: GatewayPolicy) -> Self {
        Self { adapters, policy }
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn policy(&self) -> &GatewayPolicy {
        &self.policy
    }

    /// Predict whether further testing is warranted for a clinical record.
    ///
    /// Validation failures list every invalid field and never reach the
    /// adapter.
    pub async fn predict_clinical(&self, input: ClinicalRecordInput) -> Result<PredictionResult> {
        let record = input.validate()?;

        let slot = self
            .adapters
            .tabular()
            .ok_or_else(|| Error::ModelUnavailable("no tabular adapter configured".to_string()))?;
        let model = slot.adapter().name().to_string();

        let span = tracing::info_span!("inference", request_id = %Uuid::new_v4(), model = %model);
        async {
            let output = self
                .within_deadline(&model, slot, slot.adapter().predict(&record))
                .await;
            let result = output.and_then(|output| {
                normalize::prediction(output.raw, self.policy.recommendation_threshold)
            });
            log_outcome(&model, &result);
            result
        }
        .instrument(span)
        .await
    }

    /// Classify a medical image with the adapter for its analysis type.
    ///
    /// The analysis type is checked before the image, and both before any
    /// adapter is selected.
    pub async fn analyze_image(&self, upload: ImageUpload) -> Result<ImageAnalysisResult> {
        let request = upload.validate(self.policy.max_image_bytes)?;
        let analysis_type = request.analysis_type;

        let slot = self.adapters.image(analysis_type).ok_or_else(|| {
            Error::ModelUnavailable(format!("no adapter configured for {}", analysis_type))
        })?;
        let model = analysis_type.to_string();

        let span = tracing::info_span!(
            "inference",
            request_id = %Uuid::new_v4(),
            model = %model,
            image_bytes = request.bytes.len()
        );
        async {
            let output = self
                .within_deadline(&model, slot, slot.adapter().classify(&request))
                .await;
            let result = output.and_then(|output| normalize::image(analysis_type, output.raw));
            log_outcome(&model, &result);
            result
        }
        .instrument(span)
        .await
    }

    /// Run one adapter call, slot wait included, under the deadline.
    ///
    /// On timeout the call future is dropped; the backend may still finish
    /// its work but the caller is answered at the deadline.
    async fn within_deadline<A, T, F>(
        &self,
        model: &str,
        slot: &Slot<A>,
        call: F,
    ) -> Result<AdapterOutput<T>>
    where
        A: ?Sized,
        F: Future<Output = AdapterResult<T>>,
    {
        let attempt = async {
            let _permit = slot.acquire().await?;
            call.await
        };

        match tokio::time::timeout(self.policy.deadline, attempt).await {
            Ok(Ok(output)) => {
                tracing::debug!(latency_ms = output.latency.as_millis() as u64, "Adapter responded");
                Ok(output)
            }
            Ok(Err(e)) => Err(Error::from_adapter(model, e)),
            Err(_) => Err(Error::InferenceTimeout {
                model: model.to_string(),
                deadline_ms: self.policy.deadline.as_millis(),
            }),
        }
    }
}

fn log_outcome<T>(model: &str, result: &Result<T>) {
    match result {
        Ok(_) => tracing::debug!("Inference complete for {}", model),
        Err(e @ Error::ModelOutputInvalid(_)) => {
            tracing::error!(error = %e, "Model returned output violating its contract")
        }
        Err(e @ (Error::InferenceTimeout { .. } | Error::ModelUnavailable(_))) => {
            tracing::warn!(error = %e, "Inference failed")
        }
        Err(e) => tracing::debug!(error = %e, "Request rejected"),
    }
}
