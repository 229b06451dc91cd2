//! HTTP model-serving adapters.
//!
//! Both adapters talk to a model service over plain HTTP: the tabular model
//! receives the clinical record as JSON, image classifiers receive the image
//! as a multipart upload in the `file` field.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use clinical_common::{AnalysisType, ClinicalRecord};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use super::{
    AdapterError, AdapterOutput, AdapterResult, ImageAdapter, RawImageOutput, RawPrediction,
    TabularAdapter,
};
use crate::config::RemoteAdapterConfig;
use crate::upload::ImageAnalysisRequest;

/// Longest error body echoed back in an adapter failure.
const MAX_ERROR_BODY: usize = 512;

fn build_client(config: &RemoteAdapterConfig) -> Result<Client, reqwest::Error> {
    // No overall request timeout: the gateway owns the deadline.
    Client::builder()
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .build()
}

/// Tabular risk model served over HTTP.
pub struct RemoteTabularAdapter {
    http_client: Client,
    url: String,
}

impl RemoteTabularAdapter {
    pub fn new(config: &RemoteAdapterConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: build_client(config)?,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl TabularAdapter for RemoteTabularAdapter {
    fn name(&self) -> &str {
        "tabular"
    }

    async fn predict(&self, record: &ClinicalRecord) -> AdapterResult<RawPrediction> {
        let started = Instant::now();

        let response = self
            .http_client
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(transport_error)?;

        let raw = decode::<RawPrediction>(response).await?;
        Ok(AdapterOutput::since(started, raw))
    }
}

/// Image classifier served over HTTP.
pub struct RemoteImageAdapter {
    http_client: Client,
    url: String,
    analysis_type: AnalysisType,
}

impl RemoteImageAdapter {
    pub fn new(
        analysis_type: AnalysisType,
        config: &RemoteAdapterConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: build_client(config)?,
            url: config.url.clone(),
            analysis_type,
        })
    }
}

#[async_trait]
impl ImageAdapter for RemoteImageAdapter {
    fn analysis_type(&self) -> AnalysisType {
        self.analysis_type
    }

    async fn classify(&self, request: &ImageAnalysisRequest) -> AdapterResult<RawImageOutput> {
        let started = Instant::now();

        let file_name = request
            .file_name
            .clone()
            .unwrap_or_else(|| format!("upload.{}", request.format.extension()));
        let part = Part::bytes(request.bytes.to_vec())
            .file_name(file_name)
            .mime_str(request.format.mime_type())
            .map_err(|e| AdapterError::Failed(format!("building upload: {}", e)))?;
        let form = Form::new().part("file", part);

        let response = self
            .http_client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let raw = decode::<RawImageOutput>(response).await?;
        Ok(AdapterOutput::since(started, raw))
    }
}

fn transport_error(e: reqwest::Error) -> AdapterError {
    if e.is_connect() || e.is_timeout() {
        AdapterError::Unavailable(e.to_string())
    } else {
        AdapterError::Failed(e.to_string())
    }
}

/// Error body of a failed call, cut to `MAX_ERROR_BODY`. A body that
/// cannot be read is described rather than dropped.
fn error_body<E: std::fmt::Display>(body: Result<String, E>) -> String {
    let mut body = body.unwrap_or_else(|e| format!("<unreadable body: {}>", e));
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

/// Decode a successful JSON body; anything else becomes an adapter error.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AdapterError> {
    let status = response.status();
    if !status.is_success() {
        let body = error_body(response.text().await);
        return Err(AdapterError::Failed(format!("model service returned {}: {}", status, body)));
    }

    let bytes = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AdapterError::InvalidOutput(format!("undecodable response: {}", e)))
}
