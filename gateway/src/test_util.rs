//! In-process stub adapters and fixtures for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Bytes;
use clinical_common::{AnalysisType, ClinicalRecord};
use serde_json::{json, Value};

use crate::adapter::{
    AdapterError, AdapterOutput, AdapterResult, ImageAdapter, RawImageOutput, RawPrediction, Slot,
    TabularAdapter,
};
use crate::config::{Config, GatewayConfig};
use crate::upload::ImageAnalysisRequest;
use crate::validation::ClinicalRecordInput;

pub fn test_config() -> Config {
    Config {
        gateway: GatewayConfig {
            deadline_ms: 1_000,
            ..GatewayConfig::default()
        },
        ..Config::default()
    }
}

/// The reference record: 45 year old male, BP 120, HR 72, 36.6 °C,
/// cholesterol 190, glucose 95, BMI 24, fatigue.
pub fn scenario_a_input() -> ClinicalRecordInput {
    ClinicalRecordInput {
        age: Some(json!(45)),
        gender: Some(json!(1)),
        blood_pressure: Some(json!(120)),
        heart_rate: Some(json!(72)),
        temperature: Some(json!(36.6)),
        cholesterol: Some(json!(190)),
        glucose: Some(json!(95)),
        bmi: Some(json!(24)),
        symptoms: Some(json!(["fatigue"])),
        previous_conditions: Some(json!([])),
    }
}

/// `len` bytes (at least 4) that sniff as a JPEG.
pub fn jpeg_bytes(len: usize) -> Bytes {
    let mut bytes = vec![0u8; len.max(4)];
    bytes[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
    Bytes::from(bytes)
}

async fn respond<T>(delay: Option<Duration>, outcome: Result<T, AdapterError>) -> AdapterResult<T> {
    let started = Instant::now();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    outcome.map(|raw| AdapterOutput::since(started, raw))
}

/// Tabular adapter answering with a fixed outcome.
#[derive(Clone)]
pub struct StubTabularAdapter {
    outcome: Result<RawPrediction, AdapterError>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    last_record: Arc<Mutex<Option<ClinicalRecord>>>,
}

impl Default for StubTabularAdapter {
    fn default() -> Self {
        Self::returning(RawPrediction {
            prediction: 0.3,
            confidence: 0.8,
            recommended_tests: vec![],
        })
    }
}

impl StubTabularAdapter {
    pub fn returning(raw: RawPrediction) -> Self {
        Self {
            outcome: Ok(raw),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            last_record: Arc::new(Mutex::new(None)),
        }
    }

    pub fn failing(error: AdapterError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `predict` calls, shared across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_record(&self) -> Option<ClinicalRecord> {
        self.last_record.lock().ok().and_then(|r| r.clone())
    }

    pub fn slot(&self) -> Slot<dyn TabularAdapter> {
        Slot::new(Arc::new(self.clone()))
    }

    pub fn slot_with_limit(&self, max_concurrent: usize) -> Slot<dyn TabularAdapter> {
        Slot::with_limit(Arc::new(self.clone()), max_concurrent)
    }
}

#[async_trait]
impl TabularAdapter for StubTabularAdapter {
    fn name(&self) -> &str {
        "stub-tabular"
    }

    async fn predict(&self, record: &ClinicalRecord) -> AdapterResult<RawPrediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_record.lock() {
            *last = Some(record.clone());
        }
        respond(self.delay, self.outcome.clone()).await
    }
}

/// Image adapter answering with a fixed outcome.
#[derive(Clone)]
pub struct StubImageAdapter {
    analysis_type: AnalysisType,
    outcome: Result<RawImageOutput, AdapterError>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubImageAdapter {
    pub fn new(analysis_type: AnalysisType) -> Self {
        Self {
            analysis_type,
            outcome: Ok([("normal", 0.9), ("abnormal", 0.1)].into_iter().collect()),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer with `output`; anything but a JSON object answers with an
    /// empty output.
    pub fn returning(mut self, output: Value) -> Self {
        self.outcome = Ok(match output {
            Value::Object(map) => RawImageOutput(map),
            _ => RawImageOutput::default(),
        });
        self
    }

    pub fn failing(mut self, error: AdapterError) -> Self {
        self.outcome = Err(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn slot(&self) -> Slot<dyn ImageAdapter> {
        Slot::new(Arc::new(self.clone()))
    }
}

#[async_trait]
impl ImageAdapter for StubImageAdapter {
    fn analysis_type(&self) -> AnalysisType {
        self.analysis_type
    }

    async fn classify(&self, _request: &ImageAnalysisRequest) -> AdapterResult<RawImageOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        respond(self.delay, self.outcome.clone()).await
    }
}
