//! Integration tests for the clinical gateway HTTP API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use clinical_common::AnalysisType;
use clinical_gateway::adapter::{AdapterError, RawPrediction};
use clinical_gateway::config::Config;
use clinical_gateway::test_util::{jpeg_bytes, test_config, StubImageAdapter, StubTabularAdapter};
use clinical_gateway::{app, AdapterRegistry, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "gateway-test-boundary";

fn app_with(config: Config, registry: AdapterRegistry) -> Router {
    app(Arc::new(AppState::new(config, registry)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_request(uri: &str, field: &str, content_type: &str, image: &[u8]) -> Request<Body> {
    let mut body = Vec::with_capacity(image.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.jpg\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn scenario_a_body() -> Value {
    json!({
        "age": 45,
        "gender": 1,
        "blood_pressure": 120,
        "heart_rate": 72,
        "temperature": 36.6,
        "cholesterol": 190,
        "glucose": 95,
        "bmi": 24,
        "symptoms": ["fatigue"],
        "previous_conditions": []
    })
}

#[tokio::test]
async fn test_health_lists_configured_adapters() {
    let registry = AdapterRegistry::builder()
        .tabular(StubTabularAdapter::default().slot())
        .image(StubImageAdapter::new(AnalysisType::BrainTumor).slot())
        .build();
    let app = app_with(test_config(), registry);

    let (status, body) = send(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["adapters"], json!(["tabular", "brain-tumor"]));
}

#[tokio::test]
async fn test_welcome() {
    let app = app_with(test_config(), AdapterRegistry::default());
    let (status, body) = send(app, Request::builder().uri("/").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Welcome"));
}

#[tokio::test]
async fn test_predict_scenario_a() {
    let stub = StubTabularAdapter::returning(RawPrediction {
        prediction: 0.75,
        confidence: 0.85,
        recommended_tests: vec!["CBC".into(), "BMP".into(), "TFT".into()],
    });
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().tabular(stub.slot()).build(),
    );

    let (status, body) = send(app, json_request("/predict", scenario_a_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "prediction": 0.75,
            "confidence": 0.85,
            "recommended_tests": ["CBC", "BMP", "TFT"]
        })
    );
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_predict_reports_every_invalid_field() {
    let stub = StubTabularAdapter::default();
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().tabular(stub.slot()).build(),
    );

    let mut record = scenario_a_body();
    record["age"] = json!(-5);
    record["heart_rate"] = json!(400);

    let (status, body) = send(app, json_request("/predict", record)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");
    let fields: Vec<&str> = body["error"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["age", "heart_rate"]);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_predict_malformed_body() {
    let stub = StubTabularAdapter::default();
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().tabular(stub.slot()).build(),
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"age\": \"forty\""))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");
    assert_eq!(body["error"]["fields"][0]["field"], "body");
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_predict_reports_type_errors_with_range_errors() {
    let stub = StubTabularAdapter::default();
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().tabular(stub.slot()).build(),
    );

    let mut record = scenario_a_body();
    record["age"] = json!("forty");
    record["gender"] = json!(1.0);
    record["heart_rate"] = json!(400);
    record["symptoms"] = json!("fatigue");

    let (status, body) = send(app.clone(), json_request("/predict", record)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");
    let fields: Vec<(&str, &str)> = body["error"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| (f["field"].as_str().unwrap(), f["message"].as_str().unwrap()))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("age", "must be a number"),
            ("gender", "must be 0 (female) or 1 (male)"),
            ("heart_rate", "must be between 20 and 300 bpm"),
            ("symptoms", "must be a list of strings"),
        ]
    );

    // A body that is not an object at all is still reported as `body`
    let (status, body) = send(app, json_request("/predict", json!([45, 1, 120]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["fields"][0]["field"], "body");
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_predict_without_tabular_adapter() {
    let app = app_with(test_config(), AdapterRegistry::default());
    let (status, body) = send(app, json_request("/predict", scenario_a_body())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "model_unavailable");
}

#[tokio::test]
async fn test_predict_invalid_model_output() {
    let stub = StubTabularAdapter::returning(RawPrediction {
        prediction: 1.5,
        confidence: 0.9,
        recommended_tests: vec![],
    });
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().tabular(stub.slot()).build(),
    );

    let (status, body) = send(app, json_request("/predict", scenario_a_body())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "model_output_invalid");
}

#[tokio::test]
async fn test_predict_adapter_failure() {
    let stub = StubTabularAdapter::failing(AdapterError::Failed("model not loaded".into()));
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().tabular(stub.slot()).build(),
    );

    let (status, body) = send(app, json_request("/predict", scenario_a_body())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "model_unavailable");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("model not loaded"));
}

#[tokio::test(start_paused = true)]
async fn test_predict_timeout() {
    let stub = StubTabularAdapter::default().with_delay(Duration::from_secs(60));
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().tabular(stub.slot()).build(),
    );

    let (status, body) = send(app, json_request("/predict", scenario_a_body())).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["type"], "inference_timeout");
}

#[tokio::test]
async fn test_analyze_skin_cancer_scenario_b() {
    let stub = StubImageAdapter::new(AnalysisType::SkinCancer)
        .returning(json!({"melanoma": 0.2, "benign": 0.8, "confidence": 0.9}));
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().image(stub.slot()).build(),
    );

    let image = jpeg_bytes(2 * 1024 * 1024);
    let (status, body) = send(
        app,
        multipart_request("/analyze/skin-cancer", "file", "image/jpeg", &image),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["confidence"], 0.9);
    assert_eq!(
        body["class_probabilities"],
        json!({"melanoma": 0.2, "benign": 0.8})
    );
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 3);
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_analyze_accepts_image_field_name() {
    let stub = StubImageAdapter::new(AnalysisType::ChestXray);
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().image(stub.slot()).build(),
    );

    let (status, _) = send(
        app,
        multipart_request("/analyze/chest-xray", "image", "application/octet-stream", &jpeg_bytes(512)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_analyze_unknown_type() {
    let stubs: Vec<StubImageAdapter> = AnalysisType::ALL
        .into_iter()
        .map(StubImageAdapter::new)
        .collect();
    let registry = stubs
        .iter()
        .fold(AdapterRegistry::builder(), |b, s| b.image(s.slot()))
        .build();
    let app = app_with(test_config(), registry);

    let (status, body) = send(
        app,
        multipart_request("/analyze/x-ray", "file", "image/jpeg", &jpeg_bytes(512)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "unsupported_analysis_type");
    assert!(stubs.iter().all(|s| s.calls() == 0));
}

#[tokio::test]
async fn test_analyze_rejects_bad_uploads() {
    let stub = StubImageAdapter::new(AnalysisType::BrainTumor);
    let mut config = test_config();
    config.gateway.max_image_bytes = 1024;
    let app = app_with(
        config,
        AdapterRegistry::builder().image(stub.slot()).build(),
    );

    let cases = [
        multipart_request("/analyze/brain-tumor", "file", "image/jpeg", &jpeg_bytes(4096)),
        multipart_request("/analyze/brain-tumor", "file", "image/jpeg", &jpeg_bytes(256 * 1024)),
        multipart_request("/analyze/brain-tumor", "file", "image/png", &jpeg_bytes(512)),
        multipart_request("/analyze/brain-tumor", "file", "image/jpeg", b"GIF? no, plain text"),
        multipart_request("/analyze/brain-tumor", "notes", "image/jpeg", &jpeg_bytes(512)),
        json_request("/analyze/brain-tumor", json!({"image": "base64?"})),
    ];

    for request in cases {
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(body["error"]["type"], "invalid_image", "{}", body);
    }
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_analyze_invalid_model_output() {
    let stub = StubImageAdapter::new(AnalysisType::ChestXray)
        .returning(json!({"pneumonia": 1.5, "normal": 0.1}));
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().image(stub.slot()).build(),
    );

    let (status, body) = send(
        app,
        multipart_request("/analyze/chest-xray", "file", "image/jpeg", &jpeg_bytes(512)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "model_output_invalid");
}

#[tokio::test]
async fn test_analyze_unreachable_model() {
    let stub = StubImageAdapter::new(AnalysisType::BrainTumor)
        .failing(AdapterError::Unavailable("connection refused".into()));
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().image(stub.slot()).build(),
    );

    let (status, body) = send(
        app,
        multipart_request("/analyze/brain-tumor", "file", "image/jpeg", &jpeg_bytes(512)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "model_unavailable");
    assert_eq!(stub.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_analyze_timeout() {
    let stub = StubImageAdapter::new(AnalysisType::SkinCancer).with_delay(Duration::from_secs(30));
    let app = app_with(
        test_config(),
        AdapterRegistry::builder().image(stub.slot()).build(),
    );

    let (status, body) = send(
        app,
        multipart_request("/analyze/skin-cancer", "file", "image/jpeg", &jpeg_bytes(512)),
    )
    .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["type"], "inference_timeout");
}

#[tokio::test]
async fn test_chat() {
    let app = app_with(test_config(), AdapterRegistry::default());

    let (status, body) = send(
        app.clone(),
        json_request("/chat", json!({"message": "Hi, can I get a test prediction?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let intents: Vec<&str> = body["replies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["intent"].as_str().unwrap())
        .collect();
    assert_eq!(intents, vec!["greeting", "test_prediction"]);

    let (status, body) = send(app.clone(), json_request("/chat", json!({"message": "xyz"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replies"][0]["intent"], "fallback");

    let (status, body) = send(app, json_request("/chat", json!({"message": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["fields"][0]["field"], "message");
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = app_with(test_config(), AdapterRegistry::default());

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}
