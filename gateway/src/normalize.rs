//! Normalization of raw adapter output into the gateway's response shapes.
//!
//! Probabilities are verified, never clamped: a value outside [0, 1] is a
//! contract violation by the model and surfaces as `ModelOutputInvalid`.

use std::collections::BTreeMap;

use clinical_common::{AnalysisType, ImageAnalysisResult, PredictionResult};
use serde_json::Value;

use crate::adapter::{RawImageOutput, RawPrediction};
use crate::error::{Error, Result};
use crate::recommendations;

const CONFIDENCE_KEY: &str = "confidence";
const ERROR_KEY: &str = "error";
const RECOMMENDATIONS_KEY: &str = "recommendations";
/// Keys whose object value holds more labels.
const NESTED_KEYS: [&str; 2] = ["results", "class_probabilities"];
const PROBABILITY_SUFFIX: &str = "_probability";

fn probability(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::ModelOutputInvalid(format!(
            "{} is {}, outside [0, 1]",
            what, value
        )))
    }
}

/// Verify a tabular prediction and fill in tests when the model gave none.
pub fn prediction(raw: RawPrediction, threshold: f64) -> Result<PredictionResult> {
    let prediction = probability("prediction", raw.prediction)?;
    let confidence = probability("confidence", raw.confidence)?;

    let mut recommended_tests: Vec<String> = raw
        .recommended_tests
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if recommended_tests.is_empty() && prediction > threshold {
        recommended_tests = recommendations::recommended_tests(prediction);
    }

    Ok(PredictionResult {
        prediction,
        confidence,
        recommended_tests,
    })
}

/// Flattened view of a raw image output.
#[derive(Default)]
struct Collected {
    confidence: Option<f64>,
    labels: BTreeMap<String, f64>,
    recommendations: Option<Vec<String>>,
}

impl Collected {
    fn absorb(&mut self, map: serde_json::Map<String, Value>, nested: bool) -> Result<()> {
        for (key, value) in map {
            match key.as_str() {
                ERROR_KEY => {
                    let message = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    return Err(Error::ModelUnavailable(format!("model reported: {}", message)));
                }
                CONFIDENCE_KEY => {
                    let c = as_number(&key, &value)?;
                    let c = probability(CONFIDENCE_KEY, c)?;
                    // Top-level confidence wins over a nested copy
                    if !nested || self.confidence.is_none() {
                        self.confidence = Some(c);
                    }
                }
                RECOMMENDATIONS_KEY if !nested => {
                    self.recommendations = Some(as_strings(value)?);
                }
                k if !nested && NESTED_KEYS.contains(&k) => match value {
                    Value::Object(inner) => self.absorb(inner, true)?,
                    _ => {
                        return Err(Error::ModelOutputInvalid(format!(
                            "'{}' must be an object of label probabilities",
                            key
                        )))
                    }
                },
                _ => {
                    let p = as_number(&key, &value)?;
                    let p = probability(&format!("probability of '{}'", key), p)?;
                    let label = key.strip_suffix(PROBABILITY_SUFFIX).unwrap_or(&key).to_string();
                    if label.is_empty() {
                        return Err(Error::ModelOutputInvalid(format!("empty label '{}'", key)));
                    }
                    if self.labels.insert(label.clone(), p).is_some() {
                        return Err(Error::ModelOutputInvalid(format!(
                            "label '{}' reported more than once",
                            label
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn as_number(key: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        Error::ModelOutputInvalid(format!("'{}' is not a number: {}", key, value))
    })
}

fn as_strings(value: Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(Error::ModelOutputInvalid(format!(
                    "recommendation is not a string: {}",
                    other
                ))),
            })
            .collect(),
        other => Err(Error::ModelOutputInvalid(format!(
            "recommendations must be a list, got {}",
            other
        ))),
    }
}

/// Normalize a classifier's label map into an [`ImageAnalysisResult`].
///
/// The `confidence` pseudo-label moves to its own field. When it is
/// missing, confidence is the largest class probability.
pub fn image(analysis_type: AnalysisType, raw: RawImageOutput) -> Result<ImageAnalysisResult> {
    let mut collected = Collected::default();
    collected.absorb(raw.0, false)?;

    if collected.labels.is_empty() {
        return Err(Error::ModelOutputInvalid(
            "output contains no class probabilities".to_string(),
        ));
    }

    let confidence = match collected.confidence {
        Some(c) => c,
        None => collected.labels.values().copied().fold(0.0_f64, f64::max),
    };

    let recommendations = match collected.recommendations {
        Some(lines) if !lines.is_empty() => lines,
        _ => {
            let risk = recommendations::image_risk(analysis_type, &collected.labels);
            recommendations::image_recommendations(analysis_type, risk)
        }
    };

    Ok(ImageAnalysisResult {
        confidence,
        class_probabilities: collected.labels,
        recommendations,
    })
}
