//! Clinical record and test-recommendation prediction types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Patient gender as encoded by the tabular model (0 = female, 1 = male).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn code(self) -> u8 {
        match self {
            Gender::Female => 0,
            Gender::Male => 1,
        }
    }
}

impl TryFrom<u8> for Gender {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Gender::Female),
            1 => Ok(Gender::Male),
            other => Err(format!("unknown gender code {}", other)),
        }
    }
}

impl From<Gender> for u8 {
    fn from(gender: Gender) -> Self {
        gender.code()
    }
}

/// A validated clinical record, as sent to the tabular risk model.
///
/// Records are only built by the gateway's validation step, so every
/// numeric field is finite and inside its clinical range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    /// Age in years
    pub age: f64,
    pub gender: Gender,
    /// Systolic blood pressure in mmHg
    pub blood_pressure: f64,
    /// Heart rate in bpm
    pub heart_rate: f64,
    /// Body temperature in °C
    pub temperature: f64,
    /// Total cholesterol in mg/dL
    pub cholesterol: f64,
    /// Fasting glucose in mg/dL
    pub glucose: f64,
    pub bmi: f64,
    pub symptoms: BTreeSet<String>,
    #[serde(default)]
    pub previous_conditions: BTreeSet<String>,
}

/// Gateway response for `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Likelihood that further testing is warranted, in [0, 1].
    pub prediction: f64,
    /// Model's self-reported certainty, in [0, 1].
    pub confidence: f64,
    pub recommended_tests: Vec<String>,
}
