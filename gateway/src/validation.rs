//! Clinical record validation.
//!
//! Input arrives with every field as raw, optional JSON so that missing and
//! wrongly typed fields are reported together with out-of-range ones.
//! Values outside their range are rejected, never clamped.

use std::collections::BTreeSet;

use clinical_common::{ClinicalRecord, Gender};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationErrors;

/// Maximum entries in `symptoms` or `previous_conditions`.
pub const MAX_TEXT_ENTRIES: usize = 64;
/// Maximum characters per symptom or condition.
pub const MAX_TEXT_LEN: usize = 256;

/// Raw `POST /predict` body. Only a body that is not a JSON object fails
/// to deserialize; everything else is judged field by field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClinicalRecordInput {
    pub age: Option<Value>,
    pub gender: Option<Value>,
    pub blood_pressure: Option<Value>,
    pub heart_rate: Option<Value>,
    pub temperature: Option<Value>,
    pub cholesterol: Option<Value>,
    pub glucose: Option<Value>,
    pub bmi: Option<Value>,
    pub symptoms: Option<Value>,
    pub previous_conditions: Option<Value>,
}

/// Plausible clinical range for one numeric field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRange {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
    /// Whether `min` itself is rejected.
    pub min_exclusive: bool,
    pub unit: &'static str,
}

impl FieldRange {
    const fn inclusive(field: &'static str, min: f64, max: f64, unit: &'static str) -> Self {
        Self {
            field,
            min,
            max,
            min_exclusive: false,
            unit,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        let above_min = if self.min_exclusive {
            value > self.min
        } else {
            value >= self.min
        };
        above_min && value <= self.max
    }

    fn describe(&self) -> String {
        if self.min_exclusive {
            format!(
                "must be greater than {} and at most {} {}",
                self.min, self.max, self.unit
            )
        } else {
            format!("must be between {} and {} {}", self.min, self.max, self.unit)
        }
    }
}

pub const AGE: FieldRange = FieldRange {
    field: "age",
    min: 0.0,
    max: 130.0,
    min_exclusive: true,
    unit: "years",
};
pub const BLOOD_PRESSURE: FieldRange = FieldRange::inclusive("blood_pressure", 50.0, 300.0, "mmHg");
pub const HEART_RATE: FieldRange = FieldRange::inclusive("heart_rate", 20.0, 300.0, "bpm");
pub const TEMPERATURE: FieldRange = FieldRange::inclusive("temperature", 25.0, 45.0, "°C");
pub const CHOLESTEROL: FieldRange = FieldRange::inclusive("cholesterol", 50.0, 600.0, "mg/dL");
pub const GLUCOSE: FieldRange = FieldRange::inclusive("glucose", 20.0, 800.0, "mg/dL");
pub const BMI: FieldRange = FieldRange::inclusive("bmi", 8.0, 100.0, "kg/m²");

fn check_number(range: &FieldRange, value: Option<Value>, errors: &mut ValidationErrors) -> f64 {
    match value.as_ref().map(Value::as_f64) {
        None => {
            errors.push(range.field, "is required");
            f64::NAN
        }
        Some(None) => {
            errors.push(range.field, "must be a number");
            f64::NAN
        }
        Some(Some(v)) if !range.contains(v) => {
            errors.push(range.field, range.describe());
            v
        }
        Some(Some(v)) => v,
    }
}

/// Gender is the integer code 0 or 1; `1.0` is not accepted.
fn check_gender(value: Option<Value>, errors: &mut ValidationErrors) -> Gender {
    let value = match value {
        Some(value) => value,
        None => {
            errors.push("gender", "is required");
            return Gender::Female;
        }
    };
    if !value.is_number() {
        errors.push("gender", "must be a number");
        return Gender::Female;
    }

    match value.as_u64().and_then(|code| u8::try_from(code).ok()) {
        Some(code) => match Gender::try_from(code) {
            Ok(gender) => gender,
            Err(_) => {
                errors.push("gender", "must be 0 (female) or 1 (male)");
                Gender::Female
            }
        },
        None => {
            errors.push("gender", "must be 0 (female) or 1 (male)");
            Gender::Female
        }
    }
}

/// Trim, bound and deduplicate a list of free-text entries.
fn check_text_set(
    field: &str,
    value: Option<Value>,
    required: bool,
    errors: &mut ValidationErrors,
) -> BTreeSet<String> {
    let values = match value {
        Some(Value::Array(values)) => values,
        Some(_) => {
            errors.push(field, "must be a list of strings");
            return BTreeSet::new();
        }
        None => {
            if required {
                errors.push(field, "is required");
            }
            return BTreeSet::new();
        }
    };

    if values.len() > MAX_TEXT_ENTRIES {
        errors.push(field, format!("must have at most {} entries", MAX_TEXT_ENTRIES));
        return BTreeSet::new();
    }

    let mut set = BTreeSet::new();
    for (i, value) in values.iter().enumerate() {
        let entry = format!("{}[{}]", field, i);
        let trimmed = match value.as_str() {
            Some(text) => text.trim(),
            None => {
                errors.push(entry, "must be a string");
                continue;
            }
        };
        if trimmed.is_empty() {
            errors.push(entry, "must not be blank");
        } else if trimmed.chars().count() > MAX_TEXT_LEN {
            errors.push(entry, format!("must be at most {} characters", MAX_TEXT_LEN));
        } else {
            set.insert(trimmed.to_string());
        }
    }
    set
}

impl ClinicalRecordInput {
    /// Validate every field, collecting all violations.
    pub fn validate(self) -> Result<ClinicalRecord, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let age = check_number(&AGE, self.age, &mut errors);
        let gender = check_gender(self.gender, &mut errors);
        let blood_pressure = check_number(&BLOOD_PRESSURE, self.blood_pressure, &mut errors);
        let heart_rate = check_number(&HEART_RATE, self.heart_rate, &mut errors);
        let temperature = check_number(&TEMPERATURE, self.temperature, &mut errors);
        let cholesterol = check_number(&CHOLESTEROL, self.cholesterol, &mut errors);
        let glucose = check_number(&GLUCOSE, self.glucose, &mut errors);
        let bmi = check_number(&BMI, self.bmi, &mut errors);
        let symptoms = check_text_set("symptoms", self.symptoms, true, &mut errors);
        let previous_conditions =
            check_text_set("previous_conditions", self.previous_conditions, false, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ClinicalRecord {
            age,
            gender,
            blood_pressure,
            heart_rate,
            temperature,
            cholesterol,
            glucose,
            bmi,
            symptoms,
            previous_conditions,
        })
    }
}
