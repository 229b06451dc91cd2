//! Fixed recommendation catalogs.
//!
//! Used only when an adapter leaves recommendations out of its output.

use std::collections::BTreeMap;

use clinical_common::AnalysisType;

const BASE_TESTS: [&str; 5] = [
    "Complete Blood Count (CBC)",
    "Basic Metabolic Panel",
    "Lipid Panel",
    "Thyroid Function Test",
    "Urinalysis",
];

const HIGH_RISK_TESTS: [&str; 4] = [
    "Chest X-ray",
    "ECG",
    "Liver Function Test",
    "Kidney Function Test",
];

const MEDIUM_RISK_TESTS: [&str; 2] = ["ECG", "Liver Function Test"];

/// Coarse risk tier shared by both catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// > 0.7 is high, > 0.5 is medium, anything else is low.
    pub fn from_probability(p: f64) -> Self {
        if p > 0.7 {
            RiskLevel::High
        } else if p > 0.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Tests to suggest for a tabular prediction.
pub fn recommended_tests(prediction: f64) -> Vec<String> {
    let tests: Vec<&str> = match RiskLevel::from_probability(prediction) {
        RiskLevel::High => BASE_TESTS.iter().chain(HIGH_RISK_TESTS.iter()).copied().collect(),
        RiskLevel::Medium => BASE_TESTS.iter().chain(MEDIUM_RISK_TESTS.iter()).copied().collect(),
        RiskLevel::Low => BASE_TESTS[..3].to_vec(),
    };
    tests.into_iter().map(String::from).collect()
}

/// Labels whose probability drives the risk tier of each analysis.
pub fn risk_labels(analysis_type: AnalysisType) -> &'static [&'static str] {
    match analysis_type {
        AnalysisType::ChestXray => &["pneumonia", "tuberculosis"],
        AnalysisType::SkinCancer => &["malignant", "melanoma"],
        AnalysisType::BrainTumor => &["tumor"],
    }
}

/// Risk tier from the highest risk-label probability; missing labels count as 0.
pub fn image_risk(analysis_type: AnalysisType, probabilities: &BTreeMap<String, f64>) -> RiskLevel {
    let worst = risk_labels(analysis_type)
        .iter()
        .filter_map(|label| probabilities.get(*label))
        .copied()
        .fold(0.0_f64, f64::max);
    RiskLevel::from_probability(worst)
}

/// Advice lines for an image analysis at a given risk tier.
pub fn image_recommendations(analysis_type: AnalysisType, risk: RiskLevel) -> Vec<String> {
    let lines: [&str; 3] = match (analysis_type, risk) {
        (AnalysisType::ChestXray, RiskLevel::High) => [
            "Schedule a follow-up with a pulmonologist",
            "Get a CT scan for detailed analysis",
            "Consider blood tests for infection markers",
        ],
        (AnalysisType::ChestXray, RiskLevel::Medium) => [
            "Schedule a follow-up with your primary care physician",
            "Monitor symptoms and vital signs",
            "Consider a second opinion",
        ],
        (AnalysisType::ChestXray, RiskLevel::Low) => [
            "Regular check-ups",
            "Maintain healthy lifestyle",
            "Monitor for any changes",
        ],
        (AnalysisType::SkinCancer, RiskLevel::High) => [
            "Schedule an appointment with a dermatologist",
            "Consider a biopsy",
            "Monitor for changes in size or color",
        ],
        (AnalysisType::SkinCancer, RiskLevel::Medium) => [
            "Regular skin checks",
            "Protect from sun exposure",
            "Consider a second opinion",
        ],
        (AnalysisType::SkinCancer, RiskLevel::Low) => [
            "Regular skin monitoring",
            "Use sunscreen",
            "Annual skin check",
        ],
        (AnalysisType::BrainTumor, RiskLevel::High) => [
            "Schedule an appointment with a neurologist",
            "Get an MRI scan",
            "Monitor for neurological symptoms",
        ],
        (AnalysisType::BrainTumor, RiskLevel::Medium) => [
            "Schedule a follow-up scan",
            "Monitor for symptoms",
            "Consider a second opinion",
        ],
        (AnalysisType::BrainTumor, RiskLevel::Low) => [
            "Regular check-ups",
            "Monitor for any changes",
            "Maintain healthy lifestyle",
        ],
    };
    lines.into_iter().map(String::from).collect()
}
