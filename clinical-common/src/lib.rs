//! Clinical Gateway Common Types
//!
//! Wire types shared by the prediction gateway and the model-serving
//! processes it talks to.

pub mod clinical;
pub mod imaging;

pub use clinical::{ClinicalRecord, Gender, PredictionResult};
pub use imaging::{AnalysisType, ImageAnalysisResult, ImageFormat, UnknownAnalysisType};
