pub mod config;
pub mod error;
pub mod logits;
pub mod request;

pub use config::{DeviceKind, ModelsConfig};
pub use error::{InferenceError, Result};
pub use logits::LogitVector;
pub use request::{
    AppointmentNote, ClassifierMode, PatientContext, PredictionRequest, PredictionResult,
};
