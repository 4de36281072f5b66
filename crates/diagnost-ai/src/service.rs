//! Inference entry point: mode dispatch over a shared registry.

use std::sync::Arc;

use chrono::NaiveDate;
use diagnost_core::{
    AppointmentNote, ClassifierMode, InferenceError, PredictionRequest, PredictionResult,
};
use tracing::{debug, error};

use crate::registry::ModelRegistry;

/// Cheap to clone; every clone reads the same registry.
#[derive(Clone)]
pub struct InferenceService {
    registry: Arc<ModelRegistry>,
}

impl InferenceService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Run one prediction. Failures are reported once and never retried.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, InferenceError> {
        let outcome = match request.mode {
            ClassifierMode::Single => self.registry.single().classify(&request.text),
            ClassifierMode::Ensemble => self.registry.ensemble().classify(&request.text),
        };

        match outcome {
            Ok(result) => {
                debug!(mode = %request.mode, label = %result, "prediction");
                Ok(PredictionResult { result })
            }
            Err(e) => {
                error!(mode = %request.mode, error = %e, "prediction failed");
                Err(e)
            }
        }
    }

    /// Parse `mode`, compose the prompt from `note`, and predict.
    ///
    /// An unknown mode fails before any classifier runs.
    pub fn predict_note(
        &self,
        mode: &str,
        note: &AppointmentNote,
        today: NaiveDate,
    ) -> Result<PredictionResult, InferenceError> {
        let mode: ClassifierMode = mode.parse()?;
        let request = note.to_request(mode, today)?;
        self.predict(&request)
    }
}
