//! Text encoder capability and the width-checked unit wrapping it.

use std::sync::Arc;

use diagnost_core::{InferenceError, LogitVector};

/// A pretrained text classifier: raw text in, one score per class out.
///
/// Implementations hold immutable, inference-only state. `encode` must be a
/// pure function of (weights, tokenizer, text) and safe to call from many
/// threads at once.
pub trait TextEncoder: Send + Sync {
    /// Artifact name, for logs.
    fn name(&self) -> &str;

    /// Trained class count; every output has exactly this width.
    fn num_classes(&self) -> usize;

    /// Score `text`. Long inputs are truncated, never rejected.
    fn encode(&self, text: &str) -> Result<LogitVector, InferenceError>;
}

/// One encoder whose output width is enforced on every call.
#[derive(Clone)]
pub struct EncoderUnit {
    encoder: Arc<dyn TextEncoder>,
}

impl EncoderUnit {
    pub fn new(encoder: Arc<dyn TextEncoder>) -> Self {
        Self { encoder }
    }

    pub fn name(&self) -> &str {
        self.encoder.name()
    }

    pub fn num_classes(&self) -> usize {
        self.encoder.num_classes()
    }

    pub fn logits(&self, text: &str) -> Result<LogitVector, InferenceError> {
        let logits = self.encoder.encode(text)?;
        if logits.len() != self.num_classes() {
            return Err(InferenceError::artifact(format!(
                "encoder '{}' produced {} scores, expected {}",
                self.name(),
                logits.len(),
                self.num_classes()
            )));
        }
        Ok(logits)
    }
}
