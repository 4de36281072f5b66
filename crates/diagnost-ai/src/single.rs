//! Single-encoder classifier: one encoder, its own label encoder, raw label
//! out. No fusion and no synonym pass.

use diagnost_core::InferenceError;
use tracing::debug;

use crate::encoder::EncoderUnit;
use crate::label_encoder::LabelEncoder;

pub struct SingleModelClassifier {
    encoder: EncoderUnit,
    labels: LabelEncoder,
}

impl SingleModelClassifier {
    /// Pair an encoder with its label encoder; widths must agree.
    pub fn new(encoder: EncoderUnit, labels: LabelEncoder) -> Result<Self, InferenceError> {
        if encoder.num_classes() != labels.len() {
            return Err(InferenceError::config(format!(
                "encoder '{}' has {} classes but its label encoder has {}",
                encoder.name(),
                encoder.num_classes(),
                labels.len()
            )));
        }
        Ok(Self { encoder, labels })
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    /// Classify `text` and return the raw trained label.
    pub fn classify(&self, text: &str) -> Result<String, InferenceError> {
        let text = text.to_lowercase();
        let logits = self.encoder.logits(&text)?;
        let index = logits.argmax()?;
        let label = self.labels.decode(index)?.to_string();
        debug!(index, label = %label, encoder = self.encoder.name(), "single prediction");
        Ok(label)
    }
}
