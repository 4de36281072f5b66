//! Two-encoder ensemble: both encoders score the same lower-cased text, the
//! fusion head combines their logits, and the winning class is resolved to a
//! canonical label.

use diagnost_core::{InferenceError, LogitVector};
use tracing::debug;

use crate::encoder::EncoderUnit;
use crate::fusion::FusionClassifier;
use crate::resolver::LabelResolver;

pub struct EnsembleClassifier {
    encoder_1: EncoderUnit,
    encoder_2: EncoderUnit,
    fusion: FusionClassifier,
    resolver: LabelResolver,
}

impl EnsembleClassifier {
    /// Wire the pipeline, checking every width once up front.
    ///
    /// The fusion head must consume `encoder_1 + encoder_2` classes and emit
    /// exactly as many classes as the resolver can decode.
    pub fn new(
        encoder_1: EncoderUnit,
        encoder_2: EncoderUnit,
        fusion: FusionClassifier,
        resolver: LabelResolver,
    ) -> Result<Self, InferenceError> {
        fusion.expect_input_dim(encoder_1.num_classes() + encoder_2.num_classes())?;
        if fusion.output_dim() != resolver.num_classes() {
            return Err(InferenceError::config(format!(
                "fusion head emits {} classes but the label encoder has {}",
                fusion.output_dim(),
                resolver.num_classes()
            )));
        }

        Ok(Self {
            encoder_1,
            encoder_2,
            fusion,
            resolver,
        })
    }

    /// Width of the concatenated encoder output.
    pub fn fusion_input_dim(&self) -> usize {
        self.encoder_1.num_classes() + self.encoder_2.num_classes()
    }

    pub fn num_classes(&self) -> usize {
        self.resolver.num_classes()
    }

    /// Fused class scores for already-normalized text.
    fn fused_logits(&self, text: &str) -> Result<LogitVector, InferenceError> {
        // Both branches are mandatory; either failing fails the request.
        let first = self.encoder_1.logits(text)?;
        let second = self.encoder_2.logits(text)?;
        let input = LogitVector::concat(&first, &second);
        self.fusion.forward(&input)
    }

    /// Classify `text` and return its canonical label.
    pub fn classify(&self, text: &str) -> Result<String, InferenceError> {
        let text = text.to_lowercase();
        let logits = self.fused_logits(&text)?;
        let index = logits.predicted_class()?;
        let label = self.resolver.resolve(index)?;
        debug!(index, label = %label, "ensemble prediction");
        Ok(label)
    }
}
