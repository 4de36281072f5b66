//! Class index → canonical label: decode through the label encoder, then
//! normalize through the synonym table.

use std::sync::Arc;

use diagnost_core::InferenceError;

use crate::label_encoder::LabelEncoder;
use crate::synonyms::SynonymTable;

pub struct LabelResolver {
    labels: LabelEncoder,
    synonyms: Arc<SynonymTable>,
}

impl LabelResolver {
    pub fn new(labels: LabelEncoder, synonyms: Arc<SynonymTable>) -> Self {
        Self { labels, synonyms }
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    /// Decode `index` and canonicalize the result.
    pub fn resolve(&self, index: usize) -> Result<String, InferenceError> {
        let raw = self.labels.decode(index)?;
        Ok(self.synonyms.canonicalize(raw).to_string())
    }
}
