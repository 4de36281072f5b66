//! Persisted index ↔ label bijection established at training time.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use diagnost_core::InferenceError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Only on-disk version this build understands.
pub const LABEL_ENCODER_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct LabelEncoderFile {
    version: u32,
    classes: Vec<String>,
}

/// Dense `[0, C)` → label mapping. Index `i` decodes to `classes[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Build from ordered classes; rejects empty sets and duplicates.
    pub fn new(classes: Vec<String>) -> anyhow::Result<Self> {
        anyhow::ensure!(!classes.is_empty(), "label encoder has no classes");

        let mut seen = HashSet::with_capacity(classes.len());
        for (i, label) in classes.iter().enumerate() {
            anyhow::ensure!(
                seen.insert(label.as_str()),
                "duplicate label {label:?} at index {i}"
            );
        }

        Ok(Self { classes })
    }

    /// Load a `{"version": 1, "classes": [...]}` file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read label encoder {}", path.display()))?;
        let file: LabelEncoderFile = serde_json::from_str(&raw)
            .with_context(|| format!("parse label encoder {}", path.display()))?;
        anyhow::ensure!(
            file.version == LABEL_ENCODER_VERSION,
            "unsupported label encoder version {} in {}",
            file.version,
            path.display()
        );

        let encoder = Self::new(file.classes)
            .with_context(|| format!("invalid label encoder {}", path.display()))?;
        info!(classes = encoder.len(), path = %path.display(), "loaded label encoder");
        Ok(encoder)
    }

    /// Number of classes `C`.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Label for `index`. Out of range means the producing model and this
    /// encoder disagree on width, which is never the caller's fault.
    pub fn decode(&self, index: usize) -> Result<&str, InferenceError> {
        self.classes.get(index).map(String::as_str).ok_or_else(|| {
            InferenceError::Model(format!(
                "class index {index} out of range for {} labels",
                self.classes.len()
            ))
        })
    }
}
