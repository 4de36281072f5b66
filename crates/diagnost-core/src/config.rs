//! Artifact layout and start-up options for the model registry.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Default truncation length for both encoder tokenizers.
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 512;

/// Compute device preference, resolved once when the registry loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Accelerator if one is compiled in and present, else CPU.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

/// Where every artifact lives. Relative paths resolve against `models_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub models_dir: PathBuf,
    /// Single-mode encoder directory (`model.onnx`, `tokenizer.json`).
    pub single_encoder: PathBuf,
    pub single_label_encoder: PathBuf,
    pub ensemble_encoder_1: PathBuf,
    pub ensemble_encoder_2: PathBuf,
    pub fusion_head: PathBuf,
    pub ensemble_label_encoder: PathBuf,
    /// `$`-delimited raw label → canonical label table.
    pub synonyms: PathBuf,
    pub max_sequence_length: usize,
    pub device: DeviceKind,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            single_encoder: PathBuf::from("bert"),
            single_label_encoder: PathBuf::from("bert/label_encoder.json"),
            ensemble_encoder_1: PathBuf::from("RuBioRoBERTa"),
            ensemble_encoder_2: PathBuf::from("albert-base-v2"),
            fusion_head: PathBuf::from("ensemble/fusion_head.json"),
            ensemble_label_encoder: PathBuf::from("ensemble/label_encoder.json"),
            synonyms: PathBuf::from("mkb.csv"),
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            device: DeviceKind::Auto,
        }
    }
}

impl ModelsConfig {
    /// Default layout rooted at `models_dir`.
    pub fn with_models_dir(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            ..Default::default()
        }
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, InferenceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::config(format!("read config {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            InferenceError::config(format!("parse config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.max_sequence_length == 0 {
            return Err(InferenceError::config("max_sequence_length must be > 0"));
        }
        Ok(())
    }

    /// Join a configured path onto `models_dir` unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.models_dir.join(path)
        }
    }
}
