//! Process-wide model registry: every artifact is loaded exactly once at
//! start-up and shared read-only afterwards.
//!
//! Loading is all-or-nothing. A missing or malformed artifact, or any width
//! disagreement between paired artifacts, fails start-up with
//! [`InferenceError::Configuration`]; there is no partial registry.

use std::path::Path;
use std::sync::Arc;

use diagnost_core::{InferenceError, ModelsConfig};
use tracing::info;

use crate::device::ComputeDevice;
use crate::encoder::{EncoderUnit, TextEncoder};
use crate::ensemble::EnsembleClassifier;
use crate::fusion::FusionClassifier;
use crate::label_encoder::LabelEncoder;
use crate::resolver::LabelResolver;
use crate::single::SingleModelClassifier;
use crate::synonyms::SynonymTable;

/// Loaded, immutable classifiers.
pub struct ModelRegistry {
    single: Arc<SingleModelClassifier>,
    ensemble: Arc<EnsembleClassifier>,
    synonyms: Arc<SynonymTable>,
    device: ComputeDevice,
}

/// Shape of a loaded registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySummary {
    pub single_classes: usize,
    pub ensemble_classes: usize,
    pub fusion_input_dim: usize,
    pub synonyms: usize,
    pub device: ComputeDevice,
}

impl ModelRegistry {
    pub fn new(
        single: SingleModelClassifier,
        ensemble: EnsembleClassifier,
        synonyms: Arc<SynonymTable>,
        device: ComputeDevice,
    ) -> Self {
        Self {
            single: Arc::new(single),
            ensemble: Arc::new(ensemble),
            synonyms,
            device,
        }
    }

    /// Load every artifact named by `config` using ONNX Runtime encoders.
    #[cfg(feature = "onnx")]
    pub fn load(config: &ModelsConfig) -> Result<Self, InferenceError> {
        config.validate()?;
        let device = crate::device::select_device(config.device)?;
        Self::load_with(config, device, |dir, max_length| {
            crate::onnx::load_encoder(dir, max_length, device)
        })
    }

    /// Load every artifact, building encoders with `load_encoder`.
    ///
    /// `load_encoder` receives the encoder directory and the truncation length.
    pub fn load_with<F>(
        config: &ModelsConfig,
        device: ComputeDevice,
        mut load_encoder: F,
    ) -> Result<Self, InferenceError>
    where
        F: FnMut(&Path, usize) -> anyhow::Result<Arc<dyn TextEncoder>>,
    {
        let max_length = config.max_sequence_length;
        let mut encoder = |path: &Path| -> Result<EncoderUnit, InferenceError> {
            let dir = config.resolve(path);
            load_encoder(&dir, max_length)
                .map(EncoderUnit::new)
                .map_err(|e| InferenceError::config(format!("encoder {}: {e:#}", dir.display())))
        };

        let single_encoder = encoder(&config.single_encoder)?;
        let encoder_1 = encoder(&config.ensemble_encoder_1)?;
        let encoder_2 = encoder(&config.ensemble_encoder_2)?;

        let single_labels = LabelEncoder::load(&config.resolve(&config.single_label_encoder))
            .map_err(configuration)?;
        let ensemble_labels = LabelEncoder::load(&config.resolve(&config.ensemble_label_encoder))
            .map_err(configuration)?;
        let fusion = FusionClassifier::load(&config.resolve(&config.fusion_head))
            .map_err(configuration)?
            .expecting_input(encoder_1.num_classes() + encoder_2.num_classes())?;
        let synonyms = Arc::new(
            SynonymTable::load(&config.resolve(&config.synonyms)).map_err(configuration)?,
        );

        let single = SingleModelClassifier::new(single_encoder, single_labels)?;
        let ensemble = EnsembleClassifier::new(
            encoder_1,
            encoder_2,
            fusion,
            LabelResolver::new(ensemble_labels, Arc::clone(&synonyms)),
        )?;

        let registry = Self::new(single, ensemble, synonyms, device);
        let summary = registry.summary();
        info!(
            single_classes = summary.single_classes,
            ensemble_classes = summary.ensemble_classes,
            fusion_input_dim = summary.fusion_input_dim,
            synonyms = summary.synonyms,
            device = device.as_str(),
            "model registry ready"
        );
        Ok(registry)
    }

    pub fn single(&self) -> Arc<SingleModelClassifier> {
        Arc::clone(&self.single)
    }

    pub fn ensemble(&self) -> Arc<EnsembleClassifier> {
        Arc::clone(&self.ensemble)
    }

    pub fn device(&self) -> ComputeDevice {
        self.device
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            single_classes: self.single.num_classes(),
            ensemble_classes: self.ensemble.num_classes(),
            fusion_input_dim: self.ensemble.fusion_input_dim(),
            synonyms: self.synonyms.len(),
            device: self.device,
        }
    }
}

fn configuration(e: anyhow::Error) -> InferenceError {
    InferenceError::config(format!("{e:#}"))
}
