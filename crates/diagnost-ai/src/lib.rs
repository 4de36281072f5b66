//! Diagnosis inference: ONNX Runtime encoders, learned fusion, and label
//! canonicalization behind one entry point.

pub mod device;
pub mod encoder;
pub mod ensemble;
pub mod fusion;
pub mod label_encoder;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod single;
pub mod synonyms;

#[cfg(test)]
mod testing;

pub use device::{ComputeDevice, select_device};
pub use encoder::{EncoderUnit, TextEncoder};
pub use ensemble::EnsembleClassifier;
pub use fusion::FusionClassifier;
pub use label_encoder::LabelEncoder;
#[cfg(feature = "onnx")]
pub use onnx::OnnxEncoder;
pub use registry::{ModelRegistry, RegistrySummary};
pub use resolver::LabelResolver;
pub use service::InferenceService;
pub use single::SingleModelClassifier;
pub use synonyms::SynonymTable;
