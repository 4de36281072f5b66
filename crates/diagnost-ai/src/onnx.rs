//! ONNX Runtime binding for sequence-classification encoders.
//!
//! An artifact directory must contain `model.onnx` (a `*ForSequenceClassification`
//! export whose first output is `[batch, num_labels]` logits) and
//! `tokenizer.json`. The class count comes from the ONNX output shape, or
//! from `config.json` when the exported shape is dynamic.

use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use diagnost_core::{InferenceError, LogitVector};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Encoding, Tokenizer};
use tracing::info;

use crate::device::{ComputeDevice, execution_providers};
use crate::encoder::TextEncoder;

/// Sequence classifier running on ONNX Runtime.
///
/// The exported graph is inference-only (no dropout, no gradients). The
/// session sits behind a mutex because `Session::run` needs `&mut`; the lock
/// serializes calls on this encoder only and guards no model state.
pub struct OnnxEncoder {
    name: String,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    num_classes: usize,
    uses_token_type_ids: bool,
}

impl OnnxEncoder {
    /// Load an encoder from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(
        model_dir: &Path,
        max_length: usize,
        device: ComputeDevice,
    ) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?
            .with_execution_providers(execution_providers(device))
            .map_err(|e| anyhow::anyhow!("register execution providers: {e}"))?
            .commit_from_file(&model_path)?;

        let num_classes = match infer_width(session.outputs()[0].dtype()) {
            Some(n) => n,
            None => width_from_config(model_dir)?,
        };
        let uses_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let tokenizer = load_tokenizer(&tokenizer_path, max_length)?;

        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_dir.display().to_string());

        info!(
            classes = num_classes,
            max_length,
            token_type_ids = uses_token_type_ids,
            device = device.as_str(),
            model = %model_path.display(),
            "loaded encoder"
        );
        Ok(Self {
            name,
            session: Mutex::new(session),
            tokenizer,
            num_classes,
            uses_token_type_ids,
        })
    }
}

impl TextEncoder for OnnxEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn encode(&self, text: &str) -> Result<LogitVector, InferenceError> {
        let fail = |what: &str, e: &dyn std::fmt::Display| {
            InferenceError::artifact(format!("{} {what}: {e}", self.name))
        };

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| fail("tokenize", &e))?;

        let inputs = ModelInputs::from_encoding(&encoding, self.uses_token_type_ids);
        let shape = inputs.shape();

        let ids_tensor = Tensor::from_array((shape, inputs.input_ids))
            .map_err(|e| fail("input_ids tensor", &e))?;
        let mask_tensor = Tensor::from_array((shape, inputs.attention_mask))
            .map_err(|e| fail("attention_mask tensor", &e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::artifact(format!("{} session lock poisoned", self.name)))?;

        let outputs = if let Some(type_ids) = inputs.token_type_ids {
            let type_tensor = Tensor::from_array((shape, type_ids))
                .map_err(|e| fail("token_type_ids tensor", &e))?;
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
            ])
        }
        .map_err(|e| fail("session run", &e))?;

        // Logits: [1, num_classes].
        let (output_shape, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| fail("extract logits", &e))?;
        let dims: &[i64] = output_shape;
        if dims.len() != 2 || dims[0] != 1 || dims[1] as usize != self.num_classes {
            return Err(InferenceError::artifact(format!(
                "{} unexpected output shape {dims:?}, expected [1, {}]",
                self.name, self.num_classes
            )));
        }

        Ok(LogitVector::new(output_data.to_vec()))
    }
}

/// Load `tokenizer.json` with truncation to `max_length` tokens.
///
/// Long notes are truncated to the encoder's window, never rejected.
fn load_tokenizer(path: &Path, max_length: usize) -> anyhow::Result<Tokenizer> {
    let mut tokenizer =
        Tokenizer::from_file(path).map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
    Ok(tokenizer)
}

/// `[1, seq]` input arrays for one encoded note.
struct ModelInputs {
    seq_len: usize,
    input_ids: Box<[i64]>,
    attention_mask: Box<[i64]>,
    /// Only for graphs that declare a `token_type_ids` input (BERT, ALBERT).
    token_type_ids: Option<Box<[i64]>>,
}

impl ModelInputs {
    fn from_encoding(encoding: &Encoding, with_type_ids: bool) -> Self {
        let to_i64 = |v: &[u32]| -> Box<[i64]> { v.iter().map(|&x| x as i64).collect() };
        Self {
            seq_len: encoding.get_ids().len(),
            input_ids: to_i64(encoding.get_ids()),
            attention_mask: to_i64(encoding.get_attention_mask()),
            token_type_ids: with_type_ids.then(|| to_i64(encoding.get_type_ids())),
        }
    }

    fn shape(&self) -> [i64; 2] {
        [1, self.seq_len as i64]
    }
}

/// Try to infer the class count from the ONNX model output type.
fn infer_width(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => {
            // Last dimension is the label count; dynamic axes are negative.
            shape
                .last()
                .and_then(|&d| if d > 0 { Some(d as usize) } else { None })
        }
        _ => None,
    }
}

/// Class count from a Hugging Face `config.json` (`id2label` or `num_labels`).
fn width_from_config(model_dir: &Path) -> anyhow::Result<usize> {
    let config_path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&config_path).with_context(|| {
        format!("output width is dynamic and {config_path:?} is unreadable")
    })?;
    let config: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parse {config_path:?}"))?;

    let width = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .map(|m| m.len())
        .filter(|&n| n > 0)
        .or_else(|| {
            config
                .get("num_labels")
                .and_then(|v| v.as_u64())
                .map(|n| n as usize)
        })
        .ok_or_else(|| anyhow::anyhow!("{config_path:?} has neither id2label nor num_labels"))?;
    Ok(width)
}

/// Load an ONNX encoder as a shareable [`TextEncoder`].
pub fn load_encoder(
    model_dir: &Path,
    max_length: usize,
    device: ComputeDevice,
) -> anyhow::Result<std::sync::Arc<dyn TextEncoder>> {
    Ok(std::sync::Arc::new(OnnxEncoder::load(
        model_dir, max_length, device,
    )?))
}
