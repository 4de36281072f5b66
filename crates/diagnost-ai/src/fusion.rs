//! Learned fusion head over concatenated encoder logits.
//!
//! # Architecture
//!
//! ```text
//! [encoder-1 logits ‖ encoder-2 logits] → Dropout(p) → Linear(input_dim, output_dim)
//! ```
//!
//! Only the evaluation-mode forward pass exists here: dropout is identity and
//! the rate is kept solely as artifact metadata. There is no training mode to
//! switch into, so a loaded head can be shared across threads as-is.

use std::path::Path;

use anyhow::Context;
use diagnost_core::{InferenceError, LogitVector};
use serde::{Deserialize, Serialize};
use tracing::info;

/// On-disk fusion head. `weight` is row-major `[output_dim][input_dim]`,
/// the same layout as a PyTorch `nn.Linear` state dict.
#[derive(Debug, Serialize, Deserialize)]
pub struct FusionHeadFile {
    pub input_dim: usize,
    pub output_dim: usize,
    #[serde(default)]
    pub dropout: f32,
    pub weight: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

/// Linear fusion classifier with a frozen input width.
#[derive(Debug, Clone)]
pub struct FusionClassifier {
    /// Row-major `[output_dim * input_dim]`.
    weight: Vec<f32>,
    bias: Vec<f32>,
    input_dim: usize,
    output_dim: usize,
    dropout: f32,
}

impl FusionClassifier {
    /// Build from flat row-major weights.
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        weight: Vec<f32>,
        bias: Vec<f32>,
        dropout: f32,
    ) -> Result<Self, InferenceError> {
        if input_dim == 0 || output_dim == 0 {
            return Err(InferenceError::config(format!(
                "fusion head dimensions must be non-zero, got {input_dim}x{output_dim}"
            )));
        }
        if weight.len() != input_dim * output_dim {
            return Err(InferenceError::config(format!(
                "fusion weight has {} values, expected {output_dim}x{input_dim}",
                weight.len()
            )));
        }
        if bias.len() != output_dim {
            return Err(InferenceError::config(format!(
                "fusion bias has {} values, expected {output_dim}",
                bias.len()
            )));
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(InferenceError::config(format!(
                "fusion dropout rate {dropout} outside [0, 1)"
            )));
        }

        Ok(Self {
            weight,
            bias,
            input_dim,
            output_dim,
            dropout,
        })
    }

    /// Consume the head, failing unless it takes exactly `dim` inputs.
    pub fn expecting_input(self, dim: usize) -> Result<Self, InferenceError> {
        self.expect_input_dim(dim)?;
        Ok(self)
    }

    /// Load a head from its JSON artifact.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read fusion head {}", path.display()))?;
        let file: FusionHeadFile = serde_json::from_str(&raw)
            .with_context(|| format!("parse fusion head {}", path.display()))?;
        let head = Self::from_file(file).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        info!(
            input_dim = head.input_dim,
            output_dim = head.output_dim,
            dropout = head.dropout,
            path = %path.display(),
            "loaded fusion head"
        );
        Ok(head)
    }

    pub fn from_file(file: FusionHeadFile) -> Result<Self, InferenceError> {
        if file.weight.len() != file.output_dim {
            return Err(InferenceError::config(format!(
                "fusion weight has {} rows, expected {}",
                file.weight.len(),
                file.output_dim
            )));
        }
        if let Some((row, r)) = file
            .weight
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != file.input_dim)
        {
            return Err(InferenceError::config(format!(
                "fusion weight row {row} has {} columns, expected {}",
                r.len(),
                file.input_dim
            )));
        }
        let weight = file.weight.into_iter().flatten().collect();
        Self::new(file.input_dim, file.output_dim, weight, file.bias, file.dropout)
    }

    /// Fail unless this head consumes exactly `dim` inputs.
    pub fn expect_input_dim(&self, dim: usize) -> Result<(), InferenceError> {
        if self.input_dim != dim {
            return Err(InferenceError::config(format!(
                "fusion head expects {} inputs but encoders produce {dim}",
                self.input_dim
            )));
        }
        Ok(())
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn dropout(&self) -> f32 {
        self.dropout
    }

    /// Evaluation-mode forward pass: `y = W·x + b`.
    ///
    /// Each output sums bias first, then inputs in index order, so the same
    /// input always yields the same floats on the same platform.
    pub fn forward(&self, input: &LogitVector) -> Result<LogitVector, InferenceError> {
        let x = input.as_slice();
        if x.len() != self.input_dim {
            return Err(InferenceError::Model(format!(
                "fusion input has width {}, head expects {}",
                x.len(),
                self.input_dim
            )));
        }

        let out = self
            .weight
            .chunks_exact(self.input_dim)
            .zip(&self.bias)
            .map(|(row, &b)| row.iter().zip(x).fold(b, |acc, (w, v)| acc + w * v))
            .collect();
        Ok(LogitVector::new(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn identity_head(n: usize) -> FusionClassifier {
        let mut weight = vec![0.0; n * n];
        for i in 0..n {
            weight[i * n + i] = 1.0;
        }
        FusionClassifier::new(n, n, weight, vec![0.0; n], 0.2).unwrap()
    }

    #[test]
    fn forward_computes_affine_map() {
        // 2 outputs over 3 inputs.
        let head = FusionClassifier::new(
            3,
            2,
            vec![1.0, 0.0, -1.0, 0.5, 0.5, 0.5],
            vec![0.1, -0.1],
            0.2,
        )
        .unwrap();
        let out = head
            .forward(&LogitVector::new(vec![2.0, 4.0, 1.0]))
            .unwrap();
        let out = out.as_slice();
        assert!((out[0] - 1.1).abs() < 1e-6, "{out:?}");
        assert!((out[1] - 3.4).abs() < 1e-6, "{out:?}");
    }

    #[test]
    fn dropout_never_alters_output() {
        let head = identity_head(4);
        assert!((head.dropout() - 0.2).abs() < f32::EPSILON);
        let input = LogitVector::new(vec![1.0, 2.0, 3.0, 4.0]);
        for _ in 0..50 {
            assert_eq!(head.forward(&input).unwrap(), input);
        }
    }

    #[test]
    fn forward_is_deterministic() {
        let n = 8;
        let weight: Vec<f32> = (0..n * n).map(|i| (i as f32 * 0.37).sin()).collect();
        let head = FusionClassifier::new(n, n, weight, vec![0.01; n], 0.2).unwrap();
        let input = LogitVector::new((0..n).map(|i| i as f32 / 3.0).collect());
        let first = head.forward(&input).unwrap();
        for _ in 0..20 {
            assert_eq!(head.forward(&input).unwrap(), first);
        }
    }

    #[test]
    fn construction_rejects_mismatched_expected_width() {
        let err = identity_head(4).expecting_input(5).unwrap_err();
        assert!(matches!(err, InferenceError::Configuration(_)), "{err}");
        assert!(identity_head(4).expecting_input(4).is_ok());

        let head = identity_head(4);
        assert!(head.expect_input_dim(4).is_ok());
        assert!(matches!(
            head.expect_input_dim(5),
            Err(InferenceError::Configuration(_))
        ));
    }

    #[test]
    fn construction_rejects_bad_shapes() {
        assert!(FusionClassifier::new(2, 2, vec![0.0; 3], vec![0.0; 2], 0.0).is_err());
        assert!(FusionClassifier::new(2, 2, vec![0.0; 4], vec![0.0; 1], 0.0).is_err());
        assert!(FusionClassifier::new(0, 2, vec![], vec![0.0; 2], 0.0).is_err());
        assert!(FusionClassifier::new(2, 2, vec![0.0; 4], vec![0.0; 2], 1.0).is_err());
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let head = identity_head(3);
        let err = head.forward(&LogitVector::new(vec![1.0, 2.0])).unwrap_err();
        assert!(matches!(err, InferenceError::Model(_)));
    }

    #[test]
    fn loads_json_artifact() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"input_dim": 2, "output_dim": 2, "dropout": 0.2,
                "weight": [[1.0, 0.0], [0.0, 2.0]], "bias": [0.5, 0.0]}}"#
        )
        .unwrap();
        let head = FusionClassifier::load(f.path()).unwrap();
        assert_eq!(head.input_dim(), 2);
        let out = head.forward(&LogitVector::new(vec![1.0, 1.0])).unwrap();
        assert_eq!(out.as_slice(), &[1.5, 2.0]);
    }

    #[test]
    fn load_rejects_ragged_rows() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"input_dim": 2, "output_dim": 2, "weight": [[1.0, 0.0], [0.0]], "bias": [0.0, 0.0]}}"#
        )
        .unwrap();
        let err = FusionClassifier::load(f.path()).unwrap_err();
        assert!(err.to_string().contains("row 1"), "{err}");
    }
}
