//! Deterministic in-process encoders for exercising the pipeline without
//! ONNX artifacts.

use std::sync::atomic::{AtomicUsize, Ordering};

use diagnost_core::{InferenceError, LogitVector};

use crate::encoder::TextEncoder;

/// Scores derived from the input bytes; same text, same scores.
pub struct HashEncoder {
    name: String,
    classes: usize,
    seed: u32,
    calls: AtomicUsize,
}

impl HashEncoder {
    pub fn new(name: &str, classes: usize, seed: u32) -> Self {
        Self {
            name: name.to_string(),
            classes,
            seed,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextEncoder for HashEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_classes(&self) -> usize {
        self.classes
    }

    fn encode(&self, text: &str) -> Result<LogitVector, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scores = (0..self.classes as u32)
            .map(|c| {
                let mut h = 2166136261u32 ^ self.seed.wrapping_mul(31).wrapping_add(c);
                for b in text.bytes() {
                    h = (h ^ u32::from(b)).wrapping_mul(16777619);
                }
                (h % 1000) as f32 / 100.0 - 5.0
            })
            .collect();
        Ok(LogitVector::new(scores))
    }
}

/// Returns the same scores for every input.
pub struct FixedEncoder {
    name: String,
    scores: Vec<f32>,
    classes: usize,
}

impl FixedEncoder {
    pub fn new(name: &str, scores: Vec<f32>) -> Self {
        let classes = scores.len();
        Self {
            name: name.to_string(),
            scores,
            classes,
        }
    }

    /// Report a class count that disagrees with the actual output.
    pub fn claiming_classes(mut self, classes: usize) -> Self {
        self.classes = classes;
        self
    }
}

impl TextEncoder for FixedEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_classes(&self) -> usize {
        self.classes
    }

    fn encode(&self, _text: &str) -> Result<LogitVector, InferenceError> {
        Ok(LogitVector::new(self.scores.clone()))
    }
}

/// Always fails as if the runtime ran out of resources.
pub struct FailingEncoder {
    classes: usize,
}

impl FailingEncoder {
    pub fn new(classes: usize) -> Self {
        Self { classes }
    }
}

impl TextEncoder for FailingEncoder {
    fn name(&self) -> &str {
        "failing"
    }

    fn num_classes(&self) -> usize {
        self.classes
    }

    fn encode(&self, _text: &str) -> Result<LogitVector, InferenceError> {
        Err(InferenceError::artifact("session run failed: out of memory"))
    }
}
