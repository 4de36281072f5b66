//! Per-class score vectors and the numeric helpers applied to them.

use crate::error::InferenceError;

/// Raw (pre-softmax) class scores produced by one encoder or the fusion head.
#[derive(Debug, Clone, PartialEq)]
pub struct LogitVector(Vec<f32>);

impl LogitVector {
    pub fn new(scores: Vec<f32>) -> Self {
        Self(scores)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Concatenate `first` then `second` into one fusion input.
    pub fn concat(first: &LogitVector, second: &LogitVector) -> LogitVector {
        let mut out = Vec::with_capacity(first.len() + second.len());
        out.extend_from_slice(&first.0);
        out.extend_from_slice(&second.0);
        LogitVector(out)
    }

    /// Numerically stable softmax over all classes.
    ///
    /// Only meaningful for finite scores; [`predicted_class`](Self::predicted_class)
    /// checks that before calling it.
    pub fn softmax(&self) -> Vec<f32> {
        let max = self.0.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut exps: Vec<f32> = self.0.iter().map(|&x| (x - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        if sum > 0.0 {
            for p in &mut exps {
                *p /= sum;
            }
        }
        exps
    }

    /// Index of the highest raw score; ties go to the lowest index.
    ///
    /// Fails on an empty vector or any NaN/infinite score.
    pub fn argmax(&self) -> Result<usize, InferenceError> {
        self.ensure_finite()?;
        argmax(&self.0).ok_or_else(|| InferenceError::Model("empty score vector".into()))
    }

    /// Softmax, then the index of the most probable class.
    ///
    /// Same failure cases as [`argmax`](Self::argmax).
    pub fn predicted_class(&self) -> Result<usize, InferenceError> {
        self.ensure_finite()?;
        argmax(&self.softmax()).ok_or_else(|| InferenceError::Model("empty score vector".into()))
    }

    fn ensure_finite(&self) -> Result<(), InferenceError> {
        match self.0.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(InferenceError::Model(format!(
                "non-finite score {} at class {i}",
                self.0[i]
            ))),
            None => Ok(()),
        }
    }
}

/// First index holding the maximum value. NaN entries never win.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
