// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{RnnError, RnnResult};
use cr_tensor::{Matrix, MatrixError};

/// Element-wise bound applied to every gradient after a backward pass.
pub const GRADIENT_CLIP: f64 = 5.0;

/// Stabiliser added to the root of the squared-gradient sum.
pub const ADAGRAD_EPSILON: f64 = 1e-8;

/// Clamps every element of `gradient` to `[-GRADIENT_CLIP, GRADIENT_CLIP]`.
pub fn clip_gradient(gradient: &mut Matrix) -> RnnResult<()> {
    gradient.clip_inplace(-GRADIENT_CLIP, GRADIENT_CLIP)?;
    Ok(())
}

pub(crate) fn validate_learning_rate(learning_rate: f64) -> RnnResult<()> {
    if learning_rate.is_finite() && learning_rate > 0.0 {
        Ok(())
    } else {
        Err(RnnError::InvalidLearningRate(learning_rate))
    }
}

/// Adagrad: per-element learning rates scaled by the running root sum of
/// squared gradients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Adagrad {
    learning_rate: f64,
}

impl Adagrad {
    pub fn new(learning_rate: f64) -> RnnResult<Self> {
        validate_learning_rate(learning_rate)?;
        Ok(Self { learning_rate })
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Applies one update:
    ///
    /// ```text
    /// memory += grad ⊙ grad
    /// param  -= learning_rate · grad / (sqrt(memory) + 1e-8)
    /// ```
    ///
    /// The memory is never reset, so the effective step only shrinks.
    pub fn update(&self, param: &mut Matrix, grad: &Matrix, memory: &mut Matrix) -> RnnResult<()> {
        for (label, other) in [("adagrad_grad", grad.shape()), ("adagrad_memory", memory.shape())] {
            if other != param.shape() {
                return Err(MatrixError::ShapeMismatch {
                    op: label,
                    left: param.shape(),
                    right: other,
                }
                .into());
            }
        }
        for (m, &g) in memory.data_mut().iter_mut().zip(grad.data()) {
            *m += g * g;
        }
        for ((w, &g), &m) in param
            .data_mut()
            .iter_mut()
            .zip(grad.data())
            .zip(memory.data())
        {
            *w -= self.learning_rate * g / (m.sqrt() + ADAGRAD_EPSILON);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn first_update_moves_by_the_learning_rate() {
        let optimizer = Adagrad::new(0.1).unwrap();
        let mut param = Matrix::column(vec![1.0, -1.0, 0.5]).unwrap();
        let grad = Matrix::column(vec![2.0, -0.5, 0.0]).unwrap();
        let mut memory = Matrix::zeros_like(&param);
        optimizer.update(&mut param, &grad, &mut memory).unwrap();
        assert_eq!(memory.data(), &[4.0, 0.25, 0.0]);
        assert_abs_diff_eq!(param.data()[0], 0.9, epsilon = 1e-8);
        assert_abs_diff_eq!(param.data()[1], -0.9, epsilon = 1e-8);
        assert_eq!(param.data()[2], 0.5);
    }

    #[test]
    fn memory_accumulates_and_steps_shrink() {
        let optimizer = Adagrad::new(1.0).unwrap();
        let mut param = Matrix::zeros_vector(1).unwrap();
        let grad = Matrix::ones_vector(1).unwrap();
        let mut memory = Matrix::zeros_like(&param);
        let mut previous = f64::INFINITY;
        let mut last_value = 0.0;
        for step in 1..=5 {
            optimizer.update(&mut param, &grad, &mut memory).unwrap();
            assert_eq!(memory.data()[0], step as f64);
            let delta = last_value - param.data()[0];
            assert!(delta < previous);
            previous = delta;
            last_value = param.data()[0];
        }
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let optimizer = Adagrad::new(0.1).unwrap();
        let mut param = Matrix::zeros(2, 2).unwrap();
        let grad = Matrix::zeros_vector(4).unwrap();
        let mut memory = Matrix::zeros_like(&param);
        assert!(optimizer.update(&mut param, &grad, &mut memory).is_err());
        assert!(Adagrad::new(0.0).is_err());
        assert!(Adagrad::new(f64::NAN).is_err());
    }

    #[test]
    fn clipping_bounds_gradients() {
        let mut g = Matrix::column(vec![-12.0, 0.3, 7.5]).unwrap();
        clip_gradient(&mut g).unwrap();
        assert_eq!(g.data(), &[-5.0, 0.3, 5.0]);
    }
}
