// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{MatrixError, MatrixResult};
use crate::matrix::Matrix;

/// Normalises `logits` into a probability distribution (temperature `1.0`).
///
/// The maximum is subtracted before exponentiating, which leaves the result
/// unchanged mathematically but keeps large logits finite.
pub fn softmax(logits: &Matrix) -> Matrix {
    let max = logits.max();
    let mut out = logits.map(|x| (x - max).exp());
    let total = out.sum();
    out.map_inplace(|x| x / total);
    out
}

/// Softmax of `logits / temperature`. Lower temperatures sharpen the
/// distribution toward its mode.
pub fn softmax_with_temperature(logits: &Matrix, temperature: f64) -> MatrixResult<Matrix> {
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(MatrixError::NonPositiveTemperature(temperature));
    }
    if temperature == 1.0 {
        return Ok(softmax(logits));
    }
    Ok(softmax(&logits.div_scalar(temperature)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn logits() -> Matrix {
        Matrix::column(vec![1.5, -0.25, 3.0, 0.0, 2.0]).unwrap()
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&logits());
        assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-9);
        assert!(p.data().iter().all(|&x| x > 0.0));
        assert_eq!(p.shape(), (5, 1));
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let base = softmax(&logits());
        for shift in [-100.0, -1.0, 0.5, 42.0, 700.0] {
            let shifted = softmax(&logits().add_scalar(shift));
            for (a, b) in base.data().iter().zip(shifted.data()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn temperature_sharpens_and_flattens() {
        let neutral = softmax(&logits());
        let cold = softmax_with_temperature(&logits(), 0.25).unwrap();
        let hot = softmax_with_temperature(&logits(), 4.0).unwrap();
        assert!(cold.data()[2] > neutral.data()[2]);
        assert!(hot.data()[2] < neutral.data()[2]);
        assert_abs_diff_eq!(cold.sum(), 1.0, epsilon = 1e-9);
        assert_eq!(softmax_with_temperature(&logits(), 1.0).unwrap(), neutral);
    }

    #[test]
    fn non_positive_temperature_is_rejected() {
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                softmax_with_temperature(&logits(), t),
                Err(MatrixError::NonPositiveTemperature(_))
            ));
        }
    }
}
