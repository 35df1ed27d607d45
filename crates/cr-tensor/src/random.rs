// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{MatrixError, MatrixResult};
use crate::matrix::Matrix;
use cr_config::determinism;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::warn;

/// Outcome of a categorical draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CategoricalDraw {
    /// Chosen index.
    pub index: usize,
    /// `true` when the cumulative probability never exceeded the uniform draw
    /// and the last index was returned instead.
    pub fell_back: bool,
}

/// Seedable source of Gaussian weights and categorical samples.
#[derive(Clone, Debug)]
pub struct RandomSource {
    rng: StdRng,
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RandomSource {
    /// Creates a source from an explicit seed. Without a seed the process-wide
    /// determinism settings decide between a derived seed and OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: determinism::rng_from_optional(seed, "cr-tensor/random"),
        }
    }

    /// Creates a deterministic source.
    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    /// Creates a source whose seed is derived from `label` when determinism is
    /// enabled.
    pub fn from_label(label: &str) -> Self {
        Self {
            rng: determinism::rng_from_label(label),
        }
    }

    /// `rows x cols` matrix with independent standard normal elements.
    pub fn gaussian_matrix(&mut self, rows: usize, cols: usize) -> MatrixResult<Matrix> {
        let rng = &mut self.rng;
        Matrix::from_fn(rows, cols, |_, _| StandardNormal.sample(&mut *rng))
    }

    /// Column vector of `k` independent standard normal elements.
    pub fn gaussian_vector(&mut self, k: usize) -> MatrixResult<Matrix> {
        self.gaussian_matrix(k, 1)
    }

    /// Uniform value in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Draws an index with the given probabilities by walking the cumulative
    /// sum until it exceeds a uniform draw. When rounding leaves the total
    /// below the draw the last index is returned and flagged.
    pub fn draw(&mut self, probabilities: &[f64]) -> MatrixResult<CategoricalDraw> {
        if probabilities.is_empty() {
            return Err(MatrixError::EmptyInput("probabilities"));
        }
        let threshold = self.uniform();
        let mut cumulative = 0.0;
        for (index, &p) in probabilities.iter().enumerate() {
            cumulative += p;
            if cumulative > threshold {
                return Ok(CategoricalDraw {
                    index,
                    fell_back: false,
                });
            }
        }
        Ok(CategoricalDraw {
            index: probabilities.len() - 1,
            fell_back: true,
        })
    }

    /// Like [`RandomSource::draw`] but returns only the index, logging a
    /// warning when the fallback fired.
    pub fn categorical_choice(&mut self, probabilities: &[f64]) -> MatrixResult<usize> {
        let draw = self.draw(probabilities)?;
        if draw.fell_back {
            warn!(
                total = probabilities.iter().sum::<f64>(),
                len = probabilities.len(),
                "categorical probabilities never exceeded the draw; returning the last index"
            );
        }
        Ok(draw.index)
    }
}
