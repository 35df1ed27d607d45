// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Dense matrix algebra and randomness for the char-rnn engine.
//!
//! Everything is plain safe Rust over `f64` buffers: no BLAS, no GPU. Vectors
//! are matrices with a single row or column; constructors that take a length
//! produce column vectors (`k x 1`).

pub mod error;
pub mod matrix;
pub mod random;
pub mod softmax;

pub use error::{MatrixError, MatrixResult};
pub use matrix::{Alignment, Matrix, ONE_HOT_TOLERANCE};
pub use random::{CategoricalDraw, RandomSource};
pub use softmax::{softmax, softmax_with_temperature};
