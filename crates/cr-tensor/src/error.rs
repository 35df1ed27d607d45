// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

/// Result alias used throughout the tensor crate.
pub type MatrixResult<T> = Result<T, MatrixError>;

/// Errors emitted by matrix construction, algebra and sampling helpers.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MatrixError {
    /// A constructor received a zero-sized axis.
    #[error("invalid matrix dimensions ({rows} x {cols}); both axes must be non-zero")]
    InvalidDimensions { rows: usize, cols: usize },
    /// `rows * cols` does not fit in `usize`.
    #[error("matrix dimensions ({rows} x {cols}) overflow the element count")]
    DimensionOverflow { rows: usize, cols: usize },
    /// Raw data does not match the requested shape.
    #[error("data length mismatch: expected {expected}, got {got}")]
    DataLength { expected: usize, got: usize },
    /// Nested rows handed to a constructor are ragged.
    #[error("row {row} has {got} columns, expected {expected}")]
    NotRectangular {
        row: usize,
        expected: usize,
        got: usize,
    },
    /// Operands cannot be combined, not even through the vector alignment rule.
    #[error("shape mismatch in {op}: left={left:?}, right={right:?} cannot be combined")]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    /// A vector-only operation was called on a proper matrix.
    #[error("expected a vector, got a {rows} x {cols} matrix")]
    NotAVector { rows: usize, cols: usize },
    /// Linear vector index outside `0..len`.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    /// `(row, col)` access outside the matrix.
    #[error("element ({row}, {col}) out of bounds for a {rows} x {cols} matrix")]
    ElementOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    /// The vector is not a valid one-hot encoding.
    #[error("malformed one-hot vector: {0}")]
    InvalidOneHot(&'static str),
    /// Clip bounds must satisfy `low < high`.
    #[error("clip range requires low < high, got [{low}, {high}]")]
    InvalidClipRange { low: f64, high: f64 },
    /// Softmax temperature must be strictly positive and finite.
    #[error("temperature must be positive and finite, got {0}")]
    NonPositiveTemperature(f64),
    /// A computation received an empty input.
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
}
