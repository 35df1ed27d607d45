// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{MatrixError, MatrixResult};
use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether an element is `0` or `1` in a one-hot
/// vector.
pub const ONE_HOT_TOLERANCE: f64 = 1e-6;

/// How the right-hand operand of a binary operation lines up with the left.
///
/// Vectors may be handed over in either orientation. The rule is deliberately
/// narrow: only a vector operand is ever reinterpreted, and only by a single
/// transpose, so genuine shape bugs between proper matrices still fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    /// Shapes match as given.
    Exact,
    /// The right operand is a vector that matches once transposed.
    TransposedVector,
}

impl Alignment {
    /// Resolves the alignment for an element-wise operation. Both operands must
    /// have identical shapes, or both be vectors of the same length.
    pub fn elementwise(left: (usize, usize), right: (usize, usize)) -> Option<Self> {
        if left == right {
            return Some(Alignment::Exact);
        }
        let left_vector = left.0 == 1 || left.1 == 1;
        if left_vector && left.0 == right.1 && left.1 == right.0 {
            return Some(Alignment::TransposedVector);
        }
        None
    }

    /// Resolves the alignment for `left · right`. Requires `left.cols ==
    /// right.rows`, or a right-hand vector whose length equals `left.cols`.
    pub fn dot(left: (usize, usize), right: (usize, usize)) -> Option<Self> {
        if left.1 == right.0 {
            return Some(Alignment::Exact);
        }
        if right.0 == 1 && right.1 == left.1 {
            return Some(Alignment::TransposedVector);
        }
        None
    }
}

/// Dense row-major matrix of `f64` values with an immutable, non-zero shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredMatrix", into = "StoredMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<StoredMatrix> for Matrix {
    type Error = MatrixError;

    fn try_from(stored: StoredMatrix) -> MatrixResult<Self> {
        Matrix::from_vec(stored.rows, stored.cols, stored.data)
    }
}

impl From<Matrix> for StoredMatrix {
    fn from(matrix: Matrix) -> Self {
        StoredMatrix {
            rows: matrix.rows,
            cols: matrix.cols,
            data: matrix.data,
        }
    }
}

/// Number of elements of a `rows x cols` matrix, rejecting empty axes and
/// shapes whose element count does not fit in `usize`.
fn element_count(rows: usize, cols: usize) -> MatrixResult<usize> {
    if rows == 0 || cols == 0 {
        return Err(MatrixError::InvalidDimensions { rows, cols });
    }
    rows.checked_mul(cols)
        .ok_or(MatrixError::DimensionOverflow { rows, cols })
}

impl Matrix {
    fn filled(rows: usize, cols: usize, value: f64) -> MatrixResult<Self> {
        let len = element_count(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            data: vec![value; len],
        })
    }

    /// Create a `rows x cols` matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> MatrixResult<Self> {
        Self::filled(rows, cols, 0.0)
    }

    /// Create a `rows x cols` matrix filled with ones.
    pub fn ones(rows: usize, cols: usize) -> MatrixResult<Self> {
        Self::filled(rows, cols, 1.0)
    }

    /// Create a `k x 1` column vector of zeros.
    pub fn zeros_vector(k: usize) -> MatrixResult<Self> {
        Self::zeros(k, 1)
    }

    /// Create a `k x 1` column vector of ones.
    pub fn ones_vector(k: usize) -> MatrixResult<Self> {
        Self::ones(k, 1)
    }

    /// Zero matrix with the same shape as `other`.
    pub fn zeros_like(other: &Matrix) -> Self {
        Self {
            rows: other.rows,
            cols: other.cols,
            data: vec![0.0; other.data.len()],
        }
    }

    /// Matrix of ones with the same shape as `other`.
    pub fn ones_like(other: &Matrix) -> Self {
        Self {
            rows: other.rows,
            cols: other.cols,
            data: vec![1.0; other.data.len()],
        }
    }

    /// Column vector of length `k` with a single `1.0` at `index`.
    pub fn one_hot(k: usize, index: usize) -> MatrixResult<Self> {
        let mut vector = Self::zeros_vector(k)?;
        if index >= k {
            return Err(MatrixError::IndexOutOfBounds { index, len: k });
        }
        vector.data[index] = 1.0;
        Ok(vector)
    }

    /// Create a matrix from row-major data. The vector must hold `rows * cols`
    /// elements.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> MatrixResult<Self> {
        let expected = element_count(rows, cols)?;
        if data.len() != expected {
            return Err(MatrixError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a column vector holding `data`.
    pub fn column(data: Vec<f64>) -> MatrixResult<Self> {
        let rows = data.len();
        Self::from_vec(rows, 1, data)
    }

    /// Create a matrix from nested rows, rejecting ragged input.
    pub fn from_rows(rows: &[Vec<f64>]) -> MatrixResult<Self> {
        let expected = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * expected);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != expected {
                return Err(MatrixError::NotRectangular {
                    row,
                    expected,
                    got: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Self::from_vec(rows.len(), expected, data)
    }

    /// Construct a matrix by evaluating `f(row, col)` for every coordinate.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> MatrixResult<Self>
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(element_count(rows, cols)?);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Ok(Self { rows, cols, data })
    }

    /// Returns the `(rows, cols)` pair.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; shapes are non-zero by construction.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` when the matrix has a single row or a single column.
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    /// Length of a vector, or [`MatrixError::NotAVector`].
    pub fn vector_len(&self) -> MatrixResult<usize> {
        if self.is_vector() {
            Ok(self.data.len())
        } else {
            Err(self.not_a_vector())
        }
    }

    /// Row-major view of the elements.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable row-major view of the elements.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Flattens the matrix into a row-major vector.
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.clone()
    }

    /// Consumes the matrix and returns its row-major elements.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Vector element by linear index.
    pub fn get(&self, index: usize) -> MatrixResult<f64> {
        let len = self.vector_len()?;
        self.data
            .get(index)
            .copied()
            .ok_or(MatrixError::IndexOutOfBounds { index, len })
    }

    /// Overwrites a vector element by linear index.
    pub fn set(&mut self, index: usize, value: f64) -> MatrixResult<()> {
        let len = self.vector_len()?;
        let slot = self
            .data
            .get_mut(index)
            .ok_or(MatrixError::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Element at `(row, col)`.
    pub fn at(&self, row: usize, col: usize) -> MatrixResult<f64> {
        let offset = self.offset(row, col)?;
        Ok(self.data[offset])
    }

    /// Overwrites the element at `(row, col)`.
    pub fn set_at(&mut self, row: usize, col: usize, value: f64) -> MatrixResult<()> {
        let offset = self.offset(row, col)?;
        self.data[offset] = value;
        Ok(())
    }

    fn offset(&self, row: usize, col: usize) -> MatrixResult<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(MatrixError::ElementOutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    fn not_a_vector(&self) -> MatrixError {
        MatrixError::NotAVector {
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Returns the transpose.
    pub fn transpose(&self) -> Matrix {
        let mut data = vec![0.0; self.data.len()];
        for r in 0..self.rows {
            for c in 0..self.cols {
                data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Matrix product `self · other`, see [`Alignment::dot`] for the vector rule.
    pub fn dot(&self, other: &Matrix) -> MatrixResult<Matrix> {
        let transposed;
        let rhs = match Alignment::dot(self.shape(), other.shape()) {
            Some(Alignment::Exact) => other,
            Some(Alignment::TransposedVector) => {
                transposed = other.transpose();
                &transposed
            }
            None => {
                return Err(MatrixError::ShapeMismatch {
                    op: "dot",
                    left: self.shape(),
                    right: other.shape(),
                })
            }
        };
        let (rows, inner, cols) = (self.rows, self.cols, rhs.cols);
        let mut data = vec![0.0; rows * cols];
        for i in 0..rows {
            let lhs_row = &self.data[i * inner..(i + 1) * inner];
            let out_row = &mut data[i * cols..(i + 1) * cols];
            for (k, &a) in lhs_row.iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                let rhs_row = &rhs.data[k * cols..(k + 1) * cols];
                for (out, &b) in out_row.iter_mut().zip(rhs_row) {
                    *out += a * b;
                }
            }
        }
        Ok(Matrix { rows, cols, data })
    }

    fn zip_with<F>(&self, other: &Matrix, op: &'static str, f: F) -> MatrixResult<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.check_elementwise(other, op)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    fn zip_with_inplace<F>(&mut self, other: &Matrix, op: &'static str, f: F) -> MatrixResult<()>
    where
        F: Fn(&mut f64, f64),
    {
        self.check_elementwise(other, op)?;
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            f(a, b);
        }
        Ok(())
    }

    // Both alignments share the same linear element order, so a plain zip is
    // correct once the shapes have been validated.
    fn check_elementwise(&self, other: &Matrix, op: &'static str) -> MatrixResult<()> {
        match Alignment::elementwise(self.shape(), other.shape()) {
            Some(_) => Ok(()),
            None => Err(MatrixError::ShapeMismatch {
                op,
                left: self.shape(),
                right: other.shape(),
            }),
        }
    }

    /// Element-wise sum. The result keeps the shape of `self`.
    pub fn add(&self, other: &Matrix) -> MatrixResult<Matrix> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    /// Element-wise difference.
    pub fn sub(&self, other: &Matrix) -> MatrixResult<Matrix> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product.
    pub fn hadamard(&self, other: &Matrix) -> MatrixResult<Matrix> {
        self.zip_with(other, "hadamard", |a, b| a * b)
    }

    /// Element-wise quotient.
    pub fn div(&self, other: &Matrix) -> MatrixResult<Matrix> {
        self.zip_with(other, "div", |a, b| a / b)
    }

    /// `self += other`, element-wise.
    pub fn add_inplace(&mut self, other: &Matrix) -> MatrixResult<()> {
        self.zip_with_inplace(other, "add_inplace", |a, b| *a += b)
    }

    /// `self += scale * other`, element-wise.
    pub fn add_scaled(&mut self, other: &Matrix, scale: f64) -> MatrixResult<()> {
        self.zip_with_inplace(other, "add_scaled", |a, b| *a += scale * b)
    }

    /// `self *= other`, element-wise.
    pub fn hadamard_inplace(&mut self, other: &Matrix) -> MatrixResult<()> {
        self.zip_with_inplace(other, "hadamard_inplace", |a, b| *a *= b)
    }

    /// Adds `value` to every element.
    pub fn add_scalar(&self, value: f64) -> Matrix {
        self.map(|x| x + value)
    }

    /// Multiplies every element by `value`.
    pub fn scale(&self, value: f64) -> Matrix {
        self.map(|x| x * value)
    }

    /// Divides every element by `value`.
    pub fn div_scalar(&self, value: f64) -> Matrix {
        self.map(|x| x / value)
    }

    /// Element-wise natural exponential.
    pub fn exp(&self) -> Matrix {
        self.map(f64::exp)
    }

    /// Element-wise hyperbolic tangent.
    pub fn tanh(&self) -> Matrix {
        self.map(f64::tanh)
    }

    /// Clamps every element to `[low, high]`.
    pub fn clip(&self, low: f64, high: f64) -> MatrixResult<Matrix> {
        let mut out = self.clone();
        out.clip_inplace(low, high)?;
        Ok(out)
    }

    /// Clamps every element to `[low, high]` in place.
    pub fn clip_inplace(&mut self, low: f64, high: f64) -> MatrixResult<()> {
        if !(low < high) {
            return Err(MatrixError::InvalidClipRange { low, high });
        }
        for value in self.data.iter_mut() {
            *value = value.clamp(low, high);
        }
        Ok(())
    }

    /// Applies `f` to every element, returning a new matrix.
    pub fn map<F>(&self, f: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Applies `f` to every element in place.
    pub fn map_inplace<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64,
    {
        for value in self.data.iter_mut() {
            *value = f(*value);
        }
    }

    /// Sum of all elements.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Largest element.
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Decodes a one-hot vector back into the index of its single `1`.
    ///
    /// Every element must be within [`ONE_HOT_TOLERANCE`] of `0` or `1`, and
    /// exactly one must be `1`.
    pub fn one_hot_index(&self) -> MatrixResult<usize> {
        self.vector_len()?;
        let mut found = None;
        for (index, &value) in self.data.iter().enumerate() {
            if value.abs() <= ONE_HOT_TOLERANCE {
                continue;
            }
            if (value - 1.0).abs() > ONE_HOT_TOLERANCE {
                return Err(MatrixError::InvalidOneHot(
                    "elements must be either 0 or 1",
                ));
            }
            if found.is_some() {
                return Err(MatrixError::InvalidOneHot("more than one element is 1"));
            }
            found = Some(index);
        }
        found.ok_or(MatrixError::InvalidOneHot("all elements are 0"))
    }
}
