//! Dense vector and matrix workspace types.
//!
//! These are the tensors the solver callbacks assemble into. The real
//! sparse storage lives in the external linear-algebra library; this
//! crate only needs value semantics, accumulation, and the zero-row
//! identity fix-up, so a dense representation is enough.

use std::fmt;

/// A dense vector of f64 entries.
#[derive(Clone, Debug, PartialEq)]
pub struct Vector {
    values: Vec<f64>,
}

impl Vector {
    /// Create a zero vector of the given length.
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    /// Create a vector from existing values.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has zero entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read-only view of the entries.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Mutable view of the entries.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Overwrite this vector's entries with `other`'s, adopting its length.
    pub fn assign(&mut self, other: &Vector) {
        self.values.clear();
        self.values.extend_from_slice(&other.values);
    }

    /// Set every entry to zero, keeping the length.
    pub fn zero(&mut self) {
        for v in &mut self.values {
            *v = 0.0;
        }
    }

    /// Add `value` to entry `i`.
    pub fn add(&mut self, i: usize, value: f64) {
        self.values[i] += value;
    }

    /// Grow or shrink to `len`, zero-filling new entries.
    pub fn resize(&mut self, len: usize) {
        self.values.resize(len, 0.0);
    }

    /// The infinity norm (largest absolute entry; 0 for an empty vector).
    pub fn norm_inf(&self) -> f64 {
        self.values.iter().fold(0.0, |m, v| m.max(v.abs()))
    }

    /// Largest absolute entrywise difference against `other`.
    ///
    /// Entries beyond the shorter length count with the longer
    /// vector's magnitude, so a length mismatch reads as a change.
    pub fn max_abs_diff(&self, other: &Vector) -> f64 {
        let n = self.values.len().max(other.values.len());
        let mut m = 0.0f64;
        for i in 0..n {
            let a = self.values.get(i).copied().unwrap_or(0.0);
            let b = other.values.get(i).copied().unwrap_or(0.0);
            m = m.max((a - b).abs());
        }
        m
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vector[{}]", self.values.len())
    }
}

/// A dense row-major matrix of f64 entries.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix {
    /// Create a zero matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Entry at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.cols + j]
    }

    /// Set entry `(i, j)` to `value`.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.cols + j] = value;
    }

    /// Add `value` to entry `(i, j)`.
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.cols + j] += value;
    }

    /// Set every entry to zero, keeping the shape.
    pub fn zero(&mut self) {
        for v in &mut self.values {
            *v = 0.0;
        }
    }

    /// Read-only view of row `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }

    /// Mutable view of row `i`.
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.values[i * self.cols..(i + 1) * self.cols]
    }

    /// Place 1.0 on the diagonal of every all-zero row.
    ///
    /// Keeps the system nonsingular when a field contributes no
    /// equations at some degrees of freedom (e.g. inactive blocks),
    /// without disturbing assembled rows.
    pub fn ident_zeros(&mut self) {
        for i in 0..self.rows.min(self.cols) {
            let start = i * self.cols;
            if self.values[start..start + self.cols].iter().all(|&v| v == 0.0) {
                self.values[start + i] = 1.0;
            }
        }
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "matrix[{}x{}]", self.rows, self.cols)
    }
}
