// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// DenseMatrix: column-major flat storage

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Dense matrix over a flat column-major buffer: `data[row + rows*col]`.
/// The layout matches nalgebra's, so solver round-trips are plain
/// buffer copies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn new(rows: usize, cols: usize) -> DenseMatrix {
        DenseMatrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from row slices; handy in tests.
    pub fn of(rows: &[&[f64]]) -> DenseMatrix {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut m = DenseMatrix::new(n_rows, n_cols);
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                m.set(i, j, v);
            }
        }
        m
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row + self.rows * col
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.index(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let i = self.index(row, col);
        self.data[i] = value;
    }

    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        let i = self.index(row, col);
        self.data[i] += value;
    }

    /// Copy of column `j`.
    pub fn column(&self, col: usize) -> Vec<f64> {
        let start = self.rows * col;
        self.data[start..start + self.rows].to_vec()
    }

    /// Copy of row `i`.
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.cols).map(|c| self.get(row, c)).collect()
    }

    pub fn set_column(&mut self, col: usize, values: &[f64]) {
        let start = self.rows * col;
        self.data[start..start + self.rows].copy_from_slice(values);
    }

    pub fn diag(&self) -> Vec<f64> {
        let n = self.rows.min(self.cols);
        (0..n).map(|i| self.get(i, i)).collect()
    }

    pub fn scale_column(&mut self, col: usize, factor: f64) {
        let start = self.rows * col;
        for v in &mut self.data[start..start + self.rows] {
            *v *= factor;
        }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn has_finite_entries(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    pub fn to_na(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.rows, self.cols, &self.data)
    }

    pub fn from_na(m: &DMatrix<f64>) -> DenseMatrix {
        DenseMatrix {
            rows: m.nrows(),
            cols: m.ncols(),
            data: m.as_slice().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_major_layout() {
        let m = DenseMatrix::of(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert_eq!(m.data(), &[1.0, 3.0, 2.0, 4.0]);
        assert_eq!(m.get(0, 1), 2.0);
        assert_eq!(m.column(1), vec![2.0, 4.0]);
        assert_eq!(m.row(1), vec![3.0, 4.0]);
        assert_eq!(m.diag(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_na_round_trip() {
        let m = DenseMatrix::of(&[&[1.0, -2.0, 0.5], &[0.0, 4.0, -1.0]]);
        let back = DenseMatrix::from_na(&m.to_na());
        assert_eq!(m, back);
    }

    #[test]
    fn test_column_mutation() {
        let mut m = DenseMatrix::new(3, 2);
        m.set_column(1, &[1.0, 2.0, 3.0]);
        m.scale_column(1, 2.0);
        assert_eq!(m.column(1), vec![2.0, 4.0, 6.0]);
        assert_eq!(m.column(0), vec![0.0, 0.0, 0.0]);
        m.add(0, 0, 1.5);
        assert_eq!(m.get(0, 0), 1.5);
    }
}
