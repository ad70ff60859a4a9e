// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// SparseMatrix: hash-indexed assembly storage

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::dense::DenseMatrix;

/// Sparse matrix for assembly. Entries are keyed by the flat
/// column-major index `row + rows*col`; `add` accumulates, which is
/// what the assembler needs when several exchanges hit the same cell.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    entries: HashMap<u64, f64>,
}

impl SparseMatrix {
    pub fn new(rows: usize, cols: usize) -> SparseMatrix {
        SparseMatrix {
            rows,
            cols,
            entries: HashMap::new(),
        }
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> u64 {
        (row + self.rows * col) as u64
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        *self.entries.get(&self.index(row, col)).unwrap_or(&0.0)
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let i = self.index(row, col);
        if value == 0.0 {
            self.entries.remove(&i);
        } else {
            self.entries.insert(i, value);
        }
    }

    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        let i = self.index(row, col);
        *self.entries.entry(i).or_insert(0.0) += value;
    }

    pub fn non_zero_count(&self) -> usize {
        self.entries.len()
    }

    pub fn density(&self) -> f64 {
        let total = (self.rows * self.cols) as f64;
        if total == 0.0 {
            return 0.0;
        }
        self.entries.len() as f64 / total
    }

    /// Iterate the non-zero triplets `(row, col, value)`.
    pub fn each<F: FnMut(usize, usize, f64)>(&self, mut f: F) {
        for (&flat, &value) in &self.entries {
            let row = (flat as usize) % self.rows;
            let col = (flat as usize) / self.rows;
            f(row, col, value);
        }
    }

    pub fn to_dense(&self) -> DenseMatrix {
        let mut m = DenseMatrix::new(self.rows, self.cols);
        self.each(|row, col, value| m.set(row, col, value));
        m
    }
}
