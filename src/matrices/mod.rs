// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//! Matrix Storage and Index Structures
//!
//! Matrices are assembled sparsely and upgraded to dense storage when a
//! solver or a hand-mutation needs them. The index types map the
//! process-product pairs, elementary flows and impact categories of a
//! product system to matrix positions.

pub mod builder;
pub mod dense;
pub mod indices;
pub mod sparse;

pub use builder::{AssemblyContext, MatrixData};
pub use dense::DenseMatrix;
pub use indices::{FlowIndex, ImpactIndex, ProcessProduct, TechIndex};
pub use sparse::SparseMatrix;

use serde::{Deserialize, Serialize};

/// A matrix that is either in sparse assembly form or dense solver
/// form. Reads work on both; `make_dense` upgrades in place before
/// hand-mutation (the simulator does this when it overwrites sub-system
/// columns), `to_dense` produces the solver input.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Matrix {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl Matrix {
    pub fn sparse(rows: usize, cols: usize) -> Matrix {
        Matrix::Sparse(SparseMatrix::new(rows, cols))
    }

    pub fn dense(rows: usize, cols: usize) -> Matrix {
        Matrix::Dense(DenseMatrix::new(rows, cols))
    }

    pub fn rows(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.rows(),
            Matrix::Sparse(m) => m.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.cols(),
            Matrix::Sparse(m) => m.cols(),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            Matrix::Dense(m) => m.get(row, col),
            Matrix::Sparse(m) => m.get(row, col),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        match self {
            Matrix::Dense(m) => m.set(row, col, value),
            Matrix::Sparse(m) => m.set(row, col, value),
        }
    }

    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        match self {
            Matrix::Dense(m) => m.add(row, col, value),
            Matrix::Sparse(m) => m.add(row, col, value),
        }
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        match self {
            Matrix::Dense(m) => m.column(col),
            Matrix::Sparse(m) => (0..m.rows()).map(|r| m.get(r, col)).collect(),
        }
    }

    pub fn diag(&self) -> Vec<f64> {
        match self {
            Matrix::Dense(m) => m.diag(),
            Matrix::Sparse(m) => {
                let n = m.rows().min(m.cols());
                (0..n).map(|i| m.get(i, i)).collect()
            }
        }
    }

    /// Dense copy for the solver.
    pub fn to_dense(&self) -> DenseMatrix {
        match self {
            Matrix::Dense(m) => m.clone(),
            Matrix::Sparse(m) => m.to_dense(),
        }
    }

    /// Upgrade to dense storage in place and hand out the buffer.
    pub fn make_dense(&mut self) -> &mut DenseMatrix {
        if let Matrix::Sparse(m) = self {
            *self = Matrix::Dense(m.to_dense());
        }
        match self {
            Matrix::Dense(m) => m,
            Matrix::Sparse(_) => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_on_write() {
        let mut m = Matrix::sparse(2, 2);
        m.add(0, 0, 1.0);
        m.add(1, 0, -5.0);
        assert!(matches!(m, Matrix::Sparse(_)));
        m.make_dense().set(1, 1, 4.0);
        assert!(matches!(m, Matrix::Dense(_)));
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 1), 4.0);
        assert_eq!(m.column(0), vec![1.0, -5.0]);
    }
}
