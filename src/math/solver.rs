// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// MatrixSolver: the algebraic contract of the calculators

use nalgebra::DVector;

use crate::error::{CoreError, CoreResult};
use crate::matrices::DenseMatrix;

/// The algebraic operations the calculators need. Implementations must
/// be deterministic for identical inputs (modulo floating-point
/// non-associativity) and independent of the calculation RNG.
pub trait MatrixSolver {
    /// `s` with `A·s = f`.
    fn solve(&self, a: &DenseMatrix, f: &[f64]) -> CoreResult<Vec<f64>>;

    /// `x` with `A·x = d·e_j` (single-column demand).
    fn solve_column(&self, a: &DenseMatrix, j: usize, demand: f64) -> CoreResult<Vec<f64>> {
        let mut f = vec![0.0; a.rows()];
        f[j] = demand;
        self.solve(a, &f)
    }

    /// `A⁻¹`.
    fn invert(&self, a: &DenseMatrix) -> CoreResult<DenseMatrix>;

    /// Dense product `X·Y`.
    fn multiply(&self, x: &DenseMatrix, y: &DenseMatrix) -> DenseMatrix;

    /// `X·v`.
    fn multiply_vec(&self, x: &DenseMatrix, v: &[f64]) -> Vec<f64>;
}

/// LU-based dense solver.
pub struct DenseSolver;

impl DenseSolver {
    pub fn new() -> DenseSolver {
        DenseSolver
    }
}

impl Default for DenseSolver {
    fn default() -> Self {
        DenseSolver::new()
    }
}

impl MatrixSolver for DenseSolver {
    fn solve(&self, a: &DenseMatrix, f: &[f64]) -> CoreResult<Vec<f64>> {
        let lu = a.to_na().lu();
        let x = lu
            .solve(&DVector::from_column_slice(f))
            .ok_or_else(|| CoreError::SingularMatrix(format!("solve failed, n={}", a.rows())))?;
        let values: Vec<f64> = x.iter().copied().collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::SingularMatrix(
                "non-finite entries in solution".to_string(),
            ));
        }
        Ok(values)
    }

    fn invert(&self, a: &DenseMatrix) -> CoreResult<DenseMatrix> {
        let inverse = a.to_na().try_inverse().ok_or_else(|| {
            CoreError::SingularMatrix(format!("inversion failed, n={}", a.rows()))
        })?;
        let result = DenseMatrix::from_na(&inverse);
        if !result.has_finite_entries() {
            return Err(CoreError::SingularMatrix(
                "non-finite entries in inverse".to_string(),
            ));
        }
        Ok(result)
    }

    fn multiply(&self, x: &DenseMatrix, y: &DenseMatrix) -> DenseMatrix {
        DenseMatrix::from_na(&(x.to_na() * y.to_na()))
    }

    fn multiply_vec(&self, x: &DenseMatrix, v: &[f64]) -> Vec<f64> {
        let result = x.to_na() * DVector::from_column_slice(v);
        result.iter().copied().collect()
    }
}
