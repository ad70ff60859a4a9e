// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// ResultProvider: the algebraic result contract and its three variants

//! A `ResultProvider` maps matrix positions to scaling, total, direct,
//! upstream and contribution values. The documentation is phrased in
//! matrix algebra but the contract is the protocol, not the storage:
//! `SimpleResultProvider` wraps precomputed vectors, the eager provider
//! owns the full inverse, the lazy provider solves per column and
//! memoizes. Returned vectors are value copies; treat them as read-only
//! views of the provider state.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::warn;

use crate::error::CoreResult;
use crate::matrices::{DenseMatrix, FlowIndex, ImpactIndex, MatrixData, TechIndex};
use crate::math::solver::{DenseSolver, MatrixSolver};

pub(crate) fn scale(values: &[f64], factor: f64) -> Vec<f64> {
    values.iter().map(|v| v * factor).collect()
}

pub trait ResultProvider {
    fn tech_index(&self) -> &TechIndex;

    fn flow_index(&self) -> Option<&FlowIndex>;

    fn impact_index(&self) -> Option<&ImpactIndex>;

    fn has_flows(&self) -> bool {
        self.flow_index().map(|i| !i.is_empty()).unwrap_or(false)
    }

    fn has_impacts(&self) -> bool {
        self.impact_index().map(|i| !i.is_empty()).unwrap_or(false)
    }

    fn has_costs(&self) -> bool;

    /// The scaling vector `s` with `A·s = f`.
    fn scaling_vector(&self) -> Vec<f64>;

    fn scaling_factor_of(&self, product: usize) -> f64 {
        self.scaling_vector().get(product).copied().unwrap_or(0.0)
    }

    /// `t = diag(A) ⊙ s`.
    fn total_requirements(&self) -> Vec<f64> {
        (0..self.tech_index().size())
            .map(|j| self.scaled_tech_value_of(j, j))
            .collect()
    }

    fn total_requirements_of(&self, product: usize) -> f64 {
        self.scaled_tech_value_of(product, product)
    }

    /// Unscaled column `j` of the technology matrix.
    fn tech_column_of(&self, product: usize) -> Vec<f64>;

    fn tech_value_of(&self, row: usize, col: usize) -> f64 {
        self.tech_column_of(col).get(row).copied().unwrap_or(0.0)
    }

    fn scaled_tech_value_of(&self, row: usize, col: usize) -> f64 {
        self.scaling_factor_of(col) * self.tech_value_of(row, col)
    }

    /// The scaling vector of one unit of product `j`; column `j` of
    /// `A⁻¹` for full in-memory implementations.
    fn solution_of_one(&self, product: usize) -> Vec<f64>;

    /// `loop_j = 1 / (A[j,j] · A⁻¹[j,j])`; 1.0 for products outside of
    /// loops.
    fn loop_factor_of(&self, product: usize) -> f64;

    fn total_factor_of(&self, product: usize) -> f64 {
        self.loop_factor_of(product) * self.total_requirements_of(product)
    }

    /// Unscaled column `j` of the intervention matrix.
    fn unscaled_flows_of(&self, product: usize) -> Vec<f64>;

    fn unscaled_flow_of(&self, flow: usize, product: usize) -> f64 {
        self.unscaled_flows_of(product)
            .get(flow)
            .copied()
            .unwrap_or(0.0)
    }

    /// Column `j` of `G = B·diag(s)`.
    fn direct_flows_of(&self, product: usize) -> Vec<f64> {
        scale(
            &self.unscaled_flows_of(product),
            self.scaling_factor_of(product),
        )
    }

    fn direct_flow_of(&self, flow: usize, product: usize) -> f64 {
        self.scaling_factor_of(product) * self.unscaled_flow_of(flow, product)
    }

    /// Column `j` of the intensity matrix `M = B·A⁻¹`.
    fn total_flows_of_one(&self, product: usize) -> Vec<f64>;

    fn total_flow_of_one(&self, flow: usize, product: usize) -> f64 {
        self.total_flows_of_one(product)
            .get(flow)
            .copied()
            .unwrap_or(0.0)
    }

    fn total_flows_of(&self, product: usize) -> Vec<f64> {
        scale(
            &self.total_flows_of_one(product),
            self.total_factor_of(product),
        )
    }

    fn total_flow_of(&self, flow: usize, product: usize) -> f64 {
        self.total_factor_of(product) * self.total_flow_of_one(flow, product)
    }

    /// The inventory `g = B·s`. Inputs keep their negative sign here.
    fn total_flows(&self) -> Vec<f64>;

    /// Column `f` of the characterization matrix `C`.
    fn impact_factors_of(&self, flow: usize) -> Vec<f64>;

    fn impact_factor_of(&self, indicator: usize, flow: usize) -> f64 {
        self.impact_factors_of(flow)
            .get(indicator)
            .copied()
            .unwrap_or(0.0)
    }

    /// Column `f` of `H = C·diag(g)`.
    fn flow_impacts_of(&self, flow: usize) -> Vec<f64> {
        let totals = self.total_flows();
        let g = totals.get(flow).copied().unwrap_or(0.0);
        scale(&self.impact_factors_of(flow), g)
    }

    fn flow_impact_of(&self, indicator: usize, flow: usize) -> f64 {
        let totals = self.total_flows();
        let g = totals.get(flow).copied().unwrap_or(0.0);
        self.impact_factor_of(indicator, flow) * g
    }

    /// Column `j` of `C·G`.
    fn direct_impacts_of(&self, product: usize) -> Vec<f64>;

    fn direct_impact_of(&self, indicator: usize, product: usize) -> f64 {
        self.direct_impacts_of(product)
            .get(indicator)
            .copied()
            .unwrap_or(0.0)
    }

    /// Column `j` of `C·M`.
    fn total_impacts_of_one(&self, product: usize) -> Vec<f64>;

    fn total_impacts_of(&self, product: usize) -> Vec<f64> {
        scale(
            &self.total_impacts_of_one(product),
            self.total_factor_of(product),
        )
    }

    /// `h = C·g`.
    fn total_impacts(&self) -> Vec<f64>;

    /// `k[j]·s[j]`.
    fn direct_costs_of(&self, product: usize) -> f64;

    /// `k · A⁻¹[:,j]`.
    fn total_costs_of_one(&self, product: usize) -> f64;

    fn total_costs_of(&self, product: usize) -> f64 {
        self.total_factor_of(product) * self.total_costs_of_one(product)
    }

    /// `k · s`.
    fn total_costs(&self) -> f64;
}

// ============================================================================
// SIMPLE PROVIDER
// ============================================================================

/// Wraps a set of precomputed result vectors; the detailed
/// contribution operations are not available and answer empty.
#[derive(Clone, Debug)]
pub struct SimpleResultProvider {
    tech_index: TechIndex,
    flow_index: Option<FlowIndex>,
    impact_index: Option<ImpactIndex>,
    scaling: Option<Vec<f64>>,
    total_requirements_: Option<Vec<f64>>,
    total_flows_: Option<Vec<f64>>,
    total_impacts_: Option<Vec<f64>>,
    total_costs_: Option<f64>,
}

impl SimpleResultProvider {
    pub fn of(tech_index: TechIndex) -> SimpleResultProvider {
        SimpleResultProvider {
            tech_index,
            flow_index: None,
            impact_index: None,
            scaling: None,
            total_requirements_: None,
            total_flows_: None,
            total_impacts_: None,
            total_costs_: None,
        }
    }

    pub fn with_flow_index(mut self, index: FlowIndex) -> Self {
        self.flow_index = Some(index);
        self
    }

    pub fn with_impact_index(mut self, index: ImpactIndex) -> Self {
        self.impact_index = Some(index);
        self
    }

    pub fn with_scaling_vector(mut self, s: Vec<f64>) -> Self {
        self.scaling = Some(s);
        self
    }

    pub fn with_total_requirements(mut self, t: Vec<f64>) -> Self {
        self.total_requirements_ = Some(t);
        self
    }

    pub fn with_total_flows(mut self, g: Vec<f64>) -> Self {
        self.total_flows_ = Some(g);
        self
    }

    pub fn with_total_impacts(mut self, h: Vec<f64>) -> Self {
        self.total_impacts_ = Some(h);
        self
    }

    pub fn with_total_costs(mut self, costs: f64) -> Self {
        self.total_costs_ = Some(costs);
        self
    }
}

impl ResultProvider for SimpleResultProvider {
    fn tech_index(&self) -> &TechIndex {
        &self.tech_index
    }

    fn flow_index(&self) -> Option<&FlowIndex> {
        self.flow_index.as_ref()
    }

    fn impact_index(&self) -> Option<&ImpactIndex> {
        self.impact_index.as_ref()
    }

    fn has_costs(&self) -> bool {
        self.total_costs_.is_some()
    }

    fn scaling_vector(&self) -> Vec<f64> {
        match &self.scaling {
            Some(s) => s.clone(),
            None => vec![1.0; self.tech_index.size()],
        }
    }

    fn total_requirements(&self) -> Vec<f64> {
        match &self.total_requirements_ {
            Some(t) => t.clone(),
            None => vec![1.0; self.tech_index.size()],
        }
    }

    fn total_requirements_of(&self, product: usize) -> f64 {
        self.total_requirements().get(product).copied().unwrap_or(0.0)
    }

    fn tech_column_of(&self, _product: usize) -> Vec<f64> {
        Vec::new()
    }

    fn solution_of_one(&self, _product: usize) -> Vec<f64> {
        Vec::new()
    }

    fn loop_factor_of(&self, _product: usize) -> f64 {
        0.0
    }

    fn unscaled_flows_of(&self, _product: usize) -> Vec<f64> {
        Vec::new()
    }

    fn total_flows_of_one(&self, _product: usize) -> Vec<f64> {
        Vec::new()
    }

    fn total_flows(&self) -> Vec<f64> {
        match &self.total_flows_ {
            Some(g) => g.clone(),
            None => vec![0.0; self.flow_index.as_ref().map(|i| i.size()).unwrap_or(0)],
        }
    }

    fn impact_factors_of(&self, _flow: usize) -> Vec<f64> {
        Vec::new()
    }

    fn direct_impacts_of(&self, _product: usize) -> Vec<f64> {
        Vec::new()
    }

    fn total_impacts_of_one(&self, _product: usize) -> Vec<f64> {
        Vec::new()
    }

    fn total_impacts(&self) -> Vec<f64> {
        match &self.total_impacts_ {
            Some(h) => h.clone(),
            None => vec![
                0.0;
                self.impact_index
                    .as_ref()
                    .map(|i| i.size())
                    .unwrap_or(0)
            ],
        }
    }

    fn direct_costs_of(&self, _product: usize) -> f64 {
        0.0
    }

    fn total_costs_of_one(&self, _product: usize) -> f64 {
        0.0
    }

    fn total_costs(&self) -> f64 {
        self.total_costs_.unwrap_or(0.0)
    }
}

// ============================================================================
// EAGER PROVIDER
// ============================================================================

/// Inverts the technology matrix up front: `A⁻¹`, `M = B·A⁻¹` and
/// `C·M` are owned, every operation is a lookup.
pub struct EagerResultProvider {
    tech_index: TechIndex,
    flow_index: Option<FlowIndex>,
    impact_index: Option<ImpactIndex>,
    a: DenseMatrix,
    b: Option<DenseMatrix>,
    c: Option<DenseMatrix>,
    costs: Option<Vec<f64>>,
    inverse: DenseMatrix,
    intensity: Option<DenseMatrix>,
    impact_intensity: Option<DenseMatrix>,
    direct_impacts: Option<DenseMatrix>,
    scaling: Vec<f64>,
    total_flows_: Option<Vec<f64>>,
    total_impacts_: Option<Vec<f64>>,
    costs_of_one: Option<Vec<f64>>,
}

impl EagerResultProvider {
    pub fn of(data: &MatrixData, solver: &dyn MatrixSolver) -> CoreResult<EagerResultProvider> {
        let a = data.tech_matrix.to_dense();
        let inverse = solver.invert(&a)?;
        let scaling = solver.multiply_vec(&inverse, &data.demand_vector);

        let b = data.flow_matrix.as_ref().map(|m| m.to_dense());
        let c = data.impact_matrix.clone();

        let intensity = b.as_ref().map(|b| solver.multiply(b, &inverse));
        let total_flows_ = b.as_ref().map(|b| solver.multiply_vec(b, &scaling));
        let impact_intensity = match (&c, &intensity) {
            (Some(c), Some(m)) => Some(solver.multiply(c, m)),
            _ => None,
        };
        let direct_impacts = match (&c, &b) {
            (Some(c), Some(b)) => {
                // C · G with G = B·diag(s)
                let mut g = b.clone();
                for (j, s) in scaling.iter().enumerate() {
                    g.scale_column(j, *s);
                }
                Some(solver.multiply(c, &g))
            }
            _ => None,
        };
        let total_impacts_ = match (&c, &total_flows_) {
            (Some(c), Some(g)) => Some(solver.multiply_vec(c, g)),
            _ => None,
        };
        let costs = data.cost_vector.clone();
        let costs_of_one = costs.as_ref().map(|k| {
            (0..a.cols())
                .map(|j| {
                    let col = inverse.column(j);
                    k.iter().zip(&col).map(|(ki, xi)| ki * xi).sum()
                })
                .collect()
        });

        Ok(EagerResultProvider {
            tech_index: data.tech_index.clone(),
            flow_index: data.flow_index.clone(),
            impact_index: data.impact_index.clone(),
            a,
            b,
            c,
            costs,
            inverse,
            intensity,
            impact_intensity,
            direct_impacts,
            scaling,
            total_flows_,
            total_impacts_,
            costs_of_one,
        })
    }
}

impl ResultProvider for EagerResultProvider {
    fn tech_index(&self) -> &TechIndex {
        &self.tech_index
    }

    fn flow_index(&self) -> Option<&FlowIndex> {
        self.flow_index.as_ref()
    }

    fn impact_index(&self) -> Option<&ImpactIndex> {
        self.impact_index.as_ref()
    }

    fn has_costs(&self) -> bool {
        self.costs.is_some()
    }

    fn scaling_vector(&self) -> Vec<f64> {
        self.scaling.clone()
    }

    fn scaling_factor_of(&self, product: usize) -> f64 {
        self.scaling[product]
    }

    fn tech_column_of(&self, product: usize) -> Vec<f64> {
        self.a.column(product)
    }

    fn tech_value_of(&self, row: usize, col: usize) -> f64 {
        self.a.get(row, col)
    }

    fn solution_of_one(&self, product: usize) -> Vec<f64> {
        self.inverse.column(product)
    }

    fn loop_factor_of(&self, product: usize) -> f64 {
        let f = self.a.get(product, product) * self.inverse.get(product, product);
        if f == 0.0 {
            1.0
        } else {
            1.0 / f
        }
    }

    fn unscaled_flows_of(&self, product: usize) -> Vec<f64> {
        match &self.b {
            Some(b) => b.column(product),
            None => Vec::new(),
        }
    }

    fn unscaled_flow_of(&self, flow: usize, product: usize) -> f64 {
        self.b.as_ref().map(|b| b.get(flow, product)).unwrap_or(0.0)
    }

    fn total_flows_of_one(&self, product: usize) -> Vec<f64> {
        match &self.intensity {
            Some(m) => m.column(product),
            None => Vec::new(),
        }
    }

    fn total_flow_of_one(&self, flow: usize, product: usize) -> f64 {
        self.intensity
            .as_ref()
            .map(|m| m.get(flow, product))
            .unwrap_or(0.0)
    }

    fn total_flows(&self) -> Vec<f64> {
        self.total_flows_.clone().unwrap_or_default()
    }

    fn impact_factors_of(&self, flow: usize) -> Vec<f64> {
        match &self.c {
            Some(c) => c.column(flow),
            None => Vec::new(),
        }
    }

    fn impact_factor_of(&self, indicator: usize, flow: usize) -> f64 {
        self.c
            .as_ref()
            .map(|c| c.get(indicator, flow))
            .unwrap_or(0.0)
    }

    fn direct_impacts_of(&self, product: usize) -> Vec<f64> {
        match &self.direct_impacts {
            Some(d) => d.column(product),
            None => Vec::new(),
        }
    }

    fn total_impacts_of_one(&self, product: usize) -> Vec<f64> {
        match &self.impact_intensity {
            Some(m) => m.column(product),
            None => Vec::new(),
        }
    }

    fn total_impacts(&self) -> Vec<f64> {
        self.total_impacts_.clone().unwrap_or_default()
    }

    fn direct_costs_of(&self, product: usize) -> f64 {
        self.costs
            .as_ref()
            .map(|k| k[product] * self.scaling[product])
            .unwrap_or(0.0)
    }

    fn total_costs_of_one(&self, product: usize) -> f64 {
        self.costs_of_one
            .as_ref()
            .map(|k| k[product])
            .unwrap_or(0.0)
    }

    fn total_costs(&self) -> f64 {
        match &self.costs {
            Some(k) => k.iter().zip(&self.scaling).map(|(ki, si)| ki * si).sum(),
            None => 0.0,
        }
    }
}

// ============================================================================
// LAZY PROVIDER
// ============================================================================

/// Solves per product column on demand and memoizes the solutions.
/// Memoization is idempotent and referentially consistent over the
/// provider's lifetime.
pub struct LazyResultProvider {
    tech_index: TechIndex,
    flow_index: Option<FlowIndex>,
    impact_index: Option<ImpactIndex>,
    a: DenseMatrix,
    b: Option<DenseMatrix>,
    c: Option<DenseMatrix>,
    costs: Option<Vec<f64>>,
    solver: DenseSolver,
    scaling: Vec<f64>,
    total_flows_: Option<Vec<f64>>,
    total_impacts_: Option<Vec<f64>>,
    solutions: RefCell<HashMap<usize, Vec<f64>>>,
    intensities: RefCell<HashMap<usize, Vec<f64>>>,
}

impl LazyResultProvider {
    pub fn of(data: &MatrixData) -> CoreResult<LazyResultProvider> {
        let solver = DenseSolver::new();
        let a = data.tech_matrix.to_dense();
        let scaling = solver.solve(&a, &data.demand_vector)?;
        let b = data.flow_matrix.as_ref().map(|m| m.to_dense());
        let c = data.impact_matrix.clone();
        let total_flows_ = b.as_ref().map(|b| solver.multiply_vec(b, &scaling));
        let total_impacts_ = match (&c, &total_flows_) {
            (Some(c), Some(g)) => Some(solver.multiply_vec(c, g)),
            _ => None,
        };
        Ok(LazyResultProvider {
            tech_index: data.tech_index.clone(),
            flow_index: data.flow_index.clone(),
            impact_index: data.impact_index.clone(),
            a,
            b,
            c,
            costs: data.cost_vector.clone(),
            solver,
            scaling,
            total_flows_,
            total_impacts_,
            solutions: RefCell::new(HashMap::new()),
            intensities: RefCell::new(HashMap::new()),
        })
    }

    fn solution(&self, product: usize) -> Vec<f64> {
        if let Some(x) = self.solutions.borrow().get(&product) {
            return x.clone();
        }
        let x = match self.solver.solve_column(&self.a, product, 1.0) {
            Ok(x) => x,
            Err(err) => {
                // the scaling solve succeeded, so this is unexpected
                warn!(product, %err, "per-column solve failed");
                vec![0.0; self.a.rows()]
            }
        };
        self.solutions.borrow_mut().insert(product, x.clone());
        x
    }
}

impl ResultProvider for LazyResultProvider {
    fn tech_index(&self) -> &TechIndex {
        &self.tech_index
    }

    fn flow_index(&self) -> Option<&FlowIndex> {
        self.flow_index.as_ref()
    }

    fn impact_index(&self) -> Option<&ImpactIndex> {
        self.impact_index.as_ref()
    }

    fn has_costs(&self) -> bool {
        self.costs.is_some()
    }

    fn scaling_vector(&self) -> Vec<f64> {
        self.scaling.clone()
    }

    fn scaling_factor_of(&self, product: usize) -> f64 {
        self.scaling[product]
    }

    fn tech_column_of(&self, product: usize) -> Vec<f64> {
        self.a.column(product)
    }

    fn tech_value_of(&self, row: usize, col: usize) -> f64 {
        self.a.get(row, col)
    }

    fn solution_of_one(&self, product: usize) -> Vec<f64> {
        self.solution(product)
    }

    fn loop_factor_of(&self, product: usize) -> f64 {
        let x = self.solution(product);
        let f = self.a.get(product, product) * x[product];
        if f == 0.0 {
            1.0
        } else {
            1.0 / f
        }
    }

    fn unscaled_flows_of(&self, product: usize) -> Vec<f64> {
        match &self.b {
            Some(b) => b.column(product),
            None => Vec::new(),
        }
    }

    fn unscaled_flow_of(&self, flow: usize, product: usize) -> f64 {
        self.b.as_ref().map(|b| b.get(flow, product)).unwrap_or(0.0)
    }

    fn total_flows_of_one(&self, product: usize) -> Vec<f64> {
        if let Some(m) = self.intensities.borrow().get(&product) {
            return m.clone();
        }
        let column = match &self.b {
            Some(b) => self.solver.multiply_vec(b, &self.solution(product)),
            None => Vec::new(),
        };
        self.intensities
            .borrow_mut()
            .insert(product, column.clone());
        column
    }

    fn total_flows(&self) -> Vec<f64> {
        self.total_flows_.clone().unwrap_or_default()
    }

    fn impact_factors_of(&self, flow: usize) -> Vec<f64> {
        match &self.c {
            Some(c) => c.column(flow),
            None => Vec::new(),
        }
    }

    fn impact_factor_of(&self, indicator: usize, flow: usize) -> f64 {
        self.c
            .as_ref()
            .map(|c| c.get(indicator, flow))
            .unwrap_or(0.0)
    }

    fn direct_impacts_of(&self, product: usize) -> Vec<f64> {
        match &self.c {
            Some(c) => self.solver.multiply_vec(c, &self.direct_flows_of(product)),
            None => Vec::new(),
        }
    }

    fn total_impacts_of_one(&self, product: usize) -> Vec<f64> {
        match &self.c {
            Some(c) => self
                .solver
                .multiply_vec(c, &self.total_flows_of_one(product)),
            None => Vec::new(),
        }
    }

    fn total_impacts(&self) -> Vec<f64> {
        self.total_impacts_.clone().unwrap_or_default()
    }

    fn direct_costs_of(&self, product: usize) -> f64 {
        self.costs
            .as_ref()
            .map(|k| k[product] * self.scaling[product])
            .unwrap_or(0.0)
    }

    fn total_costs_of_one(&self, product: usize) -> f64 {
        match &self.costs {
            Some(k) => {
                let x = self.solution(product);
                k.iter().zip(&x).map(|(ki, xi)| ki * xi).sum()
            }
            None => 0.0,
        }
    }

    fn total_costs(&self) -> f64 {
        match &self.costs {
            Some(k) => k.iter().zip(&self.scaling).map(|(ki, si)| ki * si).sum(),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrices::{Matrix, ProcessProduct};
    use crate::model::FlowRef;

    /// The cyclic 3x3 system used across the result tests.
    fn cyclic_data() -> MatrixData {
        let mut tech_index = TechIndex::new(ProcessProduct::of(1, 1));
        tech_index.add(ProcessProduct::of(2, 2));
        tech_index.add(ProcessProduct::of(3, 3));
        tech_index.set_demand(1.0);

        let a = DenseMatrix::of(&[
            &[1.0, 0.0, 0.0],
            &[-1.0, 1.0, -0.1],
            &[0.0, -2.0, 1.0],
        ]);
        let b = DenseMatrix::of(&[&[1.0, 2.0, 3.0]]);
        let mut flow_index = FlowIndex::create();
        flow_index.register(FlowRef::output_of(42));

        MatrixData {
            tech_index,
            flow_index: Some(flow_index),
            impact_index: None,
            tech_matrix: Matrix::Dense(a),
            flow_matrix: Some(Matrix::Dense(b)),
            impact_matrix: None,
            cost_vector: None,
            demand_vector: vec![1.0, 0.0, 0.0],
        }
    }

    fn check_provider(p: &dyn ResultProvider) {
        let s = p.scaling_vector();
        assert!((s[0] - 1.0).abs() < 1e-10);
        assert!((s[1] - 1.25).abs() < 1e-10);
        assert!((s[2] - 2.5).abs() < 1e-10);

        // total requirements = diag(A) ⊙ s
        let t = p.total_requirements();
        for j in 0..3 {
            assert!((t[j] - p.tech_value_of(j, j) * s[j]).abs() < 1e-10);
        }

        // loop factor identity: loop_j · A[j,j] · A⁻¹[j,j] = 1
        for j in 0..3 {
            let identity =
                p.loop_factor_of(j) * p.tech_value_of(j, j) * p.solution_of_one(j)[j];
            assert!((identity - 1.0).abs() < 1e-10, "column {}", j);
        }

        // g = B·s = 11 on the single flow row
        let g = p.total_flows();
        assert!((g[0] - 11.0).abs() < 1e-10);

        // total flows per column: [11, 10, 8]
        for (j, expected) in [11.0, 10.0, 8.0].iter().enumerate() {
            let totals = p.total_flows_of(j);
            assert!(
                (totals[0] - expected).abs() < 1e-10,
                "column {}: {} != {}",
                j,
                totals[0],
                expected
            );
        }

        // direct flows: [1, 2.5, 7.5]
        for (j, expected) in [1.0, 2.5, 7.5].iter().enumerate() {
            assert!((p.direct_flow_of(0, j) - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn test_eager_provider() {
        let data = cyclic_data();
        let provider = EagerResultProvider::of(&data, &DenseSolver::new()).unwrap();
        check_provider(&provider);
    }

    #[test]
    fn test_lazy_provider() {
        let data = cyclic_data();
        let provider = LazyResultProvider::of(&data).unwrap();
        check_provider(&provider);
        // memoized calls stay consistent
        let first = provider.solution_of_one(1);
        let second = provider.solution_of_one(1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_simple_provider_defaults() {
        let mut tech_index = TechIndex::new(ProcessProduct::of(1, 1));
        tech_index.add(ProcessProduct::of(2, 2));
        let provider = SimpleResultProvider::of(tech_index);
        assert_eq!(provider.scaling_vector(), vec![1.0, 1.0]);
        assert_eq!(provider.total_requirements(), vec![1.0, 1.0]);
        assert!(provider.total_flows().is_empty());
        assert!(!provider.has_costs());
    }
}
