// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// LcaCalculator: drives the solver over assembled matrices

use crate::error::CoreResult;
use crate::matrices::{DenseMatrix, MatrixData, ProcessProduct};
use crate::math::solver::MatrixSolver;
use crate::results::providers::{EagerResultProvider, LazyResultProvider, SimpleResultProvider};
use crate::results::{ContributionResult, SimpleResult};

/// Calculates results from assembled `MatrixData`.
pub struct LcaCalculator<'a> {
    solver: &'a dyn MatrixSolver,
    data: &'a MatrixData,
}

impl<'a> LcaCalculator<'a> {
    pub fn new(solver: &'a dyn MatrixSolver, data: &'a MatrixData) -> LcaCalculator<'a> {
        LcaCalculator { solver, data }
    }

    /// Inventory-level result: `s = A⁻¹·f`, `g = B·s`, `h = C·g`,
    /// `costs = k·s`.
    pub fn calculate_simple(&self) -> CoreResult<SimpleResult> {
        let a = self.data.tech_matrix.to_dense();
        let s = self.solver.solve(&a, &self.data.demand_vector)?;

        let total_requirements: Vec<f64> =
            a.diag().iter().zip(&s).map(|(aii, si)| aii * si).collect();

        let mut provider = SimpleResultProvider::of(self.data.tech_index.clone())
            .with_scaling_vector(s.clone())
            .with_total_requirements(total_requirements);

        if let Some(flow_index) = &self.data.flow_index {
            provider = provider.with_flow_index(flow_index.clone());
            if let Some(b) = &self.data.flow_matrix {
                let g = self.solver.multiply_vec(&b.to_dense(), &s);
                if let (Some(impact_index), Some(c)) =
                    (&self.data.impact_index, &self.data.impact_matrix)
                {
                    let h = self.solver.multiply_vec(c, &g);
                    provider = provider
                        .with_impact_index(impact_index.clone())
                        .with_total_impacts(h);
                }
                provider = provider.with_total_flows(g);
            }
        }

        if let Some(k) = &self.data.cost_vector {
            let costs = k.iter().zip(&s).map(|(ki, si)| ki * si).sum();
            provider = provider.with_total_costs(costs);
        }

        Ok(SimpleResult::of(Box::new(provider)))
    }

    /// Full result over the eager provider (owns `A⁻¹` and `M`).
    pub fn calculate_full(&self) -> CoreResult<ContributionResult> {
        let provider = EagerResultProvider::of(self.data, self.solver)?;
        Ok(ContributionResult::of(Box::new(provider)))
    }

    /// Full result over the lazy provider (per-column solves, memoized).
    pub fn calculate_lazy(&self) -> CoreResult<ContributionResult> {
        let provider = LazyResultProvider::of(self.data)?;
        Ok(ContributionResult::of(Box::new(provider)))
    }

    /// The loop factor of product `j` from its per-unit solution
    /// `x = A⁻¹·e_j`: `1 / (A[j,j]·x[j])`.
    pub fn loop_factor(a: &DenseMatrix, solution: &[f64], j: usize) -> f64 {
        let f = a.get(j, j) * solution[j];
        if f == 0.0 {
            1.0
        } else {
            1.0 / f
        }
    }

    /// The simple result of one unit of every process-product column:
    /// columns of `A⁻¹`, `M = B·A⁻¹` and `C·M`. Waste columns are
    /// reported with swapped signs (their reference is an input).
    pub fn each_one<F>(&self, is_waste: F) -> CoreResult<Vec<(ProcessProduct, SimpleResult)>>
    where
        F: Fn(&ProcessProduct) -> bool,
    {
        let a = self.data.tech_matrix.to_dense();
        let inverse = self.solver.invert(&a)?;
        let diag = a.diag();
        let lci = self
            .data
            .flow_matrix
            .as_ref()
            .map(|b| self.solver.multiply(&b.to_dense(), &inverse));
        let lcia = match (&self.data.impact_matrix, &lci) {
            (Some(c), Some(m)) => Some(self.solver.multiply(c, m)),
            _ => None,
        };

        let mut results = Vec::with_capacity(self.data.tech_index.size());
        for j in 0..self.data.tech_index.size() {
            let product = self.data.tech_index.at(j);
            let mut scaling = inverse.column(j);
            let mut totals: Vec<f64> = diag
                .iter()
                .zip(&scaling)
                .map(|(aii, si)| aii * si)
                .collect();
            let mut flows = lci.as_ref().map(|m| m.column(j));
            let mut impacts = lcia.as_ref().map(|m| m.column(j));

            if is_waste(&product) {
                swap_sign(&mut scaling);
                swap_sign(&mut totals);
                if let Some(f) = flows.as_mut() {
                    swap_sign(f);
                }
                if let Some(h) = impacts.as_mut() {
                    swap_sign(h);
                }
            }

            let mut provider = SimpleResultProvider::of(self.data.tech_index.clone())
                .with_scaling_vector(scaling)
                .with_total_requirements(totals);
            if let Some(index) = &self.data.flow_index {
                provider = provider.with_flow_index(index.clone());
            }
            if let Some(index) = &self.data.impact_index {
                provider = provider.with_impact_index(index.clone());
            }
            if let Some(f) = flows {
                provider = provider.with_total_flows(f);
            }
            if let Some(h) = impacts {
                provider = provider.with_total_impacts(h);
            }
            results.push((product, SimpleResult::of(Box::new(provider))));
        }
        Ok(results)
    }
}

fn swap_sign(values: &mut [f64]) {
    for v in values.iter_mut() {
        if *v != 0.0 {
            *v = -*v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrices::{FlowIndex, Matrix, TechIndex};
    use crate::math::solver::DenseSolver;
    use crate::model::FlowRef;

    fn one_by_one() -> MatrixData {
        let mut tech_index = TechIndex::new(ProcessProduct::of(1, 1));
        tech_index.set_demand(1.0);
        let mut flow_index = FlowIndex::create();
        flow_index.register(FlowRef::input_of(1));
        flow_index.register(FlowRef::input_of(2));
        flow_index.register(FlowRef::output_of(3));
        flow_index.register(FlowRef::output_of(4));

        let mut b = DenseMatrix::new(4, 1);
        for r in 0..4 {
            b.set(r, 0, r as f64);
        }
        let mut a = DenseMatrix::new(1, 1);
        a.set(0, 0, 1.0);

        MatrixData {
            tech_index,
            flow_index: Some(flow_index),
            impact_index: None,
            tech_matrix: Matrix::Dense(a),
            flow_matrix: Some(Matrix::Dense(b)),
            impact_matrix: None,
            cost_vector: None,
            demand_vector: vec![1.0],
        }
    }

    #[test]
    fn test_solve_1x1_system() {
        let data = one_by_one();
        let solver = DenseSolver::new();
        let calculator = LcaCalculator::new(&solver, &data);
        let result = calculator.calculate_simple().unwrap();
        let totals = result.total_flows();
        assert_eq!(totals, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_costs_accumulate_over_scaling() {
        let mut data = one_by_one();
        data.cost_vector = Some(vec![2.5]);
        data.demand_vector = vec![4.0];
        data.tech_index.set_demand(4.0);
        let solver = DenseSolver::new();
        let calculator = LcaCalculator::new(&solver, &data);
        let result = calculator.calculate_simple().unwrap();
        assert!((result.total_costs() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_each_one_yields_unit_results() {
        let data = one_by_one();
        let solver = DenseSolver::new();
        let calculator = LcaCalculator::new(&solver, &data);
        let results = calculator.each_one(|_| false).unwrap();
        assert_eq!(results.len(), 1);
        let (product, result) = &results[0];
        assert_eq!(product.process_id, 1);
        assert_eq!(result.scaling_vector(), vec![1.0]);
        assert_eq!(result.total_flows(), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_each_one_swaps_waste_signs() {
        let data = one_by_one();
        let solver = DenseSolver::new();
        let calculator = LcaCalculator::new(&solver, &data);
        let results = calculator.each_one(|_| true).unwrap();
        let (_, result) = &results[0];
        assert_eq!(result.scaling_vector(), vec![-1.0]);
        assert_eq!(result.total_flows(), vec![0.0, -1.0, -2.0, -3.0]);
    }
}
