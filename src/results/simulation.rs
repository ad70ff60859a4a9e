// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// SimulationResult: append-only sample store of a Monte-Carlo run

use std::collections::HashMap;

use crate::matrices::{FlowIndex, ImpactIndex, MatrixData, ProcessProduct, TechIndex};
use crate::results::SimpleResult;

/// Per-iteration direct and upstream vectors of one pinned product.
#[derive(Clone, Debug, Default)]
pub struct PinnedResult {
    pub direct_flows: Vec<Vec<f64>>,
    pub upstream_flows: Vec<Vec<f64>>,
    pub direct_impacts: Vec<Vec<f64>>,
    pub upstream_impacts: Vec<Vec<f64>>,
}

/// Collects the per-iteration result vectors of a simulation. Appends
/// are stable: the i-th column corresponds to the i-th successful
/// iteration; failed iterations append nothing.
pub struct SimulationResult {
    tech_index: TechIndex,
    flow_index: Option<FlowIndex>,
    impact_index: Option<ImpactIndex>,
    /// one inventory vector per iteration
    flow_results: Vec<Vec<f64>>,
    /// one impact vector per iteration
    impact_results: Vec<Vec<f64>>,
    cost_results: Vec<f64>,
    pins: HashMap<ProcessProduct, PinnedResult>,
}

impl SimulationResult {
    pub fn of(data: &MatrixData) -> SimulationResult {
        SimulationResult {
            tech_index: data.tech_index.clone(),
            flow_index: data.flow_index.clone(),
            impact_index: data.impact_index.clone(),
            flow_results: Vec::new(),
            impact_results: Vec::new(),
            cost_results: Vec::new(),
            pins: HashMap::new(),
        }
    }

    pub fn tech_index(&self) -> &TechIndex {
        &self.tech_index
    }

    pub fn flow_index(&self) -> Option<&FlowIndex> {
        self.flow_index.as_ref()
    }

    pub fn impact_index(&self) -> Option<&ImpactIndex> {
        self.impact_index.as_ref()
    }

    pub fn iteration_count(&self) -> usize {
        self.flow_results.len()
    }

    /// Append one successful iteration.
    pub fn append(&mut self, result: &SimpleResult) {
        self.flow_results.push(result.total_flows());
        if result.has_impact_results() {
            self.impact_results.push(result.total_impacts());
        }
        if result.has_cost_results() {
            self.cost_results.push(result.total_costs());
        }
    }

    pub(crate) fn append_pin(&mut self, product: ProcessProduct, pin: PinnedIteration) {
        let entry = self.pins.entry(product).or_default();
        entry.direct_flows.push(pin.direct_flows);
        entry.upstream_flows.push(pin.upstream_flows);
        if let Some(h) = pin.direct_impacts {
            entry.direct_impacts.push(h);
        }
        if let Some(h) = pin.upstream_impacts {
            entry.upstream_impacts.push(h);
        }
    }

    pub fn pinned(&self, product: &ProcessProduct) -> Option<&PinnedResult> {
        self.pins.get(product)
    }

    /// All sampled totals of one flow row.
    pub fn flow_samples_of(&self, row: usize) -> Vec<f64> {
        self.flow_results.iter().map(|g| g[row]).collect()
    }

    pub fn impact_samples_of(&self, row: usize) -> Vec<f64> {
        self.impact_results.iter().map(|h| h[row]).collect()
    }

    pub fn cost_samples(&self) -> &[f64] {
        &self.cost_results
    }

    pub fn flow_mean_of(&self, row: usize) -> f64 {
        mean(&self.flow_samples_of(row))
    }

    pub fn flow_std_of(&self, row: usize) -> f64 {
        std_dev(&self.flow_samples_of(row))
    }

    pub fn impact_mean_of(&self, row: usize) -> f64 {
        mean(&self.impact_samples_of(row))
    }
}

/// The staged pin vectors of one iteration; committed only when the
/// whole iteration succeeded.
pub(crate) struct PinnedIteration {
    pub direct_flows: Vec<f64>,
    pub upstream_flows: Vec<f64>,
    pub direct_impacts: Option<Vec<f64>>,
    pub upstream_impacts: Option<Vec<f64>>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(mean(&[]), 0.0);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.138_089_935).abs() < 1e-6);
        assert_eq!(std_dev(&[1.0]), 0.0);
    }
}
