// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//! Result Views
//!
//! User-facing views over the result providers. The providers keep the
//! internal sign convention (inputs negative); the views adopt signs
//! for reporting: input elementary flows and input characterization
//! factors are returned positive. Negation happens only for non-zero
//! values to avoid `-0`.

pub mod dq;
pub mod providers;
pub mod sankey;
pub mod simulation;

pub use dq::{AggregationType, DQCalculationSetup, DQResult, NaHandling, Rounding};
pub use providers::{
    EagerResultProvider, LazyResultProvider, ResultProvider, SimpleResultProvider,
};
pub use sankey::{Sankey, SankeyNode};
pub use simulation::{PinnedResult, SimulationResult};

use crate::matrices::{FlowIndex, ImpactIndex, ProcessProduct, TechIndex};
use crate::model::FlowRef;

/// Reporting sign adoption: inputs are returned positive. A plain
/// `abs()` would be wrong for factors that are genuinely negative.
pub fn adopt(flow: &FlowRef, value: f64) -> f64 {
    if !flow.is_input {
        return value;
    }
    if value == 0.0 {
        0.0 // avoid -0
    } else {
        -value
    }
}

/// The inventory-level result view: scaling, total requirements, total
/// flows, impacts and costs.
pub struct SimpleResult {
    provider: Box<dyn ResultProvider>,
}

impl std::fmt::Debug for SimpleResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleResult").finish_non_exhaustive()
    }
}

impl SimpleResult {
    pub fn of(provider: Box<dyn ResultProvider>) -> SimpleResult {
        SimpleResult { provider }
    }

    pub fn provider(&self) -> &dyn ResultProvider {
        self.provider.as_ref()
    }

    pub fn tech_index(&self) -> &TechIndex {
        self.provider.tech_index()
    }

    pub fn flow_index(&self) -> Option<&FlowIndex> {
        self.provider.flow_index()
    }

    pub fn impact_index(&self) -> Option<&ImpactIndex> {
        self.provider.impact_index()
    }

    pub fn has_flow_results(&self) -> bool {
        self.provider.has_flows()
    }

    pub fn has_impact_results(&self) -> bool {
        self.provider.has_impacts()
    }

    pub fn has_cost_results(&self) -> bool {
        self.provider.has_costs()
    }

    pub fn scaling_vector(&self) -> Vec<f64> {
        self.provider.scaling_vector()
    }

    pub fn total_requirements(&self) -> Vec<f64> {
        self.provider.total_requirements()
    }

    /// The raw inventory `g = B·s` (inputs negative).
    pub fn total_flows(&self) -> Vec<f64> {
        self.provider.total_flows()
    }

    /// The reported total of one flow, with adopted sign.
    pub fn total_flow_of(&self, flow: &FlowRef) -> f64 {
        let index = match self.flow_index() {
            Some(i) => i,
            None => return 0.0,
        };
        let row = match index.of_ref(flow) {
            Some(r) => r,
            None => return 0.0,
        };
        let g = self.provider.total_flows();
        adopt(&index.at(row), g[row])
    }

    /// All flow totals with adopted signs, in row order.
    pub fn flow_results(&self) -> Vec<(FlowRef, f64)> {
        let mut results = Vec::new();
        if let Some(index) = self.flow_index() {
            let g = self.provider.total_flows();
            index.each(|row, flow| results.push((flow, adopt(&flow, g[row]))));
        }
        results
    }

    pub fn total_impacts(&self) -> Vec<f64> {
        self.provider.total_impacts()
    }

    pub fn total_impact_of(&self, category_id: u64) -> f64 {
        match self.impact_index().and_then(|i| i.position_of(category_id)) {
            Some(row) => self.provider.total_impacts().get(row).copied().unwrap_or(0.0),
            None => 0.0,
        }
    }

    pub fn total_costs(&self) -> f64 {
        self.provider.total_costs()
    }
}

/// Extends the simple view with per-process and per-flow direct
/// contributions.
pub struct ContributionResult {
    result: SimpleResult,
}

impl ContributionResult {
    pub fn of(provider: Box<dyn ResultProvider>) -> ContributionResult {
        ContributionResult {
            result: SimpleResult::of(provider),
        }
    }

    pub fn simple(&self) -> &SimpleResult {
        &self.result
    }

    pub fn provider(&self) -> &dyn ResultProvider {
        self.result.provider()
    }

    /// Direct contribution `G[i,j]` of a process-product to a flow,
    /// with adopted sign.
    pub fn direct_flow_of(&self, product: &ProcessProduct, flow: &FlowRef) -> f64 {
        let provider = self.provider();
        let (flow_row, col) = match (
            provider.flow_index().and_then(|i| i.of_ref(flow)),
            provider.tech_index().of(product),
        ) {
            (Some(r), Some(c)) => (r, c),
            _ => return 0.0,
        };
        let index_flow = provider.flow_index().map(|i| i.at(flow_row));
        let value = provider.direct_flow_of(flow_row, col);
        match index_flow {
            Some(f) => adopt(&f, value),
            None => value,
        }
    }

    /// Direct contribution of a whole process (sum over its products).
    pub fn direct_flow_of_process(&self, process_id: u64, flow: &FlowRef) -> f64 {
        let provider = self.provider();
        provider
            .tech_index()
            .providers_of(process_id)
            .iter()
            .map(|&col| {
                let product = provider.tech_index().at(col);
                self.direct_flow_of(&product, flow)
            })
            .sum()
    }

    pub fn direct_impact_of(&self, product: &ProcessProduct, category_id: u64) -> f64 {
        let provider = self.provider();
        let (row, col) = match (
            provider.impact_index().and_then(|i| i.position_of(category_id)),
            provider.tech_index().of(product),
        ) {
            (Some(r), Some(c)) => (r, c),
            _ => return 0.0,
        };
        provider.direct_impact_of(row, col)
    }

    pub fn direct_cost_of(&self, product: &ProcessProduct) -> f64 {
        match self.provider().tech_index().of(product) {
            Some(col) => self.provider().direct_costs_of(col),
            None => 0.0,
        }
    }

    /// The characterization factor for a flow (and location, in the
    /// regionalized case), with adopted sign for input flows.
    pub fn impact_factor_of(&self, category_id: u64, flow: &FlowRef) -> f64 {
        let provider = self.provider();
        let (row, flow_row) = match (
            provider.impact_index().and_then(|i| i.position_of(category_id)),
            provider.flow_index().and_then(|i| i.of_ref(flow)),
        ) {
            (Some(r), Some(f)) => (r, f),
            _ => return 0.0,
        };
        let value = provider.impact_factor_of(row, flow_row);
        let index_flow = provider.flow_index().map(|i| i.at(flow_row));
        match index_flow {
            Some(f) => adopt(&f, value),
            None => value,
        }
    }

    /// Contribution of one flow to one impact category result.
    pub fn flow_impact_of(&self, category_id: u64, flow: &FlowRef) -> f64 {
        let provider = self.provider();
        match (
            provider.impact_index().and_then(|i| i.position_of(category_id)),
            provider.flow_index().and_then(|i| i.of_ref(flow)),
        ) {
            (Some(row), Some(flow_row)) => provider.flow_impact_of(row, flow_row),
            _ => 0.0,
        }
    }
}
