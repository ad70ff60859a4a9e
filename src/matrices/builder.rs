// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// Matrix assembly: A, B, C, costs and the demand vector

use std::collections::HashMap;

use rand::rngs::StdRng;
use tracing::warn;

use super::dense::DenseMatrix;
use super::indices::{FlowIndex, ImpactIndex, ProcessProduct, TechIndex};
use super::Matrix;
use crate::db::DataProvider;
use crate::error::{CoreError, CoreResult};
use crate::formulas::FormulaInterpreter;
use crate::model::{AllocationMethod, CalcExchange, FlowRef, FlowType, ImpactMethodData};

/// The assembled matrices of one calculation (or one simulation
/// iteration). Owns its matrices and indices.
#[derive(Clone, Debug)]
pub struct MatrixData {
    pub tech_index: TechIndex,
    pub flow_index: Option<FlowIndex>,
    pub impact_index: Option<ImpactIndex>,
    pub tech_matrix: Matrix,
    pub flow_matrix: Option<Matrix>,
    pub impact_matrix: Option<DenseMatrix>,
    pub cost_vector: Option<Vec<f64>>,
    pub demand_vector: Vec<f64>,
}

impl MatrixData {
    pub fn demand(&self) -> f64 {
        self.tech_index.demand()
    }

    pub fn has_flows(&self) -> bool {
        self.flow_index.as_ref().map(|i| !i.is_empty()).unwrap_or(false)
    }

    pub fn has_impacts(&self) -> bool {
        self.impact_index
            .as_ref()
            .map(|i| !i.is_empty())
            .unwrap_or(false)
    }
}

/// The LCI (and LCC) totals of a sub-system that a host column stands
/// for. `demand` is the sub-system's own target amount; injection
/// normalizes to one unit of its reference product.
#[derive(Clone, Debug)]
pub struct SubSystemLci {
    pub flow_index: FlowIndex,
    pub total_flows: Vec<f64>,
    pub total_costs: f64,
    pub demand: f64,
}

/// Borrowed inputs of one assembly pass. The exchange table is fetched
/// once per calculation and shared across simulation iterations.
pub struct AssemblyContext<'a> {
    pub db: &'a dyn DataProvider,
    pub tech_index: &'a TechIndex,
    pub exchanges: &'a HashMap<u64, Vec<CalcExchange>>,
    pub impact_method: Option<&'a ImpactMethodData>,
    pub allocation_method: AllocationMethod,
    pub with_costs: bool,
    pub interpreter: &'a FormulaInterpreter,
    pub sub_results: &'a HashMap<ProcessProduct, SubSystemLci>,
}

impl<'a> AssemblyContext<'a> {
    /// Assemble `MatrixData` from the context. With an RNG, exchange
    /// amounts carrying an uncertainty are resampled (simulation mode).
    pub fn assemble(&self, mut rng: Option<&mut StdRng>) -> CoreResult<MatrixData> {
        let n = self.tech_index.size();

        // 1. decide the flow index mode and collect the rows
        let flow_index = self.build_flow_index();
        let m = flow_index.as_ref().map(|i| i.size()).unwrap_or(0);

        let mut tech = Matrix::sparse(n, n);
        let mut flows = if m > 0 {
            Some(Matrix::sparse(m, n))
        } else {
            None
        };
        let mut costs = if self.with_costs {
            Some(vec![0.0; n])
        } else {
            None
        };

        // 2. column-wise assembly
        for j in 0..n {
            let product = self.tech_index.at(j);

            // a sub-system column expresses one unit of its reference
            if let Some(sub) = self.sub_results.get(&product) {
                tech.set(j, j, 1.0);
                let scale = if sub.demand != 0.0 { 1.0 / sub.demand } else { 1.0 };
                if let (Some(b), Some(host_index)) = (flows.as_mut(), flow_index.as_ref()) {
                    sub.flow_index.each(|sub_row, flow| {
                        if let Some(row) = host_index.of_ref(&flow) {
                            b.set(row, j, sub.total_flows[sub_row] * scale);
                        }
                    });
                }
                if let Some(k) = costs.as_mut() {
                    k[j] = sub.total_costs * scale;
                }
                continue;
            }

            let list = match self.exchanges.get(&product.process_id) {
                Some(list) => list,
                None => {
                    return Err(CoreError::MissingProvider {
                        process_id: product.process_id,
                        flow_id: product.flow_id,
                    })
                }
            };

            // the quantitative reference is never allocated
            let allocation = self.db.allocation_factor(
                self.allocation_method,
                product.process_id,
                product.flow_id,
            );

            for e in list {
                let is_reference = e.flow_id == product.flow_id && e.is_provider_flow();
                let factor = if is_reference { 1.0 } else { allocation };
                let amount = self.amount_of(e, rng.as_deref_mut()) * factor;

                if is_reference {
                    // product output or waste input, both positive
                    tech.add(j, j, amount);
                } else if e.is_linkable() {
                    if let Some(provider) = self
                        .tech_index
                        .linked_provider(product.process_id, e.exchange_id)
                    {
                        if let Some(i) = self.tech_index.of(&provider) {
                            // inputs subtract, waste outputs subtract
                            tech.add(i, j, -amount);
                        }
                    }
                    // unlinked exchanges stay outside the system boundary
                } else if e.flow_type == FlowType::Elementary {
                    if let (Some(b), Some(index)) = (flows.as_mut(), flow_index.as_ref()) {
                        if let Some(row) = index.of(e.flow_id, e.location_id) {
                            let sign = if e.is_input { -1.0 } else { 1.0 };
                            b.add(row, j, sign * amount);
                        }
                    }
                }

                if let Some(k) = costs.as_mut() {
                    if let Some(cost) = self.cost_of(e) {
                        k[j] += cost * factor;
                    }
                }
            }
        }

        // 3. structural check: every column must produce its product
        for j in 0..n {
            if tech.get(j, j) == 0.0 {
                let product = self.tech_index.at(j);
                return Err(CoreError::MissingProvider {
                    process_id: product.process_id,
                    flow_id: product.flow_id,
                });
            }
        }

        // 4. characterization matrix
        let (impact_index, impact_matrix) = match (self.impact_method, flow_index.as_ref()) {
            (Some(method), Some(index)) => {
                let impact_index = ImpactIndex::of(method.categories.clone());
                let c = build_impact_matrix(&impact_index, index);
                (Some(impact_index), Some(c))
            }
            _ => (None, None),
        };

        // 5. final demand
        let mut demand_vector = vec![0.0; n];
        demand_vector[0] = self.tech_index.demand();

        Ok(MatrixData {
            tech_index: self.tech_index.clone(),
            flow_index,
            impact_index,
            tech_matrix: tech,
            flow_matrix: flows,
            impact_matrix,
            cost_vector: costs,
            demand_vector,
        })
    }

    /// Exchange amount: sampled when simulating and an uncertainty is
    /// present, otherwise formula, otherwise the literal. A failing
    /// formula degrades to the literal with a diagnostic.
    fn amount_of(&self, e: &CalcExchange, rng: Option<&mut StdRng>) -> f64 {
        if let (Some(rng), Some(uncertainty)) = (rng, e.uncertainty.as_ref()) {
            return uncertainty.sample(rng);
        }
        if let Some(formula) = &e.formula {
            match self
                .interpreter
                .eval_in(Some(e.owner_process_id), formula)
            {
                Ok(v) => return v,
                Err(err) => {
                    warn!(
                        process = e.owner_process_id,
                        exchange = e.exchange_id,
                        %err,
                        "formula degraded to literal amount"
                    );
                    return e.amount;
                }
            }
        }
        e.amount
    }

    fn cost_of(&self, e: &CalcExchange) -> Option<f64> {
        if let Some(formula) = &e.cost_formula {
            match self
                .interpreter
                .eval_in(Some(e.owner_process_id), formula)
            {
                Ok(v) => return Some(v),
                Err(err) => {
                    warn!(
                        process = e.owner_process_id,
                        exchange = e.exchange_id,
                        %err,
                        "cost formula degraded to literal value"
                    );
                }
            }
        }
        e.cost_value
    }

    /// Collect the elementary flows of all indexed processes plus the
    /// flows that only occur in sub-systems. Regionalized mode is used
    /// as soon as any row carries a location.
    fn build_flow_index(&self) -> Option<FlowIndex> {
        let mut rows: Vec<FlowRef> = Vec::new();
        for product in self.tech_index.iter() {
            if let Some(list) = self.exchanges.get(&product.process_id) {
                for e in list {
                    if e.flow_type == FlowType::Elementary {
                        rows.push(FlowRef {
                            flow_id: e.flow_id,
                            flow_type: e.flow_type,
                            is_input: e.is_input,
                            location_id: e.location_id,
                        });
                    }
                }
            }
        }
        for sub in self.sub_results.values() {
            sub.flow_index.each(|_, flow| rows.push(flow));
        }
        if rows.is_empty() {
            return None;
        }
        let regionalized = rows.iter().any(|f| f.location_id.is_some());
        let mut index = if regionalized {
            FlowIndex::create_regionalized()
        } else {
            FlowIndex::create()
        };
        for row in rows {
            index.register(row);
        }
        Some(index)
    }
}

/// Place the characterization factors. Input rows get the negated
/// factor so that `C·g` yields positive contributions under the sign
/// convention of `B`. Location-specific factors overwrite the global
/// one for the same flow.
fn build_impact_matrix(impact_index: &ImpactIndex, flow_index: &FlowIndex) -> DenseMatrix {
    let mut c = DenseMatrix::new(impact_index.size(), flow_index.size());
    // pass 1: location-less factors cover every row of their flow
    for (k, category) in impact_index.iter().enumerate() {
        for factor in category.factors.iter().filter(|f| f.location_id.is_none()) {
            flow_index.each(|row, flow| {
                if flow.flow_id == factor.flow_id {
                    c.set(k, row, signed_factor(factor.factor, flow));
                }
            });
        }
    }
    // pass 2: located factors take precedence on their exact row
    for (k, category) in impact_index.iter().enumerate() {
        for factor in category.factors.iter().filter(|f| f.location_id.is_some()) {
            if let Some(row) = flow_index.of(factor.flow_id, factor.location_id) {
                let flow = flow_index.at(row);
                c.set(k, row, signed_factor(factor.factor, flow));
            }
        }
    }
    c
}

fn signed_factor(factor: f64, flow: FlowRef) -> f64 {
    if flow.is_input {
        -factor
    } else {
        factor
    }
}
