// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// DQResult: data-quality matrices and weighted aggregation

//! Holds the raw data-quality scores of a result in byte matrices (one
//! row per indicator for processes, one flow*product matrix per
//! indicator for exchanges) and aggregates them with contribution-based
//! weights into per-flow and per-impact vectors.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::DataProvider;
use crate::error::CoreResult;
use crate::matrices::ProcessProduct;
use crate::model::{DQSystem, FlowRef};
use crate::results::ContributionResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationType {
    None,
    Maximum,
    WeightedAverage,
    WeightedSquaredAverage,
}

/// How NA scores (`0`) enter an aggregation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NaHandling {
    /// Drop the cell (value and weight).
    Exclude,
    /// Substitute the worst score before weighting.
    UseMax,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// Half-up.
    Nearest,
    /// Always up (ceiling).
    Up,
}

#[derive(Clone, Debug)]
pub struct DQCalculationSetup {
    pub process_system: Option<DQSystem>,
    pub exchange_system: Option<DQSystem>,
    pub aggregation: AggregationType,
    pub na_handling: NaHandling,
    pub rounding: Rounding,
}

impl DQCalculationSetup {
    pub fn of(process_system: Option<DQSystem>, exchange_system: Option<DQSystem>) -> Self {
        DQCalculationSetup {
            process_system,
            exchange_system,
            aggregation: AggregationType::WeightedAverage,
            na_handling: NaHandling::Exclude,
            rounding: Rounding::Nearest,
        }
    }
}

/// Byte matrix with flat `row + rows*col` storage.
#[derive(Clone, Debug)]
struct ByteMatrix {
    rows: usize,
    data: Vec<u8>,
}

impl ByteMatrix {
    fn new(rows: usize, cols: usize) -> ByteMatrix {
        ByteMatrix {
            rows,
            data: vec![0; rows * cols],
        }
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row + self.rows * col]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row + self.rows * col] = value;
    }
}

pub struct DQResult {
    setup: DQCalculationSetup,
    /// indicator × tech column
    process_data: Vec<Vec<u8>>,
    /// per indicator: flow × tech column
    exchange_data: Vec<ByteMatrix>,
    /// indicator × flow, aggregated with the direct contributions
    flow_result: Option<ByteMatrix>,
}

impl DQResult {
    pub fn of(
        db: &dyn DataProvider,
        setup: DQCalculationSetup,
        result: &ContributionResult,
    ) -> CoreResult<DQResult> {
        let mut dq = DQResult {
            setup,
            process_data: Vec::new(),
            exchange_data: Vec::new(),
            flow_result: None,
        };
        dq.load_process_data(db, result);
        dq.load_exchange_data(db, result);
        dq.calculate_flow_results(result);
        Ok(dq)
    }

    // ------------------------------------------------------------------
    // loading
    // ------------------------------------------------------------------

    fn load_process_data(&mut self, db: &dyn DataProvider, result: &ContributionResult) {
        let system = match &self.setup.process_system {
            Some(s) => s,
            None => return,
        };
        let tech_index = result.provider().tech_index();
        let k = system.indicator_count();
        self.process_data = vec![vec![0; tech_index.size()]; k];

        let mut seen: std::collections::HashSet<u64> = std::collections::HashSet::new();
        for product in tech_index.iter() {
            if !seen.insert(product.process_id) {
                continue;
            }
            let info = match db.process_dq_info(product.process_id) {
                Some(i) => i,
                None => continue,
            };
            if info.dq_system_id != Some(system.id) {
                continue;
            }
            let entry = match &info.dq_entry {
                Some(e) => e,
                None => continue,
            };
            let values = match system.to_values(entry) {
                Ok(v) => v,
                Err(err) => {
                    // degrade to all-NA with a diagnostic
                    warn!(process = product.process_id, %err, "invalid process DQ entry");
                    continue;
                }
            };
            for (i, value) in values.iter().enumerate().take(k) {
                for &col in tech_index.providers_of(product.process_id) {
                    self.process_data[i][col] = *value;
                }
            }
        }
    }

    fn load_exchange_data(&mut self, db: &dyn DataProvider, result: &ContributionResult) {
        let system = match &self.setup.exchange_system {
            Some(s) => s,
            None => return,
        };
        let provider = result.provider();
        let tech_index = provider.tech_index();
        let flow_index = match provider.flow_index() {
            Some(i) => i,
            None => return,
        };
        let k = system.indicator_count();
        self.exchange_data = (0..k)
            .map(|_| ByteMatrix::new(flow_index.size(), tech_index.size()))
            .collect();

        let process_ids: std::collections::HashSet<u64> =
            tech_index.iter().map(|p| p.process_id).collect();
        let exchanges = db.load_exchanges(&process_ids);

        for (process_id, list) in &exchanges {
            let matches = db
                .process_dq_info(*process_id)
                .map(|i| i.exchange_dq_system_id == Some(system.id))
                .unwrap_or(false);
            if !matches {
                continue;
            }
            for e in list {
                let entry = match &e.dq_entry {
                    Some(entry) => entry,
                    None => continue,
                };
                let row = match flow_index.of(e.flow_id, e.location_id) {
                    Some(r) => r,
                    None => continue,
                };
                let values = match system.to_values(entry) {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(process = process_id, exchange = e.exchange_id, %err,
                            "invalid exchange DQ entry");
                        continue;
                    }
                };
                for (i, value) in values.iter().enumerate().take(k) {
                    for &col in tech_index.providers_of(*process_id) {
                        self.exchange_data[i].set(row, col, *value);
                    }
                }
            }
        }
    }

    /// Aggregate the exchange scores over the tech columns with the
    /// direct flow contributions `G` as weights.
    fn calculate_flow_results(&mut self, result: &ContributionResult) {
        if self.setup.aggregation == AggregationType::None || self.exchange_data.is_empty() {
            return;
        }
        let system = match &self.setup.exchange_system {
            Some(s) => s,
            None => return,
        };
        let provider = result.provider();
        let m = provider.flow_index().map(|i| i.size()).unwrap_or(0);
        let n = provider.tech_index().size();
        let k = system.indicator_count();
        let max = system.score_count() as u8;

        let mut flow_result = ByteMatrix::new(k, m);
        for indicator in 0..k {
            let data = &self.exchange_data[indicator];
            for flow in 0..m {
                let dqs: Vec<u8> = (0..n).map(|j| data.get(flow, j)).collect();
                let weights: Vec<f64> = (0..n).map(|j| provider.direct_flow_of(flow, j)).collect();
                let value = self.aggregate(&dqs, &weights, max);
                flow_result.set(indicator, flow, value);
            }
        }
        self.flow_result = Some(flow_result);
    }

    // ------------------------------------------------------------------
    // queries
    // ------------------------------------------------------------------

    /// The process entry of the given product column.
    pub fn get_process(
        &self,
        result: &ContributionResult,
        product: &ProcessProduct,
    ) -> Option<Vec<u8>> {
        if self.process_data.is_empty() {
            return None;
        }
        let col = result.provider().tech_index().of(product)?;
        Some(self.process_data.iter().map(|row| row[col]).collect())
    }

    /// The exchange entry of the given product and flow.
    pub fn get_exchange(
        &self,
        result: &ContributionResult,
        product: &ProcessProduct,
        flow: &FlowRef,
    ) -> Option<Vec<u8>> {
        if self.exchange_data.is_empty() {
            return None;
        }
        let provider = result.provider();
        let col = provider.tech_index().of(product)?;
        let row = provider.flow_index()?.of_ref(flow)?;
        Some(self.exchange_data.iter().map(|m| m.get(row, col)).collect())
    }

    /// The aggregated scores of the given flow.
    pub fn get_flow(&self, result: &ContributionResult, flow: &FlowRef) -> Option<Vec<u8>> {
        let flow_result = self.flow_result.as_ref()?;
        let row = result.provider().flow_index()?.of_ref(flow)?;
        Some(
            (0..flow_result.rows)
                .map(|i| flow_result.get(i, row))
                .collect(),
        )
    }

    /// The aggregated scores of the given impact category: every
    /// `(flow, product)` cell weighted with `|C[k,f]·G[f,j]|`.
    pub fn get_impact(&self, result: &ContributionResult, category_id: u64) -> Option<Vec<u8>> {
        let system = self.setup.exchange_system.as_ref()?;
        if self.exchange_data.is_empty() {
            return None;
        }
        let provider = result.provider();
        let impact_row = provider.impact_index()?.position_of(category_id)?;
        let m = provider.flow_index()?.size();
        let n = provider.tech_index().size();
        let max = system.score_count() as u8;

        let mut weights = Vec::with_capacity(m * n);
        for flow in 0..m {
            let factor = provider.impact_factor_of(impact_row, flow);
            for j in 0..n {
                weights.push(factor * provider.direct_flow_of(flow, j));
            }
        }
        let values = (0..system.indicator_count())
            .map(|indicator| {
                let data = &self.exchange_data[indicator];
                let dqs: Vec<u8> = (0..m)
                    .flat_map(|flow| (0..n).map(move |j| data.get(flow, j)))
                    .collect();
                self.aggregate(&dqs, &weights, max)
            })
            .collect();
        Some(values)
    }

    /// The aggregated scores of one product column for the given
    /// impact category.
    pub fn get_process_impact(
        &self,
        result: &ContributionResult,
        product: &ProcessProduct,
        category_id: u64,
    ) -> Option<Vec<u8>> {
        let system = self.setup.exchange_system.as_ref()?;
        if self.exchange_data.is_empty() {
            return None;
        }
        let provider = result.provider();
        let impact_row = provider.impact_index()?.position_of(category_id)?;
        let col = provider.tech_index().of(product)?;
        let m = provider.flow_index()?.size();
        let max = system.score_count() as u8;

        let weights: Vec<f64> = (0..m)
            .map(|flow| {
                provider.impact_factor_of(impact_row, flow) * provider.direct_flow_of(flow, col)
            })
            .collect();
        let values = (0..system.indicator_count())
            .map(|indicator| {
                let data = &self.exchange_data[indicator];
                let dqs: Vec<u8> = (0..m).map(|flow| data.get(flow, col)).collect();
                self.aggregate(&dqs, &weights, max)
            })
            .collect();
        Some(values)
    }

    // ------------------------------------------------------------------
    // aggregation
    // ------------------------------------------------------------------

    fn aggregate(&self, dqs: &[u8], weights: &[f64], max: u8) -> u8 {
        match self.setup.aggregation {
            AggregationType::None => 0,
            AggregationType::Maximum => {
                let mut value = 0u8;
                for &dq in dqs {
                    let dq = self.na_value(dq, max);
                    value = value.max(dq);
                }
                value.min(max)
            }
            AggregationType::WeightedAverage | AggregationType::WeightedSquaredAverage => {
                let square =
                    self.setup.aggregation == AggregationType::WeightedSquaredAverage;
                let mut total_weight = 0.0;
                let mut value = 0.0;
                for (i, &dq) in dqs.iter().enumerate() {
                    let dq = self.na_value(dq, max);
                    if dq == 0 {
                        // excluded NA: neither value nor weight
                        continue;
                    }
                    let weight = if square {
                        weights[i] * weights[i]
                    } else {
                        weights[i].abs()
                    };
                    total_weight += weight;
                    value += dq as f64 * weight;
                }
                if total_weight == 0.0 {
                    return 0;
                }
                value /= total_weight;
                let rounded = match self.setup.rounding {
                    Rounding::Nearest => value.round(),
                    Rounding::Up => value.ceil(),
                };
                (rounded as u8).min(max)
            }
        }
    }

    fn na_value(&self, dq: u8, max: u8) -> u8 {
        if dq == 0 && self.setup.na_handling == NaHandling::UseMax {
            max
        } else {
            dq
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DQIndicator;

    fn setup(aggregation: AggregationType, na: NaHandling, rounding: Rounding) -> DQResult {
        let system = DQSystem {
            id: 1,
            name: None,
            indicators: (1..=3)
                .map(|position| DQIndicator {
                    position,
                    name: None,
                    score_count: 5,
                })
                .collect(),
        };
        DQResult {
            setup: DQCalculationSetup {
                process_system: None,
                exchange_system: Some(system),
                aggregation,
                na_handling: na,
                rounding,
            },
            process_data: Vec::new(),
            exchange_data: Vec::new(),
            flow_result: None,
        }
    }

    #[test]
    fn test_weighted_average_half_up() {
        let dq = setup(
            AggregationType::WeightedAverage,
            NaHandling::Exclude,
            Rounding::Nearest,
        );
        // (1*3 + 5*10) / 13 = 4.08 -> 4
        assert_eq!(dq.aggregate(&[1, 5], &[3.0, -10.0], 5), 4);
        // (2*4 + 4*12) / 16 = 3.5 -> 4
        assert_eq!(dq.aggregate(&[2, 4], &[4.0, 12.0], 5), 4);
    }

    #[test]
    fn test_weighted_average_ceiling() {
        let dq = setup(
            AggregationType::WeightedAverage,
            NaHandling::Exclude,
            Rounding::Up,
        );
        // (1*3 + 5*10) / 13 = 4.08 -> 5 under ceil
        assert_eq!(dq.aggregate(&[1, 5], &[3.0, 10.0], 5), 5);
    }

    #[test]
    fn test_squared_weights() {
        let dq = setup(
            AggregationType::WeightedSquaredAverage,
            NaHandling::Exclude,
            Rounding::Nearest,
        );
        // weights become 1 and 4: (2*1 + 5*4) / 5 = 4.4 -> 4
        assert_eq!(dq.aggregate(&[2, 5], &[1.0, 2.0], 5), 4);
    }

    #[test]
    fn test_maximum_aggregation() {
        let dq = setup(
            AggregationType::Maximum,
            NaHandling::Exclude,
            Rounding::Nearest,
        );
        assert_eq!(dq.aggregate(&[2, 4, 3], &[0.0, 0.0, 0.0], 5), 4);
    }

    #[test]
    fn test_na_exclude_drops_value_and_weight() {
        let dq = setup(
            AggregationType::WeightedAverage,
            NaHandling::Exclude,
            Rounding::Nearest,
        );
        // the NA cell's weight must not dilute the result
        assert_eq!(dq.aggregate(&[0, 4], &[100.0, 1.0], 5), 4);
    }

    #[test]
    fn test_na_use_max_substitutes_worst_score() {
        let dq = setup(
            AggregationType::WeightedAverage,
            NaHandling::UseMax,
            Rounding::Nearest,
        );
        // (5*1 + 1*1) / 2 = 3
        assert_eq!(dq.aggregate(&[0, 1], &[1.0, 1.0], 5), 3);
    }

    #[test]
    fn test_all_zero_weights_yield_zero() {
        // the flagged policy decision: squared average with all-zero
        // weights returns 0
        let dq = setup(
            AggregationType::WeightedSquaredAverage,
            NaHandling::UseMax,
            Rounding::Nearest,
        );
        assert_eq!(dq.aggregate(&[3, 4], &[0.0, 0.0], 5), 0);
    }
}
