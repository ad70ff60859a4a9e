// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// CalculationKernel: Unified Rust/WASM Calculation Orchestrator

// ============================================================================
// CalculationKernel: Unified Calculation Orchestrator
// ============================================================================
// This module centralizes the calculation pipeline: tech-index
// construction, parameter resolution, matrix assembly and solving.
// Front-ends should call ONLY this module, not individual stages.
// ============================================================================

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wasm_bindgen::prelude::*;

use crate::db::{DataProvider, InMemoryDb};
use crate::error::{CancelToken, CoreError, CoreResult};
use crate::linking::{LinkingConfig, TechIndexBuilder};
use crate::matrices::builder::AssemblyContext;
use crate::matrices::MatrixData;
use crate::math::calculator::LcaCalculator;
use crate::math::simulator::Simulator;
use crate::math::solver::DenseSolver;
use crate::model::AllocationMethod;
use crate::parameters::{ParameterRedef, ParameterTable};
use crate::results::{ContributionResult, SimpleResult};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The input contract of a calculation.
#[derive(Serialize, Deserialize, Debug)]
pub struct CalculationSetup {
    pub product_system_id: u64,
    /// Overrides the persisted target amount when present.
    #[serde(default)]
    pub demand_amount: Option<f64>,
    #[serde(default)]
    pub allocation_method: AllocationMethod,
    #[serde(default)]
    pub with_costs: bool,
    #[serde(default)]
    pub with_uncertainties: bool,
    #[serde(default)]
    pub impact_method_id: Option<u64>,
    /// Carried for contract parity; normalisation and weighting are
    /// applied outside the core.
    #[serde(default)]
    pub nw_set_id: Option<u64>,
    #[serde(default)]
    pub parameter_redefs: Vec<ParameterRedef>,
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub linking: LinkingConfig,
    #[serde(skip)]
    pub cancel: CancelToken,
}

impl CalculationSetup {
    pub fn of(product_system_id: u64) -> CalculationSetup {
        CalculationSetup {
            product_system_id,
            demand_amount: None,
            allocation_method: AllocationMethod::None,
            with_costs: false,
            with_uncertainties: false,
            impact_method_id: None,
            nw_set_id: None,
            parameter_redefs: Vec::new(),
            rng_seed: None,
            linking: LinkingConfig::default(),
            cancel: CancelToken::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalculationEvent {
    pub topic: String,
    pub message: String,
    pub severity: String, // 'INFO', 'WARNING', 'CRITICAL'
}

#[derive(Serialize, Deserialize)]
pub struct FlowResultEntry {
    pub flow_id: u64,
    pub location_id: Option<u64>,
    pub is_input: bool,
    pub amount: f64,
}

#[derive(Serialize, Deserialize)]
pub struct ImpactResultEntry {
    pub impact_id: u64,
    pub amount: f64,
}

#[derive(Serialize, Deserialize)]
pub struct InventoryResponse {
    pub scaling: Vec<f64>,
    pub total_requirements: Vec<f64>,
    pub total_flows: Vec<FlowResultEntry>,
    pub total_impacts: Vec<ImpactResultEntry>,
    pub total_costs: Option<f64>,
    pub compute_time_ms: f64,
}

#[derive(Serialize, Deserialize)]
pub struct CalculationResponse {
    pub result: Option<InventoryResponse>,
    pub error: Option<ErrorBody>,
    pub events: Vec<CalculationEvent>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[wasm_bindgen]
pub struct CalculationKernel;

#[wasm_bindgen]
impl CalculationKernel {
    /// Main entry point: run an inventory calculation from JSON
    /// inputs. The front-end sends the database and the setup as raw
    /// JSON, the kernel handles everything and answers JSON.
    #[wasm_bindgen]
    pub fn calculate(database_json: &str, setup_json: &str) -> String {
        let response = Self::calculate_response(database_json, setup_json);
        serde_json::to_string(&response).unwrap_or_default()
    }

    /// Same entry point with a structured JS value as the result.
    pub fn calculate_value(database_json: &str, setup_json: &str) -> Result<JsValue, JsValue> {
        let response = Self::calculate_response(database_json, setup_json);
        Ok(serde_wasm_bindgen::to_value(&response)?)
    }
}

/// Pure Rust implementation (non-WASM-bindgen), shared with the native
/// binaries.
impl CalculationKernel {
    fn calculate_response(database_json: &str, setup_json: &str) -> CalculationResponse {
        // 1. hydrate the database and the setup (ALL marshalling in Rust)
        let db = match InMemoryDb::from_json(database_json) {
            Ok(db) => db,
            Err(err) => return CalculationResponse::failure(&err),
        };
        let setup: CalculationSetup = match serde_json::from_str(setup_json) {
            Ok(s) => s,
            Err(err) => {
                return CalculationResponse::failure(&CoreError::FormulaEval {
                    formula: "setup".to_string(),
                    reason: format!("failed to parse setup JSON: {}", err),
                })
            }
        };

        // 2. run the pure pipeline
        let start = instant::Instant::now();
        let result = match Self::calculate_simple(&db, &setup) {
            Ok(r) => r,
            Err(err) => return CalculationResponse::failure(&err),
        };
        let compute_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        // 3. generate events
        let mut events = Vec::new();
        if !result.has_flow_results() {
            events.push(CalculationEvent {
                topic: "CALC.INVENTORY".to_string(),
                message: "the system has no elementary flows".to_string(),
                severity: "WARNING".to_string(),
            });
        }
        let flows = result.flow_results();
        if flows.iter().any(|(_, v)| !v.is_finite()) {
            events.push(CalculationEvent {
                topic: "CALC.NUMERICS".to_string(),
                message: "non-finite values in the inventory result".to_string(),
                severity: "CRITICAL".to_string(),
            });
        }

        // 4. serialize output
        let impacts = match result.impact_index() {
            Some(index) => {
                let h = result.total_impacts();
                index
                    .iter()
                    .enumerate()
                    .map(|(row, category)| ImpactResultEntry {
                        impact_id: category.id,
                        amount: h[row],
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        CalculationResponse {
            result: Some(InventoryResponse {
                scaling: result.scaling_vector(),
                total_requirements: result.total_requirements(),
                total_flows: flows
                    .into_iter()
                    .map(|(flow, amount)| FlowResultEntry {
                        flow_id: flow.flow_id,
                        location_id: flow.location_id,
                        is_input: flow.is_input,
                        amount,
                    })
                    .collect(),
                total_impacts: impacts,
                total_costs: if result.has_cost_results() {
                    Some(result.total_costs())
                } else {
                    None
                },
                compute_time_ms,
            }),
            error: None,
            events,
        }
    }

    /// [CORE] Inventory-level calculation.
    pub fn calculate_simple(
        db: &dyn DataProvider,
        setup: &CalculationSetup,
    ) -> CoreResult<SimpleResult> {
        let data = Self::build_data(db, setup)?;
        let solver = DenseSolver::new();
        LcaCalculator::new(&solver, &data).calculate_simple()
    }

    /// [CORE] Contribution result over the lazy provider.
    pub fn calculate_contributions(
        db: &dyn DataProvider,
        setup: &CalculationSetup,
    ) -> CoreResult<ContributionResult> {
        let data = Self::build_data(db, setup)?;
        let solver = DenseSolver::new();
        LcaCalculator::new(&solver, &data).calculate_lazy()
    }

    /// [CORE] Contribution result over the eager provider (full
    /// inverse up front).
    pub fn calculate_full(
        db: &dyn DataProvider,
        setup: &CalculationSetup,
    ) -> CoreResult<ContributionResult> {
        let data = Self::build_data(db, setup)?;
        let solver = DenseSolver::new();
        LcaCalculator::new(&solver, &data).calculate_full()
    }

    /// [CORE] Monte-Carlo simulator for the setup.
    pub fn simulator<'a>(
        db: &'a dyn DataProvider,
        setup: &CalculationSetup,
    ) -> CoreResult<Simulator<'a>> {
        Simulator::create(db, setup, true)
    }

    /// Assemble the matrices of the setup. Systems with sub-system
    /// links run one deterministic pass over the simulation node graph
    /// so the host matrices contain the sub-system LCI columns.
    pub fn build_data(db: &dyn DataProvider, setup: &CalculationSetup) -> CoreResult<MatrixData> {
        let system = db.load_product_system(setup.product_system_id).ok_or(
            CoreError::MissingProvider {
                process_id: setup.product_system_id,
                flow_id: 0,
            },
        )?;

        let system_ids: HashSet<u64> = db.product_system_ids().into_iter().collect();
        let nested = system
            .process_links
            .iter()
            .any(|l| l.is_system_link || system_ids.contains(&l.provider_id));
        if nested {
            debug!(system = system.id, "nested system, running node graph");
            let mut simulator = Simulator::create(db, setup, false)?;
            simulator.next_run()?;
            return simulator
                .host_data()
                .cloned()
                .ok_or_else(|| CoreError::SingularMatrix("empty host data".to_string()));
        }

        let demand = setup.demand_amount.unwrap_or(system.target_amount);
        let tech_index = TechIndexBuilder::new(db, &setup.linking, Some(&system))
            .with_cancel(setup.cancel.clone())
            .build(system.reference(), demand)?;

        let process_ids: HashSet<u64> = tech_index.iter().map(|p| p.process_id).collect();
        let exchanges = db.load_exchanges(&process_ids);
        let impact_method = setup
            .impact_method_id
            .and_then(|id| db.load_impact_method(id));

        let mut contexts = process_ids.clone();
        if let Some(method) = &impact_method {
            for category in &method.categories {
                contexts.insert(category.id);
            }
        }
        let mut redefs = setup.parameter_redefs.clone();
        redefs.extend(system.parameter_redefs.iter().cloned());
        let parameters = ParameterTable::build(db.load_parameters(&contexts), &redefs);

        let mut rng = match (setup.with_uncertainties, setup.rng_seed) {
            (true, Some(seed)) => Some(StdRng::seed_from_u64(seed)),
            (true, None) => Some(StdRng::from_entropy()),
            (false, _) => None,
        };
        let interpreter = match rng.as_mut() {
            Some(rng) => parameters.simulate(rng),
            None => parameters.interpreter(),
        };

        let sub_results = std::collections::HashMap::new();
        let ctx = AssemblyContext {
            db,
            tech_index: &tech_index,
            exchanges: &exchanges,
            impact_method: impact_method.as_ref(),
            allocation_method: setup.allocation_method,
            with_costs: setup.with_costs,
            interpreter: &interpreter,
            sub_results: &sub_results,
        };
        ctx.assemble(rng.as_mut())
    }
}

impl CalculationResponse {
    fn failure(err: &CoreError) -> CalculationResponse {
        CalculationResponse {
            result: None,
            error: Some(ErrorBody {
                code: err.code().to_string(),
                message: err.to_string(),
            }),
            events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn demo_database() -> serde_json::Value {
        json!({
            "processes": [
                {
                    "id": 1,
                    "process_type": "UnitProcess",
                    "exchanges": [
                        { "owner_process_id": 1, "exchange_id": 11, "flow_id": 100,
                          "flow_type": "Product", "is_input": false, "amount": 1.0 },
                        { "owner_process_id": 1, "exchange_id": 12, "flow_id": 200,
                          "flow_type": "Product", "is_input": true, "amount": 2.0 },
                        { "owner_process_id": 1, "exchange_id": 13, "flow_id": 900,
                          "flow_type": "Elementary", "is_input": false, "amount": 3.0 }
                    ]
                },
                {
                    "id": 2,
                    "process_type": "UnitProcess",
                    "exchanges": [
                        { "owner_process_id": 2, "exchange_id": 21, "flow_id": 200,
                          "flow_type": "Product", "is_input": false, "amount": 1.0 },
                        { "owner_process_id": 2, "exchange_id": 22, "flow_id": 900,
                          "flow_type": "Elementary", "is_input": false, "amount": 5.0 }
                    ]
                }
            ],
            "product_systems": [
                { "id": 50, "reference_process_id": 1, "reference_flow_id": 100,
                  "target_amount": 1.0 }
            ]
        })
    }

    #[test]
    fn test_json_facade_round_trip() {
        let db = demo_database();
        let setup = json!({ "product_system_id": 50 });
        let raw = CalculationKernel::calculate(&db.to_string(), &setup.to_string());
        let response: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(response["error"].is_null(), "unexpected: {}", raw);
        let result = &response["result"];
        let scaling = result["scaling"].as_array().unwrap();
        assert_eq!(scaling.len(), 2);
        // process 2 scales to 2 units of its product
        assert!((scaling[1].as_f64().unwrap() - 2.0).abs() < 1e-12);
        // the inventory: 3 + 2*5 on the single output flow
        let flows = result["total_flows"].as_array().unwrap();
        assert_eq!(flows.len(), 1);
        assert!((flows[0]["amount"].as_f64().unwrap() - 13.0).abs() < 1e-12);
        assert!(result["compute_time_ms"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_json_facade_reports_error_codes() {
        let db = json!({ "processes": [], "product_systems": [] });
        let setup = json!({ "product_system_id": 50 });
        let raw = CalculationKernel::calculate(&db.to_string(), &setup.to_string());
        let response: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(response["error"]["code"], "MISSING_PROVIDER");
    }
}
