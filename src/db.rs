// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// DataProvider: read-only data source seam + in-memory implementation

//! The calculation core never talks to storage directly; it consumes
//! this read-only adapter. `InMemoryDb` is the reference implementation,
//! hydratable from JSON (the kernel façade) or built programmatically
//! (tests, benchmarks).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::matrices::ProcessProduct;
use crate::model::{
    AllocationMethod, CalcExchange, DQSystem, ImpactMethodData, ProcessType, ProductSystemData,
};
use crate::parameters::ParameterDef;

/// Process-level data-quality references.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProcessDqInfo {
    #[serde(default)]
    pub dq_system_id: Option<u64>,
    #[serde(default)]
    pub exchange_dq_system_id: Option<u64>,
    #[serde(default)]
    pub dq_entry: Option<String>,
}

/// Read-only data source of the calculation core.
///
/// Implementations must be cheap to query repeatedly: the tech-index
/// builder batch-loads exchanges per BFS block and the caches behind
/// this trait are read-only after warm-up (§ concurrency model).
pub trait DataProvider {
    fn load_exchanges(&self, process_ids: &HashSet<u64>) -> HashMap<u64, Vec<CalcExchange>>;

    /// All process-product pairs that provide the given flow.
    fn load_providers(&self, flow_id: u64) -> Vec<ProcessProduct>;

    /// Resolve one specific provider pair; also resolves product
    /// systems (sub-systems) by their reference flow.
    fn load_provider(&self, process_id: u64, flow_id: u64) -> Option<ProcessProduct>;

    fn load_process_type(&self, process_id: u64) -> ProcessType;

    fn load_product_system(&self, id: u64) -> Option<ProductSystemData>;

    /// Ids of all persisted product systems (sub-system detection).
    fn product_system_ids(&self) -> Vec<u64>;

    fn load_impact_method(&self, id: u64) -> Option<ImpactMethodData>;

    fn load_dq_system(&self, id: u64) -> Option<DQSystem>;

    /// Global parameters plus the parameters of the given contexts.
    fn load_parameters(&self, contexts: &HashSet<u64>) -> Vec<ParameterDef>;

    /// Allocation factor of `(process, product flow)` under the given
    /// method; 1.0 when none is defined.
    fn allocation_factor(&self, method: AllocationMethod, process_id: u64, flow_id: u64) -> f64;

    fn process_dq_info(&self, process_id: u64) -> Option<ProcessDqInfo>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AllocationFactorRecord {
    pub method: AllocationMethod,
    pub product_flow_id: u64,
    pub value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub id: u64,
    #[serde(default = "default_process_type")]
    pub process_type: ProcessType,
    #[serde(default)]
    pub exchanges: Vec<CalcExchange>,
    #[serde(default)]
    pub allocation_factors: Vec<AllocationFactorRecord>,
    #[serde(default)]
    pub dq: Option<ProcessDqInfo>,
}

fn default_process_type() -> ProcessType {
    ProcessType::UnitProcess
}

/// In-memory database. `rebuild_index` derives the provider table from
/// the exchange records (output products, input wastes, and the
/// reference flows of product systems).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryDb {
    #[serde(default)]
    pub processes: Vec<ProcessRecord>,
    #[serde(default)]
    pub product_systems: Vec<ProductSystemData>,
    #[serde(default)]
    pub impact_methods: Vec<ImpactMethodData>,
    #[serde(default)]
    pub dq_systems: Vec<DQSystem>,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    #[serde(skip)]
    providers_by_flow: HashMap<u64, Vec<ProcessProduct>>,
}

impl InMemoryDb {
    pub fn new() -> InMemoryDb {
        InMemoryDb::default()
    }

    pub fn from_json(json: &str) -> CoreResult<InMemoryDb> {
        let mut db: InMemoryDb =
            serde_json::from_str(json).map_err(|e| CoreError::FormulaEval {
                formula: "database".to_string(),
                reason: format!("failed to parse database JSON: {}", e),
            })?;
        db.rebuild_index();
        Ok(db)
    }

    pub fn add_process(&mut self, record: ProcessRecord) -> &mut Self {
        self.processes.push(record);
        self.rebuild_index();
        self
    }

    pub fn add_product_system(&mut self, system: ProductSystemData) -> &mut Self {
        self.product_systems.push(system);
        self.rebuild_index();
        self
    }

    pub fn add_impact_method(&mut self, method: ImpactMethodData) -> &mut Self {
        self.impact_methods.push(method);
        self
    }

    pub fn add_dq_system(&mut self, system: DQSystem) -> &mut Self {
        self.dq_systems.push(system);
        self
    }

    pub fn add_parameter(&mut self, parameter: ParameterDef) -> &mut Self {
        self.parameters.push(parameter);
        self
    }

    /// Derive the provider table. Deterministic: processes in id order,
    /// exchanges in record order, systems after processes.
    pub fn rebuild_index(&mut self) {
        self.providers_by_flow.clear();
        let mut processes: Vec<&ProcessRecord> = self.processes.iter().collect();
        processes.sort_by_key(|p| p.id);
        for process in processes {
            for e in &process.exchanges {
                if e.is_provider_flow() {
                    self.providers_by_flow
                        .entry(e.flow_id)
                        .or_default()
                        .push(ProcessProduct::of(process.id, e.flow_id));
                }
            }
        }
        let mut systems: Vec<&ProductSystemData> = self.product_systems.iter().collect();
        systems.sort_by_key(|s| s.id);
        for system in systems {
            self.providers_by_flow
                .entry(system.reference_flow_id)
                .or_default()
                .push(ProcessProduct::of(system.id, system.reference_flow_id));
        }
    }

    fn process(&self, id: u64) -> Option<&ProcessRecord> {
        self.processes.iter().find(|p| p.id == id)
    }
}

impl DataProvider for InMemoryDb {
    fn load_exchanges(&self, process_ids: &HashSet<u64>) -> HashMap<u64, Vec<CalcExchange>> {
        let mut map = HashMap::new();
        for process in &self.processes {
            if process_ids.contains(&process.id) {
                map.insert(process.id, process.exchanges.clone());
            }
        }
        map
    }

    fn load_providers(&self, flow_id: u64) -> Vec<ProcessProduct> {
        self.providers_by_flow
            .get(&flow_id)
            .cloned()
            .unwrap_or_default()
    }

    fn load_provider(&self, process_id: u64, flow_id: u64) -> Option<ProcessProduct> {
        self.load_providers(flow_id)
            .into_iter()
            .find(|p| p.process_id == process_id)
    }

    fn load_process_type(&self, process_id: u64) -> ProcessType {
        if self.product_systems.iter().any(|s| s.id == process_id) {
            return ProcessType::System;
        }
        self.process(process_id)
            .map(|p| p.process_type)
            .unwrap_or(ProcessType::UnitProcess)
    }

    fn load_product_system(&self, id: u64) -> Option<ProductSystemData> {
        self.product_systems.iter().find(|s| s.id == id).cloned()
    }

    fn product_system_ids(&self) -> Vec<u64> {
        self.product_systems.iter().map(|s| s.id).collect()
    }

    fn load_impact_method(&self, id: u64) -> Option<ImpactMethodData> {
        self.impact_methods.iter().find(|m| m.id == id).cloned()
    }

    fn load_dq_system(&self, id: u64) -> Option<DQSystem> {
        self.dq_systems.iter().find(|s| s.id == id).cloned()
    }

    fn load_parameters(&self, contexts: &HashSet<u64>) -> Vec<ParameterDef> {
        self.parameters
            .iter()
            .filter(|p| match p.context {
                None => true,
                Some(ctx) => contexts.contains(&ctx),
            })
            .cloned()
            .collect()
    }

    fn allocation_factor(&self, method: AllocationMethod, process_id: u64, flow_id: u64) -> f64 {
        if method == AllocationMethod::None {
            return 1.0;
        }
        self.process(process_id)
            .and_then(|p| {
                p.allocation_factors
                    .iter()
                    .find(|f| f.method == method && f.product_flow_id == flow_id)
            })
            .map(|f| f.value)
            .unwrap_or(1.0)
    }

    fn process_dq_info(&self, process_id: u64) -> Option<ProcessDqInfo> {
        self.process(process_id).and_then(|p| p.dq.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowType;

    fn output(process: u64, exchange: u64, flow: u64, amount: f64) -> CalcExchange {
        CalcExchange {
            owner_process_id: process,
            exchange_id: exchange,
            flow_id: flow,
            flow_type: FlowType::Product,
            is_input: false,
            amount,
            formula: None,
            default_provider_id: 0,
            location_id: None,
            uncertainty: None,
            cost_value: None,
            cost_formula: None,
            dq_entry: None,
        }
    }

    #[test]
    fn test_provider_index_covers_processes_and_systems() {
        let mut db = InMemoryDb::new();
        db.add_process(ProcessRecord {
            id: 2,
            process_type: ProcessType::UnitProcess,
            exchanges: vec![output(2, 1, 100, 1.0)],
            allocation_factors: vec![],
            dq: None,
        });
        db.add_process(ProcessRecord {
            id: 1,
            process_type: ProcessType::LciResult,
            exchanges: vec![output(1, 2, 100, 1.0)],
            allocation_factors: vec![],
            dq: None,
        });
        db.add_product_system(ProductSystemData {
            id: 9,
            reference_process_id: 1,
            reference_flow_id: 100,
            target_amount: 1.0,
            process_links: vec![],
            parameter_redefs: vec![],
        });

        let providers = db.load_providers(100);
        assert_eq!(providers.len(), 3);
        // process order is deterministic by id, systems last
        assert_eq!(providers[0].process_id, 1);
        assert_eq!(providers[1].process_id, 2);
        assert_eq!(providers[2].process_id, 9);
        assert_eq!(db.load_process_type(9), ProcessType::System);
        assert!(db.load_provider(9, 100).is_some());
        assert!(db.load_provider(9, 101).is_none());
    }

    #[test]
    fn test_allocation_factor_defaults_to_one() {
        let mut db = InMemoryDb::new();
        db.add_process(ProcessRecord {
            id: 1,
            process_type: ProcessType::UnitProcess,
            exchanges: vec![],
            allocation_factors: vec![AllocationFactorRecord {
                method: AllocationMethod::Physical,
                product_flow_id: 100,
                value: 0.25,
            }],
            dq: None,
        });
        assert_eq!(
            db.allocation_factor(AllocationMethod::Physical, 1, 100),
            0.25
        );
        assert_eq!(
            db.allocation_factor(AllocationMethod::Economic, 1, 100),
            1.0
        );
        assert_eq!(db.allocation_factor(AllocationMethod::None, 1, 100), 1.0);
    }
}
