// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto

//! ULCA Calculation Pipeline Tests
//!
//! End-to-end scenarios over the full pipeline: linking, assembly,
//! solving, result views, data quality and simulation.

use std::collections::HashSet;

use crate::calculation_kernel::{CalculationKernel, CalculationSetup};
use crate::db::{InMemoryDb, ProcessDqInfo, ProcessRecord};
use crate::matrices::{DenseMatrix, FlowIndex, Matrix, MatrixData, ProcessProduct, TechIndex};
use crate::math::solver::DenseSolver;
use crate::math::{LcaCalculator, Simulator};
use crate::model::{
    CalcExchange, DQIndicator, DQSystem, FlowRef, FlowType, ImpactCategoryData, ImpactFactor,
    ImpactMethodData, ProcessLink, ProcessType, ProductSystemData,
};
use crate::results::sankey::{Sankey, SankeyRef};
use crate::results::{DQCalculationSetup, DQResult};
use crate::uncertainty::Uncertainty;

fn exchange(
    process: u64,
    exchange_id: u64,
    flow: u64,
    flow_type: FlowType,
    is_input: bool,
    amount: f64,
) -> CalcExchange {
    CalcExchange {
        owner_process_id: process,
        exchange_id,
        flow_id: flow,
        flow_type,
        is_input,
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

fn process(id: u64, exchanges: Vec<CalcExchange>) -> ProcessRecord {
    ProcessRecord {
        id,
        process_type: ProcessType::UnitProcess,
        exchanges,
        allocation_factors: vec![],
        dq: None,
    }
}

fn system(id: u64, process: u64, flow: u64) -> ProductSystemData {
    ProductSystemData {
        id,
        reference_process_id: process,
        reference_flow_id: flow,
        target_amount: 1.0,
        process_links: vec![],
        parameter_redefs: vec![],
    }
}

// ============================================================================
// SIGN CONVENTIONS
// ============================================================================

#[test]
fn test_1x1_system_adopts_all_signs() {
    // one process, demand 1, four elementary exchanges with mixed
    // directions; all reported totals must come back positive
    let mut db = InMemoryDb::new();
    db.add_process(process(
        1,
        vec![
            exchange(1, 10, 100, FlowType::Product, false, 1.0),
            exchange(1, 11, 901, FlowType::Elementary, true, 1.0),
            exchange(1, 12, 902, FlowType::Elementary, false, 2.0),
            exchange(1, 13, 903, FlowType::Elementary, true, 3.0),
            exchange(1, 14, 904, FlowType::Elementary, false, 4.0),
        ],
    ));
    db.add_product_system(system(50, 1, 100));

    let setup = CalculationSetup::of(50);
    let result = CalculationKernel::calculate_simple(&db, &setup).unwrap();

    for (flow_id, expected) in [(901, 1.0), (902, 2.0), (903, 3.0), (904, 4.0)] {
        let flow = if flow_id % 2 == 1 {
            FlowRef::input_of(flow_id)
        } else {
            FlowRef::output_of(flow_id)
        };
        let total = result.total_flow_of(&flow);
        assert!(
            (total - expected).abs() < 1e-14,
            "flow {}: {} != {}",
            flow_id,
            total,
            expected
        );
    }
}

// ============================================================================
// CYCLIC SYSTEMS AND SANKEY
// ============================================================================

fn cyclic_matrix_data() -> MatrixData {
    let mut tech_index = TechIndex::new(ProcessProduct::of(1, 1));
    tech_index.set_demand(1.0);
    // the cycle: p2 consumes p3 which consumes p2 again
    tech_index.put_link(1, 12, ProcessProduct::of(2, 2));
    tech_index.put_link(2, 23, ProcessProduct::of(3, 3));
    tech_index.put_link(3, 32, ProcessProduct::of(2, 2));

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

#[test]
fn test_sankey_over_cyclic_system() {
    let data = cyclic_matrix_data();
    let solver = DenseSolver::new();
    let result = LcaCalculator::new(&solver, &data).calculate_full().unwrap();

    let sankey = Sankey::of(SankeyRef::Flow(FlowRef::output_of(42)), &result).build();
    assert_eq!(sankey.node_count, 3);

    let mut visited = 0;
    sankey.traverse(|node| {
        visited += 1;
        let (direct, total, share) = match node.index {
            0 => (1.0, 11.0, 1.0),
            1 => (2.5, 10.0, 10.0 / 11.0),
            2 => (7.5, 8.0, 8.0 / 11.0),
            other => panic!("unexpected node {}", other),
        };
        assert!((node.direct - direct).abs() < 1e-10, "direct of {}", node.index);
        assert!((node.total - total).abs() < 1e-10, "total of {}", node.index);
        assert!((node.share - share).abs() < 1e-10, "share of {}", node.index);
    });
    assert_eq!(visited, 3);
}

#[test]
fn test_sankey_cutoff_drops_small_nodes() {
    let data = cyclic_matrix_data();
    let solver = DenseSolver::new();
    let result = LcaCalculator::new(&solver, &data).calculate_full().unwrap();
    let sankey = Sankey::of(SankeyRef::Flow(FlowRef::output_of(42)), &result)
        .with_min_share(0.95)
        .build();
    // only the reference node survives a 95% cutoff
    assert_eq!(sankey.node_count, 1);
}

#[test]
fn test_intensity_times_demand_is_inventory() {
    let data = cyclic_matrix_data();
    let solver = DenseSolver::new();
    let result = LcaCalculator::new(&solver, &data).calculate_full().unwrap();
    let provider = result.provider();
    // M·f = g for the unit demand on column 0
    let m0 = provider.total_flows_of_one(0);
    let g = provider.total_flows();
    for (a, b) in m0.iter().zip(&g) {
        assert!((a - b).abs() < 1e-10);
    }
}

// ============================================================================
// DATA QUALITY
// ============================================================================

fn five_five_dq_system() -> DQSystem {
    DQSystem {
        id: 99,
        name: None,
        indicators: (1..=5)
            .map(|position| DQIndicator {
                position,
                name: None,
                score_count: 5,
            })
            .collect(),
    }
}

/// Two linked processes, characterization factors 2 and 8, weighted
/// average with half-up rounding.
fn dq_scenario() -> (InMemoryDb, CalculationSetup) {
    let mut db = InMemoryDb::new();
    let dq_info = ProcessDqInfo {
        dq_system_id: Some(99),
        exchange_dq_system_id: Some(99),
        dq_entry: None,
    };

    let mut ref1 = exchange(1, 11, 100, FlowType::Product, false, 1.0);
    ref1.dq_entry = Some("(1;2;3;4;5)".to_string());
    let link1 = exchange(1, 12, 200, FlowType::Product, true, 2.0);
    let mut elem1_p1 = exchange(1, 13, 901, FlowType::Elementary, true, 3.0);
    elem1_p1.dq_entry = Some("(1;2;3;4;5)".to_string());
    let mut elem2_p1 = exchange(1, 14, 902, FlowType::Elementary, true, 4.0);
    elem2_p1.dq_entry = Some("(5;4;3;2;1)".to_string());
    let mut p1 = process(1, vec![ref1, link1, elem1_p1, elem2_p1]);
    p1.dq = Some(ProcessDqInfo {
        dq_entry: Some("(1;2;3;4;5)".to_string()),
        ..dq_info.clone()
    });

    let mut ref2 = exchange(2, 21, 200, FlowType::Product, false, 1.0);
    ref2.dq_entry = Some("(5;4;3;2;1)".to_string());
    let mut elem1_p2 = exchange(2, 22, 901, FlowType::Elementary, true, 5.0);
    elem1_p2.dq_entry = Some("(5;4;3;2;1)".to_string());
    let mut elem2_p2 = exchange(2, 23, 902, FlowType::Elementary, true, 6.0);
    elem2_p2.dq_entry = Some("(1;2;3;4;5)".to_string());
    let mut p2 = process(2, vec![ref2, elem1_p2, elem2_p2]);
    p2.dq = Some(ProcessDqInfo {
        dq_entry: Some("(5;4;3;2;1)".to_string()),
        ..dq_info
    });

    db.add_process(p1);
    db.add_process(p2);

    let mut sys = system(50, 1, 100);
    sys.process_links.push(ProcessLink {
        process_id: 1,
        provider_id: 2,
        flow_id: 200,
        exchange_id: 12,
        is_system_link: false,
    });
    db.add_product_system(sys);

    db.add_impact_method(ImpactMethodData {
        id: 70,
        name: None,
        categories: vec![ImpactCategoryData {
            id: 71,
            name: None,
            factors: vec![
                ImpactFactor {
                    flow_id: 901,
                    factor: 2.0,
                    location_id: None,
                },
                ImpactFactor {
                    flow_id: 902,
                    factor: 8.0,
                    location_id: None,
                },
            ],
        }],
    });
    db.add_dq_system(five_five_dq_system());

    let mut setup = CalculationSetup::of(50);
    setup.impact_method_id = Some(70);
    (db, setup)
}

#[test]
fn test_dq_aggregation_scenario() {
    let (db, setup) = dq_scenario();
    let result = CalculationKernel::calculate_contributions(&db, &setup).unwrap();
    let dq_system = five_five_dq_system();
    let dq_setup = DQCalculationSetup::of(Some(dq_system.clone()), Some(dq_system));
    let dq = DQResult::of(&db, dq_setup, &result).unwrap();

    let elem1 = FlowRef::input_of(901);
    let elem2 = FlowRef::input_of(902);
    let p1 = ProcessProduct::of(1, 100);
    let p2 = ProcessProduct::of(2, 200);

    // aggregated flow vectors
    assert_eq!(dq.get_flow(&result, &elem1).unwrap(), vec![4, 4, 3, 2, 2]);
    assert_eq!(dq.get_flow(&result, &elem2).unwrap(), vec![2, 3, 3, 4, 4]);
    // aggregated impact vector
    assert_eq!(dq.get_impact(&result, 71).unwrap(), vec![2, 3, 3, 3, 4]);
    // raw exchange entries
    assert_eq!(
        dq.get_exchange(&result, &p1, &elem1).unwrap(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(
        dq.get_exchange(&result, &p2, &elem1).unwrap(),
        vec![5, 4, 3, 2, 1]
    );
    assert_eq!(
        dq.get_exchange(&result, &p1, &elem2).unwrap(),
        vec![5, 4, 3, 2, 1]
    );
    assert_eq!(
        dq.get_exchange(&result, &p2, &elem2).unwrap(),
        vec![1, 2, 3, 4, 5]
    );
    // per-process impact aggregation
    assert_eq!(
        dq.get_process_impact(&result, &p1, 71).unwrap(),
        vec![4, 4, 3, 2, 2]
    );
    assert_eq!(
        dq.get_process_impact(&result, &p2, 71).unwrap(),
        vec![2, 2, 3, 4, 4]
    );
    // process entries
    assert_eq!(dq.get_process(&result, &p1).unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(dq.get_process(&result, &p2).unwrap(), vec![5, 4, 3, 2, 1]);
}

// ============================================================================
// SIMULATION
// ============================================================================

/// A host system consuming a sub-system whose elementary output is
/// sampled per iteration.
fn nested_simulation_db() -> InMemoryDb {
    let mut db = InMemoryDb::new();

    let mut sampled = exchange(3, 31, 901, FlowType::Elementary, false, 5.0);
    sampled.uncertainty = Some(Uncertainty::Uniform { min: 2.0, max: 8.0 });
    db.add_process(process(
        3,
        vec![exchange(3, 30, 300, FlowType::Product, false, 1.0), sampled],
    ));
    db.add_product_system(system(60, 3, 300));

    db.add_process(process(
        1,
        vec![
            exchange(1, 10, 100, FlowType::Product, false, 1.0),
            exchange(1, 12, 300, FlowType::Product, true, 1.0),
        ],
    ));
    let mut host = system(61, 1, 100);
    host.process_links.push(ProcessLink {
        process_id: 1,
        provider_id: 60,
        flow_id: 300,
        exchange_id: 12,
        is_system_link: true,
    });
    db.add_product_system(host);
    db
}

#[test]
fn test_simulation_propagates_sub_results_within_the_iteration() {
    let db = nested_simulation_db();
    let mut setup = CalculationSetup::of(61);
    setup.with_uncertainties = true;
    setup.rng_seed = Some(42);

    let mut simulator = Simulator::create(&db, &setup, true).unwrap();
    let sub_product = ProcessProduct::of(60, 300);
    simulator.pinned_products.insert(sub_product);

    let mut samples = Vec::new();
    for iteration in 0..5 {
        simulator.next_run().unwrap();

        // the sub-system result of THIS iteration
        let sub_total = simulator.sub_result(60).unwrap().total_flows()[0];
        assert!((2.0..=8.0).contains(&sub_total));

        // the host column must hold exactly that vector
        let host = simulator.host_data().unwrap();
        let row = host.flow_index.as_ref().unwrap().of(901, None).unwrap();
        let col = host.tech_index.of(&sub_product).unwrap();
        let injected = host.flow_matrix.as_ref().unwrap().get(row, col);
        assert!(
            (injected - sub_total).abs() < 1e-14,
            "iteration {}: host column {} != sub result {}",
            iteration,
            injected,
            sub_total
        );

        // and the appended host total equals it as well (1 unit link)
        let appended = *simulator
            .result()
            .flow_samples_of(row)
            .last()
            .unwrap();
        assert!((appended - sub_total).abs() < 1e-12);
        samples.push(sub_total);
    }

    assert_eq!(simulator.result().iteration_count(), 5);
    let first = samples[0];
    assert!(
        samples.iter().any(|s| (s - first).abs() > 1e-9),
        "samples must vary across iterations: {:?}",
        samples
    );

    // the pin ledger recorded one direct and one upstream vector per
    // iteration, equal to the sub totals here
    let pin = simulator.result().pinned(&sub_product).unwrap();
    assert_eq!(pin.direct_flows.len(), 5);
    assert_eq!(pin.upstream_flows.len(), 5);
    let host = simulator.host_data().unwrap();
    let row = host.flow_index.as_ref().unwrap().of(901, None).unwrap();
    for (direct, sample) in pin.direct_flows.iter().zip(&samples) {
        assert!((direct[row] - sample).abs() < 1e-12);
    }
    for (upstream, sample) in pin.upstream_flows.iter().zip(&samples) {
        assert!((upstream[row] - sample).abs() < 1e-12);
    }
}

#[test]
fn test_seeded_simulations_are_reproducible() {
    let db = nested_simulation_db();

    let run = |db: &InMemoryDb| {
        let setup = {
            let mut s = CalculationSetup::of(61);
            s.with_uncertainties = true;
            s.rng_seed = Some(7);
            s
        };
        let mut simulator = Simulator::create(db, &setup, true).unwrap();
        simulator.run(4).unwrap();
        let host = simulator.host_data().unwrap();
        let row = host.flow_index.as_ref().unwrap().of(901, None).unwrap();
        simulator.result().flow_samples_of(row)
    };

    let a = run(&db);
    let b = run(&db);
    assert_eq!(a.len(), 4);
    assert_eq!(a, b, "same seed must give the same iteration sequence");
}

#[test]
fn test_nested_plain_calculation_integrates_sub_lci() {
    // the deterministic single pass: sub solved once, injected into
    // the host column, host solved normally
    let db = nested_simulation_db();
    let setup = CalculationSetup::of(61);
    let result = CalculationKernel::calculate_simple(&db, &setup).unwrap();
    let total = result.total_flow_of(&FlowRef::output_of(901));
    // the sub's literal amount, no sampling
    assert!((total - 5.0).abs() < 1e-12, "got {}", total);
}

#[test]
fn test_cyclic_subsystems_are_rejected() {
    let mut db = InMemoryDb::new();
    db.add_process(process(
        1,
        vec![
            exchange(1, 10, 100, FlowType::Product, false, 1.0),
            exchange(1, 12, 300, FlowType::Product, true, 1.0),
        ],
    ));
    db.add_process(process(
        3,
        vec![
            exchange(3, 30, 300, FlowType::Product, false, 1.0),
            exchange(3, 32, 100, FlowType::Product, true, 0.5),
        ],
    ));
    let mut sys_a = system(60, 1, 100);
    sys_a.process_links.push(ProcessLink {
        process_id: 1,
        provider_id: 61,
        flow_id: 300,
        exchange_id: 12,
        is_system_link: true,
    });
    let mut sys_b = system(61, 3, 300);
    sys_b.process_links.push(ProcessLink {
        process_id: 3,
        provider_id: 60,
        flow_id: 100,
        exchange_id: 32,
        is_system_link: true,
    });
    db.add_product_system(sys_a);
    db.add_product_system(sys_b);

    let setup = CalculationSetup::of(60);
    let err = Simulator::create(&db, &setup, true).unwrap_err();
    assert_eq!(err.code(), "CYCLIC_SUBSYSTEMS");
}

#[test]
fn test_cancellation_short_circuits_the_calculation() {
    let mut db = InMemoryDb::new();
    db.add_process(process(
        1,
        vec![exchange(1, 10, 100, FlowType::Product, false, 1.0)],
    ));
    db.add_product_system(system(50, 1, 100));
    let setup = CalculationSetup::of(50);
    setup.cancel.cancel();
    let err = CalculationKernel::calculate_simple(&db, &setup).unwrap_err();
    assert_eq!(err.code(), "CANCELLED");
}

// ============================================================================
// EACH-ONE ITERATION
// ============================================================================

#[test]
fn test_each_one_over_a_linked_system() {
    let mut db = InMemoryDb::new();
    db.add_process(process(
        1,
        vec![
            exchange(1, 11, 100, FlowType::Product, false, 1.0),
            exchange(1, 12, 200, FlowType::Product, true, 2.0),
            exchange(1, 13, 901, FlowType::Elementary, false, 1.0),
        ],
    ));
    db.add_process(process(
        2,
        vec![
            exchange(2, 21, 200, FlowType::Product, false, 1.0),
            exchange(2, 22, 901, FlowType::Elementary, false, 3.0),
        ],
    ));
    db.add_product_system(system(50, 1, 100));

    let setup = CalculationSetup::of(50);
    let data = CalculationKernel::build_data(&db, &setup).unwrap();
    let solver = DenseSolver::new();
    let results = LcaCalculator::new(&solver, &data)
        .each_one(|_| false)
        .unwrap();
    assert_eq!(results.len(), 2);

    let products: HashSet<u64> = results.iter().map(|(p, _)| p.process_id).collect();
    assert_eq!(products, HashSet::from([1, 2]));
    for (product, result) in &results {
        let total = result.total_flow_of(&FlowRef::output_of(901));
        let expected = if product.process_id == 1 {
            1.0 + 2.0 * 3.0
        } else {
            3.0
        };
        assert!(
            (total - expected).abs() < 1e-12,
            "process {}: {} != {}",
            product.process_id,
            total,
            expected
        );
    }
}
