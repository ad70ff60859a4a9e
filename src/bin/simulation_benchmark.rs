// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto

//! ULCA Simulation Benchmark
//!
//! Runs a Monte-Carlo simulation over a synthetic nested product
//! system and reports per-flow statistics and throughput.
//!
//! # Usage
//! cargo run --bin simulation_benchmark -- --iterations 1000 --seed 42
//!

use std::env;

use ulca_core::db::{InMemoryDb, ProcessRecord};
use ulca_core::model::{
    CalcExchange, FlowType, ProcessLink, ProcessType, ProductSystemData,
};
use ulca_core::uncertainty::Uncertainty;
use ulca_core::{CalculationKernel, CalculationSetup, ProcessProduct};

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

/// A host system consuming an energy sub-system; both carry sampled
/// elementary exchanges.
fn demo_database() -> InMemoryDb {
    let mut db = InMemoryDb::new();

    // energy sub-system: 1 MJ of energy, CO2 with log-normal spread
    let mut co2 = exchange(3, 31, 901, FlowType::Elementary, false, 0.08);
    co2.uncertainty = Some(Uncertainty::LogNormal {
        gmean: 0.08,
        gsd: 1.2,
    });
    db.add_process(process(
        3,
        vec![exchange(3, 30, 300, FlowType::Product, false, 1.0), co2],
    ));
    db.add_product_system(ProductSystemData {
        id: 60,
        reference_process_id: 3,
        reference_flow_id: 300,
        target_amount: 1.0,
        process_links: vec![],
        parameter_redefs: vec![],
    });

    // host: 1 kg of product, 12 MJ energy input, direct emissions
    let mut direct = exchange(1, 13, 901, FlowType::Elementary, false, 0.4);
    direct.uncertainty = Some(Uncertainty::Triangle {
        min: 0.2,
        mode: 0.4,
        max: 0.9,
    });
    let mut water = exchange(1, 14, 902, FlowType::Elementary, true, 2.5);
    water.uncertainty = Some(Uncertainty::Normal { mean: 2.5, sd: 0.3 });
    db.add_process(process(
        1,
        vec![
            exchange(1, 10, 100, FlowType::Product, false, 1.0),
            exchange(1, 12, 300, FlowType::Product, true, 12.0),
            direct,
            water,
        ],
    ));
    db.add_product_system(ProductSystemData {
        id: 61,
        reference_process_id: 1,
        reference_flow_id: 100,
        target_amount: 1.0,
        process_links: vec![ProcessLink {
            process_id: 1,
            provider_id: 60,
            flow_id: 300,
            exchange_id: 12,
            is_system_link: true,
        }],
        parameter_redefs: vec![],
    });
    db
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut iterations = 1000usize;
    let mut seed = 42u64;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--iterations" => {
                i += 1;
                if i < args.len() {
                    iterations = args[i].parse().unwrap_or(iterations);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    seed = args[i].parse().unwrap_or(seed);
                }
            }
            "--help" | "-h" => {
                print_help();
                return;
            }
            _ => {}
        }
        i += 1;
    }

    println!("ULCA Simulation Benchmark");
    println!("  iterations: {}", iterations);
    println!("  seed:       {}", seed);

    let db = demo_database();
    let mut setup = CalculationSetup::of(61);
    setup.with_uncertainties = true;
    setup.rng_seed = Some(seed);

    let mut simulator = match CalculationKernel::simulator(&db, &setup) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("failed to set up the simulation: {}", err);
            std::process::exit(1);
        }
    };
    simulator.pinned_products.insert(ProcessProduct::of(60, 300));

    let start = instant::Instant::now();
    let successful = match simulator.run(iterations) {
        Ok(n) => n,
        Err(err) => {
            eprintln!("simulation aborted: {}", err);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    let result = simulator.result();
    println!(
        "  runs:       {}/{} successful in {:.3}s ({:.0} runs/s)",
        successful,
        iterations,
        elapsed,
        successful as f64 / elapsed.max(1e-9)
    );

    if let Some(index) = result.flow_index() {
        println!("  flow statistics ({} iterations):", result.iteration_count());
        index.each(|row, flow| {
            println!(
                "    flow {:>4} {}: mean = {:>10.5}, std = {:>9.5}",
                flow.flow_id,
                if flow.is_input { "(input) " } else { "(output)" },
                result.flow_mean_of(row),
                result.flow_std_of(row)
            );
        });
    }

    if let Some(pin) = result.pinned(&ProcessProduct::of(60, 300)) {
        println!(
            "  pinned energy system: {} direct / {} upstream vectors",
            pin.direct_flows.len(),
            pin.upstream_flows.len()
        );
    }
}

fn print_help() {
    println!("Usage: simulation_benchmark [--iterations N] [--seed S]");
    println!();
    println!("Runs a Monte-Carlo sweep over a nested demo system and");
    println!("prints per-flow statistics of the host inventory.");
}
