// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//! Monte-Carlo Simulator
//!
//! Runs Monte-Carlo simulations of a product system that may contain
//! sub-systems (which again can contain sub-systems). The sub-system
//! relations form a strict partial order — cycles are rejected — so a
//! topological sort yields a linear schedule: in every iteration each
//! sub-system is sampled and solved before any system that consumes
//! it, and the host integrates the freshly produced LCI (and LCC)
//! totals into its own matrices before its solve.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{trace, warn};

use crate::calculation_kernel::CalculationSetup;
use crate::db::DataProvider;
use crate::error::{CancelToken, CoreError, CoreResult};
use crate::linking::TechIndexBuilder;
use crate::matrices::builder::{AssemblyContext, SubSystemLci};
use crate::matrices::{MatrixData, ProcessProduct, TechIndex};
use crate::math::calculator::LcaCalculator;
use crate::math::solver::{DenseSolver, MatrixSolver};
use crate::model::{CalcExchange, ImpactMethodData};
use crate::parameters::ParameterTable;
use crate::results::providers::SimpleResultProvider;
use crate::results::simulation::{PinnedIteration, SimulationResult};
use crate::results::SimpleResult;

/// The per-system state of the simulation graph.
struct SimNode {
    system_id: u64,
    product: ProcessProduct,
    demand: f64,
    with_uncertainties: bool,
    with_costs: bool,
    allocation_method: crate::model::AllocationMethod,
    tech_index: TechIndex,
    /// exchange cache, read-only after warm-up
    exchanges: HashMap<u64, Vec<CalcExchange>>,
    /// only the root carries an impact method (subs are LCI/LCC only)
    impact_method: Option<ImpactMethodData>,
    parameters: ParameterTable,
    /// sub-system products this node consumes
    sub_products: HashSet<ProcessProduct>,
    /// matrices of the latest generation pass
    data: Option<MatrixData>,
    last_result: Option<SimpleResult>,
}

impl<'a> std::fmt::Debug for Simulator<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator").finish_non_exhaustive()
    }
}

/// Monte-Carlo driver. Nodes are kept in topological order with the
/// host system last.
pub struct Simulator<'a> {
    db: &'a dyn DataProvider,
    solver: DenseSolver,
    nodes: Vec<SimNode>,
    node_by_system: HashMap<u64, usize>,
    /// products for which direct and upstream contributions are
    /// recorded per iteration; must be part of the host tech index
    pub pinned_products: HashSet<ProcessProduct>,
    result: SimulationResult,
    rng: StdRng,
    cancel: CancelToken,
}

impl<'a> Simulator<'a> {
    /// Build the simulation graph for the given setup. With `sample`
    /// set, sub-systems always run with uncertainties enabled and the
    /// root follows the setup; without it every node is deterministic
    /// (the single-pass mode used for plain nested calculations).
    pub fn create(
        db: &'a dyn DataProvider,
        setup: &CalculationSetup,
        sample: bool,
    ) -> CoreResult<Simulator<'a>> {
        let cancel = setup.cancel.clone();
        let root_id = setup.product_system_id;
        let root_system =
            db.load_product_system(root_id)
                .ok_or(CoreError::MissingProvider {
                    process_id: root_id,
                    flow_id: 0,
                })?;

        // 1. collect the sub-system relations reachable from the root
        let system_ids: HashSet<u64> = db.product_system_ids().into_iter().collect();
        let mut rels_of: HashMap<u64, Vec<u64>> = HashMap::new();
        for &id in &system_ids {
            if let Some(system) = db.load_product_system(id) {
                for link in &system.process_links {
                    if link.is_system_link || system_ids.contains(&link.provider_id) {
                        rels_of.entry(id).or_default().push(link.provider_id);
                    }
                }
            }
        }
        let mut reachable: HashSet<u64> = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(root_id);
        reachable.insert(root_id);
        while let Some(next) = queue.pop_front() {
            if let Some(subs) = rels_of.get(&next) {
                for &sub in subs {
                    if reachable.insert(sub) {
                        queue.push_back(sub);
                    }
                }
            }
        }

        // 2. topological order, host system last
        let order: Vec<u64> = if reachable.len() == 1 {
            vec![root_id]
        } else {
            let mut graph: DiGraphMap<u64, ()> = DiGraphMap::new();
            for &id in &reachable {
                graph.add_node(id);
            }
            for (&host, subs) in &rels_of {
                if !reachable.contains(&host) {
                    continue;
                }
                for &sub in subs {
                    if reachable.contains(&sub) {
                        graph.add_edge(sub, host, ());
                    }
                }
            }
            let mut order =
                toposort(&graph, None).map_err(|_| CoreError::CyclicSubsystems)?;
            // the root is the unique sink, keep it last
            order.retain(|&id| id != root_id);
            order.push(root_id);
            order
        };

        let rng = match setup.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut simulator = Simulator {
            db,
            solver: DenseSolver::new(),
            nodes: Vec::with_capacity(order.len()),
            node_by_system: HashMap::new(),
            pinned_products: HashSet::new(),
            result: SimulationResult::of(&MatrixData {
                tech_index: TechIndex::new(root_system.reference()),
                flow_index: None,
                impact_index: None,
                tech_matrix: crate::matrices::Matrix::sparse(1, 1),
                flow_matrix: None,
                impact_matrix: None,
                cost_vector: None,
                demand_vector: vec![0.0],
            }),
            rng,
            cancel,
        };

        // 3. initialize the nodes in topological order; each node gets
        // an empty placeholder result so host systems see the matrix
        // shapes of their sub-systems (flows that only occur in a
        // sub-system need a row in the host)
        for system_id in order {
            simulator.init_node(db, setup, system_id, root_id, sample)?;
        }

        // 4. the result store follows the shapes of the host matrices
        if let Some(root) = simulator.nodes.last() {
            if let Some(data) = &root.data {
                simulator.result = SimulationResult::of(data);
            }
        }
        Ok(simulator)
    }

    fn init_node(
        &mut self,
        db: &'a dyn DataProvider,
        setup: &CalculationSetup,
        system_id: u64,
        root_id: u64,
        sample: bool,
    ) -> CoreResult<()> {
        let system = db
            .load_product_system(system_id)
            .ok_or(CoreError::MissingProvider {
                process_id: system_id,
                flow_id: 0,
            })?;
        let is_root = system_id == root_id;
        let demand = if is_root {
            setup.demand_amount.unwrap_or(system.target_amount)
        } else {
            system.target_amount
        };

        let tech_index = TechIndexBuilder::new(db, &setup.linking, Some(&system))
            .with_cancel(self.cancel.clone())
            .build(system.reference(), demand)?;

        let process_ids: HashSet<u64> = tech_index.iter().map(|p| p.process_id).collect();
        let exchanges = db.load_exchanges(&process_ids);

        let impact_method = if is_root {
            setup
                .impact_method_id
                .and_then(|id| db.load_impact_method(id))
        } else {
            None
        };

        let mut contexts = process_ids.clone();
        if let Some(method) = &impact_method {
            for category in &method.categories {
                contexts.insert(category.id);
            }
        }
        let mut redefs = setup.parameter_redefs.clone();
        redefs.extend(system.parameter_redefs.iter().cloned());
        let parameters = ParameterTable::build(db.load_parameters(&contexts), &redefs);

        let sub_products: HashSet<ProcessProduct> = self
            .nodes
            .iter()
            .filter(|n| tech_index.contains(&n.product))
            .map(|n| n.product)
            .collect();

        let mut node = SimNode {
            system_id,
            product: system.reference(),
            demand,
            with_uncertainties: if is_root {
                sample && setup.with_uncertainties
            } else {
                sample
            },
            with_costs: setup.with_costs,
            allocation_method: setup.allocation_method,
            tech_index,
            exchanges,
            impact_method,
            parameters,
            sub_products,
            data: None,
            last_result: None,
        };

        // deterministic warm-up assembly: establishes the matrix
        // shapes and the placeholder result of this node
        let sub_results = self.collect_sub_lci(&node);
        let interpreter = node.parameters.interpreter();
        let ctx = AssemblyContext {
            db,
            tech_index: &node.tech_index,
            exchanges: &node.exchanges,
            impact_method: node.impact_method.as_ref(),
            allocation_method: node.allocation_method,
            with_costs: node.with_costs,
            interpreter: &interpreter,
            sub_results: &sub_results,
        };
        let data = ctx.assemble(None)?;

        let mut placeholder = SimpleResultProvider::of(data.tech_index.clone());
        if let Some(flow_index) = &data.flow_index {
            placeholder = placeholder
                .with_flow_index(flow_index.clone())
                .with_total_flows(vec![0.0; flow_index.size()]);
        }
        if node.with_costs {
            placeholder = placeholder.with_total_costs(0.0);
        }
        node.last_result = Some(SimpleResult::of(Box::new(placeholder)));
        node.data = Some(data);

        self.node_by_system.insert(system_id, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// The LCI totals of the sub-systems a node consumes, normalized
    /// by the sub-system demand at injection time.
    fn collect_sub_lci(&self, node: &SimNode) -> HashMap<ProcessProduct, SubSystemLci> {
        let mut map = HashMap::new();
        for product in &node.sub_products {
            let sub = match self
                .node_by_system
                .get(&product.process_id)
                .and_then(|&i| self.nodes.get(i))
            {
                Some(n) => n,
                None => continue,
            };
            let last = match &sub.last_result {
                Some(r) => r,
                None => continue,
            };
            let flow_index = match last.flow_index() {
                Some(i) => i.clone(),
                None => continue,
            };
            map.insert(
                *product,
                SubSystemLci {
                    flow_index,
                    total_flows: last.total_flows(),
                    total_costs: last.total_costs(),
                    demand: sub.demand,
                },
            );
        }
        map
    }

    /// Sample, assemble and solve one node; stores the fresh matrices
    /// and result on the node.
    fn generate_and_solve(&mut self, idx: usize) -> CoreResult<()> {
        let sub_results = self.collect_sub_lci(&self.nodes[idx]);
        let node = &self.nodes[idx];
        trace!(system = node.system_id, "generate and solve");
        let interpreter = if node.with_uncertainties {
            node.parameters.simulate(&mut self.rng)
        } else {
            node.parameters.interpreter()
        };
        let ctx = AssemblyContext {
            db: self.db,
            tech_index: &node.tech_index,
            exchanges: &node.exchanges,
            impact_method: node.impact_method.as_ref(),
            allocation_method: node.allocation_method,
            with_costs: node.with_costs,
            interpreter: &interpreter,
            sub_results: &sub_results,
        };
        let rng = if node.with_uncertainties {
            Some(&mut self.rng)
        } else {
            None
        };
        let data = ctx.assemble(rng)?;
        let result = LcaCalculator::new(&self.solver, &data).calculate_simple()?;
        let node = &mut self.nodes[idx];
        node.data = Some(data);
        node.last_result = Some(result);
        Ok(())
    }

    /// Run one iteration: generate and solve every sub-system in
    /// topological order, then the host; append the host result and
    /// the pinned-product vectors. A failing iteration appends
    /// nothing; callers may continue with the next run.
    pub fn next_run(&mut self) -> CoreResult<()> {
        for idx in 0..self.nodes.len() {
            self.cancel.check()?;
            self.generate_and_solve(idx)?;
        }
        let pins = self.compute_pins()?;

        // commit only after everything succeeded
        let host = match self.nodes.last() {
            Some(n) => n,
            None => return Ok(()),
        };
        if let Some(result) = &host.last_result {
            self.result.append(result);
        }
        for (product, pin) in pins {
            self.result.append_pin(product, pin);
        }
        Ok(())
    }

    /// Run up to `iterations` runs; numerically failing iterations are
    /// discarded, cancellation stops the sweep. Returns the number of
    /// successful iterations of this sweep.
    pub fn run(&mut self, iterations: usize) -> CoreResult<usize> {
        let mut successful = 0;
        for i in 0..iterations {
            match self.next_run() {
                Ok(()) => successful += 1,
                Err(CoreError::Cancelled) => break,
                Err(err) => {
                    trace!(iteration = i, %err, "simulation run failed");
                }
            }
        }
        Ok(successful)
    }

    /// Direct and upstream contributions of the pinned products from
    /// the current host matrices.
    fn compute_pins(&self) -> CoreResult<Vec<(ProcessProduct, PinnedIteration)>> {
        if self.pinned_products.is_empty() {
            return Ok(Vec::new());
        }
        let host = match self.nodes.last() {
            Some(n) => n,
            None => return Ok(Vec::new()),
        };
        let (data, result) = match (&host.data, &host.last_result) {
            (Some(d), Some(r)) => (d, r),
            _ => return Ok(Vec::new()),
        };
        let b = match &data.flow_matrix {
            Some(m) => m.to_dense(),
            None => return Ok(Vec::new()),
        };
        let a = data.tech_matrix.to_dense();
        let c = data.impact_matrix.as_ref();
        let s = result.scaling_vector();

        let mut pins = Vec::new();
        for product in &self.pinned_products {
            let col = match data.tech_index.of(product) {
                Some(c) => c,
                None => {
                    warn!(
                        process = product.process_id,
                        flow = product.flow_id,
                        "pinned product is not part of the tech index"
                    );
                    continue;
                }
            };

            // direct contributions: B[:,j] · s[j]
            let mut direct_flows = b.column(col);
            for v in &mut direct_flows {
                *v *= s[col];
            }
            let direct_impacts = c.map(|c| self.solver.multiply_vec(c, &direct_flows));

            // upstream: one-unit solution scaled by the loop-corrected
            // total factor of the pinned column
            let x = self.solver.solve_column(&a, col, 1.0)?;
            let loop_factor = LcaCalculator::loop_factor(&a, &x, col);
            let factor = s[col] * a.get(col, col) * loop_factor;
            let mut upstream_flows = self.solver.multiply_vec(&b, &x);
            for v in &mut upstream_flows {
                *v *= factor;
            }
            let upstream_impacts = c.map(|c| self.solver.multiply_vec(c, &upstream_flows));

            pins.push((
                *product,
                PinnedIteration {
                    direct_flows,
                    upstream_flows,
                    direct_impacts,
                    upstream_impacts,
                },
            ));
        }
        Ok(pins)
    }

    pub fn result(&self) -> &SimulationResult {
        &self.result
    }

    pub fn into_result(self) -> SimulationResult {
        self.result
    }

    pub fn tech_index(&self) -> Option<&TechIndex> {
        self.nodes.last().map(|n| &n.tech_index)
    }

    /// The host matrices of the latest generation pass.
    pub fn host_data(&self) -> Option<&MatrixData> {
        self.nodes.last().and_then(|n| n.data.as_ref())
    }

    /// The latest result of a sub-system node (tests and diagnostics).
    pub fn sub_result(&self, system_id: u64) -> Option<&SimpleResult> {
        self.node_by_system
            .get(&system_id)
            .and_then(|&i| self.nodes.get(i))
            .and_then(|n| n.last_result.as_ref())
    }
}
