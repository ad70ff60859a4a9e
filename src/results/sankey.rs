// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// Sankey: upstream contribution graph bounded by a cutoff

use std::collections::{HashMap, HashSet, VecDeque};

use crate::matrices::ProcessProduct;
use crate::model::FlowRef;
use crate::results::{adopt, ContributionResult};

/// What the graph is built for: one elementary flow or one impact
/// category.
#[derive(Clone, Copy, Debug)]
pub enum SankeyRef {
    Flow(FlowRef),
    Impact(u64),
}

#[derive(Clone, Debug)]
pub struct SankeyNode {
    /// Tech-index position of the node.
    pub index: usize,
    pub product: ProcessProduct,
    /// Direct contribution of the node to the reference result.
    pub direct: f64,
    /// Total (direct + upstream) result of the node.
    pub total: f64,
    /// `total / total of the reference node`.
    pub share: f64,
}

/// The upstream graph of a result for one flow or impact category.
/// Nodes below the share cutoff are left out; edges follow the
/// provider links of the tech index.
pub struct Sankey {
    pub nodes: Vec<SankeyNode>,
    /// provider position -> recipient position, for included nodes
    edges: Vec<(usize, usize)>,
    pub node_count: usize,
}

pub struct SankeyBuilder<'a> {
    reference: SankeyRef,
    result: &'a ContributionResult,
    min_share: f64,
    max_nodes: usize,
}

impl Sankey {
    pub fn of(reference: SankeyRef, result: &ContributionResult) -> SankeyBuilder<'_> {
        SankeyBuilder {
            reference,
            result,
            min_share: 0.0,
            max_nodes: usize::MAX,
        }
    }

    /// Visit the included nodes in breadth-first order starting at the
    /// reference node.
    pub fn traverse<F: FnMut(&SankeyNode)>(&self, mut visitor: F) {
        let by_index: HashMap<usize, &SankeyNode> =
            self.nodes.iter().map(|n| (n.index, n)).collect();
        let mut providers_of: HashMap<usize, Vec<usize>> = HashMap::new();
        for (provider, recipient) in &self.edges {
            providers_of.entry(*recipient).or_default().push(*provider);
        }
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        if let Some(root) = self.nodes.first() {
            queue.push_back(root.index);
            seen.insert(root.index);
        }
        while let Some(index) = queue.pop_front() {
            if let Some(node) = by_index.get(&index) {
                visitor(node);
            }
            if let Some(providers) = providers_of.get(&index) {
                for &p in providers {
                    if by_index.contains_key(&p) && seen.insert(p) {
                        queue.push_back(p);
                    }
                }
            }
        }
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }
}

impl<'a> SankeyBuilder<'a> {
    /// Drop nodes whose absolute share is below the cutoff.
    pub fn with_min_share(mut self, share: f64) -> Self {
        self.min_share = share;
        self
    }

    pub fn with_max_nodes(mut self, count: usize) -> Self {
        self.max_nodes = count;
        self
    }

    pub fn build(self) -> Sankey {
        let provider = self.result.provider();
        let tech_index = provider.tech_index();
        let n = tech_index.size();

        // 1. node values for every column
        let values: Vec<(f64, f64)> = (0..n)
            .map(|j| self.values_of(j))
            .collect();
        let ref_total = values.first().map(|v| v.1).unwrap_or(0.0);
        let share = |total: f64| {
            if ref_total == 0.0 {
                0.0
            } else {
                total / ref_total
            }
        };

        // 2. provider edges from the link table
        let mut provider_edges: HashMap<usize, Vec<usize>> = HashMap::new();
        for ((recipient_process, _), link_provider) in tech_index.links() {
            let provider_col = match tech_index.of(link_provider) {
                Some(c) => c,
                None => continue,
            };
            for &recipient_col in tech_index.providers_of(*recipient_process) {
                provider_edges
                    .entry(recipient_col)
                    .or_default()
                    .push(provider_col);
            }
        }

        // 3. expand from the reference, bounded by cutoff and size
        let mut included: Vec<usize> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(0);
        seen.insert(0);
        while let Some(col) = queue.pop_front() {
            included.push(col);
            if included.len() >= self.max_nodes {
                break;
            }
            if let Some(providers) = provider_edges.get(&col) {
                for &p in providers {
                    if seen.contains(&p) {
                        continue;
                    }
                    if share(values[p].1).abs() < self.min_share {
                        continue;
                    }
                    seen.insert(p);
                    queue.push_back(p);
                }
            }
        }

        let nodes: Vec<SankeyNode> = included
            .iter()
            .map(|&col| SankeyNode {
                index: col,
                product: tech_index.at(col),
                direct: values[col].0,
                total: values[col].1,
                share: share(values[col].1),
            })
            .collect();
        let node_set: HashSet<usize> = included.iter().copied().collect();
        let mut edges = Vec::new();
        for (&recipient, providers) in &provider_edges {
            if !node_set.contains(&recipient) {
                continue;
            }
            for &p in providers {
                if node_set.contains(&p) {
                    edges.push((p, recipient));
                }
            }
        }

        let node_count = nodes.len();
        Sankey {
            nodes,
            edges,
            node_count,
        }
    }

    /// `(direct, total)` of one column for the reference flow/impact.
    fn values_of(&self, col: usize) -> (f64, f64) {
        let provider = self.result.provider();
        match self.reference {
            SankeyRef::Flow(flow) => {
                let index = match provider.flow_index() {
                    Some(i) => i,
                    None => return (0.0, 0.0),
                };
                let row = match index.of_ref(&flow) {
                    Some(r) => r,
                    None => return (0.0, 0.0),
                };
                let row_flow = index.at(row);
                let direct = adopt(&row_flow, provider.direct_flow_of(row, col));
                let total = adopt(&row_flow, provider.total_flow_of(row, col));
                (direct, total)
            }
            SankeyRef::Impact(category_id) => {
                let row = match provider
                    .impact_index()
                    .and_then(|i| i.position_of(category_id))
                {
                    Some(r) => r,
                    None => return (0.0, 0.0),
                };
                let direct = provider.direct_impact_of(row, col);
                let total = provider
                    .total_impacts_of(col)
                    .get(row)
                    .copied()
                    .unwrap_or(0.0);
                (direct, total)
            }
        }
    }
}
