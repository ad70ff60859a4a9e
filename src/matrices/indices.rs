// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// Index types: TechIndex, FlowIndex, ImpactIndex

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{FlowRef, ImpactCategoryData};

/// The `(process, reference flow)` pair that is one column of the
/// technology matrix. A product system linked as a sub-system appears
/// with the system id as process id and its reference flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessProduct {
    pub process_id: u64,
    pub flow_id: u64,
}

impl ProcessProduct {
    pub fn of(process_id: u64, flow_id: u64) -> ProcessProduct {
        ProcessProduct {
            process_id,
            flow_id,
        }
    }
}

/// Ordered list of process-product pairs plus the provider links of the
/// product system. The reference product is at position 0 by
/// construction; every provider that occurs as a link target is also an
/// index entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TechIndex {
    products: Vec<ProcessProduct>,
    positions: HashMap<ProcessProduct, usize>,
    by_process: HashMap<u64, Vec<usize>>,
    /// `(recipient process, exchange id) -> provider`
    links: HashMap<(u64, u64), ProcessProduct>,
    demand: f64,
}

impl TechIndex {
    pub fn new(ref_product: ProcessProduct) -> TechIndex {
        let mut index = TechIndex {
            products: Vec::new(),
            positions: HashMap::new(),
            by_process: HashMap::new(),
            links: HashMap::new(),
            demand: 1.0,
        };
        index.add(ref_product);
        index
    }

    /// Add a provider; returns its (possibly existing) position.
    pub fn add(&mut self, product: ProcessProduct) -> usize {
        if let Some(&pos) = self.positions.get(&product) {
            return pos;
        }
        let pos = self.products.len();
        self.products.push(product);
        self.positions.insert(product, pos);
        self.by_process
            .entry(product.process_id)
            .or_default()
            .push(pos);
        pos
    }

    pub fn size(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn at(&self, pos: usize) -> ProcessProduct {
        self.products[pos]
    }

    pub fn of(&self, product: &ProcessProduct) -> Option<usize> {
        self.positions.get(product).copied()
    }

    pub fn contains(&self, product: &ProcessProduct) -> bool {
        self.positions.contains_key(product)
    }

    /// The reference product (position 0).
    pub fn ref_product(&self) -> ProcessProduct {
        self.products[0]
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn set_demand(&mut self, demand: f64) {
        self.demand = demand;
    }

    /// Record that `provider` satisfies the exchange
    /// `(recipient process, exchange id)`. The provider is indexed if it
    /// is not yet.
    pub fn put_link(&mut self, recipient_process: u64, exchange_id: u64, provider: ProcessProduct) {
        self.add(provider);
        self.links
            .insert((recipient_process, exchange_id), provider);
    }

    pub fn linked_provider(
        &self,
        recipient_process: u64,
        exchange_id: u64,
    ) -> Option<ProcessProduct> {
        self.links.get(&(recipient_process, exchange_id)).copied()
    }

    pub fn links(&self) -> &HashMap<(u64, u64), ProcessProduct> {
        &self.links
    }

    /// Positions of all products provided by the given process
    /// (multi-output processes have several).
    pub fn providers_of(&self, process_id: u64) -> &[usize] {
        self.by_process
            .get(&process_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn each<F: FnMut(usize, ProcessProduct)>(&self, mut f: F) {
        for (i, p) in self.products.iter().enumerate() {
            f(i, *p);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessProduct> {
        self.products.iter()
    }
}

/// Row index of the intervention matrix. Lookup is either by flow id or
/// by `(flow id, location id)`; the two modes are mutually exclusive
/// for a given index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowIndex {
    flows: Vec<FlowRef>,
    by_flow: HashMap<u64, usize>,
    by_flow_location: HashMap<(u64, u64), usize>,
    regionalized: bool,
}

impl FlowIndex {
    pub fn create() -> FlowIndex {
        FlowIndex {
            flows: Vec::new(),
            by_flow: HashMap::new(),
            by_flow_location: HashMap::new(),
            regionalized: false,
        }
    }

    pub fn create_regionalized() -> FlowIndex {
        let mut index = FlowIndex::create();
        index.regionalized = true;
        index
    }

    pub fn is_regionalized(&self) -> bool {
        self.regionalized
    }

    pub fn size(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn at(&self, row: usize) -> FlowRef {
        self.flows[row]
    }

    /// Add a flow if absent; returns its row.
    pub fn register(&mut self, flow: FlowRef) -> usize {
        if let Some(row) = self.of(flow.flow_id, flow.location_id) {
            return row;
        }
        let row = self.flows.len();
        self.flows.push(flow);
        if self.regionalized {
            self.by_flow_location
                .insert((flow.flow_id, flow.location_id.unwrap_or(0)), row);
        } else {
            self.by_flow.insert(flow.flow_id, row);
        }
        row
    }

    pub fn of(&self, flow_id: u64, location_id: Option<u64>) -> Option<usize> {
        if self.regionalized {
            self.by_flow_location
                .get(&(flow_id, location_id.unwrap_or(0)))
                .copied()
        } else {
            self.by_flow.get(&flow_id).copied()
        }
    }

    pub fn of_ref(&self, flow: &FlowRef) -> Option<usize> {
        self.of(flow.flow_id, flow.location_id)
    }

    pub fn each<F: FnMut(usize, FlowRef)>(&self, mut f: F) {
        for (i, flow) in self.flows.iter().enumerate() {
            f(i, *flow);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlowRef> {
        self.flows.iter()
    }
}

/// Row index of the characterization matrix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImpactIndex {
    categories: Vec<ImpactCategoryData>,
    by_id: HashMap<u64, usize>,
}

impl ImpactIndex {
    pub fn of(categories: Vec<ImpactCategoryData>) -> ImpactIndex {
        let by_id = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        ImpactIndex { categories, by_id }
    }

    pub fn size(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn at(&self, row: usize) -> &ImpactCategoryData {
        &self.categories[row]
    }

    pub fn position_of(&self, category_id: u64) -> Option<usize> {
        self.by_id.get(&category_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImpactCategoryData> {
        self.categories.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowType;

    #[test]
    fn test_reference_product_is_position_zero() {
        let mut index = TechIndex::new(ProcessProduct::of(1, 10));
        index.add(ProcessProduct::of(2, 20));
        index.add(ProcessProduct::of(2, 21));
        assert_eq!(index.of(&ProcessProduct::of(1, 10)), Some(0));
        assert_eq!(index.ref_product(), ProcessProduct::of(1, 10));
        assert_eq!(index.size(), 3);
        assert_eq!(index.providers_of(2), &[1, 2]);
    }

    #[test]
    fn test_put_link_indexes_the_provider() {
        let mut index = TechIndex::new(ProcessProduct::of(1, 10));
        let provider = ProcessProduct::of(5, 50);
        index.put_link(1, 99, provider);
        // invariant: every link target is an index entry
        assert!(index.contains(&provider));
        assert_eq!(index.linked_provider(1, 99), Some(provider));
        assert_eq!(index.linked_provider(1, 98), None);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut index = TechIndex::new(ProcessProduct::of(1, 10));
        let a = index.add(ProcessProduct::of(2, 20));
        let b = index.add(ProcessProduct::of(2, 20));
        assert_eq!(a, b);
        assert_eq!(index.size(), 2);
    }

    #[test]
    fn test_plain_flow_index() {
        let mut index = FlowIndex::create();
        let row = index.register(FlowRef::input_of(7));
        assert_eq!(index.register(FlowRef::input_of(7)), row);
        assert_eq!(index.of(7, None), Some(row));
        // plain mode ignores the location on lookup
        assert_eq!(index.of(7, Some(3)), Some(row));
    }

    #[test]
    fn test_regionalized_flow_index() {
        let mut index = FlowIndex::create_regionalized();
        let de = index.register(FlowRef {
            flow_id: 7,
            flow_type: FlowType::Elementary,
            is_input: false,
            location_id: Some(1),
        });
        let fr = index.register(FlowRef {
            flow_id: 7,
            flow_type: FlowType::Elementary,
            is_input: false,
            location_id: Some(2),
        });
        assert_ne!(de, fr);
        assert_eq!(index.of(7, Some(1)), Some(de));
        assert_eq!(index.of(7, Some(2)), Some(fr));
        assert_eq!(index.of(7, Some(3)), None);
    }
}
