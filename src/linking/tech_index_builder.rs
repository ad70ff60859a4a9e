// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// TechIndexBuilder: breadth-first link closure over the process graph

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::db::DataProvider;
use crate::error::{CancelToken, CoreResult};
use crate::linking::provider_search::{LinkingConfig, ProviderSearch};
use crate::matrices::{ProcessProduct, TechIndex};
use crate::model::{CalcExchange, ProductSystemData};

/// Expands a product system into a tech index by breadth-first link
/// resolution. Cycles in the process graph are handled by the visited
/// set; the resulting order is BFS order with the reference product at
/// position 0.
pub struct TechIndexBuilder<'a> {
    db: &'a dyn DataProvider,
    search: ProviderSearch<'a>,
    system: Option<&'a ProductSystemData>,
    cancel: CancelToken,
}

impl<'a> TechIndexBuilder<'a> {
    pub fn new(
        db: &'a dyn DataProvider,
        config: &'a LinkingConfig,
        system: Option<&'a ProductSystemData>,
    ) -> TechIndexBuilder<'a> {
        TechIndexBuilder {
            db,
            search: ProviderSearch::new(db, config),
            system,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(&self, ref_product: ProcessProduct, demand: f64) -> CoreResult<TechIndex> {
        trace!(
            process = ref_product.process_id,
            flow = ref_product.flow_id,
            "build tech index"
        );
        let mut index = TechIndex::new(ref_product);
        index.set_demand(demand);
        self.add_system_links(&mut index);

        let mut block = vec![ref_product];
        let mut handled: HashSet<ProcessProduct> = HashSet::new();
        while !block.is_empty() {
            self.cancel.check()?;
            trace!(entries = block.len(), "fetch next block");
            let exchanges = self.fetch_exchanges(&block);
            let mut next_block: Vec<ProcessProduct> = Vec::new();
            for recipient in &block {
                handled.insert(*recipient);
                let all = match exchanges.get(&recipient.process_id) {
                    Some(list) => list.as_slice(),
                    None => continue,
                };
                for link_exchange in self.search.link_candidates(all) {
                    // an author-declared link always wins over the search
                    let linked = index
                        .linked_provider(recipient.process_id, link_exchange.exchange_id);
                    let provider = match linked.or_else(|| self.search.find(link_exchange)) {
                        Some(p) => p,
                        // policy-incomplete: the exchange stays unlinked
                        None => continue,
                    };
                    index.put_link(recipient.process_id, link_exchange.exchange_id, provider);
                    if !handled.contains(&provider) && !next_block.contains(&provider) {
                        next_block.push(provider);
                    }
                }
            }
            block = next_block;
        }
        Ok(index)
    }

    /// Insert the author-declared edges of the product system before
    /// the search runs; explicit links always win.
    fn add_system_links(&self, index: &mut TechIndex) {
        let system = match self.system {
            Some(s) => s,
            None => return,
        };
        for link in &system.process_links {
            let provider = match self.search.provider(link.provider_id, link.flow_id) {
                Some(p) => p,
                None => continue,
            };
            index.put_link(link.process_id, link.exchange_id, provider);
        }
    }

    fn fetch_exchanges(&self, block: &[ProcessProduct]) -> HashMap<u64, Vec<CalcExchange>> {
        let ids: HashSet<u64> = block.iter().map(|p| p.process_id).collect();
        self.db.load_exchanges(&ids)
    }
}
