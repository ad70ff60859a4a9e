// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// ProviderSearch: best-provider decision under a linking policy

use serde::{Deserialize, Serialize};

use crate::db::DataProvider;
use crate::matrices::ProcessProduct;
use crate::model::{CalcExchange, ProcessType};

/// How default providers participate in linking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderLinking {
    /// Default providers are ignored.
    Ignore,
    /// A matching default provider wins, other candidates are fallback.
    PreferDefaults,
    /// Only default providers are linked at all.
    OnlyDefaults,
}

/// Optional caller capability: narrow the candidate set of an exchange
/// or cancel the search.
pub trait LinkingCallback {
    fn cancel(&self) -> bool {
        false
    }

    /// Reduce the candidate set; returning an empty set leaves the
    /// exchange unlinked.
    fn select(&self, exchange: &CalcExchange, candidates: Vec<ProcessProduct>)
        -> Vec<ProcessProduct>;
}

#[derive(Serialize, Deserialize)]
pub struct LinkingConfig {
    pub provider_linking: ProviderLinking,
    pub preferred_type: ProcessType,
    #[serde(skip)]
    pub callback: Option<Box<dyn LinkingCallback>>,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        LinkingConfig {
            provider_linking: ProviderLinking::PreferDefaults,
            preferred_type: ProcessType::UnitProcess,
            callback: None,
        }
    }
}

impl std::fmt::Debug for LinkingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkingConfig")
            .field("provider_linking", &self.provider_linking)
            .field("preferred_type", &self.preferred_type)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Searches the best provider for a product input or waste output.
pub struct ProviderSearch<'a> {
    db: &'a dyn DataProvider,
    config: &'a LinkingConfig,
}

impl<'a> ProviderSearch<'a> {
    pub fn new(db: &'a dyn DataProvider, config: &'a LinkingConfig) -> ProviderSearch<'a> {
        ProviderSearch { db, config }
    }

    /// Find the best provider for the given exchange under the
    /// configured policy. Ordered decisions:
    ///
    /// 1. cancelled via callback -> none
    /// 2. no candidates -> none
    /// 3. a candidate matching the default provider wins immediately
    ///    (unless defaults are ignored)
    /// 4. only-defaults without a default match -> none
    /// 5. a single candidate wins
    /// 6. the callback may narrow the set
    /// 7. tie-break by preferred process type, else first by index
    pub fn find(&self, exchange: &CalcExchange) -> Option<ProcessProduct> {
        if self.cancelled() {
            return None;
        }
        let mut candidates = self.db.load_providers(exchange.flow_id);
        if candidates.is_empty() {
            return None;
        }

        // a default provider wins before any callback is asked; the
        // callback is only for genuinely open choices
        if self.config.provider_linking != ProviderLinking::Ignore {
            if let Some(default) = candidates
                .iter()
                .find(|p| p.process_id == exchange.default_provider_id)
            {
                return Some(*default);
            }
            if self.config.provider_linking == ProviderLinking::OnlyDefaults {
                return None;
            }
        }

        if candidates.len() == 1 {
            return Some(candidates[0]);
        }
        if let Some(callback) = &self.config.callback {
            candidates = callback.select(exchange, candidates);
            if candidates.is_empty() {
                return None;
            }
            if candidates.len() == 1 {
                return Some(candidates[0]);
            }
        }

        candidates
            .iter()
            .find(|p| self.db.load_process_type(p.process_id) == self.config.preferred_type)
            .copied()
            .or_else(|| candidates.first().copied())
    }

    /// From the given exchanges, those that could be linked to a
    /// provider: product inputs and waste outputs; under only-defaults
    /// linking additionally a non-zero default provider.
    pub fn link_candidates<'e>(&self, exchanges: &'e [CalcExchange]) -> Vec<&'e CalcExchange> {
        if self.cancelled() {
            return Vec::new();
        }
        exchanges
            .iter()
            .filter(|e| {
                if self.config.provider_linking == ProviderLinking::OnlyDefaults
                    && e.default_provider_id == 0
                {
                    return false;
                }
                e.is_linkable()
            })
            .collect()
    }

    pub fn provider(&self, process_id: u64, flow_id: u64) -> Option<ProcessProduct> {
        self.db.load_provider(process_id, flow_id)
    }

    fn cancelled(&self) -> bool {
        self.config
            .callback
            .as_ref()
            .map(|c| c.cancel())
            .unwrap_or(false)
    }
}
