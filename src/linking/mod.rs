// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//! Product System Linking
//!
//! Expands a product system into a `TechIndex`: breadth-first link
//! resolution over the process graph, choosing the best provider for
//! every unlinked product input and waste output under a configurable
//! policy.

pub mod provider_search;
pub mod tech_index_builder;

pub use provider_search::{LinkingCallback, LinkingConfig, ProviderLinking, ProviderSearch};
pub use tech_index_builder::TechIndexBuilder;
