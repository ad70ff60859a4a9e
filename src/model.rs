// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// Data model: flows, exchanges, product systems, impact methods, DQ systems

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::uncertainty::Uncertainty;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowType {
    Product,
    Waste,
    Elementary,
}

impl FlowType {
    pub fn from_str(s: &str) -> FlowType {
        match s.to_lowercase().as_str() {
            "product" | "product_flow" => FlowType::Product,
            "waste" | "waste_flow" => FlowType::Waste,
            _ => FlowType::Elementary,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    UnitProcess,
    LciResult,
    /// A product system linked as a provider (sub-system).
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationMethod {
    None,
    Physical,
    Economic,
    Causal,
}

impl Default for AllocationMethod {
    fn default() -> Self {
        AllocationMethod::None
    }
}

/// Identity of a flow in the intervention (flow) index. Equality includes
/// the location when the index is regionalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowRef {
    pub flow_id: u64,
    pub flow_type: FlowType,
    pub is_input: bool,
    pub location_id: Option<u64>,
}

impl FlowRef {
    pub fn input_of(flow_id: u64) -> FlowRef {
        FlowRef {
            flow_id,
            flow_type: FlowType::Elementary,
            is_input: true,
            location_id: None,
        }
    }

    pub fn output_of(flow_id: u64) -> FlowRef {
        FlowRef {
            flow_id,
            flow_type: FlowType::Elementary,
            is_input: false,
            location_id: None,
        }
    }

    pub fn at_location(mut self, location_id: u64) -> FlowRef {
        self.location_id = Some(location_id);
        self
    }
}

/// An author-declared edge of a product system: the exchange
/// `exchange_id` of process `process_id` is satisfied by `provider_id`.
/// `is_system_link` marks providers that are product systems themselves.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProcessLink {
    pub process_id: u64,
    pub provider_id: u64,
    pub flow_id: u64,
    pub exchange_id: u64,
    #[serde(default)]
    pub is_system_link: bool,
}

/// A ready-to-assemble exchange record. `amount` is the literal value;
/// when `formula` is present the interpreter result wins. Costs follow
/// the same literal/formula pattern.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalcExchange {
    pub owner_process_id: u64,
    pub exchange_id: u64,
    pub flow_id: u64,
    pub flow_type: FlowType,
    #[serde(default)]
    pub is_input: bool,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub default_provider_id: u64,
    #[serde(default)]
    pub location_id: Option<u64>,
    #[serde(default)]
    pub uncertainty: Option<Uncertainty>,
    #[serde(default)]
    pub cost_value: Option<f64>,
    #[serde(default)]
    pub cost_formula: Option<String>,
    #[serde(default)]
    pub dq_entry: Option<String>,
}

impl CalcExchange {
    /// True for exchanges that can carry a provider link: product inputs
    /// and waste outputs.
    pub fn is_linkable(&self) -> bool {
        match self.flow_type {
            FlowType::Elementary => false,
            FlowType::Product => self.is_input,
            FlowType::Waste => !self.is_input,
        }
    }

    /// True for the possible quantitative reference forms: product
    /// outputs and waste inputs (treatment).
    pub fn is_provider_flow(&self) -> bool {
        match self.flow_type {
            FlowType::Elementary => false,
            FlowType::Product => !self.is_input,
            FlowType::Waste => self.is_input,
        }
    }
}

/// Persisted description of a product system.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductSystemData {
    pub id: u64,
    pub reference_process_id: u64,
    pub reference_flow_id: u64,
    /// Magnitude of the final demand for the reference flow.
    #[serde(default = "default_amount")]
    pub target_amount: f64,
    #[serde(default)]
    pub process_links: Vec<ProcessLink>,
    #[serde(default)]
    pub parameter_redefs: Vec<crate::parameters::ParameterRedef>,
}

fn default_amount() -> f64 {
    1.0
}

impl ProductSystemData {
    pub fn reference(&self) -> crate::matrices::ProcessProduct {
        crate::matrices::ProcessProduct::of(self.reference_process_id, self.reference_flow_id)
    }

    pub fn has_system_links(&self) -> bool {
        self.process_links.iter().any(|l| l.is_system_link)
    }
}

/// A single characterization factor. A factor with a location id only
/// applies to the flow at that location and takes precedence over the
/// location-less factor for the same flow.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ImpactFactor {
    pub flow_id: u64,
    pub factor: f64,
    #[serde(default)]
    pub location_id: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImpactCategoryData {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub factors: Vec<ImpactFactor>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImpactMethodData {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub categories: Vec<ImpactCategoryData>,
}

// ============================================================================
// DATA QUALITY SYSTEMS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DQIndicator {
    pub position: u32,
    #[serde(default)]
    pub name: Option<String>,
    /// Number of ordinal scores 1..=score_count of this indicator.
    pub score_count: u32,
}

/// An ordered data-quality system. Persisted entries have the shape
/// `"(v1;v2;...;vk)"` with `v_i` in `[0, score_count]` and `0` meaning
/// not available.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DQSystem {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub indicators: Vec<DQIndicator>,
}

impl DQSystem {
    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    /// The score range of the system (maximum over the indicators).
    pub fn score_count(&self) -> u32 {
        self.indicators
            .iter()
            .map(|i| i.score_count)
            .max()
            .unwrap_or(0)
    }

    /// Parse a persisted entry into one value per indicator. Whitespace
    /// is trimmed, missing trailing indicators are padded with 0 (NA),
    /// values above the score range are clamped.
    pub fn to_values(&self, entry: &str) -> CoreResult<Vec<u8>> {
        let trimmed = entry.trim();
        if !trimmed.starts_with('(') || !trimmed.ends_with(')') {
            return Err(CoreError::InvalidDqEntry(entry.to_string()));
        }
        let inner = &trimmed[1..trimmed.len() - 1];
        let max = self.score_count() as u8;
        let mut values = vec![0u8; self.indicator_count()];
        if inner.trim().is_empty() {
            return Ok(values);
        }
        for (i, part) in inner.split(';').enumerate() {
            if i >= values.len() {
                break;
            }
            let part = part.trim();
            if part.is_empty() || part.eq_ignore_ascii_case("n.a.") {
                continue;
            }
            let v: u8 = part
                .parse()
                .map_err(|_| CoreError::InvalidDqEntry(entry.to_string()))?;
            values[i] = v.min(max);
        }
        Ok(values)
    }

    /// Inverse of `to_values` for in-range vectors.
    pub fn format_entry(values: &[u8]) -> String {
        let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        format!("({})", parts.join(";"))
    }
}
