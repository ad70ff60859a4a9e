// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// ParameterTable: parameter definitions, redefinitions, resampling

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::formulas::FormulaInterpreter;
use crate::uncertainty::Uncertainty;

/// A persisted parameter. `context` is the owning process or impact
/// category; `None` marks a global parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    #[serde(default)]
    pub context: Option<u64>,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub uncertainty: Option<Uncertainty>,
}

/// A parameter redefinition of a calculation setup. Redefinitions win
/// over the persisted definition of the same `(name, context)` pair and
/// drop its formula.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterRedef {
    pub name: String,
    #[serde(default)]
    pub context: Option<u64>,
    pub value: f64,
    #[serde(default)]
    pub uncertainty: Option<Uncertainty>,
}

#[derive(Clone, Debug)]
struct ParameterCell {
    name: String,
    context: Option<u64>,
    value: f64,
    formula: Option<String>,
    uncertainty: Option<Uncertainty>,
}

/// The resolved parameters of one calculation. Built once per setup;
/// `interpreter()` yields the deterministic view, `simulate(rng)` a
/// per-iteration view with every uncertain parameter resampled.
#[derive(Clone, Debug, Default)]
pub struct ParameterTable {
    cells: Vec<ParameterCell>,
}

impl ParameterTable {
    pub fn build(defs: Vec<ParameterDef>, redefs: &[ParameterRedef]) -> ParameterTable {
        let mut cells: Vec<ParameterCell> = defs
            .into_iter()
            .map(|d| ParameterCell {
                name: d.name.to_lowercase(),
                context: d.context,
                value: d.value,
                formula: d.formula,
                uncertainty: d.uncertainty,
            })
            .collect();
        for redef in redefs {
            let name = redef.name.to_lowercase();
            match cells
                .iter_mut()
                .find(|c| c.name == name && c.context == redef.context)
            {
                Some(cell) => {
                    cell.value = redef.value;
                    cell.formula = None;
                    cell.uncertainty = redef.uncertainty;
                }
                None => cells.push(ParameterCell {
                    name,
                    context: redef.context,
                    value: redef.value,
                    formula: None,
                    uncertainty: redef.uncertainty,
                }),
            }
        }
        ParameterTable { cells }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Deterministic interpreter: literals bound as values, formulas
    /// bound as formulas (resolved lazily on evaluation).
    pub fn interpreter(&self) -> FormulaInterpreter {
        let mut fi = FormulaInterpreter::new();
        for cell in &self.cells {
            let scope = match cell.context {
                Some(ctx) => fi.local_mut(ctx),
                None => fi.global_mut(),
            };
            match &cell.formula {
                Some(formula) => scope.bind_formula(&cell.name, formula),
                None => scope.bind(&cell.name, cell.value),
            }
        }
        fi
    }

    /// Simulation interpreter: every parameter that carries an
    /// uncertainty is resampled to a literal, everything else behaves
    /// like `interpreter()`.
    pub fn simulate<R: Rng>(&self, rng: &mut R) -> FormulaInterpreter {
        let mut fi = FormulaInterpreter::new();
        for cell in &self.cells {
            let sampled = cell.uncertainty.as_ref().map(|u| u.sample(rng));
            let scope = match cell.context {
                Some(ctx) => fi.local_mut(ctx),
                None => fi.global_mut(),
            };
            match (sampled, &cell.formula) {
                (Some(v), _) => scope.bind(&cell.name, v),
                (None, Some(formula)) => scope.bind_formula(&cell.name, formula),
                (None, None) => scope.bind(&cell.name, cell.value),
            }
        }
        fi
    }
}
