// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// Core Calculation Profile
//

pub mod calculation_kernel;
pub mod db;
pub mod error;
pub mod formulas;
pub mod linking;
pub mod matrices;
pub mod math;
pub mod model;
pub mod parameters;
pub mod results;
pub mod uncertainty;

#[cfg(test)]
pub mod tests_calc;

// Re-export core types
pub use calculation_kernel::{CalculationKernel, CalculationSetup};
pub use db::{DataProvider, InMemoryDb};
pub use error::{CancelToken, CoreError, CoreResult};
pub use linking::{LinkingConfig, ProviderLinking};
pub use matrices::{FlowIndex, ImpactIndex, Matrix, MatrixData, ProcessProduct, TechIndex};
pub use math::{DenseSolver, LcaCalculator, MatrixSolver, Simulator};
pub use results::{ContributionResult, DQResult, Sankey, SimpleResult, SimulationResult};
pub use uncertainty::Uncertainty;
