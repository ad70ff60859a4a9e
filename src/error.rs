// SPDX-FileCopyrightText: 2026 Santhosh Shyamsundar, Prabhu S., and Studio Tyto
// SPDX-License-Identifier: MIT
//
// ULCA — Unified Life-Cycle Assessment Core
// CoreError: calculation error taxonomy + cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors of the calculation core.
///
/// Structural and numerical kinds abort a calculation; parse and
/// evaluation kinds are recoverable at the component that raised them
/// (the caller degrades to a safe default and records a diagnostic).
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// The technology matrix could not be factorized or produced a
    /// non-finite result.
    #[error("singular technology matrix: {0}")]
    SingularMatrix(String),

    /// The sub-system relations of a product system contain a cycle.
    #[error("there are sub-system cycles in the product system")]
    CyclicSubsystems,

    /// A required provider could not be resolved.
    #[error("missing provider for flow {flow_id} of process {process_id}")]
    MissingProvider { process_id: u64, flow_id: u64 },

    /// A persisted data-quality entry could not be parsed.
    #[error("invalid data quality entry: {0}")]
    InvalidDqEntry(String),

    /// A parameter formula could not be evaluated.
    #[error("formula evaluation failed: {formula}: {reason}")]
    FormulaEval { formula: String, reason: String },

    /// A flow (or flow-location pair) is not part of the flow index.
    #[error("unknown flow {flow_id} (location {location_id:?})")]
    UnknownFlow {
        flow_id: u64,
        location_id: Option<u64>,
    },

    /// The cancellation flag was set.
    #[error("calculation cancelled")]
    Cancelled,
}

impl CoreError {
    /// Stable code for external boundaries.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::SingularMatrix(_) => "SINGULAR_MATRIX",
            CoreError::CyclicSubsystems => "CYCLIC_SUBSYSTEMS",
            CoreError::MissingProvider { .. } => "MISSING_PROVIDER",
            CoreError::InvalidDqEntry(_) => "INVALID_DQ_ENTRY",
            CoreError::FormulaEval { .. } => "FORMULA_EVAL_FAILED",
            CoreError::UnknownFlow { .. } => "UNKNOWN_FLOW",
            CoreError::Cancelled => "CANCELLED",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Cooperative cancellation flag, polled at block boundaries (between
/// tech-index BFS blocks, between simulation iterations and sub-system
/// solves). Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Short-circuit helper for poll points.
    pub fn check(&self) -> CoreResult<()> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}
