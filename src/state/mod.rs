//! Reconciliation state machines
//!
//! - Convergence: SUBMITTED → PENDING → {ACTIVE | TIMEOUT}
//! - Recreate: DELETING → SETTLING → RECREATING → DONE

mod convergence;
mod recreate;

pub use convergence::{ConvergenceError, ConvergenceState, ConvergenceTracker};
pub use recreate::{RecreatePhase, RecreateTracker};

/// Check if a state is terminal (no further transitions possible)
pub trait TerminalState {
    fn is_terminal(&self) -> bool;
}
