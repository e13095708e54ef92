//! clusterfit-model: mixed-integer formulation of the allocation problem.
//!
//! This crate turns a validated [`clusterfit_core::Scenario`] into a
//! backend-neutral [`MilpModel`]. It does NOT solve anything (that's
//! `clusterfit-solver`). The mode decides which placements are free; the
//! formulation is shared.
//!
//! # Components
//!
//! - **`linear`**: Variables, linear sums, constraints
//! - **`layout`**: Where each placement variable lives
//! - **`builder`**: Constraints and objective for a mode and margin

pub mod builder;
pub mod layout;
pub mod linear;

pub use builder::{AllocationModel, ModelBuilder};
pub use layout::VariableLayout;
pub use linear::{
    ConstraintKind, LinearConstraint, LinearSum, MilpModel, ModelStats, Sense, Term, VarId, VarKind,
};
