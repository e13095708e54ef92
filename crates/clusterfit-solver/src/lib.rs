//! clusterfit-solver: solving allocation models and reading them back.
//!
//! Takes an [`AllocationModel`](clusterfit_model::AllocationModel) from
//! `clusterfit-model`, hands it to an integer-programming [`Backend`], and
//! turns the answer into an [`Allocation`].
//!
//! # Architecture
//!
//! ```text
//! allocate / sweep_margins / compare_modes
//!   ├── ModelBuilder      (clusterfit-model)
//!   ├── SolveDriver       (limits, status classification)
//!   │     └── Backend     (good_lp + microlp on a worker thread)
//!   └── interpret         (per-job / per-node placements, cost split)
//! ```

pub mod backend;
pub mod driver;
pub mod error;
pub mod interpret;
pub mod report;
pub mod runner;

pub use backend::{Backend, BackendOutcome, GoodLpBackend, Incumbent};
pub use driver::{SolveDriver, SolveLimits, SolveOutcome, SolveStatus, SolvedModel};
pub use error::{SolveError, SolveResult};
pub use interpret::{
    Allocation, CostBreakdown, JobPlacement, NodePlacement, PlacementReport, interpret,
};
pub use runner::{ModeComparison, SweepPoint, SweepReport, allocate, compare_modes, sweep_margins};
