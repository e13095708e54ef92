//! Solve driver: submits a model and normalizes what comes back.
//!
//! Backends report heterogeneous results (proven optimum, incumbent at
//! timeout, infeasible, error). The driver folds them into four statuses and
//! drops assignments for anything that is not an accepted solution.

use std::time::{Duration, Instant};

use clusterfit_core::{ConfigError, Margin, Mode, SolveSettings};
use clusterfit_model::{AllocationModel, VariableLayout};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendOutcome, GoodLpBackend, Incumbent};
use crate::error::SolveResult;

/// Relative gap below which an incumbent counts as proven optimal.
const OPTIMALITY_EPS: f64 = 1e-9;

/// Resource limits for one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveLimits {
    pub time_limit: Duration,
    /// Relative optimality gap accepted as a near-optimal solution.
    pub mip_gap: f64,
}

impl SolveLimits {
    pub fn new(time_limit: Duration, mip_gap: f64) -> SolveResult<Self> {
        if time_limit.is_zero() {
            return Err(ConfigError::ZeroTimeLimit.into());
        }
        if !(mip_gap.is_finite() && mip_gap >= 0.0) {
            return Err(ConfigError::InvalidMipGap(mip_gap).into());
        }
        Ok(Self {
            time_limit,
            mip_gap,
        })
    }

    /// Limits for `mode` from configured settings.
    pub fn from_settings(settings: &SolveSettings, mode: Mode) -> SolveResult<Self> {
        Self::new(settings.time_limit()?, settings.mip_gap_for(mode)?)
    }
}

impl Default for SolveLimits {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(clusterfit_core::config::DEFAULT_TIME_LIMIT_SECS),
            mip_gap: Mode::Joint.default_mip_gap(),
        }
    }
}

/// Normalized solve status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    /// Accepted within the configured gap; comparisons near the tolerance
    /// may be misleading.
    OptimalWithGap,
    /// No placement satisfies the constraints.
    Infeasible,
    /// Timeout without an acceptable incumbent, or a backend failure.
    Unknown,
}

impl SolveStatus {
    pub fn is_success(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::OptimalWithGap)
    }

    pub fn label(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::OptimalWithGap => "OPTIMAL (WITHIN GAP)",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Classified backend result.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Present only for `Optimal` and `OptimalWithGap`.
    pub incumbent: Option<Incumbent>,
    pub gap: Option<f64>,
    pub diagnostic: Option<String>,
    pub elapsed: Duration,
}

/// What the result interpreter consumes.
#[derive(Debug, Clone)]
pub struct SolvedModel {
    pub mode: Mode,
    pub margin: Margin,
    pub layout: VariableLayout,
    pub outcome: SolveOutcome,
}

/// Relative gap between an incumbent objective and the proven bound.
pub fn relative_gap(objective: f64, best_bound: f64) -> f64 {
    let diff = (objective - best_bound).abs();
    if diff <= f64::EPSILON {
        0.0
    } else {
        diff / objective.abs().max(1e-10)
    }
}

/// Fold a raw backend outcome into a [`SolveOutcome`].
///
/// `expected_values` is the model's variable count; an incumbent of any
/// other length is treated as garbage.
pub fn classify(
    outcome: BackendOutcome,
    expected_values: usize,
    mip_gap: f64,
    elapsed: Duration,
) -> SolveOutcome {
    let unknown = |diagnostic: String| SolveOutcome {
        status: SolveStatus::Unknown,
        incumbent: None,
        gap: None,
        diagnostic: Some(diagnostic),
        elapsed,
    };

    let (incumbent, timed_out) = match outcome {
        BackendOutcome::Solved(incumbent) => (incumbent, false),
        BackendOutcome::TimedOut(Some(incumbent)) => (incumbent, true),
        BackendOutcome::TimedOut(None) => {
            return unknown("time budget exhausted without an incumbent".to_string());
        }
        BackendOutcome::Infeasible => {
            return SolveOutcome {
                status: SolveStatus::Infeasible,
                incumbent: None,
                gap: None,
                diagnostic: None,
                elapsed,
            };
        }
        BackendOutcome::Failed(message) => return unknown(message),
    };

    if incumbent.values.len() != expected_values {
        return unknown(format!(
            "backend returned {} values for {} variables",
            incumbent.values.len(),
            expected_values
        ));
    }
    if !incumbent.objective.is_finite() || incumbent.values.iter().any(|v| !v.is_finite()) {
        return unknown("backend returned non-finite values".to_string());
    }

    let gap = relative_gap(incumbent.objective, incumbent.best_bound);
    let status = if gap <= OPTIMALITY_EPS {
        SolveStatus::Optimal
    } else if gap <= mip_gap + OPTIMALITY_EPS {
        SolveStatus::OptimalWithGap
    } else {
        let reason = if timed_out { "time budget exhausted; " } else { "" };
        return unknown(format!(
            "{reason}incumbent gap {gap:.4} exceeds tolerance {mip_gap:.4}"
        ));
    };

    SolveOutcome {
        status,
        incumbent: Some(incumbent),
        gap: Some(gap),
        diagnostic: None,
        elapsed,
    }
}

/// Submits models to a backend under fixed limits.
pub struct SolveDriver<B = GoodLpBackend> {
    backend: B,
    limits: SolveLimits,
}

impl<B: Backend> SolveDriver<B> {
    pub fn new(backend: B, limits: SolveLimits) -> Self {
        Self { backend, limits }
    }

    /// Solve `model`, blocking until the backend answers or the budget runs out.
    pub fn solve(&self, model: AllocationModel) -> SolvedModel {
        let AllocationModel {
            mode,
            margin,
            milp,
            layout,
            trivially_infeasible,
        } = model;
        let stats = milp.stats();
        let started = Instant::now();

        let outcome = if let Some(reason) = trivially_infeasible {
            SolveOutcome {
                status: SolveStatus::Infeasible,
                incumbent: None,
                gap: None,
                diagnostic: Some(reason),
                elapsed: started.elapsed(),
            }
        } else if milp.variables().is_empty() {
            // Nothing to decide; every constraint was checked while building.
            let objective = milp.objective().constant();
            classify(
                BackendOutcome::Solved(Incumbent {
                    values: Vec::new(),
                    objective,
                    best_bound: objective,
                }),
                0,
                self.limits.mip_gap,
                started.elapsed(),
            )
        } else {
            debug!(
                backend = self.backend.name(),
                %mode,
                %margin,
                binaries = stats.binaries,
                continuous = stats.continuous,
                constraints = stats.constraints,
                time_limit_secs = self.limits.time_limit.as_secs_f64(),
                mip_gap = self.limits.mip_gap,
                "submitting model"
            );
            let expected = milp.variables().len();
            let raw = self.backend.solve(milp, &self.limits);
            classify(raw, expected, self.limits.mip_gap, started.elapsed())
        };

        if outcome.status.is_success() {
            info!(
                %mode,
                %margin,
                status = outcome.status.label(),
                objective = outcome.incumbent.as_ref().map(|i| i.objective),
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "solve finished"
            );
        } else {
            warn!(
                %mode,
                %margin,
                status = outcome.status.label(),
                diagnostic = outcome.diagnostic.as_deref().unwrap_or(""),
                "solve produced no placement"
            );
        }

        SolvedModel {
            mode,
            margin,
            layout,
            outcome,
        }
    }
}
