//! Integer-programming backends.
//!
//! A [`Backend`] takes a backend-neutral [`MilpModel`] and reports what the
//! solver found. Backends do not classify outcomes; the driver does.

use std::time::Instant;

use clusterfit_model::{MilpModel, Sense, VarId, VarKind};
use good_lp::solvers::microlp::microlp;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus, SolverModel,
    Variable, WithMipGap, WithTimeLimit, constraint, variable,
};
use tracing::{debug, warn};

use crate::driver::SolveLimits;

/// Best solution a backend found.
#[derive(Debug, Clone, PartialEq)]
pub struct Incumbent {
    /// One value per model variable, indexed by [`VarId`].
    pub values: Vec<f64>,
    pub objective: f64,
    /// Proven lower bound on the optimum. Equal to `objective` when the
    /// backend proved optimality.
    pub best_bound: f64,
}

/// Raw, unclassified backend result.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutcome {
    Solved(Incumbent),
    Infeasible,
    /// The time budget ran out, possibly with a solution in hand.
    TimedOut(Option<Incumbent>),
    Failed(String),
}

pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Solve `model` on the calling thread. Returns once the backend proves
    /// optimality, reaches `limits.mip_gap`, or spends `limits.time_limit`.
    fn solve(&self, model: MilpModel, limits: &SolveLimits) -> BackendOutcome;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&self, model: MilpModel, limits: &SolveLimits) -> BackendOutcome {
        (**self).solve(model, limits)
    }
}

/// `good_lp` driving the pure-Rust microlp branch and bound.
///
/// Both limits are handed to microlp, which checks its deadline inside the
/// simplex and between search nodes, so nothing keeps running once `solve`
/// returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpBackend;

impl Backend for GoodLpBackend {
    fn name(&self) -> &'static str {
        "good_lp/microlp"
    }

    fn solve(&self, model: MilpModel, limits: &SolveLimits) -> BackendOutcome {
        let started = Instant::now();
        let outcome = solve_with_good_lp(&model, limits, started);
        if let BackendOutcome::TimedOut(incumbent) = &outcome {
            warn!(
                budget_secs = limits.time_limit.as_secs_f64(),
                has_incumbent = incumbent.is_some(),
                "solver stopped at its time budget"
            );
        }
        outcome
    }
}

fn to_expression(terms: &[(VarId, f64)], handles: &[Variable]) -> Expression {
    terms
        .iter()
        .fold(Expression::from(0.0), |acc, (var, coef)| acc + *coef * handles[var.index()])
}

fn solve_with_good_lp(
    model: &MilpModel,
    limits: &SolveLimits,
    started: Instant,
) -> BackendOutcome {
    let mut problem = ProblemVariables::new();
    let handles: Vec<Variable> = model
        .variables()
        .iter()
        .map(|kind| match kind {
            VarKind::Binary => problem.add(variable().binary()),
            VarKind::NonNegative => problem.add(variable().min(0.0)),
        })
        .collect();

    // microlp measures its gap on the objective it is given, and good_lp drops
    // objective constants. Carry the constant on a variable pinned to 1.
    let mut objective = to_expression(model.objective().terms(), &handles);
    let constant = model.objective().constant();
    if constant != 0.0 {
        let one = problem.add(variable().min(1.0).max(1.0));
        objective = objective + constant * one;
    }

    let solver = problem
        .minimise(objective)
        .using(microlp)
        .with_time_limit(limits.time_limit.as_secs_f64());
    let mut solver = match solver.with_mip_gap(limits.mip_gap as f32) {
        Ok(solver) => solver,
        Err(e) => return BackendOutcome::Failed(format!("gap tolerance rejected: {e}")),
    };

    for c in model.constraints() {
        let lhs = to_expression(c.sum.terms(), &handles);
        let rhs = c.rhs - c.sum.constant();
        solver = match c.sense {
            Sense::LessEq => solver.with(constraint!(lhs <= rhs)),
            Sense::Equal => solver.with(constraint!(lhs == rhs)),
        };
    }

    debug!(
        variables = handles.len(),
        constraints = model.constraints().len(),
        "handing model to good_lp"
    );

    match solver.solve() {
        Ok(solution) => {
            let values: Vec<f64> = handles.iter().map(|v| solution.value(*v)).collect();
            let status = solution.status();
            let objective = model.objective().evaluate(&values);
            let proven = solution.into_inner().stats().best_bound;
            let best_bound = match status {
                SolutionStatus::Optimal => objective,
                _ => proven.map_or(f64::NEG_INFINITY, |bound| bound.min(objective)),
            };
            let incumbent = Incumbent {
                values,
                objective,
                best_bound,
            };
            match status {
                SolutionStatus::TimeLimit => BackendOutcome::TimedOut(Some(incumbent)),
                SolutionStatus::Optimal | SolutionStatus::GapLimit => {
                    BackendOutcome::Solved(incumbent)
                }
            }
        }
        Err(ResolutionError::Infeasible) => BackendOutcome::Infeasible,
        Err(ResolutionError::Unbounded) => {
            BackendOutcome::Failed("backend reported an unbounded model".to_string())
        }
        // microlp reports an interrupted search with no incumbent as a generic error.
        Err(_) if started.elapsed() >= limits.time_limit => BackendOutcome::TimedOut(None),
        Err(e) => BackendOutcome::Failed(e.to_string()),
    }
}
