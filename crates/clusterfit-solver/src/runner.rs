//! End-to-end runs: single allocation, margin sweeps, mode comparison.
//!
//! Every solve builds its own model from the shared read-only scenario, so
//! sweeps and comparisons fan out over scoped threads with no shared mutable
//! state.

use std::thread;

use clusterfit_core::{Margin, Mode, Scenario, SolveSettings};
use clusterfit_model::ModelBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::backend::Backend;
use crate::driver::{SolveDriver, SolveLimits, SolveStatus};
use crate::error::{SolveError, SolveResult};
use crate::interpret::{Allocation, interpret};

/// Slack when comparing objectives of neighbouring sweep points.
const MONOTONE_TOLERANCE: f64 = 1e-6;

/// Build, solve and interpret one model.
pub fn allocate<B: Backend>(
    scenario: &Scenario,
    mode: Mode,
    margin: Margin,
    limits: &SolveLimits,
    backend: B,
) -> SolveResult<Allocation> {
    let model = ModelBuilder::new(scenario, mode, margin).build();
    let solved = SolveDriver::new(backend, limits.clone()).solve(model);
    interpret(scenario, &solved)
}

/// Run `jobs` on up to `available_parallelism` scoped threads, keeping order.
fn run_parallel<T, R, F>(jobs: &[T], f: F) -> SolveResult<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> SolveResult<R> + Sync,
{
    if jobs.is_empty() {
        return Ok(Vec::new());
    }
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(jobs.len());
    let chunk = jobs.len().div_ceil(workers);
    debug!(tasks = jobs.len(), workers, "fanning out solves");

    let f = &f;
    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .chunks(chunk)
            .map(|part| scope.spawn(move || part.iter().map(f).collect::<SolveResult<Vec<R>>>()))
            .collect();

        let mut results = Vec::with_capacity(jobs.len());
        for handle in handles {
            let part = handle.join().map_err(|_| SolveError::WorkerPanicked)??;
            results.extend(part);
        }
        Ok(results)
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    pub margin: Margin,
    pub allocation: Allocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub mode: Mode,
    /// In the order the margins were given (normally descending).
    pub points: Vec<SweepPoint>,
}

impl SweepReport {
    /// Largest margin at which the model is infeasible.
    pub fn first_infeasible(&self) -> Option<Margin> {
        self.points
            .iter()
            .find(|p| p.allocation.status() == SolveStatus::Infeasible)
            .map(|p| p.margin)
    }

    /// Whether objectives never decrease as the margin shrinks and nothing is
    /// feasible below the first infeasible margin. `Unknown` points are
    /// skipped; gap-accepted points are allowed their gap.
    pub fn is_monotone(&self) -> bool {
        let mut points: Vec<&SweepPoint> = self.points.iter().collect();
        points.sort_by(|a, b| b.margin.get().total_cmp(&a.margin.get()));

        let mut previous: Option<(f64, f64)> = None;
        let mut seen_infeasible = false;
        for point in points {
            match &point.allocation {
                Allocation::Placed(report) => {
                    if seen_infeasible {
                        return false;
                    }
                    if let Some((objective, gap)) = previous {
                        let slack = MONOTONE_TOLERANCE + gap.max(report.gap) * objective.abs();
                        if report.objective + slack < objective {
                            return false;
                        }
                    }
                    previous = Some((report.objective, report.gap));
                }
                Allocation::NoPlacement { status, .. } => {
                    if *status == SolveStatus::Infeasible {
                        seen_infeasible = true;
                    }
                }
            }
        }
        true
    }
}

/// Solve the same scenario and mode at each margin.
pub fn sweep_margins<B: Backend>(
    scenario: &Scenario,
    mode: Mode,
    margins: &[Margin],
    limits: &SolveLimits,
    backend: &B,
) -> SolveResult<SweepReport> {
    info!(%mode, points = margins.len(), "starting margin sweep");
    let points = run_parallel(margins, |&margin| {
        let allocation = allocate(scenario, mode, margin, limits, backend)?;
        Ok(SweepPoint { margin, allocation })
    })?;
    let report = SweepReport { mode, points };
    if let Some(margin) = report.first_infeasible() {
        info!(%mode, %margin, "sweep reached infeasibility");
    }
    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeComparison {
    pub margin: Margin,
    pub results: Vec<Allocation>,
}

impl ModeComparison {
    /// Successful result with the lowest objective.
    pub fn cheapest(&self) -> Option<&Allocation> {
        self.results
            .iter()
            .filter(|a| a.status().is_success())
            .filter_map(|a| a.objective().map(|objective| (objective, a)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, allocation)| allocation)
    }
}

/// Solve every mode at one margin, each with its own gap tolerance.
pub fn compare_modes<B: Backend>(
    scenario: &Scenario,
    margin: Margin,
    settings: &SolveSettings,
    backend: &B,
) -> SolveResult<ModeComparison> {
    let results = run_parallel(&Mode::ALL, |&mode| {
        let limits = SolveLimits::from_settings(settings, mode)?;
        allocate(scenario, mode, margin, &limits, backend)
    })?;
    Ok(ModeComparison { margin, results })
}
