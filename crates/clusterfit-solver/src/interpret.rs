//! Result interpreter: placements and costs from a solved model.

use clusterfit_core::{ClusterId, JobId, Margin, Mode, NodeId, Scenario};
use clusterfit_model::VariableLayout;
use serde::Serialize;
use tracing::warn;

use crate::driver::{SolveStatus, SolvedModel};
use crate::error::{SolveError, SolveResult};

/// Binary values above this read as 1.
const BINARY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPlacement {
    pub job: JobId,
    pub default_cluster: ClusterId,
    pub cluster: ClusterId,
    pub relocated: bool,
    /// The job's relocation cost if relocated, otherwise zero.
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePlacement {
    pub node: NodeId,
    pub default_cluster: ClusterId,
    /// Cluster at every timeslice `0..T`.
    pub timeline: Vec<ClusterId>,
    /// Timeslices `t >= 1` at which the cluster differs from `t - 1`.
    pub moves: Vec<u32>,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub job: f64,
    pub node: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.job + self.node
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementReport {
    pub mode: Mode,
    pub margin: Margin,
    pub status: SolveStatus,
    pub gap: f64,
    pub objective: f64,
    pub costs: CostBreakdown,
    pub jobs: Vec<JobPlacement>,
    pub nodes: Vec<NodePlacement>,
}

impl PlacementReport {
    pub fn relocated_jobs(&self) -> impl Iterator<Item = &JobPlacement> {
        self.jobs.iter().filter(|j| j.relocated)
    }

    pub fn moving_nodes(&self) -> impl Iterator<Item = &NodePlacement> {
        self.nodes.iter().filter(|n| !n.moves.is_empty())
    }
}

/// Outcome of one allocation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Allocation {
    Placed(PlacementReport),
    /// No assignments are available; never read placements from this.
    NoPlacement {
        mode: Mode,
        margin: Margin,
        status: SolveStatus,
        diagnostic: Option<String>,
    },
}

impl Allocation {
    pub fn status(&self) -> SolveStatus {
        match self {
            Allocation::Placed(report) => report.status,
            Allocation::NoPlacement { status, .. } => *status,
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Allocation::Placed(report) => report.mode,
            Allocation::NoPlacement { mode, .. } => *mode,
        }
    }

    pub fn margin(&self) -> Margin {
        match self {
            Allocation::Placed(report) => report.margin,
            Allocation::NoPlacement { margin, .. } => *margin,
        }
    }

    pub fn report(&self) -> Option<&PlacementReport> {
        match self {
            Allocation::Placed(report) => Some(report),
            Allocation::NoPlacement { .. } => None,
        }
    }

    pub fn objective(&self) -> Option<f64> {
        self.report().map(|r| r.objective)
    }
}

/// Resolve the cluster index whose binary is set, or `None` if not exactly one.
fn single_choice(clusters: usize, value: impl Fn(usize) -> f64) -> Option<usize> {
    let mut chosen = None;
    for c in 0..clusters {
        if value(c) > BINARY_THRESHOLD {
            if chosen.is_some() {
                return None;
            }
            chosen = Some(c);
        }
    }
    chosen
}

fn check_layout(scenario: &Scenario, layout: &VariableLayout) -> SolveResult<()> {
    let expected = (
        scenario.jobs().len(),
        scenario.nodes().len(),
        scenario.clusters().len(),
        scenario.horizon() as usize,
    );
    let actual = (layout.jobs, layout.nodes, layout.clusters, layout.horizon);
    if expected != actual {
        return Err(SolveError::ScenarioMismatch(format!(
            "scenario has (jobs, nodes, clusters, horizon) = {expected:?}, model has {actual:?}"
        )));
    }
    Ok(())
}

/// Turn a solved model into a placement report.
///
/// Non-successful outcomes become [`Allocation::NoPlacement`]. Placements are
/// never fabricated: if the assignment breaks single placement, the result is
/// `NoPlacement` with status `Unknown`.
pub fn interpret(scenario: &Scenario, solved: &SolvedModel) -> SolveResult<Allocation> {
    check_layout(scenario, &solved.layout)?;

    let no_placement = |status, diagnostic| Allocation::NoPlacement {
        mode: solved.mode,
        margin: solved.margin,
        status,
        diagnostic,
    };

    let outcome = &solved.outcome;
    let incumbent = match (&outcome.incumbent, outcome.status.is_success()) {
        (Some(incumbent), true) => incumbent,
        _ => return Ok(no_placement(outcome.status, outcome.diagnostic.clone())),
    };
    let values = &incumbent.values;
    let layout = &solved.layout;

    let mut costs = CostBreakdown::default();

    let mut jobs = Vec::with_capacity(layout.jobs);
    for (j, job) in scenario.jobs().iter().enumerate() {
        let home = scenario.job_home(j);
        let cluster = if layout.jobs_free() {
            let choice = single_choice(layout.clusters, |c| {
                layout.x(j, c).map_or(0.0, |var| values[var.index()])
            });
            match choice {
                Some(c) => c,
                None => {
                    warn!(job = %job.id, "job is not placed in exactly one cluster");
                    return Ok(no_placement(
                        SolveStatus::Unknown,
                        Some(format!("job {} is not placed in exactly one cluster", job.id)),
                    ));
                }
            }
        } else {
            home
        };
        let relocated = cluster != home;
        let cost = if relocated { job.relocation_cost } else { 0.0 };
        costs.job += cost;
        jobs.push(JobPlacement {
            job: job.id,
            default_cluster: scenario.cluster_id(home),
            cluster: scenario.cluster_id(cluster),
            relocated,
            cost,
        });
    }

    let mut nodes = Vec::with_capacity(layout.nodes);
    for (n, node) in scenario.nodes().iter().enumerate() {
        let home = scenario.node_home(n);
        let mut timeline = Vec::with_capacity(layout.horizon);
        for t in 0..layout.horizon {
            let cluster = if layout.nodes_free() {
                let choice = single_choice(layout.clusters, |c| {
                    layout.y(n, c, t).map_or(0.0, |var| values[var.index()])
                });
                match choice {
                    Some(c) => c,
                    None => {
                        warn!(node = %node.id, t, "node is not placed in exactly one cluster");
                        return Ok(no_placement(
                            SolveStatus::Unknown,
                            Some(format!(
                                "node {} is not placed in exactly one cluster at t={t}",
                                node.id
                            )),
                        ));
                    }
                }
            } else {
                home
            };
            timeline.push(cluster);
        }

        let moves: Vec<u32> = timeline
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[0] != pair[1])
            .map(|(i, _)| (i + 1) as u32)
            .collect();
        let cost = moves.len() as f64 * node.relocation_cost;
        costs.node += cost;
        nodes.push(NodePlacement {
            node: node.id,
            default_cluster: scenario.cluster_id(home),
            timeline: timeline.into_iter().map(|c| scenario.cluster_id(c)).collect(),
            moves,
            cost,
        });
    }

    Ok(Allocation::Placed(PlacementReport {
        mode: solved.mode,
        margin: solved.margin,
        status: outcome.status,
        gap: outcome.gap.unwrap_or(0.0),
        objective: costs.total(),
        costs,
        jobs,
        nodes,
    }))
}
