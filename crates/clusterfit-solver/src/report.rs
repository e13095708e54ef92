//! Human-readable rendering of allocation results.

use std::fmt::Write;

use crate::interpret::Allocation;
use crate::runner::{ModeComparison, SweepReport};

/// Multi-line summary of one allocation.
pub fn format_allocation(allocation: &Allocation) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "mode: {}  margin: {}  status: {}",
        allocation.mode(),
        allocation.margin(),
        allocation.status().label()
    );

    match allocation {
        Allocation::NoPlacement { diagnostic, .. } => {
            let _ = writeln!(out, "no placement");
            if let Some(diagnostic) = diagnostic {
                let _ = writeln!(out, "  {diagnostic}");
            }
        }
        Allocation::Placed(report) => {
            let _ = writeln!(
                out,
                "objective: {:.3}  (jobs {:.3}, nodes {:.3})",
                report.objective, report.costs.job, report.costs.node
            );
            if report.gap > 0.0 {
                let _ = writeln!(out, "gap: {:.4}%", report.gap * 100.0);
            }

            let relocated: Vec<_> = report.relocated_jobs().collect();
            let _ = writeln!(out, "relocated jobs: {}", relocated.len());
            for job in relocated {
                let _ = writeln!(
                    out,
                    "  job {}: cluster {} -> {}  (cost {:.3})",
                    job.job, job.default_cluster, job.cluster, job.cost
                );
            }

            let moving: Vec<_> = report.moving_nodes().collect();
            let _ = writeln!(out, "moving nodes: {}", moving.len());
            for node in moving {
                let hops: Vec<String> = node
                    .moves
                    .iter()
                    .map(|&t| {
                        let t = t as usize;
                        format!("t={t}: {} -> {}", node.timeline[t - 1], node.timeline[t])
                    })
                    .collect();
                let _ = writeln!(
                    out,
                    "  node {}: {}  (cost {:.3})",
                    node.node,
                    hops.join(", "),
                    node.cost
                );
            }
        }
    }
    out
}

/// One line per margin.
pub fn format_sweep(report: &SweepReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "margin sweep ({})", report.mode);
    for point in &report.points {
        let objective = point
            .allocation
            .objective()
            .map(|o| format!("{o:.3}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {:>6.3}  {:<22} {}",
            point.margin.get(),
            point.allocation.status().label(),
            objective
        );
    }
    match report.first_infeasible() {
        Some(margin) => {
            let _ = writeln!(out, "first infeasible margin: {margin}");
        }
        None => {
            let _ = writeln!(out, "feasible at every margin");
        }
    }
    out
}

/// One line per mode.
pub fn format_comparison(comparison: &ModeComparison) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "mode comparison at margin {}", comparison.margin);
    for allocation in &comparison.results {
        let detail = match allocation.report() {
            Some(r) => format!(
                "{:.3}  (jobs {:.3}, nodes {:.3})",
                r.objective, r.costs.job, r.costs.node
            ),
            None => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<10} {:<22} {}",
            allocation.mode().label(),
            allocation.status().label(),
            detail
        );
    }
    if let Some(best) = comparison.cheapest() {
        let _ = writeln!(out, "cheapest: {}", best.mode());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SolveStatus;
    use crate::interpret::{CostBreakdown, JobPlacement, NodePlacement, PlacementReport};
    use clusterfit_core::{ClusterId, JobId, Margin, Mode, NodeId};

    fn report() -> Allocation {
        Allocation::Placed(PlacementReport {
            mode: Mode::Joint,
            margin: Margin::new(0.9).unwrap(),
            status: SolveStatus::OptimalWithGap,
            gap: 0.005,
            objective: 5.0,
            costs: CostBreakdown { job: 3.0, node: 2.0 },
            jobs: vec![JobPlacement {
                job: JobId(4),
                default_cluster: ClusterId(0),
                cluster: ClusterId(1),
                relocated: true,
                cost: 3.0,
            }],
            nodes: vec![NodePlacement {
                node: NodeId(2),
                default_cluster: ClusterId(1),
                timeline: vec![ClusterId(1), ClusterId(0)],
                moves: vec![1],
                cost: 2.0,
            }],
        })
    }

    #[test]
    fn placed_summary_lists_moves() {
        let text = format_allocation(&report());
        assert!(text.contains("OPTIMAL (WITHIN GAP)"));
        assert!(text.contains("objective: 5.000"));
        assert!(text.contains("gap: 0.5000%"));
        assert!(text.contains("job 4: cluster 0 -> 1"));
        assert!(text.contains("node 2: t=1: 1 -> 0"));
    }

    #[test]
    fn no_placement_summary_shows_diagnostic() {
        let allocation = Allocation::NoPlacement {
            mode: Mode::NodeOnly,
            margin: Margin::FULL,
            status: SolveStatus::Unknown,
            diagnostic: Some("time budget exhausted without an incumbent".to_string()),
        };
        let text = format_allocation(&allocation);
        assert!(text.contains("UNKNOWN"));
        assert!(text.contains("no placement"));
        assert!(text.contains("time budget"));
    }

    #[test]
    fn comparison_names_cheapest() {
        let comparison = ModeComparison {
            margin: Margin::new(0.9).unwrap(),
            results: vec![
                report(),
                Allocation::NoPlacement {
                    mode: Mode::NodeOnly,
                    margin: Margin::new(0.9).unwrap(),
                    status: SolveStatus::Infeasible,
                    diagnostic: None,
                },
            ],
        };
        let text = format_comparison(&comparison);
        assert!(text.contains("node-only"));
        assert!(text.contains("INFEASIBLE"));
        assert!(text.contains("cheapest: joint"));
    }
}
