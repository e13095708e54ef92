//! Index arithmetic for placement variables.
//!
//! Free placement variables are allocated contiguously: all `x[j, c]` first
//! (job-major), then all `y[n, c, t]` (node, then cluster, then timeslice).
//! Auxiliary variables come after both blocks and are not addressed here.

use clusterfit_core::Mode;
use serde::Serialize;

use crate::linear::{Term, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VariableLayout {
    pub jobs: usize,
    pub nodes: usize,
    pub clusters: usize,
    pub horizon: usize,
    jobs_free: bool,
    nodes_free: bool,
}

impl VariableLayout {
    pub fn new(mode: Mode, jobs: usize, nodes: usize, clusters: usize, horizon: usize) -> Self {
        Self {
            jobs,
            nodes,
            clusters,
            horizon,
            jobs_free: mode.jobs_free(),
            nodes_free: mode.nodes_free(),
        }
    }

    pub fn jobs_free(&self) -> bool {
        self.jobs_free
    }

    pub fn nodes_free(&self) -> bool {
        self.nodes_free
    }

    fn x_count(&self) -> usize {
        if self.jobs_free {
            self.jobs * self.clusters
        } else {
            0
        }
    }

    fn y_count(&self) -> usize {
        if self.nodes_free {
            self.nodes * self.clusters * self.horizon
        } else {
            0
        }
    }

    /// Total number of placement variables.
    pub fn placement_variables(&self) -> usize {
        self.x_count() + self.y_count()
    }

    /// Variable for `x[job, cluster]`, if jobs are free.
    pub fn x(&self, job: usize, cluster: usize) -> Option<VarId> {
        debug_assert!(job < self.jobs && cluster < self.clusters);
        self.jobs_free.then(|| VarId::at(job * self.clusters + cluster))
    }

    /// Variable for `y[node, cluster, t]`, if nodes are free.
    pub fn y(&self, node: usize, cluster: usize, t: usize) -> Option<VarId> {
        debug_assert!(node < self.nodes && cluster < self.clusters && t < self.horizon);
        self.nodes_free.then(|| {
            VarId::at(self.x_count() + (node * self.clusters + cluster) * self.horizon + t)
        })
    }

    /// `x[job, cluster]` as a term: the variable, or the default placement.
    pub fn job_term(&self, job: usize, cluster: usize, home: usize) -> Term {
        match self.x(job, cluster) {
            Some(var) => Term::Var(var),
            None => Term::Fixed(if cluster == home { 1.0 } else { 0.0 }),
        }
    }

    /// `y[node, cluster, t]` as a term: the variable, or the default placement.
    pub fn node_term(&self, node: usize, cluster: usize, t: usize, home: usize) -> Term {
        match self.y(node, cluster, t) {
            Some(var) => Term::Var(var),
            None => Term::Fixed(if cluster == home { 1.0 } else { 0.0 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joint_layout_places_y_after_x() {
        let layout = VariableLayout::new(Mode::Joint, 2, 3, 2, 4);
        assert_eq!(layout.x(0, 0).unwrap().index(), 0);
        assert_eq!(layout.x(1, 1).unwrap().index(), 3);
        assert_eq!(layout.y(0, 0, 0).unwrap().index(), 4);
        assert_eq!(layout.y(0, 1, 0).unwrap().index(), 8);
        assert_eq!(layout.y(2, 1, 3).unwrap().index(), 4 + 24 - 1);
        assert_eq!(layout.placement_variables(), 4 + 24);
    }

    #[test]
    fn job_only_fixes_nodes() {
        let layout = VariableLayout::new(Mode::JobOnly, 2, 3, 2, 4);
        assert!(layout.y(0, 0, 0).is_none());
        assert_eq!(layout.node_term(1, 1, 2, 1), Term::Fixed(1.0));
        assert_eq!(layout.node_term(1, 0, 2, 1), Term::Fixed(0.0));
        assert_eq!(layout.placement_variables(), 4);
    }

    #[test]
    fn node_only_fixes_jobs() {
        let layout = VariableLayout::new(Mode::NodeOnly, 2, 3, 2, 4);
        assert!(layout.x(0, 0).is_none());
        assert_eq!(layout.y(0, 0, 0).unwrap().index(), 0);
        assert_eq!(layout.job_term(0, 1, 1), Term::Fixed(1.0));
        assert_eq!(layout.job_term(0, 0, 1), Term::Fixed(0.0));
    }
}
