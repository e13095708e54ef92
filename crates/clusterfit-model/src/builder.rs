//! Model builder: one formulation for every allocation mode.
//!
//! The mode decides which placements are decision variables; everything else
//! is identical. A fixed placement is a constant term (1 at the default
//! cluster, 0 elsewhere) and flows through the same constraint code as a free
//! one, so the three modes cannot drift apart.
//!
//! # Formulation
//!
//! ```text
//! Σ_c x[j,c] = 1                                     (x free)
//! Σ_c y[n,c,t] = 1                                   (y free)
//! y[n, home(n), 0] = 1                               (y free)
//! Σ_j cpu(j)·e[j,t]·x[j,c] − m·Σ_n cpu(n)·y[n,c,t] ≤ 0
//! Σ_j mem(j)·e[j,t]·x[j,c] − m·Σ_n mem(n)·y[n,c,t] ≤ 0
//! Σ_j vf(j)·e[j,t]·x[j,c]  − sriov(c)·Σ_n vf(n)·y[n,c,t] ≤ 0
//! x[j,c] = 0   if mano(j) and not mano(c)            (x free)
//!
//! min Σ_j cost(j)·(1 − x[j, home(j)])
//!   + ½·Σ_n Σ_c Σ_{t≥1} cost(n)·|y[n,c,t] − y[n,c,t−1]|
//! ```
//!
//! The absolute value is linearized with one non-negative `d[n,c,t]` per
//! term and two `MoveBound` constraints.

use clusterfit_core::{Margin, Mode, Scenario};
use tracing::{debug, info, warn};

use crate::layout::VariableLayout;
use crate::linear::{
    ConstraintKind, LinearConstraint, LinearSum, MilpModel, ModelStats, Sense, VarKind,
};

/// Slack allowed when checking constraints that have no variables left.
const CONSTANT_TOLERANCE: f64 = 1e-9;

/// A fully assembled model plus what is needed to read its solution back.
#[derive(Debug, Clone)]
pub struct AllocationModel {
    pub mode: Mode,
    pub margin: Margin,
    pub milp: MilpModel,
    pub layout: VariableLayout,
    /// Set when a variable-free constraint is violated; no backend call is
    /// needed to know the model is infeasible.
    pub trivially_infeasible: Option<String>,
}

impl AllocationModel {
    pub fn stats(&self) -> ModelStats {
        self.milp.stats()
    }
}

pub struct ModelBuilder<'a> {
    scenario: &'a Scenario,
    mode: Mode,
    margin: Margin,
    milp: MilpModel,
    layout: VariableLayout,
    trivially_infeasible: Option<String>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(scenario: &'a Scenario, mode: Mode, margin: Margin) -> Self {
        let layout = VariableLayout::new(
            mode,
            scenario.jobs().len(),
            scenario.nodes().len(),
            scenario.clusters().len(),
            scenario.horizon() as usize,
        );
        Self {
            scenario,
            mode,
            margin,
            milp: MilpModel::new(),
            layout,
            trivially_infeasible: None,
        }
    }

    pub fn build(mut self) -> AllocationModel {
        self.allocate_placement_variables();
        self.add_job_assignment();
        self.add_node_assignment();
        self.add_capacity();
        self.check_fixed_mano();
        self.set_objective();

        let stats = self.milp.stats();
        debug!(
            mode = %self.mode,
            binaries = stats.binaries,
            continuous = stats.continuous,
            constraints = stats.constraints,
            "model assembled"
        );
        if let Some(reason) = &self.trivially_infeasible {
            info!(
                mode = %self.mode,
                margin = %self.margin,
                %reason,
                "model is trivially infeasible"
            );
        }

        AllocationModel {
            mode: self.mode,
            margin: self.margin,
            milp: self.milp,
            layout: self.layout,
            trivially_infeasible: self.trivially_infeasible,
        }
    }

    fn allocate_placement_variables(&mut self) {
        for _ in 0..self.layout.placement_variables() {
            self.milp.add_variable(VarKind::Binary);
        }
    }

    /// Record a constraint, or check it right away if nothing in it is free.
    fn push(
        &mut self,
        kind: ConstraintKind,
        sum: LinearSum,
        sense: Sense,
        rhs: f64,
        label: impl FnOnce() -> String,
    ) {
        let constraint = LinearConstraint { kind, sum, sense, rhs };
        if !constraint.sum.is_constant() {
            self.milp.add_constraint(constraint);
            return;
        }
        if !constraint.holds_trivially(CONSTANT_TOLERANCE) && self.trivially_infeasible.is_none() {
            self.trivially_infeasible = Some(label());
        }
    }

    fn add_job_assignment(&mut self) {
        if !self.layout.jobs_free() {
            return;
        }
        let scenario = self.scenario;
        for (j, job) in scenario.jobs().iter().enumerate() {
            let mut sum = LinearSum::new();
            for c in 0..self.layout.clusters {
                sum.add_term(self.layout.job_term(j, c, scenario.job_home(j)), 1.0);
            }
            self.push(ConstraintKind::JobAssignment, sum, Sense::Equal, 1.0, || {
                format!("job {} cannot be assigned", job.id)
            });

            if !job.mano_req {
                continue;
            }
            for (c, cluster) in scenario.clusters().iter().enumerate() {
                if cluster.mano_supported {
                    continue;
                }
                let mut sum = LinearSum::new();
                sum.add_term(self.layout.job_term(j, c, scenario.job_home(j)), 1.0);
                self.push(ConstraintKind::ManoGate, sum, Sense::Equal, 0.0, || {
                    format!("job {} requires MANO, cluster {} lacks it", job.id, cluster.id)
                });
            }
        }
    }

    fn add_node_assignment(&mut self) {
        if !self.layout.nodes_free() {
            return;
        }
        let scenario = self.scenario;
        for (n, node) in scenario.nodes().iter().enumerate() {
            let home = scenario.node_home(n);
            for t in 0..self.layout.horizon {
                let mut sum = LinearSum::new();
                for c in 0..self.layout.clusters {
                    sum.add_term(self.layout.node_term(n, c, t, home), 1.0);
                }
                self.push(ConstraintKind::NodeAssignment, sum, Sense::Equal, 1.0, || {
                    format!("node {} cannot be assigned at t={t}", node.id)
                });
            }

            let mut anchor = LinearSum::new();
            anchor.add_term(self.layout.node_term(n, home, 0, home), 1.0);
            self.push(ConstraintKind::NodeAnchor, anchor, Sense::Equal, 1.0, || {
                format!("node {} cannot start in its default cluster", node.id)
            });
        }
    }

    fn add_capacity(&mut self) {
        let scenario = self.scenario;
        let margin = self.margin.get();

        for t in 0..self.layout.horizon {
            let active: Vec<usize> = scenario.activity().active_at(t as u32).collect();

            for (c, cluster) in scenario.clusters().iter().enumerate() {
                let mut cpu = LinearSum::new();
                let mut mem = LinearSum::new();
                let mut vf = LinearSum::new();

                for &j in &active {
                    let job = &scenario.jobs()[j];
                    let x = self.layout.job_term(j, c, scenario.job_home(j));
                    cpu.add_term(x, job.cpu_req);
                    mem.add_term(x, job.mem_req);
                    vf.add_term(x, job.vf_req);
                }

                for (n, node) in scenario.nodes().iter().enumerate() {
                    let y = self.layout.node_term(n, c, t, scenario.node_home(n));
                    cpu.add_term(y, -margin * node.cpu_cap);
                    mem.add_term(y, -margin * node.mem_cap);
                    if cluster.sriov_supported {
                        vf.add_term(y, -node.vf_cap);
                    }
                }

                let id = cluster.id;
                self.push(ConstraintKind::CpuCapacity, cpu, Sense::LessEq, 0.0, || {
                    format!("cpu demand exceeds capacity in cluster {id} at t={t}")
                });
                self.push(ConstraintKind::MemCapacity, mem, Sense::LessEq, 0.0, || {
                    format!("memory demand exceeds capacity in cluster {id} at t={t}")
                });
                self.push(ConstraintKind::VfCapacity, vf, Sense::LessEq, 0.0, || {
                    format!("vf demand exceeds capacity in cluster {id} at t={t}")
                });
            }
        }
    }

    /// With jobs pinned, a MANO job in a non-MANO cluster is not constrained;
    /// surface it so the result is not mistaken for a valid placement.
    fn check_fixed_mano(&self) {
        if self.layout.jobs_free() {
            return;
        }
        for (j, job) in self.scenario.jobs().iter().enumerate() {
            let home = &self.scenario.clusters()[self.scenario.job_home(j)];
            if job.mano_req && !home.mano_supported {
                warn!(
                    job = %job.id,
                    cluster = %home.id,
                    "pinned job requires MANO but its default cluster does not support it"
                );
            }
        }
    }

    fn set_objective(&mut self) {
        let mut objective = LinearSum::new();
        let scenario = self.scenario;

        if self.layout.jobs_free() {
            for (j, job) in scenario.jobs().iter().enumerate() {
                if job.relocation_cost == 0.0 {
                    continue;
                }
                let home = scenario.job_home(j);
                objective.add_constant(job.relocation_cost);
                objective.add_term(self.layout.job_term(j, home, home), -job.relocation_cost);
            }
        }

        if self.layout.nodes_free() {
            for (n, node) in scenario.nodes().iter().enumerate() {
                if node.relocation_cost == 0.0 {
                    continue;
                }
                let home = scenario.node_home(n);
                for c in 0..self.layout.clusters {
                    for t in 1..self.layout.horizon {
                        let d = self.milp.add_variable(VarKind::NonNegative);
                        let now = self.layout.node_term(n, c, t, home);
                        let before = self.layout.node_term(n, c, t - 1, home);

                        // y_t − y_{t−1} − d ≤ 0 and y_{t−1} − y_t − d ≤ 0
                        for sign in [1.0, -1.0] {
                            let mut bound = LinearSum::new();
                            bound.add_term(now, sign);
                            bound.add_term(before, -sign);
                            bound.add_var(d, -1.0);
                            self.milp.add_constraint(LinearConstraint {
                                kind: ConstraintKind::MoveBound,
                                sum: bound,
                                sense: Sense::LessEq,
                                rhs: 0.0,
                            });
                        }
                        objective.add_var(d, 0.5 * node.relocation_cost);
                    }
                }
            }
        }

        self.milp.set_objective(objective);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterfit_core::{Cluster, ClusterId, Dataset, Job, JobId, Node, NodeId};

    fn cluster(id: u32, mano: bool, sriov: bool) -> Cluster {
        Cluster {
            id: ClusterId(id),
            name: format!("c{id}"),
            mano_supported: mano,
            sriov_supported: sriov,
        }
    }

    fn node(id: u32, home: u32, cpu: f64) -> Node {
        Node {
            id: NodeId(id),
            default_cluster: ClusterId(home),
            cpu_cap: cpu,
            mem_cap: cpu,
            vf_cap: 4.0,
            relocation_cost: 2.0,
        }
    }

    fn job(id: u32, home: u32, cpu: f64) -> Job {
        Job {
            id: JobId(id),
            default_cluster: ClusterId(home),
            cpu_req: cpu,
            mem_req: 0.0,
            vf_req: 0.0,
            mano_req: false,
            start_time: 1,
            duration: 2,
            relocation_cost: 3.0,
        }
    }

    fn two_cluster_scenario() -> Scenario {
        Dataset {
            clusters: vec![cluster(0, true, true), cluster(1, false, false)],
            nodes: vec![node(0, 0, 10.0), node(1, 1, 10.0)],
            jobs: vec![job(0, 0, 5.0), job(1, 1, 5.0)],
        }
        .validate()
        .unwrap()
    }

    /// Values for the placement block with everything at its default.
    fn default_values(model: &AllocationModel, scenario: &Scenario) -> Vec<f64> {
        let mut values = vec![0.0; model.milp.variables().len()];
        let layout = model.layout;
        for j in 0..layout.jobs {
            if let Some(var) = layout.x(j, scenario.job_home(j)) {
                values[var.index()] = 1.0;
            }
        }
        for n in 0..layout.nodes {
            for t in 0..layout.horizon {
                if let Some(var) = layout.y(n, scenario.node_home(n), t) {
                    values[var.index()] = 1.0;
                }
            }
        }
        values
    }

    #[test]
    fn job_only_has_no_node_variables() {
        let scenario = two_cluster_scenario();
        let model = ModelBuilder::new(&scenario, Mode::JobOnly, Margin::FULL).build();
        let stats = model.stats();
        assert_eq!(stats.binaries, 4);
        assert_eq!(stats.continuous, 0);
        assert_eq!(model.milp.constraints_of(ConstraintKind::JobAssignment).count(), 2);
        assert_eq!(model.milp.constraints_of(ConstraintKind::NodeAssignment).count(), 0);
        assert_eq!(model.milp.constraints_of(ConstraintKind::NodeAnchor).count(), 0);
    }

    #[test]
    fn node_only_has_no_job_variables() {
        let scenario = two_cluster_scenario();
        let model = ModelBuilder::new(&scenario, Mode::NodeOnly, Margin::FULL).build();
        let stats = model.stats();
        // 2 nodes x 2 clusters x horizon 3.
        assert_eq!(stats.binaries, 12);
        // One d per (node, cluster, t >= 1).
        assert_eq!(stats.continuous, 8);
        assert_eq!(model.milp.constraints_of(ConstraintKind::JobAssignment).count(), 0);
        assert_eq!(model.milp.constraints_of(ConstraintKind::NodeAssignment).count(), 6);
        assert_eq!(model.milp.constraints_of(ConstraintKind::NodeAnchor).count(), 2);
        assert_eq!(model.milp.constraints_of(ConstraintKind::MoveBound).count(), 16);
    }

    #[test]
    fn mano_gate_only_for_unsupported_clusters() {
        let mut ds = Dataset {
            clusters: vec![cluster(0, true, true), cluster(1, false, true)],
            nodes: vec![node(0, 0, 10.0)],
            jobs: vec![job(0, 0, 1.0), job(1, 0, 1.0)],
        };
        ds.jobs[0].mano_req = true;
        let scenario = ds.validate().unwrap();

        let model = ModelBuilder::new(&scenario, Mode::Joint, Margin::FULL).build();
        let gates: Vec<_> = model.milp.constraints_of(ConstraintKind::ManoGate).collect();
        assert_eq!(gates.len(), 1);
        assert_eq!(gates[0].sum.terms(), &[(model.layout.x(0, 1).unwrap(), 1.0)]);
        assert_eq!(gates[0].rhs, 0.0);

        let pinned = ModelBuilder::new(&scenario, Mode::NodeOnly, Margin::FULL).build();
        assert_eq!(pinned.milp.constraints_of(ConstraintKind::ManoGate).count(), 0);
    }

    #[test]
    fn margin_scales_cpu_and_memory_but_not_vf() {
        let mut ds = Dataset {
            clusters: vec![cluster(0, true, true)],
            nodes: vec![node(0, 0, 10.0)],
            jobs: vec![job(0, 0, 5.0)],
        };
        ds.jobs[0].mem_req = 1.0;
        ds.jobs[0].vf_req = 1.0;
        let scenario = ds.validate().unwrap();
        let model = ModelBuilder::new(&scenario, Mode::NodeOnly, Margin::new(0.5).unwrap()).build();
        let y = model.layout.y(0, 0, 1).unwrap();

        let coef = |kind| {
            model
                .milp
                .constraints_of(kind)
                .flat_map(|c| c.sum.terms().iter())
                .find(|(var, _)| *var == y)
                .map(|(_, coef)| *coef)
                .unwrap()
        };
        assert_eq!(coef(ConstraintKind::CpuCapacity), -5.0);
        assert_eq!(coef(ConstraintKind::MemCapacity), -5.0);
        assert_eq!(coef(ConstraintKind::VfCapacity), -4.0);
    }

    #[test]
    fn vf_capacity_ignored_without_sriov() {
        let mut ds = Dataset {
            clusters: vec![cluster(0, true, false), cluster(1, true, true)],
            nodes: vec![node(0, 0, 10.0)],
            jobs: vec![job(0, 0, 1.0)],
        };
        ds.jobs[0].vf_req = 1.0;
        let scenario = ds.validate().unwrap();
        let model = ModelBuilder::new(&scenario, Mode::Joint, Margin::FULL).build();

        let x_home = model.layout.x(0, 0).unwrap();
        let vf_home = model
            .milp
            .constraints_of(ConstraintKind::VfCapacity)
            .find(|c| c.sum.terms().iter().any(|(v, _)| *v == x_home))
            .unwrap();
        // Only the job's demand appears; no node contributes VF capacity.
        assert_eq!(vf_home.sum.terms(), &[(x_home, 1.0)]);
    }

    #[test]
    fn default_placement_is_feasible_and_free() {
        let scenario = two_cluster_scenario();
        for mode in Mode::ALL {
            let model = ModelBuilder::new(&scenario, mode, Margin::FULL).build();
            assert!(model.trivially_infeasible.is_none());
            let values = default_values(&model, &scenario);
            assert!(model.milp.is_feasible(&values, 1e-9), "{mode}");
            assert_eq!(model.milp.objective().evaluate(&values), 0.0, "{mode}");
        }
    }

    #[test]
    fn job_move_costs_its_full_weight() {
        let scenario = two_cluster_scenario();
        let model = ModelBuilder::new(&scenario, Mode::JobOnly, Margin::FULL).build();
        let mut values = default_values(&model, &scenario);
        values[model.layout.x(0, 0).unwrap().index()] = 0.0;
        values[model.layout.x(0, 1).unwrap().index()] = 1.0;
        assert_eq!(model.milp.objective().evaluate(&values), 3.0);
    }

    #[test]
    fn node_move_costs_half_of_two_differences() {
        let scenario = two_cluster_scenario();
        let model = ModelBuilder::new(&scenario, Mode::NodeOnly, Margin::FULL).build();
        let mut values = default_values(&model, &scenario);
        // Node 0 moves to cluster 1 at t=2.
        values[model.layout.y(0, 0, 2).unwrap().index()] = 0.0;
        values[model.layout.y(0, 1, 2).unwrap().index()] = 1.0;
        // Set every d to the absolute difference it bounds.
        let moves: Vec<_> = model.milp.constraints_of(ConstraintKind::MoveBound).collect();
        for pair in moves.chunks(2) {
            let (placement, d) = pair[0].sum.terms().split_at(2);
            let diff: f64 = placement
                .iter()
                .map(|(v, coef)| coef * values[v.index()])
                .sum();
            values[d[0].0.index()] = diff.abs();
        }
        assert!(moves.iter().all(|c| c.is_satisfied_by(&values, 1e-9)));
        // Node 0 relocation cost is 2; one move.
        assert_eq!(model.milp.objective().evaluate(&values), 2.0);
    }

    #[test]
    fn trivially_infeasible_without_capacity() {
        let ds = Dataset {
            clusters: vec![cluster(0, true, true)],
            nodes: vec![],
            jobs: vec![job(0, 0, 1.0)],
        };
        let scenario = ds.validate().unwrap();
        let model = ModelBuilder::new(&scenario, Mode::NodeOnly, Margin::FULL).build();
        let reason = model.trivially_infeasible.unwrap();
        assert!(reason.contains("cpu"), "{reason}");
    }

    #[test]
    fn idle_clusters_add_no_constraints_in_job_only() {
        let ds = Dataset {
            clusters: vec![cluster(0, true, true)],
            nodes: vec![node(0, 0, 10.0)],
            jobs: vec![],
        };
        let scenario = ds.validate().unwrap();
        let model = ModelBuilder::new(&scenario, Mode::JobOnly, Margin::FULL).build();
        assert_eq!(model.stats().constraints, 0);
        assert!(model.trivially_infeasible.is_none());
    }
}
