//! Backend-neutral linear model.
//!
//! The builder emits plain data: variable kinds, linear sums over variable
//! ids, and constraints in `sum (<= | =) rhs` form. A backend translates this
//! into its own representation at solve time, which keeps the formulation
//! testable without a solver and lets the model cross thread boundaries.

use serde::Serialize;

/// Index of a decision variable inside a [`MilpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(usize);

impl VarId {
    pub(crate) fn at(index: usize) -> Self {
        VarId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarKind {
    /// 0/1 integer.
    Binary,
    /// Continuous, bounded below by zero.
    NonNegative,
}

/// A placement value that is either free or fixed by the mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Term {
    Var(VarId),
    Fixed(f64),
}

/// `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearSum {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// True when no variable appears with a non-zero coefficient.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn add_var(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Add `coef · term`, folding fixed terms into the constant.
    pub fn add_term(&mut self, term: Term, coef: f64) {
        match term {
            Term::Var(var) => self.add_var(var, coef),
            Term::Fixed(value) => self.add_constant(coef * value),
        }
    }

    /// Value of the sum under a full assignment indexed by [`VarId`].
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values[var.index()])
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    LessEq,
    Equal,
}

/// Which family a constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConstraintKind {
    JobAssignment,
    NodeAssignment,
    NodeAnchor,
    CpuCapacity,
    MemCapacity,
    VfCapacity,
    ManoGate,
    MoveBound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub sum: LinearSum,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Whether `values` satisfies the constraint within `tolerance`.
    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        self.holds(self.sum.evaluate(values), tolerance)
    }

    fn holds(&self, lhs: f64, tolerance: f64) -> bool {
        match self.sense {
            Sense::LessEq => lhs <= self.rhs + tolerance,
            Sense::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }

    /// For constraints without variables: whether the constant side holds.
    pub fn holds_trivially(&self, tolerance: f64) -> bool {
        self.holds(self.sum.constant(), tolerance)
    }
}

/// Counts reported when a model is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub binaries: usize,
    pub continuous: usize,
    pub constraints: usize,
}

/// Minimization problem over binary and non-negative variables.
#[derive(Debug, Clone, Default)]
pub struct MilpModel {
    variables: Vec<VarKind>,
    objective: LinearSum,
    constraints: Vec<LinearConstraint>,
}

impl MilpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, kind: VarKind) -> VarId {
        self.variables.push(kind);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    pub fn set_objective(&mut self, objective: LinearSum) {
        self.objective = objective;
    }

    pub fn variables(&self) -> &[VarKind] {
        &self.variables
    }

    pub fn objective(&self) -> &LinearSum {
        &self.objective
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn constraints_of(&self, kind: ConstraintKind) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints.iter().filter(move |c| c.kind == kind)
    }

    /// Whether every constraint holds for `values` within `tolerance`.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.variables.len()
            && self
                .constraints
                .iter()
                .all(|c| c.is_satisfied_by(values, tolerance))
    }

    pub fn stats(&self) -> ModelStats {
        let binaries = self
            .variables
            .iter()
            .filter(|k| **k == VarKind::Binary)
            .count();
        ModelStats {
            binaries,
            continuous: self.variables.len() - binaries,
            constraints: self.constraints.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_terms_fold_into_constant() {
        let mut model = MilpModel::new();
        let a = model.add_variable(VarKind::Binary);
        let mut sum = LinearSum::new();
        sum.add_term(Term::Var(a), 2.0);
        sum.add_term(Term::Fixed(1.0), 3.0);
        sum.add_term(Term::Fixed(0.0), 7.0);
        assert_eq!(sum.terms(), &[(a, 2.0)]);
        assert_eq!(sum.constant(), 3.0);
        assert_eq!(sum.evaluate(&[1.0]), 5.0);
    }

    #[test]
    fn zero_coefficients_are_dropped() {
        let mut model = MilpModel::new();
        let a = model.add_variable(VarKind::Binary);
        let mut sum = LinearSum::new();
        sum.add_var(a, 0.0);
        assert!(sum.is_constant());
    }

    #[test]
    fn constraint_satisfaction() {
        let mut model = MilpModel::new();
        let a = model.add_variable(VarKind::Binary);
        let b = model.add_variable(VarKind::NonNegative);
        let mut sum = LinearSum::new();
        sum.add_var(a, 1.0);
        sum.add_var(b, 1.0);
        model.add_constraint(LinearConstraint {
            kind: ConstraintKind::JobAssignment,
            sum,
            sense: Sense::Equal,
            rhs: 1.0,
        });

        assert!(model.is_feasible(&[1.0, 0.0], 1e-9));
        assert!(!model.is_feasible(&[1.0, 1.0], 1e-9));
        assert!(!model.is_feasible(&[1.0], 1e-9));
        assert_eq!(
            model.stats(),
            ModelStats {
                binaries: 1,
                continuous: 1,
                constraints: 1
            }
        );
    }

    #[test]
    fn trivial_constraints() {
        let mut sum = LinearSum::new();
        sum.add_constant(5.0);
        let ok = LinearConstraint {
            kind: ConstraintKind::CpuCapacity,
            sum: sum.clone(),
            sense: Sense::LessEq,
            rhs: 5.0,
        };
        let violated = LinearConstraint { rhs: 4.0, ..ok.clone() };
        assert!(ok.holds_trivially(1e-9));
        assert!(!violated.holds_trivially(1e-9));
    }
}
