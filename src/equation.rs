// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeSet;

use float_cmp::approx_eq;

use crate::ast::{BinaryOp, Expr, Expr0};
use crate::common::{format_f64, IssueLog};
use crate::equivalence::{EquivalenceClasses, VariableArena, VariableId};
use crate::structural_err;

/// What an equation computes: a representative variable, or the rate of a
/// state with respect to the variable of integration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Variable(VariableId),
    Derivative(VariableId),
}

impl Target {
    pub fn variable(&self) -> VariableId {
        match self {
            Target::Variable(id) | Target::Derivative(id) => *id,
        }
    }
}

/// An extracted equation.  Immutable once built: the right-hand side is
/// fully resolved (representatives only, conversion factors folded in) and
/// the dependency set is the set of representative variables it reads.
#[derive(Clone, Debug, PartialEq)]
pub struct Equation {
    pub target: Target,
    pub rhs: Expr,
    pub deps: BTreeSet<VariableId>,
}

impl Equation {
    pub fn new(target: Target, rhs: Expr) -> Self {
        let mut deps = BTreeSet::new();
        rhs.walk_vars(&mut |id| {
            deps.insert(id);
        });
        Equation { target, rhs, deps }
    }

    /// The trivial equation re-emitting a unit-scaled equivalence-class
    /// member: `member = factor * representative`.
    pub fn scaled_copy(member: VariableId, representative: VariableId, factor: f64) -> Self {
        let rhs = Expr::Op2(
            BinaryOp::Mul,
            Box::new(Expr::Const(format_f64(factor), factor)),
            Box::new(Expr::Var(representative)),
        );
        Equation::new(Target::Variable(member), rhs)
    }
}

/// Shared context for lowering a component's raw equations.
pub(crate) struct ExtractionContext<'a> {
    pub arena: &'a VariableArena,
    pub classes: &'a EquivalenceClasses,
    /// per-variable conversion factor k, with value(member) = k * value(rep)
    pub scales: &'a [f64],
}

impl<'a> ExtractionContext<'a> {
    fn resolve_var(
        &self,
        component: &str,
        name: &str,
        log: &mut IssueLog,
    ) -> Option<(VariableId, VariableId, f64)> {
        match self.arena.lookup(component, name) {
            Some(id) => {
                let rep = self.classes.representative(id);
                Some((id, rep, self.scales[id.0]))
            }
            None => {
                structural_err!(
                    log,
                    UnknownVariable,
                    &format!("{component}.{name}"),
                    "equation references unknown variable '{name}' in component '{component}'"
                );
                None
            }
        }
    }

    /// Lowers a right-hand-side expression: names become representative
    /// ids, and reads of unit-scaled members pick up their conversion
    /// factor as a multiplication.
    fn lower(&self, component: &str, expr: &Expr0, log: &mut IssueLog) -> Option<Expr> {
        let lowered = match expr {
            Expr0::Const(text, value) => Expr::Const(text.clone(), *value),
            Expr0::Var(name) => {
                let (_, rep, scale) = self.resolve_var(component, name, log)?;
                scaled_read(rep, scale)
            }
            Expr0::Deriv(var, _) => {
                structural_err!(
                    log,
                    MisplacedDerivative,
                    &format!("{component}.{var}"),
                    "derivatives may only appear as a whole equation side"
                );
                return None;
            }
            Expr0::Op1(op, a) => Expr::Op1(*op, Box::new(self.lower(component, a, log)?)),
            Expr0::Op2(op, l, r) => Expr::Op2(
                *op,
                Box::new(self.lower(component, l, log)?),
                Box::new(self.lower(component, r, log)?),
            ),
            Expr0::App(builtin) => Expr::App(
                builtin
                    .try_map(&mut |arg| self.lower(component, arg, log).ok_or(()))
                    .ok()?,
            ),
            Expr0::If(cond, t, f) => Expr::If(
                Box::new(self.lower(component, cond, log)?),
                Box::new(self.lower(component, t, log)?),
                Box::new(self.lower(component, f, log)?),
            ),
        };
        Some(lowered)
    }

    /// Normalises one raw statement into an Equation.  Returns the
    /// equation plus, for derivative targets, the representative of the
    /// variable of integration it differentiates against.
    pub fn extract(
        &self,
        component: &str,
        lhs: &Expr0,
        rhs: &Expr0,
        log: &mut IssueLog,
    ) -> Option<(Equation, Option<VariableId>)> {
        match lhs {
            Expr0::Var(name) => {
                let (_, rep, scale) = self.resolve_var(component, name, log)?;
                let mut resolved = self.lower(component, rhs, log)?;
                // the equation was written against the member's units; a
                // scaled member m = k*rep defining rep means rep = rhs/k
                if !approx_eq!(f64, scale, 1.0, ulps = 2) {
                    resolved = scale_expr(resolved, 1.0 / scale);
                }
                Some((Equation::new(Target::Variable(rep), resolved), None))
            }
            Expr0::Deriv(var, wrt) => {
                let (_, var_rep, var_scale) = self.resolve_var(component, var, log)?;
                let (_, wrt_rep, wrt_scale) = self.resolve_var(component, wrt, log)?;
                let mut resolved = self.lower(component, rhs, log)?;
                // d(m)/d(v) with m = k_m*rep and v = k_v*voi gives
                // d(rep)/d(voi) = (k_v/k_m) * rhs
                let factor = wrt_scale / var_scale;
                if !approx_eq!(f64, factor, 1.0, ulps = 2) {
                    resolved = scale_expr(resolved, factor);
                }
                Some((
                    Equation::new(Target::Derivative(var_rep), resolved),
                    Some(wrt_rep),
                ))
            }
            _ => {
                structural_err!(
                    log,
                    MalformedEquationTarget,
                    component,
                    "the left side of an equation must be a variable or the derivative of a variable"
                );
                None
            }
        }
    }
}

fn scaled_read(rep: VariableId, scale: f64) -> Expr {
    if approx_eq!(f64, scale, 1.0, ulps = 2) {
        Expr::Var(rep)
    } else {
        Expr::Op2(
            BinaryOp::Mul,
            Box::new(Expr::Const(format_f64(scale), scale)),
            Box::new(Expr::Var(rep)),
        )
    }
}

fn scale_expr(expr: Expr, factor: f64) -> Expr {
    Expr::Op2(
        BinaryOp::Mul,
        Box::new(Expr::Const(format_f64(factor), factor)),
        Box::new(expr),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{Component, Model, Variable};

    fn fixture() -> (VariableArena, EquivalenceClasses) {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("t", "second"))
                .with_variable(Variable::new("x", "dimensionless"))
                .with_variable(Variable::new("y", "dimensionless")),
        );
        let arena = VariableArena::from_model(&model);
        let classes = EquivalenceClasses::build(arena.len(), &[]);
        (arena, classes)
    }

    #[test]
    fn test_extract_variable_target() {
        let (arena, classes) = fixture();
        let scales = vec![1.0; arena.len()];
        let ctx = ExtractionContext {
            arena: &arena,
            classes: &classes,
            scales: &scales,
        };
        let mut log = IssueLog::new();

        // x = y + 2
        let (eq, voi) = ctx
            .extract(
                "main",
                &Expr0::var("x"),
                &Expr0::Op2(
                    BinaryOp::Add,
                    Box::new(Expr0::var("y")),
                    Box::new(Expr0::constant(2.0)),
                ),
                &mut log,
            )
            .unwrap();

        assert!(log.is_empty());
        assert_eq!(None, voi);
        assert_eq!(Target::Variable(VariableId(1)), eq.target);
        assert_eq!(
            vec![VariableId(2)],
            eq.deps.iter().copied().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_extract_derivative_target() {
        let (arena, classes) = fixture();
        let scales = vec![1.0; arena.len()];
        let ctx = ExtractionContext {
            arena: &arena,
            classes: &classes,
            scales: &scales,
        };
        let mut log = IssueLog::new();

        // d(x)/d(t) = y
        let (eq, voi) = ctx
            .extract("main", &Expr0::deriv("x", "t"), &Expr0::var("y"), &mut log)
            .unwrap();

        assert_eq!(Some(VariableId(0)), voi);
        assert_eq!(Target::Derivative(VariableId(1)), eq.target);
    }

    #[test]
    fn test_malformed_target_is_diagnosed() {
        let (arena, classes) = fixture();
        let scales = vec![1.0; arena.len()];
        let ctx = ExtractionContext {
            arena: &arena,
            classes: &classes,
            scales: &scales,
        };
        let mut log = IssueLog::new();

        // x + 1 = y is not a legal statement
        let result = ctx.extract(
            "main",
            &Expr0::Op2(
                BinaryOp::Add,
                Box::new(Expr0::var("x")),
                Box::new(Expr0::constant(1.0)),
            ),
            &Expr0::var("y"),
            &mut log,
        );

        assert!(result.is_none());
        assert!(log.has_errors());
    }

    #[test]
    fn test_derivative_in_rhs_is_diagnosed() {
        let (arena, classes) = fixture();
        let scales = vec![1.0; arena.len()];
        let ctx = ExtractionContext {
            arena: &arena,
            classes: &classes,
            scales: &scales,
        };
        let mut log = IssueLog::new();

        let result = ctx.extract("main", &Expr0::var("x"), &Expr0::deriv("y", "t"), &mut log);
        assert!(result.is_none());
        assert!(log.has_errors());
    }

    #[test]
    fn test_scaled_member_read_is_wrapped() {
        let (arena, classes) = fixture();
        // pretend y is a scaled member: value(y) = 1000 * value(rep)
        let scales = vec![1.0, 1.0, 1000.0];
        let ctx = ExtractionContext {
            arena: &arena,
            classes: &classes,
            scales: &scales,
        };
        let mut log = IssueLog::new();

        let (eq, _) = ctx
            .extract("main", &Expr0::var("x"), &Expr0::var("y"), &mut log)
            .unwrap();
        assert_eq!(
            Expr::Op2(
                BinaryOp::Mul,
                Box::new(Expr::Const("1000.0".to_owned(), 1000.0)),
                Box::new(Expr::Var(VariableId(2))),
            ),
            eq.rhs
        );
    }

    #[test]
    fn test_scaled_copy_equation() {
        let eq = Equation::scaled_copy(VariableId(3), VariableId(1), 0.001);
        assert_eq!(Target::Variable(VariableId(3)), eq.target);
        assert!(eq.deps.contains(&VariableId(1)));
    }
}
