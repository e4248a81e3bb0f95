// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::builtins::BuiltinFn;
use crate::common::Ident;
use crate::equivalence::VariableId;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Exp,
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
    And,
    Or,
}

/// The input expression form: variable references are names scoped to the
/// owning component, and derivatives may appear (they are only legal as a
/// whole equation side; the extractor rejects them anywhere else).
///
/// Consts carry their source text alongside the parsed value so generated
/// code can reproduce the literal exactly as the modeller wrote it.
#[derive(PartialEq, Clone, Debug)]
pub enum Expr0 {
    Const(String, f64),
    Var(Ident),
    /// d(variable)/d(variable-of-integration)
    Deriv(Ident, Ident),
    Op1(UnaryOp, Box<Expr0>),
    Op2(BinaryOp, Box<Expr0>, Box<Expr0>),
    App(BuiltinFn<Expr0>),
    If(Box<Expr0>, Box<Expr0>, Box<Expr0>),
}

impl Expr0 {
    pub fn constant(value: f64) -> Self {
        Expr0::Const(crate::common::format_f64(value), value)
    }

    pub fn var(name: &str) -> Self {
        Expr0::Var(name.to_owned())
    }

    pub fn deriv(var: &str, wrt: &str) -> Self {
        Expr0::Deriv(var.to_owned(), wrt.to_owned())
    }
}

/// The resolved expression form produced by equation extraction: every
/// variable reference is an arena id (already mapped to its equivalence
/// class representative, with unit-conversion factors folded in as
/// multiplications), and derivatives have been normalised away into the
/// equation target.
#[derive(PartialEq, Clone, Debug)]
pub enum Expr {
    Const(String, f64),
    Var(VariableId),
    Op1(UnaryOp, Box<Expr>),
    Op2(BinaryOp, Box<Expr>, Box<Expr>),
    App(BuiltinFn<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Calls `f` for every variable reference in the expression,
    /// left-to-right.  Iterative so that pathologically deep expressions
    /// can't blow the stack.
    pub fn walk_vars(&self, f: &mut impl FnMut(VariableId)) {
        let mut stack: Vec<&Expr> = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Const(_, _) => {}
                Expr::Var(id) => f(*id),
                Expr::Op1(_, a) => stack.push(a),
                Expr::Op2(_, l, r) => {
                    stack.push(r);
                    stack.push(l);
                }
                Expr::App(builtin) => {
                    for arg in builtin.args().into_iter().rev() {
                        stack.push(arg);
                    }
                }
                Expr::If(cond, t, f_) => {
                    stack.push(f_);
                    stack.push(t);
                    stack.push(cond);
                }
            }
        }
    }
}
