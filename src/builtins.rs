// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

/// The fixed elementary-function vocabulary an equation's right-hand side
/// may draw on.  This is a closed set: both the dependency walker and the
/// code generator match on it exhaustively, so adding a function is a
/// compile-time-visible change everywhere it matters.
#[derive(PartialEq, Clone, Debug)]
pub enum BuiltinFn<Expr> {
    Abs(Box<Expr>),
    Ceil(Box<Expr>),
    Floor(Box<Expr>),
    Sqrt(Box<Expr>),
    Exp(Box<Expr>),
    Ln(Box<Expr>),
    Log10(Box<Expr>),
    Sin(Box<Expr>),
    Cos(Box<Expr>),
    Tan(Box<Expr>),
    Arcsin(Box<Expr>),
    Arccos(Box<Expr>),
    Arctan(Box<Expr>),
    Min(Box<Expr>, Box<Expr>),
    Max(Box<Expr>, Box<Expr>),
    Pi,
    E,
}

impl<Expr> BuiltinFn<Expr> {
    pub fn name(&self) -> &'static str {
        use BuiltinFn::*;
        match self {
            Abs(_) => "abs",
            Ceil(_) => "ceil",
            Floor(_) => "floor",
            Sqrt(_) => "sqrt",
            Exp(_) => "exp",
            Ln(_) => "ln",
            Log10(_) => "log10",
            Sin(_) => "sin",
            Cos(_) => "cos",
            Tan(_) => "tan",
            Arcsin(_) => "arcsin",
            Arccos(_) => "arccos",
            Arctan(_) => "arctan",
            Min(_, _) => "min",
            Max(_, _) => "max",
            Pi => "pi",
            E => "e",
        }
    }

    /// The contained argument expressions, in call order.
    pub fn args(&self) -> Vec<&Expr> {
        use BuiltinFn::*;
        match self {
            Abs(a) | Ceil(a) | Floor(a) | Sqrt(a) | Exp(a) | Ln(a) | Log10(a) | Sin(a)
            | Cos(a) | Tan(a) | Arcsin(a) | Arccos(a) | Arctan(a) => vec![a],
            Min(a, b) | Max(a, b) => vec![a, b],
            Pi | E => vec![],
        }
    }

    /// Rebuild this application over a different expression type, applying
    /// `f` to each argument.  Used when lowering the input AST to the
    /// resolved form.
    pub fn try_map<E2, Err>(
        &self,
        f: &mut impl FnMut(&Expr) -> Result<E2, Err>,
    ) -> Result<BuiltinFn<E2>, Err> {
        use BuiltinFn::*;
        let result = match self {
            Abs(a) => Abs(Box::new(f(a)?)),
            Ceil(a) => Ceil(Box::new(f(a)?)),
            Floor(a) => Floor(Box::new(f(a)?)),
            Sqrt(a) => Sqrt(Box::new(f(a)?)),
            Exp(a) => Exp(Box::new(f(a)?)),
            Ln(a) => Ln(Box::new(f(a)?)),
            Log10(a) => Log10(Box::new(f(a)?)),
            Sin(a) => Sin(Box::new(f(a)?)),
            Cos(a) => Cos(Box::new(f(a)?)),
            Tan(a) => Tan(Box::new(f(a)?)),
            Arcsin(a) => Arcsin(Box::new(f(a)?)),
            Arccos(a) => Arccos(Box::new(f(a)?)),
            Arctan(a) => Arctan(Box::new(f(a)?)),
            Min(a, b) => Min(Box::new(f(a)?), Box::new(f(b)?)),
            Max(a, b) => Max(Box::new(f(a)?), Box::new(f(b)?)),
            Pi => Pi,
            E => E,
        };
        Ok(result)
    }
}
