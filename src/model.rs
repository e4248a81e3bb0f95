// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The output side of analysis: a fully classified, fully sequenced model.
//! Everything a code generator needs is here; nothing refers back to the
//! input `Model`.

use std::collections::HashMap;
use std::fmt;

use crate::common::Ident;
use crate::equation::Equation;
use crate::equivalence::VariableId;

/// How a variable participates in the mathematics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    VariableOfIntegration,
    State,
    Constant,
    ComputedConstant,
    Algebraic,
    External,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            Role::VariableOfIntegration => "variable_of_integration",
            Role::State => "state",
            Role::Constant => "constant",
            Role::ComputedConstant => "computed_constant",
            Role::Algebraic => "algebraic",
            Role::External => "external",
        };
        write!(f, "{label}")
    }
}

/// One classified variable, with its slot in the array its role maps to.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysedVariable {
    pub id: VariableId,
    pub component: Ident,
    pub name: Ident,
    pub units: Ident,
    pub role: Role,
    pub index: usize,
    /// literal initial value (source text plus parsed value), for
    /// constants and states
    pub initial: Option<(String, f64)>,
}

/// A mutually-dependent set of equations handed to the external nonlinear
/// solver as one root-finding problem.
#[derive(Clone, Debug, PartialEq)]
pub struct AlgebraicSystem {
    /// indices into `AnalyserModel::equations`, declaration-ordered
    pub equations: Vec<usize>,
    /// the variables the solver is solving for, one per equation
    pub unknowns: Vec<VariableId>,
}

/// One entry in a computation sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// evaluate `equations[i]` as a plain assignment
    Equation(usize),
    /// invoke the root-finder for `systems[i]`
    System(usize),
}

/// The analysed model.  Variable lists are in arena (declaration) order
/// within each role; step lists are in evaluation order.
#[derive(Clone, Debug)]
pub struct AnalyserModel {
    pub name: String,
    pub voi: Option<AnalysedVariable>,
    pub states: Vec<AnalysedVariable>,
    pub constants: Vec<AnalysedVariable>,
    pub computed_constants: Vec<AnalysedVariable>,
    pub algebraic: Vec<AnalysedVariable>,
    pub externals: Vec<AnalysedVariable>,

    pub equations: Vec<Equation>,
    pub systems: Vec<AlgebraicSystem>,

    /// steps whose targets never change after initialisation and that do
    /// not reduce to a bare literal (those live in the variable lists)
    pub computed_constant_steps: Vec<Step>,
    /// the rate equations plus the algebraic steps they depend on
    pub rate_steps: Vec<Step>,
    /// every algebraic step, for the standalone variables routine
    pub variable_steps: Vec<Step>,
    /// external slots that must be fetched before computing rates
    pub rate_externals: Vec<usize>,

    slots: HashMap<VariableId, (Role, usize)>,
}

impl AnalyserModel {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        voi: Option<AnalysedVariable>,
        states: Vec<AnalysedVariable>,
        constants: Vec<AnalysedVariable>,
        computed_constants: Vec<AnalysedVariable>,
        algebraic: Vec<AnalysedVariable>,
        externals: Vec<AnalysedVariable>,
        equations: Vec<Equation>,
        systems: Vec<AlgebraicSystem>,
        computed_constant_steps: Vec<Step>,
        rate_steps: Vec<Step>,
        variable_steps: Vec<Step>,
        rate_externals: Vec<usize>,
    ) -> Self {
        let mut slots = HashMap::new();
        if let Some(voi) = &voi {
            slots.insert(voi.id, (Role::VariableOfIntegration, 0));
        }
        let lists = [
            &states,
            &constants,
            &computed_constants,
            &algebraic,
            &externals,
        ];
        for list in lists {
            for variable in list.iter() {
                slots.insert(variable.id, (variable.role, variable.index));
            }
        }
        AnalyserModel {
            name,
            voi,
            states,
            constants,
            computed_constants,
            algebraic,
            externals,
            equations,
            systems,
            computed_constant_steps,
            rate_steps,
            variable_steps,
            rate_externals,
            slots,
        }
    }

    /// Role and array slot of a representative variable.
    pub fn slot(&self, id: VariableId) -> Option<(Role, usize)> {
        self.slots.get(&id).copied()
    }

    pub fn variable(&self, id: VariableId) -> Option<&AnalysedVariable> {
        let (role, index) = self.slot(id)?;
        match role {
            Role::VariableOfIntegration => self.voi.as_ref(),
            Role::State => Some(&self.states[index]),
            Role::Constant => Some(&self.constants[index]),
            Role::ComputedConstant => Some(&self.computed_constants[index]),
            Role::Algebraic => Some(&self.algebraic[index]),
            Role::External => Some(&self.externals[index]),
        }
    }

    pub fn has_systems(&self) -> bool {
        !self.systems.is_empty()
    }

    pub fn has_externals(&self) -> bool {
        !self.externals.is_empty()
    }

    pub fn is_dynamic(&self) -> bool {
        !self.states.is_empty()
    }
}
