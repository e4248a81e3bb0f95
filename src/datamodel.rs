// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The input side of the pipeline: a plain-data description of a validated
//! model, as handed over by the (external) parser and conformance
//! validator.  Nothing here is re-checked for specification conformance;
//! the analyser only enforces analysis-level invariants.

use crate::ast::Expr0;
use crate::common::Ident;

/// One reference inside a named unit's definition: the referenced unit,
/// raised to `exponent`, scaled by `multiplier * 10^prefix`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitRef {
    pub units: Ident,
    pub prefix: i32,
    pub exponent: f64,
    pub multiplier: f64,
}

impl UnitRef {
    pub fn new(units: &str) -> Self {
        UnitRef {
            units: units.to_owned(),
            prefix: 0,
            exponent: 1.0,
            multiplier: 1.0,
        }
    }

    pub fn with_prefix(mut self, prefix: i32) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_exponent(mut self, exponent: f64) -> Self {
        self.exponent = exponent;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }
}

/// A named unit.  An empty `refs` list declares a fresh base dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitDef {
    pub name: Ident,
    pub refs: Vec<UnitRef>,
}

impl UnitDef {
    pub fn new(name: &str, refs: Vec<UnitRef>) -> Self {
        UnitDef {
            name: name.to_owned(),
            refs,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: Ident,
    pub units: Ident,
    /// Initial-value expression; the analyser requires a literal here for
    /// constants and states.
    pub initial: Option<Expr0>,
}

impl Variable {
    pub fn new(name: &str, units: &str) -> Self {
        Variable {
            name: name.to_owned(),
            units: units.to_owned(),
            initial: None,
        }
    }

    pub fn with_initial(mut self, value: f64) -> Self {
        self.initial = Some(Expr0::constant(value));
        self
    }
}

/// A raw equation: an equality between two expression trees.  The
/// extractor normalises the left side to a target (bare variable or
/// derivative) and diagnoses anything else as malformed.
#[derive(Clone, Debug, PartialEq)]
pub struct RawEquation {
    pub lhs: Expr0,
    pub rhs: Expr0,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    pub name: Ident,
    pub variables: Vec<Variable>,
    pub equations: Vec<RawEquation>,
}

impl Component {
    pub fn new(name: &str) -> Self {
        Component {
            name: name.to_owned(),
            variables: vec![],
            equations: vec![],
        }
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_equation(mut self, lhs: Expr0, rhs: Expr0) -> Self {
        self.equations.push(RawEquation { lhs, rhs });
        self
    }
}

/// Names one variable of one component, for equivalences and for external
/// designation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VarSpec {
    pub component: Ident,
    pub variable: Ident,
}

impl VarSpec {
    pub fn new(component: &str, variable: &str) -> Self {
        VarSpec {
            component: component.to_owned(),
            variable: variable.to_owned(),
        }
    }
}

/// Declares two variables in different components to be the same quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct Equivalence {
    pub first: VarSpec,
    pub second: VarSpec,
}

impl Equivalence {
    pub fn new(first: VarSpec, second: VarSpec) -> Self {
        Equivalence { first, second }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    pub name: String,
    pub units: Vec<UnitDef>,
    pub components: Vec<Component>,
    pub equivalences: Vec<Equivalence>,
}

impl Model {
    pub fn new(name: &str) -> Self {
        Model {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_units(mut self, def: UnitDef) -> Self {
        self.units.push(def);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_equivalence(mut self, first: VarSpec, second: VarSpec) -> Self {
        self.equivalences.push(Equivalence::new(first, second));
        self
    }

    pub fn get_component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let model = Model::new("pendulum")
            .with_units(UnitDef::new(
                "millisecond",
                vec![UnitRef::new("second").with_prefix(-3)],
            ))
            .with_component(
                Component::new("main")
                    .with_variable(Variable::new("t", "millisecond"))
                    .with_variable(Variable::new("theta", "dimensionless").with_initial(0.5)),
            );

        assert_eq!("pendulum", model.name);
        let main = model.get_component("main").unwrap();
        assert_eq!(2, main.variables.len());
        assert_eq!(
            Some(Expr0::constant(0.5)),
            main.variables[1].initial
        );
        assert!(model.get_component("nope").is_none());
    }
}
