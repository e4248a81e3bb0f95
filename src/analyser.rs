// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The analyser proper: resolves equivalences, extracts and sequences
//! equations, classifies every variable, and either produces an
//! `AnalyserModel` or a log of issues and no model at all.

use std::collections::{BTreeSet, HashMap, HashSet};

use float_cmp::approx_eq;

use crate::ast::{Expr, Expr0};
use crate::common::{format_f64, ErrorCode, Issue, IssueKind, IssueLog, UnitError};
use crate::datamodel::{Model, VarSpec};
use crate::equation::{Equation, ExtractionContext, Target};
use crate::equivalence::{EquivalenceClasses, VariableArena, VariableId};
use crate::graph::{Condensation, Graph};
use crate::model::{AlgebraicSystem, AnalysedVariable, AnalyserModel, Role, Step};
use crate::structural_err;
use crate::units::UnitTable;

/// Entry point for analysis.  Configure external designations, then call
/// `analyse`; a model comes back only when the issue log holds no errors.
#[derive(Debug, Default)]
pub struct Analyser {
    externals: Vec<VarSpec>,
    issues: IssueLog,
}

impl Analyser {
    pub fn new() -> Self {
        Default::default()
    }

    /// Marks a variable as externally computed.  The designation applies
    /// to the variable's whole equivalence network and wins over any
    /// equation targeting it.
    pub fn add_external_variable(&mut self, spec: VarSpec) {
        if !self.externals.contains(&spec) {
            self.externals.push(spec);
        }
    }

    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    pub fn analyse(&mut self, model: &Model) -> Option<AnalyserModel> {
        self.issues.clear();
        run(model, &self.externals, &mut self.issues)
    }
}

fn unit_issue(log: &mut IssueLog, entity: &str, err: &UnitError) {
    log.push(Issue::error(IssueKind::Unit, err.code(), entity, err.to_string()));
}

fn run(model: &Model, externals: &[VarSpec], log: &mut IssueLog) -> Option<AnalyserModel> {
    let arena = VariableArena::from_model(model);
    let units = UnitTable::new(&model.units);

    for def in model.units.iter() {
        if let Err(err) = units.resolve(&def.name) {
            unit_issue(log, &def.name, &err);
        }
    }
    for (_, record) in arena.iter() {
        // cyclic and transitively-unknown definitions were attributed to
        // the definition above; only a directly unknown name is news here
        if let Err(err @ UnitError::Unknown(_)) = units.resolve(&record.units) {
            unit_issue(log, &record.qualified_name(), &err);
        }
    }

    let mut pairs = Vec::new();
    for equivalence in model.equivalences.iter() {
        let mut resolve = |spec: &VarSpec| match arena.lookup(&spec.component, &spec.variable) {
            Some(id) => Some(id),
            None => {
                structural_err!(
                    log,
                    UnknownVariable,
                    &format!("{}.{}", spec.component, spec.variable),
                    "equivalence references unknown variable '{}' in component '{}'",
                    spec.variable,
                    spec.component
                );
                None
            }
        };
        if let (Some(a), Some(b)) = (resolve(&equivalence.first), resolve(&equivalence.second)) {
            pairs.push((a, b));
        }
    }
    let classes = EquivalenceClasses::build(arena.len(), &pairs);

    // value(member) = k * value(representative)
    let mut scales = vec![1.0_f64; arena.len()];
    for (member, rep) in classes.merged_members() {
        let member_units = &arena.get(member).units;
        let rep_units = &arena.get(rep).units;
        match units.scaling_factor(rep_units, member_units) {
            Ok(k) => scales[member.0] = k,
            Err(err @ UnitError::Incompatible { .. }) => {
                unit_issue(log, &arena.get(member).qualified_name(), &err);
            }
            Err(_) => {} // unresolvable units were already reported
        }
    }

    let mut initials: Vec<Option<(String, f64)>> = vec![None; arena.len()];
    for (id, record) in arena.iter() {
        if let Some(expr) = &record.initial {
            match expr {
                Expr0::Const(text, value) => initials[id.0] = Some((text.clone(), *value)),
                _ => {
                    structural_err!(
                        log,
                        BadInitialValue,
                        &record.qualified_name(),
                        "the initial value of '{}' must be a literal constant",
                        record.name
                    );
                }
            }
        }
    }
    // an initial value anywhere in an equivalence network initialises the
    // representative, converted into the representative's units
    for (member, rep) in classes.merged_members() {
        if let Some((_, value)) = initials[member.0].take() {
            if initials[rep.0].is_some() {
                structural_err!(
                    log,
                    VariableRedefined,
                    &arena.get(member).qualified_name(),
                    "'{}' is initialised more than once across its equivalence network",
                    arena.get(member).name
                );
            } else {
                let converted = value / scales[member.0];
                initials[rep.0] = Some((format_f64(converted), converted));
            }
        }
    }

    let ctx = ExtractionContext {
        arena: &arena,
        classes: &classes,
        scales: &scales,
    };
    let mut equations: Vec<Equation> = Vec::new();
    let mut voi_of: Vec<Option<VariableId>> = Vec::new();
    for component in model.components.iter() {
        for raw in component.equations.iter() {
            if let Some((equation, voi)) = ctx.extract(&component.name, &raw.lhs, &raw.rhs, log) {
                equations.push(equation);
                voi_of.push(voi);
            }
        }
    }
    // unit-scaled equivalence members keep their own slot, computed from
    // the representative by a synthesized conversion equation
    for (member, rep) in classes.merged_members() {
        let k = scales[member.0];
        if !approx_eq!(f64, k, 1.0, ulps = 2) {
            equations.push(Equation::scaled_copy(member, rep, k));
            voi_of.push(None);
        }
    }

    let mut external_reps: Vec<VariableId> = Vec::new();
    let mut external_set: HashSet<VariableId> = HashSet::new();
    for spec in externals.iter() {
        match arena.lookup(&spec.component, &spec.variable) {
            Some(id) => {
                let rep = classes.representative(id);
                if external_set.insert(rep) {
                    external_reps.push(rep);
                }
            }
            None => {
                structural_err!(
                    log,
                    UnknownVariable,
                    &format!("{}.{}", spec.component, spec.variable),
                    "external designation references unknown variable '{}' in component '{}'",
                    spec.variable,
                    spec.component
                );
            }
        }
    }

    // a designation wins over any equation for the same variable
    let mut kept = Vec::with_capacity(equations.len());
    let mut kept_voi = Vec::with_capacity(voi_of.len());
    for (equation, voi) in equations.into_iter().zip(voi_of) {
        let target = equation.target.variable();
        if external_set.contains(&target) {
            log.push(Issue::warning(
                IssueKind::Structural,
                ErrorCode::ExternalEquationIgnored,
                &arena.get(target).qualified_name(),
                format!(
                    "'{}' is designated external; its defining equation is ignored",
                    arena.get(target).name
                ),
            ));
        } else {
            kept.push(equation);
            kept_voi.push(voi);
        }
    }
    let equations = kept;
    let voi_of = kept_voi;

    let mut voi: Option<VariableId> = None;
    for candidate in voi_of.iter().flatten() {
        match voi {
            None => voi = Some(*candidate),
            Some(existing) if existing != *candidate => {
                structural_err!(
                    log,
                    MultipleVoi,
                    &arena.get(*candidate).qualified_name(),
                    "derivatives are taken against both '{}' and '{}'",
                    arena.get(existing).name,
                    arena.get(*candidate).name
                );
            }
            Some(_) => {}
        }
    }
    if let Some(voi) = voi {
        let record = arena.get(voi);
        if external_set.contains(&voi) {
            structural_err!(
                log,
                VoiComputed,
                &record.qualified_name(),
                "the variable of integration must not be designated external"
            );
        }
        if initials[voi.0].is_some() {
            structural_err!(
                log,
                VoiComputed,
                &record.qualified_name(),
                "the variable of integration must not be given an initial value"
            );
        }
    }

    let mut var_definers: HashMap<VariableId, Vec<usize>> = HashMap::new();
    let mut deriv_definers: HashMap<VariableId, Vec<usize>> = HashMap::new();
    for (i, equation) in equations.iter().enumerate() {
        match equation.target {
            Target::Variable(v) => var_definers.entry(v).or_default().push(i),
            Target::Derivative(v) => deriv_definers.entry(v).or_default().push(i),
        }
    }
    if let Some(voi) = voi {
        if var_definers.contains_key(&voi) || deriv_definers.contains_key(&voi) {
            structural_err!(
                log,
                VoiComputed,
                &arena.get(voi).qualified_name(),
                "the variable of integration must not be the target of an equation"
            );
        }
    }

    // arena order so diagnostics come out in declaration order
    for (id, record) in arena.iter() {
        let n_deriv = deriv_definers.get(&id).map_or(0, |d| d.len());
        let n_var = var_definers.get(&id).map_or(0, |d| d.len());
        if n_deriv > 1 {
            structural_err!(
                log,
                VariableRedefined,
                &record.qualified_name(),
                "'{}' has more than one rate equation",
                record.name
            );
        }
        if n_deriv >= 1 && n_var >= 1 {
            structural_err!(
                log,
                VariableRedefined,
                &record.qualified_name(),
                "'{}' is computed both as a state and algebraically",
                record.name
            );
        }
        if n_deriv >= 1 && initials[id.0].is_none() {
            structural_err!(
                log,
                StateNotInitialised,
                &record.qualified_name(),
                "state '{}' has no initial value",
                record.name
            );
        }
        if n_var >= 1 && initials[id.0].is_some() {
            structural_err!(
                log,
                VariableRedefined,
                &record.qualified_name(),
                "'{}' has both an initial value and a defining equation",
                record.name
            );
        }
    }

    // equation i depends on equation j when i reads a variable j defines;
    // reads of states, the voi, externals and plain constants add no edge
    let mut graph = Graph::new(equations.len());
    for (i, equation) in equations.iter().enumerate() {
        for dep in equation.deps.iter() {
            if let Some(definers) = var_definers.get(dep) {
                for j in definers.iter() {
                    graph.add_edge(i, *j);
                }
            }
        }
    }
    let condensation = Condensation::new(&graph);
    let n_comps = condensation.components.len();
    let order = condensation.topo_order();

    for (id, record) in arena.iter() {
        let Some(definers) = var_definers.get(&id) else {
            continue;
        };
        if definers.len() < 2 {
            continue;
        }
        let comp = condensation.component_of[definers[0]];
        let together = definers.iter().all(|j| condensation.component_of[*j] == comp);
        if together && condensation.non_trivial[comp] {
            log.push(Issue::error(
                IssueKind::System,
                ErrorCode::SystemOverDetermined,
                &record.qualified_name(),
                format!(
                    "'{}' is constrained by more equations than unknowns",
                    record.name
                ),
            ));
        } else {
            structural_err!(
                log,
                VariableRedefined,
                &record.qualified_name(),
                "'{}' is computed by more than one equation",
                record.name
            );
        }
    }

    let mut readers: HashMap<VariableId, Vec<usize>> = HashMap::new();
    for (i, equation) in equations.iter().enumerate() {
        for dep in equation.deps.iter() {
            readers.entry(*dep).or_default().push(i);
        }
    }

    // a variable with no value from anywhere is an error on its own,
    // unless it is read only inside one mutually-dependent equation set,
    // where it instead counts as an unknown of that set
    let mut attached_unknowns: HashMap<usize, usize> = HashMap::new();
    for (id, record) in arena.iter() {
        if !classes.is_representative(id) && approx_eq!(f64, scales[id.0], 1.0, ulps = 2) {
            continue; // alias of its representative
        }
        if Some(id) == voi
            || external_set.contains(&id)
            || initials[id.0].is_some()
            || var_definers.contains_key(&id)
            || deriv_definers.contains_key(&id)
        {
            continue;
        }
        let attachable = readers.get(&id).and_then(|reading| {
            let comp = condensation.component_of[reading[0]];
            let single = reading.iter().all(|j| condensation.component_of[*j] == comp);
            (single && condensation.non_trivial[comp]).then_some(comp)
        });
        match attachable {
            Some(comp) => *attached_unknowns.entry(comp).or_default() += 1,
            None => {
                structural_err!(
                    log,
                    VariableNeverDefined,
                    &record.qualified_name(),
                    "'{}' is never given a value",
                    record.name
                );
            }
        }
    }

    let mut systems: Vec<AlgebraicSystem> = Vec::new();
    let mut system_of_comp: Vec<Option<usize>> = vec![None; n_comps];
    for comp in order.iter().copied() {
        if !condensation.non_trivial[comp] {
            continue;
        }
        let member_eqs = &condensation.components[comp];
        let unknowns: BTreeSet<VariableId> = member_eqs
            .iter()
            .map(|i| equations[*i].target.variable())
            .collect();
        let attached = attached_unknowns.get(&comp).copied().unwrap_or(0);
        if unknowns.len() + attached > member_eqs.len() {
            let first = *unknowns.iter().next().unwrap();
            log.push(Issue::error(
                IssueKind::System,
                ErrorCode::SystemUnderDetermined,
                &arena.get(first).qualified_name(),
                format!(
                    "{} unknowns constrained by {} equations",
                    unknowns.len() + attached,
                    member_eqs.len()
                ),
            ));
        } else if unknowns.len() == member_eqs.len() {
            system_of_comp[comp] = Some(systems.len());
            systems.push(AlgebraicSystem {
                equations: member_eqs.clone(),
                unknowns: member_eqs
                    .iter()
                    .map(|i| equations[*i].target.variable())
                    .collect(),
            });
        }
        // fewer distinct unknowns than equations was reported above as
        // over-determination
    }

    if log.has_errors() {
        return None;
    }

    // from here on the model is known well-formed: every variable has
    // exactly one source of value

    let states_set: HashSet<VariableId> = deriv_definers.keys().copied().collect();
    let defined_by: HashMap<VariableId, usize> =
        var_definers.iter().map(|(v, d)| (*v, d[0])).collect();

    let mut comp_volatile = vec![false; n_comps];
    for comp in order.iter().copied() {
        let mut volatile = false;
        for i in condensation.components[comp].iter().copied() {
            if matches!(equations[i].target, Target::Derivative(_)) {
                volatile = true;
            }
            for dep in equations[i].deps.iter() {
                if Some(*dep) == voi || states_set.contains(dep) || external_set.contains(dep) {
                    volatile = true;
                } else if let Some(j) = defined_by.get(dep) {
                    if comp_volatile[condensation.component_of[*j]] {
                        volatile = true;
                    }
                }
            }
        }
        comp_volatile[comp] = volatile;
    }

    // `x = 1.23` is not worth an evaluation step; the target becomes a
    // plain constant carrying the literal
    let mut folded = vec![false; equations.len()];
    for (i, equation) in equations.iter().enumerate() {
        if let (Target::Variable(v), Expr::Const(text, value)) = (equation.target, &equation.rhs) {
            if !condensation.non_trivial[condensation.component_of[i]] {
                folded[i] = true;
                initials[v.0] = Some((text.clone(), *value));
            }
        }
    }

    let mut roles: Vec<Option<Role>> = vec![None; arena.len()];
    if let Some(voi) = voi {
        roles[voi.0] = Some(Role::VariableOfIntegration);
    }
    for state in states_set.iter() {
        roles[state.0] = Some(Role::State);
    }
    for external in external_reps.iter() {
        roles[external.0] = Some(Role::External);
    }
    for (i, equation) in equations.iter().enumerate() {
        if let Target::Variable(v) = equation.target {
            let comp = condensation.component_of[i];
            roles[v.0] = Some(if folded[i] {
                Role::Constant
            } else if system_of_comp[comp].is_some() || comp_volatile[comp] {
                Role::Algebraic
            } else {
                Role::ComputedConstant
            });
        }
    }
    for (id, _) in arena.iter() {
        if roles[id.0].is_none() && initials[id.0].is_some() {
            roles[id.0] = Some(Role::Constant);
        }
    }

    let mut computed_constant_steps = Vec::new();
    let mut variable_steps = Vec::new();
    let mut comp_step: Vec<Option<Step>> = vec![None; n_comps];
    for comp in order.iter().copied() {
        let step = if let Some(s) = system_of_comp[comp] {
            Some(Step::System(s))
        } else {
            let i = condensation.components[comp][0];
            if folded[i] {
                None
            } else {
                Some(Step::Equation(i))
            }
        };
        comp_step[comp] = step;
        let Some(step) = step else { continue };
        if let Step::Equation(i) = step {
            if matches!(equations[i].target, Target::Derivative(_)) {
                continue; // rates are sequenced separately below
            }
        }
        if system_of_comp[comp].is_some() || comp_volatile[comp] {
            variable_steps.push(step);
        }
        if !comp_volatile[comp] {
            computed_constant_steps.push(step);
        }
    }

    // rates need their own transitive closure: the rate equations plus
    // every volatile step feeding them, plus the externals they read
    let mut included = vec![false; n_comps];
    let mut stack: Vec<usize> = Vec::new();
    for (i, equation) in equations.iter().enumerate() {
        if matches!(equation.target, Target::Derivative(_)) {
            let comp = condensation.component_of[i];
            if !included[comp] {
                included[comp] = true;
                stack.push(comp);
            }
        }
    }
    while let Some(comp) = stack.pop() {
        for dep in condensation.deps[comp].iter().copied() {
            if comp_volatile[dep] && !included[dep] {
                included[dep] = true;
                stack.push(dep);
            }
        }
    }
    let mut rate_steps = Vec::new();
    let mut rate_external_ids: BTreeSet<VariableId> = BTreeSet::new();
    for comp in order.iter().copied() {
        if !included[comp] {
            continue;
        }
        for i in condensation.components[comp].iter().copied() {
            for dep in equations[i].deps.iter() {
                if external_set.contains(dep) {
                    rate_external_ids.insert(*dep);
                }
            }
        }
        if let Some(step) = comp_step[comp] {
            rate_steps.push(step);
        }
    }

    let mut voi_variable = None;
    let mut states = Vec::new();
    let mut constants = Vec::new();
    let mut computed_constants = Vec::new();
    let mut algebraic = Vec::new();
    for (id, record) in arena.iter() {
        if !classes.is_representative(id) && approx_eq!(f64, scales[id.0], 1.0, ulps = 2) {
            continue;
        }
        if external_set.contains(&id) {
            continue;
        }
        let variable = |role: Role, index: usize, initial: Option<(String, f64)>| AnalysedVariable {
            id,
            component: record.component.clone(),
            name: record.name.clone(),
            units: record.units.clone(),
            role,
            index,
            initial,
        };
        match roles[id.0] {
            Some(Role::VariableOfIntegration) => {
                voi_variable = Some(variable(Role::VariableOfIntegration, 0, None));
            }
            Some(Role::State) => {
                let v = variable(Role::State, states.len(), initials[id.0].clone());
                states.push(v);
            }
            Some(Role::Constant) => {
                let v = variable(Role::Constant, constants.len(), initials[id.0].clone());
                constants.push(v);
            }
            Some(Role::ComputedConstant) => {
                let v = variable(Role::ComputedConstant, computed_constants.len(), None);
                computed_constants.push(v);
            }
            Some(Role::Algebraic) => {
                let v = variable(Role::Algebraic, algebraic.len(), None);
                algebraic.push(v);
            }
            Some(Role::External) | None => {}
        }
    }
    // externals keep designation order, which callers rely on when wiring
    // up their retrieval callbacks
    let externals_list: Vec<AnalysedVariable> = external_reps
        .iter()
        .enumerate()
        .map(|(slot, rep)| {
            let record = arena.get(*rep);
            AnalysedVariable {
                id: *rep,
                component: record.component.clone(),
                name: record.name.clone(),
                units: record.units.clone(),
                role: Role::External,
                index: slot,
                initial: None,
            }
        })
        .collect();
    let external_slot: HashMap<VariableId, usize> = external_reps
        .iter()
        .enumerate()
        .map(|(slot, rep)| (*rep, slot))
        .collect();
    let mut rate_externals: Vec<usize> = rate_external_ids
        .iter()
        .map(|id| external_slot[id])
        .collect();
    rate_externals.sort_unstable();

    Some(AnalyserModel::new(
        model.name.clone(),
        voi_variable,
        states,
        constants,
        computed_constants,
        algebraic,
        externals_list,
        equations,
        systems,
        computed_constant_steps,
        rate_steps,
        variable_steps,
        rate_externals,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::datamodel::{Component, UnitDef, UnitRef, Variable};

    fn op2(op: BinaryOp, l: Expr0, r: Expr0) -> Expr0 {
        Expr0::Op2(op, Box::new(l), Box::new(r))
    }

    fn error_codes(analyser: &Analyser) -> Vec<ErrorCode> {
        analyser.issues().errors().map(|issue| issue.code).collect()
    }

    #[test]
    fn test_classification_and_phases() {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("t", "second"))
                .with_variable(Variable::new("x", "dimensionless").with_initial(2.0))
                .with_variable(Variable::new("c", "dimensionless").with_initial(1.5))
                .with_variable(Variable::new("b", "dimensionless"))
                .with_variable(Variable::new("z", "dimensionless"))
                .with_equation(
                    Expr0::var("b"),
                    op2(BinaryOp::Add, Expr0::var("c"), Expr0::constant(2.0)),
                )
                .with_equation(
                    Expr0::var("z"),
                    op2(BinaryOp::Mul, Expr0::var("x"), Expr0::var("b")),
                )
                .with_equation(Expr0::deriv("x", "t"), Expr0::var("z")),
        );

        let mut analyser = Analyser::new();
        let analysed = analyser.analyse(&model).unwrap();
        assert!(analyser.issues().is_empty());

        assert_eq!("t", analysed.voi.as_ref().unwrap().name);
        assert_eq!(1, analysed.states.len());
        assert_eq!("x", analysed.states[0].name);
        assert_eq!(Some(("2.0".to_owned(), 2.0)), analysed.states[0].initial);
        assert_eq!("c", analysed.constants[0].name);
        assert_eq!("b", analysed.computed_constants[0].name);
        assert_eq!("z", analysed.algebraic[0].name);

        assert_eq!(vec![Step::Equation(0)], analysed.computed_constant_steps);
        assert_eq!(vec![Step::Equation(1)], analysed.variable_steps);
        assert_eq!(
            vec![Step::Equation(1), Step::Equation(2)],
            analysed.rate_steps
        );
        assert_eq!(Some((Role::Algebraic, 0)), analysed.slot(VariableId(4)));
    }

    #[test]
    fn test_literal_equation_folds_to_constant() {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("k", "dimensionless"))
                .with_equation(Expr0::var("k"), Expr0::constant(5.0)),
        );

        let mut analyser = Analyser::new();
        let analysed = analyser.analyse(&model).unwrap();
        assert_eq!(1, analysed.constants.len());
        assert_eq!(Some(("5.0".to_owned(), 5.0)), analysed.constants[0].initial);
        assert!(analysed.computed_constant_steps.is_empty());
        assert!(analysed.variable_steps.is_empty());
    }

    #[test]
    fn test_undefined_variable() {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("x", "dimensionless"))
                .with_variable(Variable::new("y", "dimensionless"))
                .with_equation(
                    Expr0::var("x"),
                    op2(BinaryOp::Add, Expr0::var("y"), Expr0::constant(1.0)),
                ),
        );

        let mut analyser = Analyser::new();
        assert!(analyser.analyse(&model).is_none());
        assert_eq!(vec![ErrorCode::VariableNeverDefined], error_codes(&analyser));
    }

    #[test]
    fn test_under_determined_system() {
        // x = x + y with y otherwise unconstrained: two unknowns, one
        // equation
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("x", "dimensionless"))
                .with_variable(Variable::new("y", "dimensionless"))
                .with_equation(
                    Expr0::var("x"),
                    op2(BinaryOp::Add, Expr0::var("x"), Expr0::var("y")),
                ),
        );

        let mut analyser = Analyser::new();
        assert!(analyser.analyse(&model).is_none());
        assert_eq!(
            vec![ErrorCode::SystemUnderDetermined],
            error_codes(&analyser)
        );
    }

    #[test]
    fn test_over_determined_system() {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("x", "dimensionless"))
                .with_variable(Variable::new("y", "dimensionless"))
                .with_equation(Expr0::var("x"), Expr0::var("y"))
                .with_equation(Expr0::var("y"), Expr0::var("x"))
                .with_equation(
                    Expr0::var("y"),
                    op2(BinaryOp::Add, Expr0::var("x"), Expr0::constant(1.0)),
                ),
        );

        let mut analyser = Analyser::new();
        assert!(analyser.analyse(&model).is_none());
        assert_eq!(
            vec![ErrorCode::SystemOverDetermined],
            error_codes(&analyser)
        );
    }

    #[test]
    fn test_nonlinear_system_is_accepted() {
        // x = y + 1, y = x * x: two equations, two unknowns, one system
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("x", "dimensionless"))
                .with_variable(Variable::new("y", "dimensionless"))
                .with_equation(
                    Expr0::var("x"),
                    op2(BinaryOp::Add, Expr0::var("y"), Expr0::constant(1.0)),
                )
                .with_equation(
                    Expr0::var("y"),
                    op2(BinaryOp::Mul, Expr0::var("x"), Expr0::var("x")),
                ),
        );

        let mut analyser = Analyser::new();
        let analysed = analyser.analyse(&model).unwrap();
        assert_eq!(1, analysed.systems.len());
        assert_eq!(vec![0, 1], analysed.systems[0].equations);
        assert_eq!(
            vec![VariableId(0), VariableId(1)],
            analysed.systems[0].unknowns
        );
        assert_eq!(2, analysed.algebraic.len());
        // a constants-only system is both precomputed and re-evaluable
        assert_eq!(vec![Step::System(0)], analysed.computed_constant_steps);
        assert_eq!(vec![Step::System(0)], analysed.variable_steps);
    }

    #[test]
    fn test_multiple_voi() {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("t1", "second"))
                .with_variable(Variable::new("t2", "second"))
                .with_variable(Variable::new("x", "dimensionless").with_initial(0.0))
                .with_variable(Variable::new("y", "dimensionless").with_initial(0.0))
                .with_equation(Expr0::deriv("x", "t1"), Expr0::constant(1.0))
                .with_equation(Expr0::deriv("y", "t2"), Expr0::constant(1.0)),
        );

        let mut analyser = Analyser::new();
        assert!(analyser.analyse(&model).is_none());
        assert!(error_codes(&analyser).contains(&ErrorCode::MultipleVoi));
    }

    #[test]
    fn test_voi_must_not_be_initialised() {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("t", "second").with_initial(0.0))
                .with_variable(Variable::new("x", "dimensionless").with_initial(0.0))
                .with_equation(Expr0::deriv("x", "t"), Expr0::constant(1.0)),
        );

        let mut analyser = Analyser::new();
        assert!(analyser.analyse(&model).is_none());
        assert!(error_codes(&analyser).contains(&ErrorCode::VoiComputed));
    }

    #[test]
    fn test_state_not_initialised() {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("t", "second"))
                .with_variable(Variable::new("x", "dimensionless"))
                .with_equation(Expr0::deriv("x", "t"), Expr0::constant(1.0)),
        );

        let mut analyser = Analyser::new();
        assert!(analyser.analyse(&model).is_none());
        assert_eq!(vec![ErrorCode::StateNotInitialised], error_codes(&analyser));
    }

    #[test]
    fn test_external_designation_wins_over_equation() {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("x", "dimensionless").with_initial(1.0))
                .with_variable(Variable::new("y", "dimensionless"))
                .with_variable(Variable::new("z", "dimensionless"))
                .with_equation(
                    Expr0::var("y"),
                    op2(BinaryOp::Mul, Expr0::constant(2.0), Expr0::var("x")),
                )
                .with_equation(
                    Expr0::var("z"),
                    op2(BinaryOp::Add, Expr0::var("y"), Expr0::var("x")),
                ),
        );

        let mut analyser = Analyser::new();
        analyser.add_external_variable(VarSpec::new("main", "y"));
        let analysed = analyser.analyse(&model).unwrap();

        assert_eq!(1, analysed.externals.len());
        assert_eq!("y", analysed.externals[0].name);
        assert_eq!(1, analyser.issues().len());
        assert_eq!(
            ErrorCode::ExternalEquationIgnored,
            analyser.issues().iter().next().unwrap().code
        );
        // z reads an external, so it is algebraic, not a computed constant
        assert_eq!("z", analysed.algebraic[0].name);
        assert!(analysed.rate_externals.is_empty());
    }

    #[test]
    fn test_externals_feeding_rates() {
        let model = Model::new("m").with_component(
            Component::new("main")
                .with_variable(Variable::new("t", "second"))
                .with_variable(Variable::new("x", "dimensionless").with_initial(0.0))
                .with_variable(Variable::new("stimulus", "dimensionless"))
                .with_variable(Variable::new("observed", "dimensionless"))
                .with_equation(Expr0::deriv("x", "t"), Expr0::var("stimulus")),
        );

        let mut analyser = Analyser::new();
        analyser.add_external_variable(VarSpec::new("main", "stimulus"));
        analyser.add_external_variable(VarSpec::new("main", "observed"));
        let analysed = analyser.analyse(&model).unwrap();

        assert_eq!(2, analysed.externals.len());
        // only the external the rates actually read is fetched there
        assert_eq!(vec![0], analysed.rate_externals);
        assert_eq!(vec![Step::Equation(0)], analysed.rate_steps);
    }

    #[test]
    fn test_scaled_equivalence_member_keeps_a_slot() {
        let model = Model::new("m")
            .with_units(UnitDef::new(
                "millivolt",
                vec![UnitRef::new("volt").with_prefix(-3)],
            ))
            .with_component(
                Component::new("a").with_variable(Variable::new("v", "volt").with_initial(5.0)),
            )
            .with_component(Component::new("b").with_variable(Variable::new("w", "millivolt")))
            .with_equivalence(VarSpec::new("a", "v"), VarSpec::new("b", "w"));

        let mut analyser = Analyser::new();
        let analysed = analyser.analyse(&model).unwrap();

        assert_eq!("v", analysed.constants[0].name);
        assert_eq!("w", analysed.computed_constants[0].name);
        assert_eq!(1, analysed.equations.len());
        // w = 1000 * v
        assert_eq!(
            Expr::Op2(
                BinaryOp::Mul,
                Box::new(Expr::Const("1000.0".to_owned(), 1000.0)),
                Box::new(Expr::Var(VariableId(0))),
            ),
            analysed.equations[0].rhs
        );
    }

    #[test]
    fn test_alias_equivalence_member_vanishes() {
        let model = Model::new("m")
            .with_component(
                Component::new("a").with_variable(Variable::new("v", "volt").with_initial(5.0)),
            )
            .with_component(Component::new("b").with_variable(Variable::new("w", "volt")))
            .with_equivalence(VarSpec::new("a", "v"), VarSpec::new("b", "w"));

        let mut analyser = Analyser::new();
        let analysed = analyser.analyse(&model).unwrap();

        assert_eq!(1, analysed.constants.len());
        assert!(analysed.equations.is_empty());
        assert!(analysed.computed_constants.is_empty());
    }

    #[test]
    fn test_incompatible_equivalence_units() {
        let model = Model::new("m")
            .with_component(Component::new("a").with_variable(Variable::new("v", "volt")))
            .with_component(Component::new("b").with_variable(Variable::new("w", "second")))
            .with_equivalence(VarSpec::new("a", "v"), VarSpec::new("b", "w"));

        let mut analyser = Analyser::new();
        assert!(analyser.analyse(&model).is_none());
        assert!(error_codes(&analyser).contains(&ErrorCode::UnitsIncompatible));
    }
}
