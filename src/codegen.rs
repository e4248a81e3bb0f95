// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Code generation: turns an `AnalyserModel` into source text under a
//! `Profile`.  Generation is pure text assembly; given the same model and
//! profile the output is byte-identical, which callers rely on for
//! regeneration-diffing.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::builtins::BuiltinFn;
use crate::common::{ErrorCode, Issue, IssueKind};
use crate::equation::Target;
use crate::equivalence::VariableId;
use crate::model::{AnalysedVariable, AnalyserModel, Role, Step};
use crate::profile::Profile;

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedCode {
    /// the declarations file, for profiles that split interface from
    /// implementation
    pub interface: Option<String>,
    pub implementation: String,
}

/// Substitutes `[KEY]` placeholders in a profile template.
fn fill(template: &str, subs: &[(&str, &str)]) -> String {
    let mut out = template.to_owned();
    for (key, value) in subs {
        out = out.replace(key, value);
    }
    out
}

fn capitalise_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn op2_prec(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq | BinaryOp::Neq => 3,
        BinaryOp::Gt | BinaryOp::Lt | BinaryOp::Gte | BinaryOp::Lte => 4,
        BinaryOp::Add | BinaryOp::Sub => 5,
        BinaryOp::Mul | BinaryOp::Div => 6,
        // spelled as a function call, never as an infix operator
        BinaryOp::Exp => 8,
    }
}

struct Writer<'a> {
    model: &'a AnalyserModel,
    profile: &'a Profile,
}

impl<'a> Writer<'a> {
    fn array_ref(&self, array: &str, index: usize) -> String {
        format!("{array}[{index}]")
    }

    fn var_ref(&self, id: VariableId) -> String {
        let Some((role, index)) = self.model.slot(id) else {
            unreachable!("analysed models classify every referenced variable")
        };
        match role {
            Role::VariableOfIntegration => self.profile.voi_name.clone(),
            Role::State => self.array_ref(&self.profile.states_array, index),
            Role::Constant => self.array_ref(&self.profile.constants_array, index),
            Role::ComputedConstant => self.array_ref(&self.profile.computed_constants_array, index),
            Role::Algebraic => self.array_ref(&self.profile.algebraic_array, index),
            Role::External => self.array_ref(&self.profile.externals_array, index),
        }
    }

    fn target_ref(&self, target: Target) -> String {
        match target {
            Target::Variable(id) => self.var_ref(id),
            Target::Derivative(id) => {
                let Some((Role::State, index)) = self.model.slot(id) else {
                    unreachable!("rate targets are states")
                };
                self.array_ref(&self.profile.rates_array, index)
            }
        }
    }

    fn op2_spelling(&self, op: BinaryOp) -> &str {
        match op {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => self.profile.eq.as_str(),
            BinaryOp::Neq => self.profile.neq.as_str(),
            BinaryOp::Lt => self.profile.lt.as_str(),
            BinaryOp::Lte => self.profile.leq.as_str(),
            BinaryOp::Gt => self.profile.gt.as_str(),
            BinaryOp::Gte => self.profile.geq.as_str(),
            BinaryOp::And => self.profile.and_op.as_str(),
            BinaryOp::Or => self.profile.or_op.as_str(),
            BinaryOp::Exp => unreachable!("power is spelled as a call"),
        }
    }

    /// Renders `e`, parenthesising it when its precedence is below what
    /// the surrounding context requires.
    fn expr(&self, e: &Expr, min_prec: u8) -> String {
        let (text, prec) = match e {
            Expr::Const(text, _) => (text.clone(), 8),
            Expr::Var(id) => (self.var_ref(*id), 8),
            Expr::Op1(op, a) => {
                let spelling = match op {
                    UnaryOp::Positive => "+",
                    UnaryOp::Negative => "-",
                    UnaryOp::Not => self.profile.not_op.as_str(),
                };
                (format!("{}{}", spelling, self.expr(a, 8)), 7)
            }
            Expr::Op2(BinaryOp::Exp, l, r) => (
                format!(
                    "{}({}, {})",
                    self.profile.power_function,
                    self.expr(l, 0),
                    self.expr(r, 0)
                ),
                8,
            ),
            Expr::Op2(op, l, r) => {
                let p = op2_prec(*op);
                (
                    format!(
                        "{} {} {}",
                        self.expr(l, p),
                        self.op2_spelling(*op),
                        self.expr(r, p + 1)
                    ),
                    p,
                )
            }
            Expr::App(builtin) => match builtin {
                BuiltinFn::Pi => (self.profile.pi_literal.clone(), 8),
                BuiltinFn::E => (self.profile.e_literal.clone(), 8),
                _ => {
                    let name = self
                        .profile
                        .builtin_functions
                        .get(builtin.name())
                        .map(String::as_str)
                        .unwrap_or_else(|| builtin.name());
                    let args: Vec<String> =
                        builtin.args().iter().map(|a| self.expr(a, 0)).collect();
                    (format!("{}({})", name, args.join(", ")), 8)
                }
            },
            Expr::If(cond, t, f) => (
                fill(
                    &self.profile.conditional,
                    &[
                        ("[COND]", self.expr(cond, 0).as_str()),
                        ("[THEN]", self.expr(t, 0).as_str()),
                        ("[ELSE]", self.expr(f, 0).as_str()),
                    ],
                ),
                0,
            ),
        };
        if prec < min_prec {
            format!("({text})")
        } else {
            text
        }
    }

    fn line(&self, text: &str) -> String {
        format!(
            "{}{}{}\n",
            self.profile.indent, text, self.profile.statement_terminator
        )
    }

    fn assign(&self, lhs: &str, rhs: &str) -> String {
        self.line(&format!("{lhs} = {rhs}"))
    }

    fn equation_step(&self, i: usize) -> String {
        let eq = &self.model.equations[i];
        self.assign(&self.target_ref(eq.target), &self.expr(&eq.rhs, 0))
    }

    fn external_fetch(&self, slot: usize, voi: &str, states: &str, rates: &str) -> String {
        let call = fill(
            &self.profile.external_call,
            &[
                ("[VOI]", voi),
                ("[STATES]", states),
                ("[RATES]", rates),
                ("[INDEX]", slot.to_string().as_str()),
            ],
        );
        self.assign(&self.array_ref(&self.profile.externals_array, slot), &call)
    }

    fn find_root_step(&self, system: usize, voi: &str, states: &str, rates: &str) -> String {
        let call = fill(
            &self.profile.find_root_call,
            &[
                ("[INDEX]", system.to_string().as_str()),
                ("[VOI]", voi),
                ("[STATES]", states),
                ("[RATES]", rates),
            ],
        );
        self.line(&call)
    }

    fn step(&self, step: Step, voi: &str, states: &str, rates: &str) -> String {
        match step {
            Step::Equation(i) => self.equation_step(i),
            Step::System(s) => self.find_root_step(s, voi, states, rates),
        }
    }

    fn routine(&self, template: &str, body: String) -> String {
        let body = if body.is_empty() && !self.profile.empty_body.is_empty() {
            self.line(&self.profile.empty_body)
        } else {
            body
        };
        fill(template, &[("[CODE]", body.as_str())])
    }

    fn objective_function(&self, s: usize) -> String {
        let system = &self.model.systems[s];
        let mut body = String::new();
        for (k, unknown) in system.unknowns.iter().enumerate() {
            body.push_str(&self.assign(
                &self.var_ref(*unknown),
                &self.array_ref(&self.profile.unknown_vector, k),
            ));
        }
        body.push('\n');
        for (k, eq_idx) in system.equations.iter().enumerate() {
            let rhs = self.expr(&self.model.equations[*eq_idx].rhs, 0);
            body.push_str(&self.assign(
                &self.array_ref(&self.profile.residual_vector, k),
                &format!("{} - ({})", self.var_ref(system.unknowns[k]), rhs),
            ));
        }
        fill(
            &self.profile.objective_function_template,
            &[("[INDEX]", s.to_string().as_str()), ("[CODE]", body.as_str())],
        )
    }

    fn find_root(&self, s: usize) -> String {
        let system = &self.model.systems[s];
        let size = system.unknowns.len().to_string();
        let mut body = String::new();
        let prologue = fill(&self.profile.find_root_prologue, &[("[SIZE]", size.as_str())]);
        for line in prologue.lines() {
            body.push_str(&format!("{}{line}\n", self.profile.indent));
        }
        body.push('\n');
        for (k, unknown) in system.unknowns.iter().enumerate() {
            body.push_str(&self.assign(
                &self.array_ref(&self.profile.unknown_vector, k),
                &self.var_ref(*unknown),
            ));
        }
        body.push('\n');
        let solve = fill(
            &self.profile.nla_solve_call,
            &[("[INDEX]", s.to_string().as_str()), ("[SIZE]", size.as_str())],
        );
        body.push_str(&self.line(&solve));
        body.push('\n');
        for (k, unknown) in system.unknowns.iter().enumerate() {
            body.push_str(&self.assign(
                &self.var_ref(*unknown),
                &self.array_ref(&self.profile.unknown_vector, k),
            ));
        }
        fill(
            &self.profile.find_root_template,
            &[("[INDEX]", s.to_string().as_str()), ("[CODE]", body.as_str())],
        )
    }

    fn info_entry(&self, v: &AnalysedVariable) -> String {
        let role_name = v.role.to_string();
        let role = self
            .profile
            .role_names
            .get(&role_name)
            .map(String::as_str)
            .unwrap_or(role_name.as_str());
        fill(
            &self.profile.variable_info_entry,
            &[
                ("[NAME]", v.name.as_str()),
                ("[UNITS]", v.units.as_str()),
                ("[COMPONENT]", v.component.as_str()),
                ("[ROLE]", role),
            ],
        )
    }

    fn info_array(&self, name: &str, list: &[AnalysedVariable]) -> String {
        let mut code = String::new();
        for v in list.iter() {
            code.push_str(&format!("{}{},\n", self.profile.indent, self.info_entry(v)));
        }
        fill(
            &self.profile.variable_info_array_template,
            &[("[NAME]", name), ("[CODE]", code.as_str())],
        )
    }
}

/// The count constants and per-role metadata arrays share one naming
/// scheme, derived from the role spellings.
fn count_names(model: &AnalyserModel) -> Vec<(&'static str, usize)> {
    let mut names = vec![
        ("STATE", model.states.len()),
        ("CONSTANT", model.constants.len()),
        ("COMPUTED_CONSTANT", model.computed_constants.len()),
        ("ALGEBRAIC", model.algebraic.len()),
    ];
    if model.has_externals() {
        names.push(("EXTERNAL", model.externals.len()));
    }
    names
}

fn array_spellings<'a>(model: &AnalyserModel, profile: &'a Profile) -> Vec<(&'a str, &'static str)> {
    let mut arrays = vec![
        (profile.states_array.as_str(), "STATE_COUNT"),
        (profile.constants_array.as_str(), "CONSTANT_COUNT"),
        (profile.computed_constants_array.as_str(), "COMPUTED_CONSTANT_COUNT"),
        (profile.algebraic_array.as_str(), "ALGEBRAIC_COUNT"),
    ];
    if model.has_externals() {
        arrays.push((profile.externals_array.as_str(), "EXTERNAL_COUNT"));
    }
    arrays
}

pub fn generate(model: &AnalyserModel, profile: &Profile) -> Result<GeneratedCode, Issue> {
    if model.has_externals() && !profile.supports_external_variables {
        return Err(Issue::error(
            IssueKind::Profile,
            ErrorCode::ProfileCapabilityMissing,
            &profile.name,
            format!(
                "profile '{}' cannot express external variables",
                profile.name
            ),
        ));
    }
    if model.has_systems() && !profile.supports_nla_systems {
        return Err(Issue::error(
            IssueKind::Profile,
            ErrorCode::ProfileCapabilityMissing,
            &profile.name,
            format!(
                "profile '{}' cannot express nonlinear algebraic systems",
                profile.name
            ),
        ));
    }

    let w = Writer { model, profile };
    let fingerprint = profile.fingerprint();
    let head_subs: Vec<(&str, &str)> = vec![
        ("[NAME]", profile.name.as_str()),
        ("[FINGERPRINT]", fingerprint.as_str()),
        ("[VERSION]", profile.version.as_str()),
        ("[INTERFACE]", profile.interface_file_name.as_str()),
    ];

    let mut parts: Vec<String> = Vec::new();

    let mut preamble = fill(&profile.preamble, &head_subs);
    if model.has_systems() {
        preamble.push_str(&profile.nla_preamble);
    }
    parts.push(preamble);

    parts.push(fill(
        &profile.version_template,
        &[("[VERSION]", profile.version.as_str())],
    ));

    let mut counts = String::new();
    for (name, count) in count_names(model) {
        counts.push_str(&fill(
            &profile.count_template,
            &[("[NAME]", name), ("[COUNT]", count.to_string().as_str())],
        ));
    }
    parts.push(counts);

    // profiles without a separate interface carry their type definitions
    // in the implementation
    if !profile.has_interface {
        parts.push(profile.variable_role_type.clone());
        parts.push(profile.variable_info_struct.clone());
        if model.has_externals() {
            parts.push(profile.external_variable_typedef.clone());
        }
    }

    if let Some(voi) = &model.voi {
        parts.push(fill(
            &profile.voi_info_template,
            &[("[CODE]", w.info_entry(voi).as_str())],
        ));
    }
    let info_arrays = [
        ("STATE_INFO", &model.states),
        ("CONSTANT_INFO", &model.constants),
        ("COMPUTED_CONSTANT_INFO", &model.computed_constants),
        ("ALGEBRAIC_INFO", &model.algebraic),
        ("EXTERNAL_INFO", &model.externals),
    ];
    for (name, list) in info_arrays {
        if !list.is_empty() {
            parts.push(w.info_array(name, list));
        }
    }

    if model.has_systems() {
        parts.push(profile.nla_solve_declaration.clone());
        parts.push(profile.root_finding_info_struct.clone());
        for s in 0..model.systems.len() {
            parts.push(w.objective_function(s));
            parts.push(w.find_root(s));
        }
    }

    if !profile.create_array_template.is_empty() {
        for (array, count) in array_spellings(model, profile) {
            parts.push(fill(
                &profile.create_array_template,
                &[
                    ("[NAME]", capitalise_first(array).as_str()),
                    ("[ARRAY]", array),
                    ("[COUNT]", count),
                ],
            ));
        }
    }
    parts.push(profile.delete_array_template.clone());

    let mut initialise = String::new();
    for constant in model.constants.iter() {
        if let Some((text, _)) = &constant.initial {
            initialise.push_str(&w.assign(
                &w.array_ref(&profile.constants_array, constant.index),
                text,
            ));
        }
    }
    for state in model.states.iter() {
        if let Some((text, _)) = &state.initial {
            initialise.push_str(&w.assign(&w.array_ref(&profile.states_array, state.index), text));
        }
    }
    parts.push(w.routine(&profile.initialise_function, initialise));

    // no voi, states or rates are in scope when precomputing constants;
    // the root-finder calls get the profile's null spellings instead
    let mut computed_constants = String::new();
    for step in model.computed_constant_steps.iter() {
        computed_constants.push_str(&w.step(
            *step,
            &profile.zero_literal,
            &profile.null_pointer,
            &profile.null_pointer,
        ));
    }
    parts.push(w.routine(
        &profile.compute_computed_constants_function,
        computed_constants,
    ));

    let mut rates = String::new();
    for slot in model.rate_externals.iter() {
        rates.push_str(&w.external_fetch(
            *slot,
            &profile.voi_name,
            &profile.states_array,
            &profile.rates_array,
        ));
    }
    if !model.rate_externals.is_empty() && !model.rate_steps.is_empty() {
        rates.push('\n');
    }
    for step in model.rate_steps.iter() {
        rates.push_str(&w.step(
            *step,
            &profile.voi_name,
            &profile.states_array,
            &profile.rates_array,
        ));
    }
    let rates_template = if model.rate_externals.is_empty() {
        &profile.compute_rates_function
    } else {
        &profile.compute_rates_function_with_externals
    };
    parts.push(w.routine(rates_template, rates));

    // the variables routine is valid standalone: it refreshes every
    // external and re-evaluates every algebraic step
    let mut variables = String::new();
    for slot in 0..model.externals.len() {
        variables.push_str(&w.external_fetch(
            slot,
            &profile.voi_name,
            &profile.states_array,
            &profile.rates_array,
        ));
    }
    if !model.externals.is_empty() && !model.variable_steps.is_empty() {
        variables.push('\n');
    }
    for step in model.variable_steps.iter() {
        variables.push_str(&w.step(
            *step,
            &profile.voi_name,
            &profile.states_array,
            &profile.rates_array,
        ));
    }
    let variables_template = if model.has_externals() {
        &profile.compute_variables_function_with_externals
    } else {
        &profile.compute_variables_function
    };
    parts.push(w.routine(variables_template, variables));

    let implementation = join_parts(parts);

    let interface = profile.has_interface.then(|| {
        let mut parts: Vec<String> = Vec::new();
        parts.push(fill(&profile.interface_preamble, &head_subs));

        let mut counts = String::new();
        for (name, _) in count_names(model) {
            counts.push_str(&fill(&profile.interface_count_template, &[("[NAME]", name)]));
        }
        parts.push(counts);

        parts.push(profile.variable_role_type.clone());
        parts.push(profile.variable_info_struct.clone());
        if model.has_externals() {
            parts.push(profile.external_variable_typedef.clone());
        }

        let mut info = String::new();
        if model.voi.is_some() {
            info.push_str(&profile.interface_voi_info_template);
        }
        for (name, list) in info_arrays {
            if !list.is_empty() {
                info.push_str(&fill(
                    &profile.interface_variable_info_array_template,
                    &[("[NAME]", name)],
                ));
            }
        }
        parts.push(info);

        let mut helpers = String::new();
        if !profile.interface_create_array_template.is_empty() {
            for (array, _) in array_spellings(model, profile) {
                helpers.push_str(&fill(
                    &profile.interface_create_array_template,
                    &[("[NAME]", capitalise_first(array).as_str()), ("[ARRAY]", array)],
                ));
            }
        }
        helpers.push_str(&profile.interface_delete_array_template);
        parts.push(helpers);

        let mut routines = String::new();
        routines.push_str(&profile.interface_initialise);
        routines.push_str(&profile.interface_compute_computed_constants);
        routines.push_str(if model.rate_externals.is_empty() {
            &profile.interface_compute_rates
        } else {
            &profile.interface_compute_rates_with_externals
        });
        routines.push_str(if model.has_externals() {
            &profile.interface_compute_variables_with_externals
        } else {
            &profile.interface_compute_variables
        });
        parts.push(routines);

        join_parts(parts)
    });

    Ok(GeneratedCode {
        interface,
        implementation,
    })
}

fn join_parts(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
