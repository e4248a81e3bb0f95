// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Generation profiles: everything language-specific about the generated
//! code lives in one plain-data struct of spellings and templates, so a
//! target language is data, not a code path.
//!
//! Templates use square-bracket placeholders (`[CODE]`, `[INDEX]`,
//! `[SIZE]`, `[NAME]`, `[COUNT]` and friends); the generator substitutes
//! them textually.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A complete description of one target language.  Serializable so the
/// whole profile can be fingerprinted: two profiles with the same
/// fingerprint generate byte-identical code for the same model.
#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    pub name: String,
    pub version: String,

    // capabilities
    pub has_interface: bool,
    pub supports_external_variables: bool,
    pub supports_nla_systems: bool,

    // lexical texture
    pub indent: String,
    pub statement_terminator: String,
    /// what to put in a routine that has nothing to do ("pass" for Python)
    pub empty_body: String,
    /// one comment line; `[CODE]` is the comment text
    pub comment: String,
    /// file head: includes or imports; `[INTERFACE]`, `[VERSION]` and
    /// `[FINGERPRINT]` are available
    pub preamble: String,
    /// extra imports pulled in only when the model has algebraic systems
    pub nla_preamble: String,
    pub interface_preamble: String,
    pub interface_file_name: String,

    // operators
    pub eq: String,
    pub neq: String,
    pub lt: String,
    pub leq: String,
    pub gt: String,
    pub geq: String,
    pub and_op: String,
    pub or_op: String,
    pub not_op: String,
    pub power_function: String,
    /// `[COND]`, `[THEN]`, `[ELSE]`
    pub conditional: String,

    // elementary functions, keyed by the model-side function name
    pub builtin_functions: BTreeMap<String, String>,
    pub pi_literal: String,
    pub e_literal: String,

    // data layout
    pub voi_name: String,
    pub states_array: String,
    pub rates_array: String,
    pub constants_array: String,
    pub computed_constants_array: String,
    pub algebraic_array: String,
    pub externals_array: String,

    // declarations; an empty template means the profile doesn't emit it
    /// `[NAME]`, `[COUNT]`
    pub count_template: String,
    pub interface_count_template: String,
    /// `[VERSION]`
    pub version_template: String,
    pub variable_role_type: String,
    pub variable_info_struct: String,
    /// `[NAME]`, `[UNITS]`, `[COMPONENT]`, `[ROLE]`
    pub variable_info_entry: String,
    /// `[CODE]` is a single entry
    pub voi_info_template: String,
    /// `[NAME]` is the array name, `[CODE]` the entry lines
    pub variable_info_array_template: String,
    pub interface_voi_info_template: String,
    /// `[NAME]`
    pub interface_variable_info_array_template: String,
    /// model-side role name to profile spelling, substituted for `[ROLE]`
    pub role_names: BTreeMap<String, String>,

    // array helpers
    /// `[NAME]` is the capitalised array name, `[ARRAY]` the raw spelling,
    /// `[COUNT]` the count constant
    pub create_array_template: String,
    pub interface_create_array_template: String,
    pub delete_array_template: String,
    pub interface_delete_array_template: String,

    // external variables
    pub external_variable_typedef: String,
    /// `[VOI]`, `[STATES]`, `[RATES]`, `[INDEX]`
    pub external_call: String,

    // nonlinear systems
    pub nla_solve_declaration: String,
    pub root_finding_info_struct: String,
    /// `[INDEX]`, `[CODE]`
    pub objective_function_template: String,
    /// `[INDEX]`, `[CODE]`
    pub find_root_template: String,
    /// `[SIZE]`
    pub find_root_prologue: String,
    /// `[INDEX]`, `[SIZE]`
    pub nla_solve_call: String,
    /// `[INDEX]`, `[VOI]`, `[STATES]`, `[RATES]`
    pub find_root_call: String,
    pub unknown_vector: String,
    pub residual_vector: String,
    /// spellings used where a routine has no voi/states/rates in scope
    pub null_pointer: String,
    pub zero_literal: String,

    // routines; `[CODE]` is the body
    pub initialise_function: String,
    pub compute_computed_constants_function: String,
    pub compute_rates_function: String,
    pub compute_rates_function_with_externals: String,
    pub compute_variables_function: String,
    pub compute_variables_function_with_externals: String,

    // interface declarations, one per routine
    pub interface_initialise: String,
    pub interface_compute_computed_constants: String,
    pub interface_compute_rates: String,
    pub interface_compute_rates_with_externals: String,
    pub interface_compute_variables: String,
    pub interface_compute_variables_with_externals: String,
}

impl Profile {
    /// SHA-256 over the serialized profile.  Emitted into generated files
    /// so a reader can tell exactly which profile produced them.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("profiles are plain serializable data");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    /// The C profile: a header/implementation pair, C99 plus the standard
    /// maths library.
    pub fn c() -> Self {
        let builtin_functions: BTreeMap<String, String> = [
            ("abs", "fabs"),
            ("ceil", "ceil"),
            ("floor", "floor"),
            ("sqrt", "sqrt"),
            ("exp", "exp"),
            ("ln", "log"),
            ("log10", "log10"),
            ("sin", "sin"),
            ("cos", "cos"),
            ("tan", "tan"),
            ("arcsin", "asin"),
            ("arccos", "acos"),
            ("arctan", "atan"),
            ("min", "fmin"),
            ("max", "fmax"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let role_names: BTreeMap<String, String> = [
            ("variable_of_integration", "VARIABLE_OF_INTEGRATION"),
            ("state", "STATE"),
            ("constant", "CONSTANT"),
            ("computed_constant", "COMPUTED_CONSTANT"),
            ("algebraic", "ALGEBRAIC"),
            ("external", "EXTERNAL"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        Profile {
            name: "c".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),

            has_interface: true,
            supports_external_variables: true,
            supports_nla_systems: true,

            indent: "    ".to_owned(),
            statement_terminator: ";".to_owned(),
            empty_body: String::new(),
            comment: "/* [CODE] */".to_owned(),
            preamble: "/* Generated with the [NAME] profile [FINGERPRINT], v[VERSION]. */\n\n#include \"[INTERFACE]\"\n\n#include <math.h>\n#include <stdlib.h>\n"
                .to_owned(),
            nla_preamble: String::new(),
            interface_preamble: "/* Generated with the [NAME] profile [FINGERPRINT], v[VERSION]. */\n\n#pragma once\n\n#include <stddef.h>\n"
                .to_owned(),
            interface_file_name: "model.h".to_owned(),

            eq: "==".to_owned(),
            neq: "!=".to_owned(),
            lt: "<".to_owned(),
            leq: "<=".to_owned(),
            gt: ">".to_owned(),
            geq: ">=".to_owned(),
            and_op: "&&".to_owned(),
            or_op: "||".to_owned(),
            not_op: "!".to_owned(),
            power_function: "pow".to_owned(),
            conditional: "([COND]) ? [THEN] : [ELSE]".to_owned(),

            builtin_functions,
            pi_literal: "3.14159265358979323846".to_owned(),
            e_literal: "2.71828182845904523536".to_owned(),

            voi_name: "voi".to_owned(),
            states_array: "states".to_owned(),
            rates_array: "rates".to_owned(),
            constants_array: "constants".to_owned(),
            computed_constants_array: "computedConstants".to_owned(),
            algebraic_array: "algebraic".to_owned(),
            externals_array: "externals".to_owned(),

            count_template: "const size_t [NAME]_COUNT = [COUNT];\n".to_owned(),
            interface_count_template: "extern const size_t [NAME]_COUNT;\n".to_owned(),
            version_template: "const char VERSION[] = \"[VERSION]\";\n".to_owned(),
            variable_role_type: "typedef enum {\n    VARIABLE_OF_INTEGRATION,\n    STATE,\n    CONSTANT,\n    COMPUTED_CONSTANT,\n    ALGEBRAIC,\n    EXTERNAL\n} VariableRole;\n"
                .to_owned(),
            variable_info_struct: "typedef struct {\n    const char *name;\n    const char *units;\n    const char *component;\n    VariableRole role;\n} VariableInfo;\n"
                .to_owned(),
            variable_info_entry: "{\"[NAME]\", \"[UNITS]\", \"[COMPONENT]\", [ROLE]}".to_owned(),
            voi_info_template: "const VariableInfo VOI_INFO = [CODE];\n".to_owned(),
            variable_info_array_template: "const VariableInfo [NAME][] = {\n[CODE]};\n".to_owned(),
            interface_voi_info_template: "extern const VariableInfo VOI_INFO;\n".to_owned(),
            interface_variable_info_array_template: "extern const VariableInfo [NAME][];\n"
                .to_owned(),
            role_names,

            create_array_template: "double * create[NAME]Array()\n{\n    double *res = (double *) malloc([COUNT]*sizeof(double));\n\n    for (size_t i = 0; i < [COUNT]; ++i) {\n        res[i] = NAN;\n    }\n\n    return res;\n}\n"
                .to_owned(),
            interface_create_array_template: "double * create[NAME]Array();\n".to_owned(),
            delete_array_template: "void deleteArray(double *array)\n{\n    free(array);\n}\n"
                .to_owned(),
            interface_delete_array_template: "void deleteArray(double *array);\n".to_owned(),

            external_variable_typedef: "typedef double (* ExternalVariable)(double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals, size_t index);\n"
                .to_owned(),
            external_call: "externalVariable([VOI], [STATES], [RATES], constants, computedConstants, algebraic, externals, [INDEX])"
                .to_owned(),

            nla_solve_declaration: "extern void nlaSolve(void (*objectiveFunction)(double *, double *, void *), double *u, size_t n, void *data);\n"
                .to_owned(),
            root_finding_info_struct: "typedef struct {\n    double voi;\n    double *states;\n    double *rates;\n    double *constants;\n    double *computedConstants;\n    double *algebraic;\n    double *externals;\n} RootFindingInfo;\n"
                .to_owned(),
            objective_function_template: "void objectiveFunction[INDEX](double *u, double *f, void *data)\n{\n    double voi = ((RootFindingInfo *) data)->voi;\n    double *states = ((RootFindingInfo *) data)->states;\n    double *rates = ((RootFindingInfo *) data)->rates;\n    double *constants = ((RootFindingInfo *) data)->constants;\n    double *computedConstants = ((RootFindingInfo *) data)->computedConstants;\n    double *algebraic = ((RootFindingInfo *) data)->algebraic;\n    double *externals = ((RootFindingInfo *) data)->externals;\n\n[CODE]}\n"
                .to_owned(),
            find_root_template: "void findRoot[INDEX](double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals)\n{\n[CODE]}\n"
                .to_owned(),
            find_root_prologue: "RootFindingInfo rfi = { voi, states, rates, constants, computedConstants, algebraic, externals };\ndouble u[[SIZE]];\n"
                .to_owned(),
            nla_solve_call: "nlaSolve(objectiveFunction[INDEX], u, [SIZE], &rfi)".to_owned(),
            find_root_call: "findRoot[INDEX]([VOI], [STATES], [RATES], constants, computedConstants, algebraic, externals)"
                .to_owned(),
            unknown_vector: "u".to_owned(),
            residual_vector: "f".to_owned(),
            null_pointer: "NULL".to_owned(),
            zero_literal: "0.0".to_owned(),

            initialise_function: "void initialiseVariables(double *states, double *rates, double *constants, double *computedConstants, double *algebraic)\n{\n[CODE]}\n"
                .to_owned(),
            compute_computed_constants_function: "void computeComputedConstants(double *constants, double *computedConstants, double *algebraic, double *externals)\n{\n[CODE]}\n"
                .to_owned(),
            compute_rates_function: "void computeRates(double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals)\n{\n[CODE]}\n"
                .to_owned(),
            compute_rates_function_with_externals: "void computeRates(double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals, ExternalVariable externalVariable)\n{\n[CODE]}\n"
                .to_owned(),
            compute_variables_function: "void computeVariables(double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals)\n{\n[CODE]}\n"
                .to_owned(),
            compute_variables_function_with_externals: "void computeVariables(double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals, ExternalVariable externalVariable)\n{\n[CODE]}\n"
                .to_owned(),

            interface_initialise: "void initialiseVariables(double *states, double *rates, double *constants, double *computedConstants, double *algebraic);\n"
                .to_owned(),
            interface_compute_computed_constants: "void computeComputedConstants(double *constants, double *computedConstants, double *algebraic, double *externals);\n"
                .to_owned(),
            interface_compute_rates: "void computeRates(double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals);\n"
                .to_owned(),
            interface_compute_rates_with_externals: "void computeRates(double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals, ExternalVariable externalVariable);\n"
                .to_owned(),
            interface_compute_variables: "void computeVariables(double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals);\n"
                .to_owned(),
            interface_compute_variables_with_externals: "void computeVariables(double voi, double *states, double *rates, double *constants, double *computedConstants, double *algebraic, double *externals, ExternalVariable externalVariable);\n"
                .to_owned(),
        }
    }

    /// The Python profile: a single module, `from math import *` plus an
    /// `nla_solve` import when the model has algebraic systems.
    pub fn python() -> Self {
        let builtin_functions: BTreeMap<String, String> = [
            ("abs", "fabs"),
            ("ceil", "ceil"),
            ("floor", "floor"),
            ("sqrt", "sqrt"),
            ("exp", "exp"),
            ("ln", "log"),
            ("log10", "log10"),
            ("sin", "sin"),
            ("cos", "cos"),
            ("tan", "tan"),
            ("arcsin", "asin"),
            ("arccos", "acos"),
            ("arctan", "atan"),
            ("min", "min"),
            ("max", "max"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let role_names: BTreeMap<String, String> = [
            ("variable_of_integration", "\"variable_of_integration\""),
            ("state", "\"state\""),
            ("constant", "\"constant\""),
            ("computed_constant", "\"computed_constant\""),
            ("algebraic", "\"algebraic\""),
            ("external", "\"external\""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        Profile {
            name: "python".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),

            has_interface: false,
            supports_external_variables: true,
            supports_nla_systems: true,

            indent: "    ".to_owned(),
            statement_terminator: String::new(),
            empty_body: "pass".to_owned(),
            comment: "# [CODE]".to_owned(),
            preamble: "# Generated with the [NAME] profile [FINGERPRINT], v[VERSION].\n\nfrom math import *\n"
                .to_owned(),
            nla_preamble: "from nlasolver import nla_solve\n".to_owned(),
            interface_preamble: String::new(),
            interface_file_name: String::new(),

            eq: "==".to_owned(),
            neq: "!=".to_owned(),
            lt: "<".to_owned(),
            leq: "<=".to_owned(),
            gt: ">".to_owned(),
            geq: ">=".to_owned(),
            and_op: "and".to_owned(),
            or_op: "or".to_owned(),
            not_op: "not ".to_owned(),
            power_function: "pow".to_owned(),
            conditional: "[THEN] if [COND] else [ELSE]".to_owned(),

            builtin_functions,
            pi_literal: "pi".to_owned(),
            e_literal: "e".to_owned(),

            voi_name: "voi".to_owned(),
            states_array: "states".to_owned(),
            rates_array: "rates".to_owned(),
            constants_array: "constants".to_owned(),
            computed_constants_array: "computed_constants".to_owned(),
            algebraic_array: "algebraic".to_owned(),
            externals_array: "externals".to_owned(),

            count_template: "[NAME]_COUNT = [COUNT]\n".to_owned(),
            interface_count_template: String::new(),
            version_template: "__version__ = \"[VERSION]\"\n".to_owned(),
            variable_role_type: String::new(),
            variable_info_struct: String::new(),
            variable_info_entry: "{\"name\": \"[NAME]\", \"units\": \"[UNITS]\", \"component\": \"[COMPONENT]\", \"role\": [ROLE]}"
                .to_owned(),
            voi_info_template: "VOI_INFO = [CODE]\n".to_owned(),
            variable_info_array_template: "[NAME] = [\n[CODE]]\n".to_owned(),
            interface_voi_info_template: String::new(),
            interface_variable_info_array_template: String::new(),
            role_names,

            create_array_template: "def create_[ARRAY]_array():\n    return [nan]*[COUNT]\n"
                .to_owned(),
            interface_create_array_template: String::new(),
            delete_array_template: String::new(),
            interface_delete_array_template: String::new(),

            external_variable_typedef: String::new(),
            external_call: "external_variable([VOI], [STATES], [RATES], constants, computed_constants, algebraic, externals, [INDEX])"
                .to_owned(),

            nla_solve_declaration: String::new(),
            root_finding_info_struct: String::new(),
            objective_function_template: "def objective_function_[INDEX](u, f, data):\n    (voi, states, rates, constants, computed_constants, algebraic, externals) = data\n\n[CODE]\n"
                .to_owned(),
            find_root_template: "def find_root_[INDEX](voi, states, rates, constants, computed_constants, algebraic, externals):\n[CODE]\n"
                .to_owned(),
            find_root_prologue: "data = (voi, states, rates, constants, computed_constants, algebraic, externals)\nu = [nan]*[SIZE]\n"
                .to_owned(),
            nla_solve_call: "u = nla_solve(objective_function_[INDEX], u, [SIZE], data)".to_owned(),
            find_root_call: "find_root_[INDEX]([VOI], [STATES], [RATES], constants, computed_constants, algebraic, externals)"
                .to_owned(),
            unknown_vector: "u".to_owned(),
            residual_vector: "f".to_owned(),
            null_pointer: "None".to_owned(),
            zero_literal: "0.0".to_owned(),

            initialise_function: "def initialise_variables(states, rates, constants, computed_constants, algebraic):\n[CODE]\n"
                .to_owned(),
            compute_computed_constants_function: "def compute_computed_constants(constants, computed_constants, algebraic, externals):\n[CODE]\n"
                .to_owned(),
            compute_rates_function: "def compute_rates(voi, states, rates, constants, computed_constants, algebraic, externals):\n[CODE]\n"
                .to_owned(),
            compute_rates_function_with_externals: "def compute_rates(voi, states, rates, constants, computed_constants, algebraic, externals, external_variable):\n[CODE]\n"
                .to_owned(),
            compute_variables_function: "def compute_variables(voi, states, rates, constants, computed_constants, algebraic, externals):\n[CODE]\n"
                .to_owned(),
            compute_variables_function_with_externals: "def compute_variables(voi, states, rates, constants, computed_constants, algebraic, externals, external_variable):\n[CODE]\n"
                .to_owned(),

            interface_initialise: String::new(),
            interface_compute_computed_constants: String::new(),
            interface_compute_rates: String::new(),
            interface_compute_rates_with_externals: String::new(),
            interface_compute_variables: String::new(),
            interface_compute_variables_with_externals: String::new(),
        }
    }
}
