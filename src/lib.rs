// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! odegen analyses validated mathematical models (components, variables,
//! equations and cross-component equivalences) and generates procedural
//! code that evaluates them, in the language described by a generation
//! profile.

#![forbid(unsafe_code)]

pub mod ast;
mod builtins;
pub mod common;
pub mod datamodel;
mod equation;
mod equivalence;
mod graph;
mod units;

mod analyser;
mod codegen;
mod model;
mod profile;

pub use self::analyser::Analyser;
pub use self::builtins::BuiltinFn;
pub use self::codegen::{generate, GeneratedCode};
pub use self::common::{ErrorCode, Ident, Issue, IssueKind, IssueLog, Severity};
pub use self::equation::{Equation, Target};
pub use self::equivalence::VariableId;
pub use self::model::{AlgebraicSystem, AnalysedVariable, AnalyserModel, Role, Step};
pub use self::profile::Profile;
pub use self::units::{CanonicalUnit, UnitMap, UnitTable};
