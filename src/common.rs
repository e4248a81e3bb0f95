// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

use serde::Serialize;

/// Identifiers arrive from an already-validated model object graph, so we
/// don't carry a raw/canonical distinction the way a parser front-end would.
pub type Ident = String;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    NoError, // will never be produced
    VariableNeverDefined,
    VariableRedefined,
    MalformedEquationTarget,
    MisplacedDerivative,
    BadInitialValue,
    StateNotInitialised,
    MultipleVoi,
    VoiComputed,
    UnknownVariable,
    UnknownUnit,
    CyclicUnitDefinition,
    UnitsIncompatible,
    SystemUnderDetermined,
    SystemOverDetermined,
    ProfileCapabilityMissing,
    ExternalEquationIgnored,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            VariableNeverDefined => "variable_never_defined",
            VariableRedefined => "variable_redefined",
            MalformedEquationTarget => "malformed_equation_target",
            MisplacedDerivative => "misplaced_derivative",
            BadInitialValue => "bad_initial_value",
            StateNotInitialised => "state_not_initialised",
            MultipleVoi => "multiple_voi",
            VoiComputed => "voi_computed",
            UnknownVariable => "unknown_variable",
            UnknownUnit => "unknown_unit",
            CyclicUnitDefinition => "cyclic_unit_definition",
            UnitsIncompatible => "units_incompatible",
            SystemUnderDetermined => "system_under_determined",
            SystemOverDetermined => "system_over_determined",
            ProfileCapabilityMissing => "profile_capability_missing",
            ExternalEquationIgnored => "external_equation_ignored",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    Structural,
    Unit,
    System,
    Profile,
}

/// A single diagnosis against the model under analysis.  Issues are
/// accumulated, not thrown: one run surfaces every problem at once.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub code: ErrorCode,
    /// the offending entity, as "component.variable", a unit name, or a
    /// profile name
    pub entity: String,
    pub message: String,
}

impl Issue {
    pub fn error(kind: IssueKind, code: ErrorCode, entity: &str, message: String) -> Self {
        Issue {
            severity: Severity::Error,
            kind,
            code,
            entity: entity.to_owned(),
            message,
        }
    }

    pub fn warning(kind: IssueKind, code: ErrorCode, entity: &str, message: String) -> Self {
        Issue {
            severity: Severity::Warning,
            kind,
            code,
            entity: entity.to_owned(),
            message,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        };
        write!(
            f,
            "{}[{}] '{}': {}",
            severity, self.code, self.entity, self.message
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IssueLog {
    issues: Vec<Issue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn clear(&mut self) {
        self.issues.clear();
    }
}

/// Errors produced by the unit algebra; callers fold these into the issue
/// log with `IssueKind::Unit`.
#[derive(Clone, Debug, PartialEq)]
pub enum UnitError {
    Unknown(Ident),
    Cyclic(Ident),
    Incompatible {
        from: Ident,
        to: Ident,
        details: String,
    },
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnitError::Unknown(name) => write!(f, "unknown unit '{name}'"),
            UnitError::Cyclic(name) => {
                write!(f, "unit '{name}' is defined in terms of itself")
            }
            UnitError::Incompatible { from, to, details } => {
                write!(f, "units '{from}' and '{to}' are incompatible: {details}")
            }
        }
    }
}

impl UnitError {
    pub fn code(&self) -> ErrorCode {
        match self {
            UnitError::Unknown(_) => ErrorCode::UnknownUnit,
            UnitError::Cyclic(_) => ErrorCode::CyclicUnitDefinition,
            UnitError::Incompatible { .. } => ErrorCode::UnitsIncompatible,
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            UnitError::Unknown(name) | UnitError::Cyclic(name) => name,
            UnitError::Incompatible { from, .. } => from,
        }
    }
}

pub type UnitResult<T> = std::result::Result<T, UnitError>;

#[macro_export]
macro_rules! structural_err(
    ($log:expr, $code:tt, $entity:expr, $($arg:tt)*) => {{
        use $crate::common::{ErrorCode, Issue, IssueKind};
        $log.push(Issue::error(
            IssueKind::Structural,
            ErrorCode::$code,
            $entity,
            format!($($arg)*),
        ));
    }}
);

/// Renders a numeric literal deterministically for synthesized constants
/// (conversion factors and the like).  Keeps a trailing `.0` so the text is
/// unambiguously a real in every target language.
pub fn format_f64(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
