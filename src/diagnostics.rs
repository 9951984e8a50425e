//! Construction diagnostics.
//!
//! The construction engine never aborts on malformed input. Every failure is
//! recorded here as a positioned diagnostic and the engine substitutes a
//! placeholder so the traversal can finish. Diagnostics with the same message
//! at the same position are recorded once.

use std::{collections::HashSet, fmt};

use serde::Serialize;

use crate::ast::Position;

/// Type-safe classification of construction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// A pop was attempted on an empty (or too shallow) value stack.
    StackUnderflow,
    /// The popped node was not the variant the rule expected.
    TypeMismatchOnStack,
    /// DOT without IDENTIFIER, or a bracket group without an expression.
    MalformedLvalue,
    /// A command with neither steps nor error handlers.
    EmptyBody,
    /// A block exit with no enclosing block to restore.
    UnterminatedConstruct,
    /// A stack was not empty when a top-level unit completed.
    UnbalancedStack,
    /// A string or number literal that could not be decoded.
    InvalidLiteral,
    /// A procedure or loop without its identifier.
    MissingName,
    DuplicateProcedure,
    DuplicateMapKey,
    /// A step that ended up outside any procedure or command.
    StrayStatement,
}

impl DiagnosticKind {
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::StackUnderflow => "stack_underflow",
            Self::TypeMismatchOnStack => "type_mismatch_on_stack",
            Self::MalformedLvalue => "malformed_lvalue",
            Self::EmptyBody => "empty_body",
            Self::UnterminatedConstruct => "unterminated_construct",
            Self::UnbalancedStack => "unbalanced_stack",
            Self::InvalidLiteral => "invalid_literal",
            Self::MissingName => "missing_name",
            Self::DuplicateProcedure => "duplicate_procedure",
            Self::DuplicateMapKey => "duplicate_map_key",
            Self::StrayStatement => "stray_statement",
        }
    }

    /// Internal kinds indicate an engine or front-end bug rather than bad user input.
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::StackUnderflow
                | Self::TypeMismatchOnStack
                | Self::UnterminatedConstruct
                | Self::UnbalancedStack
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One recorded construction problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub position: Position,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn code(&self) -> String {
        format!("stepscript::build::{}", self.kind.code_suffix())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.position, self.severity, self.message)
    }
}

/// Accumulates diagnostics for one construction pass.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    seen: HashSet<(String, Position)>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic. Returns `false` if an identical one (same message
    /// and position) was already recorded.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        let key = (diagnostic.message.clone(), diagnostic.position.clone());
        if !self.seen.insert(key) {
            return false;
        }
        tracing::debug!(
            kind = ?diagnostic.kind,
            severity = %diagnostic.severity,
            position = %diagnostic.position,
            "{}",
            diagnostic.message
        );
        self.items.push(diagnostic);
        true
    }

    pub fn error(&mut self, kind: DiagnosticKind, message: impl Into<String>, position: &Position) -> bool {
        self.report(kind, Severity::Error, message, position)
    }

    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>, position: &Position) -> bool {
        self.report(kind, Severity::Warning, message, position)
    }

    pub fn report(
        &mut self,
        kind: DiagnosticKind,
        severity: Severity,
        message: impl Into<String>,
        position: &Position,
    ) -> bool {
        self.push(Diagnostic {
            kind,
            severity,
            message: message.into(),
            position: position.clone(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
