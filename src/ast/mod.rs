//! AST module for Stepscript
//!
//! This module provides the node model produced by the construction engine:
//! positioned expressions, lvalues, steps, and the top-level containers
//! (`Procedure`, `Command`, `Program`) handed to the execution engine.

// ============================================================================
// IMPORTS
// ============================================================================

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

pub mod expr;
pub mod step;

pub use expr::{Accessor, BinaryOperator, ExprKind, Expression, LValue, MapEntry, Number, UnaryOperator};
pub use step::{Step, StepKind};

// ============================================================================
// POSITION
// ============================================================================

/// A source location attached to every node for diagnostics.
///
/// Lines and columns are 1-based. A default position (`0:0`) marks nodes that
/// were synthesized during recovery and have no source location of their own.
///
/// # Examples
///
/// ```rust
/// use stepscript::ast::Position;
/// let pos = Position::new(3, 7);
/// assert_eq!(pos.to_string(), "3:7");
/// assert_eq!(pos.with_source("demo.ns").to_string(), "demo.ns:3:7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Arc<str>>,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line,
            column,
            source: None,
        }
    }

    /// Returns a copy of this position tagged with a source name.
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(name) => write!(f, "{}:{}:{}", name, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Metadata attached to a program, procedure, or command (`:: key: value`).
///
/// Keys are unique per owner; a later duplicate key overwrites the earlier one.
pub type Metadata = BTreeMap<String, String>;

// ============================================================================
// TOP-LEVEL CONTAINERS
// ============================================================================

/// A named procedure (`func name(...) means ... endfunc`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub name: String,
    pub params: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_params: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub returns: Vec<String>,
    pub metadata: Metadata,
    pub steps: Vec<Step>,
    pub position: Position,
}

/// A top-level executable block not bound to a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub metadata: Metadata,
    pub body: Vec<Step>,
    pub error_handlers: Vec<Step>,
    pub position: Position,
}

/// The root artifact delivered to the execution engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub metadata: Metadata,
    pub procedures: BTreeMap<String, Procedure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,
}

impl Program {
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name)
    }

    /// Renders the whole program as an indented outline.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.metadata {
            out.push_str(&format!(":: {}: {}\n", key, value));
        }
        for procedure in self.procedures.values() {
            out.push_str(&procedure.pretty());
        }
        for command in &self.commands {
            out.push_str(&command.pretty());
        }
        out
    }
}

impl Procedure {
    pub fn pretty(&self) -> String {
        let mut out = format!("func {}({})", self.name, self.params.join(", "));
        if !self.optional_params.is_empty() {
            out.push_str(&format!(" optional({})", self.optional_params.join(", ")));
        }
        if !self.returns.is_empty() {
            out.push_str(&format!(" returns({})", self.returns.join(", ")));
        }
        out.push('\n');
        for (key, value) in &self.metadata {
            out.push_str(&format!("  :: {}: {}\n", key, value));
        }
        step::pretty_steps(&self.steps, 1, &mut out);
        out.push_str("endfunc\n");
        out
    }
}

impl Command {
    pub fn pretty(&self) -> String {
        let mut out = String::from("command\n");
        for (key, value) in &self.metadata {
            out.push_str(&format!("  :: {}: {}\n", key, value));
        }
        step::pretty_steps(&self.body, 1, &mut out);
        if !self.error_handlers.is_empty() {
            out.push_str("  handlers:\n");
            step::pretty_steps(&self.error_handlers, 2, &mut out);
        }
        out.push_str("endcommand\n");
        out
    }
}
