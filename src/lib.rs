//! StepScript: builds the typed syntax tree of procedure-and-command scripts.
//!
//! A parser front end ([`syntax::parser`]) reports one enter/exit event per
//! grammar rule; the construction engine ([`builder::AstBuilder`]) turns that
//! event stream into a [`Program`] plus a list of positioned diagnostics.

pub mod ast;
pub mod builder;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod syntax;

pub use ast::{Command, Expression, Position, Procedure, Program, Step};
pub use builder::{AstBuilder, BuildOptions, BuildOutput};
pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use engine::{compile_str, CompilePipeline};
pub use errors::{SourceContext, StepError};
