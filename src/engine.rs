//! The compile pipeline: read, parse, construct, accept or reject.
//!
//! The front end streams events straight into the builder; the recorded
//! event list is only materialized when a caller asks for it.

use std::{fs, path::Path};

use crate::{
    ast::Program,
    builder::{AstBuilder, BuildOutput},
    config::Config,
    errors::{DiagnosticReport, SourceContext, StepError},
    syntax::{events::RuleEvent, parser},
};

// ============================================================================
// PIPELINE
// ============================================================================

/// A pipeline bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct CompilePipeline {
    pub config: Config,
}

impl CompilePipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Reads a file with standardized error handling
    pub fn read_file(path: &Path) -> Result<SourceContext, StepError> {
        let content = fs::read_to_string(path).map_err(|source| StepError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(SourceContext::from_file(path.display().to_string(), content))
    }

    /// Parses only, returning the recorded event stream.
    pub fn events(&self, source: &SourceContext) -> Result<Vec<RuleEvent>, StepError> {
        parser::parse_events(source)
    }

    /// Parses and constructs, returning the program with every diagnostic,
    /// accepted or not. Only a syntax error is returned as `Err`.
    pub fn build(&self, source: &SourceContext) -> Result<BuildOutput, StepError> {
        let _span = tracing::info_span!("build", source = %source.name).entered();
        let mut builder = AstBuilder::with_options(self.config.build_options());
        parser::walk(source, &mut builder)?;
        let output = builder.finish();
        tracing::info!(
            procedures = output.program.procedures.len(),
            commands = output.program.commands.len(),
            errors = output.error_count(),
            warnings = output.diagnostics.len() - output.error_count(),
            "construction complete"
        );
        Ok(output)
    }

    /// Parses, constructs, and applies the acceptance policy.
    pub fn compile(&self, source: &SourceContext) -> Result<Program, StepError> {
        let output = self.build(source)?;
        self.accept(source, output)
    }

    /// Converts a build output into a program, or a rejection carrying every
    /// diagnostic as a source-attached report.
    pub fn accept(&self, source: &SourceContext, output: BuildOutput) -> Result<Program, StepError> {
        if output.is_accepted(self.config.warnings_as_errors) {
            return Ok(output.program);
        }
        let errors = if self.config.warnings_as_errors {
            output.diagnostics.len()
        } else {
            output.error_count()
        };
        tracing::warn!(source = %source.name, errors, "construction rejected");
        Err(StepError::Rejected {
            name: source.name.clone(),
            errors,
            reports: DiagnosticReport::for_all(&output.diagnostics, source),
        })
    }
}

/// Compiles a source string with the default configuration.
pub fn compile_str(name: &str, text: &str) -> Result<Program, StepError> {
    CompilePipeline::default().compile(&SourceContext::from_file(name, text))
}
