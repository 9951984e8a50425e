//! StepScript error handling.
//!
//! Two layers: [`StepError`] is what a pipeline call returns (I/O, syntax,
//! configuration, or a rejected construction pass), and [`DiagnosticReport`]
//! lifts one construction diagnostic onto its source text so miette can
//! render it with a labeled span.

use std::{fmt, sync::Arc};

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};

use crate::{
    ast::Position,
    diagnostics::{self, Severity},
};

// ============================================================================
// SOURCE CONTEXT
// ============================================================================

/// A named source text, kept around for error reporting.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }

    /// Byte offset of a 1-based line/column position. Positions past the
    /// end clamp to the end of the text; a synthesized `0:0` maps to 0.
    pub fn offset_of(&self, position: &Position) -> usize {
        if position.line == 0 {
            return 0;
        }
        let mut offset = 0;
        for (index, line) in self.content.split_inclusive('\n').enumerate() {
            if index + 1 == position.line as usize {
                let column = position.column.saturating_sub(1) as usize;
                let within = line
                    .char_indices()
                    .nth(column)
                    .map(|(i, _)| i)
                    .unwrap_or(line.len());
                return offset + within;
            }
            offset += line.len();
        }
        self.content.len()
    }

    /// A one-character span at `position` (empty at end of input).
    pub fn span_at(&self, position: &Position) -> SourceSpan {
        let start = self.offset_of(position);
        let len = self.content[start..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(0);
        (start..start + len).into()
    }
}

// ============================================================================
// STEP ERROR
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error: {message}")]
    Syntax {
        message: String,
        src: Arc<NamedSource<String>>,
        span: SourceSpan,
    },

    #[error("invalid configuration in {path}: {message}")]
    Config { path: String, message: String },

    #[error("{name}: construction rejected with {errors} error(s)")]
    Rejected {
        name: String,
        errors: usize,
        reports: Vec<DiagnosticReport>,
    },
}

impl StepError {
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Syntax { .. } => "syntax",
            Self::Config { .. } => "config",
            Self::Rejected { .. } => "rejected",
        }
    }
}

impl Diagnostic for StepError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("stepscript::{}", self.code_suffix())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self {
            Self::Config { .. } => "known keys: number_fallback, warnings_as_errors, duplicate_map_keys",
            Self::Rejected { .. } => "fix the errors listed below; warnings alone do not reject a script",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Self::Syntax { message, span, .. } => Some(Box::new(std::iter::once(
                LabeledSpan::new_with_span(Some(message.clone()), *span),
            ))),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Self::Syntax { src, .. } => Some(&**src),
            _ => None,
        }
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        match self {
            Self::Rejected { reports, .. } => Some(Box::new(
                reports.iter().map(|report| report as &dyn Diagnostic),
            )),
            _ => None,
        }
    }
}

// ============================================================================
// DIAGNOSTIC REPORT
// ============================================================================

/// One construction diagnostic attached to its source text.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub diagnostic: diagnostics::Diagnostic,
    src: Arc<NamedSource<String>>,
    span: SourceSpan,
}

impl DiagnosticReport {
    pub fn new(diagnostic: diagnostics::Diagnostic, source: &SourceContext) -> Self {
        let span = source.span_at(&diagnostic.position);
        Self {
            diagnostic,
            src: source.to_named_source(),
            span,
        }
    }

    /// Builds reports for a whole diagnostic list, sharing one named source.
    pub fn for_all(diagnostics: &[diagnostics::Diagnostic], source: &SourceContext) -> Vec<Self> {
        let src = source.to_named_source();
        diagnostics
            .iter()
            .map(|diagnostic| Self {
                diagnostic: diagnostic.clone(),
                src: Arc::clone(&src),
                span: source.span_at(&diagnostic.position),
            })
            .collect()
    }

    fn primary_label(&self) -> &'static str {
        use diagnostics::DiagnosticKind as K;
        match self.diagnostic.kind {
            K::StackUnderflow | K::TypeMismatchOnStack | K::UnbalancedStack => "engine state lost here",
            K::MalformedLvalue => "malformed target",
            K::EmptyBody => "empty command",
            K::UnterminatedConstruct => "unterminated construct",
            K::InvalidLiteral => "invalid literal",
            K::MissingName => "name missing",
            K::DuplicateProcedure => "redefined here",
            K::DuplicateMapKey => "repeated key",
            K::StrayStatement => "outside any procedure or command",
        }
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic.message)
    }
}

impl std::error::Error for DiagnosticReport {}

impl Diagnostic for DiagnosticReport {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.diagnostic.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diagnostic.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic.kind.is_internal().then(|| {
            Box::new("this points at a front-end or engine bug; please report it")
                as Box<dyn fmt::Display>
        })
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_with_span(Some(self.primary_label().to_string()), self.span);
        Some(Box::new(std::iter::once(label)))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.src)
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints an error with full miette diagnostics to stderr.
pub fn print_error(error: StepError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}

/// Prints a single construction diagnostic (typically a warning) to stderr.
pub fn print_report(report: DiagnosticReport) {
    let report = miette::Report::new(report);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    fn source() -> SourceContext {
        SourceContext::from_file("demo.ns", "command\n  emit \"é\"\nendcommand\n")
    }

    #[test]
    fn test_offset_of_counts_bytes() {
        let src = source();
        assert_eq!(src.offset_of(&Position::new(1, 1)), 0);
        assert_eq!(src.offset_of(&Position::new(2, 3)), 10);
        // the closing quote follows a two-byte character
        assert_eq!(src.offset_of(&Position::new(2, 10)), 18);
    }

    #[test]
    fn test_offset_of_clamps_unknown_positions() {
        let src = source();
        assert_eq!(src.offset_of(&Position::default()), 0);
        assert_eq!(src.offset_of(&Position::new(99, 1)), src.content.len());
    }

    #[test]
    fn test_report_carries_code_and_severity() {
        let diagnostic = diagnostics::Diagnostic {
            kind: DiagnosticKind::DuplicateMapKey,
            severity: Severity::Warning,
            message: "map key \"a\" is repeated".into(),
            position: Position::new(2, 3),
        };
        let report = DiagnosticReport::new(diagnostic, &source());
        assert_eq!(report.to_string(), "map key \"a\" is repeated");
        assert_eq!(
            report.code().map(|c| c.to_string()).as_deref(),
            Some("stepscript::build::duplicate_map_key")
        );
        assert_eq!(report.severity(), Some(miette::Severity::Warning));
    }
}
