//! Handles all user-facing output for the CLI.
//!
//! Results go to stdout; diagnostics are rendered by miette on stderr. Color
//! is only used when stdout is a terminal.

use std::io::{self, IsTerminal, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::{ast::Program, syntax::events::RuleEvent};

// ============================================================================
// CHECK REPORTING
// ============================================================================

/// Outcome of checking one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Accepted,
    Rejected,
    /// Unreadable, or not syntactically valid.
    Failed,
}

/// Running totals for `stepscript check`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckSummary {
    pub checked: usize,
    pub rejected: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckSummary {
    pub fn record(&mut self, status: CheckStatus, errors: usize, warnings: usize) {
        self.checked += 1;
        self.errors += errors;
        self.warnings += warnings;
        match status {
            CheckStatus::Accepted => {}
            CheckStatus::Rejected => self.rejected += 1,
            CheckStatus::Failed => self.failed += 1,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.rejected == 0 && self.failed == 0
    }
}

fn stdout() -> StandardStream {
    let choice = if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Prints one `✓ path` / `✗ path` line.
pub fn print_check_line(path: &str, status: CheckStatus, warnings: usize) {
    let mut out = stdout();
    let (mark, color) = match status {
        CheckStatus::Accepted => ("✓", Color::Green),
        CheckStatus::Rejected => ("✗", Color::Red),
        CheckStatus::Failed => ("!", Color::Red),
    };
    let _ = out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(out, "{}", mark);
    let _ = out.reset();
    if warnings > 0 {
        let _ = writeln!(out, " {} ({} warning(s))", path, warnings);
    } else {
        let _ = writeln!(out, " {}", path);
    }
}

pub fn print_summary(summary: &CheckSummary) {
    let mut out = stdout();
    let _ = writeln!(out);
    let color = if summary.is_clean() { Color::Green } else { Color::Red };
    let _ = out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(
        out,
        "{} checked, {} rejected, {} failed",
        summary.checked, summary.rejected, summary.failed
    );
    let _ = out.reset();
    let _ = writeln!(
        out,
        "{} error(s), {} warning(s)",
        summary.errors, summary.warnings
    );
}

// ============================================================================
// TREE AND EVENT OUTPUT
// ============================================================================

pub fn print_ast(program: &Program, json: bool) -> serde_json::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(program)?);
    } else if program.procedures.is_empty() && program.commands.is_empty() {
        println!("(empty)");
    } else {
        print!("{}", program.pretty());
    }
    Ok(())
}

pub fn print_events(events: &[RuleEvent], json: bool) -> serde_json::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(events)?);
        return Ok(());
    }
    let mut depth = 0usize;
    for event in events {
        if matches!(event, RuleEvent::Exit { .. }) {
            depth = depth.saturating_sub(1);
        }
        println!("{}{}", "  ".repeat(depth), event);
        if matches!(event, RuleEvent::Enter { .. }) {
            depth += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = CheckSummary::default();
        summary.record(CheckStatus::Accepted, 0, 2);
        summary.record(CheckStatus::Rejected, 3, 0);
        summary.record(CheckStatus::Failed, 0, 0);
        assert_eq!(summary.checked, 3);
        assert_eq!((summary.rejected, summary.failed), (1, 1));
        assert_eq!((summary.errors, summary.warnings), (3, 2));
        assert!(!summary.is_clean());
    }
}
