//! # StepScript test helpers
//!
//! Synthetic event streams for driving the construction engine without a
//! parser, plus a one-call source compiler for end-to-end tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use stepscript::{
    ast::Position,
    builder::{AstBuilder, BuildOptions, BuildOutput},
    errors::SourceContext,
    syntax::events::{RuleContext, RuleEvent, RuleKind, TokenKind},
    CompilePipeline, DiagnosticKind,
};

static NEXT_LINE: AtomicU32 = AtomicU32::new(1);

/// A fresh position per call, so diagnostics never collapse by accident.
pub fn at() -> Position {
    Position::new(NEXT_LINE.fetch_add(1, Ordering::Relaxed), 1).with_source("synthetic")
}

/// One direct child of a synthetic rule instance.
pub enum Part {
    Tok(TokenKind, &'static str),
    Sub(Vec<RuleEvent>),
}

pub fn tok(kind: TokenKind, text: &'static str) -> Part {
    Part::Tok(kind, text)
}

pub fn sub(events: Vec<RuleEvent>) -> Part {
    Part::Sub(events)
}

fn root_kind(events: &[RuleEvent]) -> RuleKind {
    match events.last() {
        Some(RuleEvent::Exit { kind, .. }) => *kind,
        other => panic!("sub-stream must end with an exit event, got {:?}", other),
    }
}

/// Wraps `parts` in one enter/exit pair for `kind`.
pub fn rule_with_text(kind: RuleKind, raw_text: &str, parts: Vec<Part>) -> Vec<RuleEvent> {
    let position = at();
    let mut events = vec![RuleEvent::Enter {
        kind,
        position: position.clone(),
        raw_text: raw_text.to_string(),
    }];
    let mut context = RuleContext::new();
    for part in parts {
        match part {
            Part::Tok(kind, text) => context = context.token(kind, text, at()),
            Part::Sub(sub_events) => {
                let child = root_kind(&sub_events);
                events.extend(sub_events);
                context = context.child(child);
            }
        }
    }
    events.push(RuleEvent::Exit {
        kind,
        position,
        context,
    });
    events
}

pub fn rule(kind: RuleKind, parts: Vec<Part>) -> Vec<RuleEvent> {
    rule_with_text(kind, "", parts)
}

// ============================================================================
// EXPRESSION SHORTHANDS
// ============================================================================

pub fn num(text: &'static str) -> Vec<RuleEvent> {
    rule(RuleKind::NumberLiteral, vec![tok(TokenKind::Number, text)])
}

pub fn string(text: &'static str) -> Vec<RuleEvent> {
    rule(RuleKind::StringLiteral, vec![tok(TokenKind::String, text)])
}

pub fn var(name: &'static str) -> Vec<RuleEvent> {
    rule(RuleKind::Variable, vec![tok(TokenKind::Identifier, name)])
}

pub fn expr(inner: Vec<RuleEvent>) -> Vec<RuleEvent> {
    rule(RuleKind::Expression, vec![sub(inner)])
}

/// A binary level: operands interleaved with operator tokens.
pub fn binary(kind: RuleKind, first: Vec<RuleEvent>, rest: Vec<(TokenKind, &'static str, Vec<RuleEvent>)>) -> Vec<RuleEvent> {
    let mut parts = vec![sub(first)];
    for (op, text, operand) in rest {
        parts.push(tok(op, text));
        parts.push(sub(operand));
    }
    rule(kind, parts)
}

// ============================================================================
// STATEMENT AND UNIT SHORTHANDS
// ============================================================================

pub fn emit(value: Vec<RuleEvent>) -> Vec<RuleEvent> {
    rule(
        RuleKind::EmitStatement,
        vec![tok(TokenKind::Emit, "emit"), sub(expr(value))],
    )
}

pub fn block(statements: Vec<Vec<RuleEvent>>) -> Vec<RuleEvent> {
    rule(RuleKind::Block, statements.into_iter().map(sub).collect())
}

pub fn command(statements: Vec<Vec<RuleEvent>>) -> Vec<RuleEvent> {
    rule(
        RuleKind::Command,
        vec![
            tok(TokenKind::Command, "command"),
            sub(block(statements)),
            tok(TokenKind::EndCommand, "endcommand"),
        ],
    )
}

pub fn procedure(name: &'static str, statements: Vec<Vec<RuleEvent>>) -> Vec<RuleEvent> {
    rule(
        RuleKind::Procedure,
        vec![
            tok(TokenKind::Func, "func"),
            tok(TokenKind::Identifier, name),
            tok(TokenKind::Means, "means"),
            sub(block(statements)),
            tok(TokenKind::EndFunc, "endfunc"),
        ],
    )
}

pub fn program(units: Vec<Vec<RuleEvent>>) -> Vec<RuleEvent> {
    rule(RuleKind::Program, units.into_iter().map(sub).collect())
}

// ============================================================================
// RUNNERS
// ============================================================================

pub fn build(events: Vec<RuleEvent>) -> BuildOutput {
    AstBuilder::build(events, BuildOptions::default())
}

/// Parses and constructs `text` with the default configuration.
pub fn compile(text: &str) -> BuildOutput {
    let source = SourceContext::from_file("test.ns", text);
    CompilePipeline::default()
        .build(&source)
        .unwrap_or_else(|e| panic!("unexpected syntax error: {}", e))
}

pub fn count(output: &BuildOutput, kind: DiagnosticKind) -> usize {
    output.diagnostics.iter().filter(|d| d.kind == kind).count()
}

/// Pretty form of the first command's body, one step per line.
pub fn first_command_outline(output: &BuildOutput) -> String {
    let command = output
        .program
        .commands
        .first()
        .unwrap_or_else(|| panic!("no command built; diagnostics: {:?}", output.diagnostics));
    command.body.iter().map(|s| s.pretty()).collect()
}
