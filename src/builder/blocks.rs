//! Block and structured-statement assembly.
//!
//! Bodies travel as `Body` items on the value stack: a block exit hands its
//! finished step list up, and the owning statement pops it. Control statements
//! pop in reverse push order (else body, then body, then condition).

use once_cell::sync::Lazy;
use regex::Regex;

use super::{stack::StackItem, AstBuilder};
use crate::{
    ast::{Command, Expression, Metadata, Position, Procedure, Step, StepKind},
    diagnostics::DiagnosticKind,
    syntax::events::{RuleContext, RuleKind, TokenKind},
};

static METADATA_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^::\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*:\s*(.*?)\s*$").expect("metadata regex is valid")
});

/// Procedure signature read straight from the rule's tokens.
#[derive(Debug, Default, PartialEq)]
struct Signature {
    name: Option<String>,
    params: Vec<String>,
    optional_params: Vec<String>,
    returns: Vec<String>,
}

#[derive(Clone, Copy)]
enum ParamClause {
    Needs,
    Optional,
    Returns,
}

impl Signature {
    fn from_context(ctx: &RuleContext) -> Self {
        let mut signature = Signature::default();
        let mut clause = ParamClause::Needs;
        for token in ctx.tokens() {
            match token.kind {
                TokenKind::Needs => clause = ParamClause::Needs,
                TokenKind::Optional => clause = ParamClause::Optional,
                TokenKind::Returns => clause = ParamClause::Returns,
                TokenKind::Identifier if signature.name.is_none() => {
                    signature.name = Some(token.text.clone());
                }
                TokenKind::Identifier => {
                    let target = match clause {
                        ParamClause::Needs => &mut signature.params,
                        ParamClause::Optional => &mut signature.optional_params,
                        ParamClause::Returns => &mut signature.returns,
                    };
                    target.push(token.text.clone());
                }
                _ => {}
            }
        }
        signature
    }
}

impl AstBuilder {
    // ------------------------------------------------------------------------
    // Top-level units
    // ------------------------------------------------------------------------

    pub(crate) fn exit_program(&mut self, position: &Position, ctx: &RuleContext) {
        let metadata = self.collect_metadata(ctx);
        self.program.metadata.extend(metadata);
        self.check_unit_balance("program", position);
    }

    pub(crate) fn exit_procedure(&mut self, position: &Position, ctx: &RuleContext) {
        let steps = self.pop_body(position);
        let metadata = self.collect_metadata(ctx);
        let signature = Signature::from_context(ctx);
        let name = match signature.name {
            Some(name) => name,
            None => {
                self.diagnostics.error(
                    DiagnosticKind::MissingName,
                    "procedure has no name",
                    position,
                );
                String::new()
            }
        };
        self.check_unit_balance(&format!("procedure '{}'", name), position);

        if let Some(existing) = self.program.procedures.get(&name) {
            let message = format!(
                "procedure '{}' is already defined at {}",
                name, existing.position
            );
            self.diagnostics
                .error(DiagnosticKind::DuplicateProcedure, message, position);
            return;
        }
        tracing::debug!(procedure = %name, steps = steps.len(), "procedure assembled");
        self.program.procedures.insert(
            name.clone(),
            Procedure {
                name,
                params: signature.params,
                optional_params: signature.optional_params,
                returns: signature.returns,
                metadata,
                steps,
                position: position.clone(),
            },
        );
    }

    pub(crate) fn exit_command(&mut self, position: &Position, ctx: &RuleContext) {
        let steps = self.pop_body(position);
        let metadata = self.collect_metadata(ctx);
        self.check_unit_balance("command", position);

        let (error_handlers, body): (Vec<Step>, Vec<Step>) =
            steps.into_iter().partition(Step::is_error_handler);
        if body.is_empty() && error_handlers.is_empty() {
            self.diagnostics.error(
                DiagnosticKind::EmptyBody,
                "command block has no steps and no error handlers",
                position,
            );
            return;
        }
        tracing::debug!(
            steps = body.len(),
            handlers = error_handlers.len(),
            "command assembled"
        );
        self.program.commands.push(Command {
            metadata,
            body,
            error_handlers,
            position: position.clone(),
        });
    }

    fn collect_metadata(&mut self, ctx: &RuleContext) -> Metadata {
        let mut metadata = Metadata::new();
        for token in ctx.tokens_of(&[TokenKind::Metadata]) {
            match METADATA_LINE.captures(token.text.trim_end()) {
                Some(caps) => {
                    metadata.insert(caps[1].to_string(), caps[2].to_string());
                }
                None => {
                    self.diagnostics.warn(
                        DiagnosticKind::InvalidLiteral,
                        format!("malformed metadata line '{}'", token.text.trim_end()),
                        &token.position,
                    );
                }
            }
        }
        metadata
    }

    // ------------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------------

    pub(crate) fn exit_block(&mut self, position: &Position) {
        let steps = match self.blocks.exit() {
            Ok(steps) => steps,
            Err(err) => {
                self.diagnostics.error(
                    DiagnosticKind::UnterminatedConstruct,
                    format!("internal error: {}", err),
                    position,
                );
                Vec::new()
            }
        };
        self.push_item(StackItem::Body(steps));
    }

    // ------------------------------------------------------------------------
    // Simple statements
    // ------------------------------------------------------------------------

    pub(crate) fn exit_set(&mut self, position: &Position, ctx: &RuleContext) {
        let value = self.pop_expr(position);
        let targets = ctx.child_count(RuleKind::LValue);
        if targets == 0 {
            self.diagnostics.error(
                DiagnosticKind::MalformedLvalue,
                "set statement has no assignment target",
                position,
            );
        }
        let lvalues = self.pop_lvalues(targets, position);
        self.append_step(StepKind::Set { lvalues, value }, position);
    }

    pub(crate) fn exit_call(&mut self, position: &Position) {
        let call = self.pop_expr(position);
        self.append_step(StepKind::Call { call }, position);
    }

    pub(crate) fn exit_return(&mut self, position: &Position, ctx: &RuleContext) {
        let value = self.pop_optional_expr(position, ctx);
        self.append_step(StepKind::Return { value }, position);
    }

    pub(crate) fn exit_emit(&mut self, position: &Position, ctx: &RuleContext) {
        let value = self.pop_optional_expr(position, ctx);
        self.append_step(StepKind::Emit { value }, position);
    }

    pub(crate) fn exit_must(&mut self, position: &Position) {
        let condition = self.pop_expr(position);
        self.append_step(StepKind::Must { condition }, position);
    }

    pub(crate) fn exit_fail(&mut self, position: &Position, ctx: &RuleContext) {
        let message = self.pop_optional_expr(position, ctx);
        self.append_step(StepKind::Fail { message }, position);
    }

    fn pop_optional_expr(
        &mut self,
        position: &Position,
        ctx: &RuleContext,
    ) -> Option<Expression> {
        (ctx.child_count(RuleKind::Expression) > 0).then(|| self.pop_expr(position))
    }

    // ------------------------------------------------------------------------
    // Structured statements
    // ------------------------------------------------------------------------

    pub(crate) fn exit_if(&mut self, position: &Position, ctx: &RuleContext) {
        let else_body = if ctx.has(TokenKind::Else) {
            self.pop_body(position)
        } else {
            Vec::new()
        };
        let body = self.pop_body(position);
        let condition = self.pop_expr(position);
        self.append_step(
            StepKind::If {
                condition,
                body,
                else_body,
            },
            position,
        );
    }

    pub(crate) fn exit_while(&mut self, position: &Position) {
        let body = self.pop_body(position);
        let condition = self.pop_expr(position);
        self.append_step(StepKind::While { condition, body }, position);
    }

    pub(crate) fn exit_for(&mut self, position: &Position, ctx: &RuleContext) {
        let body = self.pop_body(position);
        let collection = self.pop_expr(position);
        let loop_var = match ctx.first(TokenKind::Identifier) {
            Some(token) => token.text.clone(),
            None => {
                self.diagnostics.error(
                    DiagnosticKind::MissingName,
                    "for loop has no loop variable",
                    position,
                );
                String::new()
            }
        };
        self.append_step(
            StepKind::For {
                loop_var,
                collection,
                body,
            },
            position,
        );
    }

    pub(crate) fn exit_on_error(&mut self, position: &Position) {
        let body = self.pop_body(position);
        self.append_step(StepKind::OnError { body }, position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(text: &str) -> (TokenKind, &str) {
        (TokenKind::Identifier, text)
    }

    fn context(tokens: &[(TokenKind, &str)]) -> RuleContext {
        tokens.iter().fold(RuleContext::new(), |ctx, (kind, text)| {
            ctx.token(*kind, *text, Position::default())
        })
    }

    #[test]
    fn test_signature_splits_clauses() {
        let ctx = context(&[
            (TokenKind::Func, "func"),
            ident("greet"),
            (TokenKind::Needs, "needs"),
            ident("name"),
            ident("greeting"),
            (TokenKind::Optional, "optional"),
            ident("punctuation"),
            (TokenKind::Returns, "returns"),
            ident("message"),
        ]);
        let signature = Signature::from_context(&ctx);
        assert_eq!(signature.name.as_deref(), Some("greet"));
        assert_eq!(signature.params, vec!["name", "greeting"]);
        assert_eq!(signature.optional_params, vec!["punctuation"]);
        assert_eq!(signature.returns, vec!["message"]);
    }

    #[test]
    fn test_metadata_line_pattern() {
        let caps = METADATA_LINE.captures(":: lang_version: 0.3.1").unwrap();
        assert_eq!(&caps[1], "lang_version");
        assert_eq!(&caps[2], "0.3.1");
        assert!(METADATA_LINE.captures(":: no separator here").is_none());
    }
}
