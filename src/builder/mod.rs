//! # AST construction engine
//!
//! `AstBuilder` is a [`RuleListener`]: a front end drives it with one enter
//! and one exit callback per grammar rule instance, in strict nesting order.
//! Each callback does one of three things:
//!
//! - pushes a freshly built node onto the value stack (expression rules),
//! - opens or closes a step list on the block stack (block rules),
//! - pops the children a composite rule owns and pushes (or appends) the
//!   assembled node.
//!
//! ## Invariants
//! - A rule that produces a value pushes exactly one item; a rule that owns
//!   `k` child values pops exactly `k`.
//! - Failures never abort the pass. They are recorded in [`Diagnostics`] and a
//!   placeholder (`Error` expression, empty list) keeps the stacks balanced.
//! - After a procedure, a command, or the whole program completes, the value
//!   stack is empty; anything left behind is reported and discarded.

use crate::{
    ast::{ExprKind, Expression, LValue, MapEntry, Position, Program, Step, StepKind},
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity},
    syntax::events::{replay, RuleContext, RuleEvent, RuleKind, RuleListener},
};

pub mod blocks;
pub mod literal;
pub mod lvalue;
pub mod operators;
pub mod stack;

use stack::{BlockStack, StackError, StackItem, ValueStack};

// ============================================================================
// OPTIONS AND OUTPUT
// ============================================================================

/// Policy knobs for one construction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Severity recorded for numeric literals that fit neither `i64` nor `f64`.
    pub number_fallback: Severity,
    /// Record a warning when a map literal repeats a key.
    pub warn_duplicate_map_keys: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            number_fallback: Severity::Error,
            warn_duplicate_map_keys: true,
        }
    }
}

/// Result of a construction pass: the program plus everything that went wrong.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildOutput {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Whether the program may be handed to the execution engine.
    pub fn is_accepted(&self, warnings_as_errors: bool) -> bool {
        if warnings_as_errors {
            self.diagnostics.is_empty()
        } else {
            !self.has_errors()
        }
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// The construction pass. Owns both stacks and the diagnostic list; one
/// instance serves exactly one input.
#[derive(Debug, Default)]
pub struct AstBuilder {
    values: ValueStack,
    blocks: BlockStack,
    diagnostics: Diagnostics,
    program: Program,
    options: BuildOptions,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BuildOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Runs a whole recorded event stream through a fresh builder.
    pub fn build<I>(events: I, options: BuildOptions) -> BuildOutput
    where
        I: IntoIterator<Item = RuleEvent>,
    {
        let mut builder = Self::with_options(options);
        replay(events, &mut builder);
        builder.finish()
    }

    pub fn value_depth(&self) -> usize {
        self.values.len()
    }

    pub fn block_depth(&self) -> usize {
        self.blocks.depth()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Ends the pass. Whatever is still open or left on a stack is reported.
    pub fn finish(mut self) -> BuildOutput {
        let end = Position::default();
        let open = self.blocks.unwind();
        if open > 0 {
            self.diagnostics.error(
                DiagnosticKind::UnbalancedStack,
                format!("internal error: {} block(s) still open at end of input", open),
                &end,
            );
        }
        self.check_unit_balance("program", &end);
        let stray = self.blocks.take_current();
        if let Some(first) = stray.first() {
            self.diagnostics.error(
                DiagnosticKind::StrayStatement,
                format!(
                    "{} statement(s) outside any procedure or command were discarded",
                    stray.len()
                ),
                &first.position,
            );
        }
        tracing::debug!(
            procedures = self.program.procedures.len(),
            commands = self.program.commands.len(),
            diagnostics = self.diagnostics.len(),
            "construction finished"
        );
        BuildOutput {
            program: self.program,
            diagnostics: self.diagnostics.into_vec(),
        }
    }

    // ------------------------------------------------------------------------
    // Stack helpers shared by the assembly modules
    // ------------------------------------------------------------------------

    pub(crate) fn push_expr(&mut self, kind: ExprKind, position: &Position) {
        self.values
            .push(StackItem::Expr(Expression::new(kind, position.clone())));
    }

    pub(crate) fn push_item(&mut self, item: StackItem) {
        self.values.push(item);
    }

    pub(crate) fn append_step(&mut self, kind: StepKind, position: &Position) {
        self.blocks.append(Step::new(kind, position.clone()));
    }

    fn record_underflow(&mut self, err: StackError, wanted: &str, position: &Position) {
        self.diagnostics.error(
            DiagnosticKind::StackUnderflow,
            format!("internal error: {} while popping {}", err, wanted),
            position,
        );
    }

    fn record_mismatch(&mut self, expected: &str, found: &StackItem, position: &Position) {
        self.diagnostics.error(
            DiagnosticKind::TypeMismatchOnStack,
            format!(
                "internal error: expected {} on the value stack, found {}",
                expected,
                found.type_name()
            ),
            position,
        );
    }

    /// Pops `n` raw items in source order; on underflow records it and returns `None`.
    fn pop_items(&mut self, n: usize, wanted: &str, position: &Position) -> Option<Vec<StackItem>> {
        match self.values.pop_n(n) {
            Ok(items) => Some(items),
            Err(err) => {
                self.record_underflow(err, wanted, position);
                None
            }
        }
    }

    fn expect_expr(&mut self, item: StackItem, position: &Position) -> Expression {
        match item {
            StackItem::Expr(expr) => expr,
            other => {
                self.record_mismatch("expression", &other, position);
                Expression::error("expected expression", position.clone())
            }
        }
    }

    pub(crate) fn pop_expr(&mut self, position: &Position) -> Expression {
        match self.values.pop() {
            Ok(item) => self.expect_expr(item, position),
            Err(err) => {
                self.record_underflow(err, "expression", position);
                Expression::error("missing expression", position.clone())
            }
        }
    }

    pub(crate) fn pop_exprs(&mut self, n: usize, position: &Position) -> Vec<Expression> {
        match self.pop_items(n, "expressions", position) {
            Some(items) => items
                .into_iter()
                .map(|item| self.expect_expr(item, position))
                .collect(),
            None => (0..n)
                .map(|_| Expression::error("missing expression", position.clone()))
                .collect(),
        }
    }

    pub(crate) fn pop_lvalues(&mut self, n: usize, position: &Position) -> Vec<LValue> {
        let placeholder = |position: &Position| LValue {
            identifier: String::new(),
            accessors: Vec::new(),
            position: position.clone(),
        };
        let Some(items) = self.pop_items(n, "lvalues", position) else {
            return (0..n).map(|_| placeholder(position)).collect();
        };
        items
            .into_iter()
            .map(|item| match item {
                StackItem::LValue(lvalue) => lvalue,
                other => {
                    self.record_mismatch("lvalue", &other, position);
                    placeholder(position)
                }
            })
            .collect()
    }

    pub(crate) fn pop_body(&mut self, position: &Position) -> Vec<Step> {
        match self.values.pop() {
            Ok(StackItem::Body(steps)) => steps,
            Ok(other) => {
                self.record_mismatch("statement body", &other, position);
                Vec::new()
            }
            Err(err) => {
                self.record_underflow(err, "statement body", position);
                Vec::new()
            }
        }
    }

    pub(crate) fn pop_map_key(&mut self, position: &Position) -> (String, Position) {
        match self.values.pop() {
            Ok(StackItem::MapKey { key, position }) => (key, position),
            Ok(other) => {
                self.record_mismatch("map key", &other, position);
                (String::new(), position.clone())
            }
            Err(err) => {
                self.record_underflow(err, "map key", position);
                (String::new(), position.clone())
            }
        }
    }

    pub(crate) fn pop_entries(&mut self, n: usize, position: &Position) -> Vec<MapEntry> {
        let Some(items) = self.pop_items(n, "map entries", position) else {
            return Vec::new();
        };
        let mut entries = Vec::with_capacity(n);
        for item in items {
            match item {
                StackItem::MapEntry(entry) => entries.push(entry),
                other => self.record_mismatch("map entry", &other, position),
            }
        }
        entries
    }

    /// Reports and discards anything left on the value stack when a top-level unit completes.
    pub(crate) fn check_unit_balance(&mut self, unit: &str, position: &Position) {
        let leftover = self.values.drain();
        if leftover.is_empty() {
            return;
        }
        let kinds = leftover
            .iter()
            .map(StackItem::type_name)
            .collect::<Vec<_>>()
            .join(", ");
        self.diagnostics.error(
            DiagnosticKind::UnbalancedStack,
            format!(
                "internal error: {} item(s) left on the value stack after {} ({})",
                leftover.len(),
                unit,
                kinds
            ),
            position,
        );
    }
}

// ============================================================================
// EVENT DISPATCH
// ============================================================================

impl RuleListener for AstBuilder {
    fn enter_rule(&mut self, kind: RuleKind, position: &Position, raw_text: &str) {
        tracing::trace!(?kind, %position, "enter rule");
        match kind {
            RuleKind::Block => self.blocks.enter(),
            RuleKind::MapEntry => self.enter_map_entry(position, raw_text),
            _ => {}
        }
    }

    fn exit_rule(&mut self, kind: RuleKind, position: &Position, ctx: &RuleContext) {
        tracing::trace!(?kind, %position, depth = self.values.len(), "exit rule");
        match kind {
            RuleKind::Program => self.exit_program(position, ctx),
            RuleKind::Procedure => self.exit_procedure(position, ctx),
            RuleKind::Command => self.exit_command(position, ctx),
            RuleKind::Block => self.exit_block(position),

            RuleKind::SetStatement => self.exit_set(position, ctx),
            RuleKind::CallStatement => self.exit_call(position),
            RuleKind::ReturnStatement => self.exit_return(position, ctx),
            RuleKind::EmitStatement => self.exit_emit(position, ctx),
            RuleKind::MustStatement => self.exit_must(position),
            RuleKind::FailStatement => self.exit_fail(position, ctx),
            RuleKind::ClearErrorStatement => self.append_step(StepKind::ClearError, position),
            RuleKind::BreakStatement => self.append_step(StepKind::Break, position),
            RuleKind::ContinueStatement => self.append_step(StepKind::Continue, position),
            RuleKind::IfStatement => self.exit_if(position, ctx),
            RuleKind::WhileStatement => self.exit_while(position),
            RuleKind::ForStatement => self.exit_for(position, ctx),
            RuleKind::OnErrorStatement => self.exit_on_error(position),

            RuleKind::LValue => self.exit_lvalue(position, ctx),
            RuleKind::AccessorExpr => self.exit_accessor_expr(position, ctx),

            // The top expression rule only delimits; its child already pushed the value.
            RuleKind::Expression => {}
            RuleKind::LogicalOr
            | RuleKind::LogicalAnd
            | RuleKind::BitwiseOr
            | RuleKind::BitwiseXor
            | RuleKind::BitwiseAnd
            | RuleKind::Equality
            | RuleKind::Relational
            | RuleKind::Additive
            | RuleKind::Multiplicative => self.exit_binary_level(kind, position, ctx),
            RuleKind::Unary => self.exit_unary(position, ctx),
            RuleKind::Power => self.exit_power(position, ctx),

            RuleKind::StringLiteral => self.exit_string(position, ctx),
            RuleKind::NumberLiteral => self.exit_number(position, ctx),
            RuleKind::BooleanLiteral => self.exit_boolean(position, ctx),
            RuleKind::NilLiteral => self.push_expr(ExprKind::NilLiteral, position),
            RuleKind::Variable => self.exit_variable(position, ctx),
            RuleKind::Last => self.push_expr(ExprKind::Last, position),
            RuleKind::LastCallResult => self.push_expr(ExprKind::LastCallResult, position),
            RuleKind::Placeholder => self.exit_placeholder(position, ctx),
            RuleKind::ListLiteral => self.exit_list(position, ctx),
            RuleKind::MapLiteral => self.exit_map(position, ctx),
            RuleKind::MapEntry => self.exit_map_entry(position),
            RuleKind::FunctionCall => self.exit_function_call(position, ctx),
            RuleKind::Eval => self.exit_eval(position),
        }
    }
}
