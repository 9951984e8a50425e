//! StepScript front end.
//!
//! Parses source text with pest and walks the concrete syntax tree, reporting
//! one enter/exit pair per construction-relevant rule to a [`RuleListener`].
//! Rules with no construction meaning (silent groupings, `EOI`) are
//! transparent: their children are folded into the nearest reported parent.

use std::sync::Arc;

use pest::{
    error::{Error, InputLocation},
    iterators::{Pair, Pairs},
    Parser,
};
use pest_derive::Parser;

use crate::{
    ast::Position,
    errors::{SourceContext, StepError},
    syntax::events::{ContextChild, RuleContext, RuleEvent, RuleKind, RuleListener, Token, TokenKind},
};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct StepParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses `source` and drives `listener` with the full event stream.
///
/// On a syntax error no events are reported at all.
pub fn walk<L>(source: &SourceContext, listener: &mut L) -> Result<(), StepError>
where
    L: RuleListener + ?Sized,
{
    let mut pairs = StepParser::parse(Rule::program, &source.content)
        .map_err(|e| convert_parse_error(e, source))?;
    let Some(program) = pairs.next() else {
        return Ok(());
    };
    let mut walker = Walker {
        listener,
        source_name: Arc::from(source.name.as_str()),
    };
    walker.visit(program, RuleKind::Program);
    Ok(())
}

/// Parses `source` and records the event stream.
pub fn parse_events(source: &SourceContext) -> Result<Vec<RuleEvent>, StepError> {
    let mut events = Vec::new();
    walk(source, &mut events)?;
    tracing::debug!(source = %source.name, events = events.len(), "event stream recorded");
    Ok(events)
}

// ============================================================================
// RULE CLASSIFICATION
// ============================================================================

enum Node {
    Rule(RuleKind),
    Token(TokenKind),
    Transparent,
}

fn classify(rule: Rule) -> Node {
    use Node::{Rule as R, Token as T};
    match rule {
        Rule::program => R(RuleKind::Program),
        Rule::procedure => R(RuleKind::Procedure),
        Rule::command => R(RuleKind::Command),
        Rule::block => R(RuleKind::Block),
        Rule::set_statement => R(RuleKind::SetStatement),
        Rule::call_statement => R(RuleKind::CallStatement),
        Rule::return_statement => R(RuleKind::ReturnStatement),
        Rule::emit_statement => R(RuleKind::EmitStatement),
        Rule::must_statement => R(RuleKind::MustStatement),
        Rule::fail_statement => R(RuleKind::FailStatement),
        Rule::clear_error_statement => R(RuleKind::ClearErrorStatement),
        Rule::break_statement => R(RuleKind::BreakStatement),
        Rule::continue_statement => R(RuleKind::ContinueStatement),
        Rule::if_statement => R(RuleKind::IfStatement),
        Rule::while_statement => R(RuleKind::WhileStatement),
        Rule::for_statement => R(RuleKind::ForStatement),
        Rule::on_error_statement => R(RuleKind::OnErrorStatement),
        Rule::lvalue => R(RuleKind::LValue),
        Rule::expression => R(RuleKind::Expression),
        Rule::logical_or => R(RuleKind::LogicalOr),
        Rule::logical_and => R(RuleKind::LogicalAnd),
        Rule::bitwise_or => R(RuleKind::BitwiseOr),
        Rule::bitwise_xor => R(RuleKind::BitwiseXor),
        Rule::bitwise_and => R(RuleKind::BitwiseAnd),
        Rule::equality => R(RuleKind::Equality),
        Rule::relational => R(RuleKind::Relational),
        Rule::additive => R(RuleKind::Additive),
        Rule::multiplicative => R(RuleKind::Multiplicative),
        Rule::unary => R(RuleKind::Unary),
        Rule::power => R(RuleKind::Power),
        Rule::accessor_expr => R(RuleKind::AccessorExpr),
        Rule::string_literal => R(RuleKind::StringLiteral),
        Rule::number_literal => R(RuleKind::NumberLiteral),
        Rule::boolean_literal => R(RuleKind::BooleanLiteral),
        Rule::nil_literal => R(RuleKind::NilLiteral),
        Rule::last_call_expr => R(RuleKind::LastCallResult),
        Rule::last_expr => R(RuleKind::Last),
        Rule::placeholder => R(RuleKind::Placeholder),
        Rule::eval_expr => R(RuleKind::Eval),
        Rule::function_call => R(RuleKind::FunctionCall),
        Rule::variable => R(RuleKind::Variable),
        Rule::list_literal => R(RuleKind::ListLiteral),
        Rule::map_literal => R(RuleKind::MapLiteral),
        Rule::map_entry => R(RuleKind::MapEntry),

        Rule::IDENTIFIER => T(TokenKind::Identifier),
        Rule::STRING => T(TokenKind::String),
        Rule::RAW_STRING => T(TokenKind::RawString),
        Rule::NUMBER => T(TokenKind::Number),
        Rule::PLACEHOLDER => T(TokenKind::Placeholder),
        Rule::METADATA => T(TokenKind::Metadata),

        Rule::KW_FUNC => T(TokenKind::Func),
        Rule::KW_NEEDS => T(TokenKind::Needs),
        Rule::KW_OPTIONAL => T(TokenKind::Optional),
        Rule::KW_RETURNS => T(TokenKind::Returns),
        Rule::KW_MEANS => T(TokenKind::Means),
        Rule::KW_ENDFUNC => T(TokenKind::EndFunc),
        Rule::KW_COMMAND => T(TokenKind::Command),
        Rule::KW_ENDCOMMAND => T(TokenKind::EndCommand),
        Rule::KW_SET => T(TokenKind::Set),
        Rule::KW_CALL => T(TokenKind::Call),
        Rule::KW_RETURN => T(TokenKind::Return),
        Rule::KW_EMIT => T(TokenKind::Emit),
        Rule::KW_MUST => T(TokenKind::Must),
        Rule::KW_FAIL => T(TokenKind::Fail),
        Rule::KW_CLEAR_ERROR => T(TokenKind::ClearError),
        Rule::KW_BREAK => T(TokenKind::Break),
        Rule::KW_CONTINUE => T(TokenKind::Continue),
        Rule::KW_IF => T(TokenKind::If),
        Rule::KW_ELSE => T(TokenKind::Else),
        Rule::KW_ENDIF => T(TokenKind::EndIf),
        Rule::KW_WHILE => T(TokenKind::While),
        Rule::KW_ENDWHILE => T(TokenKind::EndWhile),
        Rule::KW_FOR => T(TokenKind::For),
        Rule::KW_EACH => T(TokenKind::Each),
        Rule::KW_IN => T(TokenKind::In),
        Rule::KW_ENDFOR => T(TokenKind::EndFor),
        Rule::KW_ON_ERROR => T(TokenKind::OnError),
        Rule::KW_ENDON => T(TokenKind::EndOn),
        Rule::KW_TRUE => T(TokenKind::True),
        Rule::KW_FALSE => T(TokenKind::False),
        Rule::KW_NIL => T(TokenKind::Nil),
        Rule::KW_LAST_CALL => T(TokenKind::LastCall),
        Rule::KW_LAST => T(TokenKind::Last),
        Rule::KW_EVAL => T(TokenKind::Eval),
        Rule::KW_AND => T(TokenKind::And),
        Rule::KW_OR => T(TokenKind::Or),
        Rule::KW_NOT => T(TokenKind::Not),

        Rule::POW => T(TokenKind::Pow),
        Rule::STAR => T(TokenKind::Star),
        Rule::SLASH => T(TokenKind::Slash),
        Rule::PERCENT => T(TokenKind::Percent),
        Rule::PLUS => T(TokenKind::Plus),
        Rule::MINUS => T(TokenKind::Minus),
        Rule::TILDE => T(TokenKind::Tilde),
        Rule::PIPE => T(TokenKind::Pipe),
        Rule::CARET => T(TokenKind::Caret),
        Rule::AMP => T(TokenKind::Amp),
        Rule::EQ => T(TokenKind::Eq),
        Rule::NEQ => T(TokenKind::NotEq),
        Rule::GTE => T(TokenKind::Gte),
        Rule::LTE => T(TokenKind::Lte),
        Rule::GT => T(TokenKind::Gt),
        Rule::LT => T(TokenKind::Lt),
        Rule::ASSIGN => T(TokenKind::Assign),

        Rule::DOT => T(TokenKind::Dot),
        Rule::COMMA => T(TokenKind::Comma),
        Rule::COLON => T(TokenKind::Colon),
        Rule::LPAREN => T(TokenKind::LParen),
        Rule::RPAREN => T(TokenKind::RParen),
        Rule::LBRACK => T(TokenKind::LBrack),
        Rule::RBRACK => T(TokenKind::RBrack),
        Rule::LBRACE => T(TokenKind::LBrace),
        Rule::RBRACE => T(TokenKind::RBrace),

        _ => Node::Transparent,
    }
}

// ============================================================================
// TREE WALK
// ============================================================================

struct Walker<'l, L: ?Sized> {
    listener: &'l mut L,
    source_name: Arc<str>,
}

impl<L: RuleListener + ?Sized> Walker<'_, L> {
    fn position(&self, pair: &Pair<Rule>) -> Position {
        let (line, column) = pair.line_col();
        Position::new(line as u32, column as u32).with_source(Arc::clone(&self.source_name))
    }

    fn visit(&mut self, pair: Pair<Rule>, kind: RuleKind) {
        let position = self.position(&pair);
        self.listener.enter_rule(kind, &position, pair.as_str());
        let mut context = RuleContext::new();
        self.collect(pair.into_inner(), &mut context);
        self.listener.exit_rule(kind, &position, &context);
    }

    fn collect(&mut self, pairs: Pairs<Rule>, context: &mut RuleContext) {
        for pair in pairs {
            match classify(pair.as_rule()) {
                Node::Rule(kind) => {
                    self.visit(pair, kind);
                    context.children.push(ContextChild::Rule { kind });
                }
                Node::Token(kind) => {
                    let position = self.position(&pair);
                    context
                        .children
                        .push(ContextChild::Token(Token::new(kind, pair.as_str(), position)));
                }
                Node::Transparent => self.collect(pair.into_inner(), context),
            }
        }
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn describe_rule(rule: &Rule) -> String {
    let name = format!("{:?}", rule);
    if let Some(keyword) = name.strip_prefix("KW_") {
        return format!("'{}'", keyword.to_lowercase());
    }
    let symbol = match rule {
        Rule::ASSIGN => "'='",
        Rule::COMMA => "','",
        Rule::COLON => "':'",
        Rule::LPAREN => "'('",
        Rule::RPAREN => "')'",
        Rule::LBRACK => "'['",
        Rule::RBRACK => "']'",
        Rule::LBRACE => "'{'",
        Rule::RBRACE => "'}'",
        Rule::DOT => "'.'",
        Rule::IDENTIFIER => "identifier",
        Rule::STRING => "string",
        Rule::NUMBER => "number",
        Rule::METADATA => "metadata line",
        Rule::EOI => "end of input",
        _ => return name.replace('_', " "),
    };
    symbol.to_string()
}

fn convert_parse_error(error: Error<Rule>, source: &SourceContext) -> StepError {
    let error = error.renamed_rules(describe_rule);
    let (start, end) = match error.location {
        InputLocation::Pos(pos) => (pos, pos),
        InputLocation::Span((start, end)) => (start, end),
    };
    let message = error.variant.message().to_string();
    tracing::debug!(source = %source.name, offset = start, "{}", message);
    StepError::Syntax {
        message,
        src: source.to_named_source(),
        span: (start..end.max(start)).into(),
    }
}
