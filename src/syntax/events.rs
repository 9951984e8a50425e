//! The rule-event contract between a parsing front end and the construction engine.
//!
//! A front end walks its concrete syntax tree and reports, in strict nesting
//! order, one `enter` and one `exit` per grammar rule instance. The exit event
//! carries a [`RuleContext`]: the tokens that belong directly to that rule
//! instance plus the kinds of its direct child rule instances. Nothing else
//! crosses the boundary, so any front end honoring this contract can drive
//! the engine.

use std::fmt;

use serde::Serialize;

use crate::ast::Position;

/// Grammar rules the construction engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuleKind {
    Program,
    Procedure,
    Command,
    Block,
    SetStatement,
    CallStatement,
    ReturnStatement,
    EmitStatement,
    MustStatement,
    FailStatement,
    ClearErrorStatement,
    BreakStatement,
    ContinueStatement,
    IfStatement,
    WhileStatement,
    ForStatement,
    OnErrorStatement,
    LValue,
    Expression,
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Equality,
    Relational,
    Additive,
    Multiplicative,
    Unary,
    Power,
    AccessorExpr,
    StringLiteral,
    NumberLiteral,
    BooleanLiteral,
    NilLiteral,
    Variable,
    Last,
    LastCallResult,
    Placeholder,
    ListLiteral,
    MapLiteral,
    MapEntry,
    FunctionCall,
    Eval,
}

/// Token kinds a rule context can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Identifier,
    String,
    RawString,
    Number,
    Placeholder,
    Metadata,

    Func,
    Needs,
    Optional,
    Returns,
    Means,
    EndFunc,
    Command,
    EndCommand,
    Set,
    Call,
    Return,
    Emit,
    Must,
    Fail,
    ClearError,
    Break,
    Continue,
    If,
    Else,
    EndIf,
    While,
    EndWhile,
    For,
    Each,
    In,
    EndFor,
    OnError,
    EndOn,
    True,
    False,
    Nil,
    Last,
    LastCall,
    Eval,

    Or,
    And,
    Not,
    Pipe,
    Caret,
    Amp,
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    Tilde,

    Dot,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Colon,
    Assign,
}

/// A single token owned by a rule instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}

/// One direct child of a rule instance: a token, or a nested rule instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "child", rename_all = "snake_case")]
pub enum ContextChild {
    Token(Token),
    Rule { kind: RuleKind },
}

/// Per-rule-instance accessors handed over on exit.
///
/// Children are kept in source order with tokens and nested rules
/// interleaved, so a consumer can tell which bracket group owns which
/// sub-expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleContext {
    pub children: Vec<ContextChild>,
}

impl RuleContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a token (builder style, handy for synthetic event streams).
    pub fn token(mut self, kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        self.children
            .push(ContextChild::Token(Token::new(kind, text, position)));
        self
    }

    /// Appends a nested rule instance (builder style).
    pub fn child(mut self, kind: RuleKind) -> Self {
        self.children.push(ContextChild::Rule { kind });
        self
    }

    /// Direct child tokens in source order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.children.iter().filter_map(|child| match child {
            ContextChild::Token(token) => Some(token),
            ContextChild::Rule { .. } => None,
        })
    }

    pub fn count(&self, kind: TokenKind) -> usize {
        self.tokens().filter(|t| t.kind == kind).count()
    }

    pub fn has(&self, kind: TokenKind) -> bool {
        self.tokens().any(|t| t.kind == kind)
    }

    pub fn first(&self, kind: TokenKind) -> Option<&Token> {
        self.tokens().find(|t| t.kind == kind)
    }

    /// Tokens whose kind is one of `kinds`, in source order.
    pub fn tokens_of<'a>(&'a self, kinds: &'a [TokenKind]) -> impl Iterator<Item = &'a Token> + 'a {
        self.tokens().filter(move |t| kinds.contains(&t.kind))
    }

    pub fn child_count(&self, kind: RuleKind) -> usize {
        self.children
            .iter()
            .filter(|child| matches!(child, ContextChild::Rule { kind: k } if *k == kind))
            .count()
    }
}

/// One traversal event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RuleEvent {
    Enter {
        kind: RuleKind,
        position: Position,
        raw_text: String,
    },
    Exit {
        kind: RuleKind,
        position: Position,
        context: RuleContext,
    },
}

impl fmt::Display for RuleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleEvent::Enter { kind, position, .. } => write!(f, "enter {:?} @{}", kind, position),
            RuleEvent::Exit {
                kind,
                position,
                context,
            } => {
                write!(f, "exit  {:?} @{}", kind, position)?;
                let tokens = context
                    .tokens()
                    .map(|t| format!("{:?} {:?}", t.kind, t.text))
                    .collect::<Vec<_>>();
                if !tokens.is_empty() {
                    write!(f, " [{}]", tokens.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// Receiver of traversal callbacks, called in strict pre/post order.
pub trait RuleListener {
    fn enter_rule(&mut self, kind: RuleKind, position: &Position, raw_text: &str);
    fn exit_rule(&mut self, kind: RuleKind, position: &Position, context: &RuleContext);
}

/// Recording listener: captures the stream for later replay or inspection.
impl RuleListener for Vec<RuleEvent> {
    fn enter_rule(&mut self, kind: RuleKind, position: &Position, raw_text: &str) {
        self.push(RuleEvent::Enter {
            kind,
            position: position.clone(),
            raw_text: raw_text.to_string(),
        });
    }

    fn exit_rule(&mut self, kind: RuleKind, position: &Position, context: &RuleContext) {
        self.push(RuleEvent::Exit {
            kind,
            position: position.clone(),
            context: context.clone(),
        });
    }
}

/// Feeds a recorded event stream into a listener.
pub fn replay<L, I>(events: I, listener: &mut L)
where
    L: RuleListener + ?Sized,
    I: IntoIterator<Item = RuleEvent>,
{
    for event in events {
        match event {
            RuleEvent::Enter {
                kind,
                position,
                raw_text,
            } => listener.enter_rule(kind, &position, &raw_text),
            RuleEvent::Exit {
                kind,
                position,
                context,
            } => listener.exit_rule(kind, &position, &context),
        }
    }
}
