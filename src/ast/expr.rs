//! Expression and lvalue nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Position;

/// A positioned expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(flatten)]
    pub kind: ExprKind,
    pub position: Position,
}

/// The closed set of expression variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExprKind {
    StringLiteral { value: String, is_raw: bool },
    NumberLiteral { value: Number },
    BooleanLiteral { value: bool },
    NilLiteral,
    Variable { name: String },
    LastCallResult,
    Last,
    ListLiteral { elements: Vec<Expression> },
    MapLiteral { entries: Vec<MapEntry> },
    ElementAccess {
        collection: Box<Expression>,
        accessor: Box<Expression>,
    },
    Concatenation { operands: Vec<Expression> },
    BinaryOp {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    FunctionCall { name: String, arguments: Vec<Expression> },
    Placeholder { name: String },
    Eval { argument: Box<Expression> },
    /// Sentinel for a construction failure that was recovered from.
    Error { message: String },
}

/// Numeric literal payload.
///
/// `Unparsed` keeps the original text of a literal that fit neither `i64`
/// nor `f64`; the execution engine decides what it means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
    Unparsed(String),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(n) => write!(f, "{}", n),
            Number::Unparsed(text) => write!(f, "{}", text),
        }
    }
}

/// One `"key": value` pair of a map literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: String,
    pub value: Expression,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "or")]
    Or,
    #[serde(rename = "and")]
    And,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "**")]
    Pow,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "or",
            BinaryOperator::And => "and",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gte => ">=",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Pow => "**",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "not")]
    Not,
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "~")]
    BitNot,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "not",
            UnaryOperator::Neg => "-",
            UnaryOperator::BitNot => "~",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EXPRESSION API
// ============================================================================

impl Expression {
    pub fn new(kind: ExprKind, position: Position) -> Self {
        Self { kind, position }
    }

    /// Builds the recovery sentinel used when construction cannot produce a real node.
    pub fn error(message: impl Into<String>, position: Position) -> Self {
        Self::new(
            ExprKind::Error {
                message: message.into(),
            },
            position,
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error { .. })
    }

    pub fn is_string_literal(&self) -> bool {
        matches!(self.kind, ExprKind::StringLiteral { .. })
    }

    /// Returns the variant name of this node (for diagnostics).
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::StringLiteral { .. } => "StringLiteral",
            ExprKind::NumberLiteral { .. } => "NumberLiteral",
            ExprKind::BooleanLiteral { .. } => "BooleanLiteral",
            ExprKind::NilLiteral => "NilLiteral",
            ExprKind::Variable { .. } => "Variable",
            ExprKind::LastCallResult => "LastCallResult",
            ExprKind::Last => "Last",
            ExprKind::ListLiteral { .. } => "ListLiteral",
            ExprKind::MapLiteral { .. } => "MapLiteral",
            ExprKind::ElementAccess { .. } => "ElementAccess",
            ExprKind::Concatenation { .. } => "Concatenation",
            ExprKind::BinaryOp { .. } => "BinaryOp",
            ExprKind::UnaryOp { .. } => "UnaryOp",
            ExprKind::FunctionCall { .. } => "FunctionCall",
            ExprKind::Placeholder { .. } => "Placeholder",
            ExprKind::Eval { .. } => "Eval",
            ExprKind::Error { .. } => "Error",
        }
    }

    /// Pretty-prints the expression with every operator application parenthesized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stepscript::ast::{BinaryOperator, ExprKind, Expression, Number, Position};
    /// let one = Expression::new(ExprKind::NumberLiteral { value: Number::Int(1) }, Position::default());
    /// let two = Expression::new(ExprKind::NumberLiteral { value: Number::Int(2) }, Position::default());
    /// let sum = Expression::new(
    ///     ExprKind::BinaryOp { left: Box::new(one), operator: BinaryOperator::Add, right: Box::new(two) },
    ///     Position::default(),
    /// );
    /// assert_eq!(sum.pretty(), "(1 + 2)");
    /// ```
    pub fn pretty(&self) -> String {
        match &self.kind {
            ExprKind::StringLiteral { value, is_raw: true } => format!("```{}```", value),
            ExprKind::StringLiteral { value, .. } => format!("{:?}", value),
            ExprKind::NumberLiteral { value } => value.to_string(),
            ExprKind::BooleanLiteral { value } => value.to_string(),
            ExprKind::NilLiteral => "nil".to_string(),
            ExprKind::Variable { name } => name.clone(),
            ExprKind::LastCallResult => "last_call".to_string(),
            ExprKind::Last => "last".to_string(),
            ExprKind::ListLiteral { elements } => format!("[{}]", pretty_list(elements)),
            ExprKind::MapLiteral { entries } => {
                let inner = entries
                    .iter()
                    .map(|e| format!("{:?}: {}", e.key, e.value.pretty()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", inner)
            }
            ExprKind::ElementAccess {
                collection,
                accessor,
            } => format!("{}[{}]", collection.pretty(), accessor.pretty()),
            ExprKind::Concatenation { operands } => format!("concat({})", pretty_list(operands)),
            ExprKind::BinaryOp {
                left,
                operator,
                right,
            } => format!("({} {} {})", left.pretty(), operator, right.pretty()),
            ExprKind::UnaryOp { operator, operand } => {
                format!("({} {})", operator, operand.pretty())
            }
            ExprKind::FunctionCall { name, arguments } => {
                format!("{}({})", name, pretty_list(arguments))
            }
            ExprKind::Placeholder { name } => format!("{{{{{}}}}}", name),
            ExprKind::Eval { argument } => format!("eval({})", argument.pretty()),
            ExprKind::Error { message } => format!("<error: {}>", message),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty())
    }
}

fn pretty_list(exprs: &[Expression]) -> String {
    exprs
        .iter()
        .map(Expression::pretty)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves duplicate map keys with last-write-wins semantics.
///
/// Keys keep the order of their first occurrence; the value comes from the
/// last entry with that key.
pub fn resolve_map_entries(entries: &[MapEntry]) -> Vec<(&str, &Expression)> {
    let mut resolved: Vec<(&str, &Expression)> = Vec::with_capacity(entries.len());
    for entry in entries {
        match resolved.iter_mut().find(|(key, _)| *key == entry.key) {
            Some(slot) => slot.1 = &entry.value,
            None => resolved.push((entry.key.as_str(), &entry.value)),
        }
    }
    resolved
}

// ============================================================================
// LVALUES
// ============================================================================

/// One segment of an lvalue access chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessor {
    Dot { field_name: String },
    Bracket { index_or_key: Expression },
}

/// An assignable target: a base identifier plus accessors in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LValue {
    pub identifier: String,
    pub accessors: Vec<Accessor>,
    pub position: Position,
}

impl LValue {
    pub fn pretty(&self) -> String {
        let mut out = self.identifier.clone();
        for accessor in &self.accessors {
            match accessor {
                Accessor::Dot { field_name } => {
                    out.push('.');
                    out.push_str(field_name);
                }
                Accessor::Bracket { index_or_key } => {
                    out.push('[');
                    out.push_str(&index_or_key.pretty());
                    out.push(']');
                }
            }
        }
        out
    }
}

impl fmt::Display for LValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty())
    }
}
