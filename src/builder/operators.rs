//! Operator precedence assembly.
//!
//! Precedence is encoded by rule nesting in the grammar, so no precedence
//! table is needed here. Each binary level sees `k` of its own operator tokens
//! and `k + 1` operands already on the value stack (pushed by the next tighter
//! level) and folds them left-associatively. Exponentiation is the one
//! right-associative level: the nested right operand exits first, so the
//! exponent sits on top of the base.

use super::{stack::StackItem, AstBuilder};
use crate::{
    ast::{BinaryOperator, ExprKind, Expression, Position, UnaryOperator},
    syntax::events::{RuleContext, RuleKind, TokenKind},
};

/// Operator tokens owned by each binary precedence level.
pub fn level_operators(kind: RuleKind) -> &'static [TokenKind] {
    match kind {
        RuleKind::LogicalOr => &[TokenKind::Or],
        RuleKind::LogicalAnd => &[TokenKind::And],
        RuleKind::BitwiseOr => &[TokenKind::Pipe],
        RuleKind::BitwiseXor => &[TokenKind::Caret],
        RuleKind::BitwiseAnd => &[TokenKind::Amp],
        RuleKind::Equality => &[TokenKind::Eq, TokenKind::NotEq],
        RuleKind::Relational => &[TokenKind::Gt, TokenKind::Lt, TokenKind::Gte, TokenKind::Lte],
        RuleKind::Additive => &[TokenKind::Plus, TokenKind::Minus],
        RuleKind::Multiplicative => &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
        _ => &[],
    }
}

pub fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Or => BinaryOperator::Or,
        TokenKind::And => BinaryOperator::And,
        TokenKind::Pipe => BinaryOperator::BitOr,
        TokenKind::Caret => BinaryOperator::BitXor,
        TokenKind::Amp => BinaryOperator::BitAnd,
        TokenKind::Eq => BinaryOperator::Eq,
        TokenKind::NotEq => BinaryOperator::NotEq,
        TokenKind::Gt => BinaryOperator::Gt,
        TokenKind::Lt => BinaryOperator::Lt,
        TokenKind::Gte => BinaryOperator::Gte,
        TokenKind::Lte => BinaryOperator::Lte,
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Sub,
        TokenKind::Star => BinaryOperator::Mul,
        TokenKind::Slash => BinaryOperator::Div,
        TokenKind::Percent => BinaryOperator::Mod,
        TokenKind::Pow => BinaryOperator::Pow,
        _ => return None,
    };
    Some(op)
}

pub fn unary_operator(kind: TokenKind) -> Option<UnaryOperator> {
    match kind {
        TokenKind::Not => Some(UnaryOperator::Not),
        TokenKind::Minus => Some(UnaryOperator::Neg),
        TokenKind::Tilde => Some(UnaryOperator::BitNot),
        _ => None,
    }
}

fn binary(left: Expression, operator: BinaryOperator, right: Expression, position: Position) -> Expression {
    Expression::new(
        ExprKind::BinaryOp {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        },
        position,
    )
}

impl AstBuilder {
    pub(crate) fn exit_binary_level(&mut self, kind: RuleKind, position: &Position, ctx: &RuleContext) {
        let operators: Vec<(BinaryOperator, Position)> = ctx
            .tokens_of(level_operators(kind))
            .filter_map(|t| binary_operator(t.kind).map(|op| (op, t.position.clone())))
            .collect();
        // No operator at this level: the single child value passes through.
        if operators.is_empty() {
            return;
        }

        let operands = self.pop_exprs(operators.len() + 1, position);
        if kind == RuleKind::Additive
            && operators.iter().all(|(op, _)| *op == BinaryOperator::Add)
            && operands.iter().any(Expression::is_string_literal)
        {
            self.push_expr(ExprKind::Concatenation { operands }, position);
            return;
        }

        let mut operands = operands.into_iter();
        let Some(mut result) = operands.next() else {
            return;
        };
        for ((operator, op_position), right) in operators.into_iter().zip(operands) {
            result = binary(result, operator, right, op_position);
        }
        self.push_item(StackItem::Expr(result));
    }

    pub(crate) fn exit_unary(&mut self, position: &Position, ctx: &RuleContext) {
        let Some((operator, op_position)) = ctx
            .tokens()
            .find_map(|t| unary_operator(t.kind).map(|op| (op, t.position.clone())))
        else {
            return;
        };
        let operand = self.pop_expr(position);
        self.push_expr(
            ExprKind::UnaryOp {
                operator,
                operand: Box::new(operand),
            },
            &op_position,
        );
    }

    pub(crate) fn exit_power(&mut self, position: &Position, ctx: &RuleContext) {
        let Some(pow) = ctx.first(TokenKind::Pow) else {
            return;
        };
        let op_position = pow.position.clone();
        let exponent = self.pop_expr(position);
        let base = self.pop_expr(position);
        let result = binary(base, BinaryOperator::Pow, exponent, op_position);
        self.push_item(StackItem::Expr(result));
    }
}
