//! Lvalue and accessor-chain resolution.
//!
//! Bracket expressions are pushed by their own rules in source order, so the
//! owning rule pops all of them at once (already in source order) and then
//! walks its children left to right, pairing each `[`…`]` group with the next
//! popped expression and each `.` with the identifier that follows it.

use std::{iter::Peekable, slice, vec};

use super::{stack::StackItem, AstBuilder};
use crate::{
    ast::{Accessor, ExprKind, Expression, LValue, Position},
    diagnostics::DiagnosticKind,
    syntax::events::{ContextChild, RuleContext, TokenKind},
};

/// One resolved access step.
enum Segment {
    Field { name: String, position: Position },
    Index { key: Expression, position: Position },
}

fn rule_children(ctx: &RuleContext) -> usize {
    ctx.children
        .iter()
        .filter(|child| matches!(child, ContextChild::Rule { .. }))
        .count()
}

impl AstBuilder {
    pub(crate) fn exit_lvalue(&mut self, position: &Position, ctx: &RuleContext) {
        let mut values = self.pop_exprs(rule_children(ctx), position).into_iter();

        let base = ctx
            .children
            .iter()
            .enumerate()
            .find_map(|(index, child)| match child {
                ContextChild::Token(token) if token.kind == TokenKind::Identifier => {
                    Some((index, token))
                }
                _ => None,
            });
        let (identifier, rest) = match base {
            Some((index, token)) => (token.text.clone(), &ctx.children[index + 1..]),
            None => {
                self.diagnostics.error(
                    DiagnosticKind::MalformedLvalue,
                    "assignment target must start with an identifier",
                    position,
                );
                (String::new(), &ctx.children[..])
            }
        };

        let segments = self.resolve_segments(rest, &mut values, &identifier, position);
        let accessors = segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Field { name, .. } => Accessor::Dot { field_name: name },
                Segment::Index { key, .. } => Accessor::Bracket { index_or_key: key },
            })
            .collect();
        self.push_item(StackItem::LValue(LValue {
            identifier,
            accessors,
            position: position.clone(),
        }));
    }

    /// `primary ( [expr] | .name )*` in expression position.
    pub(crate) fn exit_accessor_expr(&mut self, position: &Position, ctx: &RuleContext) {
        let has_segments = ctx.has(TokenKind::LBrack) || ctx.has(TokenKind::Dot);
        if !has_segments {
            return;
        }
        let mut values = self.pop_exprs(rule_children(ctx), position).into_iter();
        let Some(base) = values.next() else {
            return;
        };
        let rest = match ctx
            .children
            .iter()
            .position(|child| matches!(child, ContextChild::Rule { .. }))
        {
            Some(index) => &ctx.children[index + 1..],
            None => &ctx.children[..],
        };
        let owner = base.pretty();
        let segments = self.resolve_segments(rest, &mut values, &owner, position);

        let result = segments.into_iter().fold(base, |collection, segment| {
            let (accessor, at) = match segment {
                Segment::Field { name, position } => (
                    Expression::new(
                        ExprKind::StringLiteral {
                            value: name,
                            is_raw: false,
                        },
                        position.clone(),
                    ),
                    position,
                ),
                Segment::Index { key, position } => (key, position),
            };
            Expression::new(
                ExprKind::ElementAccess {
                    collection: Box::new(collection),
                    accessor: Box::new(accessor),
                },
                at,
            )
        });
        self.push_item(StackItem::Expr(result));
    }

    fn resolve_segments(
        &mut self,
        children: &[ContextChild],
        values: &mut vec::IntoIter<Expression>,
        owner: &str,
        position: &Position,
    ) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut iter: Peekable<slice::Iter<'_, ContextChild>> = children.iter().peekable();
        while let Some(child) = iter.next() {
            let ContextChild::Token(token) = child else {
                continue;
            };
            match token.kind {
                TokenKind::Dot => match iter.peek() {
                    Some(ContextChild::Token(next)) if next.kind == TokenKind::Identifier => {
                        segments.push(Segment::Field {
                            name: next.text.clone(),
                            position: token.position.clone(),
                        });
                        iter.next();
                    }
                    _ => {
                        let message = format!("expected a field name after '.' in '{}'", owner);
                        self.diagnostics.error(
                            DiagnosticKind::MalformedLvalue,
                            message.clone(),
                            &token.position,
                        );
                        segments.push(Segment::Index {
                            key: Expression::error(message, token.position.clone()),
                            position: token.position.clone(),
                        });
                    }
                },
                TokenKind::LBrack => {
                    let has_expression = matches!(iter.peek(), Some(ContextChild::Rule { .. }));
                    let key = if has_expression {
                        iter.next();
                        values.next()
                    } else {
                        None
                    };
                    let key = match key {
                        Some(key) => key,
                        None => {
                            let message = format!("expected an index or key inside '[]' in '{}'", owner);
                            self.diagnostics.error(
                                DiagnosticKind::MalformedLvalue,
                                message.clone(),
                                &token.position,
                            );
                            Expression::error(message, token.position.clone())
                        }
                    };
                    segments.push(Segment::Index {
                        key,
                        position: token.position.clone(),
                    });
                }
                _ => {}
            }
        }
        if values.len() > 0 {
            self.diagnostics.error(
                DiagnosticKind::MalformedLvalue,
                format!(
                    "{} bracket expression(s) in '{}' have no matching '['",
                    values.len(),
                    owner
                ),
                position,
            );
        }
        segments
    }
}
