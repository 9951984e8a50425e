//! Literal, collection and call assembly.

use super::{stack::StackItem, AstBuilder};
use crate::{
    ast::{ExprKind, Expression, MapEntry, Number, Position},
    diagnostics::DiagnosticKind,
    syntax::events::{RuleContext, RuleKind, TokenKind},
};

// ============================================================================
// DECODING
// ============================================================================

/// Decodes a quoted string literal (either quote style) into its value.
pub fn unescape(text: &str) -> Result<String, String> {
    let inner = strip_quotes(text).ok_or_else(|| format!("string literal {} is not quoted", text))?;
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some('u') => result.push(unicode_escape(&mut chars)?),
            Some(other) => return Err(format!("unknown escape sequence '\\{}'", other)),
            None => return Err("string ends with a lone backslash".to_string()),
        }
    }
    Ok(result)
}

fn strip_quotes(text: &str) -> Option<&str> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }
    Some(&text[1..text.len() - 1])
}

/// `\u{1F600}` style escape; the leading `\u` is already consumed.
fn unicode_escape(chars: &mut std::str::Chars<'_>) -> Result<char, String> {
    if chars.next() != Some('{') {
        return Err("expected '{' after '\\u'".to_string());
    }
    let digits: String = chars.by_ref().take_while(|c| *c != '}').collect();
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid unicode escape '\\u{{{}}}'", digits))
}

/// Strips the triple backticks of a raw string.
pub fn raw_content(text: &str) -> &str {
    text.strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(text)
}

/// Integer when the text has no fraction or exponent, otherwise float.
/// `None` when the text fits neither.
pub fn parse_number(text: &str) -> Option<Number> {
    let is_float = text.contains(['.', 'e', 'E']);
    if is_float {
        text.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Number::Float)
    } else {
        text.parse::<i64>().ok().map(Number::Int)
    }
}

/// Reads the leading quoted key of a map entry's raw text.
fn leading_string(raw: &str) -> Option<&str> {
    let raw = raw.trim_start();
    let quote = raw.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let mut escaped = false;
    for (index, ch) in raw.char_indices().skip(1) {
        match ch {
            '\\' if !escaped => escaped = true,
            c if c == quote && !escaped => return Some(&raw[..=index]),
            _ => escaped = false,
        }
    }
    None
}

// ============================================================================
// ASSEMBLY
// ============================================================================

impl AstBuilder {
    pub(crate) fn exit_string(&mut self, position: &Position, ctx: &RuleContext) {
        if let Some(token) = ctx.first(TokenKind::RawString) {
            let value = raw_content(&token.text).to_string();
            self.push_expr(ExprKind::StringLiteral { value, is_raw: true }, position);
            return;
        }
        let text = ctx.first(TokenKind::String).map(|t| t.text.clone()).unwrap_or_default();
        let value = match unescape(&text) {
            Ok(value) => value,
            Err(reason) => {
                self.diagnostics.warn(
                    DiagnosticKind::InvalidLiteral,
                    format!("{}; keeping the literal text", reason),
                    position,
                );
                strip_quotes(&text).unwrap_or(&text).to_string()
            }
        };
        self.push_expr(ExprKind::StringLiteral { value, is_raw: false }, position);
    }

    pub(crate) fn exit_number(&mut self, position: &Position, ctx: &RuleContext) {
        let text = ctx.first(TokenKind::Number).map(|t| t.text.as_str()).unwrap_or("");
        let value = match parse_number(text) {
            Some(value) => value,
            None => {
                self.diagnostics.report(
                    DiagnosticKind::InvalidLiteral,
                    self.options.number_fallback,
                    format!("numeric literal '{}' is out of range", text),
                    position,
                );
                Number::Unparsed(text.to_string())
            }
        };
        self.push_expr(ExprKind::NumberLiteral { value }, position);
    }

    pub(crate) fn exit_boolean(&mut self, position: &Position, ctx: &RuleContext) {
        let value = ctx.has(TokenKind::True);
        if !value && !ctx.has(TokenKind::False) {
            self.diagnostics.error(
                DiagnosticKind::InvalidLiteral,
                "boolean literal is neither true nor false",
                position,
            );
        }
        self.push_expr(ExprKind::BooleanLiteral { value }, position);
    }

    pub(crate) fn exit_variable(&mut self, position: &Position, ctx: &RuleContext) {
        match ctx.first(TokenKind::Identifier) {
            Some(token) => {
                let name = token.text.clone();
                self.push_expr(ExprKind::Variable { name }, position);
            }
            None => {
                self.diagnostics.error(
                    DiagnosticKind::MissingName,
                    "variable reference has no identifier",
                    position,
                );
                self.push_item(StackItem::Expr(Expression::error(
                    "missing variable name",
                    position.clone(),
                )));
            }
        }
    }

    pub(crate) fn exit_placeholder(&mut self, position: &Position, ctx: &RuleContext) {
        let text = ctx.first(TokenKind::Placeholder).map(|t| t.text.as_str()).unwrap_or("");
        let name = text
            .trim()
            .trim_start_matches("{{")
            .trim_end_matches("}}")
            .trim()
            .to_string();
        if name.is_empty() {
            self.diagnostics.error(
                DiagnosticKind::MissingName,
                "placeholder has no name",
                position,
            );
        }
        self.push_expr(ExprKind::Placeholder { name }, position);
    }

    pub(crate) fn exit_list(&mut self, position: &Position, ctx: &RuleContext) {
        let elements = self.pop_exprs(ctx.child_count(RuleKind::Expression), position);
        self.push_expr(ExprKind::ListLiteral { elements }, position);
    }

    // ------------------------------------------------------------------------
    // Maps
    // ------------------------------------------------------------------------

    /// The key is pushed on enter so it sits below the value when the entry exits.
    pub(crate) fn enter_map_entry(&mut self, position: &Position, raw_text: &str) {
        let key = match leading_string(raw_text).map(unescape) {
            Some(Ok(key)) => key,
            Some(Err(reason)) => {
                self.diagnostics
                    .warn(DiagnosticKind::InvalidLiteral, reason, position);
                leading_string(raw_text)
                    .and_then(strip_quotes)
                    .unwrap_or_default()
                    .to_string()
            }
            None => {
                self.diagnostics.error(
                    DiagnosticKind::InvalidLiteral,
                    "map key must be a string literal",
                    position,
                );
                String::new()
            }
        };
        self.push_item(StackItem::MapKey {
            key,
            position: position.clone(),
        });
    }

    pub(crate) fn exit_map_entry(&mut self, position: &Position) {
        let value = self.pop_expr(position);
        let (key, key_position) = self.pop_map_key(position);
        self.push_item(StackItem::MapEntry(MapEntry {
            key,
            value,
            position: key_position,
        }));
    }

    pub(crate) fn exit_map(&mut self, position: &Position, ctx: &RuleContext) {
        let entries = self.pop_entries(ctx.child_count(RuleKind::MapEntry), position);
        if self.options.warn_duplicate_map_keys {
            for (index, entry) in entries.iter().enumerate() {
                if entries[..index].iter().any(|earlier| earlier.key == entry.key) {
                    self.diagnostics.warn(
                        DiagnosticKind::DuplicateMapKey,
                        format!("map key \"{}\" is repeated; the last value wins", entry.key),
                        &entry.position,
                    );
                }
            }
        }
        self.push_expr(ExprKind::MapLiteral { entries }, position);
    }

    // ------------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------------

    pub(crate) fn exit_function_call(&mut self, position: &Position, ctx: &RuleContext) {
        let name: String = ctx
            .tokens_of(&[TokenKind::Identifier, TokenKind::Dot])
            .map(|t| t.text.as_str())
            .collect();
        if name.is_empty() {
            self.diagnostics.error(
                DiagnosticKind::MissingName,
                "function call has no name",
                position,
            );
        }
        let arguments = self.pop_exprs(ctx.child_count(RuleKind::Expression), position);
        self.push_expr(ExprKind::FunctionCall { name, arguments }, position);
    }

    pub(crate) fn exit_eval(&mut self, position: &Position) {
        let argument = Box::new(self.pop_expr(position));
        self.push_expr(ExprKind::Eval { argument }, position);
    }
}
