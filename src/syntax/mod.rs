//! Front end: the rule-event contract and the pest-based parser that honors it.

pub mod events;
pub mod parser;

pub use events::{ContextChild, RuleContext, RuleEvent, RuleKind, RuleListener, Token, TokenKind};
