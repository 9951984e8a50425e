//! The two construction stacks.
//!
//! The value stack is the only channel through which partially built
//! expressions (and finished bodies) travel between rule callbacks. The block
//! stack only routes which step list new steps are appended to.

use std::mem;

use thiserror::Error;

use crate::ast::{Expression, LValue, MapEntry, Position, Step};

/// Everything that can sit on the value stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StackItem {
    Expr(Expression),
    LValue(LValue),
    /// A map key parsed on entry to a map entry, waiting for its value.
    MapKey { key: String, position: Position },
    MapEntry(MapEntry),
    /// A finished statement list handed up by a block exit.
    Body(Vec<Step>),
}

impl StackItem {
    pub fn type_name(&self) -> &'static str {
        match self {
            StackItem::Expr(_) => "expression",
            StackItem::LValue(_) => "lvalue",
            StackItem::MapKey { .. } => "map key",
            StackItem::MapEntry(_) => "map entry",
            StackItem::Body(_) => "statement body",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("value stack underflow: needed {needed} item(s), found {available}")]
    Underflow { needed: usize, available: usize },
    #[error("block stack underflow: no enclosing block to restore")]
    NoEnclosingBlock,
}

#[derive(Debug, Default)]
pub struct ValueStack {
    items: Vec<StackItem>,
}

impl ValueStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: StackItem) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Result<StackItem, StackError> {
        self.items.pop().ok_or(StackError::Underflow {
            needed: 1,
            available: 0,
        })
    }

    /// Removes the top `n` items and returns them bottom-to-top (source order).
    ///
    /// On underflow the stack is left untouched.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<StackItem>, StackError> {
        let available = self.items.len();
        if available < n {
            return Err(StackError::Underflow {
                needed: n,
                available,
            });
        }
        Ok(self.items.split_off(available - n))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Discards everything, returning what was left behind.
    pub fn drain(&mut self) -> Vec<StackItem> {
        mem::take(&mut self.items)
    }
}

/// Tracks the active step list and the lists of every enclosing block.
#[derive(Debug, Default)]
pub struct BlockStack {
    saved: Vec<Vec<Step>>,
    current: Vec<Step>,
}

impl BlockStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves the active list and starts a new, empty one.
    pub fn enter(&mut self) {
        let parent = mem::take(&mut self.current);
        self.saved.push(parent);
    }

    /// Hands back the finished list and restores the enclosing one.
    pub fn exit(&mut self) -> Result<Vec<Step>, StackError> {
        let parent = self.saved.pop().ok_or(StackError::NoEnclosingBlock)?;
        Ok(mem::replace(&mut self.current, parent))
    }

    pub fn append(&mut self, step: Step) {
        self.current.push(step);
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Takes whatever sits in the outermost (root) list.
    pub fn take_current(&mut self) -> Vec<Step> {
        mem::take(&mut self.current)
    }

    /// Unwinds every open block, returning the number of blocks abandoned.
    pub fn unwind(&mut self) -> usize {
        let depth = self.saved.len();
        if let Some(root) = self.saved.drain(..).next() {
            self.current = root;
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, StepKind};

    fn var(name: &str) -> StackItem {
        StackItem::Expr(Expression::new(
            ExprKind::Variable { name: name.into() },
            Position::default(),
        ))
    }

    fn brk() -> Step {
        Step::new(StepKind::Break, Position::default())
    }

    #[test]
    fn test_pop_n_preserves_source_order() {
        let mut stack = ValueStack::new();
        stack.push(var("a"));
        stack.push(var("b"));
        stack.push(var("c"));
        let popped = stack.pop_n(2).unwrap();
        assert_eq!(popped, vec![var("b"), var("c")]);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_pop_n_underflow_leaves_stack_untouched() {
        let mut stack = ValueStack::new();
        stack.push(var("a"));
        let err = stack.pop_n(3).unwrap_err();
        assert_eq!(
            err,
            StackError::Underflow {
                needed: 3,
                available: 1
            }
        );
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_pop_empty_is_underflow() {
        let mut stack = ValueStack::new();
        assert!(matches!(stack.pop(), Err(StackError::Underflow { .. })));
    }

    #[test]
    fn test_block_enter_exit_restores_parent() {
        let mut blocks = BlockStack::new();
        blocks.append(brk());
        blocks.enter();
        blocks.append(brk());
        blocks.append(brk());
        assert_eq!(blocks.depth(), 1);
        let inner = blocks.exit().unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(blocks.depth(), 0);
        assert_eq!(blocks.take_current().len(), 1);
    }

    #[test]
    fn test_block_exit_without_enter_fails() {
        let mut blocks = BlockStack::new();
        assert_eq!(blocks.exit(), Err(StackError::NoEnclosingBlock));
    }

    #[test]
    fn test_unwind_restores_root() {
        let mut blocks = BlockStack::new();
        blocks.append(brk());
        blocks.enter();
        blocks.enter();
        assert_eq!(blocks.unwind(), 2);
        assert_eq!(blocks.depth(), 0);
        assert_eq!(blocks.take_current().len(), 1);
    }
}
