//! Statement nodes ("steps").

use serde::{Deserialize, Serialize};

use super::{Expression, LValue, Position};

/// One executable statement. Block-bearing steps own their bodies outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub kind: StepKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    Set {
        lvalues: Vec<LValue>,
        value: Expression,
    },
    Call {
        call: Expression,
    },
    Return {
        value: Option<Expression>,
    },
    Emit {
        value: Option<Expression>,
    },
    Must {
        condition: Expression,
    },
    Fail {
        message: Option<Expression>,
    },
    ClearError,
    Break,
    Continue,
    If {
        condition: Expression,
        body: Vec<Step>,
        else_body: Vec<Step>,
    },
    While {
        condition: Expression,
        body: Vec<Step>,
    },
    For {
        loop_var: String,
        collection: Expression,
        body: Vec<Step>,
    },
    OnError {
        body: Vec<Step>,
    },
}

impl Step {
    pub fn new(kind: StepKind, position: Position) -> Self {
        Self { kind, position }
    }

    /// The `kind` tag of this step as it appears in source.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            StepKind::Set { .. } => "set",
            StepKind::Call { .. } => "call",
            StepKind::Return { .. } => "return",
            StepKind::Emit { .. } => "emit",
            StepKind::Must { .. } => "must",
            StepKind::Fail { .. } => "fail",
            StepKind::ClearError => "clear_error",
            StepKind::Break => "break",
            StepKind::Continue => "continue",
            StepKind::If { .. } => "if",
            StepKind::While { .. } => "while",
            StepKind::For { .. } => "for",
            StepKind::OnError { .. } => "on_error",
        }
    }

    pub fn is_error_handler(&self) -> bool {
        matches!(self.kind, StepKind::OnError { .. })
    }

    /// Renders this step (and any nested bodies) as an indented outline.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        pretty_step(self, 0, &mut out);
        out
    }
}

pub(crate) fn pretty_steps(steps: &[Step], depth: usize, out: &mut String) {
    for step in steps {
        pretty_step(step, depth, out);
    }
}

fn pretty_step(step: &Step, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let line = match &step.kind {
        StepKind::Set { lvalues, value } => {
            let targets = lvalues
                .iter()
                .map(LValue::pretty)
                .collect::<Vec<_>>()
                .join(", ");
            format!("set {} = {}", targets, value.pretty())
        }
        StepKind::Call { call } => format!("call {}", call.pretty()),
        StepKind::Return { value } => with_optional("return", value),
        StepKind::Emit { value } => with_optional("emit", value),
        StepKind::Must { condition } => format!("must {}", condition.pretty()),
        StepKind::Fail { message } => with_optional("fail", message),
        StepKind::ClearError => "clear_error".to_string(),
        StepKind::Break => "break".to_string(),
        StepKind::Continue => "continue".to_string(),
        StepKind::If {
            condition,
            body,
            else_body,
        } => {
            out.push_str(&format!("{}if {}\n", indent, condition.pretty()));
            pretty_steps(body, depth + 1, out);
            if !else_body.is_empty() {
                out.push_str(&format!("{}else\n", indent));
                pretty_steps(else_body, depth + 1, out);
            }
            "endif".to_string()
        }
        StepKind::While { condition, body } => {
            out.push_str(&format!("{}while {}\n", indent, condition.pretty()));
            pretty_steps(body, depth + 1, out);
            "endwhile".to_string()
        }
        StepKind::For {
            loop_var,
            collection,
            body,
        } => {
            out.push_str(&format!(
                "{}for each {} in {}\n",
                indent,
                loop_var,
                collection.pretty()
            ));
            pretty_steps(body, depth + 1, out);
            "endfor".to_string()
        }
        StepKind::OnError { body } => {
            out.push_str(&format!("{}on_error\n", indent));
            pretty_steps(body, depth + 1, out);
            "endon".to_string()
        }
    };
    out.push_str(&indent);
    out.push_str(&line);
    out.push('\n');
}

fn with_optional(keyword: &str, value: &Option<Expression>) -> String {
    match value {
        Some(expr) => format!("{} {}", keyword, expr.pretty()),
        None => keyword.to_string(),
    }
}
