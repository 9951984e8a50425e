// End-to-end construction: source text through the parser into the engine.

mod common;

use common::{compile, count, first_command_outline};
use stepscript::{
    ast::{Accessor, ExprKind, Number, StepKind},
    compile_str,
    syntax::parser,
    AstBuilder, DiagnosticKind, Severity, SourceContext, StepError,
};

const SAMPLE: &str = r#":: lang_version: 1.0
:: file: sample.ns

# Builds a greeting for one person.
func greet(needs name optional punctuation returns message) means
  :: description: Builds a greeting
  set message = "Hello, " + name
  if punctuation != nil
    set message = message + punctuation
  endif
  return message
endfunc

command
  :: purpose: demo
  call greet("World")
  emit last_call
  for each item in [1, 2, 3]
    if item == 2
      continue
    endif
    emit item * 10
  endfor
  on_error means
    emit "recovered"
    clear_error
  endon
endcommand
"#;

fn emitted(expression: &str) -> String {
    let output = compile(&format!("command\n  emit {}\nendcommand\n", expression));
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    first_command_outline(&output)
        .trim_start_matches("emit ")
        .trim_end()
        .to_string()
}

// ---
// Whole programs
// ---

#[test]
fn test_sample_builds_cleanly() {
    let output = compile(SAMPLE);
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

    let program = &output.program;
    assert_eq!(program.metadata.get("lang_version").map(String::as_str), Some("1.0"));
    assert_eq!(program.metadata.get("file").map(String::as_str), Some("sample.ns"));
    assert_eq!(program.procedures.len(), 1);
    assert_eq!(program.commands.len(), 1);
}

#[test]
fn test_sample_procedure_signature_and_body() {
    let output = compile(SAMPLE);
    let greet = output.program.procedure("greet").unwrap();
    assert_eq!(greet.params, vec!["name"]);
    assert_eq!(greet.optional_params, vec!["punctuation"]);
    assert_eq!(greet.returns, vec!["message"]);
    assert_eq!(
        greet.metadata.get("description").map(String::as_str),
        Some("Builds a greeting")
    );
    assert_eq!(greet.steps.len(), 3);
    assert_eq!(
        greet.steps[0].pretty(),
        "set message = concat(\"Hello, \", name)\n"
    );
    assert_eq!(greet.steps[1].kind_name(), "if");
    assert_eq!(greet.steps[2].pretty(), "return message\n");
    assert_eq!((greet.position.line, greet.position.column), (5, 1));
}

#[test]
fn test_sample_command_body_and_handlers() {
    let output = compile(SAMPLE);
    let command = &output.program.commands[0];
    assert_eq!(command.metadata.get("purpose").map(String::as_str), Some("demo"));

    let kinds: Vec<_> = command.body.iter().map(|s| s.kind_name()).collect();
    assert_eq!(kinds, vec!["call", "emit", "for"]);
    assert_eq!(command.body[0].pretty(), "call greet(\"World\")\n");
    assert_eq!(command.body[1].pretty(), "emit last_call\n");
    assert_eq!(
        command.body[2].pretty(),
        "for each item in [1, 2, 3]\n  if (item == 2)\n    continue\n  endif\n  emit (item * 10)\nendfor\n"
    );
    assert_eq!((command.body[0].position.line, command.body[0].position.column), (16, 3));

    assert_eq!(command.error_handlers.len(), 1);
    assert_eq!(
        command.error_handlers[0].pretty(),
        "on_error\n  emit \"recovered\"\n  clear_error\nendon\n"
    );
}

#[test]
fn test_sample_if_without_else() {
    let output = compile(SAMPLE);
    let greet = output.program.procedure("greet").unwrap();
    let StepKind::If {
        condition,
        body,
        else_body,
    } = &greet.steps[1].kind
    else {
        panic!("expected an if step");
    };
    assert_eq!(condition.pretty(), "(punctuation != nil)");
    assert_eq!(body.len(), 1);
    assert_eq!(body[0].pretty(), "set message = (message + punctuation)\n");
    assert!(else_body.is_empty());
}

#[test]
fn test_nested_program_leaves_both_stacks_empty() {
    let text = "func walk(needs items) means\n  for each item in items\n    while item > 0\n      if item % 2 == 0\n        set item = item - 2\n      else\n        if item == 1\n          break\n        endif\n        set item = item - 1\n      endif\n    endwhile\n  endfor\n  return [{\"done\": true}]\nendfunc\n\ncommand\n  call walk([3, 4])\n  on_error means\n    emit \"failed\"\n  endon\nendcommand\n";
    let source = SourceContext::from_file("nested.ns", text);
    let mut builder = AstBuilder::new();
    parser::walk(&source, &mut builder).unwrap();
    assert_eq!(builder.value_depth(), 0);
    assert_eq!(builder.block_depth(), 0);

    let output = builder.finish();
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert_eq!(output.program.procedure("walk").unwrap().steps.len(), 2);
    assert_eq!(output.program.commands[0].error_handlers.len(), 1);
}

#[test]
fn test_loop_control_statements() {
    let source = "func countdown() means\n  set i = 0\n  while i < 10\n    set i = i + 1\n    if i % 2 == 0\n      continue\n    else\n      break\n    endif\n    must i != 7\n  endwhile\n  fail \"done\"\n  return\nendfunc\n";
    let output = compile(source);
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    let steps = &output.program.procedure("countdown").unwrap().steps;
    let kinds: Vec<_> = steps.iter().map(|s| s.kind_name()).collect();
    assert_eq!(kinds, vec!["set", "while", "fail", "return"]);

    let StepKind::While { condition, body } = &steps[1].kind else {
        panic!("expected a while step");
    };
    assert_eq!(condition.pretty(), "(i < 10)");
    assert_eq!(body.len(), 3);
    let StepKind::If { else_body, .. } = &body[1].kind else {
        panic!("expected an if step");
    };
    assert_eq!(else_body[0].kind_name(), "break");
    assert_eq!(body[2].pretty(), "must (i != 7)\n");
    assert!(matches!(steps[3].kind, StepKind::Return { value: None }));
}

#[test]
fn test_empty_source_is_an_empty_program() {
    let output = compile("");
    assert!(output.diagnostics.is_empty());
    assert!(output.program.procedures.is_empty());
    assert!(output.program.commands.is_empty());
}

// ---
// Precedence and associativity
// ---

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    assert_eq!(emitted("1 + 2 * 3"), "(1 + (2 * 3))");
}

#[test]
fn test_subtraction_is_left_associative() {
    assert_eq!(emitted("10 - 4 - 3"), "((10 - 4) - 3)");
}

#[test]
fn test_exponent_is_right_associative() {
    assert_eq!(emitted("2 ** 3 ** 2"), "(2 ** (3 ** 2))");
}

#[test]
fn test_unary_minus_is_looser_than_power() {
    assert_eq!(emitted("-x ** 2"), "(- (x ** 2))");
}

#[test]
fn test_logical_levels() {
    assert_eq!(emitted("not a and b or c"), "(((not a) and b) or c)");
}

#[test]
fn test_bitwise_levels() {
    assert_eq!(emitted("a | b ^ c & d"), "(a | (b ^ (c & d)))");
    assert_eq!(emitted("~a"), "(~ a)");
}

#[test]
fn test_relational_binds_tighter_than_equality() {
    assert_eq!(emitted("a < b == c >= d"), "((a < b) == (c >= d))");
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(emitted("(1 + 2) * 3"), "((1 + 2) * 3)");
}

#[test]
fn test_mixed_additive_chain_is_not_concatenation() {
    assert_eq!(emitted("\"a\" + b - c"), "((\"a\" + b) - c)");
    assert_eq!(emitted("\"a\" + b + \"c\""), "concat(\"a\", b, \"c\")");
}

// ---
// Primaries
// ---

#[test]
fn test_accessor_chain_in_expression() {
    assert_eq!(emitted("data.items[0].name"), "data[\"items\"][0][\"name\"]");
}

#[test]
fn test_function_call_with_dotted_name() {
    assert_eq!(emitted("tool.FS.Read(\"a.txt\", 1)"), "tool.FS.Read(\"a.txt\", 1)");
    assert_eq!(emitted("now()"), "now()");
}

#[test]
fn test_special_expressions() {
    assert_eq!(emitted("{{ user.name }}"), "{{user.name}}");
    assert_eq!(emitted("eval(\"x\")"), "eval(\"x\")");
    assert_eq!(emitted("last"), "last");
    assert_eq!(emitted("last_call"), "last_call");
}

#[test]
fn test_collections() {
    assert_eq!(
        emitted("{\"k\": 1, \"j\": [true, false, nil]}"),
        "{\"k\": 1, \"j\": [true, false, nil]}"
    );
    assert_eq!(emitted("[]"), "[]");
    assert_eq!(emitted("[\n    1,\n    2\n  ]"), "[1, 2]");
}

#[test]
fn test_map_key_is_the_decoded_string() {
    let output = compile("command\n  emit {\"a\\\"b\": 1}\nendcommand\n");
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    let StepKind::Emit { value: Some(value) } = &output.program.commands[0].body[0].kind else {
        panic!("expected an emit step");
    };
    let ExprKind::MapLiteral { entries } = &value.kind else {
        panic!("expected a map literal");
    };
    assert_eq!(entries[0].key, "a\"b");
    assert_eq!((entries[0].position.line, entries[0].position.column), (2, 9));
}

#[test]
fn test_literal_values() {
    let output = compile("command\n  emit 42\n  emit 2.5\n  emit 'it\\'s'\n  emit ```raw\ntext```\nendcommand\n");
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    let values: Vec<_> = output.program.commands[0]
        .body
        .iter()
        .map(|step| match &step.kind {
            StepKind::Emit { value: Some(value) } => value.kind.clone(),
            other => panic!("expected emit, got {:?}", other),
        })
        .collect();
    assert_eq!(values[0], ExprKind::NumberLiteral { value: Number::Int(42) });
    assert_eq!(values[1], ExprKind::NumberLiteral { value: Number::Float(2.5) });
    assert_eq!(
        values[2],
        ExprKind::StringLiteral {
            value: "it's".into(),
            is_raw: false
        }
    );
    assert_eq!(
        values[3],
        ExprKind::StringLiteral {
            value: "raw\ntext".into(),
            is_raw: true
        }
    );
}

// ---
// Assignment targets
// ---

#[test]
fn test_multiple_assignment_targets() {
    let output = compile("command\n  set a, b.c[\"k\"] = 1\nendcommand\n");
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    let StepKind::Set { lvalues, value } = &output.program.commands[0].body[0].kind else {
        panic!("expected a set step");
    };
    let targets: Vec<_> = lvalues.iter().map(|lv| lv.pretty()).collect();
    assert_eq!(targets, vec!["a", "b.c[\"k\"]"]);
    assert!(matches!(lvalues[1].accessors[0], Accessor::Dot { .. }));
    assert_eq!(value.pretty(), "1");
}

#[test]
fn test_trailing_dot_in_target_is_reported_once() {
    let output = compile("command\n  set a. = 1\nendcommand\n");
    assert_eq!(count(&output, DiagnosticKind::MalformedLvalue), 1);
    assert_eq!(output.error_count(), 1);
    let diagnostic = &output.diagnostics[0];
    assert_eq!((diagnostic.position.line, diagnostic.position.column), (2, 8));
}

#[test]
fn test_empty_index_in_target_is_reported() {
    let output = compile("command\n  set a[] = 1\nendcommand\n");
    assert_eq!(count(&output, DiagnosticKind::MalformedLvalue), 1);
}

// ---
// Diagnostics and acceptance
// ---

#[test]
fn test_empty_command_is_rejected() {
    let output = compile("command\nendcommand\n");
    assert_eq!(count(&output, DiagnosticKind::EmptyBody), 1);
    assert!(output.program.commands.is_empty());
}

#[test]
fn test_duplicate_procedure_is_an_error() {
    let output = compile(
        "func f() means\n  return 1\nendfunc\n\nfunc f() means\n  return 2\nendfunc\n",
    );
    assert_eq!(count(&output, DiagnosticKind::DuplicateProcedure), 1);
    let f = output.program.procedure("f").unwrap();
    assert_eq!(f.steps[0].pretty(), "return 1\n");
}

#[test]
fn test_unknown_escape_is_a_warning() {
    let output = compile("command\n  emit \"bad \\q\"\nendcommand\n");
    assert_eq!(count(&output, DiagnosticKind::InvalidLiteral), 1);
    assert_eq!(output.diagnostics[0].severity, Severity::Warning);
    assert!(output.is_accepted(false));
    assert_eq!(first_command_outline(&output), "emit \"bad \\\\q\"\n");
}

#[test]
fn test_metadata_duplicate_key_overwrites() {
    let output = compile(":: author: a\n:: author: b\n");
    assert_eq!(output.program.metadata.get("author").map(String::as_str), Some("b"));
}

#[test]
fn test_compile_str_rejects_with_reports() {
    let err = compile_str("bad.ns", "command\n  set a. = 1\nendcommand\n").unwrap_err();
    match err {
        StepError::Rejected { errors, reports, .. } => {
            assert_eq!(errors, 1);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].diagnostic.kind, DiagnosticKind::MalformedLvalue);
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn test_syntax_error_is_not_a_construction_result() {
    let err = compile_str("broken.ns", "command\n  emit (1 + \nendcommand\n").unwrap_err();
    assert!(matches!(err, StepError::Syntax { .. }));
}

#[test]
fn test_program_serializes_with_kind_tags() {
    let output = compile(SAMPLE);
    let json = serde_json::to_value(&output.program).unwrap();
    let first = &json["procedures"]["greet"]["steps"][0];
    assert_eq!(first["kind"], "set");
    assert_eq!(first["value"]["type"], "concatenation");
    assert_eq!(first["lvalues"][0]["identifier"], "message");
}
