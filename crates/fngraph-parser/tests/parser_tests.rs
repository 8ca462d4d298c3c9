//! Parser tests: statements, operator precedence, function definitions,
//! imports, error recovery and the 100-iteration determinism check.

use fngraph_parser::{parse, ParseResult};
use fngraph_types::ast::*;
use fngraph_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse_source(source: &str) -> ParseResult {
    let sf = SourceFile::new("test.fx", source);
    parse(&sf)
}

/// Parse source and return the module, panicking if there are errors.
fn parse_ok(source: &str) -> Module {
    let result = parse_source(source);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  {e} ({})", e.code);
        }
        panic!("unexpected parse errors (see above)");
    }
    result.module.expect("no module returned")
}

fn error_codes(source: &str) -> Vec<ErrorCode> {
    parse_source(source)
        .errors
        .errors
        .iter()
        .map(|e| e.code)
        .collect()
}

/// Parse `x = <expr>` and return the right-hand side.
fn expr(source: &str) -> Expr {
    let module = parse_ok(&format!("x = {source}\n"));
    match module.body.into_iter().next() {
        Some(Stmt::Assign(assign)) => assign.value,
        other => panic!("expected assignment, got {other:?}"),
    }
}

fn is_name(e: &Expr, expected: &str) -> bool {
    matches!(&e.kind, ExprKind::Name(n) if n == expected)
}

// ─────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn assignment_and_return() {
    let module = parse_ok("a = 1\nreturn a\n");
    assert_eq!(module.body.len(), 2);
    assert!(matches!(&module.body[0], Stmt::Assign(s) if is_name(&s.target, "a")));
    assert!(matches!(&module.body[1], Stmt::Return(s) if is_name(&s.value, "a")));
}

#[test]
fn annotated_assignment() {
    let module = parse_ok("v: float2 = {1, 2}\n");
    match &module.body[0] {
        Stmt::AnnAssign(s) => {
            assert_eq!(s.target.name, "v");
            assert_eq!(s.annotation.name, "float2");
            assert!(matches!(&s.value.kind, ExprKind::Vector(items) if items.len() == 2));
        }
        other => panic!("expected annotated assignment, got {other:?}"),
    }
}

#[test]
fn augmented_assignment_maps_operator() {
    let module = parse_ok("a += 1\nb @= 2.0\nc ^= d\n");
    let ops: Vec<BinOp> = module
        .body
        .iter()
        .map(|s| match s {
            Stmt::AugAssign(a) => a.op,
            other => panic!("expected augmented assignment, got {other:?}"),
        })
        .collect();
    assert_eq!(ops, vec![BinOp::Add, BinOp::MatMul, BinOp::BitXor]);
}

#[test]
fn attribute_assignment_target_parses() {
    // Rejected later by the graph compiler, not by the parser.
    let module = parse_ok("v.x = 1\n");
    assert!(matches!(
        &module.body[0],
        Stmt::Assign(s) if matches!(s.target.kind, ExprKind::Attribute { .. })
    ));
}

#[test]
fn expression_statement() {
    let module = parse_ok("export(a)\n");
    match &module.body[0] {
        Stmt::Expr(s) => match &s.expr.kind {
            ExprKind::Call { func, args } => {
                assert!(is_name(func, "export"));
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected call, got {other:?}"),
        },
        other => panic!("expected expression statement, got {other:?}"),
    }
}

#[test]
fn pass_statement() {
    let module = parse_ok("pass\n");
    assert!(matches!(module.body[0], Stmt::Pass(_)));
}

#[test]
fn last_line_without_newline() {
    let module = parse_ok("a = 1\n_OUT_ = a");
    assert_eq!(module.body.len(), 2);
}

// ─────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────

#[test]
fn multiplication_binds_tighter_than_addition() {
    let e = expr("a + b * c");
    match e.kind {
        ExprKind::BinOp { left, op, right } => {
            assert_eq!(op, BinOp::Add);
            assert!(is_name(&left, "a"));
            assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::Mul, .. }));
        }
        other => panic!("expected binop, got {other:?}"),
    }
}

#[test]
fn subtraction_is_left_associative() {
    let e = expr("a - b - c");
    match e.kind {
        ExprKind::BinOp { left, op, right } => {
            assert_eq!(op, BinOp::Sub);
            assert!(matches!(left.kind, ExprKind::BinOp { op: BinOp::Sub, .. }));
            assert!(is_name(&right, "c"));
        }
        other => panic!("expected binop, got {other:?}"),
    }
}

#[test]
fn dot_product_binds_looser_than_addition() {
    let e = expr("a + b ^ c");
    assert!(matches!(e.kind, ExprKind::BinOp { op: BinOp::BitXor, .. }));
}

#[test]
fn scalar_product_is_multiplicative() {
    let e = expr("a + b @ c");
    match e.kind {
        ExprKind::BinOp { op, right, .. } => {
            assert_eq!(op, BinOp::Add);
            assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::MatMul, .. }));
        }
        other => panic!("expected binop, got {other:?}"),
    }
}

#[test]
fn comparison_below_arithmetic() {
    let e = expr("a + 1 > b");
    match e.kind {
        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => {
            assert_eq!(ops, vec![CmpOp::Gt]);
            assert_eq!(comparators.len(), 1);
            assert!(matches!(left.kind, ExprKind::BinOp { op: BinOp::Add, .. }));
        }
        other => panic!("expected compare, got {other:?}"),
    }
}

#[test]
fn comparison_chain_stays_in_one_node() {
    let e = expr("a < b <= c");
    match e.kind {
        ExprKind::Compare { ops, .. } => assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE]),
        other => panic!("expected compare, got {other:?}"),
    }
}

#[test]
fn bool_operators_flatten_and_nest() {
    let e = expr("a or b and c or not d");
    match e.kind {
        ExprKind::BoolOp { op, values } => {
            assert_eq!(op, BoolOp::Or);
            assert_eq!(values.len(), 3);
            assert!(matches!(values[1].kind, ExprKind::BoolOp { op: BoolOp::And, .. }));
            assert!(matches!(
                values[2].kind,
                ExprKind::UnaryOp { op: UnaryOp::Not, .. }
            ));
        }
        other => panic!("expected bool op, got {other:?}"),
    }
}

#[test]
fn ternary_is_lowest_and_right_nested() {
    let e = expr("a if c else b if d else e");
    match e.kind {
        ExprKind::IfExp { test, body, orelse } => {
            assert!(is_name(&test, "c"));
            assert!(is_name(&body, "a"));
            assert!(matches!(orelse.kind, ExprKind::IfExp { .. }));
        }
        other => panic!("expected conditional, got {other:?}"),
    }
}

#[test]
fn negative_literals_are_folded() {
    assert_eq!(expr("-1").kind, ExprKind::Int(-1));
    assert_eq!(expr("-2.5").kind, ExprKind::Float(-2.5));
    assert!(matches!(
        expr("-a").kind,
        ExprKind::UnaryOp { op: UnaryOp::Neg, .. }
    ));
}

#[test]
fn unary_plus_is_dropped() {
    assert!(is_name(&expr("+a"), "a"));
}

#[test]
fn parentheses_group_without_a_node() {
    let e = expr("(a + b) * c");
    match e.kind {
        ExprKind::BinOp { left, op, .. } => {
            assert_eq!(op, BinOp::Mul);
            assert!(matches!(left.kind, ExprKind::BinOp { op: BinOp::Add, .. }));
        }
        other => panic!("expected binop, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Postfix and literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn swizzle_and_dotted_call() {
    let e = expr("sbs.noise.perlin(p).xy");
    match e.kind {
        ExprKind::Attribute { value, attr } => {
            assert_eq!(attr.name, "xy");
            match value.kind {
                ExprKind::Call { func, args } => {
                    assert_eq!(func.dotted_name().as_deref(), Some("sbs.noise.perlin"));
                    assert_eq!(args.len(), 1);
                }
                other => panic!("expected call, got {other:?}"),
            }
        }
        other => panic!("expected attribute, got {other:?}"),
    }
}

#[test]
fn vector_literal_shapes() {
    assert!(matches!(expr("{}").kind, ExprKind::Vector(v) if v.is_empty()));
    assert!(matches!(expr("{1, 2, 3,}").kind, ExprKind::Vector(v) if v.len() == 3));
    match expr("{a.xy, 1.0}").kind {
        ExprKind::Vector(items) => {
            assert!(matches!(items[0].kind, ExprKind::Attribute { .. }));
            assert_eq!(items[1].kind, ExprKind::Float(1.0));
        }
        other => panic!("expected vector, got {other:?}"),
    }
}

#[test]
fn string_and_bool_literals() {
    assert_eq!(expr("'lum'").kind, ExprKind::Str("lum".into()));
    assert_eq!(expr("True").kind, ExprKind::Bool(true));
}

#[test]
fn call_with_no_arguments_and_trailing_comma() {
    assert!(matches!(expr("f()").kind, ExprKind::Call { args, .. } if args.is_empty()));
    assert!(matches!(expr("f(a, b,)").kind, ExprKind::Call { args, .. } if args.len() == 2));
}

// ─────────────────────────────────────────────────────────────────────
// Function definitions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn decorated_function_definition() {
    let module =
        parse_ok("@pixel_processor\ndef shade(pos: float2, k: float) -> float4:\n    return pos\n");
    let def = module.functions().next().expect("function");
    assert_eq!(def.name.name, "shade");
    assert_eq!(def.decorators.len(), 1);
    assert_eq!(def.decorators[0].name, "pixel_processor");
    assert_eq!(def.args.len(), 2);
    assert_eq!(
        def.args[0].annotation.as_ref().map(|a| a.name.as_str()),
        Some("float2")
    );
    assert_eq!(def.returns.as_ref().map(|r| r.name.as_str()), Some("float4"));
    assert_eq!(def.body.len(), 1);
}

#[test]
fn decorator_with_arguments() {
    let module = parse_ok("@meta.node('label', color=3)\ndef f(a: float):\n    return a\n");
    let def = module.functions().next().expect("function");
    let deco = &def.decorators[0];
    assert_eq!(deco.name, "meta.node");
    assert_eq!(deco.args.len(), 1);
    assert_eq!(deco.keywords.len(), 1);
    assert_eq!(deco.keywords[0].name.name, "color");
}

#[test]
fn one_line_function_body() {
    let module = parse_ok("def f(a: float): return a\nx = f(1.0)\n");
    assert_eq!(module.body.len(), 2);
    assert_eq!(module.functions().next().map(|f| f.body.len()), Some(1));
}

#[test]
fn statements_after_function_return_to_top_level() {
    let module = parse_ok("def f(a: float):\n    b = a\n    return b\n_OUT_ = f(1.0)\n");
    assert_eq!(module.body.len(), 2);
    assert!(module.has_top_level_code());
}

#[test]
fn module_with_only_functions_has_no_top_level_code() {
    let module = parse_ok("import lib\ndef f(a: float):\n    return a\n");
    assert!(!module.has_top_level_code());
}

// ─────────────────────────────────────────────────────────────────────
// Imports
// ─────────────────────────────────────────────────────────────────────

#[test]
fn import_with_aliases() {
    let module = parse_ok("import sbs.noise as n, util\n");
    match &module.body[0] {
        Stmt::Import(s) => {
            assert_eq!(s.names.len(), 2);
            assert_eq!(s.names[0].name, "sbs.noise");
            assert_eq!(s.names[0].local_name(), "n");
            assert_eq!(s.names[1].local_name(), "util");
        }
        other => panic!("expected import, got {other:?}"),
    }
}

#[test]
fn from_import_forms() {
    let module = parse_ok(
        "from lib import *\nfrom lib.math import (lerp3 as l3, clamp,)\nfrom x import y\n",
    );
    assert!(matches!(
        &module.body[0],
        Stmt::ImportFrom(s) if s.module == "lib" && s.names == ImportNames::Glob
    ));
    match &module.body[1] {
        Stmt::ImportFrom(s) => match &s.names {
            ImportNames::List(list) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[0].local_name(), "l3");
                assert_eq!(list[1].name, "clamp");
            }
            other => panic!("expected name list, got {other:?}"),
        },
        other => panic!("expected from-import, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn literal_assignment_target_is_rejected() {
    assert_eq!(error_codes("1 = a\n"), vec![ErrorCode::INVALID_ASSIGN_TARGET]);
}

#[test]
fn augmented_attribute_target_is_rejected() {
    assert_eq!(error_codes("v.x += 1\n"), vec![ErrorCode::INVALID_ASSIGN_TARGET]);
}

#[test]
fn chained_assignment_is_rejected() {
    assert_eq!(error_codes("a = b = 1\n"), vec![ErrorCode::UNSUPPORTED_SYNTAX]);
}

#[test]
fn keyword_call_arguments_are_rejected() {
    assert_eq!(error_codes("f(a=1)\n"), vec![ErrorCode::UNSUPPORTED_SYNTAX]);
}

#[test]
fn unexpected_indent_is_reported() {
    assert!(error_codes("a = 1\n    b = 2\n").contains(&ErrorCode::INCONSISTENT_INDENT));
}

#[test]
fn missing_function_body_is_reported() {
    assert_eq!(
        error_codes("def f(a: float):\nx = 1\n"),
        vec![ErrorCode::INCONSISTENT_INDENT]
    );
}

#[test]
fn parser_recovers_at_next_line() {
    let result = parse_source("a = (1 +\nb = )\nc = 2\nd = *\n");
    assert!(result.module.is_none());
    assert!(result.errors.total_errors >= 2);
}

#[test]
fn error_message_carries_location() {
    let result = parse_source("a = 1\nb = )\n");
    let err = &result.errors.errors[0];
    assert_eq!(err.span.map(|s| s.start_line), Some(2));
    assert_eq!(err.source_line.as_deref(), Some("b = )"));
    assert!(err.to_string().starts_with("[line 2: col 5] ERROR:"));
}

#[test]
fn lexer_errors_surface_through_parse() {
    let result = parse_source("a = 'open\n");
    assert!(result.module.is_none());
    assert_eq!(result.errors.errors[0].message, "Unterminated string literal");
}

#[test]
fn deeply_nested_expression_is_rejected() {
    let source = format!("x = {}1{}\n", "(".repeat(80), ")".repeat(80));
    assert!(error_codes(&source).contains(&ErrorCode::UNSUPPORTED_SYNTAX));
}

// ─────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────

#[test]
fn parser_determinism_100_iterations() {
    let source = "from lib import *\n@pixel_processor\ndef f(p: float2):\n    v = {p, 1.0}\n    return v.zyx if p.x > 0.5 else -v\n_OUT_ = f($pos)\n";
    let first = parse_ok(source);
    for i in 0..100 {
        assert_eq!(first, parse_ok(source), "Determinism failure at iteration {i}");
    }
}
