//! Expression compilation.
//!
//! Every expression compiles to the node whose output carries its value.
//! Nodes follow a two-phase protocol: build the node and wire its inputs,
//! then run [`coerce_inputs`] on it. Names and vector literals skip the
//! second phase; they are type-correct by construction.

use fngraph_types::ast::*;
use fngraph_types::{CompileError, ErrorCode, Result, Span};

use crate::builtins::{
    binary_operator, bool_operator, cast_id, compare_operator, constant_id, getter_id,
    unary_operator, vector_id, Builtin, SpecialForm,
};
use crate::cast::{convert, pack, swizzle};
use crate::coerce::coerce_inputs;
use crate::compiler::CompilerContext;
use crate::graph::{NodeId, Value, OUTPUT_PORT};
use crate::library::{function_id, CONSTANT_PORT};
use crate::ty::{BaseType, Type};

const FLOAT_COMPONENTS: [char; 4] = ['x', 'y', 'z', 'w'];
const INT_COMPONENTS: [char; 4] = ['a', 'b', 'c', 'd'];

/// Compile an expression and return the node carrying its value.
pub fn compile_expr(expr: &Expr, ctx: &mut CompilerContext<'_>) -> Result<NodeId> {
    let span = expr.span;
    let node = match &expr.kind {
        // ── Literals ──────────────────────────────────────────────────────
        ExprKind::Int(v) => constant(ctx, Type::INT, Value::Int(vec![*v])),
        ExprKind::Float(v) => constant(ctx, Type::FLOAT, Value::Float(vec![*v])),
        ExprKind::Bool(b) => constant(ctx, Type::BOOL, Value::Bool(*b)),
        ExprKind::Str(s) => constant(ctx, Type::STRING, Value::String(s.clone())),
        ExprKind::Vector(elements) => return compile_vector_literal(elements, span, ctx),

        // ── Names ─────────────────────────────────────────────────────────
        ExprKind::Name(name) => return ctx.lookup(name, span),
        ExprKind::Attribute { value, attr } => compile_swizzle(value, attr, ctx)?,

        // ── Operators ─────────────────────────────────────────────────────
        ExprKind::BinOp { left, op, right } => compile_binary(left, *op, right, ctx)?,
        ExprKind::UnaryOp { op, operand } => {
            let node = ctx.graph.new_node(&unary_operator(*op));
            let value = compile_expr(operand, ctx)?;
            wire(ctx, value, node, "a");
            node
        }
        ExprKind::BoolOp { op, values } => compile_bool_op(*op, values, span, ctx)?,
        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => compile_compare(left, ops, comparators, span, ctx)?,
        ExprKind::IfExp { test, body, orelse } => {
            let node = ctx.graph.new_node(&function_id("ifelse"));
            let body = compile_expr(body, ctx)?;
            let test = compile_expr(test, ctx)?;
            let orelse = compile_expr(orelse, ctx)?;
            wire(ctx, body, node, "ifpath");
            wire(ctx, test, node, "condition");
            wire(ctx, orelse, node, "elsepath");
            node
        }

        // ── Calls ─────────────────────────────────────────────────────────
        ExprKind::Call { func, args } => compile_call(func, args, span, ctx)?,
    };
    coerce_inputs(ctx.graph, node, span)?;
    Ok(node)
}

fn wire(ctx: &mut CompilerContext<'_>, producer: NodeId, consumer: NodeId, port: &str) {
    ctx.graph.connect(producer, OUTPUT_PORT, consumer, port);
}

fn constant(ctx: &mut CompilerContext<'_>, ty: Type, value: Value) -> NodeId {
    let node = ctx.graph.new_node(&constant_id(ty));
    ctx.graph.set_constant(node, CONSTANT_PORT, value);
    node
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

fn compile_binary(
    left: &Expr,
    op: BinOp,
    right: &Expr,
    ctx: &mut CompilerContext<'_>,
) -> Result<NodeId> {
    let (definition, right_port) = binary_operator(op);
    let node = ctx.graph.new_node(&definition);
    let lhs = compile_expr(left, ctx)?;
    let rhs = compile_expr(right, ctx)?;
    wire(ctx, lhs, node, "a");
    wire(ctx, rhs, node, right_port);
    Ok(node)
}

/// `x op= value`: the current binding of `x` is the left operand and the
/// result rebinds `x`.
pub fn compile_aug_assign(stmt: &AugAssignStmt, ctx: &mut CompilerContext<'_>) -> Result<NodeId> {
    let (definition, right_port) = binary_operator(stmt.op);
    let node = ctx.graph.new_node(&definition);
    let lhs = ctx.lookup(&stmt.target.name, stmt.target.span)?;
    let rhs = compile_expr(&stmt.value, ctx)?;
    wire(ctx, lhs, node, "a");
    wire(ctx, rhs, node, right_port);
    coerce_inputs(ctx.graph, node, stmt.span)?;
    ctx.bind(&stmt.target.name, node, stmt.span);
    Ok(node)
}

/// `a and b and c` becomes `and(and(a, b), c)`. Each link is coerced when
/// it is complete; the caller coerces the last one.
fn compile_bool_op(
    op: BoolOp,
    values: &[Expr],
    span: Span,
    ctx: &mut CompilerContext<'_>,
) -> Result<NodeId> {
    let definition = bool_operator(op);
    let [first, second, rest @ ..] = values else {
        return Err(CompileError::at(
            ErrorCode::UNSUPPORTED_SYNTAX,
            "Boolean operators need at least two operands",
            span,
        ));
    };
    let mut node = ctx.graph.new_node(&definition);
    let a = compile_expr(first, ctx)?;
    let b = compile_expr(second, ctx)?;
    wire(ctx, a, node, "a");
    wire(ctx, b, node, "b");
    for operand in rest {
        coerce_inputs(ctx.graph, node, span)?;
        let value = compile_expr(operand, ctx)?;
        let prev = node;
        node = ctx.graph.new_node(&definition);
        wire(ctx, prev, node, "a");
        wire(ctx, value, node, "b");
    }
    Ok(node)
}

fn compile_compare(
    left: &Expr,
    ops: &[CmpOp],
    comparators: &[Expr],
    span: Span,
    ctx: &mut CompilerContext<'_>,
) -> Result<NodeId> {
    let ([op], [right]) = (ops, comparators) else {
        return Err(CompileError::at(
            ErrorCode::UNSUPPORTED_COMPARISON,
            "Non binary comparisons are not supported",
            span,
        ));
    };
    let node = ctx.graph.new_node(&compare_operator(*op));
    let lhs = compile_expr(left, ctx)?;
    let rhs = compile_expr(right, ctx)?;
    wire(ctx, lhs, node, "a");
    wire(ctx, rhs, node, "b");
    Ok(node)
}

// ══════════════════════════════════════════════════════════════════════════════
// Vectors and Swizzles
// ══════════════════════════════════════════════════════════════════════════════

fn component_count_error(total: usize, span: Span) -> CompileError {
    CompileError::at(
        ErrorCode::COMPONENT_COUNT,
        format!(
            "Number of components in literal has to be in range [1-4]. {total} components was given"
        ),
        span,
    )
}

/// `{e1, ..., en}`. All-constant literals become one float constant node.
/// Otherwise every element is compiled, split into scalars, brought to a
/// common base and packed.
fn compile_vector_literal(
    elements: &[Expr],
    span: Span,
    ctx: &mut CompilerContext<'_>,
) -> Result<NodeId> {
    if elements.iter().all(Expr::is_numeric_literal) {
        if !(1..=4).contains(&elements.len()) {
            return Err(component_count_error(elements.len(), span));
        }
        let values = elements
            .iter()
            .filter_map(|e| match e.kind {
                ExprKind::Int(v) => Some(v as f64),
                ExprKind::Float(v) => Some(v),
                _ => None,
            })
            .collect::<Vec<_>>();
        return Ok(constant(ctx, Type::float(values.len()), Value::Float(values)));
    }

    let mut parts = Vec::with_capacity(elements.len());
    for element in elements {
        let node = compile_expr(element, ctx)?;
        let ty = ctx.graph.output_type(node);
        if !ty.is_numeric() {
            return Err(CompileError::at(
                ErrorCode::TYPE_MISMATCH,
                format!("Vector literal components must be numeric ({ty} given)"),
                element.span,
            ));
        }
        parts.push((node, ty));
    }
    let total: usize = parts.iter().map(|(_, ty)| ty.components()).sum();
    if !(1..=4).contains(&total) {
        return Err(component_count_error(total, span));
    }
    let base = if parts.iter().all(|(_, ty)| ty.base() == BaseType::Int) {
        BaseType::Int
    } else {
        BaseType::Float
    };
    let scalar = Type::with(base, 1);

    let mut scalars = Vec::with_capacity(total);
    for (node, ty) in parts {
        if ty.is_scalar() {
            scalars.push(node);
            continue;
        }
        for i in 0..ty.components() {
            scalars.push(swizzle(ctx.graph, node, ty.base(), &[i as i64]));
        }
    }
    let scalars = scalars
        .into_iter()
        .map(|node| {
            convert(ctx.graph, node, scalar).ok_or_else(|| {
                CompileError::at(
                    ErrorCode::TYPE_MISMATCH,
                    format!("Can't cast vector literal component to {scalar}"),
                    span,
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    match scalars.as_slice() {
        [single] => Ok(*single),
        many => Ok(pack(ctx.graph, base, many)),
    }
}

/// `v.xy` reads float components, `v.ab` int components.
fn compile_swizzle(value: &Expr, attr: &Ident, ctx: &mut CompilerContext<'_>) -> Result<NodeId> {
    let letters = &attr.name;
    let span = attr.span;
    let count = letters.chars().count();
    if count > 4 {
        return Err(CompileError::at(
            ErrorCode::INVALID_SWIZZLE,
            format!("Swizzling supports up to 4 components ({count} given: .{letters})"),
            span,
        ));
    }
    let (base, alphabet) = if letters.chars().all(|c| FLOAT_COMPONENTS.contains(&c)) {
        (BaseType::Float, FLOAT_COMPONENTS)
    } else if letters.chars().all(|c| INT_COMPONENTS.contains(&c)) {
        (BaseType::Int, INT_COMPONENTS)
    } else {
        return Err(CompileError::at(
            ErrorCode::INVALID_SWIZZLE,
            format!("Unsupported components in swizzling (.{letters})"),
            span,
        ));
    };

    let vector = compile_expr(value, ctx)?;
    let ty = ctx.graph.output_type(vector);
    if !ty.is_numeric() || ty.is_scalar() {
        return Err(CompileError::at(
            ErrorCode::INVALID_SWIZZLE,
            format!("Can't swizzle a {ty} value (.{letters})"),
            span,
        ));
    }
    if ty.base() != base {
        let expected = if ty.base() == BaseType::Float {
            "x, y, z, w"
        } else {
            "a, b, c, d"
        };
        return Err(CompileError::at(
            ErrorCode::INVALID_SWIZZLE,
            format!("Swizzling a {ty} value takes the components {expected} (.{letters})"),
            span,
        ));
    }
    let mut indices = Vec::with_capacity(count);
    for c in letters.chars() {
        let index = alphabet.iter().position(|a| *a == c).unwrap_or(0);
        if index >= ty.components() {
            return Err(CompileError::at(
                ErrorCode::INVALID_SWIZZLE,
                format!("Component '{c}' is out of range for {ty} (.{letters})"),
                span,
            ));
        }
        indices.push(index as i64);
    }
    Ok(swizzle(ctx.graph, vector, base, &indices))
}

// ══════════════════════════════════════════════════════════════════════════════
// Calls
// ══════════════════════════════════════════════════════════════════════════════

fn arg_count_error(name: &str, expected: usize, given: usize, span: Span) -> CompileError {
    CompileError::at(
        ErrorCode::WRONG_ARG_COUNT,
        format!("{name}() takes {expected} arguments ({given} given)"),
        span,
    )
}

fn expect_args(name: &str, args: &[Expr], expected: usize, span: Span) -> Result<()> {
    if args.len() != expected {
        return Err(arg_count_error(name, expected, args.len(), span));
    }
    Ok(())
}

fn string_arg<'e>(name: &str, arg: &'e Expr, what: &str) -> Result<&'e str> {
    arg.as_str_literal().ok_or_else(|| {
        CompileError::at(
            ErrorCode::CONSTANT_REQUIRED,
            format!("{name}() {what} has to be a string"),
            arg.span,
        )
    })
}

/// Resolve a callee by name: built-ins first, then imported functions,
/// then the special forms.
fn compile_call(
    func: &Expr,
    args: &[Expr],
    span: Span,
    ctx: &mut CompilerContext<'_>,
) -> Result<NodeId> {
    let Some(name) = func.dotted_name() else {
        return Err(CompileError::at(
            ErrorCode::UNKNOWN_FUNCTION,
            "Only named functions can be called",
            func.span,
        ));
    };
    if let Some(builtin) = Builtin::lookup(&name) {
        return compile_builtin(&name, builtin, args, span, ctx);
    }
    if let Some(function) = ctx.env.imports.resolve(&name, ctx.env.resolver) {
        expect_args(&name, args, function.inputs.len(), span)?;
        let node = ctx.graph.new_instance_node(&function);
        for (arg, port) in args.iter().zip(&function.inputs) {
            let value = compile_expr(arg, ctx)?;
            wire(ctx, value, node, &port.name);
        }
        return Ok(node);
    }
    if let Some(form) = SpecialForm::lookup(&name) {
        return compile_special_form(form, args, span, ctx);
    }
    Err(CompileError::at(
        ErrorCode::UNKNOWN_FUNCTION,
        format!("Function {name}() not found"),
        func.span,
    ))
}

fn compile_builtin(
    name: &str,
    builtin: Builtin,
    args: &[Expr],
    span: Span,
    ctx: &mut CompilerContext<'_>,
) -> Result<NodeId> {
    match builtin {
        Builtin::Constant(ty) => {
            expect_args(name, args, ty.components(), span)?;
            let value = constant_value(name, ty, args)?;
            Ok(constant(ctx, ty, value))
        }
        Builtin::Vector(ty) => {
            if args.len() != 2 {
                return Err(CompileError::at(
                    ErrorCode::WRONG_ARG_COUNT,
                    "Vector takes only two arguments",
                    span,
                ));
            }
            let node = ctx.graph.new_node(&vector_id(ty));
            let head = compile_expr(&args[0], ctx)?;
            let last = compile_expr(&args[1], ctx)?;
            wire(ctx, head, node, "componentsin");
            wire(ctx, last, node, "componentslast");
            Ok(node)
        }
        Builtin::Getter(ty) => {
            expect_args(name, args, 1, span)?;
            let variable = string_arg(name, &args[0], "argument")?;
            let node = ctx.graph.new_node(&getter_id(ty));
            ctx.graph
                .set_constant(node, CONSTANT_PORT, Value::String(variable.to_string()));
            Ok(node)
        }
        Builtin::Sampler(sampler) => {
            expect_args(name, args, 3, span)?;
            let node = ctx.graph.new_node(&function_id(sampler));
            let pos = compile_expr(&args[0], ctx)?;
            let (ExprKind::Int(image), ExprKind::Int(filter)) = (&args[1].kind, &args[2].kind)
            else {
                return Err(CompileError::at(
                    ErrorCode::CONSTANT_REQUIRED,
                    format!("{name}() takes only constants for input image or filter"),
                    span,
                ));
            };
            ctx.graph
                .set_constant(node, CONSTANT_PORT, Value::Int(vec![*image, *filter]));
            wire(ctx, pos, node, "pos");
            Ok(node)
        }
        Builtin::Function { name, ports } => {
            expect_args(name, args, ports.len(), span)?;
            let node = ctx.graph.new_node(&function_id(name));
            for (arg, port) in args.iter().zip(ports) {
                let value = compile_expr(arg, ctx)?;
                wire(ctx, value, node, port);
            }
            Ok(node)
        }
        Builtin::Cast(ty) => {
            if args.len() != 1 {
                return Err(CompileError::at(
                    ErrorCode::WRONG_ARG_COUNT,
                    format!("{name}() takes only one argument ({} given)", args.len()),
                    span,
                ));
            }
            let node = ctx.graph.new_node(&cast_id(ty));
            let value = compile_expr(&args[0], ctx)?;
            wire(ctx, value, node, "value");
            Ok(node)
        }
    }
}

/// Literal arguments of a constant constructor such as `float3(1, 2, 3)`.
fn constant_value(name: &str, ty: Type, args: &[Expr]) -> Result<Value> {
    let not_constant = |arg: &Expr| {
        CompileError::at(
            ErrorCode::CONSTANT_REQUIRED,
            format!("{name}() takes only const arguments"),
            arg.span,
        )
    };
    match ty.base() {
        BaseType::Int => args
            .iter()
            .map(|arg| match arg.kind {
                ExprKind::Int(v) => Ok(v),
                ExprKind::Float(_) => Err(CompileError::at(
                    ErrorCode::TYPE_MISMATCH,
                    format!("{name}() takes only integer constants"),
                    arg.span,
                )),
                _ => Err(not_constant(arg)),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Int),
        _ => args
            .iter()
            .map(|arg| match arg.kind {
                ExprKind::Int(v) => Ok(v as f64),
                ExprKind::Float(v) => Ok(v),
                _ => Err(not_constant(arg)),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Float),
    }
}

fn compile_special_form(
    form: SpecialForm,
    args: &[Expr],
    span: Span,
    ctx: &mut CompilerContext<'_>,
) -> Result<NodeId> {
    let name = form.name();
    match form {
        SpecialForm::Export => {
            if args.len() != 1 {
                return Err(CompileError::at(
                    ErrorCode::WRONG_ARG_COUNT,
                    format!("{name}() takes exactly one argument ({} given)", args.len()),
                    span,
                ));
            }
            let ExprKind::Name(variable) = &args[0].kind else {
                return Err(CompileError::at(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    format!("{name}() takes only variables"),
                    args[0].span,
                ));
            };
            let node = ctx.graph.new_node(&function_id("set"));
            let value = ctx.lookup(variable, args[0].span)?;
            wire(ctx, value, node, "value");
            ctx.graph
                .set_constant(node, CONSTANT_PORT, Value::String(variable.clone()));
            ctx.set_queue.push(node);
            Ok(node)
        }
        SpecialForm::SetVar => {
            expect_args(name, args, 2, span)?;
            let variable = string_arg(name, &args[0], "first argument")?;
            let value = compile_expr(&args[1], ctx)?;
            let node = ctx.graph.new_node(&function_id("set"));
            ctx.graph
                .set_constant(node, CONSTANT_PORT, Value::String(variable.to_string()));
            wire(ctx, value, node, "value");
            ctx.set_queue.push(node);
            Ok(node)
        }
        SpecialForm::Sequence => {
            expect_args(name, args, 2, span)?;
            let first = compile_expr(&args[0], ctx)?;
            let last = compile_expr(&args[1], ctx)?;
            let node = ctx.graph.new_node(&function_id("sequence"));
            wire(ctx, first, node, "seqin");
            wire(ctx, last, node, "seqlast");
            Ok(node)
        }
        SpecialForm::DeclareInputs => Err(CompileError::at(
            ErrorCode::MISPLACED_STATEMENT,
            format!("{name}() can only be used as a statement"),
            span,
        )),
    }
}

/// `declare_inputs('graph')` in statement position.
pub fn compile_declare_inputs(args: &[Expr], span: Span, ctx: &mut CompilerContext<'_>) -> Result<()> {
    let name = SpecialForm::DeclareInputs.name();
    if args.len() != 1 {
        return Err(CompileError::at(
            ErrorCode::WRONG_ARG_COUNT,
            format!("{name}() takes only one string argument ({} given)", args.len()),
            span,
        ));
    }
    let graph_id = string_arg(name, &args[0], "argument")?;
    ctx.declare_graph_inputs(graph_id, Some(span))
}
