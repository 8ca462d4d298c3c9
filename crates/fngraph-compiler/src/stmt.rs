//! Statement compilation.

use fngraph_types::ast::{AnnAssignStmt, AssignStmt, ExprKind, ExprStmt, Stmt};
use fngraph_types::{CompileError, ErrorCode, Result};

use crate::builtins::SpecialForm;
use crate::cast::convert;
use crate::compiler::CompilerContext;
use crate::expr::{compile_aug_assign, compile_declare_inputs, compile_expr};
use crate::ty::Type;

/// Compile statements in order, stopping at the first error.
pub fn compile_stmts(body: &[Stmt], ctx: &mut CompilerContext<'_>) -> Result<()> {
    for stmt in body {
        compile_stmt(stmt, ctx)?;
    }
    Ok(())
}

fn compile_stmt(stmt: &Stmt, ctx: &mut CompilerContext<'_>) -> Result<()> {
    match stmt {
        // Module orchestration owns these.
        Stmt::FunctionDef(_) | Stmt::Import(_) | Stmt::ImportFrom(_) | Stmt::Pass(_) => Ok(()),
        Stmt::Assign(assign) => compile_assign(assign, ctx),
        Stmt::AnnAssign(assign) => compile_ann_assign(assign, ctx),
        Stmt::AugAssign(assign) => compile_aug_assign(assign, ctx).map(|_| ()),
        Stmt::Return(ret) => {
            let node = compile_expr(&ret.value, ctx)?;
            ctx.graph.set_graph_output(node, true);
            Ok(())
        }
        Stmt::Expr(expr) => compile_expr_stmt(expr, ctx),
    }
}

fn compile_assign(stmt: &AssignStmt, ctx: &mut CompilerContext<'_>) -> Result<()> {
    let name = match &stmt.target.kind {
        ExprKind::Name(name) => name,
        ExprKind::Attribute { .. } => {
            return Err(CompileError::at(
                ErrorCode::INVALID_ASSIGN_TARGET,
                "Assigning to attributes is not supported",
                stmt.target.span,
            ))
        }
        _ => {
            return Err(CompileError::at(
                ErrorCode::INVALID_ASSIGN_TARGET,
                "Only variables can be assigned to",
                stmt.target.span,
            ))
        }
    };
    let node = compile_expr(&stmt.value, ctx)?;
    ctx.bind(name, node, stmt.span);
    Ok(())
}

/// `x: float2 = value` converts the value to the annotated type.
fn compile_ann_assign(stmt: &AnnAssignStmt, ctx: &mut CompilerContext<'_>) -> Result<()> {
    let annotation = &stmt.annotation;
    let Some(declared) = Type::parse(&annotation.name) else {
        return Err(CompileError::at(
            ErrorCode::UNKNOWN_TYPE,
            format!("Unknown type [{}]", annotation.name),
            annotation.span,
        ));
    };
    let value = compile_expr(&stmt.value, ctx)?;
    let actual = ctx.graph.output_type(value);
    let node = if actual == declared {
        value
    } else {
        convert(ctx.graph, value, declared).ok_or_else(|| {
            CompileError::at(
                ErrorCode::TYPE_MISMATCH,
                format!(
                    "Can't cast {actual} to {declared} for variable [{}] assignment",
                    stmt.target.name
                ),
                stmt.span,
            )
        })?
    };
    ctx.bind(&stmt.target.name, node, stmt.span);
    Ok(())
}

fn compile_expr_stmt(stmt: &ExprStmt, ctx: &mut CompilerContext<'_>) -> Result<()> {
    if let ExprKind::Call { func, args } = &stmt.expr.kind {
        if func.dotted_name().as_deref().and_then(SpecialForm::lookup)
            == Some(SpecialForm::DeclareInputs)
        {
            return compile_declare_inputs(args, stmt.span, ctx);
        }
    }
    compile_expr(&stmt.expr, ctx).map(|_| ())
}
