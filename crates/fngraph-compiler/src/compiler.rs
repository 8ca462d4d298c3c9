//! Per-unit compilation driver and the context threaded through it.
//!
//! ```text
//! reset → declared inputs → statements → output check → sequencing → prune → layout
//! ```

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fngraph_types::ast::Stmt;
use fngraph_types::{CompileError, Diagnostic, ErrorCode, Result, Span};

use crate::builtins::{getter_id, OUTPUT_VARIABLE};
use crate::diagnostics::DiagnosticsSink;
use crate::graph::{Graph, NodeId, Value, OUTPUT_PORT};
use crate::host::{FunctionResolver, GraphCatalog, ImportTable};
use crate::layout::align_nodes;
use crate::library::{function_id, CONSTANT_PORT};
use crate::options::CompileOptions;
use crate::stmt::compile_stmts;
use crate::ty::Type;

// ══════════════════════════════════════════════════════════════════════════════
// Units and Environment
// ══════════════════════════════════════════════════════════════════════════════

/// An external parameter materialized as a getter node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredInput {
    /// Property id the getter reads, e.g. `$pos` or `__blend_arg_t`.
    pub id: String,
    /// Variable name the input is bound to in source.
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

impl DeclaredInput {
    pub fn new(id: impl Into<String>, name: impl Into<String>, ty: Type) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ty,
        }
    }
}

/// One statement sequence compiled into one graph.
#[derive(Debug, Clone)]
pub struct CompilationUnit<'a> {
    pub name: String,
    pub body: &'a [Stmt],
    pub inputs: Vec<DeclaredInput>,
    /// Sibling graph whose inputs are declared before the body runs.
    pub inputs_graph: Option<String>,
}

impl<'a> CompilationUnit<'a> {
    pub fn new(name: impl Into<String>, body: &'a [Stmt]) -> Self {
        Self {
            name: name.into(),
            body,
            inputs: Vec::new(),
            inputs_graph: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<DeclaredInput>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Declare the inputs of the sibling graph `graph_id` before the body.
    pub fn with_inputs_graph(mut self, graph_id: impl Into<String>) -> Self {
        self.inputs_graph = Some(graph_id.into());
        self
    }
}

/// What the compiler may look up outside the unit.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub resolver: &'a dyn FunctionResolver,
    pub catalog: &'a dyn GraphCatalog,
    pub imports: &'a ImportTable,
}

// ══════════════════════════════════════════════════════════════════════════════
// Compiler Context
// ══════════════════════════════════════════════════════════════════════════════

/// A variable's current producer and the statement that bound it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub node: NodeId,
    pub span: Span,
}

/// Mutable state of one compile. Built fresh for every unit.
pub struct CompilerContext<'a> {
    pub graph: &'a mut Graph,
    pub env: Environment<'a>,
    /// Last write wins; insertion order decides which name an unused-variable
    /// warning reports.
    pub scope: IndexMap<String, Binding>,
    /// Names bound to declared inputs. Never reported as unused.
    pub inputs_vars: IndexSet<String>,
    /// `set` nodes from `export` and `setvar`, in source order.
    pub set_queue: Vec<NodeId>,
}

impl<'a> CompilerContext<'a> {
    pub fn new(graph: &'a mut Graph, env: Environment<'a>) -> Self {
        Self {
            graph,
            env,
            scope: IndexMap::new(),
            inputs_vars: IndexSet::new(),
            set_queue: Vec::new(),
        }
    }

    pub fn bind(&mut self, name: &str, node: NodeId, span: Span) {
        self.scope.insert(name.to_string(), Binding { node, span });
        if name == OUTPUT_VARIABLE {
            self.graph.set_graph_output(node, true);
        }
    }

    pub fn lookup(&self, name: &str, span: Span) -> Result<NodeId> {
        self.scope.get(name).map(|b| b.node).ok_or_else(|| {
            CompileError::at(
                ErrorCode::UNKNOWN_VARIABLE,
                format!("Variable [{name}] not found"),
                span,
            )
        })
    }

    /// A getter node reading the property `id`, bound to `name`.
    pub fn declare_input(&mut self, input: &DeclaredInput, span: Span) {
        let node = self.graph.new_node(&getter_id(input.ty));
        self.graph
            .set_constant(node, CONSTANT_PORT, Value::String(input.id.clone()));
        self.scope.insert(input.name.clone(), Binding { node, span });
        self.inputs_vars.insert(input.name.clone());
    }

    /// Declare every non-system input of the sibling graph `graph_id`.
    pub fn declare_graph_inputs(&mut self, graph_id: &str, span: Option<Span>) -> Result<()> {
        let inputs = self.env.catalog.graph_inputs(graph_id).ok_or_else(|| {
            CompileError::new(
                ErrorCode::UNKNOWN_GRAPH,
                format!("Graph [{graph_id}] not found for declare_inputs()"),
                span,
            )
        })?;
        let at = span.unwrap_or(Span::point(0, 0));
        for input in inputs.iter().filter(|i| !i.id.starts_with('$')) {
            self.declare_input(&DeclaredInput::new(&input.id, &input.id, input.ty), at);
        }
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Driver
// ══════════════════════════════════════════════════════════════════════════════

/// Compile `unit` into `graph`, discarding whatever `graph` held before.
///
/// Fatal errors abort at once and leave the graph partially built; callers
/// recompile from scratch. Unused variables are reported to `sink`.
pub fn compile_unit(
    unit: &CompilationUnit<'_>,
    graph: &mut Graph,
    env: Environment<'_>,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticsSink,
) -> Result<()> {
    info!(unit = %unit.name, "compiling");
    graph.clear();
    let mut ctx = CompilerContext::new(graph, env);

    let origin = Span::point(0, 0);
    for input in &unit.inputs {
        ctx.declare_input(input, origin);
    }
    if let Some(graph_id) = &unit.inputs_graph {
        ctx.declare_graph_inputs(graph_id, None)?;
    }

    compile_stmts(unit.body, &mut ctx)?;

    let Some(output) = ctx.graph.output() else {
        return Err(CompileError::new(
            ErrorCode::NO_OUTPUT,
            format!("No return statement or {OUTPUT_VARIABLE} provided"),
            unit.body.iter().rev().find(|s| !s.is_declaration()).map(Stmt::span),
        ));
    };

    sequence_side_effects(&mut ctx, output);
    prune(&mut ctx, sink);

    let created = ctx.graph.created_count();
    if options.layout && created <= options.layout_max_nodes {
        align_nodes(ctx.graph);
    }
    info!(unit = %unit.name, nodes = ctx.graph.len(), created, "compiled");
    Ok(())
}

/// Chain queued `set` nodes in front of the output:
/// `sequence(sequence(set0, set1), output)`. The outermost sequence becomes
/// the graph output. A `set` already consumed elsewhere, or already the
/// output, is left where it is.
fn sequence_side_effects(ctx: &mut CompilerContext<'_>, output: NodeId) {
    let counts = ctx.graph.outgoing_counts();
    let queued: Vec<NodeId> = ctx
        .set_queue
        .iter()
        .copied()
        .filter(|id| *id != output && counts.get(id).copied().unwrap_or(0) == 0)
        .collect();
    let Some((&first, rest)) = queued.split_first() else {
        return;
    };

    let seq_id = function_id("sequence");
    let mut seq = ctx.graph.new_node(&seq_id);
    ctx.graph.connect(first, OUTPUT_PORT, seq, "seqin");
    for &set in rest {
        ctx.graph.connect(set, OUTPUT_PORT, seq, "seqlast");
        let prev = seq;
        seq = ctx.graph.new_node(&seq_id);
        ctx.graph.connect(prev, OUTPUT_PORT, seq, "seqin");
    }
    ctx.graph.connect(output, OUTPUT_PORT, seq, "seqlast");
    ctx.graph.set_graph_output(output, false);
    ctx.graph.set_graph_output(seq, true);
    debug!(sets = queued.len(), "sequenced side effects");
}

/// Delete every node whose output reaches nothing, repeating until the
/// graph is stable. Variables whose node is dead on the first sweep are
/// reported as unused; nodes that die only because a consumer was deleted
/// are removed silently.
fn prune(ctx: &mut CompilerContext<'_>, sink: &mut dyn DiagnosticsSink) {
    let output = ctx.graph.output();
    let mut first_sweep = true;
    loop {
        let counts = ctx.graph.outgoing_counts();
        let dead: Vec<NodeId> = ctx
            .graph
            .node_ids()
            .into_iter()
            .filter(|id| Some(*id) != output && counts.get(id).copied().unwrap_or(0) == 0)
            .collect();
        if dead.is_empty() {
            break;
        }
        for id in dead {
            if first_sweep {
                report_unused(ctx, id, sink);
            }
            debug!(node = %id, "deleting unused node");
            ctx.graph.delete_node(id);
        }
        first_sweep = false;
    }
}

fn report_unused(ctx: &CompilerContext<'_>, node: NodeId, sink: &mut dyn DiagnosticsSink) {
    let Some((name, binding)) = ctx
        .scope
        .iter()
        .find(|(name, b)| b.node == node && !ctx.inputs_vars.contains(name.as_str()))
    else {
        return;
    };
    sink.report(Diagnostic::warning(
        ErrorCode::UNUSED_VARIABLE,
        format!(
            "Unused variable [{name}] (declared at line {})",
            binding.span.start_line
        ),
        Some(binding.span),
    ));
}
