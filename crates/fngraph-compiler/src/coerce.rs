//! Coercion pass: make every wired input of a freshly built node match the
//! type its port expects, inserting conversion chains where needed.

use tracing::debug;

use fngraph_types::{CompileError, ErrorCode, Span};

use crate::cast::{apply, best_common_type, implicit_cast, Candidate};
use crate::graph::{Graph, Node, NodeId, NodeKind, OUTPUT_PORT};
use crate::ty::Type;

/// A wire into one of the node's connectable ports, captured before any
/// rewiring.
struct Wire {
    port: String,
    accepts: Vec<Type>,
    multi_typed: bool,
    producer: NodeId,
    ty: Type,
}

/// Sequence and swizzle nodes take whatever they are given.
fn is_exempt(node: &Node) -> bool {
    node.kind == NodeKind::Primitive
        && (node.is("sequence")
            || node.short_name().starts_with("swizzle")
            || node.short_name().starts_with("iswizzle"))
}

/// Coerce the inputs of `node`.
///
/// Multi-typed ports are resolved together to one best common type; every
/// other port is converted to its single accepted type. Errors are
/// reported at `span`.
pub fn coerce_inputs(graph: &mut Graph, node: NodeId, span: Span) -> Result<(), CompileError> {
    let Some(target) = graph.node(node) else {
        return Ok(());
    };
    if is_exempt(target) {
        return Ok(());
    }
    let name = target.short_name().to_string();
    let (multi, single): (Vec<Wire>, Vec<Wire>) = target
        .connected_inputs()
        .map(|(port, producer)| Wire {
            port: port.name.clone(),
            accepts: port.accepts.clone(),
            multi_typed: port.is_multi_typed(),
            producer,
            ty: graph.output_type(producer),
        })
        .partition(|w| w.multi_typed);

    if !multi.is_empty() {
        let candidates: Vec<Candidate> = multi
            .iter()
            .map(|w| Candidate {
                producer: w.ty,
                accepts: &w.accepts,
            })
            .collect();
        let best = best_common_type(&candidates);
        for wire in &multi {
            let Some(best) = best.filter(|t| wire.accepts.contains(t)) else {
                let shown = best.map_or_else(|| "no common type".to_string(), |t| t.to_string());
                return Err(CompileError::at(
                    ErrorCode::TYPE_MISMATCH,
                    format!("Operator '{name}' port '{}' does not accept {shown}", wire.port),
                    span,
                ));
            };
            rewire(graph, node, &name, wire, best, span)?;
        }
    }

    for wire in &single {
        if let Some(&to) = wire.accepts.first() {
            rewire(graph, node, &name, wire, to, span)?;
        }
    }
    Ok(())
}

fn rewire(
    graph: &mut Graph,
    node: NodeId,
    name: &str,
    wire: &Wire,
    to: Type,
    span: Span,
) -> Result<(), CompileError> {
    if wire.ty == to {
        return Ok(());
    }
    let plan = implicit_cast(wire.ty, to).ok_or_else(|| {
        CompileError::at(
            ErrorCode::TYPE_MISMATCH,
            format!(
                "Can't cast {} to {to} for operator '{name}' port '{}'",
                wire.ty, wire.port
            ),
            span,
        )
    })?;
    debug!(operator = name, port = %wire.port, from = %wire.ty, %to, "coercing input");
    let converted = apply(graph, wire.producer, plan);
    graph.connect(converted, OUTPUT_PORT, node, &wire.port);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::constant_id;
    use crate::library::function_id;

    fn wired(graph: &mut Graph, op: &str, inputs: &[(&str, Type)]) -> NodeId {
        let node = graph.new_node(&function_id(op));
        for (port, ty) in inputs {
            let src = graph.new_node(&constant_id(*ty));
            graph.connect(src, OUTPUT_PORT, node, port);
        }
        node
    }

    fn source_type(graph: &Graph, node: NodeId, port: &str) -> Type {
        let src = graph.node(node).unwrap().input(port).unwrap().source.unwrap();
        graph.output_type(src)
    }

    #[test]
    fn int_and_float_meet_at_float() {
        let mut graph = Graph::new();
        let add = wired(&mut graph, "add", &[("a", Type::INT), ("b", Type::FLOAT)]);
        coerce_inputs(&mut graph, add, Span::point(1, 1)).unwrap();
        assert_eq!(source_type(&graph, add, "a"), Type::FLOAT);
        assert_eq!(graph.output_type(add), Type::FLOAT);
        assert_eq!(graph.nodes_named("tofloat").count(), 1);
    }

    #[test]
    fn scalar_broadcasts_to_the_wider_operand() {
        let mut graph = Graph::new();
        let mul = wired(&mut graph, "mul", &[("a", Type::FLOAT), ("b", Type::FLOAT3)]);
        coerce_inputs(&mut graph, mul, Span::point(1, 1)).unwrap();
        assert_eq!(source_type(&graph, mul, "a"), Type::FLOAT3);
        assert_eq!(graph.output_type(mul), Type::FLOAT3);
    }

    #[test]
    fn single_typed_port_takes_its_type() {
        let mut graph = Graph::new();
        let lerp = wired(
            &mut graph,
            "lerp",
            &[("a", Type::FLOAT2), ("b", Type::FLOAT2), ("x", Type::INT)],
        );
        coerce_inputs(&mut graph, lerp, Span::point(1, 1)).unwrap();
        assert_eq!(source_type(&graph, lerp, "x"), Type::FLOAT);
    }

    #[test]
    fn comparison_extracts_a_scalar() {
        let mut graph = Graph::new();
        let gt = wired(&mut graph, "gt", &[("a", Type::FLOAT3), ("b", Type::INT)]);
        coerce_inputs(&mut graph, gt, Span::point(1, 1)).unwrap();
        assert_eq!(source_type(&graph, gt, "a"), Type::FLOAT);
        assert_eq!(source_type(&graph, gt, "b"), Type::FLOAT);
    }

    #[test]
    fn bool_into_numeric_port_fails() {
        let mut graph = Graph::new();
        let add = wired(&mut graph, "add", &[("a", Type::BOOL), ("b", Type::FLOAT)]);
        let err = coerce_inputs(&mut graph, add, Span::point(3, 5)).unwrap_err();
        assert_eq!(err.code, ErrorCode::TYPE_MISMATCH);
        assert!(err.message.contains("Can't cast bool to float"), "{}", err.message);
        assert_eq!(err.span, Some(Span::point(3, 5)));
    }

    #[test]
    fn unaccepted_best_type_fails() {
        let mut graph = Graph::new();
        let dot = wired(&mut graph, "dot", &[("a", Type::FLOAT), ("b", Type::FLOAT)]);
        let err = coerce_inputs(&mut graph, dot, Span::point(1, 1)).unwrap_err();
        assert!(err.message.contains("does not accept float"), "{}", err.message);
    }

    #[test]
    fn ifelse_keeps_bool_paths() {
        let mut graph = Graph::new();
        let node = wired(
            &mut graph,
            "ifelse",
            &[
                ("condition", Type::BOOL),
                ("ifpath", Type::BOOL),
                ("elsepath", Type::BOOL),
            ],
        );
        let before = graph.len();
        coerce_inputs(&mut graph, node, Span::point(1, 1)).unwrap();
        assert_eq!(graph.len(), before);
        assert_eq!(graph.output_type(node), Type::BOOL);
    }

    #[test]
    fn swizzles_are_exempt() {
        let mut graph = Graph::new();
        let node = wired(&mut graph, "swizzle1", &[("vector", Type::INT3)]);
        let before = graph.len();
        coerce_inputs(&mut graph, node, Span::point(1, 1)).unwrap();
        assert_eq!(graph.len(), before);
    }
}
