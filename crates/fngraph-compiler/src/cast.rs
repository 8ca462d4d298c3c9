//! Implicit conversions between port types.
//!
//! A conversion is planned first ([`implicit_cast`]) and then materialized
//! as a chain of nodes ([`apply`]). Base-type changes always happen before
//! any width change, so every intermediate node stays in one numeric family.

use tracing::debug;

use crate::builtins::{cast_id, swizzle_id, vector_id};
use crate::graph::{Graph, NodeId, Value, OUTPUT_PORT};
use crate::library::CONSTANT_PORT;
use crate::ty::{BaseType, Type};

/// How to turn a producer's type into a consumer's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPlan {
    /// Types already match.
    Identity,
    /// int ↔ float at the same width.
    Cast { to: Type },
    /// Scalar to vector: optional base cast, then the value fills every slot.
    Broadcast { cast: Option<Type>, to: Type },
    /// Vector to vector of another width: optional base cast, then truncate
    /// or extend.
    Resize { cast: Option<Type>, to: Type },
    /// Vector to scalar: optional base cast, then component 0.
    Extract { cast: Option<Type>, to: Type },
}

impl ConversionPlan {
    /// Nodes [`apply`] will create for this plan.
    pub fn node_count(&self, from: Type) -> usize {
        let cast = |c: &Option<Type>| usize::from(c.is_some());
        match self {
            ConversionPlan::Identity => 0,
            ConversionPlan::Cast { .. } => 1,
            ConversionPlan::Broadcast { cast: c, to } => cast(c) + pack_count(to.components()),
            ConversionPlan::Resize { cast: c, to } => {
                cast(c) + resize_count(from.components(), to.components())
            }
            ConversionPlan::Extract { cast: c, .. } => cast(c) + 1,
        }
    }
}

/// Plan the conversion from `from` to `to`, or `None` if there is none.
/// Only numeric types convert; `bool` and `string` must match exactly.
pub fn implicit_cast(from: Type, to: Type) -> Option<ConversionPlan> {
    if from == to {
        return Some(ConversionPlan::Identity);
    }
    if !from.is_numeric() || !to.is_numeric() {
        return None;
    }
    let cast = (from.base() != to.base()).then(|| from.rebase(to.base()));
    let plan = match (from.components(), to.components()) {
        (a, b) if a == b => ConversionPlan::Cast { to },
        (1, _) => ConversionPlan::Broadcast { cast, to },
        (_, 1) => ConversionPlan::Extract { cast, to },
        _ => ConversionPlan::Resize { cast, to },
    };
    Some(plan)
}

/// Build the nodes for `plan`, fed by `producer`. Returns the node whose
/// output carries the converted value.
pub fn apply(graph: &mut Graph, producer: NodeId, plan: ConversionPlan) -> NodeId {
    let from = graph.output_type(producer);
    debug!(%from, ?plan, node = %producer, "inserting conversion");
    match plan {
        ConversionPlan::Identity => producer,
        ConversionPlan::Cast { to } => cast_node(graph, producer, to),
        ConversionPlan::Broadcast { cast, to } => {
            let src = maybe_cast(graph, producer, cast);
            pack(graph, to.base(), &vec![src; to.components()])
        }
        ConversionPlan::Resize { cast, to } => {
            let src = maybe_cast(graph, producer, cast);
            resize(graph, src, from.components(), to)
        }
        ConversionPlan::Extract { cast, to } => {
            let src = maybe_cast(graph, producer, cast);
            swizzle(graph, src, to.base(), &[0])
        }
    }
}

/// Plan and apply in one step.
pub fn convert(graph: &mut Graph, producer: NodeId, to: Type) -> Option<NodeId> {
    let plan = implicit_cast(graph.output_type(producer), to)?;
    Some(apply(graph, producer, plan))
}

fn cast_node(graph: &mut Graph, producer: NodeId, to: Type) -> NodeId {
    let node = graph.new_node(&cast_id(to));
    graph.connect(producer, OUTPUT_PORT, node, "value");
    node
}

fn maybe_cast(graph: &mut Graph, producer: NodeId, cast: Option<Type>) -> NodeId {
    match cast {
        Some(to) => cast_node(graph, producer, to),
        None => producer,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Packing and Swizzling
// ══════════════════════════════════════════════════════════════════════════════

/// A swizzle node reading `indices` out of `vector`.
pub fn swizzle(graph: &mut Graph, vector: NodeId, base: BaseType, indices: &[i64]) -> NodeId {
    let node = graph.new_node(&swizzle_id(base, indices.len()));
    graph.set_constant(node, CONSTANT_PORT, Value::Int(indices.to_vec()));
    graph.connect(vector, OUTPUT_PORT, node, "vector");
    node
}

/// Pack 2–4 scalars of `base` into one vector:
/// `vector2(a, b)`, `vector3(vector2(a, b), c)`,
/// `vector4(vector2(a, b), vector2(c, d))`.
///
/// The outer node is created before the inner pairs.
///
/// # Panics
///
/// Panics unless `scalars` has 2 to 4 entries.
pub fn pack(graph: &mut Graph, base: BaseType, scalars: &[NodeId]) -> NodeId {
    let ty = |n| Type::with(base, n);
    match *scalars {
        [a, b] => pair(graph, base, a, b),
        [a, b, c] => {
            let out = graph.new_node(&vector_id(ty(3)));
            let xy = pair(graph, base, a, b);
            graph.connect(xy, OUTPUT_PORT, out, "componentsin");
            graph.connect(c, OUTPUT_PORT, out, "componentslast");
            out
        }
        [a, b, c, d] => {
            let out = graph.new_node(&vector_id(ty(4)));
            let xy = graph.new_node(&vector_id(ty(2)));
            let zw = graph.new_node(&vector_id(ty(2)));
            graph.connect(xy, OUTPUT_PORT, out, "componentsin");
            graph.connect(zw, OUTPUT_PORT, out, "componentslast");
            wire_pair(graph, xy, a, b);
            wire_pair(graph, zw, c, d);
            out
        }
        _ => panic!("cannot pack {} components", scalars.len()),
    }
}

fn pair(graph: &mut Graph, base: BaseType, a: NodeId, b: NodeId) -> NodeId {
    let node = graph.new_node(&vector_id(Type::with(base, 2)));
    wire_pair(graph, node, a, b);
    node
}

fn wire_pair(graph: &mut Graph, node: NodeId, a: NodeId, b: NodeId) {
    graph.connect(a, OUTPUT_PORT, node, "componentsin");
    graph.connect(b, OUTPUT_PORT, node, "componentslast");
}

fn pack_count(components: usize) -> usize {
    match components {
        2 => 1,
        3 => 2,
        _ => 3,
    }
}

/// Change the width of a vector already in the target base.
///
/// Truncation keeps the leading components. Extension fills the new slots
/// with component 0: `float2 → float3` is `(x, y, x)`, `float3 → float4` is
/// `(x, y, z, x)`.
fn resize(graph: &mut Graph, src: NodeId, from: usize, to: Type) -> NodeId {
    let base = to.base();
    match (from, to.components()) {
        (_, 2) => swizzle(graph, src, base, &[0, 1]),
        (4, 3) => {
            let xy = swizzle(graph, src, base, &[0, 1]);
            let z = swizzle(graph, src, base, &[2]);
            pack_onto(graph, to, xy, z)
        }
        (2, 3) => {
            let x = swizzle(graph, src, base, &[0]);
            pack_onto(graph, to, src, x)
        }
        (2, 4) => {
            let x = swizzle(graph, src, base, &[0]);
            let xx = pair(graph, base, x, x);
            pack_onto(graph, to, src, xx)
        }
        (3, 4) => {
            let xy = swizzle(graph, src, base, &[0, 1]);
            let z = swizzle(graph, src, base, &[2]);
            let x = swizzle(graph, src, base, &[0]);
            let zx = pair(graph, base, z, x);
            pack_onto(graph, to, xy, zx)
        }
        (from, to) => unreachable!("no resize from {from} to {to} components"),
    }
}

fn pack_onto(graph: &mut Graph, to: Type, head: NodeId, last: NodeId) -> NodeId {
    let node = graph.new_node(&vector_id(to));
    wire_pair(graph, node, head, last);
    node
}

fn resize_count(from: usize, to: usize) -> usize {
    match (from, to) {
        (_, 2) => 1,
        (4, 3) => 3,
        (2, 3) => 2,
        (2, 4) => 3,
        _ => 5,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Multi-typed Resolution
// ══════════════════════════════════════════════════════════════════════════════

/// One wire into a multi-typed port: the producer's type and every type
/// the consumer port accepts.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub producer: Type,
    pub accepts: &'a [Type],
}

/// Pick one type for every multi-typed port of a node.
///
/// Width is the smaller of the widest producer and the widest accepted
/// type. Base is `int` when the ports accept only ints, or accept both
/// families and no producer is a float; otherwise `float`. `bool` counts as
/// a float here. If every producer has the same non-numeric type and every
/// port accepts it, that type wins.
pub fn best_common_type(candidates: &[Candidate<'_>]) -> Option<Type> {
    let first = candidates.first()?;
    if !first.producer.is_numeric()
        && candidates
            .iter()
            .all(|c| c.producer == first.producer && c.accepts.contains(&c.producer))
    {
        return Some(first.producer);
    }

    let producer_width = candidates.iter().map(|c| c.producer.components()).max()?;
    let accepted_width = candidates
        .iter()
        .flat_map(|c| c.accepts.iter().map(|t| t.components()))
        .max()?;
    let components = producer_width.min(accepted_width);

    let producer_floats = candidates
        .iter()
        .any(|c| c.producer.base().numeric_family() == BaseType::Float);
    let accepts_family = |family: BaseType| {
        candidates
            .iter()
            .flat_map(|c| c.accepts)
            .any(|t| t.base().numeric_family() == family)
    };
    let (accepts_float, accepts_int) = (accepts_family(BaseType::Float), accepts_family(BaseType::Int));

    let base = if accepts_int && (!accepts_float || !producer_floats) {
        BaseType::Int
    } else {
        BaseType::Float
    };
    Type::new(base, components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::function_id;

    fn constant(graph: &mut Graph, ty: Type) -> NodeId {
        graph.new_node(&crate::builtins::constant_id(ty))
    }

    #[test]
    fn plans() {
        assert_eq!(implicit_cast(Type::FLOAT, Type::FLOAT), Some(ConversionPlan::Identity));
        assert_eq!(
            implicit_cast(Type::INT3, Type::FLOAT3),
            Some(ConversionPlan::Cast { to: Type::FLOAT3 })
        );
        assert_eq!(
            implicit_cast(Type::INT, Type::FLOAT4),
            Some(ConversionPlan::Broadcast {
                cast: Some(Type::FLOAT),
                to: Type::FLOAT4
            })
        );
        assert_eq!(
            implicit_cast(Type::FLOAT4, Type::INT2),
            Some(ConversionPlan::Resize {
                cast: Some(Type::INT4),
                to: Type::INT2
            })
        );
        assert_eq!(
            implicit_cast(Type::FLOAT3, Type::FLOAT),
            Some(ConversionPlan::Extract {
                cast: None,
                to: Type::FLOAT
            })
        );
        assert_eq!(implicit_cast(Type::BOOL, Type::FLOAT), None);
        assert_eq!(implicit_cast(Type::FLOAT, Type::STRING), None);
    }

    #[test]
    fn every_numeric_pair_converts_to_the_target_type() {
        for from in Type::numeric() {
            for to in Type::numeric() {
                let mut graph = Graph::new();
                let src = constant(&mut graph, from);
                let plan = implicit_cast(from, to).unwrap();
                let out = apply(&mut graph, src, plan);
                assert_eq!(graph.output_type(out), to, "{from} -> {to}");
                assert_eq!(graph.len() - 1, plan.node_count(from), "{from} -> {to}");
                for node in graph.nodes() {
                    for (port, producer) in node.connected_inputs() {
                        let ty = graph.output_type(producer);
                        assert!(port.accepts.contains(&ty), "{from} -> {to}: {}", node.definition);
                    }
                }
            }
        }
    }

    #[test]
    fn cast_happens_before_broadcast() {
        let mut graph = Graph::new();
        let src = constant(&mut graph, Type::INT);
        let out = convert(&mut graph, src, Type::FLOAT3).unwrap();
        let ids: Vec<_> = graph.nodes().map(|n| n.short_name().to_string()).collect();
        assert_eq!(ids, ["const_int1", "tofloat", "vector3", "vector2"]);
        assert!(graph.node(out).unwrap().is("vector3"));
    }

    #[test]
    fn truncation_keeps_leading_components() {
        let mut graph = Graph::new();
        let src = constant(&mut graph, Type::FLOAT4);
        let out = convert(&mut graph, src, Type::FLOAT2).unwrap();
        let node = graph.node(out).unwrap();
        assert!(node.is("swizzle2"));
        assert_eq!(node.input(CONSTANT_PORT).unwrap().constant, Some(Value::Int(vec![0, 1])));
    }

    #[test]
    fn pack_wires_scalars_in_order() {
        let mut graph = Graph::new();
        let parts: Vec<NodeId> = (0..4).map(|_| constant(&mut graph, Type::FLOAT)).collect();
        let out = pack(&mut graph, BaseType::Float, &parts);
        assert_eq!(graph.output_type(out), Type::FLOAT4);
        let v4 = graph.node(out).unwrap();
        let xy = v4.input("componentsin").unwrap().source.unwrap();
        let zw = v4.input("componentslast").unwrap().source.unwrap();
        assert_eq!(graph.node(xy).unwrap().input("componentsin").unwrap().source, Some(parts[0]));
        assert_eq!(graph.node(zw).unwrap().input("componentslast").unwrap().source, Some(parts[3]));
        assert_eq!(graph.nodes_named("vector2").count(), 2);
        assert_eq!(graph.node(out).unwrap().definition, function_id("vector4"));
    }

    fn cand(producer: Type, accepts: &[Type]) -> Candidate<'_> {
        Candidate { producer, accepts }
    }

    // Characterization of the multi-typed heuristic, not a correctness claim.
    #[test]
    fn best_common_type_heuristic() {
        let numeric = Type::numeric();
        let any = Type::any();
        let scalar = [Type::FLOAT, Type::INT];
        let ints = [Type::INT2, Type::INT3];

        assert_eq!(best_common_type(&[cand(Type::INT, &numeric), cand(Type::INT, &numeric)]), Some(Type::INT));
        assert_eq!(best_common_type(&[cand(Type::INT, &numeric), cand(Type::FLOAT, &numeric)]), Some(Type::FLOAT));
        assert_eq!(best_common_type(&[cand(Type::FLOAT3, &numeric), cand(Type::INT, &numeric)]), Some(Type::FLOAT3));
        assert_eq!(best_common_type(&[cand(Type::INT2, &numeric), cand(Type::INT4, &numeric)]), Some(Type::INT4));
        assert_eq!(best_common_type(&[cand(Type::FLOAT3, &scalar), cand(Type::INT, &scalar)]), Some(Type::FLOAT));
        // bool producers count as floats
        assert_eq!(best_common_type(&[cand(Type::BOOL, &numeric), cand(Type::INT, &numeric)]), Some(Type::FLOAT));
        // Uniform non-numeric producers pass through instead of collapsing to
        // float, so a bool-only polymorphic port stays wired without a cast.
        assert_eq!(best_common_type(&[cand(Type::BOOL, &any), cand(Type::BOOL, &any)]), Some(Type::BOOL));
        assert_eq!(best_common_type(&[cand(Type::FLOAT, &ints)]), Some(Type::INT));
        assert_eq!(best_common_type(&[]), None);
    }
}
