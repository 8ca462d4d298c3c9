//! Layout engine: reflow node positions into columns by distance from the
//! graph's sinks. Purely cosmetic.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::graph::{Graph, NodeId, Position};

/// Assign every node a column equal to its longest distance from a sink
/// (a node with no consumers, or the output), then place columns right to
/// left with each column centered vertically.
pub fn align_nodes(graph: &mut Graph) {
    let columns = columns(graph);
    let grid = graph.grid();
    let size = grid.size;
    let step = size * grid.column_spacing;
    let width = columns.len() as f32 * step;
    let max_rows = columns.iter().map(Vec::len).max().unwrap_or(0);

    for (ci, column) in columns.iter().enumerate() {
        let x = width - (ci + 1) as f32 * step;
        let top = max_rows as f32 * size / 2.0 - column.len() as f32 / 2.0 * size;
        for (row, &node) in column.iter().enumerate() {
            graph.set_position(node, Position::new(x, top + row as f32 * size));
        }
    }
    debug!(columns = columns.len(), rows = max_rows, "aligned nodes");
}

/// Breadth-first from every sink along input wires. A node reached again at
/// a greater depth moves to the end of the deeper column.
fn columns(graph: &Graph) -> Vec<Vec<NodeId>> {
    let counts = graph.outgoing_counts();
    let output = graph.output();
    let mut depth: HashMap<NodeId, usize> = HashMap::new();
    let mut columns: Vec<Vec<NodeId>> = Vec::new();
    let mut queue: VecDeque<(NodeId, usize)> = graph
        .node_ids()
        .into_iter()
        .filter(|id| Some(*id) == output || counts.get(id).copied().unwrap_or(0) == 0)
        .map(|id| (id, 0))
        .collect();

    while let Some((node, d)) = queue.pop_front() {
        if let Some(&placed) = depth.get(&node) {
            if placed >= d {
                continue;
            }
            columns[placed].retain(|n| *n != node);
        }
        depth.insert(node, d);
        if columns.len() <= d {
            columns.resize_with(d + 1, Vec::new);
        }
        columns[d].push(node);
        if let Some(n) = graph.node(node) {
            queue.extend(n.connected_inputs().map(|(_, producer)| (producer, d + 1)));
        }
    }
    columns.retain(|c| !c.is_empty());
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::constant_id;
    use crate::graph::OUTPUT_PORT;
    use crate::library::function_id;
    use crate::ty::Type;

    fn position(graph: &Graph, id: NodeId) -> Position {
        graph.node(id).unwrap().position
    }

    #[test]
    fn chain_runs_right_to_left() {
        let mut graph = Graph::new();
        let a = graph.new_node(&constant_id(Type::FLOAT));
        let neg = graph.new_node(&function_id("neg"));
        graph.connect(a, OUTPUT_PORT, neg, "a");
        graph.set_graph_output(neg, true);

        align_nodes(&mut graph);
        let step = graph.grid().size * graph.grid().column_spacing;
        assert_eq!(position(&graph, neg).x, step);
        assert_eq!(position(&graph, a).x, 0.0);
        assert_eq!(position(&graph, neg).y, position(&graph, a).y);
    }

    #[test]
    fn shared_producer_moves_to_deepest_column() {
        // a feeds both neg (depth 1) and add directly; it must sit behind neg.
        let mut graph = Graph::new();
        let a = graph.new_node(&constant_id(Type::FLOAT));
        let neg = graph.new_node(&function_id("neg"));
        let add = graph.new_node(&function_id("add"));
        graph.connect(a, OUTPUT_PORT, neg, "a");
        graph.connect(neg, OUTPUT_PORT, add, "a");
        graph.connect(a, OUTPUT_PORT, add, "b");
        graph.set_graph_output(add, true);

        let cols = columns(&graph);
        assert_eq!(cols, vec![vec![add], vec![neg], vec![a]]);
    }

    #[test]
    fn columns_are_centered() {
        let mut graph = Graph::new();
        let a = graph.new_node(&constant_id(Type::FLOAT));
        let b = graph.new_node(&constant_id(Type::FLOAT));
        let add = graph.new_node(&function_id("add"));
        graph.connect(a, OUTPUT_PORT, add, "a");
        graph.connect(b, OUTPUT_PORT, add, "b");
        graph.set_graph_output(add, true);

        align_nodes(&mut graph);
        let size = graph.grid().size;
        assert_eq!(position(&graph, a).y, 0.0);
        assert_eq!(position(&graph, b).y, size);
        assert_eq!(position(&graph, add).y, size / 2.0);
    }

    #[test]
    fn empty_graph_is_a_no_op() {
        let mut graph = Graph::new();
        align_nodes(&mut graph);
        assert!(graph.is_empty());
    }
}
