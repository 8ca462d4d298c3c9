//! Graph IR: nodes, typed ports and the connections between them.
//!
//! A [`Graph`] owns every node of one compilation unit. Nodes are created,
//! wired, repositioned and deleted only through the methods here. Node
//! order is creation order, which keeps serialization and fingerprints
//! deterministic.

use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

use crate::host::ExternalFunction;
use crate::library::{function_id, OutputRule, PrimitiveLibrary, FUNCTION_NS};
use crate::options::GridOptions;
use crate::ty::Type;

/// Id of the primary output port every node carries.
pub const OUTPUT_PORT: &str = "unique_filter_output";

// ══════════════════════════════════════════════════════════════════════════════
// Nodes and Ports
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// One of the built-in primitive definitions.
    Primitive,
    /// An instance of an imported function graph.
    Instance,
}

/// An inline constant stored on a port.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Bool(bool),
    String(String),
    Float(Vec<f64>),
    Int(Vec<i64>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Int(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputPort {
    pub name: String,
    pub accepts: Vec<Type>,
    pub connectable: bool,
    /// Producer wired into this port. At most one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<Value>,
}

impl InputPort {
    /// Accepts several types; resolved jointly by the coercion pass.
    pub fn is_multi_typed(&self) -> bool {
        self.accepts.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputPort {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    #[serde(skip)]
    pub rule: OutputRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub definition: String,
    pub kind: NodeKind,
    pub inputs: Vec<InputPort>,
    pub output: OutputPort,
    pub position: Position,
}

impl Node {
    pub fn input(&self, name: &str) -> Option<&InputPort> {
        self.inputs.iter().find(|p| p.name == name)
    }

    fn input_mut(&mut self, name: &str) -> Option<&mut InputPort> {
        self.inputs.iter_mut().find(|p| p.name == name)
    }

    pub fn output_type(&self) -> Type {
        self.output.ty
    }

    /// Primitive name without the namespace, e.g. `add`.
    pub fn short_name(&self) -> &str {
        self.definition
            .strip_prefix(FUNCTION_NS)
            .unwrap_or(&self.definition)
    }

    /// `true` if this is the primitive with the given short name.
    pub fn is(&self, name: &str) -> bool {
        self.kind == NodeKind::Primitive && self.short_name() == name
    }

    /// Connectable ports that have a producer wired in.
    pub fn connected_inputs(&self) -> impl Iterator<Item = (&InputPort, NodeId)> {
        self.inputs
            .iter()
            .filter(|p| p.connectable)
            .filter_map(|p| p.source.map(|src| (p, src)))
    }
}

/// A directed wire from a producer's output port to a consumer's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub producer: NodeId,
    pub producer_port: String,
    pub consumer: NodeId,
    pub consumer_port: String,
}

// ══════════════════════════════════════════════════════════════════════════════
// Graph
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    next_id: u32,
    output: Option<NodeId>,
    grid: GridOptions,
    /// Slot the next created node is placed in.
    cursor: Position,
    /// Nodes created since the last clear, deleted ones included.
    created: usize,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_grid(GridOptions::default())
    }

    pub fn with_grid(grid: GridOptions) -> Self {
        Self {
            nodes: IndexMap::new(),
            next_id: 0,
            output: None,
            grid,
            cursor: Position::default(),
            created: 0,
        }
    }

    pub fn grid(&self) -> GridOptions {
        self.grid
    }

    /// Drop every node and reset the slot allocator and the node counter.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.next_id = 0;
        self.output = None;
        self.cursor = Position::default();
        self.created = 0;
    }

    // ── Node creation ─────────────────────────────────────────────────────

    /// Create a primitive node from its definition id.
    ///
    /// # Panics
    ///
    /// Panics if the id is not in the built-in library. The compiler only
    /// creates nodes from ids it takes from that library.
    pub fn new_node(&mut self, definition_id: &str) -> NodeId {
        let def = PrimitiveLibrary::builtin()
            .get(definition_id)
            .unwrap_or_else(|| panic!("unknown primitive definition '{definition_id}'"));
        let inputs = def
            .inputs
            .iter()
            .map(|p| InputPort {
                name: p.name.clone(),
                accepts: p.accepts.clone(),
                connectable: p.connectable,
                source: None,
                constant: None,
            })
            .collect();
        self.insert(
            def.id.clone(),
            NodeKind::Primitive,
            inputs,
            def.output.clone(),
            def.initial_output_type(),
        )
    }

    /// Create a node instancing an imported function graph.
    pub fn new_instance_node(&mut self, function: &ExternalFunction) -> NodeId {
        let inputs = function
            .inputs
            .iter()
            .map(|p| InputPort {
                name: p.name.clone(),
                accepts: p.accepts.clone(),
                connectable: true,
                source: None,
                constant: None,
            })
            .collect();
        self.insert(
            function.definition.clone(),
            NodeKind::Instance,
            inputs,
            OutputRule::Fixed(function.output),
            function.output,
        )
    }

    fn insert(
        &mut self,
        definition: String,
        kind: NodeKind,
        inputs: Vec<InputPort>,
        rule: OutputRule,
        ty: Type,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let position = self.next_slot();
        self.nodes.insert(
            id,
            Node {
                id,
                definition,
                kind,
                inputs,
                output: OutputPort {
                    name: OUTPUT_PORT.to_string(),
                    ty,
                    rule,
                },
                position,
            },
        );
        self.created += 1;
        id
    }

    /// Fill columns top to bottom, wrapping after `max_nodes_in_row` slots.
    fn next_slot(&mut self) -> Position {
        let slot = self.cursor;
        self.cursor.y += self.grid.size;
        if self.cursor.y >= self.grid.size * self.grid.max_nodes_in_row as f32 {
            self.cursor.x += self.grid.size;
            self.cursor.y = 0.0;
        }
        slot
    }

    // ── Wiring ────────────────────────────────────────────────────────────

    /// Wire `producer`'s output into `consumer_port`, replacing any previous
    /// producer of that port. A consumer whose output follows that port
    /// takes the producer's type.
    ///
    /// # Panics
    ///
    /// Panics if either node or the consumer port does not exist, or if
    /// `producer_port` is not the primary output.
    pub fn connect(
        &mut self,
        producer: NodeId,
        producer_port: &str,
        consumer: NodeId,
        consumer_port: &str,
    ) {
        assert_eq!(producer_port, OUTPUT_PORT, "nodes expose a single output port");
        let producer_type = self.output_type(producer);
        let node = self
            .nodes
            .get_mut(&consumer)
            .unwrap_or_else(|| panic!("connect to missing node {consumer}"));
        let port = node
            .input_mut(consumer_port)
            .unwrap_or_else(|| panic!("node {consumer} has no input '{consumer_port}'"));
        port.source = Some(producer);
        if matches!(&node.output.rule, OutputRule::FollowsInput(p) if p == consumer_port) {
            node.output.ty = producer_type;
        }
    }

    /// Store an inline constant on a port.
    ///
    /// # Panics
    ///
    /// Panics if the node or the port does not exist.
    pub fn set_constant(&mut self, node: NodeId, port: &str, value: Value) {
        let target = self
            .nodes
            .get_mut(&node)
            .and_then(|n| n.input_mut(port))
            .unwrap_or_else(|| panic!("node {node} has no input '{port}'"));
        target.constant = Some(value);
    }

    /// Remove a node and every wire leaving it.
    pub fn delete_node(&mut self, node: NodeId) -> Option<Node> {
        let removed = self.nodes.shift_remove(&node)?;
        for other in self.nodes.values_mut() {
            for port in &mut other.inputs {
                if port.source == Some(node) {
                    port.source = None;
                }
            }
        }
        if self.output == Some(node) {
            self.output = None;
        }
        Some(removed)
    }

    pub fn set_position(&mut self, node: NodeId, position: Position) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.position = position;
        }
    }

    // ── Output marker ─────────────────────────────────────────────────────

    /// Mark or unmark `node` as the graph output. Marking replaces any
    /// previous output.
    pub fn set_graph_output(&mut self, node: NodeId, is_output: bool) {
        if is_output {
            self.output = Some(node);
        } else if self.output == Some(node) {
            self.output = None;
        }
    }

    pub fn output(&self) -> Option<NodeId> {
        self.output
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes created since the last clear, including deleted ones.
    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn get_output_port(&self, node: NodeId) -> Option<&OutputPort> {
        self.nodes.get(&node).map(|n| &n.output)
    }

    /// # Panics
    ///
    /// Panics if the node does not exist.
    pub fn output_type(&self, node: NodeId) -> Type {
        self.get_output_port(node)
            .map(|p| p.ty)
            .unwrap_or_else(|| panic!("missing node {node}"))
    }

    /// Every wire, ordered by consumer creation order then port order.
    pub fn connections(&self) -> Vec<Connection> {
        self.nodes
            .values()
            .flat_map(|node| {
                node.inputs.iter().filter_map(move |port| {
                    port.source.map(|producer| Connection {
                        producer,
                        producer_port: OUTPUT_PORT.to_string(),
                        consumer: node.id,
                        consumer_port: port.name.clone(),
                    })
                })
            })
            .collect()
    }

    /// Number of wires leaving each node.
    pub fn outgoing_counts(&self) -> HashMap<NodeId, usize> {
        let mut counts: HashMap<NodeId, usize> =
            self.nodes.keys().map(|id| (*id, 0)).collect();
        for node in self.nodes.values() {
            for port in &node.inputs {
                if let Some(src) = port.source {
                    *counts.entry(src).or_default() += 1;
                }
            }
        }
        counts
    }

    /// Nodes with the given primitive short name, in creation order.
    pub fn nodes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        let id = function_id(name);
        self.nodes.values().filter(move |n| n.definition == id)
    }

    /// SHA-256 over the position-free structure: definitions, constants,
    /// wires (by creation index) and the output marker. Two graphs with the
    /// same fingerprint are isomorphic up to layout.
    pub fn fingerprint(&self) -> String {
        let index: HashMap<NodeId, usize> = self
            .nodes
            .keys()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let mut hasher = Sha256::new();
        for (i, node) in self.nodes.values().enumerate() {
            hasher.update(format!("node {i} {} {}\n", node.definition, node.output.ty));
            for port in &node.inputs {
                if let Some(src) = port.source {
                    hasher.update(format!("  {} <- {}\n", port.name, index[&src]));
                }
                if let Some(value) = &port.constant {
                    hasher.update(format!("  {} = {value}\n", port.name));
                }
            }
        }
        if let Some(out) = self.output {
            hasher.update(format!("output {}\n", index[&out]));
        }
        format!("{:x}", hasher.finalize())
    }
}

impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Graph", 3)?;
        state.serialize_field("nodes", &self.nodes.values().collect::<Vec<_>>())?;
        state.serialize_field("connections", &self.connections())?;
        state.serialize_field("output", &self.output)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_of_constants(graph: &mut Graph) -> (NodeId, NodeId, NodeId) {
        let add = graph.new_node(&function_id("add"));
        let a = graph.new_node(&function_id("const_int1"));
        graph.set_constant(a, "__constant__", Value::Int(vec![1]));
        let b = graph.new_node(&function_id("const_int1"));
        graph.set_constant(b, "__constant__", Value::Int(vec![2]));
        graph.connect(a, OUTPUT_PORT, add, "a");
        graph.connect(b, OUTPUT_PORT, add, "b");
        (add, a, b)
    }

    #[test]
    fn follows_input_output_tracks_connection() {
        let mut graph = Graph::new();
        let (add, _, _) = add_of_constants(&mut graph);
        assert_eq!(graph.output_type(add), Type::INT);
    }

    #[test]
    fn connect_replaces_previous_producer() {
        let mut graph = Graph::new();
        let (add, a, b) = add_of_constants(&mut graph);
        graph.connect(b, OUTPUT_PORT, add, "a");
        let node = graph.node(add).unwrap();
        assert_eq!(node.input("a").unwrap().source, Some(b));
        let counts = graph.outgoing_counts();
        assert_eq!(counts[&a], 0);
        assert_eq!(counts[&b], 2);
    }

    #[test]
    fn delete_node_cuts_wires_and_output() {
        let mut graph = Graph::new();
        let (add, a, _) = add_of_constants(&mut graph);
        graph.set_graph_output(a, true);
        graph.delete_node(a);
        assert_eq!(graph.output(), None);
        assert_eq!(graph.node(add).unwrap().input("a").unwrap().source, None);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.created_count(), 3);
    }

    #[test]
    fn unmarking_another_node_keeps_output() {
        let mut graph = Graph::new();
        let (add, a, _) = add_of_constants(&mut graph);
        graph.set_graph_output(add, true);
        graph.set_graph_output(a, false);
        assert_eq!(graph.output(), Some(add));
    }

    #[test]
    fn slots_wrap_into_next_column() {
        let grid = GridOptions {
            size: 10.0,
            max_nodes_in_row: 2,
            column_spacing: 1.0,
        };
        let mut graph = Graph::with_grid(grid);
        let ids: Vec<NodeId> = (0..3)
            .map(|_| graph.new_node(&function_id("const_float1")))
            .collect();
        let pos: Vec<Position> = ids
            .iter()
            .map(|id| graph.node(*id).unwrap().position)
            .collect();
        assert_eq!(pos[0], Position::new(0.0, 0.0));
        assert_eq!(pos[1], Position::new(0.0, 10.0));
        assert_eq!(pos[2], Position::new(10.0, 0.0));
    }

    #[test]
    fn clear_resets_ids_and_counter() {
        let mut graph = Graph::new();
        add_of_constants(&mut graph);
        graph.clear();
        assert!(graph.is_empty());
        assert_eq!(graph.created_count(), 0);
        assert_eq!(graph.new_node(&function_id("add")), NodeId(0));
    }

    #[test]
    fn fingerprint_ignores_positions() {
        let mut one = Graph::new();
        let (add, _, _) = add_of_constants(&mut one);
        one.set_graph_output(add, true);
        let mut two = one.clone();
        two.set_position(add, Position::new(500.0, 500.0));
        assert_eq!(one.fingerprint(), two.fingerprint());
        two.set_constant(add, "a", Value::Int(vec![7]));
        assert_ne!(one.fingerprint(), two.fingerprint());
    }

    #[test]
    fn connections_list_every_wire() {
        let mut graph = Graph::new();
        let (add, a, b) = add_of_constants(&mut graph);
        let wires = graph.connections();
        assert_eq!(wires.len(), 2);
        assert_eq!(wires[0].producer, a);
        assert_eq!(wires[1].producer, b);
        assert!(wires.iter().all(|w| w.consumer == add));
    }

    #[test]
    fn serializes_nodes_as_a_list() {
        let mut graph = Graph::new();
        let (add, _, _) = add_of_constants(&mut graph);
        graph.set_graph_output(add, true);
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(json["nodes"][0]["definition"], "sbs::function::add");
        assert_eq!(json["nodes"][0]["output"]["type"], "int");
        assert_eq!(json["nodes"][1]["inputs"][0]["constant"]["int"][0], 1);
        assert_eq!(json["output"], 0);
    }
}
