//! fngraph compiler: lowers a parsed module into typed function node graphs.
//!
//! ```text
//! Source → Lexer → Parser → Statement Compiler ⇄ Expression Compiler → Coercion → Prune → Layout → Graph
//! ```
//!
//! # Architecture
//!
//! Every expression compiles to the node producing its value. A node is
//! built, its inputs are wired, and then [`coerce::coerce_inputs`] patches
//! conversion chains into any wire whose producer type differs from what the
//! port accepts. Once the statements are done the driver in [`compiler`]
//! checks for an output, chains `export`/`setvar` side effects in front of
//! it, deletes dead nodes and optionally reflows positions.
//!
//! ## Types
//!
//! `float`, `int` (1–4 components), `bool` and `string`. Numeric types
//! convert implicitly: a base cast first, then broadcast, truncation or
//! extraction. Bool and string never convert.

pub mod builtins;
pub mod cast;
pub mod coerce;
pub mod compiler;
pub mod diagnostics;
pub mod expr;
pub mod graph;
pub mod host;
pub mod layout;
pub mod library;
pub mod module;
pub mod options;
pub mod stmt;
pub mod ty;

pub use builtins::{reserved_names, OUTPUT_VARIABLE};
pub use compiler::{compile_unit, CompilationUnit, DeclaredInput, Environment};
pub use diagnostics::{DiagnosticsSink, TracingSink};
pub use graph::{Graph, Node, NodeId, Value};
pub use host::{
    ExternalFunction, FunctionResolver, GraphCatalog, GraphInput, Host, ImportTable, NoHost,
    PortSpec, StaticHost,
};
pub use module::{
    compile_module, compile_source, parse_source, system_inputs, CompiledFunction,
    CompiledModule, SourceError,
};
pub use options::{CompileOptions, GridOptions};
pub use ty::{BaseType, Type};
