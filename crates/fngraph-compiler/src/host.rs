//! Interfaces to the host application: imported functions, sibling graphs
//! and the import table that maps source names onto qualified names.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use fngraph_types::ast::{ImportNames, Module, Stmt};

use crate::ty::Type;

// ══════════════════════════════════════════════════════════════════════════════
// Host Data
// ══════════════════════════════════════════════════════════════════════════════

/// An input port of an imported function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    /// More than one entry makes the port multi-typed.
    pub accepts: Vec<Type>,
}

/// A function graph the compiler can instantiate as a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalFunction {
    /// Qualified name, e.g. `lib.noise.perlin`.
    pub name: String,
    /// Definition id the host uses to instantiate the graph.
    pub definition: String,
    pub inputs: Vec<PortSpec>,
    pub output: Type,
}

/// An input property of a sibling graph, used by `declare_inputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInput {
    pub id: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

// ══════════════════════════════════════════════════════════════════════════════
// Traits
// ══════════════════════════════════════════════════════════════════════════════

pub trait FunctionResolver {
    fn resolve(&self, qualified_name: &str) -> Option<ExternalFunction>;
}

pub trait GraphCatalog {
    /// Input properties of the graph `graph_id`, or `None` if there is no
    /// such graph.
    fn graph_inputs(&self, graph_id: &str) -> Option<Vec<GraphInput>>;
}

/// Everything the compiler needs from its host.
pub trait Host: FunctionResolver + GraphCatalog {}

impl<T: FunctionResolver + GraphCatalog> Host for T {}

/// A host that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

impl FunctionResolver for NoHost {
    fn resolve(&self, _qualified_name: &str) -> Option<ExternalFunction> {
        None
    }
}

impl GraphCatalog for NoHost {
    fn graph_inputs(&self, _graph_id: &str) -> Option<Vec<GraphInput>> {
        None
    }
}

/// In-memory host, loadable from a JSON library file:
///
/// ```json
/// {
///   "functions": {
///     "lib.blend": {
///       "name": "lib.blend",
///       "definition": "pkg://lib/blend",
///       "inputs": [{"name": "a", "accepts": ["float4"]}],
///       "output": "float4"
///     }
///   },
///   "graphs": {"params": [{"id": "scale", "type": "float"}]}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticHost {
    pub functions: IndexMap<String, ExternalFunction>,
    pub graphs: IndexMap<String, Vec<GraphInput>>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_function(mut self, function: ExternalFunction) -> Self {
        self.add_function(function);
        self
    }

    pub fn with_graph(mut self, graph_id: impl Into<String>, inputs: Vec<GraphInput>) -> Self {
        self.graphs.insert(graph_id.into(), inputs);
        self
    }

    pub fn add_function(&mut self, function: ExternalFunction) {
        self.functions.insert(function.name.clone(), function);
    }
}

impl FunctionResolver for StaticHost {
    fn resolve(&self, qualified_name: &str) -> Option<ExternalFunction> {
        self.functions.get(qualified_name).cloned()
    }
}

impl GraphCatalog for StaticHost {
    fn graph_inputs(&self, graph_id: &str) -> Option<Vec<GraphInput>> {
        self.graphs.get(graph_id).cloned()
    }
}

/// Functions compiled earlier in the same module, consulted before the host.
pub(crate) struct LayeredResolver<'a> {
    pub local: &'a IndexMap<String, ExternalFunction>,
    pub host: &'a dyn FunctionResolver,
}

impl FunctionResolver for LayeredResolver<'_> {
    fn resolve(&self, qualified_name: &str) -> Option<ExternalFunction> {
        self.local
            .get(qualified_name)
            .cloned()
            .or_else(|| self.host.resolve(qualified_name))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Import Table
// ══════════════════════════════════════════════════════════════════════════════

/// Name mapping built from a module's `import` and `from ... import`
/// statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportTable {
    /// Local prefix → package path (`import pkg as p`, `import pkg`).
    modules: IndexMap<String, String>,
    /// Local name → qualified name (`from pkg import f as g`).
    names: IndexMap<String, String>,
    /// Packages imported with `from pkg import *`.
    globs: Vec<String>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_module(module: &Module) -> Self {
        let mut table = Self::new();
        for stmt in &module.body {
            match stmt {
                Stmt::Import(import) => {
                    for alias in &import.names {
                        table.add_module(&alias.name, alias.alias.as_ref().map(|a| a.name.as_str()));
                    }
                }
                Stmt::ImportFrom(from) => match &from.names {
                    ImportNames::Glob => table.add_glob(&from.module),
                    ImportNames::List(list) => {
                        for alias in list {
                            table.add_name(
                                &from.module,
                                &alias.name,
                                alias.alias.as_ref().map(|a| a.name.as_str()),
                            );
                        }
                    }
                },
                _ => {}
            }
        }
        table
    }

    pub fn add_module(&mut self, path: &str, alias: Option<&str>) {
        let local = alias.unwrap_or(path);
        self.modules.insert(local.to_string(), path.to_string());
    }

    pub fn add_name(&mut self, package: &str, name: &str, alias: Option<&str>) {
        let local = alias.unwrap_or(name);
        self.names
            .insert(local.to_string(), format!("{package}.{name}"));
    }

    pub fn add_glob(&mut self, package: &str) {
        if !self.globs.iter().any(|g| g == package) {
            self.globs.push(package.to_string());
        }
    }

    /// Qualified names to try for a callee, in resolution order: explicitly
    /// imported names, module aliases, the name itself, then glob imports.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |candidate: String| {
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        };
        if let Some(qualified) = self.names.get(name) {
            push(qualified.clone());
        }
        for (local, path) in &self.modules {
            if let Some(rest) = name
                .strip_prefix(local.as_str())
                .and_then(|r| r.strip_prefix('.'))
            {
                push(format!("{path}.{rest}"));
            }
        }
        push(name.to_string());
        if !name.contains('.') {
            for package in &self.globs {
                push(format!("{package}.{name}"));
            }
        }
        out
    }

    /// Resolve a callee through the table.
    pub fn resolve(&self, name: &str, resolver: &dyn FunctionResolver) -> Option<ExternalFunction> {
        self.candidates(name)
            .iter()
            .find_map(|candidate| resolver.resolve(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str) -> ExternalFunction {
        ExternalFunction {
            name: name.to_string(),
            definition: format!("pkg://{name}"),
            inputs: vec![PortSpec {
                name: "a".into(),
                accepts: vec![Type::FLOAT],
            }],
            output: Type::FLOAT,
        }
    }

    #[test]
    fn candidates_follow_resolution_order() {
        let mut table = ImportTable::new();
        table.add_module("lib.noise", Some("n"));
        table.add_name("lib.math", "lerp3", Some("l3"));
        table.add_glob("lib.util");
        assert_eq!(table.candidates("l3"), vec!["lib.math.lerp3", "l3", "lib.util.l3"]);
        assert_eq!(table.candidates("n.perlin"), vec!["lib.noise.perlin", "n.perlin"]);
        assert_eq!(table.candidates("clamp"), vec!["clamp", "lib.util.clamp"]);
    }

    #[test]
    fn plain_import_keeps_the_path() {
        let mut table = ImportTable::new();
        table.add_module("lib", None);
        assert_eq!(table.candidates("lib.f"), vec!["lib.f"]);
    }

    #[test]
    fn resolve_uses_first_hit() {
        let host = StaticHost::new()
            .with_function(function("lib.util.clamp"))
            .with_function(function("clamp"));
        let mut table = ImportTable::new();
        table.add_glob("lib.util");
        let found = table.resolve("clamp", &host).unwrap();
        assert_eq!(found.name, "clamp");
        assert!(table.resolve("missing", &host).is_none());
    }

    #[test]
    fn layered_resolver_prefers_local() {
        let host = StaticHost::new().with_function(function("shade"));
        let mut local = IndexMap::new();
        let mut mine = function("shade");
        mine.definition = "local".into();
        local.insert("shade".to_string(), mine);
        let layered = LayeredResolver {
            local: &local,
            host: &host,
        };
        assert_eq!(layered.resolve("shade").unwrap().definition, "local");
    }

    #[test]
    fn static_host_from_json() {
        let host = StaticHost::from_json(
            r#"{
                "functions": {"lib.f": {"name": "lib.f", "definition": "d",
                    "inputs": [{"name": "x", "accepts": ["float", "float2"]}],
                    "output": "float2"}},
                "graphs": {"params": [{"id": "scale", "type": "float"}]}
            }"#,
        )
        .unwrap();
        let f = host.resolve("lib.f").unwrap();
        assert_eq!(f.inputs[0].accepts, vec![Type::FLOAT, Type::FLOAT2]);
        assert_eq!(host.graph_inputs("params").unwrap()[0].ty, Type::FLOAT);
        assert!(NoHost.graph_inputs("params").is_none());
    }
}
