//! Whole-pipeline properties: determinism, clear-then-rebuild, and the
//! structural invariants every successfully compiled graph must satisfy.

use fngraph_compiler::graph::Graph;
use fngraph_compiler::{
    compile_source, compile_unit, parse_source, CompilationUnit, CompileOptions, Environment,
    ImportTable, NoHost,
};
use fngraph_types::{Diagnostic, SourceFile};

/// Programs that exercise casts, broadcasts, swizzles, literals and side
/// effects together.
const PROGRAMS: &[&str] = &[
    "x: float = 1\n_OUT_ = x + 2.0\n",
    "v = float3(1, 2, 3)\nw = v * 2\n_OUT_ = w.zyx + {1, 2, 3}\n",
    "p = $pos\nd = p ^ {0.5, 0.5}\n_OUT_ = lerp({0, 0, 0, 1}, float4(1, 1, 1, 1), d)\n",
    "a = int2(1, 2)\nb = {a, 3.5}\n_OUT_ = b if $time > 1 else {0.0, 0.0, 0.0}\n",
    "n = 3\nn += 1\nexport(n)\nsetvar('m', n * 2.5)\n_OUT_ = toint(2.5) + n\n",
    "c = samplecol($pos, 0, 1)\nl = samplelum($pos * 0.5, 1, 0)\n_OUT_ = c * l + 1\n",
    "t = $tiling\nu = {t, t}\n_OUT_ = u.ab + int2(1, 2)\n",
    "v = float4(1, 2, 3, 4)\nu = float2(5, 6)\n_OUT_ = v + u\n",
    "v = float3(1, 2, 3)\n_OUT_ = v < 2\n",
];

fn compile_main(source: &str, options: &CompileOptions) -> Graph {
    compile_source("test.fx", source, &NoHost, options)
        .unwrap_or_else(|e| panic!("{source}\n{:?}", e.errors()))
        .main
        .expect("no main graph")
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn compiling_twice_is_isomorphic() {
    let options = CompileOptions::default();
    for source in PROGRAMS {
        let first = compile_main(source, &options);
        for _ in 0..10 {
            let again = compile_main(source, &options);
            assert_eq!(first.fingerprint(), again.fingerprint(), "{source}");
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&again).unwrap(),
                "{source}"
            );
        }
    }
}

#[test]
fn rebuilding_into_a_used_graph_matches_a_fresh_one() {
    let options = CompileOptions::default();
    let imports = ImportTable::new();
    let env = Environment {
        resolver: &NoHost,
        catalog: &NoHost,
        imports: &imports,
    };
    let compile_into = |graph: &mut Graph, text: &str| {
        let source = SourceFile::new("test.fx", text);
        let module = parse_source(&source).unwrap();
        let unit = CompilationUnit::new("main", &module.body);
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        compile_unit(&unit, graph, env, &options, &mut diagnostics).unwrap();
    };

    let mut fresh = Graph::new();
    compile_into(&mut fresh, PROGRAMS[1]);

    let mut reused = Graph::new();
    compile_into(&mut reused, PROGRAMS[4]);
    compile_into(&mut reused, PROGRAMS[1]);

    assert_eq!(fresh.fingerprint(), reused.fingerprint());
    assert_eq!(fresh.len(), reused.len());
}

// ══════════════════════════════════════════════════════════════════════════════
// Invariants
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn every_wire_is_type_matched() {
    let options = CompileOptions::default();
    for source in PROGRAMS {
        let graph = compile_main(source, &options);
        for node in graph.nodes() {
            for (port, producer) in node.connected_inputs() {
                let ty = graph.output_type(producer);
                assert!(
                    port.accepts.contains(&ty),
                    "{source}: {} port '{}' fed {ty}",
                    node.short_name(),
                    port.name
                );
            }
        }
    }
}

#[test]
fn every_node_reaches_the_output() {
    let options = CompileOptions::default();
    for source in PROGRAMS {
        let graph = compile_main(source, &options);
        let output = graph.output().expect("no output");
        let counts = graph.outgoing_counts();
        for id in graph.node_ids() {
            if id != output {
                assert!(counts[&id] > 0, "{source}: node {id} is dead");
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Layout and Serialization
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn layout_places_output_rightmost() {
    let graph = compile_main("_OUT_ = 1.0 + 2.0\n", &CompileOptions::default());
    let output = graph.node(graph.output().unwrap()).unwrap();
    assert!(graph
        .nodes()
        .filter(|n| n.id != output.id)
        .all(|n| n.position.x < output.position.x));
}

#[test]
fn layout_is_skipped_for_large_units() {
    let options = CompileOptions {
        layout_max_nodes: 0,
        ..CompileOptions::default()
    };
    let graph = compile_main("_OUT_ = 1.0 + 2.0\n", &options);
    let laid_out = compile_main("_OUT_ = 1.0 + 2.0\n", &CompileOptions::default());
    assert_eq!(graph.fingerprint(), laid_out.fingerprint());
    assert_ne!(
        serde_json::to_string(&graph).unwrap(),
        serde_json::to_string(&laid_out).unwrap()
    );
}

#[test]
fn module_serializes_to_json() {
    let module = compile_source(
        "test.fx",
        "def half(x: float):\n    return x * 0.5\n_OUT_ = half(2.0)\n",
        &NoHost,
        &CompileOptions::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&module).unwrap();
    assert!(json["functions"]["half"]["graph"]["nodes"].is_array());
    assert_eq!(json["functions"]["half"]["output"], "float");
    assert_eq!(
        json["functions"]["half"]["inputs"][0]["id"],
        "__half_arg_x"
    );
    assert!(json["main"]["connections"].is_array());
    assert!(json["diagnostics"].as_array().unwrap().is_empty());
}
