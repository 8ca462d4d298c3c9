//! Module orchestration: one graph per function definition plus an optional
//! main unit, and the source-text pipeline around it.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use fngraph_types::ast::{FunctionDef, Module};
use fngraph_types::{
    CompileError, CompileErrors, Diagnostic, ErrorCode, Result, SourceFile,
};

use crate::compiler::{compile_unit, CompilationUnit, DeclaredInput, Environment};
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::graph::Graph;
use crate::host::{ExternalFunction, Host, ImportTable, LayeredResolver, PortSpec};
use crate::options::CompileOptions;
use crate::ty::Type;

/// Inputs the runtime provides to every graph.
pub const SYSTEM_INPUTS: &[(&str, Type)] = &[
    ("$pos", Type::FLOAT2),
    ("$size", Type::FLOAT2),
    ("$sizelog2", Type::FLOAT2),
    ("$tiling", Type::INT),
    ("$time", Type::FLOAT),
    ("$depth", Type::FLOAT),
    ("$depthpow2", Type::FLOAT),
    ("$number", Type::FLOAT),
];

const KNOWN_DECORATORS: &[&str] = &[
    "pixel_processor",
    "value_processor",
    "node_property",
    "fxmap_property",
    "folder",
];

/// Functions with one of these decorators name their inputs `#<arg>`.
const PROCESSOR_DECORATORS: &[&str] = &["pixel_processor", "value_processor"];

const MAIN_UNIT: &str = "main";

// ══════════════════════════════════════════════════════════════════════════════
// Results
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CompiledFunction {
    pub name: String,
    pub decorators: Vec<String>,
    /// Argument inputs in declaration order. System inputs are not listed.
    pub inputs: Vec<DeclaredInput>,
    pub output: Type,
    pub graph: Graph,
}

impl CompiledFunction {
    /// How later units call this function: one port per argument input.
    pub fn signature(&self) -> ExternalFunction {
        ExternalFunction {
            name: self.name.clone(),
            definition: self.name.clone(),
            inputs: self
                .inputs
                .iter()
                .map(|input| PortSpec {
                    name: input.id.clone(),
                    accepts: vec![input.ty],
                })
                .collect(),
            output: self.output,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompiledModule {
    pub functions: IndexMap<String, CompiledFunction>,
    /// Graph of the top-level statements, if there are any.
    pub main: Option<Graph>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Fatal outcome of compiling source text.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("{} syntax error(s)", .0.total_errors)]
    Syntax(CompileErrors),
    #[error(transparent)]
    Compile(CompileError),
}

impl SourceError {
    /// Every error carried, in report order.
    pub fn errors(&self) -> Vec<&CompileError> {
        match self {
            SourceError::Syntax(errors) => errors.errors.iter().collect(),
            SourceError::Compile(error) => vec![error],
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Module Compilation
// ══════════════════════════════════════════════════════════════════════════════

/// Seeds for the runtime-provided inputs.
pub fn system_inputs() -> Vec<DeclaredInput> {
    SYSTEM_INPUTS
        .iter()
        .map(|(id, ty)| DeclaredInput::new(*id, *id, *ty))
        .collect()
}

/// Compile every function of `module` in source order, then the top-level
/// statements. Each function is callable from the units after it.
pub fn compile_module<H: Host>(
    module: &Module,
    host: &H,
    options: &CompileOptions,
) -> Result<CompiledModule> {
    let imports = ImportTable::from_module(module);
    let mut local: IndexMap<String, ExternalFunction> = IndexMap::new();
    let mut out = CompiledModule::default();

    for def in module.functions() {
        let function = {
            let resolver = LayeredResolver {
                local: &local,
                host,
            };
            let env = Environment {
                resolver: &resolver,
                catalog: host,
                imports: &imports,
            };
            compile_function(def, env, options, &mut out.diagnostics)?
        };
        local.insert(function.name.clone(), function.signature());
        out.functions.insert(function.name.clone(), function);
    }

    if module.has_top_level_code() {
        let resolver = LayeredResolver {
            local: &local,
            host,
        };
        let env = Environment {
            resolver: &resolver,
            catalog: host,
            imports: &imports,
        };
        let unit = CompilationUnit::new(MAIN_UNIT, &module.body).with_inputs(seed_inputs(options));
        let mut graph = Graph::with_grid(options.grid);
        compile_unit(&unit, &mut graph, env, options, &mut Reporter(&mut out.diagnostics))?;
        out.main = Some(graph);
    }

    info!(
        functions = out.functions.len(),
        main = out.main.is_some(),
        warnings = out.diagnostics.len(),
        "module compiled"
    );
    Ok(out)
}

fn seed_inputs(options: &CompileOptions) -> Vec<DeclaredInput> {
    if options.system_inputs {
        system_inputs()
    } else {
        Vec::new()
    }
}

fn compile_function(
    def: &FunctionDef,
    env: Environment<'_>,
    options: &CompileOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<CompiledFunction> {
    let name = def.name.name.clone();
    let decorators: Vec<String> = def.decorators.iter().map(|d| d.name.clone()).collect();
    for decorator in &def.decorators {
        if !KNOWN_DECORATORS.contains(&short_name(&decorator.name)) {
            Reporter(diagnostics).report(Diagnostic::warning(
                ErrorCode::UNKNOWN_DECORATOR,
                format!("Unknown decorator @{} on function [{name}]", decorator.name),
                Some(decorator.span),
            ));
        }
    }
    let processor = decorators
        .iter()
        .any(|d| PROCESSOR_DECORATORS.contains(&short_name(d)));

    let mut arguments = Vec::with_capacity(def.args.len());
    for arg in &def.args {
        let Some(annotation) = &arg.annotation else {
            return Err(CompileError::at(
                ErrorCode::MISSING_ANNOTATION,
                format!(
                    "Argument [{}] of function [{name}] needs a type annotation",
                    arg.name.name
                ),
                arg.span,
            ));
        };
        let ty = parse_annotation(&annotation.name, annotation.span)?;
        let id = if processor {
            format!("#{}", arg.name.name)
        } else {
            format!("__{name}_arg_{}", arg.name.name)
        };
        arguments.push(DeclaredInput::new(id, arg.name.name.clone(), ty));
    }
    if let Some(returns) = &def.returns {
        parse_annotation(&returns.name, returns.span)?;
    }

    let mut inputs = seed_inputs(options);
    inputs.extend(arguments.iter().cloned());
    let unit = CompilationUnit::new(name.clone(), &def.body).with_inputs(inputs);
    let mut graph = Graph::with_grid(options.grid);
    compile_unit(&unit, &mut graph, env, options, &mut Reporter(diagnostics))?;

    let output = graph
        .output()
        .map(|node| graph.output_type(node))
        .unwrap_or(Type::FLOAT);
    Ok(CompiledFunction {
        name,
        decorators,
        inputs: arguments,
        output,
        graph,
    })
}

fn parse_annotation(name: &str, span: fngraph_types::Span) -> Result<Type> {
    Type::parse(name).ok_or_else(|| {
        CompileError::at(ErrorCode::UNKNOWN_TYPE, format!("Unknown type [{name}]"), span)
    })
}

/// `fx.pixel_processor` → `pixel_processor`.
fn short_name(dotted: &str) -> &str {
    dotted.rsplit('.').next().unwrap_or(dotted)
}

/// Keeps diagnostics for the caller and logs them as they arrive.
struct Reporter<'a>(&'a mut Vec<Diagnostic>);

impl DiagnosticsSink for Reporter<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        TracingSink.report(diagnostic.clone());
        self.0.push(diagnostic);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Source Pipeline
// ══════════════════════════════════════════════════════════════════════════════

/// Lex and parse `source`; every syntax error is returned together.
pub fn parse_source(source: &SourceFile) -> std::result::Result<Module, SourceError> {
    let parsed = fngraph_parser::parse(source);
    match parsed.module {
        Some(module) if !parsed.errors.has_errors() => Ok(module),
        _ => Err(SourceError::Syntax(parsed.errors)),
    }
}

/// Parse and compile source text in one step. Compile errors carry the
/// offending source line.
pub fn compile_source<H: Host>(
    name: &str,
    text: &str,
    host: &H,
    options: &CompileOptions,
) -> std::result::Result<CompiledModule, SourceError> {
    let source = SourceFile::new(name, text);
    let module = parse_source(&source)?;
    compile_module(&module, host, options).map_err(|err| {
        let line = err
            .span
            .and_then(|span| source.line(span.start_line))
            .map(str::to_string);
        SourceError::Compile(match line {
            Some(line) => err.with_source_line(line),
            None => err,
        })
    })
}
