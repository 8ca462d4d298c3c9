//! Callee names and operators mapped onto primitive definitions.

use fngraph_types::ast::{BinOp, BoolOp, CmpOp, UnaryOp};

use crate::library::function_id;
use crate::ty::{BaseType, Type};

/// Name that marks the graph output when assigned.
pub const OUTPUT_VARIABLE: &str = "_OUT_";

/// A built-in callee, resolved from its name in one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `float2(1, 2)`: a constant node of this type.
    Constant(Type),
    /// `vector3(xy, z)`: a packing node with this output type.
    Vector(Type),
    /// `get_float2('name')`: reads a named variable of this type.
    Getter(Type),
    /// `samplelum(pos, image, filter)`
    Sampler(&'static str),
    /// A math primitive with its ports in argument order.
    Function {
        name: &'static str,
        ports: &'static [&'static str],
    },
    /// `tofloat3(v)`: explicit cast to this type.
    Cast(Type),
}

const FUNCTIONS: &[(&str, &[&str])] = &[
    ("abs", &["a"]),
    ("floor", &["a"]),
    ("ceil", &["a"]),
    ("cos", &["a"]),
    ("sin", &["a"]),
    ("tan", &["a"]),
    ("atan2", &["a"]),
    ("cartesian", &["rho", "theta"]),
    ("sqrt", &["a"]),
    ("log", &["a"]),
    ("exp", &["a"]),
    ("log2", &["a"]),
    ("pow2", &["a"]),
    ("lerp", &["a", "b", "x"]),
    ("min", &["a", "b"]),
    ("max", &["a", "b"]),
    ("rand", &["a"]),
    ("dot", &["a", "b"]),
];

const CONSTANTS: &[&str] = &[
    "float", "float2", "float3", "float4", "int", "int2", "int3", "int4",
];
const VECTORS: &[&str] = &[
    "vector2", "vector3", "vector4", "ivector2", "ivector3", "ivector4",
];
const GETTERS: &[&str] = &[
    "get_float", "get_float2", "get_float3", "get_float4", "get_int", "get_int2", "get_int3",
    "get_int4", "get_bool", "get_string",
];
const CASTS: &[&str] = &[
    "tofloat", "tofloat2", "tofloat3", "tofloat4", "toint", "toint2", "toint3", "toint4",
];
const SAMPLERS: &[&str] = &["samplelum", "samplecol"];

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        if CONSTANTS.contains(&name) {
            return Type::parse(name).map(Builtin::Constant);
        }
        if let Some(i) = VECTORS.iter().position(|v| *v == name) {
            let base = if i < 3 { BaseType::Float } else { BaseType::Int };
            return Some(Builtin::Vector(Type::with(base, i % 3 + 2)));
        }
        if GETTERS.contains(&name) {
            return name.strip_prefix("get_").and_then(Type::parse).map(Builtin::Getter);
        }
        if let Some(sampler) = SAMPLERS.iter().find(|s| **s == name) {
            return Some(Builtin::Sampler(*sampler));
        }
        if let Some(&(name, ports)) = FUNCTIONS.iter().find(|(n, _)| *n == name) {
            return Some(Builtin::Function { name, ports });
        }
        if CASTS.contains(&name) {
            let target = name.strip_prefix("to").and_then(Type::parse)?;
            return Some(Builtin::Cast(target));
        }
        None
    }

    /// Every built-in callee name.
    pub fn names() -> impl Iterator<Item = &'static str> {
        CONSTANTS
            .iter()
            .chain(VECTORS)
            .chain(GETTERS)
            .chain(SAMPLERS)
            .chain(FUNCTIONS.iter().map(|(n, _)| n))
            .chain(CASTS)
            .copied()
    }
}

/// Statement-like calls with their own compile rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    /// `export(var)`: publish a variable through a queued `set` node.
    Export,
    /// `declare_inputs('graph')`: bind the inputs of a sibling graph.
    DeclareInputs,
    /// `setvar('name', value)`
    SetVar,
    /// `sequence(first, last)`
    Sequence,
}

impl SpecialForm {
    pub fn lookup(name: &str) -> Option<SpecialForm> {
        match name {
            "export" => Some(SpecialForm::Export),
            "declare_inputs" => Some(SpecialForm::DeclareInputs),
            "setvar" => Some(SpecialForm::SetVar),
            "sequence" => Some(SpecialForm::Sequence),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Export => "export",
            SpecialForm::DeclareInputs => "declare_inputs",
            SpecialForm::SetVar => "setvar",
            SpecialForm::Sequence => "sequence",
        }
    }
}

/// Names a user program cannot rebind meaningfully: built-in callees,
/// special forms, the output variable and the bool literals.
pub fn reserved_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Builtin::names().collect();
    names.extend([
        OUTPUT_VARIABLE,
        "export",
        "setvar",
        "sequence",
        "declare_inputs",
        "True",
        "False",
    ]);
    names
}

// ══════════════════════════════════════════════════════════════════════════════
// Definition Ids
// ══════════════════════════════════════════════════════════════════════════════

/// `const_float2`, `const_int1`, `const_bool`, `const_string`.
pub fn constant_id(ty: Type) -> String {
    match ty.base() {
        BaseType::Float => function_id(&format!("const_float{}", ty.components())),
        BaseType::Int => function_id(&format!("const_int{}", ty.components())),
        BaseType::Bool => function_id("const_bool"),
        BaseType::String => function_id("const_string"),
    }
}

/// `get_float2`, `get_integer1`, `get_bool`, `get_string`.
pub fn getter_id(ty: Type) -> String {
    match ty.base() {
        BaseType::Float => function_id(&format!("get_float{}", ty.components())),
        BaseType::Int => function_id(&format!("get_integer{}", ty.components())),
        BaseType::Bool => function_id("get_bool"),
        BaseType::String => function_id("get_string"),
    }
}

/// The cast primitive producing `to` from the other numeric base.
pub fn cast_id(to: Type) -> String {
    match (to.base(), to.components()) {
        (BaseType::Float, 1) => function_id("tofloat"),
        (BaseType::Float, n) => function_id(&format!("tofloat{n}")),
        (_, n) => function_id(&format!("toint{n}")),
    }
}

/// The packing primitive producing `ty` (`vector3`, `ivector2`, ...).
pub fn vector_id(ty: Type) -> String {
    let prefix = match ty.base() {
        BaseType::Int => "ivector",
        _ => "vector",
    };
    function_id(&format!("{prefix}{}", ty.components()))
}

/// The swizzle primitive reading a `base` vector into `components` values.
pub fn swizzle_id(base: BaseType, components: usize) -> String {
    let prefix = match base {
        BaseType::Int => "iswizzle",
        _ => "swizzle",
    };
    function_id(&format!("{prefix}{components}"))
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

/// Definition and right-hand port of a binary operator.
pub fn binary_operator(op: BinOp) -> (String, &'static str) {
    let (name, right) = match op {
        BinOp::Add => ("add", "b"),
        BinOp::Sub => ("sub", "b"),
        BinOp::Mul => ("mul", "b"),
        BinOp::Div => ("div", "b"),
        BinOp::Mod => ("mod", "b"),
        BinOp::MatMul => ("mulscalar", "scalar"),
        BinOp::BitXor => ("dot", "b"),
    };
    (function_id(name), right)
}

pub fn unary_operator(op: UnaryOp) -> String {
    match op {
        UnaryOp::Neg => function_id("neg"),
        UnaryOp::Not => function_id("not"),
    }
}

pub fn bool_operator(op: BoolOp) -> String {
    match op {
        BoolOp::And => function_id("and"),
        BoolOp::Or => function_id("or"),
    }
}

pub fn compare_operator(op: CmpOp) -> String {
    let name = match op {
        CmpOp::Gt => "gt",
        CmpOp::GtE => "gteq",
        CmpOp::Lt => "lr",
        CmpOp::LtE => "lreq",
        CmpOp::Eq => "eq",
        CmpOp::NotEq => "noteq",
    };
    function_id(name)
}
