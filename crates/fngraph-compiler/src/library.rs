//! Registry of the primitive node definitions the compiler can instantiate.
//!
//! Every definition lists its input ports with the types each accepts and
//! the rule that decides its output type. A port that accepts more than one
//! type is *multi-typed*: the coercion pass resolves a common type across
//! all multi-typed ports of a node.

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::OnceLock;

use crate::ty::{BaseType, Type};

/// Namespace prefix shared by every primitive definition id.
pub const FUNCTION_NS: &str = "sbs::function::";

/// Input port that holds a node's inline constant (value, mask, name).
pub const CONSTANT_PORT: &str = "__constant__";

/// Full definition id for a primitive name, e.g. `add` → `sbs::function::add`.
pub fn function_id(name: &str) -> String {
    format!("{FUNCTION_NS}{name}")
}

/// An input port of a primitive definition.
#[derive(Debug, Clone, PartialEq)]
pub struct PortDef {
    pub name: String,
    pub accepts: Vec<Type>,
    /// `false` for ports that only hold an inline constant.
    pub connectable: bool,
}

/// How a node's output type is determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputRule {
    Fixed(Type),
    /// The output has the type of whatever is connected to this port.
    FollowsInput(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveDef {
    pub id: String,
    pub inputs: Vec<PortDef>,
    pub output: OutputRule,
}

impl PrimitiveDef {
    pub fn input(&self, name: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Output type of a fresh, unconnected node.
    pub fn initial_output_type(&self) -> Type {
        match &self.output {
            OutputRule::Fixed(ty) => *ty,
            OutputRule::FollowsInput(port) => self
                .input(port)
                .and_then(|p| p.accepts.first().copied())
                .unwrap_or(Type::FLOAT),
        }
    }
}

/// All primitive definitions, keyed by full definition id.
#[derive(Debug)]
pub struct PrimitiveLibrary {
    defs: IndexMap<String, PrimitiveDef>,
}

impl PrimitiveLibrary {
    /// The shared built-in library.
    pub fn builtin() -> &'static PrimitiveLibrary {
        static LIBRARY: OnceLock<PrimitiveLibrary> = OnceLock::new();
        LIBRARY.get_or_init(PrimitiveLibrary::new)
    }

    fn new() -> Self {
        let mut lib = Self {
            defs: IndexMap::new(),
        };
        lib.register_operators();
        lib.register_math();
        lib.register_constants();
        lib.register_vectors();
        lib.register_getters();
        lib.register_casts();
        lib.register_swizzles();
        lib.register_samplers();
        lib.register_control();
        lib
    }

    pub fn get(&self, id: &str) -> Option<&PrimitiveDef> {
        self.defs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.defs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrimitiveDef> {
        self.defs.values()
    }

    // ──────────────────────────────────────────────────────────────────────
    // Registration helpers
    // ──────────────────────────────────────────────────────────────────────

    fn add(&mut self, name: &str, inputs: Vec<PortDef>, output: OutputRule) {
        let id = function_id(name);
        self.defs.insert(
            id.clone(),
            PrimitiveDef {
                id,
                inputs,
                output,
            },
        );
    }

    fn port(name: &str, accepts: Vec<Type>) -> PortDef {
        PortDef {
            name: name.to_string(),
            accepts,
            connectable: true,
        }
    }

    fn constant(ty: Type) -> PortDef {
        PortDef {
            name: CONSTANT_PORT.to_string(),
            accepts: vec![ty],
            connectable: false,
        }
    }

    fn follows(port: &str) -> OutputRule {
        OutputRule::FollowsInput(port.to_string())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Definitions
    // ══════════════════════════════════════════════════════════════════════

    fn register_operators(&mut self) {
        for name in ["add", "sub", "mul", "div", "mod"] {
            self.add(
                name,
                vec![
                    Self::port("a", Type::numeric()),
                    Self::port("b", Type::numeric()),
                ],
                Self::follows("a"),
            );
        }
        self.add(
            "mulscalar",
            vec![
                Self::port("a", Type::floats()),
                Self::port("scalar", vec![Type::FLOAT]),
            ],
            Self::follows("a"),
        );
        let vectors = vec![Type::FLOAT2, Type::FLOAT3, Type::FLOAT4];
        self.add(
            "dot",
            vec![Self::port("a", vectors.clone()), Self::port("b", vectors)],
            OutputRule::Fixed(Type::FLOAT),
        );
        self.add(
            "neg",
            vec![Self::port("a", Type::numeric())],
            Self::follows("a"),
        );
        self.add(
            "not",
            vec![Self::port("a", vec![Type::BOOL])],
            OutputRule::Fixed(Type::BOOL),
        );
        for name in ["and", "or"] {
            self.add(
                name,
                vec![
                    Self::port("a", vec![Type::BOOL]),
                    Self::port("b", vec![Type::BOOL]),
                ],
                OutputRule::Fixed(Type::BOOL),
            );
        }
        for name in ["gt", "gteq", "lr", "lreq", "eq", "noteq"] {
            self.add(
                name,
                vec![
                    Self::port("a", vec![Type::FLOAT, Type::INT]),
                    Self::port("b", vec![Type::FLOAT, Type::INT]),
                ],
                OutputRule::Fixed(Type::BOOL),
            );
        }
    }

    fn register_math(&mut self) {
        self.add(
            "abs",
            vec![Self::port("a", Type::numeric())],
            Self::follows("a"),
        );
        for name in ["min", "max"] {
            self.add(
                name,
                vec![
                    Self::port("a", Type::numeric()),
                    Self::port("b", Type::numeric()),
                ],
                Self::follows("a"),
            );
        }
        for name in [
            "floor", "ceil", "cos", "sin", "tan", "sqrt", "log", "exp", "log2", "pow2",
        ] {
            self.add(name, vec![Self::port("a", Type::floats())], Self::follows("a"));
        }
        self.add(
            "rand",
            vec![Self::port("a", vec![Type::FLOAT])],
            OutputRule::Fixed(Type::FLOAT),
        );
        self.add(
            "atan2",
            vec![Self::port("a", vec![Type::FLOAT2])],
            OutputRule::Fixed(Type::FLOAT),
        );
        self.add(
            "cartesian",
            vec![
                Self::port("rho", vec![Type::FLOAT]),
                Self::port("theta", vec![Type::FLOAT]),
            ],
            OutputRule::Fixed(Type::FLOAT2),
        );
        self.add(
            "lerp",
            vec![
                Self::port("a", Type::floats()),
                Self::port("b", Type::floats()),
                Self::port("x", vec![Type::FLOAT]),
            ],
            Self::follows("a"),
        );
    }

    fn register_constants(&mut self) {
        for n in 1..=4 {
            self.add(
                &format!("const_float{n}"),
                vec![Self::constant(Type::float(n))],
                OutputRule::Fixed(Type::float(n)),
            );
            self.add(
                &format!("const_int{n}"),
                vec![Self::constant(Type::int(n))],
                OutputRule::Fixed(Type::int(n)),
            );
        }
        self.add(
            "const_bool",
            vec![Self::constant(Type::BOOL)],
            OutputRule::Fixed(Type::BOOL),
        );
        self.add(
            "const_string",
            vec![Self::constant(Type::STRING)],
            OutputRule::Fixed(Type::STRING),
        );
    }

    /// `vector2(float, float)`, `vector3(float2, float)`, `vector4(float2, float2)`
    /// and the `ivector` counterparts.
    fn register_vectors(&mut self) {
        for (prefix, base) in [("vector", BaseType::Float), ("ivector", BaseType::Int)] {
            let make = |n| Type::with(base, n);
            self.add(
                &format!("{prefix}2"),
                vec![
                    Self::port("componentsin", vec![make(1)]),
                    Self::port("componentslast", vec![make(1)]),
                ],
                OutputRule::Fixed(make(2)),
            );
            self.add(
                &format!("{prefix}3"),
                vec![
                    Self::port("componentsin", vec![make(2)]),
                    Self::port("componentslast", vec![make(1)]),
                ],
                OutputRule::Fixed(make(3)),
            );
            self.add(
                &format!("{prefix}4"),
                vec![
                    Self::port("componentsin", vec![make(2)]),
                    Self::port("componentslast", vec![make(2)]),
                ],
                OutputRule::Fixed(make(4)),
            );
        }
    }

    fn register_getters(&mut self) {
        for n in 1..=4 {
            self.add(
                &format!("get_float{n}"),
                vec![Self::constant(Type::STRING)],
                OutputRule::Fixed(Type::float(n)),
            );
            self.add(
                &format!("get_integer{n}"),
                vec![Self::constant(Type::STRING)],
                OutputRule::Fixed(Type::int(n)),
            );
        }
        self.add(
            "get_bool",
            vec![Self::constant(Type::STRING)],
            OutputRule::Fixed(Type::BOOL),
        );
        self.add(
            "get_string",
            vec![Self::constant(Type::STRING)],
            OutputRule::Fixed(Type::STRING),
        );
    }

    fn register_casts(&mut self) {
        for n in 1..=4 {
            let to_float = if n == 1 {
                "tofloat".to_string()
            } else {
                format!("tofloat{n}")
            };
            self.add(
                &to_float,
                vec![Self::port("value", vec![Type::int(n)])],
                OutputRule::Fixed(Type::float(n)),
            );
            self.add(
                &format!("toint{n}"),
                vec![Self::port("value", vec![Type::float(n)])],
                OutputRule::Fixed(Type::int(n)),
            );
        }
    }

    /// `swizzleN` reads a float vector, `iswizzleN` an int vector; the
    /// constant holds the component indices.
    fn register_swizzles(&mut self) {
        let float_vectors = vec![Type::FLOAT2, Type::FLOAT3, Type::FLOAT4];
        let int_vectors = vec![Type::INT2, Type::INT3, Type::INT4];
        for n in 1..=4 {
            self.add(
                &format!("swizzle{n}"),
                vec![
                    Self::port("vector", float_vectors.clone()),
                    Self::constant(Type::int(n)),
                ],
                OutputRule::Fixed(Type::float(n)),
            );
            self.add(
                &format!("iswizzle{n}"),
                vec![
                    Self::port("vector", int_vectors.clone()),
                    Self::constant(Type::int(n)),
                ],
                OutputRule::Fixed(Type::int(n)),
            );
        }
    }

    /// Samplers read an input image at `pos`; the constant holds the
    /// `(image index, filtering)` pair.
    fn register_samplers(&mut self) {
        for (name, output) in [("samplelum", Type::FLOAT), ("samplecol", Type::FLOAT4)] {
            self.add(
                name,
                vec![
                    Self::port("pos", vec![Type::FLOAT2]),
                    Self::constant(Type::INT2),
                ],
                OutputRule::Fixed(output),
            );
        }
    }

    fn register_control(&mut self) {
        self.add(
            "ifelse",
            vec![
                Self::port("condition", vec![Type::BOOL]),
                Self::port("ifpath", Type::any()),
                Self::port("elsepath", Type::any()),
            ],
            Self::follows("ifpath"),
        );
        self.add(
            "set",
            vec![
                Self::port("value", Type::any()),
                Self::constant(Type::STRING),
            ],
            Self::follows("value"),
        );
        self.add(
            "sequence",
            vec![
                Self::port("seqin", Type::any()),
                Self::port("seqlast", Type::any()),
            ],
            Self::follows("seqlast"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str) -> &'static PrimitiveDef {
        PrimitiveLibrary::builtin()
            .get(&function_id(name))
            .unwrap_or_else(|| panic!("missing {name}"))
    }

    #[test]
    fn ids_carry_the_namespace() {
        assert_eq!(def("add").id, "sbs::function::add");
        assert!(PrimitiveLibrary::builtin()
            .iter()
            .all(|d| d.id.starts_with(FUNCTION_NS)));
    }

    #[test]
    fn constants_are_not_connectable() {
        let port = def("const_float3").input(CONSTANT_PORT).unwrap();
        assert!(!port.connectable);
        assert_eq!(port.accepts, vec![Type::FLOAT3]);
    }

    #[test]
    fn vector_packers_take_pairs() {
        let v3 = def("vector3");
        assert_eq!(v3.input("componentsin").unwrap().accepts, vec![Type::FLOAT2]);
        assert_eq!(v3.input("componentslast").unwrap().accepts, vec![Type::FLOAT]);
        assert_eq!(def("ivector4").output, OutputRule::Fixed(Type::INT4));
    }

    #[test]
    fn follows_input_starts_from_first_accepted_type() {
        assert_eq!(def("add").initial_output_type(), Type::FLOAT);
        assert_eq!(def("sequence").initial_output_type(), Type::FLOAT);
        assert_eq!(def("samplecol").initial_output_type(), Type::FLOAT4);
    }

    #[test]
    fn casts_are_registered_both_ways() {
        assert_eq!(def("tofloat").output, OutputRule::Fixed(Type::FLOAT));
        assert_eq!(def("tofloat3").input("value").unwrap().accepts, vec![Type::INT3]);
        assert_eq!(def("toint1").output, OutputRule::Fixed(Type::INT));
    }

    #[test]
    fn builtin_is_shared() {
        let a = PrimitiveLibrary::builtin() as *const _;
        let b = PrimitiveLibrary::builtin() as *const _;
        assert_eq!(a, b);
        assert!(!PrimitiveLibrary::builtin().is_empty());
    }
}
