//! Value types carried by node ports.
//!
//! A [`Type`] is a base (`float`, `int`, `bool`, `string`) plus a component
//! count in `1..=4`. Only numeric bases have vector forms.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Float,
    Int,
    Bool,
    String,
}

impl BaseType {
    pub fn is_numeric(self) -> bool {
        matches!(self, BaseType::Float | BaseType::Int)
    }

    /// Collapse to the numeric family used by cast planning: anything that
    /// is not `int` counts as `float`.
    pub fn numeric_family(self) -> BaseType {
        match self {
            BaseType::Int => BaseType::Int,
            _ => BaseType::Float,
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Float => write!(f, "float"),
            BaseType::Int => write!(f, "int"),
            BaseType::Bool => write!(f, "bool"),
            BaseType::String => write!(f, "string"),
        }
    }
}

/// A port type such as `float3` or `int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Type {
    base: BaseType,
    components: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown type '{0}'")]
pub struct TypeParseError(pub String);

impl Type {
    pub const FLOAT: Type = Type::raw(BaseType::Float, 1);
    pub const FLOAT2: Type = Type::raw(BaseType::Float, 2);
    pub const FLOAT3: Type = Type::raw(BaseType::Float, 3);
    pub const FLOAT4: Type = Type::raw(BaseType::Float, 4);
    pub const INT: Type = Type::raw(BaseType::Int, 1);
    pub const INT2: Type = Type::raw(BaseType::Int, 2);
    pub const INT3: Type = Type::raw(BaseType::Int, 3);
    pub const INT4: Type = Type::raw(BaseType::Int, 4);
    pub const BOOL: Type = Type::raw(BaseType::Bool, 1);
    pub const STRING: Type = Type::raw(BaseType::String, 1);

    const fn raw(base: BaseType, components: u8) -> Type {
        Type { base, components }
    }

    /// Checked constructor: `None` for widths outside `1..=4` and for
    /// vector forms of `bool`/`string`.
    pub fn new(base: BaseType, components: usize) -> Option<Type> {
        let valid = match base {
            BaseType::Float | BaseType::Int => (1..=4).contains(&components),
            BaseType::Bool | BaseType::String => components == 1,
        };
        valid.then(|| Type::raw(base, components as u8))
    }

    /// Build a type from base and width.
    ///
    /// # Panics
    ///
    /// Panics when the combination does not exist. Callers only pass widths
    /// they derived from existing types.
    pub fn with(base: BaseType, components: usize) -> Type {
        Type::new(base, components)
            .unwrap_or_else(|| panic!("no {base} type with {components} components"))
    }

    pub fn float(components: usize) -> Type {
        Type::with(BaseType::Float, components)
    }

    pub fn int(components: usize) -> Type {
        Type::with(BaseType::Int, components)
    }

    pub fn base(self) -> BaseType {
        self.base
    }

    pub fn components(self) -> usize {
        self.components as usize
    }

    pub fn is_numeric(self) -> bool {
        self.base.is_numeric()
    }

    pub fn is_scalar(self) -> bool {
        self.components == 1
    }

    /// The same width in another base.
    pub fn rebase(self, base: BaseType) -> Type {
        Type::with(base, self.components())
    }

    /// All eight numeric types, floats first.
    pub fn numeric() -> Vec<Type> {
        let mut all = Type::floats();
        all.extend(Type::ints());
        all
    }

    pub fn floats() -> Vec<Type> {
        (1..=4).map(Type::float).collect()
    }

    pub fn ints() -> Vec<Type> {
        (1..=4).map(Type::int).collect()
    }

    /// Every type a port can carry.
    pub fn any() -> Vec<Type> {
        let mut all = Type::numeric();
        all.push(Type::BOOL);
        all.push(Type::STRING);
        all
    }

    /// Parse a type name as written in annotations: `float`, `float2`, ...,
    /// `int4`, `bool`, `string`. `float1` and `int1` are accepted too.
    pub fn parse(name: &str) -> Option<Type> {
        match name {
            "bool" => return Some(Type::BOOL),
            "string" => return Some(Type::STRING),
            _ => {}
        }
        let (base, rest) = if let Some(rest) = name.strip_prefix("float") {
            (BaseType::Float, rest)
        } else if let Some(rest) = name.strip_prefix("int") {
            (BaseType::Int, rest)
        } else {
            return None;
        };
        let components = match rest {
            "" | "1" => 1,
            "2" => 2,
            "3" => 3,
            "4" => 4,
            _ => return None,
        };
        Type::new(base, components)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components == 1 {
            write!(f, "{}", self.base)
        } else {
            write!(f, "{}{}", self.base, self.components)
        }
    }
}

impl TryFrom<String> for Type {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Type::parse(&value).ok_or(TypeParseError(value))
    }
}

impl From<Type> for String {
    fn from(ty: Type) -> String {
        ty.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for ty in Type::any() {
            assert_eq!(Type::parse(&ty.to_string()), Some(ty));
        }
        assert_eq!(Type::parse("float1"), Some(Type::FLOAT));
        assert_eq!(Type::parse("int1"), Some(Type::INT));
    }

    #[test]
    fn invalid_names() {
        for name in ["float5", "int0", "bool2", "vec3", "", "Float"] {
            assert_eq!(Type::parse(name), None, "{name}");
        }
    }

    #[test]
    fn bool_and_string_are_scalar_only() {
        assert_eq!(Type::new(BaseType::Bool, 2), None);
        assert_eq!(Type::new(BaseType::String, 3), None);
        assert_eq!(Type::new(BaseType::Float, 0), None);
        assert_eq!(Type::new(BaseType::Int, 5), None);
    }

    #[test]
    #[should_panic(expected = "no float type with 5 components")]
    fn with_rejects_bad_width() {
        Type::with(BaseType::Float, 5);
    }

    #[test]
    fn numeric_family_treats_bool_as_float() {
        assert_eq!(BaseType::Bool.numeric_family(), BaseType::Float);
        assert_eq!(BaseType::Int.numeric_family(), BaseType::Int);
    }

    #[test]
    fn serde_uses_type_names() {
        let json = serde_json::to_string(&Type::INT3).unwrap();
        assert_eq!(json, "\"int3\"");
        let back: Type = serde_json::from_str("\"float2\"").unwrap();
        assert_eq!(back, Type::FLOAT2);
        assert!(serde_json::from_str::<Type>("\"half\"").is_err());
    }
}
