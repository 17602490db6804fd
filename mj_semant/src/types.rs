use std::fmt;

/// A resolved source-language type: either a primitive or a declared class,
/// identified by name (spec.md §3 "Types (source-language)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Integer,
    Boolean,
    IntArray,
    Class(String),
}

impl Type {
    pub fn is_class(&self) -> bool {
        matches!(self, Type::Class(_))
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "integer"),
            Type::Boolean => write!(f, "boolean"),
            Type::IntArray => write!(f, "int[]"),
            Type::Class(name) => write!(f, "{name}"),
        }
    }
}
