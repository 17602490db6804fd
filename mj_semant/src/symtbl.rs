use std::collections::HashMap;

use mj_ast::TypeName;

use crate::error::SemantError;
use crate::types::Type;

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub locals: Vec<(String, Type)>,
    pub return_type: Type,
}

impl MethodSymbol {
    pub fn find_param(&self, name: &str) -> Option<&Type> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn find_local(&self, name: &str) -> Option<&Type> {
        self.locals.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub name: String,
    pub parent: Option<String>,
    /// Insertion order, as declared (not yet including inherited fields —
    /// that ordering is a compile-time layout concern, see `mj_compile`).
    pub fields: Vec<(String, Type)>,
    pub methods: Vec<MethodSymbol>,
}

impl ClassSymbol {
    pub fn find_field(&self, name: &str) -> Option<&Type> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn find_method(&self, name: &str) -> Option<&MethodSymbol> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub classes: Vec<ClassSymbol>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn insert(&mut self, class: ClassSymbol) -> Result<(), SemantError> {
        if self.index.contains_key(&class.name) {
            return Err(SemantError::DuplicateClass(class.name));
        }
        self.index.insert(class.name.clone(), self.classes.len());
        self.classes.push(class);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ClassSymbol> {
        self.index.get(name).map(|&i| &self.classes[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassSymbol> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.classes[i]),
            None => None,
        }
    }

    /// Resolves a raw, as-parsed type name into a semantic [`Type`].
    pub fn resolve_type_name(&self, ty: &TypeName) -> Result<Type, SemantError> {
        match ty {
            TypeName::Int => Ok(Type::Integer),
            TypeName::Boolean => Ok(Type::Boolean),
            TypeName::IntArray => Ok(Type::IntArray),
            TypeName::Named(name) => {
                if self.index.contains_key(name) {
                    Ok(Type::Class(name.clone()))
                } else {
                    Err(SemantError::UnknownClass(name.clone()))
                }
            }
        }
    }

    /// Parent chain from `name` up to (and excluding) the root, nearest
    /// ancestor first. Assumes parents have already been resolved.
    pub fn parent_chain<'a>(&'a self, name: &str) -> Vec<&'a ClassSymbol> {
        let mut chain = Vec::new();
        let mut current = self.get(name);
        while let Some(class) = current {
            chain.push(class);
            current = class.parent.as_deref().and_then(|p| self.get(p));
        }
        chain
    }

    /// `a <= b`: `a` is `b` or a descendant of `b` along the parent chain.
    pub fn is_subtype(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let mut current = self.get(a).and_then(|c| c.parent.as_deref());
        while let Some(name) = current {
            if name == b {
                return true;
            }
            current = self.get(name).and_then(|c| c.parent.as_deref());
        }
        false
    }

    /// A method visible on `class_name` or any ancestor, nearest first.
    pub fn lookup_method(&self, class_name: &str, method: &str) -> Option<&MethodSymbol> {
        for class in self.parent_chain(class_name) {
            if let Some(m) = class.find_method(method) {
                return Some(m);
            }
        }
        None
    }

    /// The declaring class of `method` as seen from `class_name`: the
    /// nearest ancestor (including itself) that defines it. Used by
    /// `mj_compile`'s vtable-slot resolution for static dispatch targets.
    pub fn declaring_class(&self, class_name: &str, method: &str) -> Option<&str> {
        for class in self.parent_chain(class_name) {
            if class.find_method(method).is_some() {
                return Some(&class.name);
            }
        }
        None
    }
}
