//! Vtable construction pass (spec.md §4.2): one dispatch slot per distinct
//! method name visible on a class, overridden in place when a descendant
//! redeclares the same name so a base-typed call site and a derived-typed
//! call site agree on slot index.

use std::collections::{HashMap, HashSet};

use mj_bytecode::ClassLayout;

use crate::layout::MethodSkeleton;

fn ancestors_incl_self(name: &str, parents: &HashMap<String, Option<String>>) -> HashSet<String> {
    let mut chain = HashSet::new();
    let mut current = Some(name.to_string());
    while let Some(c) = current {
        current = parents.get(&c).cloned().flatten();
        chain.insert(c);
    }
    chain
}

/// Fills in `vtbl` on every [`ClassLayout`], in place. `skeletons` must be in
/// registration order (main's `main` first, then every method in source
/// order) — later entries overwrite earlier same-named slots, which is how
/// an override replaces its ancestor's slot instead of appending a new one.
pub fn build(classes: &mut [ClassLayout], skeletons: &[MethodSkeleton], parents: &HashMap<String, Option<String>>) {
    for class in classes.iter_mut() {
        let chain = ancestors_incl_self(&class.name, parents);
        let mut vtbl: Vec<(String, String)> = Vec::new();
        for skeleton in skeletons {
            if !chain.contains(&skeleton.class) {
                continue;
            }
            match vtbl.iter().position(|(_, m)| m == &skeleton.method) {
                Some(slot) => vtbl[slot] = (skeleton.class.clone(), skeleton.method.clone()),
                None => vtbl.push((skeleton.class.clone(), skeleton.method.clone())),
            }
        }
        class.vtbl = vtbl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skel(class: &str, method: &str) -> MethodSkeleton {
        MethodSkeleton {
            class: class.to_string(),
            method: method.to_string(),
            args: vec![],
            locals: vec![],
        }
    }

    #[test]
    fn override_keeps_the_same_slot() {
        let mut classes = vec![
            ClassLayout {
                name: "A".into(),
                parent: None,
                fields: vec![],
                vtbl: vec![],
            },
            ClassLayout {
                name: "B".into(),
                parent: Some("A".into()),
                fields: vec![],
                vtbl: vec![],
            },
        ];
        let skeletons = vec![skel("A", "f"), skel("B", "f")];
        let mut parents = HashMap::new();
        parents.insert("A".to_string(), None);
        parents.insert("B".to_string(), Some("A".to_string()));

        build(&mut classes, &skeletons, &parents);

        assert_eq!(classes[0].vtbl_slot("f"), Some(0));
        assert_eq!(classes[1].vtbl_slot("f"), Some(0));
        assert_eq!(classes[1].vtbl[0].0, "B");
    }
}
