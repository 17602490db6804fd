//! Class/method layout pass (spec.md §4.2): field allocation order and the
//! registration list method-layout skeletons are built from before vtables
//! or instructions exist.

use std::collections::HashMap;

use mj_ast::Program;
use mj_bytecode::ClassLayout;

/// A method layout before its body has been lowered: just enough to size a
/// callee frame (`1 + args.len() + locals.len()` slots) and to feed the
/// vtable pass.
#[derive(Debug, Clone)]
pub struct MethodSkeleton {
    pub class: String,
    pub method: String,
    pub args: Vec<String>,
    pub locals: Vec<String>,
}

/// `class -> parent`, including the main class (which has none). Shared by
/// the vtable pass to walk ancestry without re-touching the AST.
pub fn parent_map(program: &Program) -> HashMap<String, Option<String>> {
    let mut map = HashMap::new();
    map.insert(program.main_class.name.clone(), None);
    for class in &program.classes {
        map.insert(class.name.clone(), class.parent.clone());
    }
    map
}

/// Field name for `class`, ancestors first (most distant to nearest), then
/// its own, in declaration order — the layout every `getfield`/`putfield`
/// index and every heap object's payload is built against.
fn fields_of(
    name: &str,
    decls: &HashMap<String, &mj_ast::ClassDecl>,
    cache: &mut HashMap<String, Vec<String>>,
) -> Vec<String> {
    if let Some(fields) = cache.get(name) {
        return fields.clone();
    }
    let decl = match decls.get(name) {
        Some(d) => d,
        None => return Vec::new(), // the main class: no fields, no parent
    };
    let mut fields = match &decl.parent {
        Some(parent) => fields_of(parent, decls, cache),
        None => Vec::new(),
    };
    fields.extend(decl.fields.iter().map(|f| f.name.clone()));
    cache.insert(name.to_string(), fields.clone());
    fields
}

/// Builds every class's [`ClassLayout`] (fields resolved, `vtbl` left empty
/// for the vtable pass to fill in) plus the method-layout skeletons, in
/// registration order: the main class's `main` first, then every class's
/// methods in source order.
pub fn build(program: &Program) -> (Vec<ClassLayout>, Vec<MethodSkeleton>) {
    let decls: HashMap<String, &mj_ast::ClassDecl> = program
        .classes
        .iter()
        .map(|c| (c.name.clone(), c))
        .collect();
    let mut field_cache = HashMap::new();

    let mut classes = Vec::with_capacity(program.classes.len() + 1);
    classes.push(ClassLayout {
        name: program.main_class.name.clone(),
        parent: None,
        fields: Vec::new(),
        vtbl: Vec::new(),
    });
    for class in &program.classes {
        classes.push(ClassLayout {
            name: class.name.clone(),
            parent: class.parent.clone(),
            fields: fields_of(&class.name, &decls, &mut field_cache),
            vtbl: Vec::new(),
        });
    }

    let mut methods = Vec::with_capacity(program.classes.iter().map(|c| c.methods.len()).sum::<usize>() + 1);
    methods.push(MethodSkeleton {
        class: program.main_class.name.clone(),
        method: "main".to_string(),
        args: Vec::new(),
        locals: Vec::new(),
    });
    for class in &program.classes {
        for method in &class.methods {
            methods.push(MethodSkeleton {
                class: class.name.clone(),
                method: method.name.clone(),
                args: method.params.iter().map(|p| p.name.clone()).collect(),
                locals: method.locals.iter().map(|l| l.name.clone()).collect(),
            });
        }
    }

    (classes, methods)
}
