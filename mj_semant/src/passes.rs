use std::collections::HashMap;

use mj_ast::{BinaryOp, Expr, ExprKind, MethodDecl, NodeId, Program, Stmt};

use crate::error::{type_mismatch, SemantError};
use crate::symtbl::{ClassSymbol, MethodSymbol, SymbolTable};
use crate::types::Type;

/// Inferred type of every [`Expr`], keyed by the id the parser assigned it.
/// Produced once by [`type_check`] and consumed by `mj_compile`'s lowering,
/// instead of lowering re-running inference on receiver expressions (see
/// SPEC_FULL.md's discussion of the original design's coupling here).
#[derive(Debug, Clone, Default)]
pub struct TypeMap(HashMap<NodeId, Type>);

impl TypeMap {
    pub fn get(&self, id: NodeId) -> Option<&Type> {
        self.0.get(&id)
    }
}

/// Pass 1: one class symbol per declared class plus the main class, which is
/// pre-populated with a zero-arg, `integer`-returning `main` method
/// (spec.md §4.1 pass 1; its real source signature takes `String[]`, but
/// that argument is never used at the value level so the symbol table
/// models the callable part of its signature only).
pub fn collect_classes(program: &Program) -> Result<SymbolTable, SemantError> {
    let mut symtbl = SymbolTable::new();

    symtbl.insert(ClassSymbol {
        name: program.main_class.name.clone(),
        parent: None,
        fields: vec![],
        methods: vec![MethodSymbol {
            name: "main".to_string(),
            params: vec![],
            locals: vec![],
            return_type: Type::Integer,
        }],
    })?;

    for class in &program.classes {
        symtbl.insert(ClassSymbol {
            name: class.name.clone(),
            parent: None,
            fields: vec![],
            methods: vec![],
        })?;
    }

    Ok(symtbl)
}

/// Pass 2: resolve each class's parent clause. Fails with `UnknownClass` if
/// the named parent was not declared anywhere in the program.
pub fn resolve_parents(symtbl: &mut SymbolTable, program: &Program) -> Result<(), SemantError> {
    for class in &program.classes {
        if let Some(parent_name) = &class.parent {
            if symtbl.get(parent_name).is_none() {
                return Err(SemantError::UnknownClass(parent_name.clone()));
            }
            symtbl.get_mut(&class.name).unwrap().parent = Some(parent_name.clone());
        }
    }
    Ok(())
}

/// Pass 3: resolve and insert field declarations, in source order.
pub fn collect_fields(symtbl: &mut SymbolTable, program: &Program) -> Result<(), SemantError> {
    for class in &program.classes {
        for field in &class.fields {
            let ty = symtbl.resolve_type_name(&field.ty)?;
            let entry = symtbl.get_mut(&class.name).unwrap();
            if entry.find_field(&field.name).is_some() {
                return Err(SemantError::DuplicateField {
                    class: class.name.clone(),
                    field: field.name.clone(),
                });
            }
            entry.fields.push((field.name.clone(), ty));
        }
    }
    Ok(())
}

/// Pass 4: build each method's symbol (params, locals, return type).
pub fn collect_methods(symtbl: &mut SymbolTable, program: &Program) -> Result<(), SemantError> {
    for class in &program.classes {
        for method in &class.methods {
            let symbol = build_method_symbol(symtbl, method)?;
            symtbl.get_mut(&class.name).unwrap().methods.push(symbol);
        }
    }
    Ok(())
}

fn build_method_symbol(
    symtbl: &SymbolTable,
    method: &MethodDecl,
) -> Result<MethodSymbol, SemantError> {
    let mut params = Vec::with_capacity(method.params.len());
    for p in &method.params {
        params.push((p.name.clone(), symtbl.resolve_type_name(&p.ty)?));
    }
    let mut locals = Vec::with_capacity(method.locals.len());
    for l in &method.locals {
        locals.push((l.name.clone(), symtbl.resolve_type_name(&l.ty)?));
    }
    Ok(MethodSymbol {
        name: method.name.clone(),
        params,
        locals,
        return_type: symtbl.resolve_type_name(&method.return_type)?,
    })
}

/// Runs all four collection passes in order, returning a fully populated
/// symbol table.
pub fn build_symbol_table(program: &Program) -> Result<SymbolTable, SemantError> {
    let mut symtbl = collect_classes(program)?;
    resolve_parents(&mut symtbl, program)?;
    collect_fields(&mut symtbl, program)?;
    collect_methods(&mut symtbl, program)?;
    Ok(symtbl)
}

/// Bare-identifier resolution inside method `method_name` of class
/// `class_name`: params, then locals, then the class's own fields; failing
/// that, walk the parent chain checking the same-named method's params and
/// locals (when such an override exists) and that ancestor's fields at each
/// level (spec.md §4.1).
fn lookup_symbol(symtbl: &SymbolTable, class_name: &str, method_name: &str, name: &str) -> Option<Type> {
    let class = symtbl.get(class_name)?;
    if let Some(method) = class.find_method(method_name) {
        if let Some(t) = method.find_param(name) {
            return Some(t.clone());
        }
        if let Some(t) = method.find_local(name) {
            return Some(t.clone());
        }
    }
    if let Some(t) = class.find_field(name) {
        return Some(t.clone());
    }

    let mut parent = class.parent.as_deref();
    while let Some(parent_name) = parent {
        let ancestor = symtbl.get(parent_name)?;
        if let Some(method) = ancestor.find_method(method_name) {
            if let Some(t) = method.find_param(name) {
                return Some(t.clone());
            }
            if let Some(t) = method.find_local(name) {
                return Some(t.clone());
            }
        }
        if let Some(t) = ancestor.find_field(name) {
            return Some(t.clone());
        }
        parent = ancestor.parent.as_deref();
    }
    None
}

/// Equality for primitives/arrays, subtype compatibility for class types —
/// the rule used for both method-call argument binding and assignment to a
/// class-typed target (spec.md §4.1, §9 Open Question 3).
fn compatible(symtbl: &SymbolTable, param: &Type, arg: &Type) -> bool {
    match (param, arg) {
        (Type::Class(p), Type::Class(a)) => symtbl.is_subtype(a, p),
        _ => param == arg,
    }
}

struct Ctx<'a> {
    class: &'a str,
    method: &'a str,
}

fn infer_expr(
    symtbl: &SymbolTable,
    types: &mut TypeMap,
    ctx: &Ctx,
    expr: &Expr,
) -> Result<Type, SemantError> {
    let ty = match &expr.kind {
        ExprKind::Binary { op, left, right } => {
            let lt = infer_expr(symtbl, types, ctx, left)?;
            let rt = infer_expr(symtbl, types, ctx, right)?;
            match op {
                BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Times => {
                    require(&lt, &Type::Integer)?;
                    require(&rt, &Type::Integer)?;
                    Type::Integer
                }
                BinaryOp::Less => {
                    require(&lt, &Type::Integer)?;
                    require(&rt, &Type::Integer)?;
                    Type::Boolean
                }
                BinaryOp::And => {
                    require(&lt, &Type::Boolean)?;
                    require(&rt, &Type::Boolean)?;
                    Type::Boolean
                }
            }
        }
        ExprKind::ArrayIndex { array, index } => {
            let at = infer_expr(symtbl, types, ctx, array)?;
            require(&at, &Type::IntArray)?;
            let it = infer_expr(symtbl, types, ctx, index)?;
            require(&it, &Type::Integer)?;
            Type::Integer
        }
        ExprKind::ArrayLength(array) => {
            let at = infer_expr(symtbl, types, ctx, array)?;
            require(&at, &Type::IntArray)?;
            Type::Integer
        }
        ExprKind::MethodCall {
            receiver,
            method,
            args,
        } => {
            let rt = infer_expr(symtbl, types, ctx, receiver)?;
            let recv_class = rt
                .class_name()
                .ok_or_else(|| type_mismatch(&Type::Class("<class>".to_string()), &rt))?;
            let method_sym = symtbl
                .lookup_method(recv_class, method)
                .ok_or_else(|| SemantError::UnknownMethod {
                    class: recv_class.to_string(),
                    method: method.clone(),
                })?
                .clone();
            if method_sym.params.len() != args.len() {
                return Err(SemantError::ArityMismatch {
                    method: method.clone(),
                    expected: method_sym.params.len(),
                    found: args.len(),
                });
            }
            for ((_, param_ty), arg) in method_sym.params.iter().zip(args.iter()) {
                let arg_ty = infer_expr(symtbl, types, ctx, arg)?;
                if !compatible(symtbl, param_ty, &arg_ty) {
                    return Err(type_mismatch(param_ty, &arg_ty));
                }
            }
            method_sym.return_type
        }
        ExprKind::IntLiteral(_) => Type::Integer,
        ExprKind::True | ExprKind::False => Type::Boolean,
        ExprKind::Identifier(name) => lookup_symbol(symtbl, ctx.class, ctx.method, name)
            .ok_or_else(|| SemantError::UnknownSymbol(name.clone()))?,
        ExprKind::This => Type::Class(ctx.class.to_string()),
        ExprKind::NewIntArray(size) => {
            let st = infer_expr(symtbl, types, ctx, size)?;
            require(&st, &Type::Integer)?;
            Type::IntArray
        }
        ExprKind::NewObject(name) => {
            symtbl
                .get(name)
                .ok_or_else(|| SemantError::UnknownClass(name.clone()))?;
            Type::Class(name.clone())
        }
        ExprKind::Not(inner) => {
            let it = infer_expr(symtbl, types, ctx, inner)?;
            require(&it, &Type::Boolean)?;
            Type::Boolean
        }
        ExprKind::Paren(inner) => infer_expr(symtbl, types, ctx, inner)?,
    };
    types.0.insert(expr.id, ty.clone());
    Ok(ty)
}

fn require(found: &Type, expected: &Type) -> Result<(), SemantError> {
    if found == expected {
        Ok(())
    } else {
        Err(type_mismatch(expected, found))
    }
}

fn check_stmt(
    symtbl: &SymbolTable,
    types: &mut TypeMap,
    ctx: &Ctx,
    stmt: &Stmt,
) -> Result<(), SemantError> {
    match stmt {
        Stmt::Block(stmts) => {
            for s in stmts {
                check_stmt(symtbl, types, ctx, s)?;
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let ct = infer_expr(symtbl, types, ctx, cond)?;
            require(&ct, &Type::Boolean)?;
            check_stmt(symtbl, types, ctx, then_branch)?;
            check_stmt(symtbl, types, ctx, else_branch)?;
        }
        Stmt::While { cond, body } => {
            let ct = infer_expr(symtbl, types, ctx, cond)?;
            require(&ct, &Type::Boolean)?;
            check_stmt(symtbl, types, ctx, body)?;
        }
        Stmt::Print(expr) => {
            let et = infer_expr(symtbl, types, ctx, expr)?;
            require(&et, &Type::Integer)?;
        }
        Stmt::Assign { target, value } => {
            let declared = lookup_symbol(symtbl, ctx.class, ctx.method, target)
                .ok_or_else(|| SemantError::UnknownSymbol(target.clone()))?;
            let vt = infer_expr(symtbl, types, ctx, value)?;
            if !compatible(symtbl, &declared, &vt) {
                return Err(type_mismatch(&declared, &vt));
            }
        }
        Stmt::ArrayAssign {
            target,
            index,
            value,
        } => {
            let declared = lookup_symbol(symtbl, ctx.class, ctx.method, target)
                .ok_or_else(|| SemantError::UnknownSymbol(target.clone()))?;
            require(&declared, &Type::IntArray)?;
            let it = infer_expr(symtbl, types, ctx, index)?;
            require(&it, &Type::Integer)?;
            let vt = infer_expr(symtbl, types, ctx, value)?;
            require(&vt, &Type::Integer)?;
        }
    }
    Ok(())
}

/// Pass 5: type-checks the whole program, producing the annotation map
/// lowering will consume.
#[tracing::instrument(skip_all)]
pub fn type_check(symtbl: &SymbolTable, program: &Program) -> Result<TypeMap, SemantError> {
    let mut types = TypeMap::default();

    let main_ctx = Ctx {
        class: &program.main_class.name,
        method: "main",
    };
    check_stmt(symtbl, &mut types, &main_ctx, &program.main_class.body)?;

    for class in &program.classes {
        for method in &class.methods {
            let ctx = Ctx {
                class: &class.name,
                method: &method.name,
            };
            for stmt in &method.body {
                check_stmt(symtbl, &mut types, &ctx, stmt)?;
            }
            let ret_ty = infer_expr(symtbl, &mut types, &ctx, &method.return_expr)?;
            let method_sym = symtbl.get(&class.name).unwrap().find_method(&method.name).unwrap();
            if ret_ty != method_sym.return_type {
                return Err(type_mismatch(&method_sym.return_type, &ret_ty));
            }
        }
    }

    Ok(types)
}
