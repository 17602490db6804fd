//! AST produced by `mj_parser` and consumed by `mj_semant`/`mj_compile`.
//!
//! Statements and expressions are plain tagged enums (see the project's
//! design notes on replacing a visitor hierarchy with pattern dispatch):
//! passes are free functions over `(context, &Node)` rather than methods
//! on a family of node types.

use std::cell::Cell;

/// A name as written in source. Field/local/class resolution all key on
/// this; it carries no interned symbol, which is fine at this program size.
pub type Ident = String;

/// Stable identity for an [`Expr`], assigned once by the parser. Lets
/// `mj_semant::type_check` record an inferred [`Type`] per expression and
/// `mj_compile` consume that record instead of re-running inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A type name exactly as it appears in a declaration, before resolution.
/// `mj_semant` turns this into a resolved `Type` (primitive or class).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Boolean,
    IntArray,
    Named(Ident),
}

#[derive(Debug, Clone)]
pub struct Program {
    pub main_class: MainClass,
    pub classes: Vec<ClassDecl>,
}

#[derive(Debug, Clone)]
pub struct MainClass {
    pub name: Ident,
    /// `main(String[] <arg_name>)`'s parameter name; never referenced at
    /// runtime (strings are not value-level), kept only so the grammar
    /// round-trips.
    pub arg_name: Ident,
    pub body: Stmt,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Ident,
    pub parent: Option<Ident>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub ty: TypeName,
    pub name: Ident,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub return_type: TypeName,
    pub name: Ident,
    pub params: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    pub return_expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Times,
    Less,
    And,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Print(Expr),
    Assign {
        target: Ident,
        value: Expr,
    },
    ArrayAssign {
        target: Ident,
        index: Expr,
        value: Expr,
    },
}

/// An expression node: a tag plus payload, with an id for type annotation.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    ArrayIndex {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayLength(Box<Expr>),
    MethodCall {
        receiver: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
    },
    IntLiteral(i64),
    True,
    False,
    Identifier(Ident),
    This,
    NewIntArray(Box<Expr>),
    NewObject(Ident),
    Not(Box<Expr>),
    Paren(Box<Expr>),
}

/// Assigns increasing [`NodeId`]s as the parser builds the tree.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: Cell<u32>,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self { next: Cell::new(0) }
    }

    pub fn next(&self) -> NodeId {
        let id = self.next.get();
        self.next.set(id + 1);
        NodeId(id)
    }
}

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind) -> Self {
        Expr { id, kind }
    }
}
