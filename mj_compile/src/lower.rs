//! Expression/statement lowering (spec.md §4.2): walks a type-checked method
//! body and emits bytecode into a [`CfgBuilder`], consuming the `TypeMap`
//! `mj_semant::type_check` produced instead of re-inferring receiver types.

use mj_ast::{BinaryOp, Expr, ExprKind, Stmt};
use mj_bytecode::{ClassLayout, Instruction, OpCode};
use mj_semant::TypeMap;

use crate::error::CompileError;
use crate::cfg::{BlockId, CfgBuilder};

enum VarLoc {
    Arg(usize),
    Local(usize),
    Field(usize),
}

pub struct Lowerer<'a> {
    classes: &'a [ClassLayout],
    types: &'a TypeMap,
    class_name: &'a str,
    args: &'a [String],
    locals: &'a [String],
    cfg: CfgBuilder,
    current: BlockId,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        classes: &'a [ClassLayout],
        types: &'a TypeMap,
        class_name: &'a str,
        args: &'a [String],
        locals: &'a [String],
    ) -> Self {
        let cfg = CfgBuilder::new();
        let current = cfg.entry();
        Lowerer {
            classes,
            types,
            class_name,
            args,
            locals,
            cfg,
            current,
        }
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.cfg.finish()
    }

    fn emit(&mut self, instr: Instruction) {
        self.cfg.emit(self.current, instr);
    }

    fn layout_of(&self, name: &str) -> &ClassLayout {
        self.classes
            .iter()
            .find(|c| c.name == name)
            .expect("class layout registered during the layout pass")
    }

    fn class_index(&self, name: &str) -> i64 {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .expect("class layout registered during the layout pass") as i64
    }

    fn resolve_var(&self, name: &str) -> Option<VarLoc> {
        if let Some(i) = self.args.iter().position(|a| a == name) {
            return Some(VarLoc::Arg(i));
        }
        if let Some(i) = self.locals.iter().position(|l| l == name) {
            return Some(VarLoc::Local(i));
        }
        self.layout_of(self.class_name)
            .field_index(name)
            .map(VarLoc::Field)
    }

    /// Slot 0 is reserved for `this`; arguments occupy `1..=args.len()`,
    /// locals follow.
    fn slot_of(&self, loc: &VarLoc) -> i64 {
        match loc {
            VarLoc::Arg(i) => (*i + 1) as i64,
            VarLoc::Local(i) => (self.args.len() + 1 + *i) as i64,
            VarLoc::Field(_) => unreachable!("fields are accessed via getfield/putfield, not a slot"),
        }
    }

    pub fn lower_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Binary { op, left, right } => {
                self.lower_expr(left)?;
                self.lower_expr(right)?;
                let opcode = match op {
                    BinaryOp::Plus => OpCode::Iadd,
                    BinaryOp::Minus => OpCode::Isub,
                    BinaryOp::Times => OpCode::Imul,
                    BinaryOp::Less => OpCode::Ilt,
                    BinaryOp::And => OpCode::Band,
                };
                self.emit(Instruction::simple(opcode));
            }
            ExprKind::ArrayIndex { array, index } => {
                // iaload's operand order: index pushed before the array.
                self.lower_expr(index)?;
                self.lower_expr(array)?;
                self.emit(Instruction::simple(OpCode::Iaload));
            }
            ExprKind::ArrayLength(array) => {
                self.lower_expr(array)?;
                self.emit(Instruction::simple(OpCode::Length));
            }
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => {
                self.lower_expr(receiver)?;
                for arg in args {
                    self.lower_expr(arg)?;
                }
                let recv_ty = self
                    .types
                    .get(receiver.id)
                    .expect("receiver was type-checked");
                let recv_class = recv_ty
                    .class_name()
                    .expect("method call receiver has a class type");
                let slot = self
                    .layout_of(recv_class)
                    .vtbl_slot(method)
                    .expect("method resolved during semantic analysis") as i64;
                self.emit(Instruction::invoke(slot, (1 + args.len()) as i64));
            }
            ExprKind::IntLiteral(v) => self.emit(Instruction::with_operand(OpCode::Ldc, *v)),
            ExprKind::True => self.emit(Instruction::with_operand(OpCode::Ldc, 1)),
            ExprKind::False => self.emit(Instruction::with_operand(OpCode::Ldc, 0)),
            ExprKind::Identifier(name) => match self.resolve_var(name) {
                Some(loc @ (VarLoc::Arg(_) | VarLoc::Local(_))) => {
                    let slot = self.slot_of(&loc);
                    self.emit(Instruction::with_operand(OpCode::Load, slot));
                }
                Some(VarLoc::Field(k)) => {
                    self.emit(Instruction::with_operand(OpCode::Load, 0));
                    self.emit(Instruction::with_operand(OpCode::Getfield, k as i64));
                }
                None => return Err(CompileError::UnresolvedVariable(name.clone())),
            },
            ExprKind::This => self.emit(Instruction::with_operand(OpCode::Load, 0)),
            ExprKind::NewIntArray(size) => {
                self.lower_expr(size)?;
                self.emit(Instruction::simple(OpCode::Newarray));
            }
            ExprKind::NewObject(name) => {
                let idx = self.class_index(name);
                self.emit(Instruction::with_operand(OpCode::New, idx));
            }
            ExprKind::Not(inner) => {
                self.lower_expr(inner)?;
                self.emit(Instruction::simple(OpCode::Bneg));
            }
            ExprKind::Paren(inner) => self.lower_expr(inner)?,
        }
        Ok(())
    }

    pub fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.lower_stmt(s)?;
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.lower_expr(cond)?;
                let cond_block = self.current;
                self.emit(Instruction::with_operand(OpCode::GotoIfFalse, 0));

                let then_start = self.cfg.new_block();
                self.current = then_start;
                self.lower_stmt(then_branch)?;
                let then_end = self.current;
                self.emit(Instruction::with_operand(OpCode::Goto, 0));

                let else_start = self.cfg.new_block();
                self.current = else_start;
                self.lower_stmt(else_branch)?;
                let else_end = self.current;

                let join = self.cfg.new_block();
                self.cfg.block_mut(cond_block).then_branch = Some(then_start);
                self.cfg.block_mut(cond_block).else_branch = Some(else_start);
                self.cfg.block_mut(then_end).then_branch = Some(join);
                self.cfg.block_mut(else_end).then_branch = Some(join);
                self.current = join;
            }
            Stmt::While { cond, body } => {
                let prev = self.current;
                let cond_block = self.cfg.new_block();
                self.cfg.block_mut(prev).then_branch = Some(cond_block);
                self.current = cond_block;
                self.lower_expr(cond)?;
                self.emit(Instruction::with_operand(OpCode::GotoIfFalse, 0));

                let body_start = self.cfg.new_block();
                self.current = body_start;
                self.lower_stmt(body)?;
                let body_end = self.current;
                self.emit(Instruction::with_operand(OpCode::Goto, 0));

                let exit = self.cfg.new_block();
                self.cfg.block_mut(cond_block).then_branch = Some(body_start);
                self.cfg.block_mut(cond_block).else_branch = Some(exit);
                self.cfg.block_mut(body_end).then_branch = Some(cond_block);
                self.current = exit;
            }
            Stmt::Print(expr) => {
                self.lower_expr(expr)?;
                self.emit(Instruction::simple(OpCode::Print));
            }
            Stmt::Assign { target, value } => {
                self.lower_expr(value)?;
                match self.resolve_var(target) {
                    Some(loc @ (VarLoc::Arg(_) | VarLoc::Local(_))) => {
                        let slot = self.slot_of(&loc);
                        self.emit(Instruction::with_operand(OpCode::Store, slot));
                    }
                    Some(VarLoc::Field(k)) => {
                        self.emit(Instruction::with_operand(OpCode::Load, 0));
                        self.emit(Instruction::with_operand(OpCode::Putfield, k as i64));
                    }
                    None => return Err(CompileError::UnresolvedVariable(target.clone())),
                }
            }
            Stmt::ArrayAssign {
                target,
                index,
                value,
            } => {
                let loc = self
                    .resolve_var(target)
                    .ok_or_else(|| CompileError::UnresolvedVariable(target.clone()))?;
                // iastore's operand order: index, then value, then the array itself.
                self.lower_expr(index)?;
                self.lower_expr(value)?;
                match loc {
                    VarLoc::Arg(_) | VarLoc::Local(_) => {
                        let slot = self.slot_of(&loc);
                        self.emit(Instruction::with_operand(OpCode::Load, slot));
                    }
                    VarLoc::Field(k) => {
                        self.emit(Instruction::with_operand(OpCode::Load, 0));
                        self.emit(Instruction::with_operand(OpCode::Getfield, k as i64));
                    }
                }
                self.emit(Instruction::simple(OpCode::Iastore));
            }
        }
        Ok(())
    }
}
