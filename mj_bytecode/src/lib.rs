//! The compiled artifact: instruction set, class/method layouts, and the
//! `Program` that `mj_compile` produces and `mj_vm`/`mj_disasm` consume.
//!
//! Mirrors the role the teacher's `class-struct`/`file-parser` "model"
//! modules play for the JVM class-file format: a plain data description of
//! the wire format, independent of how it's built or read.

use std::fmt;

/// 21 opcodes, matching spec.md §4.2. `Iastore`/`Iaload` take no operand
/// (Open Question 1 resolved in favor of always pushing the array on the
/// stack rather than encoding a local index as an operand — see
/// SPEC_FULL.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Band,
    Bneg,
    Getfield,
    Goto,
    GotoIfFalse,
    Iadd,
    Iaload,
    Iastore,
    Ilt,
    Imul,
    Invoke,
    Isub,
    Load,
    Ldc,
    Length,
    New,
    Newarray,
    Putfield,
    Print,
    Return,
    Store,
}

/// All operands are signed 64-bit; `invoke` is the only opcode using both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub operand: i64,
    pub operand2: i64,
}

impl Instruction {
    pub fn simple(op: OpCode) -> Self {
        Instruction {
            op,
            operand: 0,
            operand2: 0,
        }
    }

    pub fn with_operand(op: OpCode, operand: i64) -> Self {
        Instruction {
            op,
            operand,
            operand2: 0,
        }
    }

    pub fn invoke(slot: i64, nargs: i64) -> Self {
        Instruction {
            op: OpCode::Invoke,
            operand: slot,
            operand2: nargs,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self.op {
            OpCode::Band => "band",
            OpCode::Bneg => "bneg",
            OpCode::Getfield => "getfield",
            OpCode::Goto => "goto",
            OpCode::GotoIfFalse => "goto_if_false",
            OpCode::Iadd => "iadd",
            OpCode::Iaload => "iaload",
            OpCode::Iastore => "iastore",
            OpCode::Ilt => "ilt",
            OpCode::Imul => "imul",
            OpCode::Invoke => "invoke",
            OpCode::Isub => "isub",
            OpCode::Load => "load",
            OpCode::Ldc => "ldc",
            OpCode::Length => "length",
            OpCode::New => "new",
            OpCode::Newarray => "newarray",
            OpCode::Putfield => "putfield",
            OpCode::Print => "print",
            OpCode::Return => "return",
            OpCode::Store => "store",
        }
    }

    /// Number of operands this opcode is printed/encoded with.
    fn arity(&self) -> u8 {
        match self.op {
            OpCode::Band
            | OpCode::Bneg
            | OpCode::Iadd
            | OpCode::Iaload
            | OpCode::Iastore
            | OpCode::Ilt
            | OpCode::Imul
            | OpCode::Isub
            | OpCode::Length
            | OpCode::Print
            | OpCode::Return => 0,
            OpCode::Invoke => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity() {
            0 => write!(f, "{}", self.mnemonic()),
            1 => write!(f, "{} {}", self.mnemonic(), self.operand),
            _ => write!(f, "{} {} {}", self.mnemonic(), self.operand, self.operand2),
        }
    }
}

/// Field allocation order and dispatch table for one class, computed by
/// `mj_compile`'s layout/vtable passes (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct ClassLayout {
    pub name: String,
    pub parent: Option<String>,
    /// Inherited fields first (most distant ancestor to nearest), then own.
    pub fields: Vec<String>,
    /// `(declaring_class, method_name)` per dispatch slot.
    pub vtbl: Vec<(String, String)>,
}

impl ClassLayout {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn vtbl_slot(&self, method_name: &str) -> Option<usize> {
        self.vtbl.iter().position(|(_, m)| m == method_name)
    }
}

/// One method's finalized, linear instruction stream.
#[derive(Debug, Clone)]
pub struct MethodLayout {
    pub class: String,
    pub method: String,
    pub args: Vec<String>,
    pub locals: Vec<String>,
    pub instructions: Vec<Instruction>,
}

impl MethodLayout {
    pub fn qualified_name(&self) -> (&str, &str) {
        (&self.class, &self.method)
    }
}

/// The complete compiled program: every class's layout plus every method's
/// linearized instructions, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub classes: Vec<ClassLayout>,
    pub methods: Vec<MethodLayout>,
}

impl Program {
    pub fn find_class(&self, name: &str) -> Option<(usize, &ClassLayout)> {
        self.classes
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
    }

    pub fn find_method(&self, class: &str, method: &str) -> Option<usize> {
        self.methods
            .iter()
            .position(|m| m.class == class && m.method == method)
    }

    /// "the first entry in the method table, whose qualified name's second
    /// part equals `main`" (spec.md §4.3).
    pub fn main_method_index(&self) -> Option<usize> {
        self.methods.iter().position(|m| m.method == "main")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_zero_arg_instruction() {
        assert_eq!(Instruction::simple(OpCode::Iadd).to_string(), "iadd");
    }

    #[test]
    fn displays_one_arg_instruction() {
        assert_eq!(
            Instruction::with_operand(OpCode::Ldc, 42).to_string(),
            "ldc 42"
        );
    }

    #[test]
    fn displays_invoke_instruction() {
        assert_eq!(Instruction::invoke(2, 1).to_string(), "invoke 2 1");
    }

    #[test]
    fn finds_main_method_by_name() {
        let program = Program {
            classes: vec![],
            methods: vec![MethodLayout {
                class: "Main".into(),
                method: "main".into(),
                args: vec![],
                locals: vec![],
                instructions: vec![],
            }],
        };
        assert_eq!(program.main_method_index(), Some(0));
    }
}
