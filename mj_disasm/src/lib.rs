//! Textual bytecode listing (spec.md §6 "Disassembly format"), modeled on
//! the same `display_class<W: Write>` shape used elsewhere in this codebase
//! for printing a compiled artifact.

use std::io::{self, Write};

use mj_bytecode::Program;

/// Per method:
/// ```text
/// method <Class>.<method>
///   arg   <name>
///   local <name>
///         <opcode> [operand [operand2]]
/// ```
pub fn display_program<W: Write>(mut w: W, program: &Program) -> io::Result<()> {
    for method in &program.methods {
        writeln!(w, "method {}.{}", method.class, method.method)?;
        for arg in &method.args {
            writeln!(w, "  arg   {arg}")?;
        }
        for local in &method.locals {
            writeln!(w, "  local {local}")?;
        }
        for instr in &method.instructions {
            writeln!(w, "        {instr}")?;
        }
    }
    Ok(())
}

/// Prints to stdout, swallowing write errors onto stderr the way a
/// best-effort diagnostic dump should.
pub fn print(program: &Program) {
    let stdout = io::stdout();
    if let Err(why) = display_program(stdout.lock(), program) {
        eprintln!("{why}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mj_bytecode::{Instruction, MethodLayout, OpCode};

    #[test]
    fn lists_args_locals_and_instructions() {
        let program = Program {
            classes: vec![],
            methods: vec![MethodLayout {
                class: "Sum".into(),
                method: "compute".into(),
                args: vec!["n".into()],
                locals: vec!["acc".into()],
                instructions: vec![
                    Instruction::with_operand(OpCode::Load, 1),
                    Instruction::simple(OpCode::Return),
                ],
            }],
        };
        let mut out = Vec::new();
        display_program(&mut out, &program).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "method Sum.compute\n  arg   n\n  local acc\n        load 1\n        return\n"
        );
    }
}
