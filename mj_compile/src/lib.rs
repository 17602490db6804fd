//! Compiles a type-checked [`mj_ast::Program`] into a linear [`mj_bytecode::Program`]
//! (spec.md §4.2): class/method layout, vtable construction, lowering, and
//! branch resolution, in that order.

mod cfg;
mod error;
mod layout;
mod lower;
mod vtable;

pub use error::CompileError;

use mj_bytecode::{Instruction, MethodLayout, OpCode, Program as BcProgram};
use mj_semant::TypeMap;

use lower::Lowerer;

#[tracing::instrument(skip_all)]
pub fn compile(program: &mj_ast::Program, types: &TypeMap) -> Result<BcProgram, CompileError> {
    let (mut classes, skeletons) = layout::build(program);
    let parents = layout::parent_map(program);
    vtable::build(&mut classes, &skeletons, &parents);

    let mut methods = Vec::with_capacity(skeletons.len());

    {
        let mut lowerer = Lowerer::new(&classes, types, &program.main_class.name, &[], &[]);
        lowerer.lower_stmt(&program.main_class.body)?;
        let instructions = finish(lowerer);
        methods.push(MethodLayout {
            class: program.main_class.name.clone(),
            method: "main".to_string(),
            args: vec![],
            locals: vec![],
            instructions,
        });
    }

    for class in &program.classes {
        for method in &class.methods {
            let args: Vec<String> = method.params.iter().map(|p| p.name.clone()).collect();
            let locals: Vec<String> = method.locals.iter().map(|l| l.name.clone()).collect();
            let mut lowerer = Lowerer::new(&classes, types, &class.name, &args, &locals);
            for stmt in &method.body {
                lowerer.lower_stmt(stmt)?;
            }
            lowerer.lower_expr(&method.return_expr)?;
            let instructions = finish(lowerer);
            methods.push(MethodLayout {
                class: class.name.clone(),
                method: method.name.clone(),
                args,
                locals,
                instructions,
            });
        }
    }

    Ok(BcProgram { classes, methods })
}

fn finish(lowerer: Lowerer) -> Vec<Instruction> {
    let mut instructions = lowerer.finish();
    instructions.push(Instruction::simple(OpCode::Return));
    instructions
}
