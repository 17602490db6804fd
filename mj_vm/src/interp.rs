//! The dispatch loop (spec.md §4.3 "Frame, call, and return"): reads the
//! current instruction, executes it, and either falls through to the next
//! instruction or transfers control explicitly.

use std::io::Write;

use mj_bytecode::{OpCode, Program};

use crate::error::RuntimeError;
use crate::frame::Frame;
use crate::gc;
use crate::heap::{Heap, ObjectKind};
use crate::value::Value;

pub struct Vm<'p, W> {
    program: &'p Program,
    heap: Heap,
    frames: Vec<Frame>,
    stdout: W,
}

impl<'p, W: Write> Vm<'p, W> {
    /// `exec`: resolves the entry point and pushes the initial frame
    /// (spec.md §4.3). Slot 0 of every frame is reserved for `this`; main
    /// has none, so it's initialized to a dummy tagged zero and never read.
    pub fn new(program: &'p Program, stdout: W) -> Result<Self, RuntimeError> {
        Self::with_heap(program, stdout, Heap::new())
    }

    /// Same as [`Vm::new`] but with a caller-supplied heap, e.g. one built
    /// via [`Heap::with_max_bytes`] to force collection under test.
    pub fn with_heap(program: &'p Program, stdout: W, heap: Heap) -> Result<Self, RuntimeError> {
        let main_index = program.main_method_index().ok_or(RuntimeError::MissingMain)?;
        let main_frame = Frame::new(main_index, vec![Value::int(0)]);
        Ok(Vm {
            program,
            heap,
            frames: vec![main_frame],
            stdout,
        })
    }

    #[tracing::instrument(skip_all)]
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if self.step()? {
                return Ok(());
            }
        }
    }

    fn current_method(&self) -> &'p mj_bytecode::MethodLayout {
        let index = self.frames.last().expect("at least one live frame").method_index;
        &self.program.methods[index]
    }

    /// Runs one instruction. Returns `true` when the outermost frame
    /// returns, i.e. the program has terminated.
    fn step(&mut self) -> Result<bool, RuntimeError> {
        let instr = {
            let frame = self.frames.last().expect("at least one live frame");
            self.current_method().instructions[frame.ip]
        };
        let mut advance = true;

        match instr.op {
            OpCode::Ldc => self.frame_mut().push(Value::int(instr.operand)),
            OpCode::Load => {
                let v = self.frame_mut().locals[instr.operand as usize];
                self.frame_mut().push(v);
            }
            OpCode::Store => {
                let v = self.frame_mut().pop()?;
                let slot = instr.operand as usize;
                self.frame_mut().locals[slot] = v;
            }
            OpCode::Iadd | OpCode::Isub | OpCode::Imul | OpCode::Ilt | OpCode::Band => {
                let b = self.frame_mut().pop()?.as_int()?;
                let a = self.frame_mut().pop()?.as_int()?;
                let result = match instr.op {
                    OpCode::Iadd => a + b,
                    OpCode::Isub => a - b,
                    OpCode::Imul => a * b,
                    OpCode::Ilt => i64::from(a < b),
                    OpCode::Band => a & b,
                    _ => unreachable!(),
                };
                self.frame_mut().push(Value::int(result));
            }
            OpCode::Bneg => {
                let v = self.frame_mut().pop()?.as_int()?;
                self.frame_mut().push(Value::int(i64::from(v == 0)));
            }
            OpCode::Getfield => {
                let obj = self.frame_mut().pop()?.as_ptr()?;
                let v = self.heap.getfield(obj, instr.operand as usize);
                self.frame_mut().push(v);
            }
            OpCode::Putfield => {
                let obj = self.frame_mut().pop()?.as_ptr()?;
                let v = self.frame_mut().pop()?;
                self.heap.putfield(obj, instr.operand as usize, v);
            }
            OpCode::Iaload => {
                let arr = self.frame_mut().pop()?.as_ptr()?;
                let idx = self.frame_mut().pop()?.as_int()?;
                let v = self.heap.iaload(arr, idx as usize);
                self.frame_mut().push(v);
            }
            OpCode::Iastore => {
                let arr = self.frame_mut().pop()?.as_ptr()?;
                let val = self.frame_mut().pop()?;
                let idx = self.frame_mut().pop()?.as_int()?;
                self.heap.iastore(arr, idx as usize, val);
            }
            OpCode::Length => {
                let arr = self.frame_mut().pop()?.as_ptr()?;
                let len = match &self.heap.get(arr).kind {
                    ObjectKind::Array { buffer } => buffer.len() as i64,
                    ObjectKind::Instance { .. } => unreachable!("length on a non-array object"),
                };
                self.frame_mut().push(Value::int(len));
            }
            OpCode::New => {
                let class_index = instr.operand as usize;
                let num_fields = self.program.classes[class_index].fields.len();
                self.ensure_capacity(Heap::object_bytes(num_fields))?;
                let v = self.heap.alloc_object(class_index, num_fields);
                self.frame_mut().push(v);
            }
            OpCode::Newarray => {
                let len = self.frame_mut().pop()?.as_int()?;
                self.ensure_capacity(Heap::array_bytes(len as usize))?;
                let v = self.heap.alloc_array(len as usize);
                self.frame_mut().push(v);
            }
            OpCode::Print => {
                let v = self.frame_mut().pop()?.as_int()?;
                writeln!(self.stdout, "{v}").expect("write to stdout");
            }
            OpCode::Goto => {
                self.frame_mut().ip = instr.operand as usize;
                advance = false;
            }
            OpCode::GotoIfFalse => {
                let cond = self.frame_mut().pop()?.as_int()?;
                if cond == 0 {
                    self.frame_mut().ip = instr.operand as usize;
                } else {
                    self.frame_mut().ip += 1;
                }
                advance = false;
            }
            OpCode::Invoke => {
                self.invoke(instr.operand as usize, instr.operand2 as usize)?;
                advance = false;
            }
            OpCode::Return => {
                if self.frames.len() == 1 {
                    return Ok(true);
                }
                let mut finished = self.frames.pop().expect("checked len > 1");
                let v = finished.pop()?;
                let caller = self.frames.last_mut().expect("checked len > 1");
                caller.push(v);
                caller.ip += 1;
                advance = false;
            }
        }

        if advance {
            self.frame_mut().ip += 1;
        }
        Ok(false)
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("at least one live frame")
    }

    fn ensure_capacity(&mut self, request_bytes: usize) -> Result<(), RuntimeError> {
        if self.heap.would_exceed(request_bytes) {
            gc::collect(&mut self.heap, &self.frames);
            if self.heap.would_exceed(request_bytes) {
                return Err(RuntimeError::OutOfMemory);
            }
        }
        Ok(())
    }

    fn invoke(&mut self, slot: usize, nargs: usize) -> Result<(), RuntimeError> {
        let mut values = Vec::with_capacity(nargs);
        for _ in 0..nargs {
            values.push(self.frame_mut().pop()?);
        }
        values.reverse(); // [receiver, arg_1, .., arg_{n-1}] in source order

        let receiver = values[0];
        let recv_index = receiver.as_ptr()?;
        let class_index = self.heap.class_index_of(recv_index);
        let class_layout = &self.program.classes[class_index];
        let (decl_class, method_name) = class_layout
            .vtbl
            .get(slot)
            .ok_or_else(|| RuntimeError::MissingMethod(class_layout.name.clone(), slot))?
            .clone();
        let method_index = self
            .program
            .find_method(&decl_class, &method_name)
            .ok_or_else(|| RuntimeError::MissingMethod(decl_class.clone(), slot))?;
        let target = &self.program.methods[method_index];

        let mut locals = values;
        locals.resize(1 + target.args.len() + target.locals.len(), Value::int(0));
        self.frames.push(Frame::new(method_index, locals));
        Ok(())
    }
}

/// Runs a compiled program to completion, writing `print` output to `stdout`.
/// Mirrors `exec` (spec.md §4.3) but returns control instead of calling
/// `std::process::exit` itself, so the CLI layer owns the process exit code
/// and the interpreter stays callable from tests.
pub fn run<W: Write>(program: &Program, stdout: W) -> Result<(), RuntimeError> {
    Vm::new(program, stdout)?.run()
}
