#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("tag violation: expected {expected}")]
    TagViolation { expected: &'static str },

    #[error("out of memory")]
    OutOfMemory,

    #[error("class `{0}` has no vtable slot {1}")]
    MissingMethod(String, usize),

    #[error("no method-table entry named `main`")]
    MissingMain,
}
