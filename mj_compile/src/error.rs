#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An assignment target resolved to neither an argument, a local, nor a
    /// field — spec.md §4.2's "Otherwise compile error" branch. Semantic
    /// analysis guarantees this can't happen for a well-typed program; this
    /// only fires if lowering runs on a program that skipped type-checking.
    #[error("cannot resolve `{0}` to an argument, local, or field")]
    UnresolvedVariable(String),
}
