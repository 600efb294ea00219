//! Fatal, single-shot failures that abort a compiler phase outright (§7),
//! distinct from the [`crate::diagnostics::Diagnostics`] list used for
//! recoverable lexical/syntactic/semantic problems. Binary *loading* errors
//! live in `kryon-runtime`'s own `error` module instead, next to the reader
//! that actually produces them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpansionError {
    #[error("`@include` cycle detected at `{0}`")]
    IncludeCycle(String),
    #[error("`@include` depth exceeded {max} at `{path}`")]
    IncludeDepthExceeded { path: String, max: u32 },
    #[error("unknown component `{0}`")]
    UnknownComponent(String),
    #[error("inheritance cycle detected for component `{0}`")]
    InheritanceCycle(String),
    #[error("failed to read included file `{path}`: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error(transparent)]
    Table(#[from] kryon_krb::TableError),
    #[error("string table exceeds u32 capacity")]
    StringTableOverflow,
    #[error("property `{property}` on `{element}` has a value shape codegen cannot encode: {shape}")]
    UnsupportedValueShape { element: String, property: String, shape: String },
    #[error("{what} count {actual} exceeds the {max} the binary format allows")]
    CountOverflow { what: String, actual: usize, max: usize },
    #[error("compilation aborted: {0} blocking diagnostic(s)")]
    BlockingDiagnostics(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum KirError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unsupported KIR major version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Wraps whichever phase failed when driving the whole pipeline end to end
/// (§5). Callers that only want one phase use that phase's own error type
/// directly instead of this one.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    #[error(transparent)]
    Kir(#[from] KirError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
