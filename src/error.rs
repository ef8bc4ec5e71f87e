//! Error types for the proto-jsonschema-gen crate.

use std::path::PathBuf;

/// Errors that can occur while compiling descriptors to JSON Schema.
///
/// Every variant is fatal: a run that hits one produces no output files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The descriptor set is structurally invalid (duplicate names, dangling
    /// oneof membership, unknown target file).
    #[error("descriptor error: {0}")]
    Descriptor(String),

    /// A field references an enum or message that is not in the descriptor set.
    #[error("{path}: unresolved {kind} type '{name}'")]
    UnresolvedType {
        path: String,
        kind: &'static str,
        name: String,
    },

    /// An enum `const`/`in` constraint names a number with no declared value.
    #[error("{path}: enum {enum_name} has no value numbered {value}")]
    UnknownEnumValue {
        path: String,
        enum_name: String,
        value: i32,
    },

    /// A `pattern` constraint is not valid in the source regex dialect, or uses
    /// syntax (look-around, backreferences) the target dialect cannot express.
    #[error("{path}: unsupported regular expression {pattern:?}")]
    Pattern {
        path: String,
        pattern: String,
        source: crate::pattern::PatternError,
    },

    /// A constraint payload could not be interpreted.
    #[error("{path}: malformed constraint: {reason}")]
    Constraint { path: String, reason: String },

    /// A type tag outside the closed set this compiler understands.
    #[error("{path}: unexpected type {kind}")]
    UnexpectedType { path: String, kind: String },

    /// Failed to write a generated schema file.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a file from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON parse or serialization error.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Document assembly error.
    #[error("codegen error: {0}")]
    Codegen(String),
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
