//! Descriptor set types and loading.
//!
//! A descriptor set is the JSON rendering of the proto files being compiled:
//! files, their (nested) messages and enums, every field's type and the
//! validation constraints attached to fields and oneofs. Type references are
//! fully-qualified, as protoc hands them to plugins.

use std::path::Path;

use serde::Deserialize;

use crate::constraints::{FieldConstraints, OneofConstraints};
use crate::error::{Error, Result};

/// The full input to a compilation run.
#[derive(Debug, Deserialize)]
pub struct DescriptorSet {
    /// Names of the files to generate schemas for. Empty means every file.
    #[serde(default)]
    pub files_to_generate: Vec<String>,

    /// Every file in the graph, including dependencies of the targets.
    pub files: Vec<FileDescriptor>,
}

/// A single `.proto` file.
#[derive(Debug, Deserialize)]
pub struct FileDescriptor {
    /// Path-like file name (e.g., `"acme/v1/order.proto"`).
    pub name: String,

    /// Proto package (e.g., `"acme.v1"`). Empty for the root package.
    #[serde(default)]
    pub package: String,

    /// Top-level messages in declaration order.
    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,

    /// Top-level enums in declaration order.
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
}

/// A message declaration.
#[derive(Debug, Deserialize)]
pub struct MessageDescriptor {
    /// Short name (e.g., `"Order"`).
    pub name: String,

    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    /// Oneofs in declaration order. Members point here via [`FieldDescriptor::oneof`].
    #[serde(default)]
    pub oneofs: Vec<OneofDescriptor>,

    /// Nested message declarations.
    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,

    /// Nested enum declarations.
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
}

/// A field declaration.
#[derive(Debug, Deserialize)]
pub struct FieldDescriptor {
    /// Proto field name (e.g., `"order_id"`).
    pub name: String,

    /// JSON name. Derived from `name` when absent.
    #[serde(default)]
    pub json_name: Option<String>,

    /// The field's type.
    #[serde(rename = "type")]
    pub type_kind: TypeKind,

    /// Declared with the `optional` keyword (explicit presence).
    #[serde(default)]
    pub proto3_optional: bool,

    /// Name of the oneof this field belongs to, if any.
    #[serde(default)]
    pub oneof: Option<String>,

    /// Validation constraints. Absent means unconstrained.
    #[serde(default)]
    pub constraints: Option<FieldConstraints>,
}

/// A oneof declaration.
#[derive(Debug, Deserialize)]
pub struct OneofDescriptor {
    pub name: String,

    #[serde(default)]
    pub constraints: Option<OneofConstraints>,
}

/// An enum declaration.
#[derive(Debug, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,

    /// Values in declaration order. Aliases (same number) are allowed.
    pub values: Vec<EnumValueDescriptor>,
}

/// A single enum value.
#[derive(Debug, Clone, Deserialize)]
pub struct EnumValueDescriptor {
    /// Symbolic name (e.g., `"STATUS_ACTIVE"`).
    pub name: String,

    pub number: i32,
}

/// The type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// A singular scalar.
    Scalar(ScalarKind),
    /// A singular enum, by full name.
    Enum(String),
    /// A singular embedded message, by full name.
    Message(String),
    /// A map. Keys are always scalars.
    Map { key: ScalarKind, value: ElementKind },
    /// A repeated field.
    Repeated(ElementKind),
}

/// The element type of a map value or repeated field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Scalar(ScalarKind),
    Enum(String),
    Message(String),
}

/// Protobuf scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    /// The proto keyword for this type (e.g., `"sfixed64"`).
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Uint32 => "uint32",
            ScalarKind::Uint64 => "uint64",
            ScalarKind::Sint32 => "sint32",
            ScalarKind::Sint64 => "sint64",
            ScalarKind::Fixed32 => "fixed32",
            ScalarKind::Fixed64 => "fixed64",
            ScalarKind::Sfixed32 => "sfixed32",
            ScalarKind::Sfixed64 => "sfixed64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load a descriptor set from disk.
pub fn load_descriptor_set(path: &Path) -> Result<DescriptorSet> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let set: DescriptorSet = serde_json::from_str(&content)?;
    Ok(set)
}
