//! Generate JSON Schema documents from Protocol Buffer messages.
//!
//! `proto-jsonschema-gen` reads a JSON descriptor set (messages, enums, fields
//! and their validation constraints) and writes one draft-07 JSON Schema per
//! message. Each schema accepts exactly the canonical JSON encodings that the
//! constraints allow.
//!
//! # Features
//!
//! - 64-bit integers accept both numbers and decimal strings
//! - Enums are spelled by value name; `in`/`not_in` resolve to names
//! - Required fields and required oneofs become `required` and `oneOf`
//! - Regex constraints are transpiled to the ECMA-262 subset JSON Schema uses
//! - Self-referencing and mutually recursive messages terminate via `$ref`
//! - Well-known types (`Duration`, `Timestamp`, `Struct`, `Any`, wrappers)
//!   follow their canonical JSON encoding
//! - Deterministic output: byte-identical across runs
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use proto_jsonschema_gen::codegen::{self, Options};
//! use proto_jsonschema_gen::pool::DescriptorPool;
//!
//! let pool = DescriptorPool::load(Path::new("descriptors.json"))?;
//! let stats = codegen::generate(&pool, Path::new("schemas/"), &Options::default())?;
//! eprintln!("Generated {} schemas", stats.messages_generated);
//! # Ok::<(), proto_jsonschema_gen::error::Error>(())
//! ```

pub mod codegen;
pub mod constraints;
pub mod descriptor;
pub mod error;
pub mod json_schema;
pub mod pattern;
pub mod pool;
pub mod translate;
pub mod type_map;
