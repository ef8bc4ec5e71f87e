//! Named definitions collected while generating one document.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::json_schema::Schema;

/// Definitions keyed by type name (no leading dot).
///
/// A key is reserved before its schema is built so that a recursive
/// reference to the same type finds it and stops. Every reservation must be
/// fulfilled before the document is finished.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    entries: IndexMap<String, Option<Schema>>,
}

impl DefinitionRegistry {
    /// Reserve `key`. Returns `false` if it is already reserved or defined.
    pub fn reserve(&mut self, key: &str) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), None);
        true
    }

    /// Store the schema for a reserved key.
    pub fn fulfill(&mut self, key: &str, schema: Schema) {
        self.entries.insert(key.to_string(), Some(schema));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The finished definitions, in reservation order.
    pub fn finish(self) -> Result<IndexMap<String, Schema>> {
        self.entries
            .into_iter()
            .map(|(key, schema)| match schema {
                Some(schema) => Ok((key, schema)),
                None => Err(Error::Codegen(format!(
                    "definition '{key}' was reserved but never built"
                ))),
            })
            .collect()
    }
}
