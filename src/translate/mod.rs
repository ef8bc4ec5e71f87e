//! Constraint-to-schema translation.
//!
//! One [`Context`] is created per top-level message. It holds the message
//! being generated (the anchor), the definition registry for that message's
//! document, and a breadcrumb path used in error messages. Translation is a
//! depth-first walk: messages reference other messages through
//! [`Context::ref_to`], which turns recursion into `$ref`s.
//!
//! | Submodule | Translates |
//! |-----------|------------|
//! | `message` | messages, oneofs, field dispatch, embedded messages |
//! | `scalar` | bool, string, bytes |
//! | `numeric` | the twelve numeric kinds |
//! | `enums` | enum fields |
//! | `collection` | maps and repeated fields |
//! | `well_known` | `google.protobuf` types |

mod collection;
mod enums;
mod message;
mod numeric;
mod registry;
mod scalar;
mod well_known;

use crate::constraints::{FieldConstraints, Rules};
use crate::error::{Error, Result};
use crate::json_schema::{Document, Schema};
use crate::pool::{DescriptorPool, Message};
use crate::type_map::definition_key;

use self::registry::DefinitionRegistry;

/// Translate one top-level message into its schema document.
///
/// The document carries no `$id`; the driver assigns one.
pub fn translate_message<'p>(pool: &'p DescriptorPool, message: &'p Message) -> Result<Document> {
    let _span = tracing::debug_span!("translate", message = %message.full_name).entered();

    let mut cx = Context::new(pool, &message.full_name);
    let root = cx.define_message(message)?;
    let definitions = cx.registry.finish()?;

    tracing::debug!(definitions = definitions.len(), "document complete");
    Ok(Document::new(root, definitions))
}

/// Per-document translation state.
pub struct Context<'p> {
    pool: &'p DescriptorPool,
    /// Full name of the message whose document is being generated.
    anchor: String,
    registry: DefinitionRegistry,
    /// Breadcrumbs: message keys and field names.
    path: Vec<String>,
}

impl<'p> Context<'p> {
    pub fn new(pool: &'p DescriptorPool, anchor: &str) -> Self {
        Context {
            pool,
            anchor: anchor.to_string(),
            registry: DefinitionRegistry::default(),
            path: Vec::new(),
        }
    }

    /// A reference to the named type, building its definition on first use.
    ///
    /// The anchor resolves to `#`. Any other type is reserved in the registry
    /// before `build` runs, so a cycle back to it yields a plain reference.
    fn ref_to(
        &mut self,
        full_name: &str,
        build: impl FnOnce(&mut Self) -> Result<Schema>,
    ) -> Result<Schema> {
        if full_name == self.anchor {
            tracing::debug!(name = full_name, "self reference");
            return Ok(Schema::self_ref());
        }

        let key = definition_key(full_name).to_string();
        if self.registry.reserve(&key) {
            tracing::debug!(key = %key, "building definition");
            let schema = build(self)?;
            self.registry.fulfill(&key, schema);
        }
        Ok(Schema::definition_ref(&key))
    }

    /// Run `build` with `segment` appended to the breadcrumb path.
    fn within<T>(
        &mut self,
        segment: impl Into<String>,
        build: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.path.push(segment.into());
        let result = build(self);
        self.path.pop();
        result
    }

    fn path(&self) -> String {
        self.path.join(" > ")
    }

    fn constraint_error(&self, reason: impl Into<String>) -> Error {
        Error::Constraint {
            path: self.path(),
            reason: reason.into(),
        }
    }

    /// The rule set on `constraints`, if any.
    fn rules<'c>(&self, constraints: &'c FieldConstraints) -> Result<Option<Rules<'c>>> {
        constraints
            .rules()
            .map_err(|reason| self.constraint_error(reason))
    }

    fn mismatch(&self, rules: &Rules<'_>, target: &str) -> Error {
        self.constraint_error(format!(
            "{} rules cannot be applied to {target} fields",
            rules.name()
        ))
    }

    /// Fail if `constraints` carries any rule set.
    fn expect_no_rules(&self, constraints: &FieldConstraints, target: &str) -> Result<()> {
        match self.rules(constraints)? {
            Some(rules) => Err(self.mismatch(&rules, target)),
            None => Ok(()),
        }
    }
}
