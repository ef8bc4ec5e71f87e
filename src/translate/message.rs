//! Messages, oneofs and field dispatch.

use crate::constraints::FieldConstraints;
use crate::descriptor::TypeKind;
use crate::error::{Error, Result};
use crate::json_schema::{ObjectSchema, Schema};
use crate::pool::{Field, Message, OneOf, WellKnownType};
use crate::type_map::definition_key;

use super::Context;

impl<'p> Context<'p> {
    /// The object schema for a message: one property per field, no others
    /// allowed, plus one `oneOf` conjunct per required oneof.
    pub(super) fn define_message(&mut self, message: &'p Message) -> Result<Schema> {
        let _span = tracing::debug_span!("define_message", message = %message.name).entered();
        self.within(definition_key(&message.full_name).to_string(), |cx| {
            cx.message_schema(message)
        })
    }

    fn message_schema(&mut self, message: &'p Message) -> Result<Schema> {
        let mut object = ObjectSchema {
            additional_properties: Some(Box::new(Schema::False)),
            ..Default::default()
        };

        for field in &message.fields {
            let schema = self.within(field.name.clone(), |cx| cx.schema_for_field(field))?;
            object.properties.insert(field.json_name.clone(), schema);
            if is_required(field) {
                object.required.push(field.json_name.clone());
            }
        }

        let mut schemas = vec![Schema::Object(object)];
        schemas.extend(
            message
                .oneofs
                .iter()
                .filter_map(|oneof| schema_for_oneof(message, oneof)),
        );
        Ok(Schema::all_of(schemas))
    }

    fn schema_for_field(&mut self, field: &'p Field) -> Result<Schema> {
        let _span = tracing::debug_span!("field", name = %field.name).entered();
        let constraints = field.constraints.effective();

        match &field.kind {
            TypeKind::Scalar(kind) => self.schema_for_scalar(*kind, constraints),
            TypeKind::Enum(name) => self.schema_for_enum(name, constraints),
            TypeKind::Message(name) => self.schema_for_embed(name, constraints),
            TypeKind::Map { key, value } => self.schema_for_map(*key, value, constraints),
            TypeKind::Repeated(element) => self.schema_for_repeated(element, constraints),
        }
    }

    /// An embedded message: a well-known type's fixed schema, or a reference
    /// to the message's definition.
    pub(super) fn schema_for_embed(
        &mut self,
        name: &str,
        constraints: &FieldConstraints,
    ) -> Result<Schema> {
        if let Some(well_known) = WellKnownType::from_full_name(name) {
            return self.schema_for_well_known(well_known, constraints);
        }

        let message = self
            .pool
            .message(name)
            .ok_or_else(|| Error::UnresolvedType {
                path: self.path(),
                kind: "message",
                name: name.to_string(),
            })?;
        self.expect_no_rules(constraints, "message")?;

        tracing::debug!(message = %message.full_name, "embed");
        self.ref_to(&message.full_name, |cx| cx.define_message(message))
    }
}

/// Required net of overrides: explicit presence and oneof membership both
/// clear the flag, as do the ignore policies folded into `is_required`.
fn is_required(field: &Field) -> bool {
    field.constraints.is_required() && !field.explicit_optional && !field.in_oneof()
}

/// Exactly one member present, for oneofs marked required.
fn schema_for_oneof(message: &Message, oneof: &OneOf) -> Option<Schema> {
    if !oneof.required {
        return None;
    }
    tracing::debug!(oneof = %oneof.name, "required oneof");

    let branches = message.oneof_members(oneof).map(|field| {
        let mut branch = ObjectSchema {
            required: vec![field.json_name.clone()],
            ..Default::default()
        };
        branch
            .properties
            .insert(field.json_name.clone(), Schema::True);
        Schema::Object(branch)
    });
    Some(Schema::one_of(branches))
}
