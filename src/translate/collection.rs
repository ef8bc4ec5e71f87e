//! Map and repeated fields.

use crate::constraints::{FieldConstraints, MapRules, RepeatedRules, Rules};
use crate::descriptor::{ElementKind, ScalarKind};
use crate::error::{Error, Result};
use crate::json_schema::{ArraySchema, ObjectSchema, Schema};
use crate::type_map::is_valid_map_key;

use super::Context;

impl Context<'_> {
    /// An object keyed by the map's keys, one value schema for every entry.
    ///
    /// JSON object keys are strings whatever the proto key type, so only
    /// string key rules become `propertyNames`. Rules on other key kinds are
    /// checked for consistency and otherwise have no JSON Schema spelling.
    pub(super) fn schema_for_map(
        &mut self,
        key: ScalarKind,
        value: &ElementKind,
        constraints: &FieldConstraints,
    ) -> Result<Schema> {
        tracing::debug!(%key, "map");
        if !is_valid_map_key(key) {
            return Err(Error::UnexpectedType {
                path: self.path(),
                kind: format!("map key {key}"),
            });
        }

        let rules: Option<&MapRules> = match self.rules(constraints)? {
            None => None,
            Some(Rules::Map(rules)) => Some(rules),
            Some(rules) => return Err(self.mismatch(&rules, "map")),
        };

        let value_constraints = rules
            .and_then(|rules| rules.values.as_ref())
            .map_or(FieldConstraints::none(), FieldConstraints::effective);
        let values = self.within("values", |cx| {
            cx.schema_for_element(value, value_constraints)
        })?;

        let mut object = ObjectSchema {
            additional_properties: Some(Box::new(values)),
            ..Default::default()
        };

        if let Some(rules) = rules {
            if let Some(keys) = &rules.keys {
                let keys = keys.effective();
                let key_schema = self.within("keys", |cx| cx.schema_for_scalar(key, keys))?;
                if key == ScalarKind::String && keys.string.is_some() {
                    object.property_names = Some(Box::new(key_schema));
                }
            }
            object.min_properties = rules.min_pairs;
            object.max_properties = rules.max_pairs;
        }

        Ok(object.into())
    }

    /// An array with one schema for every item.
    pub(super) fn schema_for_repeated(
        &mut self,
        element: &ElementKind,
        constraints: &FieldConstraints,
    ) -> Result<Schema> {
        tracing::debug!("repeated");
        let rules: Option<&RepeatedRules> = match self.rules(constraints)? {
            None => None,
            Some(Rules::Repeated(rules)) => Some(rules),
            Some(rules) => return Err(self.mismatch(&rules, "repeated")),
        };

        let item_constraints = rules
            .and_then(|rules| rules.items.as_ref())
            .map_or(FieldConstraints::none(), FieldConstraints::effective);
        let items = self.within("items", |cx| {
            cx.schema_for_element(element, item_constraints)
        })?;

        let mut array = ArraySchema {
            items: Some(Box::new(items)),
            ..Default::default()
        };
        if let Some(rules) = rules {
            array.min_items = rules.min_items;
            array.max_items = rules.max_items;
            array.unique_items = rules.unique;
        }

        Ok(array.into())
    }

    fn schema_for_element(
        &mut self,
        element: &ElementKind,
        constraints: &FieldConstraints,
    ) -> Result<Schema> {
        match element {
            ElementKind::Message(name) => self.schema_for_embed(name, constraints),
            ElementKind::Enum(name) => self.schema_for_enum(name, constraints),
            ElementKind::Scalar(kind) => self.schema_for_scalar(*kind, constraints),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::fixtures::*;
    use crate::error::Error;

    #[test]
    fn map_of_scalars() {
        assert_eq!(
            field_schema(
                r#"{"map": {"key": "string", "value": {"scalar": "int32"}}}"#,
                r#"{"map": {"min_pairs": 1, "max_pairs": 4,
                            "keys": {"string": {"pattern": "^[a-z]+$"}},
                            "values": {"int32": {"gte": 0}}}}"#
            ),
            json!({
                "type": "object",
                "additionalProperties": {"type": "integer", "minimum": 0},
                "propertyNames": {"type": "string", "pattern": "^[a-z]+$"},
                "minProperties": 1,
                "maxProperties": 4
            })
        );
    }

    #[test]
    fn unconstrained_map_of_messages() {
        let document = document_for(
            r#"{"map": {"key": "int64", "value": {"message": ".test.v1.Item"}}}"#,
            "{}",
        );
        assert_eq!(
            document["properties"]["f"],
            json!({
                "type": "object",
                "additionalProperties": {"$ref": "#/definitions/test.v1.Item"}
            })
        );
        assert!(document["definitions"].get("test.v1.Item").is_some());
    }

    #[test]
    fn non_string_key_rules_are_checked_but_not_emitted() {
        assert_eq!(
            field_schema(
                r#"{"map": {"key": "int32", "value": {"scalar": "bool"}}}"#,
                r#"{"map": {"keys": {"int32": {"gt": 0}}}}"#
            ),
            json!({"type": "object", "additionalProperties": {"type": "boolean"}})
        );

        let err = field_error(
            r#"{"map": {"key": "int32", "value": {"scalar": "bool"}}}"#,
            r#"{"map": {"keys": {"string": {"min_len": 1}}}}"#,
        );
        assert!(err.to_string().contains("f > keys"), "{err}");
    }

    #[test]
    fn float_keys_are_unexpected() {
        let err = field_error(
            r#"{"map": {"key": "double", "value": {"scalar": "bool"}}}"#,
            "{}",
        );
        assert!(matches!(err, Error::UnexpectedType { .. }), "{err}");
    }

    #[test]
    fn repeated_with_item_rules() {
        let document = document_for(
            r#"{"repeated": {"scalar": "string"}}"#,
            r#"{"repeated": {"min_items": 1, "max_items": 3, "unique": true,
                             "items": {"string": {"well_known": "hostname"}}}}"#,
        );
        assert_eq!(
            document["properties"]["f"],
            json!({
                "type": "array",
                "items": {"type": "string", "format": "hostname"},
                "minItems": 1,
                "maxItems": 3,
                "uniqueItems": true
            })
        );
    }

    #[test]
    fn repeated_unique_is_enforced() {
        let document = document_for(
            r#"{"repeated": {"scalar": "int32"}}"#,
            r#"{"repeated": {"unique": true, "items": {"int32": {"lt": 10}}}}"#,
        );
        let validator = validator(&document);
        assert!(validator.is_valid(&json!({"f": [1, 2, 3]})));
        assert!(!validator.is_valid(&json!({"f": [1, 1]})));
        assert!(!validator.is_valid(&json!({"f": [10]})));
    }

    #[test]
    fn item_rules_must_match_the_element() {
        let err = field_error(
            r#"{"repeated": {"scalar": "string"}}"#,
            r#"{"repeated": {"items": {"bool": {"const": true}}}}"#,
        );
        assert!(err.to_string().contains("f > items"), "{err}");
    }

    #[test]
    fn collection_rules_on_scalars_are_rejected() {
        let err = field_error(r#"{"scalar": "string"}"#, r#"{"repeated": {"min_items": 1}}"#);
        assert!(matches!(err, Error::Constraint { .. }), "{err}");
    }
}
