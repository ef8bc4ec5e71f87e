//! `google.protobuf` types with a dedicated JSON encoding.
//!
//! | Type | Schema |
//! |------|--------|
//! | `BoolValue`, `BytesValue`, `StringValue`, numeric wrappers | the wrapped scalar, rules included |
//! | `Duration` | string matching `<seconds>s`, inline |
//! | `Timestamp` | RFC 3339 `date-time` string, inline |
//! | `Any` | shared definition of an object with a `@type` URL |
//! | `Empty`, `Struct`, `ListValue`, `Value` | shared definitions |
//!
//! Shared definitions are keyed by the type's full name, so every field of
//! the same type in one document points at a single entry.

use crate::constraints::{
    AnyRules, DurationRules, DurationValue, FieldConstraints, Rules, TimestampRules,
};
use crate::descriptor::ScalarKind;
use crate::error::Result;
use crate::json_schema::{
    ArraySchema, GenericSchema, ObjectSchema, Schema, StringFormat, StringSchema,
};
use crate::pool::WellKnownType;

use super::Context;

/// Signed seconds with an optional fraction, suffixed `s`.
pub const DURATION_PATTERN: &str = r"^-?(0|[1-9]\d*)(\.\d+)?s$";

const TYPE_URL_PROPERTY: &str = "@type";

impl Context<'_> {
    pub(super) fn schema_for_well_known(
        &mut self,
        well_known: WellKnownType,
        constraints: &FieldConstraints,
    ) -> Result<Schema> {
        tracing::debug!(well_known = well_known.short_name(), "well-known type");
        match well_known {
            WellKnownType::BoolValue => self.constrained_scalar(ScalarKind::Bool, constraints),
            WellKnownType::BytesValue => self.constrained_scalar(ScalarKind::Bytes, constraints),
            WellKnownType::StringValue => self.constrained_scalar(ScalarKind::String, constraints),
            WellKnownType::DoubleValue => self.constrained_scalar(ScalarKind::Double, constraints),
            WellKnownType::FloatValue => self.constrained_scalar(ScalarKind::Float, constraints),
            WellKnownType::Int32Value => self.constrained_scalar(ScalarKind::Int32, constraints),
            WellKnownType::Int64Value => self.constrained_scalar(ScalarKind::Int64, constraints),
            WellKnownType::UInt32Value => self.constrained_scalar(ScalarKind::Uint32, constraints),
            WellKnownType::UInt64Value => self.constrained_scalar(ScalarKind::Uint64, constraints),

            WellKnownType::Any => {
                let rules = match self.rules(constraints)? {
                    None => None,
                    Some(Rules::Any(rules)) => Some(rules),
                    Some(rules) => return Err(self.mismatch(&rules, "google.protobuf.Any")),
                };
                self.schema_for_any(rules)
            }
            WellKnownType::Duration => {
                let rules = match self.rules(constraints)? {
                    None => None,
                    Some(Rules::Duration(rules)) => Some(rules),
                    Some(rules) => return Err(self.mismatch(&rules, "google.protobuf.Duration")),
                };
                self.schema_for_duration(rules)
            }
            WellKnownType::Timestamp => {
                let rules = match self.rules(constraints)? {
                    None => None,
                    Some(Rules::Timestamp(rules)) => Some(rules),
                    Some(rules) => return Err(self.mismatch(&rules, "google.protobuf.Timestamp")),
                };
                self.schema_for_timestamp(rules)
            }

            WellKnownType::Empty => {
                self.expect_no_rules(constraints, "google.protobuf.Empty")?;
                self.ref_to(&well_known.full_name(), |_| Ok(define_empty()))
            }
            WellKnownType::ListValue => {
                self.expect_no_rules(constraints, "google.protobuf.ListValue")?;
                self.ref_to(&well_known.full_name(), |cx| cx.define_list_value())
            }
            WellKnownType::Struct => {
                self.expect_no_rules(constraints, "google.protobuf.Struct")?;
                self.ref_to(&well_known.full_name(), |cx| cx.define_struct())
            }
            WellKnownType::Value => {
                self.expect_no_rules(constraints, "google.protobuf.Value")?;
                self.value_ref()
            }
        }
    }

    /// The `Any` definition, narrowed by type URL allow and deny lists.
    fn schema_for_any(&mut self, rules: Option<&AnyRules>) -> Result<Schema> {
        let any = self.ref_to(&WellKnownType::Any.full_name(), |_| Ok(define_any()))?;
        let mut schemas = vec![any];
        if let Some(rules) = rules {
            if !rules.in_list.is_empty() {
                schemas.push(type_url_in(&rules.in_list));
            }
            if !rules.not_in.is_empty() {
                schemas.push(Schema::not(type_url_in(&rules.not_in)));
            }
        }
        Ok(Schema::all_of(schemas))
    }

    fn schema_for_duration(&self, rules: Option<&DurationRules>) -> Result<Schema> {
        let mut schema = StringSchema {
            title: Some("Duration".into()),
            description: Some(
                "A signed, fixed-length span of time represented as a count of seconds and \
                 fractions of seconds at nanosecond resolution."
                    .into(),
            ),
            pattern: Some(DURATION_PATTERN.into()),
            ..Default::default()
        };

        let canonical = |value: &DurationValue| {
            value
                .to_json_string()
                .map_err(|reason| self.constraint_error(reason))
        };
        let mut excluded = None;
        if let Some(rules) = rules {
            if let Some(constant) = &rules.constant {
                schema.constant = Some(canonical(constant)?);
            }
            if !rules.in_list.is_empty() {
                schema.enumeration = rules.in_list.iter().map(canonical).collect::<Result<_>>()?;
            }
            if !rules.not_in.is_empty() {
                let excluded_values = rules.not_in.iter().map(canonical).collect::<Result<_>>()?;
                excluded = Some(Schema::not(StringSchema::with_enum(excluded_values).into()));
            }
        }

        Ok(Schema::all_of([Schema::String(schema)].into_iter().chain(excluded)))
    }

    fn schema_for_timestamp(&self, rules: Option<&TimestampRules>) -> Result<Schema> {
        let mut schema = StringSchema {
            title: Some("Timestamp".into()),
            description: Some("A point in time, independent of any time zone or calendar.".into()),
            format: Some(StringFormat::DateTime),
            ..Default::default()
        };
        if let Some(constant) = rules.and_then(|rules| rules.constant) {
            let constant = constant
                .to_json_string()
                .map_err(|reason| self.constraint_error(reason))?;
            schema.constant = Some(constant);
        }
        Ok(schema.into())
    }

    fn value_ref(&mut self) -> Result<Schema> {
        self.ref_to(&WellKnownType::Value.full_name(), |_| {
            Ok(GenericSchema {
                title: Some("Value".into()),
                description: Some("A dynamically-typed value.".into()),
            }
            .into())
        })
    }

    fn define_list_value(&mut self) -> Result<Schema> {
        Ok(ArraySchema {
            title: Some("ListValue".into()),
            description: Some("A repeated field of dynamically-typed values.".into()),
            items: Some(Box::new(self.value_ref()?)),
            ..Default::default()
        }
        .into())
    }

    fn define_struct(&mut self) -> Result<Schema> {
        Ok(ObjectSchema {
            title: Some("Struct".into()),
            description: Some(
                "A structured data value, consisting of fields which map to \
                 dynamically-typed values."
                    .into(),
            ),
            additional_properties: Some(Box::new(self.value_ref()?)),
            ..Default::default()
        }
        .into())
    }
}

fn define_any() -> Schema {
    let type_url = StringSchema {
        title: Some("Type URL".into()),
        description: Some(
            "A URL/resource name whose content describes the type of the serialized message."
                .into(),
        ),
        format: Some(StringFormat::UriReference),
        ..Default::default()
    };

    let mut any = ObjectSchema {
        title: Some("Any".into()),
        description: Some(
            "An arbitrary serialized message, along with a URL that describes the type of \
             the serialized message."
                .into(),
        ),
        additional_properties: Some(Box::new(Schema::True)),
        ..Default::default()
    };
    any.properties
        .insert(TYPE_URL_PROPERTY.to_string(), type_url.into());
    any.into()
}

fn define_empty() -> Schema {
    ObjectSchema {
        title: Some("Empty".into()),
        description: Some("A generic empty message.".into()),
        additional_properties: Some(Box::new(Schema::False)),
        ..Default::default()
    }
    .into()
}

/// An object whose `@type`, if present, is one of `type_urls`.
fn type_url_in(type_urls: &[String]) -> Schema {
    let mut object = ObjectSchema::default();
    object.properties.insert(
        TYPE_URL_PROPERTY.to_string(),
        StringSchema::with_enum(type_urls.to_vec()).into(),
    );
    object.into()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::fixtures::*;
    use super::DURATION_PATTERN;
    use crate::error::Error;

    const DURATION: &str = r#"{"message": ".google.protobuf.Duration"}"#;
    const TIMESTAMP: &str = r#"{"message": ".google.protobuf.Timestamp"}"#;
    const ANY: &str = r#"{"message": ".google.protobuf.Any"}"#;

    #[test]
    fn wrappers_are_their_scalars() {
        assert_eq!(
            field_schema(r#"{"message": ".google.protobuf.StringValue"}"#, r#"{"string": {"min_len": 2}}"#),
            json!({"type": "string", "minLength": 2})
        );
        assert_eq!(
            field_schema(r#"{"message": ".google.protobuf.UInt32Value"}"#, "{}"),
            json!({"type": "integer", "minimum": 0})
        );
        assert_eq!(
            field_schema(r#"{"message": ".google.protobuf.BoolValue"}"#, r#"{"bool": {"const": false}}"#),
            json!({"type": "boolean", "const": false})
        );
        assert!(
            field_schema(r#"{"message": ".google.protobuf.Int64Value"}"#, "{}")
                .get("oneOf")
                .is_some()
        );
    }

    #[test]
    fn wrapper_rules_must_match_the_wrapped_kind() {
        let err = field_error(
            r#"{"message": ".google.protobuf.Int32Value"}"#,
            r#"{"string": {"min_len": 1}}"#,
        );
        assert!(matches!(err, Error::Constraint { .. }), "{err}");
    }

    #[test]
    fn duration_is_inline() {
        let document = document_for(DURATION, "{}");
        assert_eq!(document["properties"]["f"]["type"], json!("string"));
        assert_eq!(document["properties"]["f"]["pattern"], json!(DURATION_PATTERN));
        assert!(document.get("definitions").is_none());

        let validator = validator(&document);
        assert!(validator.is_valid(&json!({"f": "1.5s"})));
        assert!(validator.is_valid(&json!({"f": "-30s"})));
        assert!(!validator.is_valid(&json!({"f": "30"})));
        assert!(!validator.is_valid(&json!({"f": "01s"})));
    }

    #[test]
    fn duration_rules() {
        let schema = field_schema(
            DURATION,
            r#"{"duration": {
                "const": {"seconds": 1, "nanos": 500000000},
                "in": [{"seconds": 1, "nanos": 500000000}, {"seconds": 2}],
                "not_in": [{"seconds": 3}]
            }}"#,
        );
        assert_eq!(schema["allOf"][0]["const"], json!("1.500s"));
        assert_eq!(schema["allOf"][0]["enum"], json!(["1.500s", "2s"]));
        assert_eq!(schema["allOf"][1], json!({"not": {"type": "string", "enum": ["3s"]}}));
    }

    #[test]
    fn out_of_range_duration_is_malformed() {
        let err = field_error(DURATION, r#"{"duration": {"const": {"seconds": 1, "nanos": -1}}}"#);
        assert!(matches!(err, Error::Constraint { .. }), "{err}");
    }

    #[test]
    fn timestamp_const() {
        assert_eq!(
            field_schema(TIMESTAMP, r#"{"timestamp": {"const": {"seconds": 0}}}"#),
            json!({
                "type": "string",
                "title": "Timestamp",
                "description": "A point in time, independent of any time zone or calendar.",
                "const": "1970-01-01T00:00:00Z",
                "format": "date-time"
            })
        );
    }

    #[test]
    fn any_with_type_url_lists() {
        let document = document_for(
            ANY,
            r#"{"required": true, "any": {
                "in": ["type.googleapis.com/a.B"],
                "not_in": ["type.googleapis.com/a.C"]
            }}"#,
        );
        assert_eq!(document["required"], json!(["f"]));
        assert_eq!(
            document["properties"]["f"]["allOf"][0],
            json!({"$ref": "#/definitions/google.protobuf.Any"})
        );
        assert_eq!(
            document["definitions"]["google.protobuf.Any"]["properties"]["@type"]["format"],
            json!("uri-reference")
        );

        let validator = validator(&document);
        assert!(validator.is_valid(&json!({"f": {"@type": "type.googleapis.com/a.B", "x": 1}})));
        assert!(!validator.is_valid(&json!({"f": {"@type": "type.googleapis.com/a.C"}})));
    }

    #[test]
    fn struct_and_value_share_a_definition() {
        let document = translate_fields(
            r#"{"name": "s", "type": {"message": ".google.protobuf.Struct"}},
               {"name": "v", "type": {"message": ".google.protobuf.Value"}},
               {"name": "l", "type": {"message": ".google.protobuf.ListValue"}},
               {"name": "e", "type": {"message": ".google.protobuf.Empty"}}"#,
            "",
        )
        .unwrap();
        let definitions = document["definitions"].as_object().unwrap();
        let keys: Vec<&str> = definitions.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "google.protobuf.Struct",
                "google.protobuf.Value",
                "google.protobuf.ListValue",
                "google.protobuf.Empty"
            ]
        );
        assert_eq!(
            definitions["google.protobuf.Struct"]["additionalProperties"],
            json!({"$ref": "#/definitions/google.protobuf.Value"})
        );
        assert_eq!(
            definitions["google.protobuf.ListValue"]["items"],
            json!({"$ref": "#/definitions/google.protobuf.Value"})
        );
        assert_eq!(definitions["google.protobuf.Empty"]["additionalProperties"], json!(false));

        let validator = validator(&document);
        assert!(validator.is_valid(&json!({"s": {"a": [1, "x", null]}, "v": null, "l": [{}], "e": {}})));
        assert!(!validator.is_valid(&json!({"e": {"a": 1}})));
    }

    #[test]
    fn rules_on_dynamic_types_are_rejected() {
        let err = field_error(
            r#"{"message": ".google.protobuf.Struct"}"#,
            r#"{"string": {"min_len": 1}}"#,
        );
        assert!(
            err.to_string().contains("string rules cannot be applied to google.protobuf.Struct fields"),
            "{err}"
        );
    }
}
