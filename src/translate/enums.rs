//! Enum fields.
//!
//! Canonical JSON spells enum values by name, so every schema here is a
//! string schema over declared value names. Rules give integers, which are
//! resolved against the enum's declaration.

use crate::constraints::{EnumRules, FieldConstraints, Rules};
use crate::error::{Error, Result};
use crate::json_schema::{Schema, StringSchema};
use crate::pool::Enum;

use super::Context;

impl<'p> Context<'p> {
    /// `const`, then `in`, then `not_in`; without rules, a reference to the
    /// enum's definition.
    pub(super) fn schema_for_enum(
        &mut self,
        name: &str,
        constraints: &FieldConstraints,
    ) -> Result<Schema> {
        let enumeration: &'p Enum =
            self.pool
                .enumeration(name)
                .ok_or_else(|| Error::UnresolvedType {
                    path: self.path(),
                    kind: "enum",
                    name: name.to_string(),
                })?;
        tracing::debug!(enumeration = %enumeration.full_name, "enum");

        let rules = match self.rules(constraints)? {
            None => None,
            Some(Rules::Enum(rules)) => Some(rules),
            Some(rules) => return Err(self.mismatch(&rules, "enum")),
        };

        if let Some(schema) = rules
            .map(|rules| self.constrained_enum(enumeration, rules))
            .transpose()?
            .flatten()
        {
            return Ok(match enumeration.name_of(0) {
                Some(default) if constraints.ignores_default() => Schema::any_of([
                    StringSchema {
                        constant: Some(default.to_string()),
                        ..Default::default()
                    }
                    .into(),
                    schema,
                ]),
                _ => schema,
            });
        }

        self.ref_to(&enumeration.full_name, |_| Ok(define_enum(enumeration)))
    }

    /// The schema the rules allow; `None` when they narrow nothing beyond the
    /// declared values.
    fn constrained_enum(&self, enumeration: &Enum, rules: &EnumRules) -> Result<Option<Schema>> {
        if let Some(value) = rules.constant {
            return Ok(Some(
                StringSchema {
                    constant: Some(self.value_name(enumeration, value)?),
                    ..Default::default()
                }
                .into(),
            ));
        }

        if !rules.in_list.is_empty() {
            let names = rules
                .in_list
                .iter()
                .map(|&value| self.value_name(enumeration, value))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Some(StringSchema::with_enum(names).into()));
        }

        if !rules.not_in.is_empty() {
            let names: Vec<String> = enumeration
                .values
                .iter()
                .filter(|value| !rules.not_in.contains(&value.number))
                .map(|value| value.name.clone())
                .collect();
            if names.is_empty() {
                return Ok(Some(Schema::False));
            }
            return Ok(Some(StringSchema::with_enum(names).into()));
        }

        Ok(None)
    }

    fn value_name(&self, enumeration: &Enum, value: i32) -> Result<String> {
        enumeration
            .name_of(value)
            .map(str::to_string)
            .ok_or_else(|| Error::UnknownEnumValue {
                path: self.path(),
                enum_name: enumeration.full_name.clone(),
                value,
            })
    }
}

/// Every declared value name, aliases included.
fn define_enum(enumeration: &Enum) -> Schema {
    StringSchema::with_enum(
        enumeration
            .values
            .iter()
            .map(|value| value.name.clone())
            .collect(),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::fixtures::*;
    use crate::error::Error;

    const PERM: &str = r#"{"enum": ".test.v1.Perm"}"#;

    #[test]
    fn unconstrained_enum_is_a_shared_definition() {
        let document = translate_fields(
            r#"{"name": "a", "type": {"enum": ".test.v1.Perm"}},
               {"name": "b", "type": {"repeated": {"enum": "test.v1.Perm"}}}"#,
            "",
        )
        .unwrap();
        assert_eq!(
            document["properties"]["a"],
            json!({"$ref": "#/definitions/test.v1.Perm"})
        );
        assert_eq!(
            document["properties"]["b"]["items"],
            json!({"$ref": "#/definitions/test.v1.Perm"})
        );
        assert_eq!(
            document["definitions"],
            json!({"test.v1.Perm": {
                "type": "string",
                "enum": ["PERM_UNKNOWN", "PERM_READ", "PERM_WRITE"]
            }})
        );
    }

    #[test]
    fn const_in_and_not_in() {
        assert_eq!(
            field_schema(PERM, r#"{"enum": {"const": 2}}"#),
            json!({"type": "string", "const": "PERM_WRITE"})
        );
        assert_eq!(
            field_schema(PERM, r#"{"enum": {"in": [1, 2]}}"#),
            json!({"type": "string", "enum": ["PERM_READ", "PERM_WRITE"]})
        );
        assert_eq!(
            field_schema(PERM, r#"{"enum": {"not_in": [1]}}"#),
            json!({"type": "string", "enum": ["PERM_UNKNOWN", "PERM_WRITE"]})
        );
    }

    #[test]
    fn const_takes_precedence_over_sets() {
        assert_eq!(
            field_schema(PERM, r#"{"enum": {"const": 0, "in": [1]}}"#),
            json!({"type": "string", "const": "PERM_UNKNOWN"})
        );
    }

    #[test]
    fn excluding_every_value_matches_nothing() {
        assert_eq!(
            field_schema(PERM, r#"{"enum": {"not_in": [0, 1, 2, 3]}}"#),
            json!(false)
        );
    }

    #[test]
    fn defined_only_adds_nothing() {
        assert_eq!(
            field_schema(PERM, r#"{"enum": {"defined_only": true}}"#),
            json!({"$ref": "#/definitions/test.v1.Perm"})
        );
    }

    #[test]
    fn ignored_default_accepts_the_zero_value() {
        let document = document_for(
            PERM,
            r#"{"ignore": "if_default_value", "enum": {"in": [1, 2]}}"#,
        );
        assert_eq!(
            document["properties"]["f"],
            json!({"anyOf": [
                {"type": "string", "const": "PERM_UNKNOWN"},
                {"type": "string", "enum": ["PERM_READ", "PERM_WRITE"]}
            ]})
        );

        let validator = validator(&document);
        assert!(validator.is_valid(&json!({"f": "PERM_UNKNOWN"})));
        assert!(validator.is_valid(&json!({"f": "PERM_WRITE"})));
        assert!(!validator.is_valid(&json!({"f": "PERM_NONE"})));
    }

    #[test]
    fn ignored_default_without_value_rules_keeps_the_reference() {
        assert_eq!(
            field_schema(PERM, r#"{"ignore_empty": true, "enum": {"defined_only": true}}"#),
            json!({"$ref": "#/definitions/test.v1.Perm"})
        );
    }

    #[test]
    fn undeclared_values_are_fatal() {
        let err = field_error(PERM, r#"{"enum": {"in": [1, 9]}}"#);
        assert!(
            matches!(err, Error::UnknownEnumValue { value: 9, ref enum_name, .. } if enum_name == ".test.v1.Perm"),
            "{err}"
        );
        let err = field_error(PERM, r#"{"enum": {"const": -1}}"#);
        assert!(matches!(err, Error::UnknownEnumValue { value: -1, .. }), "{err}");
    }

    #[test]
    fn unresolved_enum_is_fatal() {
        let err = field_error(r#"{"enum": ".test.v1.Nope"}"#, "{}");
        assert!(matches!(err, Error::UnresolvedType { kind: "enum", .. }), "{err}");
    }
}
