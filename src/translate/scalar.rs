//! Bool, string and bytes fields, and scalar dispatch.

use std::iter;

use crate::constraints::{FieldConstraints, Rules, StringRules, WellKnownString};
use crate::descriptor::ScalarKind;
use crate::error::{Error, Result};
use crate::json_schema::{BooleanSchema, NumberSchema, Schema, StringFormat, StringSchema};
use crate::pattern::{quote_meta, transpile};
use crate::type_map::{NumericShape, decimal_string_pattern, numeric_shape};

use super::Context;

/// Standard alphabet, optional padding, line breaks allowed.
const STANDARD_BASE64_PATTERN: &str = r"^[\r\nA-Za-z0-9+/]*(?:=[\r\n]*){0,2}$";

/// URL-safe alphabet, optional padding, line breaks allowed.
const URL_SAFE_BASE64_PATTERN: &str = r"^[\r\nA-Za-z0-9_-]*(?:=[\r\n]*){0,2}$";

impl Context<'_> {
    /// A scalar field, list item or map entry.
    ///
    /// When the rules are skipped for the default value, that value is
    /// accepted as an alternative to the constrained schema.
    pub(super) fn schema_for_scalar(
        &mut self,
        kind: ScalarKind,
        constraints: &FieldConstraints,
    ) -> Result<Schema> {
        let schema = self.constrained_scalar(kind, constraints)?;
        if !constraints.ignores_default() || matches!(constraints.rules(), Ok(None)) {
            return Ok(schema);
        }

        let defaults = default_value(kind);
        if defaults.is_empty() {
            return Ok(schema);
        }
        tracing::debug!(%kind, "default value exempt from rules");
        Ok(Schema::any_of(defaults.into_iter().chain(iter::once(schema))))
    }

    /// A scalar with its rules applied unconditionally. Wrapper types use this
    /// directly: a set wrapper is never the default.
    pub(super) fn constrained_scalar(
        &mut self,
        kind: ScalarKind,
        constraints: &FieldConstraints,
    ) -> Result<Schema> {
        tracing::debug!(%kind, "scalar");
        let rules = self.rules(constraints)?;

        match (kind, rules) {
            (ScalarKind::Bool, None) => Ok(BooleanSchema::default().into()),
            (ScalarKind::Bool, Some(Rules::Bool(rules))) => Ok(BooleanSchema {
                constant: rules.constant,
                ..Default::default()
            }
            .into()),
            (ScalarKind::Bytes, None | Some(Rules::Bytes(_))) => Ok(schema_for_bytes()),
            (ScalarKind::String, None) => Ok(StringSchema::default().into()),
            (ScalarKind::String, Some(Rules::String(rules))) => self.schema_for_string(rules),
            (kind, None) => self.schema_for_numeric(kind, None),
            (kind, Some(Rules::Numeric(rules_kind, bounds))) if rules_kind == kind => {
                self.schema_for_numeric(kind, Some(&bounds))
            }
            (kind, Some(rules)) => Err(self.mismatch(&rules, kind.as_str())),
        }
    }

    /// A string schema with every string rule applied.
    ///
    /// Rules that fit on one schema are set on it directly; `not_contains`,
    /// `not_in` and compound formats become extra conjuncts. Substring and
    /// regex rules are collected as pattern fragments: one fragment goes in
    /// `pattern`, several become one conjunct each.
    pub(super) fn schema_for_string(&self, rules: &StringRules) -> Result<Schema> {
        let mut schema = StringSchema::default();
        let mut conjuncts = Vec::new();
        let mut patterns = Vec::new();

        if let Some(constant) = &rules.constant {
            schema.constant = Some(constant.clone());
        }
        if let Some(contains) = &rules.contains {
            patterns.push(quote_meta(contains));
        }
        if !rules.in_list.is_empty() {
            schema.enumeration = rules.in_list.clone();
        }
        if let Some(len) = rules.len {
            schema.min_length = Some(len);
            schema.max_length = Some(len);
        }
        if let Some(max_len) = rules.max_len {
            schema.max_length = Some(max_len);
        }
        if let Some(min_len) = rules.min_len {
            schema.min_length = Some(min_len);
        }
        if let Some(not_contains) = &rules.not_contains {
            conjuncts.push(Schema::not(
                StringSchema::with_pattern(quote_meta(not_contains)).into(),
            ));
        }
        if !rules.not_in.is_empty() {
            conjuncts.push(Schema::not(
                StringSchema::with_enum(rules.not_in.clone()).into(),
            ));
        }
        if let Some(pattern) = &rules.pattern {
            let transpiled = transpile(pattern).map_err(|source| Error::Pattern {
                path: self.path(),
                pattern: pattern.clone(),
                source,
            })?;
            patterns.push(transpiled);
        }
        match (&rules.prefix, &rules.suffix) {
            (Some(prefix), Some(suffix)) => patterns.push(prefix_suffix_pattern(prefix, suffix)),
            (Some(prefix), None) => patterns.push(format!("^{}", quote_meta(prefix))),
            (None, Some(suffix)) => patterns.push(format!("{}$", quote_meta(suffix))),
            (None, None) => {}
        }
        if let Some(well_known) = rules.well_known {
            match well_known {
                WellKnownString::Address => conjuncts.push(any_format([
                    StringFormat::Hostname,
                    StringFormat::Ipv4,
                    StringFormat::Ipv6,
                ])),
                WellKnownString::Ip => {
                    conjuncts.push(any_format([StringFormat::Ipv4, StringFormat::Ipv6]))
                }
                WellKnownString::Email => schema.format = Some(StringFormat::Email),
                WellKnownString::Hostname => schema.format = Some(StringFormat::Hostname),
                WellKnownString::Ipv4 => schema.format = Some(StringFormat::Ipv4),
                WellKnownString::Ipv6 => schema.format = Some(StringFormat::Ipv6),
                WellKnownString::Uri => schema.format = Some(StringFormat::Uri),
                WellKnownString::UriRef => schema.format = Some(StringFormat::UriReference),
            }
        }

        if patterns.len() == 1 {
            schema.pattern = patterns.pop();
        }
        let fragments = patterns
            .into_iter()
            .map(|pattern| Schema::String(StringSchema::with_pattern(pattern)));

        Ok(Schema::all_of(
            iter::once(Schema::String(schema))
                .chain(conjuncts)
                .chain(fragments),
        ))
    }
}

/// Schemas accepting exactly the default value of `kind`, in each canonical
/// JSON spelling. Empty for bytes, which carry no content rules.
fn default_value(kind: ScalarKind) -> Vec<Schema> {
    match kind {
        ScalarKind::Bool => vec![
            BooleanSchema {
                constant: Some(false),
                ..Default::default()
            }
            .into(),
        ],
        ScalarKind::String => vec![
            StringSchema {
                constant: Some(String::new()),
                ..Default::default()
            }
            .into(),
        ],
        ScalarKind::Bytes => Vec::new(),
        kind => {
            let zero = NumberSchema {
                constant: Some(0.into()),
                ..Default::default()
            };
            let mut defaults = vec![match numeric_shape(kind) {
                Some(NumericShape::Number) => Schema::Number(zero),
                _ => Schema::Integer(zero),
            }];
            if decimal_string_pattern(kind).is_some() {
                defaults.push(
                    StringSchema {
                        constant: Some("0".to_string()),
                        ..Default::default()
                    }
                    .into(),
                );
            }
            defaults
        }
    }
}

/// Either base64 alphabet; canonical JSON may use either.
fn schema_for_bytes() -> Schema {
    Schema::any_of([
        StringSchema {
            title: Some("Standard base64 encoding".to_string()),
            pattern: Some(STANDARD_BASE64_PATTERN.to_string()),
            ..Default::default()
        }
        .into(),
        StringSchema {
            title: Some("URL-safe base64 encoding".to_string()),
            pattern: Some(URL_SAFE_BASE64_PATTERN.to_string()),
            ..Default::default()
        }
        .into(),
    ])
}

fn any_format(formats: impl IntoIterator<Item = StringFormat>) -> Schema {
    Schema::any_of(
        formats
            .into_iter()
            .map(|format| StringSchema::with_format(format).into()),
    )
}

/// One anchored pattern for a string that starts with `prefix` and ends with
/// `suffix`.
///
/// Strings shorter than `prefix + suffix` qualify when the two overlap, so
/// every overlap `prefix + suffix[k..]` is listed as an alternative.
fn prefix_suffix_pattern(prefix: &str, suffix: &str) -> String {
    let general = format!(r"{}[\s\S]*{}", quote_meta(prefix), quote_meta(suffix));

    let overlaps: Vec<String> = suffix
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(iter::once(suffix.len()))
        .filter(|&split| split > 0 && prefix.ends_with(&suffix[..split]))
        .map(|split| quote_meta(&format!("{prefix}{}", &suffix[split..])))
        .collect();

    if overlaps.is_empty() {
        format!("^{general}$")
    } else {
        format!("^(?:{general}|{})$", overlaps.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::fixtures::*;
    use super::*;

    const STRING: &str = r#"{"scalar": "string"}"#;

    #[test]
    fn bool_const() {
        assert_eq!(
            field_schema(r#"{"scalar": "bool"}"#, r#"{"bool": {"const": true}}"#),
            json!({"type": "boolean", "const": true})
        );
    }

    #[test]
    fn bytes_accept_either_alphabet() {
        let document = document_for(r#"{"scalar": "bytes"}"#, "{}");
        assert_eq!(
            document["properties"]["f"]["anyOf"][0]["pattern"],
            json!(STANDARD_BASE64_PATTERN)
        );

        let validator = validator(&document);
        assert!(validator.is_valid(&json!({"f": "aGVsbG8="})));
        assert!(validator.is_valid(&json!({"f": "-_8="})));
        assert!(validator.is_valid(&json!({"f": "+/8\r\n="})));
        assert!(!validator.is_valid(&json!({"f": "a*b"})));
        assert!(!validator.is_valid(&json!({"f": "ab==="})));
    }

    #[test]
    fn string_rules_on_one_schema() {
        assert_eq!(
            field_schema(
                STRING,
                r#"{"string": {"const": "x", "in": ["x", "y"], "min_len": 1, "max_len": 3,
                               "well_known": "email"}}"#
            ),
            json!({
                "type": "string", "const": "x", "enum": ["x", "y"],
                "format": "email", "minLength": 1, "maxLength": 3
            })
        );
        assert_eq!(
            field_schema(STRING, r#"{"string": {"len": 4}}"#),
            json!({"type": "string", "minLength": 4, "maxLength": 4})
        );
    }

    #[test]
    fn negated_string_rules() {
        assert_eq!(
            field_schema(STRING, r#"{"string": {"not_contains": "a.b", "not_in": ["z"]}}"#),
            json!({"allOf": [
                {"type": "string"},
                {"not": {"type": "string", "pattern": "a\\.b"}},
                {"not": {"type": "string", "enum": ["z"]}}
            ]})
        );
    }

    #[test]
    fn compound_formats_are_disjunctive() {
        assert_eq!(
            field_schema(STRING, r#"{"string": {"well_known": "address"}}"#),
            json!({"allOf": [
                {"type": "string"},
                {"anyOf": [
                    {"type": "string", "format": "hostname"},
                    {"type": "string", "format": "ipv4"},
                    {"type": "string", "format": "ipv6"}
                ]}
            ]})
        );
        assert_eq!(
            field_schema(STRING, r#"{"string": {"well_known": "ip"}}"#)["allOf"][1]["anyOf"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn single_pattern_fragment_goes_inline() {
        assert_eq!(
            field_schema(STRING, r#"{"string": {"pattern": "^[a-z]+\\z"}}"#),
            json!({"type": "string", "pattern": "^[a-z]+$"})
        );
        assert_eq!(
            field_schema(STRING, r#"{"string": {"contains": "?"}}"#),
            json!({"type": "string", "pattern": "\\?"})
        );
    }

    #[test]
    fn negated_posix_class_is_spelled_as_ranges() {
        assert_eq!(
            field_schema(STRING, r#"{"string": {"pattern": "^[[:^digit:]]+$"}}"#),
            json!({"type": "string", "pattern": "^[\\x00-/:-\\uFFFF]+$"})
        );
    }

    #[test]
    fn prefix_and_suffix_make_one_fragment() {
        let document = document_for(STRING, r#"{"string": {"prefix": "ab", "suffix": "cd"}}"#);
        assert_eq!(
            document["properties"]["f"],
            json!({"type": "string", "pattern": "^ab[\\s\\S]*cd$"})
        );

        let validator = validator(&document);
        assert!(validator.is_valid(&json!({"f": "abcd"})));
        assert!(validator.is_valid(&json!({"f": "ab\nxcd"})));
        assert!(!validator.is_valid(&json!({"f": "abc"})));
    }

    #[test]
    fn several_fragments_become_conjuncts() {
        assert_eq!(
            field_schema(
                STRING,
                r#"{"string": {"contains": "x", "prefix": "a", "min_len": 2}}"#
            ),
            json!({"allOf": [
                {"type": "string", "minLength": 2},
                {"type": "string", "pattern": "x"},
                {"type": "string", "pattern": "^a"}
            ]})
        );
    }

    #[test]
    fn overlapping_prefix_and_suffix() {
        assert_eq!(prefix_suffix_pattern("ab", "cd"), r"^ab[\s\S]*cd$");
        assert_eq!(prefix_suffix_pattern("ab", "b"), r"^(?:ab[\s\S]*b|ab)$");
        assert_eq!(
            prefix_suffix_pattern("aba", "abc"),
            r"^(?:aba[\s\S]*abc|ababc)$"
        );
        assert_eq!(prefix_suffix_pattern("aa", "aa"), r"^(?:aa[\s\S]*aa|aaa|aa)$");
        assert_eq!(prefix_suffix_pattern("a.", ".b"), r"^(?:a\.[\s\S]*\.b|a\.b)$");
        assert_eq!(prefix_suffix_pattern("x", ""), r"^x[\s\S]*$");
    }

    #[test]
    fn invalid_pattern_is_fatal() {
        let err = field_error(STRING, r#"{"string": {"pattern": "a(?!b)"}}"#);
        assert!(matches!(err, Error::Pattern { ref pattern, .. } if pattern == "a(?!b)"), "{err}");
    }

    #[test]
    fn ignored_default_string_stays_valid() {
        let document = document_for(
            STRING,
            r#"{"ignore": "if_default_value", "string": {"min_len": 3}}"#,
        );
        assert_eq!(
            document["properties"]["f"],
            json!({"anyOf": [
                {"type": "string", "const": ""},
                {"type": "string", "minLength": 3}
            ]})
        );

        let validator = validator(&document);
        assert!(validator.is_valid(&json!({"f": ""})));
        assert!(validator.is_valid(&json!({"f": "abc"})));
        assert!(!validator.is_valid(&json!({"f": "ab"})));
    }

    #[test]
    fn ignored_default_numbers_stay_valid() {
        let document = document_for(
            r#"{"scalar": "int32"}"#,
            r#"{"ignore": "if_default_value", "int32": {"gt": 5}}"#,
        );
        let validator = validator(&document);
        assert!(validator.is_valid(&json!({"f": 0})));
        assert!(validator.is_valid(&json!({"f": 6})));
        assert!(!validator.is_valid(&json!({"f": 3})));

        let schema = field_schema(
            r#"{"scalar": "uint64"}"#,
            r#"{"ignore_empty": true, "uint64": {"gte": 10}}"#,
        );
        assert_eq!(schema["anyOf"][0], json!({"type": "integer", "const": 0}));
        assert_eq!(schema["anyOf"][1], json!({"type": "string", "const": "0"}));
        assert_eq!(schema["anyOf"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn ignored_default_bool() {
        assert_eq!(
            field_schema(
                r#"{"scalar": "bool"}"#,
                r#"{"ignore": "if_default_value", "bool": {"const": true}}"#
            ),
            json!({"anyOf": [
                {"type": "boolean", "const": false},
                {"type": "boolean", "const": true}
            ]})
        );
    }

    #[test]
    fn default_applies_rules_unless_ignored() {
        assert_eq!(
            field_schema(STRING, r#"{"ignore": "if_unpopulated", "string": {"min_len": 3}}"#),
            json!({"type": "string", "minLength": 3})
        );
        assert_eq!(
            field_schema(STRING, r#"{"ignore": "if_default_value"}"#),
            json!({"type": "string"})
        );
    }

    #[test]
    fn mismatched_rules_are_fatal() {
        let err = field_error(STRING, r#"{"int32": {"gt": 1}}"#);
        assert!(
            err.to_string().contains("int32 rules cannot be applied to string fields"),
            "{err}"
        );
        let err = field_error(r#"{"scalar": "bool"}"#, r#"{"string": {}}"#);
        assert!(matches!(err, Error::Constraint { .. }), "{err}");
    }
}
