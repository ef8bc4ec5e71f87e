//! Validation constraint vocabulary.
//!
//! Field constraints carry field-level flags (`required`, `ignore`) and at most
//! one kind-specific rule set. The twelve numeric rule sets share a single
//! generic shape, [`NumericRules`], and are normalized to [`NumericBounds`]
//! (JSON numbers) when read, so the numeric translator handles every width and
//! signedness the same way.
//!
//! Every rule struct rejects unknown keys: a constraint the compiler cannot
//! express is a hard error, never a silently more permissive schema.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat};
use serde::Deserialize;
use serde_json::Number;

use crate::descriptor::ScalarKind;

/// When rules on a field are skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ignore {
    #[default]
    Unspecified,
    IfUnpopulated,
    IfDefaultValue,
    Always,
}

/// Constraints attached to a single field (or to a map key/value or list item).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldConstraints {
    pub required: bool,
    pub ignore: Ignore,
    /// Legacy spelling of `ignore: if_default_value`.
    pub ignore_empty: bool,

    pub float: Option<NumericRules<f32>>,
    pub double: Option<NumericRules<f64>>,
    pub int32: Option<NumericRules<i32>>,
    pub int64: Option<NumericRules<i64>>,
    pub uint32: Option<NumericRules<u32>>,
    pub uint64: Option<NumericRules<u64>>,
    pub sint32: Option<NumericRules<i32>>,
    pub sint64: Option<NumericRules<i64>>,
    pub fixed32: Option<NumericRules<u32>>,
    pub fixed64: Option<NumericRules<u64>>,
    pub sfixed32: Option<NumericRules<i32>>,
    pub sfixed64: Option<NumericRules<i64>>,

    #[serde(rename = "bool")]
    pub boolean: Option<BoolRules>,
    pub string: Option<StringRules>,
    pub bytes: Option<BytesRules>,
    #[serde(rename = "enum")]
    pub enumeration: Option<EnumRules>,
    pub repeated: Option<Box<RepeatedRules>>,
    pub map: Option<Box<MapRules>>,
    pub any: Option<AnyRules>,
    pub duration: Option<DurationRules>,
    pub timestamp: Option<TimestampRules>,
}

static NO_CONSTRAINTS: LazyLock<FieldConstraints> = LazyLock::new(FieldConstraints::default);

impl FieldConstraints {
    /// Shared empty constraints, for fields that declare none.
    pub fn none() -> &'static FieldConstraints {
        &NO_CONSTRAINTS
    }

    /// The constraints that actually apply: none at all under `ignore: always`.
    pub fn effective(&self) -> &FieldConstraints {
        if self.ignore == Ignore::Always {
            Self::none()
        } else {
            self
        }
    }

    /// Whether the field must be present.
    ///
    /// A field that is ignored when it holds its default value cannot be
    /// required: absence and the default are indistinguishable.
    pub fn is_required(&self) -> bool {
        self.required
            && !self.ignore_empty
            && !matches!(self.ignore, Ignore::IfDefaultValue | Ignore::Always)
    }

    /// Whether the rules are skipped while the field holds its default value.
    pub fn ignores_default(&self) -> bool {
        self.ignore_empty || self.ignore == Ignore::IfDefaultValue
    }

    /// The kind-specific rule set, if any.
    ///
    /// Fails when more than one rule set is present or a numeric bound is
    /// malformed.
    pub fn rules(&self) -> Result<Option<Rules<'_>>, String> {
        let mut found = Vec::new();

        let numeric = [
            (ScalarKind::Float, self.float.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Double, self.double.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Int32, self.int32.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Int64, self.int64.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Uint32, self.uint32.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Uint64, self.uint64.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Sint32, self.sint32.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Sint64, self.sint64.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Fixed32, self.fixed32.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Fixed64, self.fixed64.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Sfixed32, self.sfixed32.as_ref().map(NumericRules::bounds)),
            (ScalarKind::Sfixed64, self.sfixed64.as_ref().map(NumericRules::bounds)),
        ];
        for (kind, bounds) in numeric {
            if let Some(bounds) = bounds {
                let bounds = bounds.map_err(|e| format!("{kind} rules: {e}"))?;
                found.push(Rules::Numeric(kind, bounds));
            }
        }

        if let Some(rules) = &self.boolean {
            found.push(Rules::Bool(rules));
        }
        if let Some(rules) = &self.string {
            found.push(Rules::String(rules));
        }
        if let Some(rules) = &self.bytes {
            found.push(Rules::Bytes(rules));
        }
        if let Some(rules) = &self.enumeration {
            found.push(Rules::Enum(rules));
        }
        if let Some(rules) = &self.repeated {
            found.push(Rules::Repeated(rules));
        }
        if let Some(rules) = &self.map {
            found.push(Rules::Map(rules));
        }
        if let Some(rules) = &self.any {
            found.push(Rules::Any(rules));
        }
        if let Some(rules) = &self.duration {
            found.push(Rules::Duration(rules));
        }
        if let Some(rules) = &self.timestamp {
            found.push(Rules::Timestamp(rules));
        }

        if found.len() > 1 {
            let names: Vec<&str> = found.iter().map(Rules::name).collect();
            return Err(format!(
                "at most one rule set may be given, found {}",
                names.join(", ")
            ));
        }
        Ok(found.pop())
    }
}

/// A borrowed view of the one rule set a field carries.
#[derive(Debug)]
pub enum Rules<'a> {
    Numeric(ScalarKind, NumericBounds),
    Bool(&'a BoolRules),
    String(&'a StringRules),
    Bytes(&'a BytesRules),
    Enum(&'a EnumRules),
    Repeated(&'a RepeatedRules),
    Map(&'a MapRules),
    Any(&'a AnyRules),
    Duration(&'a DurationRules),
    Timestamp(&'a TimestampRules),
}

impl Rules<'_> {
    /// The payload key this rule set was read from.
    pub fn name(&self) -> &'static str {
        match self {
            Rules::Numeric(kind, _) => kind.as_str(),
            Rules::Bool(_) => "bool",
            Rules::String(_) => "string",
            Rules::Bytes(_) => "bytes",
            Rules::Enum(_) => "enum",
            Rules::Repeated(_) => "repeated",
            Rules::Map(_) => "map",
            Rules::Any(_) => "any",
            Rules::Duration(_) => "duration",
            Rules::Timestamp(_) => "timestamp",
        }
    }
}

// ── Numeric rules ──────────────────────────────────────────────────────

/// Rules for one numeric kind, in that kind's native Rust type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NumericRules<T> {
    #[serde(rename = "const")]
    pub constant: Option<T>,
    pub gt: Option<T>,
    pub gte: Option<T>,
    pub lt: Option<T>,
    pub lte: Option<T>,
    #[serde(rename = "in")]
    pub in_list: Vec<T>,
    pub not_in: Vec<T>,
}

/// Numeric rules normalized to JSON numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericBounds {
    pub constant: Option<Number>,
    pub gt: Option<Number>,
    pub gte: Option<Number>,
    pub lt: Option<Number>,
    pub lte: Option<Number>,
    pub in_list: Vec<Number>,
    pub not_in: Vec<Number>,
}

/// A protobuf numeric value that has an exact JSON number spelling.
pub trait NumericValue: Copy {
    /// `None` for values JSON cannot represent (NaN, infinities).
    fn to_number(self) -> Option<Number>;
}

macro_rules! integer_numeric_value {
    ($($t:ty),*) => {
        $(impl NumericValue for $t {
            fn to_number(self) -> Option<Number> {
                Some(Number::from(self))
            }
        })*
    };
}

integer_numeric_value!(i32, i64, u32, u64);

impl NumericValue for f64 {
    fn to_number(self) -> Option<Number> {
        Number::from_f64(self)
    }
}

impl NumericValue for f32 {
    // Widening 0.1f32 directly gives 0.10000000149011612; going through the
    // shortest f32 spelling keeps the value the author wrote.
    fn to_number(self) -> Option<Number> {
        self.to_string()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
    }
}

impl<T: NumericValue> NumericRules<T> {
    /// Normalize to JSON numbers, checking the per-direction exclusivity.
    pub fn bounds(&self) -> Result<NumericBounds, String> {
        if self.gt.is_some() && self.gte.is_some() {
            return Err("`gt` and `gte` are mutually exclusive".to_string());
        }
        if self.lt.is_some() && self.lte.is_some() {
            return Err("`lt` and `lte` are mutually exclusive".to_string());
        }

        let one = |value: Option<T>, key: &str| -> Result<Option<Number>, String> {
            value
                .map(|v| {
                    v.to_number()
                        .ok_or_else(|| format!("`{key}` is not a finite number"))
                })
                .transpose()
        };
        let many = |values: &[T], key: &str| -> Result<Vec<Number>, String> {
            values
                .iter()
                .map(|v| {
                    v.to_number()
                        .ok_or_else(|| format!("`{key}` holds a non-finite number"))
                })
                .collect()
        };

        Ok(NumericBounds {
            constant: one(self.constant, "const")?,
            gt: one(self.gt, "gt")?,
            gte: one(self.gte, "gte")?,
            lt: one(self.lt, "lt")?,
            lte: one(self.lte, "lte")?,
            in_list: many(&self.in_list, "in")?,
            not_in: many(&self.not_in, "not_in")?,
        })
    }
}

// ── Other scalar rules ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoolRules {
    #[serde(rename = "const")]
    pub constant: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StringRules {
    #[serde(rename = "const")]
    pub constant: Option<String>,
    pub len: Option<u64>,
    pub min_len: Option<u64>,
    pub max_len: Option<u64>,
    pub pattern: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub contains: Option<String>,
    pub not_contains: Option<String>,
    #[serde(rename = "in")]
    pub in_list: Vec<String>,
    pub not_in: Vec<String>,
    pub well_known: Option<WellKnownString>,
}

/// Well-known string shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellKnownString {
    /// A hostname or an IP address.
    Address,
    Email,
    Hostname,
    /// An IPv4 or IPv6 address.
    Ip,
    Ipv4,
    Ipv6,
    Uri,
    UriRef,
}

/// Bytes carry no content constraints in JSON Schema; any keys are accepted
/// and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BytesRules {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnumRules {
    #[serde(rename = "const")]
    pub constant: Option<i32>,
    #[serde(rename = "in")]
    pub in_list: Vec<i32>,
    pub not_in: Vec<i32>,
    /// Always satisfied: generated enum schemas only list declared names.
    pub defined_only: bool,
}

// ── Collection rules ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepeatedRules {
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique: bool,
    pub items: Option<FieldConstraints>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapRules {
    pub min_pairs: Option<u64>,
    pub max_pairs: Option<u64>,
    pub keys: Option<FieldConstraints>,
    pub values: Option<FieldConstraints>,
}

// ── Well-known type rules ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnyRules {
    #[serde(rename = "in")]
    pub in_list: Vec<String>,
    pub not_in: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DurationRules {
    #[serde(rename = "const")]
    pub constant: Option<DurationValue>,
    #[serde(rename = "in")]
    pub in_list: Vec<DurationValue>,
    pub not_in: Vec<DurationValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimestampRules {
    #[serde(rename = "const")]
    pub constant: Option<TimestampValue>,
}

/// Constraints attached to a oneof.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OneofConstraints {
    pub required: bool,
}

const MAX_DURATION_SECONDS: i64 = 315_576_000_000;
const NANOS_PER_SECOND: i32 = 1_000_000_000;
// 0001-01-01T00:00:00Z and 9999-12-31T23:59:59Z.
const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;

/// A `google.protobuf.Duration` value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DurationValue {
    pub seconds: i64,
    pub nanos: i32,
}

impl DurationValue {
    /// The canonical JSON string, e.g. `"1.500s"` or `"-3s"`.
    ///
    /// Fractions are printed with 0, 3, 6 or 9 digits.
    pub fn to_json_string(self) -> Result<String, String> {
        let DurationValue { seconds, nanos } = self;
        if !(-MAX_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&seconds) {
            return Err(format!("duration of {seconds}s is out of range"));
        }
        if nanos <= -NANOS_PER_SECOND || nanos >= NANOS_PER_SECOND {
            return Err(format!("duration nanos {nanos} is out of range"));
        }
        if (seconds > 0 && nanos < 0) || (seconds < 0 && nanos > 0) {
            return Err(format!(
                "duration seconds ({seconds}) and nanos ({nanos}) have different signs"
            ));
        }

        let sign = if seconds < 0 || nanos < 0 { "-" } else { "" };
        let mut text = format!(
            "{sign}{}.{:09}",
            seconds.unsigned_abs(),
            nanos.unsigned_abs()
        );
        for suffix in ["000", "000", ".000"] {
            if let Some(len) = text.strip_suffix(suffix).map(str::len) {
                text.truncate(len);
            }
        }
        text.push('s');
        Ok(text)
    }
}

/// A `google.protobuf.Timestamp` value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimestampValue {
    pub seconds: i64,
    pub nanos: i32,
}

impl TimestampValue {
    /// The canonical JSON string: RFC 3339 in UTC with a `Z` suffix.
    pub fn to_json_string(self) -> Result<String, String> {
        let TimestampValue { seconds, nanos } = self;
        if !(MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&seconds) {
            return Err(format!("timestamp of {seconds}s is out of range"));
        }
        let nanos = u32::try_from(nanos)
            .ok()
            .filter(|n| *n < NANOS_PER_SECOND as u32)
            .ok_or_else(|| format!("timestamp nanos {nanos} is out of range"))?;

        let time = DateTime::from_timestamp(seconds, nanos)
            .ok_or_else(|| format!("timestamp of {seconds}s is out of range"))?;
        Ok(time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numeric_rules() {
        let json = r#"{"required": true, "int64": {"gt": 0, "lte": 100, "not_in": [13]}}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        assert!(constraints.is_required());

        let Some(Rules::Numeric(kind, bounds)) = constraints.rules().unwrap() else {
            panic!("expected numeric rules");
        };
        assert_eq!(kind, ScalarKind::Int64);
        assert_eq!(bounds.gt, Some(Number::from(0)));
        assert_eq!(bounds.lte, Some(Number::from(100)));
        assert_eq!(bounds.not_in, vec![Number::from(13)]);
        assert!(bounds.gte.is_none());
    }

    #[test]
    fn float_bounds_keep_their_short_spelling() {
        let json = r#"{"float": {"gte": 0.1}}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        let Some(Rules::Numeric(_, bounds)) = constraints.rules().unwrap() else {
            panic!("expected numeric rules");
        };
        assert_eq!(bounds.gte.unwrap().to_string(), "0.1");
    }

    #[test]
    fn exclusive_and_inclusive_bounds_conflict() {
        let json = r#"{"uint32": {"gt": 1, "gte": 2}}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        let err = constraints.rules().unwrap_err();
        assert!(err.contains("mutually exclusive"), "{err}");
    }

    #[test]
    fn non_finite_bound_is_rejected() {
        let rules = NumericRules::<f64> {
            lt: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(rules.bounds().is_err());
    }

    #[test]
    fn more_than_one_rule_set_is_rejected() {
        let json = r#"{"string": {"min_len": 1}, "int32": {"gt": 0}}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        let err = constraints.rules().unwrap_err();
        assert!(err.contains("int32"), "{err}");
        assert!(err.contains("string"), "{err}");
    }

    #[test]
    fn unknown_rule_keys_are_rejected() {
        let json = r#"{"string": {"min_bytes": 3}}"#;
        assert!(serde_json::from_str::<FieldConstraints>(json).is_err());
    }

    #[test]
    fn bytes_rules_are_accepted_and_ignored() {
        let json = r#"{"bytes": {"min_len": 3}}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        assert!(matches!(constraints.rules().unwrap(), Some(Rules::Bytes(_))));
    }

    #[test]
    fn ignore_policy_clears_required() {
        let json = r#"{"required": true, "ignore": "if_default_value"}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        assert!(!constraints.is_required());

        let json = r#"{"required": true, "ignore_empty": true}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        assert!(!constraints.is_required());

        let json = r#"{"required": true, "ignore": "if_unpopulated"}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        assert!(constraints.is_required());
    }

    #[test]
    fn ignore_always_drops_every_rule() {
        let json = r#"{"required": true, "ignore": "always", "string": {"min_len": 1}}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        assert!(!constraints.is_required());
        assert!(constraints.effective().rules().unwrap().is_none());
    }

    #[test]
    fn nested_collection_constraints() {
        let json = r#"{"repeated": {"min_items": 1, "items": {"string": {"email": true}}}}"#;
        assert!(serde_json::from_str::<FieldConstraints>(json).is_err());

        let json = r#"{"repeated": {"min_items": 1, "items": {"string": {"well_known": "email"}}}}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        let Some(Rules::Repeated(rules)) = constraints.rules().unwrap() else {
            panic!("expected repeated rules");
        };
        assert_eq!(rules.min_items, Some(1));
        let items = rules.items.as_ref().unwrap();
        let Some(Rules::String(string)) = items.rules().unwrap() else {
            panic!("expected string item rules");
        };
        assert_eq!(string.well_known, Some(WellKnownString::Email));
    }

    #[test]
    fn duration_json_strings() {
        let d = |seconds, nanos| DurationValue { seconds, nanos }.to_json_string();
        assert_eq!(d(3, 0).unwrap(), "3s");
        assert_eq!(d(1, 500_000_000).unwrap(), "1.500s");
        assert_eq!(d(0, 1).unwrap(), "0.000000001s");
        assert_eq!(d(0, 1_500).unwrap(), "0.000001500s");
        assert_eq!(d(-2, -250_000_000).unwrap(), "-2.250s");
        assert_eq!(d(0, -500_000_000).unwrap(), "-0.500s");
        assert!(d(1, -1).is_err());
        assert!(d(MAX_DURATION_SECONDS + 1, 0).is_err());
        assert!(d(0, NANOS_PER_SECOND).is_err());
    }

    #[test]
    fn timestamp_json_strings() {
        let t = |seconds, nanos| TimestampValue { seconds, nanos }.to_json_string();
        assert_eq!(t(0, 0).unwrap(), "1970-01-01T00:00:00Z");
        assert_eq!(t(63_108_020, 21_000_000).unwrap(), "1972-01-01T10:00:20.021Z");
        assert_eq!(t(MIN_TIMESTAMP_SECONDS, 0).unwrap(), "0001-01-01T00:00:00Z");
        assert!(t(MAX_TIMESTAMP_SECONDS + 1, 0).is_err());
        assert!(t(0, -1).is_err());
    }
}
