//! Maps protobuf scalar kinds to JSON Schema shapes, plus naming helpers.
//!
//! # Type Mapping Table
//!
//! | Proto kind | JSON Schema | Notes |
//! |------------|-------------|-------|
//! | `uint32`, `fixed32` | `integer`, `minimum: 0` | |
//! | `uint64`, `fixed64` | `integer`, `minimum: 0`, or unsigned decimal string | 64-bit values are strings in canonical JSON |
//! | `int32`, `sint32`, `sfixed32` | `integer` | |
//! | `int64`, `sint64`, `sfixed64` | `integer`, or signed decimal string | |
//! | `float`, `double` | `number` | |
//! | `bool` | `boolean` | |
//! | `string` | `string` | |
//! | `bytes` | `string` (base64) | Standard or URL-safe alphabet |
//! | enum | `string` enum of value names | Handled by the enum translator |
//! | message | `$ref` | Handled by the message translator |

use crate::descriptor::ScalarKind;

/// Decimal string accepted for signed 64-bit integers.
///
/// Canonical JSON spells 64-bit integers as strings; decoders also accept
/// exponent notation as long as the value is integral.
pub const SIGNED_DECIMAL_PATTERN: &str = r"^-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?$";

/// Decimal string accepted for unsigned 64-bit integers.
pub const UNSIGNED_DECIMAL_PATTERN: &str = r"^(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?$";

/// The JSON Schema type a numeric kind reduces to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericShape {
    /// `integer` with `minimum: 0`.
    UnsignedInteger,
    /// `integer`.
    SignedInteger,
    /// `number`.
    Number,
}

/// The schema shape for a numeric kind. `None` for `bool`, `string`, `bytes`.
pub fn numeric_shape(kind: ScalarKind) -> Option<NumericShape> {
    let shape = match kind {
        ScalarKind::Uint32 | ScalarKind::Uint64 | ScalarKind::Fixed32 | ScalarKind::Fixed64 => {
            NumericShape::UnsignedInteger
        }
        ScalarKind::Int32
        | ScalarKind::Int64
        | ScalarKind::Sint32
        | ScalarKind::Sint64
        | ScalarKind::Sfixed32
        | ScalarKind::Sfixed64 => NumericShape::SignedInteger,
        ScalarKind::Float | ScalarKind::Double => NumericShape::Number,
        ScalarKind::Bool | ScalarKind::String | ScalarKind::Bytes => return None,
    };
    Some(shape)
}

/// The decimal-string pattern for 64-bit integer kinds, which canonical JSON
/// encodes as strings. `None` for every other kind.
pub fn decimal_string_pattern(kind: ScalarKind) -> Option<&'static str> {
    match kind {
        ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => {
            Some(SIGNED_DECIMAL_PATTERN)
        }
        ScalarKind::Uint64 | ScalarKind::Fixed64 => Some(UNSIGNED_DECIMAL_PATTERN),
        _ => None,
    }
}

/// Whether a scalar kind may be used as a map key.
pub fn is_valid_map_key(kind: ScalarKind) -> bool {
    !matches!(
        kind,
        ScalarKind::Float | ScalarKind::Double | ScalarKind::Bytes
    )
}

/// Derive the JSON name of a field the way protoc does.
///
/// - `"order_id"` → `"orderId"`
/// - `"line_items_2"` → `"lineItems2"`
/// - `"already"` → `"already"`
pub fn to_json_name(field_name: &str) -> String {
    let mut json_name = String::with_capacity(field_name.len());
    let mut capitalize_next = false;
    for c in field_name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            json_name.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            json_name.push(c);
        }
    }
    json_name
}

/// Normalize a type reference to its dotted full name (`.acme.v1.Order`).
pub fn qualify(type_name: &str) -> String {
    if type_name.starts_with('.') {
        type_name.to_string()
    } else {
        format!(".{type_name}")
    }
}

/// The `definitions` key for a full type name: the leading dot stripped.
///
/// - `".acme.v1.Order"` → `"acme.v1.Order"`
pub fn definition_key(full_name: &str) -> &str {
    full_name.strip_prefix('.').unwrap_or(full_name)
}

/// Relative output path of a message's schema document.
///
/// - `".acme.v1.Order"` → `"acme/v1/Order.schema.json"`
/// - `".acme.v1.Order.Line"` → `"acme/v1/Order/Line.schema.json"`
pub fn schema_file_path(full_name: &str) -> String {
    format!("{}.schema.json", definition_key(full_name).replace('.', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_shapes() {
        assert_eq!(
            numeric_shape(ScalarKind::Uint32),
            Some(NumericShape::UnsignedInteger)
        );
        assert_eq!(
            numeric_shape(ScalarKind::Fixed64),
            Some(NumericShape::UnsignedInteger)
        );
        assert_eq!(
            numeric_shape(ScalarKind::Sint32),
            Some(NumericShape::SignedInteger)
        );
        assert_eq!(
            numeric_shape(ScalarKind::Sfixed64),
            Some(NumericShape::SignedInteger)
        );
        assert_eq!(numeric_shape(ScalarKind::Float), Some(NumericShape::Number));
        assert_eq!(numeric_shape(ScalarKind::Double), Some(NumericShape::Number));
        assert_eq!(numeric_shape(ScalarKind::Bool), None);
        assert_eq!(numeric_shape(ScalarKind::Bytes), None);
    }

    #[test]
    fn only_64_bit_integers_have_string_patterns() {
        for kind in [ScalarKind::Int64, ScalarKind::Sint64, ScalarKind::Sfixed64] {
            assert_eq!(
                decimal_string_pattern(kind),
                Some(SIGNED_DECIMAL_PATTERN),
                "{kind}"
            );
        }
        for kind in [ScalarKind::Uint64, ScalarKind::Fixed64] {
            assert_eq!(
                decimal_string_pattern(kind),
                Some(UNSIGNED_DECIMAL_PATTERN),
                "{kind}"
            );
        }
        for kind in [
            ScalarKind::Int32,
            ScalarKind::Uint32,
            ScalarKind::Float,
            ScalarKind::Double,
            ScalarKind::String,
        ] {
            assert_eq!(decimal_string_pattern(kind), None, "{kind}");
        }
    }

    #[test]
    fn map_key_kinds() {
        assert!(is_valid_map_key(ScalarKind::String));
        assert!(is_valid_map_key(ScalarKind::Int64));
        assert!(is_valid_map_key(ScalarKind::Bool));
        assert!(!is_valid_map_key(ScalarKind::Double));
        assert!(!is_valid_map_key(ScalarKind::Bytes));
    }

    #[test]
    fn json_names() {
        assert_eq!(to_json_name("order_id"), "orderId");
        assert_eq!(to_json_name("line_items_2"), "lineItems2");
        assert_eq!(to_json_name("already"), "already");
        assert_eq!(to_json_name("_leading"), "Leading");
        assert_eq!(to_json_name("trailing_"), "trailing");
        assert_eq!(to_json_name("keepCase"), "keepCase");
    }

    #[test]
    fn names_and_paths() {
        assert_eq!(qualify("acme.v1.Order"), ".acme.v1.Order");
        assert_eq!(qualify(".acme.v1.Order"), ".acme.v1.Order");
        assert_eq!(definition_key(".acme.v1.Order"), "acme.v1.Order");
        assert_eq!(
            schema_file_path(".acme.v1.Order.Line"),
            "acme/v1/Order/Line.schema.json"
        );
        assert_eq!(schema_file_path(".Root"), "Root.schema.json");
    }
}
