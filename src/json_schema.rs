//! JSON Schema value model and serialization.
//!
//! [`Schema`] is a closed union over the schema shapes the translators build:
//! typed schemas (object, array, string, integer, number, boolean), the
//! untyped [`GenericSchema`], the boolean literals, `$ref`, and the
//! `allOf`/`anyOf`/`oneOf`/`not` combinators.
//!
//! Output is byte-stable: properties and definitions keep insertion order,
//! which the translators drive from declaration order.

use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::{Map, Number, Value};

/// The dialect every generated document declares.
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// A JSON Schema value.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Always passes.
    True,
    /// Always fails.
    False,
    Generic(GenericSchema),
    Object(ObjectSchema),
    Array(ArraySchema),
    String(StringSchema),
    Integer(NumberSchema),
    Number(NumberSchema),
    Boolean(BooleanSchema),
    /// A `$ref` to a location in the current document.
    Ref(String),
    AllOf(Vec<Schema>),
    AnyOf(Vec<Schema>),
    OneOf(Vec<Schema>),
    Not(Box<Schema>),
}

impl Schema {
    /// A reference to the root of the current document.
    pub fn self_ref() -> Schema {
        Schema::Ref("#".to_string())
    }

    /// A reference to a named entry in the document's `definitions`.
    pub fn definition_ref(key: &str) -> Schema {
        Schema::Ref(format!("#/definitions/{key}"))
    }

    /// Conjunction. `True` operands are dropped, a `False` operand makes the
    /// whole conjunction `False`, and a single remaining operand is returned
    /// unwrapped.
    pub fn all_of(schemas: impl IntoIterator<Item = Schema>) -> Schema {
        let mut operands = Vec::new();
        for schema in schemas {
            match schema {
                Schema::True => {}
                Schema::False => return Schema::False,
                other => operands.push(other),
            }
        }
        match operands.len() {
            0 => Schema::True,
            1 => operands.remove(0),
            _ => Schema::AllOf(operands),
        }
    }

    /// Inclusive disjunction: at least one operand must match.
    pub fn any_of(schemas: impl IntoIterator<Item = Schema>) -> Schema {
        let mut operands: Vec<Schema> = schemas.into_iter().collect();
        match operands.len() {
            0 => Schema::False,
            1 => operands.remove(0),
            _ => Schema::AnyOf(operands),
        }
    }

    /// Exclusive disjunction: exactly one operand must match.
    pub fn one_of(schemas: impl IntoIterator<Item = Schema>) -> Schema {
        let mut operands: Vec<Schema> = schemas.into_iter().collect();
        match operands.len() {
            0 => Schema::False,
            1 => operands.remove(0),
            _ => Schema::OneOf(operands),
        }
    }

    /// Negation.
    pub fn not(schema: Schema) -> Schema {
        Schema::Not(Box::new(schema))
    }
}

impl From<GenericSchema> for Schema {
    fn from(schema: GenericSchema) -> Self {
        Schema::Generic(schema)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(schema: ObjectSchema) -> Self {
        Schema::Object(schema)
    }
}

impl From<ArraySchema> for Schema {
    fn from(schema: ArraySchema) -> Self {
        Schema::Array(schema)
    }
}

impl From<StringSchema> for Schema {
    fn from(schema: StringSchema) -> Self {
        Schema::String(schema)
    }
}

impl From<BooleanSchema> for Schema {
    fn from(schema: BooleanSchema) -> Self {
        Schema::Boolean(schema)
    }
}

/// A typed schema: the `type` keyword followed by the schema's own keywords.
#[derive(Serialize)]
struct Typed<'a, T> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    schema: &'a T,
}

fn single_entry<S, V>(serializer: S, key: &str, value: &V) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Schema::True => serializer.serialize_bool(true),
            Schema::False => serializer.serialize_bool(false),
            Schema::Generic(schema) => schema.serialize(serializer),
            Schema::Object(schema) => Typed {
                kind: "object",
                schema,
            }
            .serialize(serializer),
            Schema::Array(schema) => Typed {
                kind: "array",
                schema,
            }
            .serialize(serializer),
            Schema::String(schema) => Typed {
                kind: "string",
                schema,
            }
            .serialize(serializer),
            Schema::Integer(schema) => Typed {
                kind: "integer",
                schema,
            }
            .serialize(serializer),
            Schema::Number(schema) => Typed {
                kind: "number",
                schema,
            }
            .serialize(serializer),
            Schema::Boolean(schema) => Typed {
                kind: "boolean",
                schema,
            }
            .serialize(serializer),
            Schema::Ref(target) => single_entry(serializer, "$ref", target),
            Schema::AllOf(schemas) => single_entry(serializer, "allOf", schemas),
            Schema::AnyOf(schemas) => single_entry(serializer, "anyOf", schemas),
            Schema::OneOf(schemas) => single_entry(serializer, "oneOf", schemas),
            Schema::Not(schema) => single_entry(serializer, "not", schema),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// An untyped schema carrying only annotations; matches anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenericSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "is_false")]
    pub unique_items: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub constant: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
}

impl StringSchema {
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        StringSchema {
            pattern: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn with_format(format: StringFormat) -> Self {
        StringSchema {
            format: Some(format),
            ..Default::default()
        }
    }

    pub fn with_enum(values: Vec<String>) -> Self {
        StringSchema {
            enumeration: values,
            ..Default::default()
        }
    }
}

/// Keywords shared by `integer` and `number` schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub constant: Option<Number>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BooleanSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub constant: Option<bool>,
}

/// Values of the `format` keyword this compiler emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StringFormat {
    #[serde(rename = "date-time")]
    DateTime,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "hostname")]
    Hostname,
    #[serde(rename = "ipv4")]
    Ipv4,
    #[serde(rename = "ipv6")]
    Ipv6,
    #[serde(rename = "uri")]
    Uri,
    #[serde(rename = "uri-reference")]
    UriReference,
}

/// A complete schema document: root schema plus its named definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The `$id` of the document, once it has been placed at a URL.
    pub id: Option<String>,
    pub root: Schema,
    pub definitions: IndexMap<String, Schema>,
}

impl Document {
    pub fn new(root: Schema, definitions: IndexMap<String, Schema>) -> Self {
        Document {
            id: None,
            root,
            definitions,
        }
    }

    /// Mark this as a top-level document published at `id`.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Render as a JSON value: `$schema`, `$id`, the root keywords, then
    /// `definitions`.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut document = Map::new();
        document.insert("$schema".to_string(), Value::from(DRAFT_07));
        if let Some(id) = &self.id {
            document.insert("$id".to_string(), Value::from(id.as_str()));
        }

        match serde_json::to_value(&self.root)? {
            Value::Object(root) => document.extend(root),
            Value::Bool(true) => {}
            Value::Bool(false) => {
                document.insert("not".to_string(), Value::Object(Map::new()));
            }
            other => {
                document.insert("allOf".to_string(), Value::Array(vec![other]));
            }
        }

        if !self.definitions.is_empty() {
            document.insert(
                "definitions".to_string(),
                serde_json::to_value(&self.definitions)?,
            );
        }
        Ok(Value::Object(document))
    }

    /// Pretty-printed JSON with two-space indentation and a trailing newline.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut content = serde_json::to_string_pretty(&self.to_value()?)?;
        content.push('\n');
        Ok(content)
    }
}
