//! Resolved descriptor graph.
//!
//! [`DescriptorPool`] indexes every message and enum of a [`DescriptorSet`] by
//! dotted full name (`.acme.v1.Order.Line`), resolves JSON names and oneof
//! membership, and records which messages get their own schema document.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;

use crate::constraints::FieldConstraints;
use crate::descriptor::{
    DescriptorSet, ElementKind, EnumDescriptor, EnumValueDescriptor, MessageDescriptor, TypeKind,
    load_descriptor_set,
};
use crate::error::{Error, Result};
use crate::type_map::{qualify, to_json_name};

/// A message with its fields resolved.
#[derive(Debug)]
pub struct Message {
    /// Dotted full name (e.g., `".acme.v1.Order"`).
    pub full_name: String,
    /// Short name (e.g., `"Order"`).
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<Field>,
    /// Oneofs in declaration order.
    pub oneofs: Vec<OneOf>,
}

impl Message {
    /// The member fields of a oneof, in declaration order.
    pub fn oneof_members<'a>(&'a self, oneof: &'a OneOf) -> impl Iterator<Item = &'a Field> + 'a {
        oneof.members.iter().map(|&index| &self.fields[index])
    }
}

/// A field with its JSON name and type references resolved.
#[derive(Debug)]
pub struct Field {
    pub name: String,
    /// Property name in the JSON encoding.
    pub json_name: String,
    /// Type, with every type reference in dotted full-name form.
    pub kind: TypeKind,
    /// Declared with explicit presence (`optional`).
    pub explicit_optional: bool,
    /// Name of the containing oneof.
    pub oneof: Option<String>,
    pub constraints: FieldConstraints,
}

impl Field {
    pub fn in_oneof(&self) -> bool {
        self.oneof.is_some()
    }
}

/// A oneof and its members.
#[derive(Debug)]
pub struct OneOf {
    pub name: String,
    /// Exactly one member must be set.
    pub required: bool,
    /// Indices into [`Message::fields`].
    pub members: Vec<usize>,
}

/// An enum and its values.
#[derive(Debug)]
pub struct Enum {
    pub full_name: String,
    pub values: Vec<EnumValueDescriptor>,
}

impl Enum {
    /// The first declared name with the given number.
    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|value| value.number == number)
            .map(|value| value.name.as_str())
    }
}

/// The `google.protobuf` message types with a dedicated JSON encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownType {
    Any,
    BoolValue,
    BytesValue,
    DoubleValue,
    Duration,
    Empty,
    FloatValue,
    Int32Value,
    Int64Value,
    ListValue,
    StringValue,
    Struct,
    Timestamp,
    UInt32Value,
    UInt64Value,
    Value,
}

impl WellKnownType {
    pub const PACKAGE: &'static str = "google.protobuf";

    /// Recognize a type by full name, with or without the leading dot.
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        let name = full_name.strip_prefix('.').unwrap_or(full_name);
        let short = name.strip_prefix(Self::PACKAGE)?.strip_prefix('.')?;
        let wkt = match short {
            "Any" => WellKnownType::Any,
            "BoolValue" => WellKnownType::BoolValue,
            "BytesValue" => WellKnownType::BytesValue,
            "DoubleValue" => WellKnownType::DoubleValue,
            "Duration" => WellKnownType::Duration,
            "Empty" => WellKnownType::Empty,
            "FloatValue" => WellKnownType::FloatValue,
            "Int32Value" => WellKnownType::Int32Value,
            "Int64Value" => WellKnownType::Int64Value,
            "ListValue" => WellKnownType::ListValue,
            "StringValue" => WellKnownType::StringValue,
            "Struct" => WellKnownType::Struct,
            "Timestamp" => WellKnownType::Timestamp,
            "UInt32Value" => WellKnownType::UInt32Value,
            "UInt64Value" => WellKnownType::UInt64Value,
            "Value" => WellKnownType::Value,
            _ => return None,
        };
        Some(wkt)
    }

    pub fn short_name(self) -> &'static str {
        match self {
            WellKnownType::Any => "Any",
            WellKnownType::BoolValue => "BoolValue",
            WellKnownType::BytesValue => "BytesValue",
            WellKnownType::DoubleValue => "DoubleValue",
            WellKnownType::Duration => "Duration",
            WellKnownType::Empty => "Empty",
            WellKnownType::FloatValue => "FloatValue",
            WellKnownType::Int32Value => "Int32Value",
            WellKnownType::Int64Value => "Int64Value",
            WellKnownType::ListValue => "ListValue",
            WellKnownType::StringValue => "StringValue",
            WellKnownType::Struct => "Struct",
            WellKnownType::Timestamp => "Timestamp",
            WellKnownType::UInt32Value => "UInt32Value",
            WellKnownType::UInt64Value => "UInt64Value",
            WellKnownType::Value => "Value",
        }
    }

    /// Dotted full name (e.g., `".google.protobuf.Struct"`).
    pub fn full_name(self) -> String {
        format!(".{}.{}", Self::PACKAGE, self.short_name())
    }
}

/// Every message and enum of a descriptor set, indexed by full name.
#[derive(Debug, Default)]
pub struct DescriptorPool {
    messages: IndexMap<String, Message>,
    enums: IndexMap<String, Enum>,
    targets: Vec<String>,
}

impl DescriptorPool {
    /// Load a descriptor set from disk and index it.
    pub fn load(path: &Path) -> Result<Self> {
        Self::new(load_descriptor_set(path)?)
    }

    /// Index a descriptor set.
    ///
    /// Fails on duplicate full names, duplicate JSON names within a message,
    /// fields naming an undeclared oneof, and target files that are not in
    /// the set.
    pub fn new(set: DescriptorSet) -> Result<Self> {
        let DescriptorSet {
            files_to_generate,
            files,
        } = set;

        for target in &files_to_generate {
            if !files.iter().any(|file| file.name == *target) {
                return Err(Error::Descriptor(format!(
                    "file to generate '{target}' is not in the descriptor set"
                )));
            }
        }

        let mut pool = DescriptorPool::default();
        for file in files {
            let is_target = files_to_generate.is_empty() || files_to_generate.contains(&file.name);
            let scope = if file.package.is_empty() {
                String::new()
            } else {
                format!(".{}", file.package)
            };

            for descriptor in file.enums {
                pool.add_enum(&scope, descriptor)?;
            }
            for descriptor in file.messages {
                pool.add_message(&scope, descriptor, is_target)?;
            }
        }

        tracing::debug!(
            messages = pool.messages.len(),
            enums = pool.enums.len(),
            targets = pool.targets.len(),
            "indexed descriptor set"
        );
        Ok(pool)
    }

    /// Look up a message by full name. The leading dot is optional.
    pub fn message(&self, name: &str) -> Option<&Message> {
        if name.starts_with('.') {
            self.messages.get(name)
        } else {
            self.messages.get(&qualify(name))
        }
    }

    /// Look up an enum by full name. The leading dot is optional.
    pub fn enumeration(&self, name: &str) -> Option<&Enum> {
        if name.starts_with('.') {
            self.enums.get(name)
        } else {
            self.enums.get(&qualify(name))
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn enum_count(&self) -> usize {
        self.enums.len()
    }

    /// Messages that get their own schema document: every message of every
    /// target file, nested ones included, depth-first in declaration order.
    pub fn target_messages(&self) -> impl Iterator<Item = &Message> {
        self.targets.iter().filter_map(|name| self.messages.get(name))
    }

    fn check_unique(&self, full_name: &str) -> Result<()> {
        if self.messages.contains_key(full_name) || self.enums.contains_key(full_name) {
            return Err(Error::Descriptor(format!(
                "'{full_name}' is declared more than once"
            )));
        }
        Ok(())
    }

    fn add_enum(&mut self, scope: &str, descriptor: EnumDescriptor) -> Result<()> {
        let full_name = format!("{scope}.{}", descriptor.name);
        self.check_unique(&full_name)?;
        self.enums.insert(
            full_name.clone(),
            Enum {
                full_name,
                values: descriptor.values,
            },
        );
        Ok(())
    }

    fn add_message(
        &mut self,
        scope: &str,
        descriptor: MessageDescriptor,
        is_target: bool,
    ) -> Result<()> {
        let full_name = format!("{scope}.{}", descriptor.name);
        self.check_unique(&full_name)?;

        let mut json_names = HashSet::new();
        let mut fields = Vec::with_capacity(descriptor.fields.len());
        for field in descriptor.fields {
            let json_name = field
                .json_name
                .unwrap_or_else(|| to_json_name(&field.name));
            if !json_names.insert(json_name.clone()) {
                return Err(Error::Descriptor(format!(
                    "{full_name}: JSON name '{json_name}' is used by more than one field"
                )));
            }
            if let Some(oneof) = &field.oneof {
                if !descriptor.oneofs.iter().any(|o| o.name == *oneof) {
                    return Err(Error::Descriptor(format!(
                        "{full_name}.{}: oneof '{oneof}' is not declared",
                        field.name
                    )));
                }
            }

            fields.push(Field {
                name: field.name,
                json_name,
                kind: qualify_kind(field.type_kind),
                explicit_optional: field.proto3_optional,
                oneof: field.oneof,
                constraints: field.constraints.unwrap_or_default(),
            });
        }

        let oneofs = descriptor
            .oneofs
            .into_iter()
            .map(|oneof| {
                let members = fields
                    .iter()
                    .enumerate()
                    .filter(|(_, field)| field.oneof.as_deref() == Some(oneof.name.as_str()))
                    .map(|(index, _)| index)
                    .collect();
                OneOf {
                    required: oneof.constraints.is_some_and(|c| c.required),
                    name: oneof.name,
                    members,
                }
            })
            .collect();

        if is_target {
            self.targets.push(full_name.clone());
        }
        self.messages.insert(
            full_name.clone(),
            Message {
                full_name: full_name.clone(),
                name: descriptor.name,
                fields,
                oneofs,
            },
        );

        for nested in descriptor.enums {
            self.add_enum(&full_name, nested)?;
        }
        for nested in descriptor.messages {
            self.add_message(&full_name, nested, is_target)?;
        }
        Ok(())
    }
}

fn qualify_element(element: ElementKind) -> ElementKind {
    match element {
        ElementKind::Enum(name) => ElementKind::Enum(qualify(&name)),
        ElementKind::Message(name) => ElementKind::Message(qualify(&name)),
        scalar @ ElementKind::Scalar(_) => scalar,
    }
}

fn qualify_kind(kind: TypeKind) -> TypeKind {
    match kind {
        TypeKind::Enum(name) => TypeKind::Enum(qualify(&name)),
        TypeKind::Message(name) => TypeKind::Message(qualify(&name)),
        TypeKind::Map { key, value } => TypeKind::Map {
            key,
            value: qualify_element(value),
        },
        TypeKind::Repeated(element) => TypeKind::Repeated(qualify_element(element)),
        scalar @ TypeKind::Scalar(_) => scalar,
    }
}
