//! The twelve numeric kinds.
//!
//! Every kind reduces to an `integer` (optionally `minimum: 0`) or `number`
//! schema. 64-bit integer kinds also accept a decimal string, since that is
//! how canonical JSON spells them. Bounds apply to the numeric form only.

use serde_json::Number;

use crate::constraints::NumericBounds;
use crate::descriptor::ScalarKind;
use crate::error::{Error, Result};
use crate::json_schema::{NumberSchema, Schema, StringSchema};
use crate::type_map::{NumericShape, decimal_string_pattern, numeric_shape};

use super::Context;

impl Context<'_> {
    pub(super) fn schema_for_numeric(
        &self,
        kind: ScalarKind,
        bounds: Option<&NumericBounds>,
    ) -> Result<Schema> {
        let shape = numeric_shape(kind).ok_or_else(|| Error::UnexpectedType {
            path: self.path(),
            kind: kind.to_string(),
        })?;

        let mut value = NumberSchema::default();
        if shape == NumericShape::UnsignedInteger {
            value.minimum = Some(Number::from(0));
        }

        let mut excluded = None;
        if let Some(bounds) = bounds {
            if let Some(constant) = &bounds.constant {
                value.constant = Some(constant.clone());
            }
            if let Some(gt) = &bounds.gt {
                value.exclusive_minimum = Some(gt.clone());
            }
            if let Some(gte) = &bounds.gte {
                value.minimum = Some(gte.clone());
            }
            if !bounds.in_list.is_empty() {
                value.enumeration = bounds.in_list.clone();
            }
            if let Some(lt) = &bounds.lt {
                value.exclusive_maximum = Some(lt.clone());
            }
            if let Some(lte) = &bounds.lte {
                value.maximum = Some(lte.clone());
            }
            if !bounds.not_in.is_empty() {
                excluded = Some(Schema::not(Schema::Number(NumberSchema {
                    enumeration: bounds.not_in.clone(),
                    ..Default::default()
                })));
            }
        }

        let value = match shape {
            NumericShape::Number => Schema::Number(value),
            NumericShape::SignedInteger | NumericShape::UnsignedInteger => Schema::Integer(value),
        };
        let value = match decimal_string_pattern(kind) {
            Some(pattern) => Schema::one_of([value, StringSchema::with_pattern(pattern).into()]),
            None => value,
        };

        Ok(Schema::all_of([value].into_iter().chain(excluded)))
    }
}
