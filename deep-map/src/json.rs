//! Conversion to and from `serde_json::Value`.
//!
//! JSON is tree-shaped: reading it never produces shared nodes, and writing
//! duplicates every shared node at each position it appears in.
use serde_json::{Map, Number, Value as JsonValue};

use crate::error::ToJsonError;
use crate::frame::{expand_and_collapse, try_expand_and_collapse, CompositeFrame, PartiallyApplied};
use crate::value::Value;

impl Value {
    /// Numbers become `Int` when they fit an `i64`, `Float` otherwise.
    pub fn from_json(json: JsonValue) -> Value {
        expand_and_collapse::<CompositeFrame<PartiallyApplied>, _, _>(
            json,
            |json| match json {
                JsonValue::Array(items) => CompositeFrame::Array(items),
                JsonValue::Object(map) => CompositeFrame::Object(map.into_iter().collect()),
                scalar => CompositeFrame::Leaf(scalar_from_json(scalar)),
            },
            Value::from_frame,
        )
    }

    pub fn to_json(&self) -> Result<JsonValue, ToJsonError> {
        if let Some(node) = self.find_cycle() {
            return Err(ToJsonError::Cycle { node });
        }

        try_expand_and_collapse::<CompositeFrame<PartiallyApplied>, _, _, _>(
            self.clone(),
            |value| Ok(value.to_frame()),
            |frame| match frame {
                CompositeFrame::Leaf(scalar) => scalar_to_json(scalar),
                CompositeFrame::Array(items) => Ok(JsonValue::Array(items)),
                CompositeFrame::Object(entries) => {
                    Ok(JsonValue::Object(entries.into_iter().collect::<Map<_, _>>()))
                }
            },
        )
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::from_json(json)
    }
}

fn scalar_from_json(json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        JsonValue::String(s) => Value::String(s),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            unreachable!("composites are expanded, not converted")
        }
    }
}

fn scalar_to_json(scalar: Value) -> Result<JsonValue, ToJsonError> {
    Ok(match scalar {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(b),
        Value::Int(i) => JsonValue::from(i),
        Value::Float(value) => Number::from_f64(value)
            .map(JsonValue::Number)
            .ok_or(ToJsonError::NonFiniteFloat { value })?,
        Value::String(s) => JsonValue::String(s),
        Value::Composite(_) => unreachable!("composites are expanded, not converted"),
    })
}
