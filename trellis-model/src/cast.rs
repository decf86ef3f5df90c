//! Value coercions used by [`SchemaDefinition::cast`](crate::SchemaDefinition::cast).
//!
//! Every coercion is idempotent: coercing an already-coerced value is a
//! no-op.

use crate::schema::{FieldKind, PrimitiveKind};
use serde_json::{Map, Number, Value};

pub(crate) fn cast_field(kind: &FieldKind, value: &Value) -> Value {
    match kind {
        FieldKind::Primitive(PrimitiveKind::String) => Value::String(to_string(value)),
        FieldKind::Primitive(PrimitiveKind::Number) => to_number(value),
        FieldKind::Primitive(PrimitiveKind::Boolean) => Value::Bool(to_boolean(value)),
        FieldKind::Primitive(PrimitiveKind::Object) => match value {
            Value::Object(_) => value.clone(),
            _ => Value::Object(Map::new()),
        },
        FieldKind::Primitive(PrimitiveKind::Array) => match value {
            Value::Array(_) => value.clone(),
            _ => Value::Array(Vec::new()),
        },
        FieldKind::Nested(schema) => merge(&schema.default_value(), &schema.cast(value)),
        FieldKind::Unknown(_) => value.clone(),
    }
}

/// String conversion. Containers render as JSON text.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Numeric conversion.
///
/// Booleans become 0/1, blank strings 0, numeric strings their value.
/// Anything without a finite numeric reading, `null` included, becomes 0.
pub fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::Bool(b) => Value::from(u8::from(*b)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Value::from(0);
            }
            if let Ok(i) = trimmed.parse::<i64>() {
                return Value::from(i);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::from(0))
        }
        Value::Null | Value::Array(_) | Value::Object(_) => Value::from(0),
    }
}

/// Truthiness: `null`, `false`, `0` and `""` are false; everything else,
/// including empty containers, is true.
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Shallow merge of `partial` over `base`. Non-object inputs count as `{}`.
pub fn merge(base: &Value, partial: &Value) -> Value {
    let mut out = base.as_object().cloned().unwrap_or_default();
    if let Some(fields) = partial.as_object() {
        for (name, value) in fields {
            out.insert(name.clone(), value.clone());
        }
    }
    Value::Object(out)
}
