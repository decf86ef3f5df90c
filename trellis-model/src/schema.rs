use crate::cast::cast_field;
use crate::error::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A primitive field kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl PrimitiveKind {
    /// The kind's name as written in schema JSON.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// The zero value for this kind.
    pub fn default_value(&self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Number => Value::from(0),
            Self::Boolean => Value::Bool(false),
            Self::Object => Value::Object(Map::new()),
            Self::Array => Value::Array(Vec::new()),
        }
    }

    /// Whether `value` already has this kind.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

/// The declared kind of one schema field.
///
/// The JSON form is either a kind name (`"string"`) or a nested object
/// schema (`{"street": "string"}`). Unrecognised kind names are kept as
/// [`FieldKind::Unknown`] instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldKind {
    Primitive(PrimitiveKind),
    Nested(SchemaDefinition),
    Unknown(String),
}

impl FieldKind {
    fn default_value(&self) -> Value {
        match self {
            Self::Primitive(kind) => kind.default_value(),
            Self::Nested(schema) => schema.default_value(),
            Self::Unknown(_) => Value::Null,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Primitive(kind) => kind.name().to_string(),
            Self::Nested(_) => "object".to_string(),
            Self::Unknown(name) => name.clone(),
        }
    }
}

impl From<PrimitiveKind> for FieldKind {
    fn from(kind: PrimitiveKind) -> Self {
        Self::Primitive(kind)
    }
}

impl From<SchemaDefinition> for FieldKind {
    fn from(schema: SchemaDefinition) -> Self {
        Self::Nested(schema)
    }
}

/// Declared shape of a replicated state object: field name to kind.
///
/// Nested schemas are owned values, so a schema is always a finite tree and
/// every recursive walk over it terminates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDefinition {
    fields: BTreeMap<String, FieldKind>,
}

impl SchemaDefinition {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a field. Builder style.
    pub fn field(mut self, name: impl Into<String>, kind: impl Into<FieldKind>) -> Self {
        self.fields.insert(name.into(), kind.into());
        self
    }

    /// Parses a schema from its JSON form.
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Looks up a field's declared kind.
    pub fn get(&self, name: &str) -> Option<&FieldKind> {
        self.fields.get(name)
    }

    /// Iterates declared fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns true iff `data` is an object holding every declared field
    /// with a matching kind. Extra fields are ignored.
    pub fn validate(&self, data: &Value) -> bool {
        self.validate_strict(data).is_ok()
    }

    /// Like [`validate`](Self::validate) but reports the first offending field.
    pub fn validate_strict(&self, data: &Value) -> ValidationResult<()> {
        self.validate_at(data, "")
    }

    fn validate_at(&self, data: &Value, prefix: &str) -> ValidationResult<()> {
        let object = data.as_object().ok_or_else(|| ValidationError::NotAnObject {
            found: kind_of(data).to_string(),
        })?;

        for (name, kind) in &self.fields {
            let field = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            let value = object
                .get(name)
                .ok_or_else(|| ValidationError::MissingField {
                    field: field.clone(),
                })?;

            match kind {
                FieldKind::Primitive(p) if !p.matches(value) => {
                    return Err(ValidationError::KindMismatch {
                        field,
                        expected: kind.describe(),
                        found: kind_of(value).to_string(),
                    });
                }
                FieldKind::Nested(nested) => {
                    if !value.is_object() {
                        return Err(ValidationError::KindMismatch {
                            field,
                            expected: kind.describe(),
                            found: kind_of(value).to_string(),
                        });
                    }
                    nested.validate_at(value, &field)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Coerces each declared field present in `data` to its declared kind.
    ///
    /// Fields absent from `data` are omitted (callers merge with prior
    /// state); undeclared fields are dropped. A non-object input casts to
    /// an empty object.
    pub fn cast(&self, data: &Value) -> Value {
        let mut out = Map::new();
        if let Some(object) = data.as_object() {
            for (name, kind) in &self.fields {
                if let Some(value) = object.get(name) {
                    out.insert(name.clone(), cast_field(kind, value));
                }
            }
        }
        Value::Object(out)
    }

    /// The schema's default value: every field at its kind's zero value,
    /// nested schemas recursively, `null` for unknown kinds.
    pub fn default_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, kind)| (name.clone(), kind.default_value()))
                .collect(),
        )
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
