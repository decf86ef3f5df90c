//! Schema-typed state container for Trellis.
//!
//! A [`SchemaDefinition`] declares the shape of a replicated state object:
//! each field is a primitive kind (`string`, `number`, `boolean`, `object`,
//! `array`) or a nested schema. The schema is used to:
//! - validate a raw value ([`SchemaDefinition::validate`])
//! - coerce a raw value into shape ([`SchemaDefinition::cast`])
//! - derive a default value ([`SchemaDefinition::default_value`])
//!
//! Kind names outside the fixed set deserialize as [`FieldKind::Unknown`] and
//! degrade silently: they validate anything, cast as a passthrough and
//! default to `null`. Partially specified schemas therefore never fail to
//! load.

mod cast;
mod error;
mod schema;

pub use cast::{merge, to_boolean, to_number, to_string};
pub use error::{ValidationError, ValidationResult};
pub use schema::{FieldKind, PrimitiveKind, SchemaDefinition};
