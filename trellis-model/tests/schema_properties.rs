//! Property-based tests for schema casting and defaults.
//!
//! - cast is idempotent for every schema and input
//! - the default value of every schema validates
//! - the cast of any object only ever contains declared fields
//! - any cast laid over the defaults validates

use proptest::prelude::*;
use serde_json::{Map, Value};
use trellis_model::{merge, FieldKind, PrimitiveKind, SchemaDefinition};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn field_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "title", "tags"]).prop_map(String::from)
}

fn primitive_kind() -> impl Strategy<Value = PrimitiveKind> {
    prop_oneof![
        Just(PrimitiveKind::String),
        Just(PrimitiveKind::Number),
        Just(PrimitiveKind::Boolean),
        Just(PrimitiveKind::Object),
        Just(PrimitiveKind::Array),
    ]
}

fn schema_strategy() -> impl Strategy<Value = SchemaDefinition> {
    let leaf = prop_oneof![
        8 => primitive_kind().prop_map(FieldKind::Primitive),
        1 => Just(FieldKind::Unknown("date".to_string())),
    ];
    let kind = leaf.prop_recursive(3, 16, 4, |inner| {
        prop::collection::vec((field_name(), inner), 0..4).prop_map(|fields| {
            let schema = fields
                .into_iter()
                .fold(SchemaDefinition::new(), |s, (name, kind)| s.field(name, kind));
            FieldKind::Nested(schema)
        })
    });
    prop::collection::vec((field_name(), kind), 0..6).prop_map(|fields| {
        fields
            .into_iter()
            .fold(SchemaDefinition::new(), |s, (name, kind)| s.field(name, kind))
    })
}

fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        "[a-z0-9 .-]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((field_name(), inner), 0..5)
                .prop_map(|kv| Value::Object(kv.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn object_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec((field_name(), json_strategy()), 0..6)
        .prop_map(|kv| Value::Object(kv.into_iter().collect::<Map<_, _>>()))
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    /// cast(cast(x)) == cast(x)
    #[test]
    fn cast_is_idempotent(schema in schema_strategy(), input in json_strategy()) {
        let once = schema.cast(&input);
        let twice = schema.cast(&once);
        prop_assert_eq!(twice, once);
    }

    /// Objects are the interesting inputs; sample them directly as well.
    #[test]
    fn cast_is_idempotent_for_objects(schema in schema_strategy(), input in object_strategy()) {
        let once = schema.cast(&input);
        prop_assert_eq!(schema.cast(&once), once);
    }

    /// default_value(S) always satisfies validate(S, ·)
    #[test]
    fn default_value_validates(schema in schema_strategy()) {
        prop_assert!(schema.validate(&schema.default_value()));
    }

    /// cast never introduces undeclared fields
    #[test]
    fn cast_only_keeps_declared_fields(schema in schema_strategy(), input in object_strategy()) {
        let cast = schema.cast(&input);
        for key in cast.as_object().unwrap().keys() {
            prop_assert!(schema.get(key).is_some());
        }
    }

    /// merge(default_value(S), cast(S, x)) always satisfies validate(S, ·)
    #[test]
    fn cast_over_defaults_validates(schema in schema_strategy(), input in json_strategy()) {
        let value = merge(&schema.default_value(), &schema.cast(&input));
        prop_assert!(schema.validate(&value));
    }
}
