//! Property tests for the wire codec and the decoder's shape tolerance.

mod common;

use common::{docker_schema, json};
use proptest::prelude::*;
use taskconf::{decode, wire, CanonicalValue, Value, Variables};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::integer),
        (-1.0e12f64..1.0e12).prop_map(Value::float),
        "[a-z0-9 ${}]{0,12}".prop_map(Value::string),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::vec(("[a-z_]{1,8}", inner), 0..4).prop_map(Value::object),
        ]
    })
}

fn canonical() -> impl Strategy<Value = CanonicalValue> {
    prop::collection::vec(("[a-z_]{1,8}", value()), 0..6).prop_filter_map(
        "object at the top level",
        |entries| CanonicalValue::from_wire(Value::object(entries)),
    )
}

proptest! {
    #[test]
    fn prop_round_trip(config in canonical()) {
        let bytes = wire::encode(&config).unwrap();
        prop_assert_eq!(wire::decode_canonical(&bytes).unwrap(), config);
    }

    #[test]
    fn prop_encoding_is_deterministic(config in canonical()) {
        let copy = config.clone();
        prop_assert_eq!(wire::encode(&config).unwrap(), wire::encode(&copy).unwrap());
    }

    #[test]
    fn prop_quoted_number_matches_unquoted(n in any::<i64>()) {
        let schema = docker_schema();
        let vars = Variables::new();
        let quoted = Value::object([("image", Value::string("redis")), ("pids_limit", Value::string(n.to_string()))]);
        let bare = Value::object([("image", Value::string("redis")), ("pids_limit", Value::integer(n))]);
        let a = decode(&quoted, &schema, &vars);
        let b = decode(&bare, &schema, &vars);
        prop_assert!(a.diagnostics.is_empty());
        prop_assert_eq!(a.value, b.value);
    }

    #[test]
    fn prop_singleton_block_shapes_agree(kind in "[a-z]{1,8}", tag in "[a-z-]{0,12}") {
        let schema = docker_schema();
        let vars = Variables::new();
        let logging = Value::object([
            ("type", Value::string(kind)),
            ("config", Value::object([("tag", Value::string(tag))])),
        ]);
        let bare = Value::object([("image", Value::string("redis")), ("logging", logging.clone())]);
        let listed = Value::List(vec![Value::object([
            ("image", Value::string("redis")),
            ("logging", Value::List(vec![logging])),
        ])]);
        prop_assert_eq!(decode(&bare, &schema, &vars), decode(&listed, &schema, &vars));
    }

    #[test]
    fn prop_decoded_config_has_every_field(extra in "[a-z]{1,8}") {
        let schema = docker_schema();
        let config = Value::object([("image", Value::string("redis")), (extra.as_str(), Value::integer(1))]);
        let decoded = decode(&config, &schema, &Variables::new());
        for field in schema.fields() {
            prop_assert!(decoded.value.get(field.name()).is_some(), "missing {}", field.name());
        }
        prop_assert_eq!(decoded.value.len(), schema.len());
    }
}

#[test]
fn test_decode_value_of_decoded_docker_config() {
    let decoded = decode(&json(r#"{"image": "redis:3.2", "args": ["a"]}"#), &docker_schema(), &Variables::new());
    let bytes = wire::encode(&decoded.value).unwrap();
    assert_eq!(wire::decode_value(&bytes).unwrap(), decoded.value.to_value());
}
