//! JSON to engine-value conversion.
//!
//! Resolvers, codecs, and directives all trade in JSON; the engine speaks its
//! own value type for leaf output and input defaults.

use async_graphql::{Name, Value};

use graphbind_common::Json;

/// Convert JSON into an engine value. Lossless except for numbers outside
/// the f64/i64 range, which degrade to null.
pub fn json_to_gql_value(v: &Json) -> Value {
    match v {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                Value::Number(async_graphql::Number::from_f64(f).unwrap_or_else(|| 0i32.into()))
            } else {
                Value::Null
            }
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(a) => Value::List(a.iter().map(json_to_gql_value).collect()),
        Json::Object(m) => {
            let map: async_graphql::indexmap::IndexMap<Name, Value> = m
                .iter()
                .map(|(k, v)| (Name::new(k), json_to_gql_value(v)))
                .collect();
            Value::Object(map)
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {super::*, serde_json::json};

    #[test]
    fn scalars_and_lists_convert() {
        let gql = json_to_gql_value(&json!(["x", null, true, 2]));
        assert_eq!(
            gql,
            Value::List(vec![
                Value::String("x".to_string()),
                Value::Null,
                Value::Boolean(true),
                Value::Number(2.into()),
            ])
        );
    }

    #[test]
    fn objects_keep_their_keys() {
        let gql = json_to_gql_value(&json!({"a": 1, "b": {"c": false}}));
        let Value::Object(map) = gql else {
            panic!("expected an object value");
        };
        assert_eq!(map.get("a"), Some(&Value::Number(1.into())));
        assert_eq!(
            map.get("b"),
            Some(&Value::Object(
                [(Name::new("c"), Value::Boolean(false))].into_iter().collect()
            ))
        );
    }
}
