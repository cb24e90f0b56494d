//! Error mapping from typed field errors to engine errors.

use async_graphql::ErrorExtensions;

use graphbind_common::GqlError;

use crate::value::json_to_gql_value;

/// Convert a typed field error into an `async_graphql::Error`, carrying
/// `code` and `level` (plus any custom extensions) into the response's
/// `extensions` object.
pub fn to_engine_error(err: GqlError) -> async_graphql::Error {
    let extensions = err.extension_map();
    async_graphql::Error::new(err.message).extend_with(|_, e| {
        for (key, value) in &extensions {
            e.set(key, json_to_gql_value(value));
        }
    })
}

/// Fatal authorization failure for a field, named `DstType.fieldName`.
pub fn denied(dst_type: &str, field_name: &str) -> GqlError {
    GqlError::fatal(format!("access denied: {dst_type}.{field_name}")).with_code("FORBIDDEN")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {super::*, async_graphql::Value};

    #[test]
    fn engine_error_carries_code_and_level() {
        let err = to_engine_error(GqlError::fatal("boom").with_code("500"));
        assert_eq!(err.message, "boom");
        let ext = err.extensions.unwrap();
        assert_eq!(ext.get("code"), Some(&Value::String("500".into())));
        assert_eq!(ext.get("level"), Some(&Value::String("fatal".into())));
    }

    #[test]
    fn denial_names_destination_type_and_field() {
        let err = denied("Company", "company");
        assert_eq!(err.message, "access denied: Company.company");
        assert_eq!(err.code, "FORBIDDEN");
        assert!(err.is_fatal());
    }
}
