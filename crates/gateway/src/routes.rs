//! HTTP handlers: GraphQL execution on POST, GraphiQL on GET.

use std::sync::Arc;

use {
    async_graphql::http::GraphiQLSource,
    axum::{
        extract::{OriginalUri, State},
        http::{HeaderMap, HeaderValue, StatusCode, header},
        response::{Html, IntoResponse, Response},
    },
    serde::Deserialize,
    serde_json::json,
};

use {
    graphbind_common::Json,
    graphbind_graphql::{ExecuteRequest, RequestContext, execute},
    graphbind_sessions::Session,
};

use crate::server::Server;

#[derive(Debug, Deserialize)]
struct GraphQLPayload {
    query: String,
    #[serde(default)]
    variables: Option<Json>,
    #[serde(default, rename = "operationName")]
    operation_name: Option<String>,
}

/// GraphQL-shaped error body with the given HTTP status.
fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        axum::Json(json!({ "errors": [{ "message": message }] })),
    )
        .into_response()
}

/// Value of the named cookie, if the request carries one.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn session_cookie(server: &Server, session: &Session) -> String {
    let config = server.config();
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        config.cookie_name,
        session.id(),
        session.max_age().as_secs()
    );
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Execute a GraphQL request against the route's bound schema.
pub(crate) async fn graphql_post(
    State(server): State<Arc<Server>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(route) = server.route(uri.path()) else {
        return error_response(StatusCode::NOT_FOUND, "schema not found");
    };
    let payload: GraphQLPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("malformed request body: {e}"));
        },
    };
    let Some(bound) = route.bound().await else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "schema not loaded");
    };

    let session_id = cookie_value(&headers, &server.config().cookie_name);
    let ctx = Arc::new(RequestContext::new(
        server.sessions().clone(),
        session_id,
        headers,
    ));

    let response = execute(
        &bound,
        ExecuteRequest {
            query: &payload.query,
            operation_name: payload.operation_name.as_deref(),
            variables: payload.variables,
        },
        ctx.clone(),
    )
    .await;

    let body = serde_json::to_value(&response)
        .unwrap_or_else(|e| json!({ "errors": [{ "message": format!("serialization failed: {e}") }] }));

    // Field errors never change the HTTP status; transport-level failures
    // were handled above.
    let mut http_response = (StatusCode::OK, axum::Json(body)).into_response();
    if let Some(session) = ctx.new_session() {
        if let Ok(value) = HeaderValue::from_str(&session_cookie(&server, &session)) {
            http_response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    http_response
}

/// GraphiQL, served only when the debug flag is on.
pub(crate) async fn graphql_get(
    State(server): State<Arc<Server>>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    if !server.config().debug {
        return error_response(StatusCode::NOT_FOUND, "not found");
    }
    if server.route(uri.path()).is_none() {
        return error_response(StatusCode::NOT_FOUND, "schema not found");
    }
    Html(GraphiQLSource::build().endpoint(uri.path()).finish()).into_response()
}

pub(crate) async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "schema not found")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn finds_cookie_among_several() {
        let headers = headers_with_cookie("theme=dark; session_id=abc-123; lang=en");
        assert_eq!(
            cookie_value(&headers, "session_id"),
            Some("abc-123".to_string())
        );
        assert_eq!(cookie_value(&headers, "theme"), Some("dark".to_string()));
    }

    #[test]
    fn missing_cookie_is_none() {
        let headers = headers_with_cookie("theme=dark");
        assert_eq!(cookie_value(&headers, "session_id"), None);
        assert_eq!(cookie_value(&HeaderMap::new(), "session_id"), None);
    }

    #[test]
    fn payload_accepts_operation_name_casing() {
        let payload: GraphQLPayload = serde_json::from_str(
            r#"{"query": "{ ping }", "operationName": "Q", "variables": {"a": 1}}"#,
        )
        .unwrap();
        assert_eq!(payload.operation_name.as_deref(), Some("Q"));
        assert_eq!(payload.variables.unwrap()["a"], 1);
    }
}
