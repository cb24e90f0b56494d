//! HTTP-level tests for the gateway: routing, envelope, and session cookies.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    },
    serde_json::{Value, json},
    tower::ServiceExt,
};

use graphbind_gateway::{GatewayConfig, Server};
use graphbind_graphql::Provider;

const SDL: &str = r#"
    type Query { me: String }
    type Mutation { login(name: String): String }
"#;

fn test_config(schema_dir: &std::path::Path, debug: bool) -> GatewayConfig {
    let yaml = format!(
        r#"
http_port: 0
debug: {debug}
server:
  routes:
    - mode: gql
      endpoint: /graphql
      schema: {}
"#,
        schema_dir.display()
    );
    serde_yaml::from_str(&yaml).unwrap()
}

async fn test_server(debug: bool) -> (Arc<Server>, Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("schema.gql"), SDL).unwrap();

    let server = Arc::new(Server::new(test_config(dir.path(), debug)));
    server.provider(
        "Query",
        Provider::new().method("me", |info| async move {
            let user = info
                .context
                .session()
                .and_then(|session| session.get("user"));
            Ok(user.unwrap_or(Value::Null))
        }),
    );
    server.provider(
        "Mutation",
        Provider::new().method("login", |info| async move {
            let session = info.context.begin_session(Duration::from_secs(60));
            session.set("user", info.args["name"].clone());
            Ok(json!(session.id()))
        }),
    );
    server.load().await.unwrap();
    let router = server.router();
    (server, router, dir)
}

async fn post(router: &Router, body: Value) -> (StatusCode, Option<String>, Value) {
    post_with_cookie(router, body, None).await
}

async fn post_with_cookie(
    router: &Router,
    body: Value,
    cookie: Option<&str>,
) -> (StatusCode, Option<String>, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let request = request.body(Body::from(body.to_string())).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, set_cookie, json)
}

#[tokio::test]
async fn login_sets_cookie_and_later_requests_see_the_session() {
    let (_server, router, _dir) = test_server(false).await;

    let (status, set_cookie, body) = post(
        &router,
        json!({"query": r#"mutation { login(name: "ada") }"#}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = body["data"]["login"].as_str().unwrap().to_string();

    let cookie = set_cookie.expect("login sets a session cookie");
    assert!(cookie.starts_with(&format!("session_id={session_id}")));
    assert!(cookie.contains("Max-Age=60"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"));

    let (status, _, body) = post_with_cookie(
        &router,
        json!({"query": "{ me }"}),
        Some(&format!("session_id={session_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["me"], "ada");
}

#[tokio::test]
async fn request_without_session_resolves_null() {
    let (_server, router, _dir) = test_server(false).await;

    let (status, set_cookie, body) = post(&router, json!({"query": "{ me }"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(set_cookie.is_none());
    assert_eq!(body["data"]["me"], Value::Null);
}

#[tokio::test]
async fn expired_session_cookie_is_ignored() {
    let (server, router, _dir) = test_server(false).await;
    let session = server.sessions().create(Duration::from_millis(5));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (_, _, body) = post_with_cookie(
        &router,
        json!({"query": "{ me }"}),
        Some(&format!("session_id={}", session.id())),
    )
    .await;
    assert_eq!(body["data"]["me"], Value::Null);
}

#[tokio::test]
async fn malformed_body_is_a_400_with_error_envelope() {
    let (_server, router, _dir) = test_server(false).await;

    let request = Request::builder()
        .method("POST")
        .uri("/graphql")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(
        body["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("malformed request body")
    );
}

#[tokio::test]
async fn unknown_route_is_a_404_with_error_envelope() {
    let (_server, router, _dir) = test_server(false).await;

    let request = Request::builder()
        .method("POST")
        .uri("/other")
        .body(Body::from(json!({"query": "{ me }"}).to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["errors"][0]["message"], "schema not found");
}

#[tokio::test]
async fn graphiql_is_gated_by_the_debug_flag() {
    let (_server, router, _dir) = test_server(true).await;
    let request = Request::builder()
        .method("GET")
        .uri("/graphql")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("GraphiQL"));

    let (_server, router, _dir) = test_server(false).await;
    let request = Request::builder()
        .method("GET")
        .uri("/graphql")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn field_errors_keep_http_200() {
    let (server, router, _dir) = test_server(false).await;
    server.on_authorize(|_| false);

    let (status, _, body) = post(&router, json!({"query": "{ me }"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["errors"][0]["extensions"]["code"], "FORBIDDEN");
    assert_eq!(body["data"]["me"], Value::Null);
}
