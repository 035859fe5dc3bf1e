//! Call API integration tests - router → engine → tool → envelope.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use toolserver_core::auth::{AuthService, AuthorizationRequest, AuthorizationStatus};
use toolserver_core::http::{router, ApiKeyAuthenticator, AppState, API_KEY_HEADER};
use toolserver_core::tools::{
    AuthRequirement, HealthConfig, SemVer, ToolFailure, ToolHealthTracker, ToolSpec,
};
use toolserver_core::types::ApiKeyGrant;
use toolserver_core::{FnTool, ToolCatalog, ToolEngine};

#[derive(Deserialize, schemars::JsonSchema)]
struct AddArgs {
    x: i64,
    y: i64,
}

struct PendingAuth;

#[async_trait]
impl AuthService for PendingAuth {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> toolserver_core::Result<AuthorizationStatus> {
        Ok(AuthorizationStatus::Pending {
            auth_url: format!("https://auth.example/{}", request.provider),
            auth_id: "auth-42".to_string(),
        })
    }
}

fn catalog() -> ToolCatalog {
    let mut catalog = ToolCatalog::new();
    catalog
        .register(
            FnTool::typed("add", "Add two integers", |a: AddArgs| async move {
                Ok::<_, ToolFailure>(a.x + a.y)
            }),
            Vec::<String>::new(),
            None,
        )
        .unwrap();
    catalog
        .register(
            FnTool::new(
                ToolSpec::new("secret", "Admin only", json!({"type": "object"})),
                |_args| async { Ok(json!("classified")) },
            ),
            ["admin"],
            Some(SemVer::new(2, 0, 0)),
        )
        .unwrap();
    catalog
        .register(
            FnTool::new(
                ToolSpec::new("repos", "List repositories", json!({"type": "object"}))
                    .with_auth(AuthRequirement::new("github", ["repo"]).unwrap()),
                |_args| async { Ok(json!(["a", "b"])) },
            ),
            Vec::<String>::new(),
            None,
        )
        .unwrap();
    catalog
}

fn open_app() -> axum::Router {
    router(AppState::new(ToolEngine::new(Arc::new(catalog()))))
}

fn secured_app() -> axum::Router {
    let keys: HashMap<String, ApiKeyGrant> = [
        (
            "user-key".to_string(),
            ApiKeyGrant {
                identity: "alice".to_string(),
                scopes: Default::default(),
            },
        ),
        (
            "admin-key".to_string(),
            ApiKeyGrant {
                identity: "root".to_string(),
                scopes: ["admin".to_string()].into_iter().collect(),
            },
        ),
    ]
    .into_iter()
    .collect();

    let engine = ToolEngine::new(Arc::new(catalog()))
        .with_authorization(true)
        .with_auth_service(Arc::new(PendingAuth));
    router(AppState::new(engine).with_authenticator(Arc::new(ApiKeyAuthenticator::new(keys))))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn call_request(key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/call")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn list_request(key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/");
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::empty()).unwrap()
}

fn envelope(tool_id: &str, input: Value) -> Value {
    json!({
        "$schema": "urn:oxp:1.0",
        "request": {"tool_id": tool_id, "input": input},
    })
}

#[tokio::test]
async fn test_call_add_returns_value() {
    let body = json!({
        "$schema": "urn:oxp:1.0",
        "request": {"tool_id": "add", "input": {"x": 2, "y": 3}, "call_id": "c-1"},
    });
    let (status, body) = send(open_app(), call_request(None, body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["value"], 5);
    assert_eq!(body["call_id"], "c-1");
}

#[tokio::test]
async fn test_call_generates_call_id_when_absent() {
    let (status, body) = send(
        open_app(),
        call_request(None, envelope("add", json!({"x": 1, "y": 1}))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["call_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_legacy_protocol_schema_is_accepted() {
    let body = json!({
        "$schema": "otc://1.0",
        "request": {"tool_id": "add", "input": {"x": 4, "y": 4}},
    });
    let (status, body) = send(open_app(), call_request(None, body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], 8);
}

#[tokio::test]
async fn test_unknown_protocol_schema_is_rejected() {
    let body = json!({
        "$schema": "urn:oxp:2.0",
        "request": {"tool_id": "add", "input": {"x": 1, "y": 2}},
    });
    let (status, body) = send(open_app(), call_request(None, body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Invalid protocol schema"));
}

#[tokio::test]
async fn test_invalid_payload_is_bad_request() {
    let (status, body) = send(
        open_app(),
        call_request(None, envelope("add", json!({"x": "two", "y": 3}))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("Invalid payload for tool call to tool add"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/call")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(open_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_tool_is_not_found_without_authorization() {
    let (status, body) = send(open_app(), call_request(None, envelope("nope", json!({})))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Tool nope not found");
}

#[tokio::test]
async fn test_missing_api_key_is_unauthorized() {
    let (status, body) = send(secured_app(), call_request(None, envelope("add", json!({})))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Missing API key");
}

#[tokio::test]
async fn test_forbidden_and_unknown_are_indistinguishable() {
    let (secret_status, secret_body) = send(
        secured_app(),
        call_request(Some("user-key"), envelope("secret", json!({}))),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        secured_app(),
        call_request(Some("user-key"), envelope("nope", json!({}))),
    )
    .await;

    assert_eq!(secret_status, StatusCode::FORBIDDEN);
    assert_eq!(secret_status, unknown_status);
    assert_eq!(secret_body["error"], unknown_body["error"]);
    assert_eq!(
        secret_body["error"]["message"],
        "Tool either does not exist or insufficient permissions"
    );
}

#[tokio::test]
async fn test_scoped_caller_can_call_secret() {
    let (status, body) = send(
        secured_app(),
        call_request(Some("admin-key"), envelope("secret", json!({}))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "classified");
}

#[tokio::test]
async fn test_auth_challenge_is_a_successful_envelope() {
    let (status, body) = send(
        secured_app(),
        call_request(Some("user-key"), envelope("repos", json!({}))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["value"]["auth_required"], true);
    assert_eq!(body["value"]["auth_url"], "https://auth.example/github");
    assert_eq!(body["value"]["auth_id"], "auth-42");
}

#[tokio::test]
async fn test_listing_is_filtered_by_scope() {
    let (status, body) = send(secured_app(), list_request(Some("user-key"))).await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"add"));
    assert!(!names.contains(&"secret"));

    let (_, admin_body) = send(secured_app(), list_request(Some("admin-key"))).await;
    let secret = admin_body
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "secret")
        .unwrap();
    assert_eq!(secret["version"], "2.0.0");
}

#[tokio::test]
async fn test_every_listed_tool_is_callable() {
    let (_, listing) = send(secured_app(), list_request(Some("user-key"))).await;

    for tool in listing.as_array().unwrap() {
        let tool_id = tool["id"].as_str().unwrap();
        let (status, _) = send(
            secured_app(),
            call_request(Some("user-key"), envelope(tool_id, json!({"x": 1, "y": 1}))),
        )
        .await;
        assert_ne!(status, StatusCode::FORBIDDEN, "{tool_id} was listed");
    }
}

#[tokio::test]
async fn test_health_reports_recorded_calls() {
    let config = HealthConfig {
        min_calls_for_assessment: 1,
        ..HealthConfig::default()
    };
    let tracker = Arc::new(ToolHealthTracker::new(config).with_registered_tools(vec!["add".into()]));
    let engine = ToolEngine::new(Arc::new(catalog())).with_observer(tracker.clone());
    let app = router(AppState::new(engine).with_health(tracker));

    let (status, _) = send(
        app.clone(),
        call_request(None, envelope("add", json!({"x": 1, "y": 2}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["tools"][0]["tool_id"], "add");
}

#[tokio::test]
async fn test_health_without_tracker_is_unknown() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(open_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unknown");
}

#[tokio::test]
async fn test_authentication_precedes_protocol_check() {
    let body = json!({
        "$schema": "urn:oxp:2.0",
        "request": {"tool_id": "add", "input": {"x": 1, "y": 2}},
    });
    let (status, _) = send(secured_app(), call_request(None, body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_timed_out_call_is_still_recorded() {
    let mut catalog = ToolCatalog::new();
    catalog
        .register(
            FnTool::new(
                ToolSpec::new("slow", "Sleeps", json!({"type": "object"})),
                |_args| async {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok(json!("late"))
                },
            ),
            Vec::<String>::new(),
            None,
        )
        .unwrap();
    let config = HealthConfig {
        min_calls_for_assessment: 1,
        ..HealthConfig::default()
    };
    let tracker = Arc::new(ToolHealthTracker::new(config));
    let engine = ToolEngine::new(Arc::new(catalog)).with_observer(tracker.clone());
    let app = router(
        AppState::new(engine)
            .with_health(tracker.clone())
            .with_request_timeout(Duration::from_millis(50)),
    );

    let (status, body) = send(app, call_request(None, envelope("slow", json!({})))).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["success"], false);

    tokio::time::sleep(Duration::from_millis(800)).await;
    let report = tracker.check_tool_health("slow");
    assert_eq!(report.total_calls, 1);
    assert_eq!(report.failures, 0);
}

fn mcp_request(key: Option<&str>, message: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(message.to_string())).unwrap()
}

fn listed_names(reply: &Value) -> Vec<String> {
    reply["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_mcp_requires_authentication() {
    let message = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
    let (status, _) = send(secured_app(), mcp_request(None, message)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mcp_tools_are_filtered_per_caller() {
    let message = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});

    let (status, user) = send(secured_app(), mcp_request(Some("user-key"), message.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed_names(&user), vec!["add", "repos"]);

    let (_, admin) = send(secured_app(), mcp_request(Some("admin-key"), message)).await;
    assert_eq!(listed_names(&admin), vec!["add", "repos", "secret"]);
}

#[tokio::test]
async fn test_mcp_call_runs_as_caller() {
    let add = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                     "params": {"name": "add", "arguments": {"x": 2, "y": 3}}});
    let (status, reply) = send(secured_app(), mcp_request(Some("user-key"), add)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["id"], 2);
    assert_eq!(reply["result"]["content"], json!([{"type": "text", "text": "5"}]));

    let secret = json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                        "params": {"name": "secret", "arguments": {}}});
    let (_, reply) = send(secured_app(), mcp_request(Some("user-key"), secret)).await;
    assert_eq!(reply["error"]["code"], -32602);

    let secret = json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                        "params": {"name": "secret", "arguments": {}}});
    let (_, reply) = send(secured_app(), mcp_request(Some("admin-key"), secret)).await;
    assert_eq!(reply["result"]["content"][0]["text"], "classified");
}

#[tokio::test]
async fn test_mcp_notification_is_accepted_without_body() {
    let message = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    let (status, body) = send(open_app(), mcp_request(None, message)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);
}
