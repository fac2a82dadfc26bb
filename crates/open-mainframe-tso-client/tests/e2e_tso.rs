//! TSO client end-to-end tests.
//!
//! Runs the client against an in-process mock of the z/OSMF TSO REST
//! services, routed through `tower::ServiceExt::oneshot` so every call goes
//! through real HTTP request/response types, headers and status codes.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;

use open_mainframe_tso_client::{
    ClientConfig, HttpRequest, HttpResponse, StartParams, TsoClient, TsoClientError, TsoSession,
    TsoStage, Transport,
};

const TEST_AUTH: &str = "Basic SUJNVVNFUjpURVNUUEFTUw==";

// ─── Mock z/OSMF ───

#[derive(Default)]
struct MockZosmf {
    sessions: Mutex<HashMap<String, VecDeque<Vec<Value>>>>,
    next_key: Mutex<u32>,
    starts: Mutex<Vec<HashMap<String, String>>>,
    stops: Mutex<Vec<String>>,
    receives: Mutex<u32>,
}

type Shared = Arc<MockZosmf>;

fn message(text: &str) -> Value {
    json!({"TSO MESSAGE": {"VERSION": "0100", "DATA": text}})
}

fn prompt() -> Value {
    json!({"TSO PROMPT": {"VERSION": "0100", "HIDDEN": "FALSE"}})
}

/// Output batches for a command: each inner vec is one reply.
fn command_output(command: &str) -> Vec<Vec<Value>> {
    match command.trim() {
        "TIME" => vec![vec![
            message("IKJ56650I TIME-09:15:22 AM. CPU-00:00:01 SERVICE-1234 SESSION-00:01:02"),
            prompt(),
        ]],
        "LU TESTUSER" => vec![
            vec![message("USER=TESTUSER  NAME=TEST USER  OWNER=SYS1")],
            vec![message(" DEFAULT-GROUP=SYS1     PASSDATE=00.000")],
            vec![message(" ATTRIBUTES=NONE"), prompt()],
        ],
        // Output arrives only after a leftover prompt.
        "STATUS" => vec![
            vec![prompt()],
            vec![message("IKJ56192I JOB TESTJOB(JOB00042) ON OUTPUT QUEUE"), prompt()],
        ],
        "HANG" => vec![vec![message("working...")]],
        other => vec![vec![
            message(&format!("IKJ56500I COMMAND {} NOT FOUND", other)),
            prompt(),
        ]],
    }
}

fn check_headers(headers: &HeaderMap, mutating: bool) -> Result<(), (StatusCode, Json<Value>)> {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(TEST_AUTH) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"rc": 4, "reason": 0, "category": 2, "message": "Authentication required"})),
        ));
    }
    if mutating && !headers.contains_key("x-csrf-zosmf-header") {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({"rc": 8, "reason": 0, "category": 3, "message": "CSRF validation failed"})),
        ));
    }
    Ok(())
}

fn not_found(key: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "rc": 8, "reason": 0, "category": 4,
            "message": format!("TSO session '{}' not found", key)
        })),
    )
}

type Reply = Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)>;

async fn start_session(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    check_headers(&headers, true)?;
    state.starts.lock().unwrap().push(query.clone());

    if query.get("acct").map(String::as_str) == Some("NULLKEY") {
        return Ok((StatusCode::OK, Json(json!({"servletKey": "null", "ver": "0100"}))));
    }

    let key = {
        let mut next = state.next_key.lock().unwrap();
        *next += 1;
        format!("IBMUSER-{}-aabcaaaf", *next)
    };
    state.sessions.lock().unwrap().insert(key.clone(), VecDeque::new());

    Ok((
        StatusCode::OK,
        Json(json!({
            "servletKey": key,
            "queueID": "4",
            "ver": "0100",
            "reused": false,
            "timeout": false,
            "tsoData": [
                message("IKJ56455I IBMUSER LOGON IN PROGRESS AT 09:15:20 ON OCTOBER 16, 2026"),
                message("IKJ56951I NO BROADCAST MESSAGES"),
                prompt()
            ]
        })),
    ))
}

#[derive(Deserialize)]
struct SendQuery {
    #[serde(rename = "readReply")]
    read_reply: Option<String>,
}

async fn send_or_receive(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Query(query): Query<SendQuery>,
    body: Bytes,
) -> Reply {
    check_headers(&headers, true)?;
    let mut sessions = state.sessions.lock().unwrap();
    let pending = sessions.get_mut(&key).ok_or_else(|| not_found(&key))?;

    if !body.is_empty() {
        assert_eq!(query.read_reply.as_deref(), Some("false"));
        let request: Value = serde_json::from_slice(&body).map_err(|_| {
            (StatusCode::BAD_REQUEST, Json(json!({"rc": 4, "reason": 0, "message": "bad body"})))
        })?;
        assert_eq!(request["TSO RESPONSE"]["VERSION"], "0100");
        let command = request["TSO RESPONSE"]["DATA"].as_str().unwrap_or_default();
        pending.extend(command_output(command));
    } else {
        *state.receives.lock().unwrap() += 1;
    }

    let batch = pending.pop_front().unwrap_or_default();
    Ok((
        StatusCode::OK,
        Json(json!({"servletKey": key, "ver": "0100", "tsoData": batch})),
    ))
}

async fn stop_session(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Reply {
    check_headers(&headers, true)?;
    state
        .sessions
        .lock()
        .unwrap()
        .remove(&key)
        .ok_or_else(|| not_found(&key))?;
    state.stops.lock().unwrap().push(key.clone());
    Ok((
        StatusCode::OK,
        Json(json!({"servletKey": key, "ver": "0100", "reused": false, "timeout": false})),
    ))
}

async fn ping_session(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Reply {
    check_headers(&headers, true)?;
    if !state.sessions.lock().unwrap().contains_key(&key) {
        return Err(not_found(&key));
    }
    Ok((StatusCode::OK, Json(json!({"servletKey": key, "ver": "0100"}))))
}

async fn stateless_command(headers: HeaderMap, Json(request): Json<Value>) -> Reply {
    check_headers(&headers, true)?;
    assert_eq!(request["cmdState"], "stateless");
    let command = request["tsoCmd"].as_str().unwrap_or_default();
    let lines: Vec<Value> = command_output(command)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry["TSO MESSAGE"]["DATA"].as_str().map(|s| json!({"message": s})))
        .chain(std::iter::once(json!({"message": "READY"})))
        .collect();
    Ok((
        StatusCode::OK,
        Json(json!({
            "servletKey": null,
            "ver": "0100",
            "cmdResponse": lines,
            "reused": false,
            "timeout": false,
            "tsoPromptReceived": "Y",
            "keywordDetected": "N"
        })),
    ))
}

fn mock_router(state: Shared) -> Router {
    Router::new()
        .route("/zosmf/tsoApp/tso", post(start_session))
        .route(
            "/zosmf/tsoApp/tso/{servlet_key}",
            put(send_or_receive).delete(stop_session),
        )
        .route("/zosmf/tsoApp/tso/ping/{servlet_key}", put(ping_session))
        .route("/zosmf/tsoApp/v1/tso", put(stateless_command))
        .with_state(state)
}

// ─── Transport over the router ───

struct RouterTransport {
    router: Router,
}

#[async_trait]
impl Transport for RouterTransport {
    async fn execute(
        &self,
        request: HttpRequest,
    ) -> open_mainframe_tso_client::Result<HttpResponse> {
        let mut builder = Request::builder()
            .method(request.method.as_str())
            .uri(format!("/zosmf{}", request.uri()));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let http_request = builder
            .body(request.body.map(Body::from).unwrap_or_else(Body::empty))
            .map_err(|e| TsoClientError::Transport(e.to_string()))?;

        let response = self
            .router
            .clone()
            .oneshot(http_request)
            .await
            .map_err(|e| TsoClientError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .map_err(|e| TsoClientError::Transport(e.to_string()))?;
        Ok(HttpResponse::new(status, String::from_utf8_lossy(&body)))
    }
}

fn setup() -> (Shared, TsoClient) {
    let state: Shared = Arc::new(MockZosmf::default());
    let transport = RouterTransport {
        router: mock_router(state.clone()),
    };
    let client = TsoClient::new(Arc::new(transport)).with_auth_header("Authorization", TEST_AUTH);
    (state, client)
}

// ─── Test: Issue a command (zowe zos-tso issue command) ───

#[tokio::test]
async fn test_issue_command_collects_until_prompt() {
    let (state, client) = setup();

    let transcript = client
        .issue_command(&StartParams::new("ACCT1"), "LU TESTUSER")
        .await
        .unwrap();

    assert_eq!(
        transcript.lines(),
        [
            "USER=TESTUSER  NAME=TEST USER  OWNER=SYS1",
            " DEFAULT-GROUP=SYS1     PASSDATE=00.000",
            " ATTRIBUTES=NONE",
        ]
    );
    assert_eq!(*state.receives.lock().unwrap(), 2);
    assert_eq!(state.stops.lock().unwrap().len(), 1);
    assert!(state.sessions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_query_defaults() {
    let (state, client) = setup();

    client
        .issue_command(&StartParams::new("ACCT1"), "TIME")
        .await
        .unwrap();

    let starts = state.starts.lock().unwrap();
    let query = &starts[0];
    assert_eq!(query["acct"], "ACCT1");
    assert_eq!(query["proc"], "IZUFPROC");
    assert_eq!(query["chset"], "697");
    assert_eq!(query["cpage"], "1047");
    assert_eq!(query["rows"], "24");
    assert_eq!(query["cols"], "80");
    assert_eq!(query["rsize"], "4096");
}

#[tokio::test]
async fn test_leftover_prompt_is_polled_through() {
    let (state, client) = setup();

    let transcript = client
        .issue_command(&StartParams::new("ACCT1"), "STATUS")
        .await
        .unwrap();

    assert_eq!(
        transcript.lines(),
        ["IKJ56192I JOB TESTJOB(JOB00042) ON OUTPUT QUEUE"]
    );
    assert_eq!(*state.receives.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_manual_session_lifecycle() {
    let (state, client) = setup();

    let session = client.start(&StartParams::new("ACCT1")).await.unwrap();
    assert_eq!(session.queue_id(), Some("4"));
    assert_eq!(session.logon_messages().len(), 2);

    let ping = client.ping(&session).await.unwrap();
    assert_eq!(ping.servlet_key.as_deref(), Some(session.servlet_key()));

    let first = client.send(&session, "TIME").await.unwrap();
    assert_eq!(first.tso_data.len(), 2);

    let key = session.servlet_key().to_string();
    let stop = client.stop(session).await.unwrap();
    assert_eq!(stop.servlet_key.as_deref(), Some(key.as_str()));
    assert_eq!(*state.stops.lock().unwrap(), [key.clone()]);

    // The session is gone on the host; an attached handle gets a 404.
    let stale = TsoSession::attach(key);
    let err = client.ping(&stale).await.unwrap_err();
    stale.detach();
    match err {
        TsoClientError::Http { status, zosmf, .. } => {
            assert_eq!(status, 404);
            assert_eq!(zosmf.unwrap().category, 4);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_null_servlet_key_is_protocol_error() {
    let (state, client) = setup();

    let err = client
        .issue_command(&StartParams::new("NULLKEY"), "TIME")
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(TsoStage::Start));
    assert!(err.is_protocol());
    assert!(state.stops.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_auth_is_transport_error() {
    let state: Shared = Arc::new(MockZosmf::default());
    let client = TsoClient::new(Arc::new(RouterTransport {
        router: mock_router(state.clone()),
    }));

    let err = client
        .issue_command(&StartParams::new("ACCT1"), "TIME")
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(matches!(err.root(), TsoClientError::Http { status: 401, .. }));
    assert!(state.starts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_poll_limit_from_config_stops_session() {
    let config = ClientConfig::from_toml_str("[collect]\nmax_polls = 5\n").unwrap();
    let (state, client) = setup();
    let client = client.with_collect_options(config.collect_options());

    let err = client
        .issue_command(&StartParams::new("ACCT1"), "HANG")
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(TsoStage::Collect));
    assert!(matches!(err.root(), TsoClientError::ReplyLimit { polls: 5 }));
    assert_eq!(*state.receives.lock().unwrap(), 4);
    assert_eq!(state.stops.lock().unwrap().len(), 1);
    assert!(state.sessions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stateless_command() {
    let (state, client) = setup();

    let transcript = client.issue_stateless("TIME").await.unwrap();

    assert_eq!(transcript.len(), 2);
    assert!(transcript.lines()[0].starts_with("IKJ56650I TIME-"));
    assert_eq!(transcript.lines()[1], "READY");
    assert!(state.starts.lock().unwrap().is_empty());
}
