//! Drives the real `reqwest` client against an in-process stand-in for the
//! GitHub REST API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use github::{AppCredentials, Credentials, GitHubClient, GitHubClientConfig};
use routing::{
    BranchName, CommentId, CorrelationToken, GitHubApi, GitHubConnector, InstallationId, IssueNumber,
    OwnerLogin, RepositoryName, RepositoryRef, RetryPolicy, RouterError, WorkflowDispatch,
    WorkflowId,
};

const PRIVATE_KEY: &[u8] = include_bytes!("fixtures/app-key.pem");

// ---------------------------------------------------------------------------
// Stand-in server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    authorization: Option<String>,
    api_version: Option<String>,
    accept: Option<String>,
    body: Option<Value>,
}

#[derive(Clone, Default)]
struct MockGitHub {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockGitHub {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

async fn github(
    State(mock): State<MockGitHub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = header(&headers, "authorization");
    mock.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: authorization.clone(),
        api_version: header(&headers, "x-github-api-version"),
        accept: header(&headers, "accept"),
        body: serde_json::from_slice(&body).ok(),
    });

    let segments: Vec<&str> = uri.path().trim_start_matches('/').split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("POST", ["app", "installations", "401", "access_tokens"]) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "A JSON web token could not be decoded" })),
        )
            .into_response(),
        ("POST", ["app", "installations", "503", "access_tokens"]) => (
            StatusCode::SERVICE_UNAVAILABLE,
            [("retry-after", "12")],
            Json(json!({ "message": "Service Unavailable" })),
        )
            .into_response(),
        ("POST", ["app", "installations", _, "access_tokens"]) => {
            let is_jwt = authorization
                .as_deref()
                .and_then(|a| a.strip_prefix("Bearer "))
                .map(|jwt| jwt.split('.').count() == 3)
                .unwrap_or(false);
            if is_jwt {
                (
                    StatusCode::CREATED,
                    Json(json!({ "token": "ghs_installation", "expires_at": "2030-01-01T00:00:00Z" })),
                )
                    .into_response()
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }
        ("GET", ["repos", _, _, "issues", "comments", "404"]) => {
            (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response()
        }
        ("GET", ["repos", _, _, "issues", "comments", id]) => Json(json!({
            "id": id.parse::<u64>().unwrap_or_default(),
            "body": "please trigger-ci_main",
            "user": { "login": "hubot" },
        }))
        .into_response(),
        ("PATCH", ["repos", _, _, "issues", "comments", id]) => Json(json!({
            "id": id.parse::<u64>().unwrap_or_default(),
        }))
        .into_response(),
        ("POST", ["repos", _, _, "issues", _, "comments"]) => {
            (StatusCode::CREATED, Json(json!({ "id": 77 }))).into_response()
        }
        ("POST", ["repos", _, "flaky", "actions", "workflows", _, "dispatches"]) => (
            StatusCode::SERVICE_UNAVAILABLE,
            [("retry-after", "7")],
            "upstream unavailable",
        )
            .into_response(),
        ("POST", ["repos", _, _, "actions", "workflows", _, "dispatches"]) => {
            StatusCode::NO_CONTENT.into_response()
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response(),
    }
}

async fn spawn(mock: MockGitHub) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(github).with_state(mock);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(api_url: String, credentials: Credentials) -> GitHubClient {
    let config = GitHubClientConfig {
        api_url,
        timeout: Duration::from_secs(5),
        ..GitHubClientConfig::default()
    };
    GitHubClient::new(config, credentials).unwrap()
}

fn repo(name: &str) -> RepositoryRef {
    RepositoryRef::new(
        OwnerLogin::new("octo-org").unwrap(),
        RepositoryName::new(name).unwrap(),
    )
}

fn static_token() -> Credentials {
    Credentials::Token("ghp_static".to_string())
}

// ---------------------------------------------------------------------------
// Token mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_comment_sends_pinned_headers_and_decodes_body() {
    let mock = MockGitHub::default();
    let api = client(spawn(mock.clone()).await, static_token())
        .connect(None)
        .await
        .unwrap();

    let comment = api
        .get_comment(&repo("octo-repo"), CommentId::new(42))
        .await
        .unwrap();

    assert_eq!(comment.id, CommentId::new(42));
    assert_eq!(comment.body, "please trigger-ci_main");
    assert_eq!(comment.author.as_str(), "hubot");

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/repos/octo-org/octo-repo/issues/comments/42");
    assert_eq!(request.authorization.as_deref(), Some("Bearer ghp_static"));
    assert_eq!(request.api_version.as_deref(), Some("2022-11-28"));
    assert_eq!(request.accept.as_deref(), Some("application/vnd.github+json"));
}

#[tokio::test]
async fn update_comment_patches_the_body() {
    let mock = MockGitHub::default();
    let api = client(spawn(mock.clone()).await, static_token())
        .connect(None)
        .await
        .unwrap();

    api.update_comment(&repo("octo-repo"), CommentId::new(42), "TRIGGERCI_main\nCI-result: success")
        .await
        .unwrap();

    let requests = mock.requests();
    let request = &requests[0];
    assert_eq!(request.method, "PATCH");
    assert_eq!(request.path, "/repos/octo-org/octo-repo/issues/comments/42");
    assert_eq!(
        request.body,
        Some(json!({ "body": "TRIGGERCI_main\nCI-result: success" }))
    );
}

#[tokio::test]
async fn create_comment_posts_on_the_issue() {
    let mock = MockGitHub::default();
    let api = client(spawn(mock.clone()).await, static_token())
        .connect(None)
        .await
        .unwrap();

    let id = api
        .create_comment(&repo("octo-repo"), IssueNumber::new(7), "CI-result: failure")
        .await
        .unwrap();

    assert_eq!(id, CommentId::new(77));
    let requests = mock.requests();
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/repos/octo-org/octo-repo/issues/7/comments");
    assert_eq!(request.body, Some(json!({ "body": "CI-result: failure" })));
}

#[tokio::test]
async fn dispatch_sends_ref_and_string_inputs() {
    let mock = MockGitHub::default();
    let api = client(spawn(mock.clone()).await, static_token())
        .connect(None)
        .await
        .unwrap();

    let token = CorrelationToken::Comment {
        repository: repo("octo-repo"),
        comment_id: CommentId::new(1849268462),
    };
    let dispatch = WorkflowDispatch {
        repository: repo("octo-repo"),
        workflow: WorkflowId::new("test.yml").unwrap(),
        git_ref: BranchName::new("main").unwrap(),
        inputs: token.to_dispatch_inputs(),
    };
    api.dispatch_workflow(&dispatch).await.unwrap();

    let requests = mock.requests();
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.path,
        "/repos/octo-org/octo-repo/actions/workflows/test.yml/dispatches"
    );
    assert_eq!(
        request.body,
        Some(json!({
            "ref": "main",
            "inputs": {
                "owner": "octo-org",
                "repo": "octo-repo",
                "comment_id": "1849268462",
                "event_type": "comment",
            }
        }))
    );
}

#[tokio::test]
async fn not_found_maps_to_upstream_client_error() {
    let mock = MockGitHub::default();
    let api = client(spawn(mock).await, static_token())
        .connect(None)
        .await
        .unwrap();

    let err = api
        .get_comment(&repo("octo-repo"), CommentId::new(404))
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        RouterError::UpstreamClient { status: 404, message } if message == "Not Found"
    ));
}

#[tokio::test]
async fn server_error_keeps_raw_body_and_retry_after() {
    let mock = MockGitHub::default();
    let api = client(spawn(mock).await, static_token())
        .connect(None)
        .await
        .unwrap();

    let dispatch = WorkflowDispatch {
        repository: repo("flaky"),
        workflow: WorkflowId::new("test.yml").unwrap(),
        git_ref: BranchName::new("main").unwrap(),
        inputs: CorrelationToken::Comment {
            repository: repo("flaky"),
            comment_id: CommentId::new(1),
        }
        .to_dispatch_inputs(),
    };
    let err = api.dispatch_workflow(&dispatch).await.unwrap_err();

    match err {
        RouterError::UpstreamServer {
            status,
            message,
            retry_after,
        } => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream unavailable");
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("expected upstream server error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let api = client("http://127.0.0.1:1".to_string(), static_token())
        .connect(None)
        .await
        .unwrap();

    let err = api
        .get_comment(&repo("octo-repo"), CommentId::new(42))
        .await
        .unwrap_err();

    assert!(matches!(err, RouterError::Transport { .. }));
}

// ---------------------------------------------------------------------------
// App mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn app_mode_mints_an_installation_token_per_connect() {
    let mock = MockGitHub::default();
    let credentials = Credentials::App(AppCredentials::from_pem(12345, PRIVATE_KEY).unwrap());
    let api = client(spawn(mock.clone()).await, credentials)
        .connect(Some(InstallationId::new(555)))
        .await
        .unwrap();

    api.get_comment(&repo("octo-repo"), CommentId::new(42))
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/app/installations/555/access_tokens");
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].api_version.as_deref(), Some("2022-11-28"));
    assert_eq!(
        requests[1].authorization.as_deref(),
        Some("Bearer ghs_installation")
    );
}

#[tokio::test]
async fn app_mode_requires_an_installation() {
    let credentials = Credentials::App(AppCredentials::from_pem(12345, PRIVATE_KEY).unwrap());
    let result = client("http://127.0.0.1:1".to_string(), credentials)
        .connect(None)
        .await;

    assert!(matches!(result, Err(RouterError::MissingInstallation)));
}

#[tokio::test]
async fn refused_token_exchange_is_an_authentication_error() {
    let mock = MockGitHub::default();
    let credentials = Credentials::App(AppCredentials::from_pem(12345, PRIVATE_KEY).unwrap());
    let result = client(spawn(mock).await, credentials)
        .connect(Some(InstallationId::new(401)))
        .await;

    assert!(matches!(result, Err(RouterError::Authentication { .. })));
}

#[tokio::test]
async fn token_endpoint_outage_is_retryable() {
    let mock = MockGitHub::default();
    let credentials = Credentials::App(AppCredentials::from_pem(12345, PRIVATE_KEY).unwrap());
    let Err(err) = client(spawn(mock).await, credentials)
        .connect(Some(InstallationId::new(503)))
        .await
    else {
        panic!("expected token exchange to fail");
    };

    assert!(matches!(err, RouterError::UpstreamServer { status: 503, .. }));
    assert_eq!(
        err.retry_policy(),
        RetryPolicy::Retryable {
            after: Some(Duration::from_secs(12))
        }
    );
}
