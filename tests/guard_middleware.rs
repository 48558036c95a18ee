//! End-to-end checks of the guard middleware stack on an Axum router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Method, Request, StatusCode},
    response::Response,
    routing::get,
    Extension, Router,
};
use tower::ServiceExt;

use secure_feedback::config::FeedbackConfig;
use secure_feedback::http::{guard_layers, GuardState};
use secure_feedback::security::{BucketStore, ManualClock, MemoryBucketStore, RateBucket, Session, StoreError};

const CLIENT: &str = "203.0.113.5:50000";

async fn issue_token(State(state): State<GuardState>, Extension(session): Extension<Session>) -> String {
    state.tokens.issue_or_get_token(&session)
}

async fn echo(body: String) -> String {
    body
}

async fn page() -> &'static str {
    "page"
}

fn app(state: GuardState) -> Router {
    let routes = Router::new()
        .route("/", get(issue_token).post(echo))
        .route("/page", get(page))
        .with_state(state.clone());
    guard_layers(routes, state)
}

fn config_with_limit(max_requests: u32) -> FeedbackConfig {
    let mut config = FeedbackConfig::default();
    config.rate_limit.max_requests = max_requests;
    config
}

fn request(method: Method, cookie: Option<&str>, body: &str) -> Request<Body> {
    request_to("/", method, cookie, body)
}

fn request_to(uri: &str, method: Method, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let mut req = builder.body(Body::from(body.to_string())).unwrap();
    let addr: SocketAddr = CLIENT.parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// GET the form page, returning the session cookie and its token.
async fn open_session(app: &Router) -> (String, String) {
    let response = app.clone().oneshot(request(Method::GET, None, "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let token = body_text(response).await;
    (cookie, token)
}

#[tokio::test]
async fn test_get_issues_stable_token_per_session() {
    let app = app(GuardState::in_memory(FeedbackConfig::default()));
    let (cookie, token) = open_session(&app).await;
    assert!(cookie.starts_with("feedback_sid="));
    assert_eq!(token.len(), 64);

    let again = app.clone().oneshot(request(Method::GET, Some(&cookie), "")).await.unwrap();
    assert!(again.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body_text(again).await, token);
}

#[tokio::test]
async fn test_post_with_form_token_reaches_handler_with_body_intact() {
    let app = app(GuardState::in_memory(FeedbackConfig::default()));
    let (cookie, token) = open_session(&app).await;

    let body = format!("name=Ada&comment=hi&csrf={token}");
    let response = app.clone().oneshot(request(Method::POST, Some(&cookie), &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, body);
}

#[tokio::test]
async fn test_post_with_header_token_is_accepted() {
    let app = app(GuardState::in_memory(FeedbackConfig::default()));
    let (cookie, token) = open_session(&app).await;

    let mut req = request(Method::POST, Some(&cookie), "{}");
    req.headers_mut().insert("x-csrf-token", token.parse().unwrap());
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_post_without_valid_token_is_forbidden() {
    let app = app(GuardState::in_memory(FeedbackConfig::default()));
    let (cookie, token) = open_session(&app).await;

    for body in ["name=Ada".to_string(), "csrf=".to_string(), format!("csrf={}", &token[1..])] {
        let response = app.clone().oneshot(request(Method::POST, Some(&cookie), &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "CSRF verification failed");
    }

    // A token from another session does not transfer.
    let response = app
        .clone()
        .oneshot(request(Method::POST, None, &format!("csrf={token}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = FeedbackConfig::default();
    config.csrf.max_body_bytes = 16;
    let app = app(GuardState::in_memory(config));
    let (cookie, _) = open_session(&app).await;

    let response = app
        .clone()
        .oneshot(request(Method::POST, Some(&cookie), &"x".repeat(64)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_rate_limit_runs_before_csrf_and_counts_rejections() {
    let store = Arc::new(MemoryBucketStore::new());
    let clock = ManualClock::new(10_000);
    let state = GuardState::with_store(config_with_limit(3), store.clone(), Arc::new(clock.clone()));
    let app = app(state);

    // The page view is request 1 of the window.
    let (cookie, token) = open_session(&app).await;
    let body = format!("csrf={token}");

    for _ in 0..2 {
        let response = app.clone().oneshot(request(Method::POST, Some(&cookie), &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Limited even without a token: the limiter answers first.
    for req_body in [body.as_str(), "csrf=wrong"] {
        let response = app.clone().oneshot(request(Method::POST, Some(&cookie), req_body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "61");
    }
    let response = app.clone().oneshot(request(Method::GET, Some(&cookie), "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let key = secure_feedback::security::bucket_key("comment", "203.0.113.5");
    assert_eq!(store.get(&key).unwrap().map(|b| b.count), Some(6));

    // A new window admits the client again, same session.
    clock.advance(61);
    let response = app.clone().oneshot(request(Method::POST, Some(&cookie), &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_page_views_are_metered_by_default() {
    let app = app(GuardState::in_memory(config_with_limit(1)));

    let mut ok = 0;
    for _ in 0..200 {
        let response = app.clone().oneshot(request_to("/page", Method::GET, None, "")).await.unwrap();
        if response.status() == StatusCode::OK {
            ok += 1;
        } else {
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn test_safe_methods_can_be_exempted() {
    let mut config = config_with_limit(1);
    config.rate_limit.limit_safe_methods = false;
    let app = app(GuardState::in_memory(config));

    for _ in 0..5 {
        let response = app.clone().oneshot(request_to("/page", Method::GET, None, "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let first = app.clone().oneshot(request(Method::POST, None, "")).await.unwrap();
    assert_eq!(first.status(), StatusCode::FORBIDDEN);
    let second = app.clone().oneshot(request(Method::POST, None, "")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_cookieless_requests_leave_no_sessions_behind() {
    let mut config = config_with_limit(10_000);
    config.session.max_sessions = 8;
    let state = GuardState::in_memory(config);
    let app = app(state.clone());

    for _ in 0..500 {
        let response = app.clone().oneshot(request_to("/page", Method::GET, None, "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
    // Failed submissions do not create sessions either.
    for _ in 0..50 {
        let response = app.clone().oneshot(request(Method::POST, None, "csrf=x")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
    assert!(state.sessions.is_empty());

    // Sessions that do hold a token stay within the configured cap.
    for _ in 0..50 {
        open_session(&app).await;
    }
    assert_eq!(state.sessions.len(), 8);
}

#[tokio::test]
async fn test_secure_cookie_attribute_is_configurable() {
    let mut config = FeedbackConfig::default();
    config.session.secure_cookie = true;
    let app = app(GuardState::in_memory(config));

    let response = app.clone().oneshot(request(Method::GET, None, "")).await.unwrap();
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.ends_with("; HttpOnly; SameSite=Lax; Secure"), "{cookie}");
}

struct BrokenStore;

impl BucketStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<RateBucket>, StoreError> {
        Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk gone")))
    }

    fn compare_and_swap(&self, _: &str, _: Option<&RateBucket>, _: &RateBucket) -> Result<bool, StoreError> {
        Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk gone")))
    }
}

#[tokio::test]
async fn test_store_failure_fails_closed() {
    let state = GuardState::with_store(FeedbackConfig::default(), Arc::new(BrokenStore), Arc::new(ManualClock::new(0)));
    let app = app(state);

    for method in [Method::GET, Method::POST] {
        let response = app.clone().oneshot(request(method, None, "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_text(response).await, "Service temporarily unavailable");
    }
}

#[tokio::test]
async fn test_file_backed_state_persists_counts_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_limit(2);
    config.storage.private_base = dir.path().to_path_buf();

    let first = app(GuardState::from_config(config.clone()).unwrap());
    let (cookie, token) = open_session(&first).await;
    let response = first
        .clone()
        .oneshot(request(Method::POST, Some(&cookie), &format!("csrf={token}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Fresh process state, same bucket directory.
    let restarted = app(GuardState::from_config(config).unwrap());
    let response = restarted.clone().oneshot(request(Method::POST, None, "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(dir.path().join("storage").read_dir().unwrap().next().is_some());
}
