use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;
use tutor_gate::{
    AppState,
    config::AppConfig,
    create_router,
    models::{Identity, Role},
    session::{ResolveReason, ResolvedSession, SessionAuthority},
};

// --- Mock Session Authority ---

/// Canned-response authority that also counts how often it is consulted, so
/// tests can assert the public-path fast-reject never touches it.
struct MockAuthority {
    result: ResolvedSession,
    calls: AtomicUsize,
}

impl MockAuthority {
    fn new(result: ResolvedSession) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionAuthority for MockAuthority {
    async fn resolve(&self, _cookie_header: Option<&str>) -> ResolvedSession {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

// --- Helper Functions ---

fn identity(role: Role, banned: bool) -> Identity {
    Identity {
        id: "usr_42".to_string(),
        email: "dana@example.com".to_string(),
        role,
        banned,
    }
}

fn build_app(authority: Arc<MockAuthority>) -> Router {
    create_router(AppState {
        authority,
        config: AppConfig::default(),
    })
}

fn check_request(forwarded_uri: &str) -> Request<Body> {
    Request::builder()
        .uri("/check")
        .header("x-forwarded-uri", forwarded_uri)
        .header(header::COOKIE, "better-auth.session_token=abc123")
        .body(Body::empty())
        .unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
}

// --- /check Tests ---

#[tokio::test]
async fn test_public_path_skips_session_authority() {
    // No cookie, public path: the authority must not be consulted at all.
    let authority = MockAuthority::new(ResolvedSession::Unauthenticated(ResolveReason::NoCookie));
    let app = build_app(authority.clone());

    let request = Request::builder()
        .uri("/check")
        .header("x-forwarded-uri", "/login")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(authority.call_count(), 0);
}

#[tokio::test]
async fn test_missing_forwarded_uri_is_bad_request() {
    let authority = MockAuthority::new(ResolvedSession::Unauthenticated(ResolveReason::NoCookie));
    let app = build_app(authority.clone());

    let request = Request::builder()
        .uri("/check")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(authority.call_count(), 0);
}

#[tokio::test]
async fn test_unauthenticated_redirects_to_login() {
    let authority = MockAuthority::new(ResolvedSession::Unauthenticated(ResolveReason::NoCookie));
    let app = build_app(authority);

    let response = app
        .oneshot(check_request("/tutor-dashboard/availability"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_upstream_failure_fails_closed_to_login() {
    // An unreachable session authority is treated as unauthenticated.
    let authority = MockAuthority::new(ResolvedSession::Unauthenticated(ResolveReason::Error));
    let app = build_app(authority);

    let response = app.oneshot(check_request("/dashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_banned_identity_redirects_to_banned() {
    // The ban wins even though the role matches the path.
    let authority = MockAuthority::new(ResolvedSession::Authenticated(identity(Role::Admin, true)));
    let app = build_app(authority);

    let response = app.oneshot(check_request("/admin-dashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/banned");
}

#[tokio::test]
async fn test_matching_role_allows_with_identity_headers() {
    // A tutor on the tutor dashboard is allowed, and the allow response
    // carries the trusted upstream identity headers.
    let authority = MockAuthority::new(ResolvedSession::Authenticated(identity(Role::Tutor, false)));
    let app = build_app(authority.clone());

    let response = app
        .oneshot(check_request("/tutor-dashboard/bookings"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["x-auth-user-id"], "usr_42");
    assert_eq!(response.headers()["x-auth-role"], "TUTOR");
    assert_eq!(authority.call_count(), 1);
}

#[tokio::test]
async fn test_wrong_role_redirects_to_own_role_home() {
    let authority =
        MockAuthority::new(ResolvedSession::Authenticated(identity(Role::Student, false)));
    let app = build_app(authority);

    let response = app
        .oneshot(check_request("/admin-dashboard/users"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/student-dashboard");
}

#[tokio::test]
async fn test_generic_dashboard_redirects_to_role_home() {
    let authority = MockAuthority::new(ResolvedSession::Authenticated(identity(Role::Admin, false)));
    let app = build_app(authority);

    let response = app.oneshot(check_request("/dashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/admin-dashboard");
}

#[tokio::test]
async fn test_query_string_is_ignored_for_classification() {
    let authority = MockAuthority::new(ResolvedSession::Authenticated(identity(Role::Tutor, false)));
    let app = build_app(authority);

    let response = app
        .oneshot(check_request("/tutor-dashboard/bookings?week=3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_allow_without_identity_has_no_auth_headers() {
    let authority = MockAuthority::new(ResolvedSession::Unauthenticated(ResolveReason::NoCookie));
    let app = build_app(authority);

    let request = Request::builder()
        .uri("/check")
        .header("x-forwarded-uri", "/register")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get("x-auth-user-id").is_none());
    assert!(response.headers().get("x-auth-role").is_none());
}

// --- /session Tests ---

#[tokio::test]
async fn test_session_echo_returns_identity_json() {
    let authority =
        MockAuthority::new(ResolvedSession::Authenticated(identity(Role::Student, false)));
    let app = build_app(authority);

    let request = Request::builder()
        .uri("/session")
        .header(header::COOKIE, "better-auth.session_token=abc123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["id"], "usr_42");
    assert_eq!(body["role"], "STUDENT");
    assert_eq!(body["banned"], false);
}

#[tokio::test]
async fn test_session_echo_reports_banned_identities() {
    // The echo endpoint reports, it does not gate.
    let authority = MockAuthority::new(ResolvedSession::Authenticated(identity(Role::Tutor, true)));
    let app = build_app(authority);

    let request = Request::builder()
        .uri("/session")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["banned"], true);
}

#[tokio::test]
async fn test_session_echo_unauthenticated_is_401() {
    let authority =
        MockAuthority::new(ResolvedSession::Unauthenticated(ResolveReason::FetchFailed));
    let app = build_app(authority);

    let request = Request::builder()
        .uri("/session")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// --- /health ---

#[tokio::test]
async fn test_health_is_public() {
    let authority = MockAuthority::new(ResolvedSession::Unauthenticated(ResolveReason::NoCookie));
    let app = build_app(authority.clone());

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(authority.call_count(), 0);
}
