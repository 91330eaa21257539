use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    models::{Identity, IdentityResponse},
    policy::{self, Decision},
    session::{AuthorityState, CurrentSession, ResolvedSession},
};

// Forward-auth convention: the reverse proxy forwards the original request's
// URI in this header when it asks the gate for a decision.
const FORWARDED_URI_HEADER: &str = "x-forwarded-uri";

// --- Handlers ---

/// check
///
/// [Forward-Auth Route] The gate's decision endpoint. The reverse proxy calls
/// it once per navigation, forwarding the original path (`X-Forwarded-Uri`)
/// and the browser's cookies.
///
/// Outcomes:
/// - `204 No Content`: continue to the requested path. When an identity was
///   resolved, the `x-auth-user-id` and `x-auth-role` headers carry it so the
///   upstream app can trust the gate's resolution.
/// - `307 Temporary Redirect`: `Location` is `/login`, `/banned`, or the
///   caller's role home, per the access policy.
/// - `400 Bad Request`: the proxy did not forward the original URI. This is a
///   deployment misconfiguration, not a policy outcome.
///
/// *Fast path*: public paths are answered from the route table alone; the
/// session authority is not consulted for them.
#[utoipa::path(
    get,
    path = "/check",
    responses(
        (status = 204, description = "Allowed; continue to the requested path"),
        (status = 307, description = "Redirect to /login, /banned, or the caller's role home"),
        (status = 400, description = "Missing X-Forwarded-Uri header")
    )
)]
pub async fn check(State(authority): State<AuthorityState>, headers: HeaderMap) -> Response {
    let Some(forwarded) = forwarded_uri(&headers) else {
        tracing::warn!("check request without x-forwarded-uri header");
        return StatusCode::BAD_REQUEST.into_response();
    };
    // The policy classifies on the path alone; query and fragment are irrelevant.
    let path = strip_query(forwarded);

    if policy::is_public(path) {
        return StatusCode::NO_CONTENT.into_response();
    }

    let resolved = authority.resolve(cookie_header(&headers)).await;
    if let ResolvedSession::Unauthenticated(reason) = &resolved {
        tracing::debug!(path, reason = reason.as_str(), "session unresolved");
    }

    match policy::evaluate(resolved.identity(), path) {
        Decision::Allow => allow_response(resolved.identity()),
        Decision::Redirect(target) => {
            tracing::debug!(path, target, "navigation redirected");
            Redirect::temporary(target).into_response()
        }
    }
}

/// whoami
///
/// [Diagnostic Route] Resolves the session exactly like `/check` and echoes the
/// identity as JSON. Banned identities are still returned here (with
/// `banned: true`); this endpoint reports, it does not gate.
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Resolved identity", body = IdentityResponse),
        (status = 401, description = "No valid session")
    )
)]
pub async fn whoami(
    CurrentSession(resolved): CurrentSession,
) -> Result<Json<IdentityResponse>, StatusCode> {
    match resolved {
        ResolvedSession::Authenticated(identity) => Ok(Json(IdentityResponse::from(identity))),
        ResolvedSession::Unauthenticated(reason) => {
            tracing::debug!(reason = reason.as_str(), "session echo unauthenticated");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

// --- Helpers ---

fn forwarded_uri(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(FORWARDED_URI_HEADER)
        .and_then(|value| value.to_str().ok())
}

fn cookie_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
}

fn strip_query(uri: &str) -> &str {
    uri.split(['?', '#']).next().unwrap_or(uri)
}

/// Builds the 204 allow response, attaching the resolved identity (when there
/// is one) as trusted upstream headers.
fn allow_response(identity: Option<&Identity>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Some(identity) = identity {
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&identity.id) {
            headers.insert(HeaderName::from_static("x-auth-user-id"), value);
        }
        headers.insert(
            HeaderName::from_static("x-auth-role"),
            HeaderValue::from_static(identity.role.as_str()),
        );
    }
    response
}
