use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{DateTime, Utc};

use crate::models::{Identity, SessionEnvelope};

/// ResolveReason
///
/// Why a request resolved to "unauthenticated". The reasons are distinguished
/// for diagnostics only; the access policy treats all of them identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveReason {
    /// The session cookie was absent from the request. No network call was made.
    NoCookie,
    /// The session authority answered with a non-2xx status.
    FetchFailed,
    /// The authority answered 2xx but the body was malformed or carried no user.
    EmptySession,
    /// The envelope carried a user whose session has already expired.
    Expired,
    /// The authority call itself failed (connection refused, timeout, DNS).
    Error,
}

impl ResolveReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCookie => "no-cookie",
            Self::FetchFailed => "fetch-failed",
            Self::EmptySession => "empty-session",
            Self::Expired => "expired",
            Self::Error => "error",
        }
    }
}

/// ResolvedSession
///
/// The outcome of one session resolution. This is the core output of the
/// Session Resolver: either a full identity, or "unauthenticated" with a
/// diagnostic reason. Resolution never fails with an error; every failure
/// mode collapses into `Unauthenticated` (fail closed).
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSession {
    Authenticated(Identity),
    Unauthenticated(ResolveReason),
}

impl ResolvedSession {
    /// The identity, if one was resolved. This is the shape the access policy consumes.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Unauthenticated(_) => None,
        }
    }
}

/// SessionAuthority Trait
///
/// Defines the abstract contract for translating an inbound request's cookie
/// header into a `ResolvedSession`. This is the seam that allows the handlers
/// to be tested against mock authorities without a network, while production
/// uses the HTTP-backed implementation below.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn SessionAuthority>`) safely shareable across Axum's asynchronous
/// task boundaries.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Resolve the raw `Cookie` header value (if any) into a session.
    ///
    /// Implementations must be one-shot: no retries, no caching. A failed
    /// resolution is simply "unauthenticated" for this navigation; the caller
    /// re-resolves on the next one.
    async fn resolve(&self, cookie_header: Option<&str>) -> ResolvedSession;
}

/// AuthorityState
///
/// The concrete type used to share the session authority across the application state.
pub type AuthorityState = Arc<dyn SessionAuthority>;

/// HttpSessionAuthority
///
/// The production implementation: one synchronous `GET {base}/get-session`
/// per resolution, forwarding the browser's cookie header unchanged.
pub struct HttpSessionAuthority {
    client: reqwest::Client,
    base_url: String,
    cookie_name: String,
}

impl HttpSessionAuthority {
    /// Constructs the authority client from the configured base URL and
    /// session cookie name.
    pub fn new(base_url: &str, cookie_name: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_name: cookie_name.to_string(),
        }
    }
}

#[async_trait]
impl SessionAuthority for HttpSessionAuthority {
    /// resolve
    ///
    /// The entire process involves:
    /// 1. Fast Reject: if the named session cookie is absent, return
    ///    `no-cookie` without touching the network.
    /// 2. Authority Fetch: one GET to `/get-session`, forwarding the cookie
    ///    header verbatim.
    /// 3. Classification: map status, body, and expiry onto a `ResolvedSession`.
    ///
    /// Every network or decode failure is caught and converted into an
    /// `Unauthenticated` result; this method never returns an error.
    async fn resolve(&self, cookie_header: Option<&str>) -> ResolvedSession {
        // 1. Fast Reject
        let Some(cookies) = cookie_header else {
            return ResolvedSession::Unauthenticated(ResolveReason::NoCookie);
        };
        if session_token(cookies, &self.cookie_name).is_none() {
            return ResolvedSession::Unauthenticated(ResolveReason::NoCookie);
        }

        // 2. Authority Fetch
        let url = format!("{}/get-session", self.base_url);
        let response = match self
            .client
            .get(&url)
            .header(header::COOKIE, cookies)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // Upstream unavailable is logged but otherwise indistinguishable
                // from any other unauthenticated outcome.
                tracing::warn!("session authority unreachable: {:?}", e);
                return ResolvedSession::Unauthenticated(ResolveReason::Error);
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                status = %response.status(),
                "session authority rejected the session fetch"
            );
            return ResolvedSession::Unauthenticated(ResolveReason::FetchFailed);
        }

        // 3. Classification
        let envelope = match response.json::<SessionEnvelope>().await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("malformed session envelope: {:?}", e);
                return ResolvedSession::Unauthenticated(ResolveReason::EmptySession);
            }
        };

        classify_envelope(envelope, Utc::now())
    }
}

/// session_token
///
/// Extracts the value of the named session cookie from a raw `Cookie` header.
/// Returns `None` when the cookie is not present, which lets the resolver skip
/// the authority call entirely.
pub fn session_token<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == cookie_name).then_some(value)
    })
}

/// classify_envelope
///
/// Pure classification of a decoded authority response. A missing `user` means
/// "no active session"; an `expiresAt` at or before `now` invalidates an
/// otherwise well-formed session.
pub fn classify_envelope(envelope: SessionEnvelope, now: DateTime<Utc>) -> ResolvedSession {
    let Some(user) = envelope.user else {
        return ResolvedSession::Unauthenticated(ResolveReason::EmptySession);
    };

    if let Some(expires_at) = envelope.expires_at {
        if expires_at <= now {
            return ResolvedSession::Unauthenticated(ResolveReason::Expired);
        }
    }

    ResolvedSession::Authenticated(Identity {
        id: user.id,
        email: user.email,
        role: user.role,
        banned: user.banned,
    })
}

/// CurrentSession Extractor
///
/// Makes `ResolvedSession` usable as a handler argument. Extraction is
/// infallible: an unauthenticated request still yields a value, and the
/// handler decides what that means for its endpoint.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub ResolvedSession);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    // Allows the extractor to pull the session authority from the app state.
    AuthorityState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authority = AuthorityState::from_ref(state);
        let cookies = parts
            .headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok());
        Ok(Self(authority.resolve(cookies).await))
    }
}
