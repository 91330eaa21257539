use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Identity Schemas ---

/// Role
///
/// The closed set of roles a marketplace user can hold. Exactly one role per user.
///
/// Modeling this as an enum (rather than a free-form string) makes every role-home
/// lookup and role-scoped route match exhaustive: adding a fourth role without
/// updating the policy table is a compile error, not a runtime surprise.
/// The wire form is uppercase (`"STUDENT"`, `"TUTOR"`, `"ADMIN"`), matching the
/// session authority's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Student,
    Tutor,
    Admin,
}

impl Role {
    /// The uppercase wire form, used for the `x-auth-role` response header.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Tutor => "TUTOR",
            Self::Admin => "ADMIN",
        }
    }
}

/// Identity
///
/// The resolved identity of the requesting user, as derived from a session token
/// by the session authority. This is the sole input (besides the requested path)
/// to the access policy. It is fetched fresh on every navigation decision and
/// never cached or mutated by the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    // Opaque unique identifier assigned by the auth service.
    pub id: String,
    pub email: String,
    // The RBAC field: exactly one of the three marketplace roles.
    pub role: Role,
    // When true, access to any non-public route is denied regardless of role.
    pub banned: bool,
}

// --- Session Authority Wire Schemas (Input) ---

/// SessionUser
///
/// The `user` object inside the session authority's response body. Only the fields
/// the policy needs are modeled; unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    // Some authority versions omit the flag for users that were never moderated.
    #[serde(default)]
    pub banned: bool,
}

/// SessionEnvelope
///
/// The full response body of `GET {auth_base_url}/get-session`. A body without a
/// `user` field is a valid response meaning "no active session".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnvelope {
    #[serde(default)]
    pub user: Option<SessionUser>,
    // Session validity is time-bounded. An `expiresAt` in the past is treated
    // the same as an absent session.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

// --- Gate API Schemas (Output) ---

/// IdentityResponse
///
/// Output schema for the diagnostic `GET /session` endpoint. This is the shape the
/// marketplace frontend consumes when it needs to render identity-dependent chrome
/// without performing its own session fetch.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct IdentityResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub banned: bool,
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email,
            role: identity.role,
            banned: identity.banned,
        }
    }
}
