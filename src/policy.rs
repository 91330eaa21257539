use crate::models::{Identity, Role};

// --- Route Classification Table ---
//
// The entire access policy is driven by this data. Prefixes are matched on
// segment boundaries: "/dashboard" matches "/dashboard" and "/dashboard/x"
// but never "/dashboards". The table must stay non-overlapping; every
// role-scoped prefix maps to exactly one role.

/// Paths accessible without a session. The session authority is never consulted
/// for these. `/banned` is public so the banned redirect target is itself
/// reachable.
pub const PUBLIC_PREFIXES: &[&str] = &[
    "/login",
    "/register",
    "/api",
    "/assets",
    "/favicon.ico",
    "/banned",
];

/// Dashboard prefixes restricted to exactly one role.
pub const ROLE_SCOPED: &[(&str, Role)] = &[
    ("/admin-dashboard", Role::Admin),
    ("/tutor-dashboard", Role::Tutor),
    ("/student-dashboard", Role::Student),
];

/// Generic dashboard alias: requires any valid, non-banned session and always
/// forwards to the caller's role home.
pub const GENERIC_DASHBOARD: &str = "/dashboard";

pub const LOGIN_PATH: &str = "/login";
pub const BANNED_PATH: &str = "/banned";

/// Decision
///
/// The outcome of one policy evaluation. `Allow` continues to the requested
/// path; `Redirect` carries the target the proxy must send the browser to.
/// Every possible target is a fixed, well-known path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(&'static str),
}

/// home_for_role
///
/// The fixed role-home table. Exhaustive over `Role`.
pub fn home_for_role(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin-dashboard",
        Role::Tutor => "/tutor-dashboard",
        Role::Student => "/student-dashboard",
    }
}

/// Segment-bounded prefix match: the prefix must be followed by end-of-path
/// or a path separator.
fn prefix_matches(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Whether the path is reachable without any session. Exposed so callers can
/// skip session resolution entirely for public paths.
pub fn is_public(path: &str) -> bool {
    PUBLIC_PREFIXES
        .iter()
        .any(|prefix| prefix_matches(path, prefix))
}

/// The role required by a role-scoped dashboard prefix, if the path matches one.
fn required_role(path: &str) -> Option<Role> {
    ROLE_SCOPED
        .iter()
        .find(|(prefix, _)| prefix_matches(path, prefix))
        .map(|(_, role)| *role)
}

/// evaluate
///
/// The access policy: a pure function of (identity-or-null, requested path).
/// No hidden state, no side effects; evaluating the same pair twice always
/// yields the same decision.
///
/// Rules apply in strict order, first match wins:
/// 1. Public path: allow, identity irrelevant.
/// 2. No identity: redirect to `/login`.
/// 3. Banned identity: redirect to `/banned`. Checked before any role
///    matching, so a banned admin never reaches the admin dashboard.
/// 4. Role-scoped path: allow on exact role match, otherwise redirect to the
///    caller's own role home. Each role is matched through the table above,
///    never through chained boolean conditions.
/// 5. Generic `/dashboard` alias: redirect to the caller's role home.
/// 6. Anything else is an ordinary content page: allow.
pub fn evaluate(identity: Option<&Identity>, path: &str) -> Decision {
    if is_public(path) {
        return Decision::Allow;
    }

    let Some(identity) = identity else {
        return Decision::Redirect(LOGIN_PATH);
    };

    if identity.banned {
        return Decision::Redirect(BANNED_PATH);
    }

    if let Some(required) = required_role(path) {
        return if identity.role == required {
            Decision::Allow
        } else {
            Decision::Redirect(home_for_role(identity.role))
        };
    }

    if prefix_matches(path, GENERIC_DASHBOARD) {
        return Decision::Redirect(home_for_role(identity.role));
    }

    Decision::Allow
}
