use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is designed to be
/// immutable once loaded, ensuring consistency across all threads and services.
/// It is bundled into the application state, embodying the "immutable AppConfig"
/// part of the Unified State Pattern.
#[derive(Clone)]
pub struct AppConfig {
    // Base URL of the external session authority (e.g. the auth service of the
    // tutoring marketplace backend). The gate issues GET {auth_base_url}/get-session.
    pub auth_base_url: String,
    // Name of the session cookie the browser carries. Requests without this cookie
    // are rejected before any network call is made.
    pub session_cookie: String,
    // Address the HTTP server binds to.
    pub bind_addr: String,
    // Runtime environment marker. Controls log formatting.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences
/// (pretty logs, permissive defaults) and production-grade behavior (JSON logs,
/// mandatory configuration).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    /// This allows instantiating the configuration without needing to set environment
    /// variables for lightweight unit or integration testing state scaffolding.
    fn default() -> Self {
        Self {
            auth_base_url: "http://localhost:4000/api/auth".to_string(),
            session_cookie: "better-auth.session_token".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration at startup.
    /// It reads all parameters from environment variables and implements the **fail-fast** principle.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current runtime environment
    /// (especially Production) is not found. This prevents the gate from starting with an
    /// incomplete configuration and silently redirecting every user to /login.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // Session Authority Resolution
        // The production URL is mandatory and must be explicitly set.
        let auth_base_url = match env {
            Env::Production => env::var("AUTH_BASE_URL")
                .expect("FATAL: AUTH_BASE_URL must be set in production."),
            // In local, fall back to the docker-compose auth service address.
            _ => env::var("AUTH_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:4000/api/auth".to_string()),
        };

        Self {
            env,
            auth_base_url,
            // The default matches the cookie name issued by the marketplace auth service.
            session_cookie: env::var("SESSION_COOKIE")
                .unwrap_or_else(|_| "better-auth.session_token".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }
}
