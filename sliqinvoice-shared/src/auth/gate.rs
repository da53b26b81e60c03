/// Edge authorization rules
///
/// Every inbound request is classified by path (public or protected, API or
/// page) and by the state of the session cookie, then mapped to a single
/// [`GateDecision`]. The HTTP layer only translates decisions into responses,
/// so the whole rule set is testable without a server.
///
/// | path             | no token          | bad token                  | good token          |
/// |------------------|-------------------|----------------------------|---------------------|
/// | public API       | allow             | allow                      | allow + context     |
/// | auth page        | allow             | allow                      | redirect dashboard  |
/// | other public page| allow             | allow                      | allow + context     |
/// | protected API    | 401               | 401                        | allow + context     |
/// | protected page   | redirect login    | redirect login, clear cookie | allow + context   |
///
/// Tokens are never revoked server-side: a token stays usable until it
/// expires even after logout clears the cookie.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, Claims};
use crate::models::user::UserRole;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "token";

/// Where unauthenticated page requests are sent
pub const LOGIN_PAGE: &str = "/login";

/// Where authenticated visitors of an auth page are sent
pub const DASHBOARD_PAGE: &str = "/dashboard";

/// Paths reachable without a session
///
/// `/` matches only itself; every other entry also matches its sub-paths.
pub const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/login",
    "/admin/login",
    "/register",
    "/health",
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/logout",
];

/// Public pages that make no sense for a signed-in user
pub const AUTH_PAGES: &[&str] = &["/login", "/admin/login", "/register"];

/// Identity attached to requests that carried a valid token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// E-mail at token issue time
    pub email: String,

    /// Role at token issue time
    pub role: UserRole,
}

impl AuthContext {
    /// Builds the context from validated claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

/// Whether a path addresses the JSON API or a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Api,
    Page,
}

impl PathKind {
    /// Classifies a request path
    pub fn of(path: &str) -> Self {
        if matches_route(path, "/api") {
            PathKind::Api
        } else {
            PathKind::Page
        }
    }
}

/// Outcome of verifying the session cookie
#[derive(Debug, Clone)]
pub enum TokenState {
    /// No cookie, or an empty one
    Missing,

    /// Bad signature, expired, wrong issuer, or not a JWT at all
    Invalid,

    /// Verified claims
    Valid(Claims),
}

impl TokenState {
    /// Verifies the raw cookie value
    ///
    /// Every verification failure collapses into `Invalid`.
    pub fn from_cookie(value: Option<&str>, secret: &str) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => TokenState::Missing,
            Some(token) => match validate_token(token, secret) {
                Ok(claims) => TokenState::Valid(claims),
                Err(e) => {
                    tracing::debug!(error = %e, "Session token rejected");
                    TokenState::Invalid
                }
            },
        }
    }
}

/// What the gate does with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Pass the request on, with the caller's identity when known
    Allow(Option<AuthContext>),

    /// Reject an API request with 401 and this message
    Unauthorized(&'static str),

    /// Send a page request to the login page
    RedirectToLogin {
        /// Whether the stale cookie should be removed
        clear_cookie: bool,
    },

    /// Send a signed-in visitor away from an auth page
    RedirectToDashboard,
}

/// Segment-aware prefix match
///
/// `/` only matches itself, so the root entry does not make every path public.
pub fn matches_route(path: &str, route: &str) -> bool {
    if route == "/" {
        return path == "/";
    }

    match path.strip_prefix(route) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Whether a path is on the public allow-list
pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|route| matches_route(path, route))
}

/// Whether a path is a login/registration page
pub fn is_auth_page(path: &str) -> bool {
    AUTH_PAGES.iter().any(|route| matches_route(path, route))
}

/// Applies the gate rules
pub fn decide(path: &str, token: &TokenState) -> GateDecision {
    let kind = PathKind::of(path);

    if is_public(path) {
        return match token {
            TokenState::Valid(_) if kind == PathKind::Page && is_auth_page(path) => {
                GateDecision::RedirectToDashboard
            }
            TokenState::Valid(claims) => GateDecision::Allow(Some(AuthContext::from_claims(claims))),
            TokenState::Missing | TokenState::Invalid => GateDecision::Allow(None),
        };
    }

    match (kind, token) {
        (_, TokenState::Valid(claims)) => GateDecision::Allow(Some(AuthContext::from_claims(claims))),
        (PathKind::Api, TokenState::Missing) => GateDecision::Unauthorized("Authentication required"),
        (PathKind::Api, TokenState::Invalid) => GateDecision::Unauthorized("Invalid or expired token"),
        (PathKind::Page, TokenState::Missing) => GateDecision::RedirectToLogin { clear_cookie: false },
        (PathKind::Page, TokenState::Invalid) => GateDecision::RedirectToLogin { clear_cookie: true },
    }
}
