/// Cookie-based authorization gate
///
/// Runs in front of every route, static pages included. The rules live in
/// [`sliqinvoice_shared::auth::gate`]; this layer reads the `token` cookie,
/// asks for a decision and turns it into a response.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, Router};
/// use sliqinvoice_api::{app::AppState, middleware::auth_gate::auth_gate};
///
/// # fn example(state: AppState) -> Router {
/// Router::new()
///     .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
///     .with_state(state)
/// # }
/// ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sliqinvoice_shared::auth::gate::{
    decide, GateDecision, TokenState, DASHBOARD_PAGE, LOGIN_PAGE, SESSION_COOKIE,
};

use crate::{app::AppState, error::ApiError};

/// Gate middleware
pub async fn auth_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = TokenState::from_cookie(
        jar.get(SESSION_COOKIE).map(|cookie| cookie.value()),
        state.jwt_secret(),
    );

    let decision = decide(req.uri().path(), &token);

    match decision {
        GateDecision::Allow(context) => {
            if let Some(context) = context {
                req.extensions_mut().insert(context);
            }
            next.run(req).await
        }
        GateDecision::Unauthorized(message) => {
            tracing::debug!(path = %req.uri().path(), "API request rejected by gate");
            ApiError::Unauthorized(message.to_string()).into_response()
        }
        GateDecision::RedirectToLogin { clear_cookie } => {
            if clear_cookie {
                (clear_session(jar), Redirect::to(LOGIN_PAGE)).into_response()
            } else {
                Redirect::to(LOGIN_PAGE).into_response()
            }
        }
        GateDecision::RedirectToDashboard => Redirect::to(DASHBOARD_PAGE).into_response(),
    }
}

/// Session cookie carrying `token`
///
/// HttpOnly, SameSite=Lax, Path=/, expiring with the token.
pub fn session_cookie(token: String, ttl: chrono::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .secure(secure)
        .build()
}

/// Adds a removal cookie for the session to the jar
///
/// Always emitted, whether or not the request carried the cookie.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    cookie.make_removal();

    jar.add(cookie)
}
