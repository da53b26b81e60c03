/// Authentication endpoints
///
/// The session lives in the `token` cookie (see
/// [`crate::middleware::auth_gate`]); no token is ever returned in a body.
///
/// # Endpoints
///
/// - `POST /api/auth/login` - Verify credentials and set the cookie
/// - `POST /api/auth/register` - Create a customer login and set the cookie
/// - `POST /api/auth/logout` - Clear the cookie
/// - `GET /api/auth/me` - Current user (behind the gate)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::auth_gate::{clear_session, session_cookie},
    response::ApiResponse,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sliqinvoice_shared::{
    auth::{gate::AuthContext, jwt, password},
    models::{
        normalize_email, trimmed,
        user::{CreateUser, User, UserRole},
    },
    resource::repository,
};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name is required (at most 100 characters)"))]
    pub name: String,

    /// Email address
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (at least 6 characters)
    #[serde(default)]
    pub password: String,
}

/// Body of login and register responses
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
}

/// Issues a token for `user` and puts it in the jar
fn start_session(state: &AppState, jar: CookieJar, user: &User) -> ApiResult<CookieJar> {
    let ttl = state.session_ttl();
    let claims = jwt::Claims::new(user.id, user.email.clone(), user.role, ttl);
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(jar.add(session_cookie(token, ttl, state.secure_cookies())))
}

/// Login endpoint
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown e-mail, wrong password, or inactive account
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<(CookieJar, Json<ApiResponse<SessionResponse>>)> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let mut user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password_blocking(&req.password, &user.password_hash).await? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    if !user.is_active {
        tracing::info!(user_id = %user.id, "Login rejected: account inactive");
        return Err(ApiError::Unauthorized("Account is inactive".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;
    user.last_login_at = Some(Utc::now());

    let jar = start_session(&state, jar, &user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok((
        jar,
        Json(ApiResponse::success(SessionResponse { user }).with_message("Login successful")),
    ))
}

/// Register a new customer login
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<(StatusCode, CookieJar, Json<ApiResponse<SessionResponse>>)> {
    req.validate()?;
    password::validate_password_length(&req.password)
        .map_err(|message| ApiError::invalid_field("password", message))?;

    let email = normalize_email(&req.email);
    if repository::key_taken::<User>(&state.db, &email, None).await? {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let user = User::create(
        &state.db,
        CreateUser {
            email,
            password_hash: password::hash_password_blocking(&req.password).await?,
            name: req.name,
            role: UserRole::Customer,
            permissions: Vec::new(),
            is_active: true,
            customer_id: None,
        },
    )
    .await?;

    let jar = start_session(&state, jar, &user)?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        jar,
        Json(ApiResponse::success(SessionResponse { user }).with_message("Registration successful")),
    ))
}

/// Clears the session cookie
///
/// The token itself stays valid until it expires.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    (
        clear_session(jar),
        Json(ApiResponse::success(()).with_message("Logged out")),
    )
}

/// Current user
///
/// # Errors
///
/// - `404 Not Found`: The account was deleted after the token was issued
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let user = repository::find_by_id::<User>(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::success(user)))
}
