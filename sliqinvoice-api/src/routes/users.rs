/// User management endpoints
///
/// Mounted at `/api/users`; list, read, delete, bulk delete, export and
/// import come from [`super::resource`].

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use sliqinvoice_shared::{
    auth::password,
    models::{
        double_option, normalize_email, normalize_permissions, trimmed, trimmed_option,
        user::{CreateUser, UpdateUser, User, UserRole},
    },
    resource::repository,
};
use uuid::Uuid;
use validator::Validate;

use super::resource::{self, not_found, parse_id};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};

pub fn routes() -> Router<AppState> {
    resource::routes::<User, _, _, _, _>(create, update)
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name is required (at most 100 characters)"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub password: String,

    /// Stored value or display name; defaults to `customer`
    pub role: Option<String>,

    #[serde(default)]
    pub permissions: Vec<String>,

    pub is_active: Option<bool>,
    pub customer_id: Option<Uuid>,
}

/// Update user request
///
/// Absent fields are left alone; an empty password is ignored.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,
    pub role: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub is_active: Option<bool>,

    /// `null` unlinks
    #[serde(default, deserialize_with = "double_option")]
    pub customer_id: Option<Option<Uuid>>,
}

fn parse_role(value: &str) -> ApiResult<UserRole> {
    UserRole::parse(value).ok_or_else(|| ApiError::invalid_field("role", format!("Invalid role: {}", value)))
}

/// Applies the minimum length rule to a new password
pub(crate) fn check_password(plain: &str) -> ApiResult<()> {
    password::validate_password_length(plain).map_err(|message| ApiError::invalid_field("password", message))
}

/// Hash for a new password, after the length rule
pub(crate) async fn hash_new_password(plain: &str) -> ApiResult<String> {
    check_password(plain)?;
    Ok(password::hash_password_blocking(plain).await?)
}

/// Hash for a replacement password, `None` when left blank
pub(crate) async fn hash_replacement_password(plain: Option<&str>) -> ApiResult<Option<String>> {
    match plain.filter(|p| !p.is_empty()) {
        Some(plain) => hash_new_password(plain).await.map(Some),
        None => Ok(None),
    }
}

impl UpdateUserRequest {
    /// Validated model changes
    async fn into_changes(self) -> ApiResult<UpdateUser> {
        self.validate()?;
        let role = self.role.as_deref().map(parse_role).transpose()?;

        Ok(UpdateUser {
            email: self.email.as_deref().map(normalize_email),
            password_hash: hash_replacement_password(self.password.as_deref()).await?,
            name: self.name,
            role,
            permissions: self.permissions.map(normalize_permissions),
            is_active: self.is_active,
            customer_id: self.customer_id,
        })
    }
}

/// Creates a user
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn create(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateUserRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<ApiResponse<User>>)> {
    req.validate()?;

    let role = match req.role.as_deref().filter(|r| !r.trim().is_empty()) {
        Some(role) => parse_role(role)?,
        None => UserRole::Customer,
    };
    check_password(&req.password)?;

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
            role,
            permissions: normalize_permissions(&req.permissions),
            is_active: req.is_active.unwrap_or(true),
            customer_id: req.customer_id,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user).with_message("User created successfully")),
    ))
}

/// Updates a user
///
/// # Errors
///
/// - `400 Bad Request`: Malformed ID or validation failed
/// - `404 Not Found`: No such user
/// - `409 Conflict`: New e-mail belongs to another user
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateUserRequest>, ApiError>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let id = parse_id(&id)?;
    let changes = req.into_changes().await?;

    if let Some(email) = &changes.email {
        if repository::key_taken::<User>(&state.db, email, Some(id)).await? {
            return Err(ApiError::Conflict("Email already exists".to_string()));
        }
    }

    let user = User::update(&state.db, id, changes)
        .await?
        .ok_or_else(not_found::<User>)?;

    tracing::info!(user_id = %user.id, "User updated");
    Ok(Json(ApiResponse::success(user).with_message("User updated successfully")))
}
