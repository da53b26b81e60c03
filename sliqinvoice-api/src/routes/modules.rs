/// Module management endpoints, mounted at `/api/modules`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use sliqinvoice_shared::{
    models::{
        blank_to_none, double_option, trimmed, trimmed_option,
        module::{validate_module_key, CreateModule, Module, ModuleStatus, UpdateModule},
    },
    resource::repository,
};
use validator::Validate;

use super::resource::{self, not_found, parse_id};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};

pub fn routes() -> Router<AppState> {
    resource::routes::<Module, _, _, _, _>(create, update)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateModuleRequest {
    #[serde(default)]
    pub key: String,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name is required (at most 100 characters)"))]
    pub name: String,

    /// Defaults to `active`
    pub status: Option<String>,

    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateModuleRequest {
    pub key: Option<String>,

    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    pub status: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

fn parse_key(value: &str) -> ApiResult<String> {
    validate_module_key(value).map_err(|message| ApiError::invalid_field("key", message))
}

fn parse_status(value: &str) -> ApiResult<ModuleStatus> {
    ModuleStatus::parse(value)
        .ok_or_else(|| ApiError::invalid_field("status", format!("Invalid status: {}", value)))
}

impl UpdateModuleRequest {
    fn into_changes(self) -> ApiResult<UpdateModule> {
        self.validate()?;

        Ok(UpdateModule {
            key: self.key.as_deref().map(parse_key).transpose()?,
            name: self.name,
            status: self.status.as_deref().map(parse_status).transpose()?,
            description: self.description.map(blank_to_none),
        })
    }
}

/// Creates a module
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Key already exists
pub async fn create(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateModuleRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Module>>)> {
    req.validate()?;
    let key = parse_key(&req.key)?;

    let status = match req.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(status) => parse_status(status)?,
        None => ModuleStatus::default(),
    };

    if repository::key_taken::<Module>(&state.db, &key, None).await? {
        return Err(ApiError::Conflict("Module key already exists".to_string()));
    }

    let module = Module::create(
        &state.db,
        CreateModule {
            key,
            name: req.name,
            status,
            description: blank_to_none(req.description),
        },
    )
    .await?;

    tracing::info!(module_id = %module.id, key = %module.key, "Module created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(module).with_message("Module created successfully")),
    ))
}

/// Updates a module
///
/// # Errors
///
/// - `400 Bad Request`: Malformed ID or validation failed
/// - `404 Not Found`: No such module
/// - `409 Conflict`: New key belongs to another module
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateModuleRequest>, ApiError>,
) -> ApiResult<Json<ApiResponse<Module>>> {
    let id = parse_id(&id)?;
    let changes = req.into_changes()?;

    if let Some(key) = &changes.key {
        if repository::key_taken::<Module>(&state.db, key, Some(id)).await? {
            return Err(ApiError::Conflict("Module key already exists".to_string()));
        }
    }

    let module = Module::update(&state.db, id, changes)
        .await?
        .ok_or_else(not_found::<Module>)?;

    tracing::info!(module_id = %module.id, "Module updated");
    Ok(Json(ApiResponse::success(module).with_message("Module updated successfully")))
}
