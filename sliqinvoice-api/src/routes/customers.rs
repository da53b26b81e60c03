/// Customer management endpoints
///
/// Mounted at `/api/customers`. Creating or updating a customer also keeps
/// its login User in step (see [`sliqinvoice_shared::customer_link`]); that
/// side effect never fails the request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use sliqinvoice_shared::{
    auth::password,
    customer_link,
    models::{
        blank_to_none, double_option, normalize_email, normalize_permissions, trimmed, trimmed_option,
        customer::{CreateCustomer, Customer, SubscriptionStatus, UpdateCustomer},
    },
    resource::repository,
};
use uuid::Uuid;
use validator::Validate;

use super::resource::{self, not_found, parse_id};
use super::users::{check_password, hash_replacement_password};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};

pub fn routes() -> Router<AppState> {
    resource::routes::<Customer, _, _, _, _>(create, update)
}

/// Create customer request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "Company name is required (at most 200 characters)"))]
    pub company_name: String,

    pub contact_name: Option<String>,

    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub contact_email: String,

    pub phone: Option<String>,
    pub address: Option<String>,

    /// Also the password of the linked login
    #[serde(default)]
    pub password: String,

    /// Defaults to `active`
    pub subscription_status: Option<String>,

    #[serde(default)]
    pub permissions: Vec<String>,

    pub package_id: Option<Uuid>,
}

/// Update customer request
///
/// Absent fields are left alone; `null` clears an optional field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 200, message = "Company name must be 1 to 200 characters"))]
    pub company_name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub contact_name: Option<Option<String>>,

    #[validate(email(message = "Invalid email format"))]
    pub contact_email: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,

    pub password: Option<String>,
    pub subscription_status: Option<String>,
    pub permissions: Option<Vec<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub package_id: Option<Option<Uuid>>,
}

fn parse_status(value: &str) -> ApiResult<SubscriptionStatus> {
    SubscriptionStatus::parse(value).ok_or_else(|| {
        ApiError::invalid_field(
            "subscription_status",
            format!("Invalid subscription status: {}", value),
        )
    })
}

impl UpdateCustomerRequest {
    /// Validated model changes
    async fn into_changes(self) -> ApiResult<UpdateCustomer> {
        self.validate()?;
        let subscription_status = self.subscription_status.as_deref().map(parse_status).transpose()?;

        Ok(UpdateCustomer {
            company_name: self.company_name,
            contact_name: self.contact_name.map(blank_to_none),
            contact_email: self.contact_email.as_deref().map(normalize_email),
            phone: self.phone.map(blank_to_none),
            address: self.address.map(blank_to_none),
            password_hash: hash_replacement_password(self.password.as_deref()).await?,
            subscription_status,
            permissions: self.permissions.map(normalize_permissions),
            package_id: self.package_id,
        })
    }
}

/// Creates a customer and its login
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Contact email already exists
pub async fn create(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateCustomerRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Customer>>)> {
    req.validate()?;

    let subscription_status = match req.subscription_status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(status) => parse_status(status)?,
        None => SubscriptionStatus::default(),
    };
    check_password(&req.password)?;

    let contact_email = normalize_email(&req.contact_email);
    if repository::key_taken::<Customer>(&state.db, &contact_email, None).await? {
        return Err(ApiError::Conflict("Contact email already exists".to_string()));
    }

    let customer = customer_link::create_and_link(
        &state.db,
        CreateCustomer {
            company_name: req.company_name,
            contact_name: blank_to_none(req.contact_name),
            contact_email,
            phone: blank_to_none(req.phone),
            address: blank_to_none(req.address),
            password_hash: password::hash_password_blocking(&req.password).await?,
            subscription_status,
            permissions: normalize_permissions(&req.permissions),
            package_id: req.package_id,
        },
    )
    .await?;

    tracing::info!(
        customer_id = %customer.id,
        linked = customer.user_id.is_some(),
        "Customer created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(customer).with_message("Customer created successfully")),
    ))
}

/// Updates a customer and mirrors the change to its login
///
/// # Errors
///
/// - `400 Bad Request`: Malformed ID or validation failed
/// - `404 Not Found`: No such customer
/// - `409 Conflict`: New contact e-mail belongs to another customer
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateCustomerRequest>, ApiError>,
) -> ApiResult<Json<ApiResponse<Customer>>> {
    let id = parse_id(&id)?;
    let changes = req.into_changes().await?;

    if let Some(email) = &changes.contact_email {
        if repository::key_taken::<Customer>(&state.db, email, Some(id)).await? {
            return Err(ApiError::Conflict("Contact email already exists".to_string()));
        }
    }

    let customer = customer_link::update_and_sync(&state.db, id, changes)
        .await?
        .ok_or_else(not_found::<Customer>)?;

    tracing::info!(customer_id = %customer.id, "Customer updated");
    Ok(Json(ApiResponse::success(customer).with_message("Customer updated successfully")))
}
