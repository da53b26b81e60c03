/// Bootstrap data
///
/// A fresh database has no account able to sign in. When configured, the API
/// creates one `super_admin` at startup; an existing account with that e-mail
/// is left untouched, whatever its role or password.

use sqlx::PgPool;

use crate::auth::password::{hash_password, validate_password_length, PasswordError};
use crate::models::user::{CreateUser, User, UserRole};
use crate::models::{is_valid_email, normalize_email};

/// Error type for seeding
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Invalid seed admin email: {0}")]
    InvalidEmail(String),

    #[error("Invalid seed admin password: {0}")]
    InvalidPassword(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// What [`ensure_admin`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyPresent,
}

/// Ensures an administrator with `email` exists
pub async fn ensure_admin(pool: &PgPool, email: &str, password: &str) -> Result<SeedOutcome, SeedError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(SeedError::InvalidEmail(email));
    }
    validate_password_length(password).map_err(SeedError::InvalidPassword)?;

    if User::find_by_email(pool, &email).await?.is_some() {
        tracing::debug!(%email, "Seed admin already present");
        return Ok(SeedOutcome::AlreadyPresent);
    }

    let user = User::create(
        pool,
        CreateUser {
            email: email.clone(),
            password_hash: hash_password(password)?,
            name: "Administrator".to_string(),
            role: UserRole::SuperAdmin,
            permissions: Vec::new(),
            is_active: true,
            customer_id: None,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, %email, "Seed admin created");
    Ok(SeedOutcome::Created)
}
