/// User model and database operations
///
/// Users are the accounts that sign in to the dashboard. Administrators and
/// moderators are created by hand; customer logins are provisioned from
/// Customer records (see [`crate::customer_link`]) or by self-registration.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL,              -- stored lowercase, UNIQUE
///     password_hash TEXT NOT NULL,
///     name TEXT NOT NULL,
///     role TEXT NOT NULL DEFAULT 'customer',
///     permissions TEXT[] NOT NULL DEFAULT '{}',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     customer_id UUID,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use sliqinvoice_shared::models::user::{User, UpdateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// if let Some(user) = User::find_by_email(&pool, "Ops@SliqInvoice.com").await? {
///     let update = UpdateUser {
///         is_active: Some(false),
///         ..Default::default()
///     };
///     User::update(&pool, user.id, update).await?;
/// }
/// # Ok(())
/// # }
/// ```

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{is_valid_email, normalize_email, normalize_permissions, parse_permission_list, UnknownVariant};
use crate::auth::password::{hash_password_blocking, validate_password_length};
use crate::import::{required_cell, ImportError, Importable, UpsertOutcome};
use crate::resource::{repository, FilterKind, FilterSpec, Resource};
use crate::spreadsheet::{format_timestamp, SheetExport, SheetRow};

/// Dashboard roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access to every resource
    SuperAdmin,

    /// Staff account
    Moderator,

    /// Login of a Customer record
    Customer,

    /// Additional login under a Customer
    CustomerSubUser,
}

/// Stored values of every role
pub const ROLE_VALUES: &[&str] = &["super_admin", "moderator", "customer", "customer_sub_user"];

impl UserRole {
    /// Stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Moderator => "moderator",
            UserRole::Customer => "customer",
            UserRole::CustomerSubUser => "customer_sub_user",
        }
    }

    /// Display name used in spreadsheets
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "Super Admin",
            UserRole::Moderator => "Moderator",
            UserRole::Customer => "Customer",
            UserRole::CustomerSubUser => "Customer Sub User",
        }
    }

    /// Parses a stored value or a display name, ignoring case
    ///
    /// "Super Admin", "super-admin" and "super_admin" are all accepted.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        match normalized.as_str() {
            "super_admin" | "superadmin" => Some(UserRole::SuperAdmin),
            "moderator" => Some(UserRole::Moderator),
            "customer" => Some(UserRole::Customer),
            "customer_sub_user" | "customer_subuser" => Some(UserRole::CustomerSubUser),
            _ => None,
        }
    }

    /// Whether a User with this role may serve as a Customer's login
    ///
    /// Staff accounts are never linked, so Customer edits can't reach them.
    pub fn is_customer_login(&self) -> bool {
        matches!(self, UserRole::Customer | UserRole::CustomerSubUser)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for UserRole {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserRole::parse(&value).ok_or(UnknownVariant { kind: "role", value })
    }
}

/// User account
///
/// The password hash is never serialized.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Lowercase e-mail, unique across users
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name
    pub name: String,

    #[sqlx(try_from = "String")]
    pub role: UserRole,

    /// Free-form permission strings
    pub permissions: Vec<String>,

    /// Inactive users cannot sign in
    pub is_active: bool,

    /// Customer this login belongs to, if any
    pub customer_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// None if the user never signed in
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// E-mail (normalized on insert)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub name: String,
    pub role: UserRole,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub customer_id: Option<Uuid>,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub permissions: Option<Vec<String>>,
    pub is_active: Option<bool>,

    /// Use Some(None) to unlink
    pub customer_id: Option<Option<Uuid>>,
}

impl UpdateUser {
    /// Whether applying this update would change nothing
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password_hash.is_none()
            && self.name.is_none()
            && self.role.is_none()
            && self.permissions.is_none()
            && self.is_active.is_none()
            && self.customer_id.is_none()
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, permissions, is_active, customer_id, created_at, updated_at, last_login_at";

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the e-mail is taken (`users_email_key`) or the
    /// database is unreachable.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, name, role, permissions, is_active, customer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(&data.email))
            .bind(data.password_hash)
            .bind(data.name.trim().to_string())
            .bind(data.role.as_str())
            .bind(normalize_permissions(&data.permissions))
            .bind(data.is_active)
            .bind(data.customer_id)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by e-mail, ignoring case
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        repository::find_by_key::<User>(pool, &normalize_email(email)).await
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` are written; `updated_at` is always
    /// bumped.
    ///
    /// # Returns
    ///
    /// The updated user, or None if the user doesn't exist
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateUser) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if data.permissions.is_some() {
            bind_count += 1;
            query.push_str(&format!(", permissions = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_active = ${}", bind_count));
        }
        if data.customer_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", customer_id = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", USER_COLUMNS));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(normalize_email(&email));
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(name) = data.name {
            q = q.bind(name.trim().to_string());
        }
        if let Some(role) = data.role {
            q = q.bind(role.as_str());
        }
        if let Some(permissions) = data.permissions {
            q = q.bind(normalize_permissions(&permissions));
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }
        if let Some(customer_id) = data.customer_id {
            q = q.bind(customer_id);
        }

        q.fetch_optional(pool).await
    }

    /// Records a successful sign-in
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// "active" / "inactive"
    pub fn status(&self) -> &'static str {
        if self.is_active {
            "active"
        } else {
            "inactive"
        }
    }
}

impl Resource for User {
    const LABEL: &'static str = "User";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = USER_COLUMNS;
    const NATURAL_KEY: &'static str = "email";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "email"];
    const FILTERS: &'static [FilterSpec] = &[
        FilterSpec {
            param: "role",
            column: "role",
            kind: FilterKind::OneOf(ROLE_VALUES),
        },
        FilterSpec {
            param: "status",
            column: "is_active",
            kind: FilterKind::Flag {
                on: "active",
                off: "inactive",
            },
        },
    ];
    const SORT_COLUMNS: &'static [&'static str] =
        &["name", "email", "role", "created_at", "updated_at", "last_login_at"];

    fn id(&self) -> Uuid {
        self.id
    }
}

impl SheetExport for User {
    const SHEET_NAME: &'static str = "Users";
    const EXPORT_HEADERS: &'static [&'static str] =
        &["Name", "Email", "Role", "Status", "Permissions", "Created At"];

    fn export_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.email.clone(),
            self.role.label().to_string(),
            if self.is_active { "Active" } else { "Inactive" }.to_string(),
            self.permissions.join(", "),
            format_timestamp(&self.created_at),
        ]
    }
}

/// Parses an "Active"/"Inactive" cell
pub fn parse_active_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "active" => Some(true),
        "inactive" => Some(false),
        _ => None,
    }
}

/// Validated user import row
///
/// Optional cells left blank keep the stored value on update and fall back
/// to defaults on create.
#[derive(Debug, Clone, PartialEq)]
pub struct UserImportRow {
    pub name: String,
    pub email: String,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub permissions: Option<Vec<String>>,
    pub password: Option<String>,
}

#[async_trait]
impl Importable for User {
    type Row = UserImportRow;

    fn parse_row(row: &SheetRow) -> Result<Self::Row, String> {
        let name = required_cell(row, "Name")?.to_string();

        let raw_email = required_cell(row, "Email")?;
        let email = normalize_email(raw_email);
        if !is_valid_email(&email) {
            return Err(format!("Invalid email address: {}", raw_email));
        }

        let role = row
            .get("Role")
            .map(|r| UserRole::parse(r).ok_or_else(|| format!("Invalid role: {}", r)))
            .transpose()?;

        let is_active = row
            .get("Status")
            .map(|s| parse_active_flag(s).ok_or_else(|| format!("Invalid status: {}", s)))
            .transpose()?;

        let permissions = row.get("Permissions").map(parse_permission_list);

        let password = row.get("Password").map(str::to_string);
        if let Some(password) = &password {
            validate_password_length(password)?;
        }

        Ok(UserImportRow {
            name,
            email,
            role,
            is_active,
            permissions,
            password,
        })
    }

    async fn upsert(pool: &PgPool, row: Self::Row) -> Result<UpsertOutcome, ImportError> {
        let password_hash = match row.password.as_deref() {
            Some(plain) => Some(hash_password_blocking(plain).await?),
            None => None,
        };

        match repository::find_by_key::<User>(pool, &row.email).await? {
            Some(existing) => {
                let update = UpdateUser {
                    name: Some(row.name),
                    role: row.role,
                    is_active: row.is_active,
                    permissions: row.permissions,
                    password_hash,
                    ..Default::default()
                };
                User::update(pool, existing.id, update).await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let password_hash = password_hash
                    .ok_or_else(|| ImportError::Invalid("Password is required for new users".into()))?;

                User::create(
                    pool,
                    CreateUser {
                        email: row.email,
                        password_hash,
                        name: row.name,
                        role: row.role.unwrap_or(UserRole::Customer),
                        permissions: row.permissions.unwrap_or_default(),
                        is_active: row.is_active.unwrap_or(true),
                        customer_id: None,
                    },
                )
                .await?;
                Ok(UpsertOutcome::Created)
            }
        }
    }
}
