/// Customer model and database operations
///
/// A Customer is a subscribing company. Each one is expected to own a login
/// User with the same e-mail and password hash; that User is provisioned
/// after the insert by [`crate::customer_link`], not in the same transaction,
/// so `user_id` may briefly (or, after a failure, durably) be NULL.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE customers (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_name TEXT NOT NULL,
///     contact_name TEXT,
///     contact_email TEXT NOT NULL,      -- stored lowercase, UNIQUE
///     phone TEXT,
///     address TEXT,
///     password_hash TEXT NOT NULL,
///     subscription_status TEXT NOT NULL DEFAULT 'active',
///     permissions TEXT[] NOT NULL DEFAULT '{}',
///     package_id UUID,
///     user_id UUID,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{is_valid_email, normalize_email, normalize_permissions, parse_permission_list, UnknownVariant};
use crate::auth::password::{hash_password_blocking, validate_password_length};
use crate::customer_link;
use crate::import::{required_cell, ImportError, Importable, UpsertOutcome};
use crate::resource::{repository, FilterKind, FilterSpec, Resource};
use crate::spreadsheet::{format_timestamp, SheetExport, SheetRow};

/// Billing state of a customer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Suspended,
    Cancelled,
}

/// Stored values of every subscription status
pub const SUBSCRIPTION_STATUS_VALUES: &[&str] = &["active", "suspended", "cancelled"];

impl SubscriptionStatus {
    /// Stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Display name used in spreadsheets
    pub fn label(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::Suspended => "Suspended",
            SubscriptionStatus::Cancelled => "Cancelled",
        }
    }

    /// Parses a status, ignoring case; accepts the US spelling "canceled"
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" => Some(SubscriptionStatus::Active),
            "suspended" => Some(SubscriptionStatus::Suspended),
            "cancelled" | "canceled" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether the customer's login may sign in
    pub fn allows_login(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SubscriptionStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SubscriptionStatus::parse(&value).ok_or(UnknownVariant {
            kind: "subscription status",
            value,
        })
    }
}

/// Customer record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: Option<String>,

    /// Lowercase e-mail, unique across customers
    pub contact_email: String,

    pub phone: Option<String>,
    pub address: Option<String>,

    /// Argon2id hash, shared with the linked User
    #[serde(skip_serializing)]
    pub password_hash: String,

    #[sqlx(try_from = "String")]
    pub subscription_status: SubscriptionStatus,

    pub permissions: Vec<String>,

    /// Package reference, not resolved anywhere yet
    pub package_id: Option<Uuid>,

    /// Provisioned login, NULL until linked
    pub user_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Name given to the linked User
    pub fn login_name(&self) -> &str {
        self.contact_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.company_name)
    }
}

/// Input for creating a new customer
#[derive(Debug, Clone)]
pub struct CreateCustomer {
    pub company_name: String,
    pub contact_name: Option<String>,
    pub contact_email: String,
    pub phone: Option<String>,
    pub address: Option<String>,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub subscription_status: SubscriptionStatus,
    pub permissions: Vec<String>,
    pub package_id: Option<Uuid>,
}

/// Input for updating an existing customer
///
/// Nullable columns take `Some(None)` to clear.
#[derive(Debug, Clone, Default)]
pub struct UpdateCustomer {
    pub company_name: Option<String>,
    pub contact_name: Option<Option<String>>,
    pub contact_email: Option<String>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub permissions: Option<Vec<String>>,
    pub package_id: Option<Option<Uuid>>,
}

const CUSTOMER_COLUMNS: &str = "id, company_name, contact_name, contact_email, phone, address, password_hash, \
     subscription_status, permissions, package_id, user_id, created_at, updated_at";

impl Customer {
    /// Inserts the customer row only
    ///
    /// Callers normally go through [`customer_link::create_and_link`], which
    /// also provisions the login User.
    pub async fn create(pool: &PgPool, data: CreateCustomer) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO customers (company_name, contact_name, contact_email, phone, address,
                                   password_hash, subscription_status, permissions, package_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        );

        sqlx::query_as::<_, Customer>(&sql)
            .bind(data.company_name.trim().to_string())
            .bind(data.contact_name)
            .bind(normalize_email(&data.contact_email))
            .bind(data.phone)
            .bind(data.address)
            .bind(data.password_hash)
            .bind(data.subscription_status.as_str())
            .bind(normalize_permissions(&data.permissions))
            .bind(data.package_id)
            .fetch_one(pool)
            .await
    }

    /// Updates the customer row only
    ///
    /// Only non-None fields in `data` are written.
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateCustomer) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE customers SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.company_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", company_name = ${}", bind_count));
        }
        if data.contact_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", contact_name = ${}", bind_count));
        }
        if data.contact_email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", contact_email = ${}", bind_count));
        }
        if data.phone.is_some() {
            bind_count += 1;
            query.push_str(&format!(", phone = ${}", bind_count));
        }
        if data.address.is_some() {
            bind_count += 1;
            query.push_str(&format!(", address = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.subscription_status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", subscription_status = ${}", bind_count));
        }
        if data.permissions.is_some() {
            bind_count += 1;
            query.push_str(&format!(", permissions = ${}", bind_count));
        }
        if data.package_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", package_id = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", CUSTOMER_COLUMNS));

        let mut q = sqlx::query_as::<_, Customer>(&query).bind(id);

        if let Some(company_name) = data.company_name {
            q = q.bind(company_name.trim().to_string());
        }
        if let Some(contact_name) = data.contact_name {
            q = q.bind(contact_name);
        }
        if let Some(contact_email) = data.contact_email {
            q = q.bind(normalize_email(&contact_email));
        }
        if let Some(phone) = data.phone {
            q = q.bind(phone);
        }
        if let Some(address) = data.address {
            q = q.bind(address);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(status) = data.subscription_status {
            q = q.bind(status.as_str());
        }
        if let Some(permissions) = data.permissions {
            q = q.bind(normalize_permissions(&permissions));
        }
        if let Some(package_id) = data.package_id {
            q = q.bind(package_id);
        }

        q.fetch_optional(pool).await
    }

    /// Stores the linked User's ID
    pub async fn set_user_id(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE customers SET user_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Customers without a usable login, oldest first
    ///
    /// Covers both a NULL `user_id` and one pointing at a deleted User.
    /// Pages by keyset: pass the `(created_at, id)` of the last row seen as
    /// `after` to continue past it.
    pub async fn list_unlinked(
        pool: &PgPool,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM customers c
            WHERE (c.user_id IS NULL
               OR NOT EXISTS (SELECT 1 FROM users u WHERE u.id = c.user_id))
              AND ($1::timestamptz IS NULL OR (c.created_at, c.id) > ($1, $2))
            ORDER BY c.created_at ASC, c.id ASC
            LIMIT $3
            "#,
            CUSTOMER_COLUMNS
        );

        let (after_created, after_id) = after.unzip();

        sqlx::query_as::<_, Customer>(&sql)
            .bind(after_created)
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

impl Resource for Customer {
    const LABEL: &'static str = "Customer";
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static str = CUSTOMER_COLUMNS;
    const NATURAL_KEY: &'static str = "contact_email";
    const SEARCH_COLUMNS: &'static [&'static str] = &["company_name", "contact_name", "contact_email"];
    const FILTERS: &'static [FilterSpec] = &[FilterSpec {
        param: "status",
        column: "subscription_status",
        kind: FilterKind::OneOf(SUBSCRIPTION_STATUS_VALUES),
    }];
    const SORT_COLUMNS: &'static [&'static str] = &[
        "company_name",
        "contact_name",
        "contact_email",
        "subscription_status",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> Uuid {
        self.id
    }
}

impl SheetExport for Customer {
    const SHEET_NAME: &'static str = "Customers";
    const EXPORT_HEADERS: &'static [&'static str] = &[
        "Company Name",
        "Contact Name",
        "Contact Email",
        "Phone",
        "Address",
        "Subscription Status",
        "Permissions",
        "Created At",
    ];

    fn export_row(&self) -> Vec<String> {
        vec![
            self.company_name.clone(),
            self.contact_name.clone().unwrap_or_default(),
            self.contact_email.clone(),
            self.phone.clone().unwrap_or_default(),
            self.address.clone().unwrap_or_default(),
            self.subscription_status.label().to_string(),
            self.permissions.join(", "),
            format_timestamp(&self.created_at),
        ]
    }
}

/// Validated customer import row
///
/// Optional cells left blank keep the stored value on update.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerImportRow {
    pub company_name: String,
    pub contact_email: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub permissions: Option<Vec<String>>,
    pub password: Option<String>,
}

#[async_trait]
impl Importable for Customer {
    type Row = CustomerImportRow;

    fn parse_row(row: &SheetRow) -> Result<Self::Row, String> {
        let company_name = required_cell(row, "Company Name")?.to_string();

        let raw_email = required_cell(row, "Contact Email")?;
        let contact_email = normalize_email(raw_email);
        if !is_valid_email(&contact_email) {
            return Err(format!("Invalid email address: {}", raw_email));
        }

        let subscription_status = row
            .get("Subscription Status")
            .map(|s| SubscriptionStatus::parse(s).ok_or_else(|| format!("Invalid subscription status: {}", s)))
            .transpose()?;

        let password = row.get("Password").map(str::to_string);
        if let Some(password) = &password {
            validate_password_length(password)?;
        }

        Ok(CustomerImportRow {
            company_name,
            contact_email,
            contact_name: row.get("Contact Name").map(str::to_string),
            phone: row.get("Phone").map(str::to_string),
            address: row.get("Address").map(str::to_string),
            subscription_status,
            permissions: row.get("Permissions").map(parse_permission_list),
            password,
        })
    }

    async fn upsert(pool: &PgPool, row: Self::Row) -> Result<UpsertOutcome, ImportError> {
        let password_hash = match row.password.as_deref() {
            Some(plain) => Some(hash_password_blocking(plain).await?),
            None => None,
        };

        match repository::find_by_key::<Customer>(pool, &row.contact_email).await? {
            Some(existing) => {
                let update = UpdateCustomer {
                    company_name: Some(row.company_name),
                    contact_name: row.contact_name.map(Some),
                    phone: row.phone.map(Some),
                    address: row.address.map(Some),
                    subscription_status: row.subscription_status,
                    permissions: row.permissions,
                    password_hash,
                    ..Default::default()
                };
                customer_link::update_and_sync(pool, existing.id, update).await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let password_hash = password_hash
                    .ok_or_else(|| ImportError::Invalid("Password is required for new customers".into()))?;

                customer_link::create_and_link(
                    pool,
                    CreateCustomer {
                        company_name: row.company_name,
                        contact_name: row.contact_name,
                        contact_email: row.contact_email,
                        phone: row.phone,
                        address: row.address,
                        password_hash,
                        subscription_status: row.subscription_status.unwrap_or_default(),
                        permissions: row.permissions.unwrap_or_default(),
                        package_id: None,
                    },
                )
                .await?;
                Ok(UpsertOutcome::Created)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(contact_name: Option<&str>) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            company_name: "Acme".into(),
            contact_name: contact_name.map(str::to_string),
            contact_email: "a@acme.com".into(),
            phone: None,
            address: None,
            password_hash: "$argon2id$hash".into(),
            subscription_status: SubscriptionStatus::Active,
            permissions: vec!["invoices.read".into()],
            package_id: None,
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(SubscriptionStatus::parse("Active"), Some(SubscriptionStatus::Active));
        assert_eq!(SubscriptionStatus::parse(" SUSPENDED "), Some(SubscriptionStatus::Suspended));
        assert_eq!(SubscriptionStatus::parse("canceled"), Some(SubscriptionStatus::Cancelled));
        assert_eq!(SubscriptionStatus::parse("Cancelled"), Some(SubscriptionStatus::Cancelled));
        assert_eq!(SubscriptionStatus::parse("trial"), None);

        for value in SUBSCRIPTION_STATUS_VALUES {
            assert_eq!(SubscriptionStatus::parse(value).unwrap().as_str(), *value);
        }
    }

    #[test]
    fn test_status_allows_login() {
        assert!(SubscriptionStatus::Active.allows_login());
        assert!(!SubscriptionStatus::Suspended.allows_login());
        assert!(!SubscriptionStatus::Cancelled.allows_login());
    }

    #[test]
    fn test_login_name_falls_back_to_company() {
        assert_eq!(customer(Some("Wile E.")).login_name(), "Wile E.");
        assert_eq!(customer(None).login_name(), "Acme");
        assert_eq!(customer(Some("  ")).login_name(), "Acme");
    }

    #[test]
    fn test_serialization_hides_hash() {
        let json = serde_json::to_value(customer(None)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["subscription_status"], "active");
        assert_eq!(json["contact_email"], "a@acme.com");
    }

    #[test]
    fn test_export_row_matches_headers() {
        let row = customer(Some("Wile E.")).export_row();
        assert_eq!(row.len(), Customer::EXPORT_HEADERS.len());
        assert_eq!(row[0], "Acme");
        assert_eq!(row[3], "");
        assert_eq!(row[5], "Active");
        assert_eq!(row[6], "invoices.read");
    }

    #[test]
    fn test_parse_row() {
        let row = SheetRow::new(
            7,
            [
                ("Company Name", "Acme"),
                ("Contact Email", "Sales@Acme.com"),
                ("Contact Name", ""),
                ("Phone", "5551234"),
                ("Subscription Status", "canceled"),
                ("Password", "secret1"),
            ],
        );

        let parsed = Customer::parse_row(&row).unwrap();
        assert_eq!(parsed.contact_email, "sales@acme.com");
        assert_eq!(parsed.contact_name, None);
        assert_eq!(parsed.phone.as_deref(), Some("5551234"));
        assert_eq!(parsed.subscription_status, Some(SubscriptionStatus::Cancelled));
    }

    #[test]
    fn test_parse_row_rejections() {
        let missing = SheetRow::new(2, [("Contact Email", "a@acme.com")]);
        assert_eq!(Customer::parse_row(&missing).unwrap_err(), "Company Name is required");

        let bad_status = SheetRow::new(
            2,
            [
                ("Company Name", "Acme"),
                ("Contact Email", "a@acme.com"),
                ("Subscription Status", "trial"),
            ],
        );
        assert_eq!(
            Customer::parse_row(&bad_status).unwrap_err(),
            "Invalid subscription status: trial"
        );

        let bad_email = SheetRow::new(2, [("Company Name", "Acme"), ("Contact Email", "acme")]);
        assert!(Customer::parse_row(&bad_email).unwrap_err().starts_with("Invalid email"));
    }
}
