/// Module model and database operations
///
/// Modules are feature/menu entries listed in the dashboard. They carry no
/// behavior here beyond being managed and listed.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE modules (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     number BIGINT GENERATED BY DEFAULT AS IDENTITY,  -- UNIQUE
///     key TEXT NOT NULL,                               -- UNIQUE
///     name TEXT NOT NULL,
///     status TEXT NOT NULL DEFAULT 'active',
///     description TEXT,
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

use super::UnknownVariant;
use crate::import::{required_cell, ImportError, Importable, UpsertOutcome};
use crate::resource::{repository, FilterKind, FilterSpec, Resource};
use crate::spreadsheet::{format_timestamp, SheetExport, SheetRow};

/// Longest accepted module key
pub const MAX_KEY_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    #[default]
    Active,
    Inactive,
}

/// Stored values of every module status
pub const MODULE_STATUS_VALUES: &[&str] = &["active", "inactive"];

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Active => "active",
            ModuleStatus::Inactive => "inactive",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModuleStatus::Active => "Active",
            ModuleStatus::Inactive => "Inactive",
        }
    }

    /// Parses a status, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" => Some(ModuleStatus::Active),
            "inactive" => Some(ModuleStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ModuleStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ModuleStatus::parse(&value).ok_or(UnknownVariant {
            kind: "module status",
            value,
        })
    }
}

/// Normalizes and checks a module key
///
/// Keys are lowercase identifiers: a letter followed by letters, digits,
/// `_` or `-`, at most [`MAX_KEY_LENGTH`] characters.
///
/// # Errors
///
/// Returns the user-facing message when the key is unusable.
pub fn validate_module_key(key: &str) -> Result<String, String> {
    let key = key.trim().to_lowercase();

    if key.is_empty() {
        return Err("Key is required".to_string());
    }
    if key.chars().count() > MAX_KEY_LENGTH {
        return Err(format!("Key must be at most {} characters", MAX_KEY_LENGTH));
    }

    let mut chars = key.chars();
    let starts_with_letter = chars.next().map(|c| c.is_ascii_lowercase()).unwrap_or(false);
    let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

    if !starts_with_letter || !rest_ok {
        return Err(format!(
            "Invalid key: {} (use a letter followed by letters, digits, '_' or '-')",
            key
        ));
    }

    Ok(key)
}

/// Module record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Module {
    pub id: Uuid,

    /// Sequential display number ("Module ID" in spreadsheets)
    pub number: i64,

    /// Unique lowercase identifier
    pub key: String,

    pub name: String,

    #[sqlx(try_from = "String")]
    pub status: ModuleStatus,

    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateModule {
    /// Already validated with [`validate_module_key`]
    pub key: String,
    pub name: String,
    pub status: ModuleStatus,
    pub description: Option<String>,
}

/// Only non-None fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateModule {
    pub key: Option<String>,
    pub name: Option<String>,
    pub status: Option<ModuleStatus>,
    pub description: Option<Option<String>>,
}

const MODULE_COLUMNS: &str = "id, number, key, name, status, description, created_at, updated_at";

impl Module {
    pub async fn create(pool: &PgPool, data: CreateModule) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO modules (key, name, status, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            MODULE_COLUMNS
        );

        sqlx::query_as::<_, Module>(&sql)
            .bind(data.key)
            .bind(data.name.trim().to_string())
            .bind(data.status.as_str())
            .bind(data.description)
            .fetch_one(pool)
            .await
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateModule) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE modules SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.key.is_some() {
            bind_count += 1;
            query.push_str(&format!(", key = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", MODULE_COLUMNS));

        let mut q = sqlx::query_as::<_, Module>(&query).bind(id);

        if let Some(key) = data.key {
            q = q.bind(key);
        }
        if let Some(name) = data.name {
            q = q.bind(name.trim().to_string());
        }
        if let Some(status) = data.status {
            q = q.bind(status.as_str());
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        q.fetch_optional(pool).await
    }
}

impl Resource for Module {
    const LABEL: &'static str = "Module";
    const TABLE: &'static str = "modules";
    const COLUMNS: &'static str = MODULE_COLUMNS;
    const NATURAL_KEY: &'static str = "key";
    const SEARCH_COLUMNS: &'static [&'static str] = &["key", "name", "description"];
    const FILTERS: &'static [FilterSpec] = &[FilterSpec {
        param: "status",
        column: "status",
        kind: FilterKind::OneOf(MODULE_STATUS_VALUES),
    }];
    const SORT_COLUMNS: &'static [&'static str] =
        &["number", "key", "name", "status", "created_at", "updated_at"];

    fn id(&self) -> Uuid {
        self.id
    }
}

impl SheetExport for Module {
    const SHEET_NAME: &'static str = "Modules";
    const EXPORT_HEADERS: &'static [&'static str] =
        &["Module ID", "Key", "Name", "Status", "Description", "Created At"];

    fn export_row(&self) -> Vec<String> {
        vec![
            self.number.to_string(),
            self.key.clone(),
            self.name.clone(),
            self.status.label().to_string(),
            self.description.clone().unwrap_or_default(),
            format_timestamp(&self.created_at),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleImportRow {
    pub key: String,
    pub name: String,
    pub status: Option<ModuleStatus>,
    pub description: Option<String>,
}

#[async_trait]
impl Importable for Module {
    type Row = ModuleImportRow;

    fn parse_row(row: &SheetRow) -> Result<Self::Row, String> {
        let key = validate_module_key(required_cell(row, "Key")?)?;
        let name = required_cell(row, "Name")?.to_string();

        let status = row
            .get("Status")
            .map(|s| ModuleStatus::parse(s).ok_or_else(|| format!("Invalid status: {}", s)))
            .transpose()?;

        Ok(ModuleImportRow {
            key,
            name,
            status,
            description: row.get("Description").map(str::to_string),
        })
    }

    async fn upsert(pool: &PgPool, row: Self::Row) -> Result<UpsertOutcome, ImportError> {
        match repository::find_by_key::<Module>(pool, &row.key).await? {
            Some(existing) => {
                let update = UpdateModule {
                    name: Some(row.name),
                    status: row.status,
                    description: row.description.map(Some),
                    ..Default::default()
                };
                Module::update(pool, existing.id, update).await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                Module::create(
                    pool,
                    CreateModule {
                        key: row.key,
                        name: row.name,
                        status: row.status.unwrap_or_default(),
                        description: row.description,
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

    #[test]
    fn test_validate_module_key() {
        assert_eq!(validate_module_key("  Billing ").unwrap(), "billing");
        assert_eq!(validate_module_key("invoice-templates_v2").unwrap(), "invoice-templates_v2");

        assert_eq!(validate_module_key("").unwrap_err(), "Key is required");
        assert!(validate_module_key("2fa").is_err());
        assert!(validate_module_key("has space").is_err());
        assert!(validate_module_key("semi;colon").is_err());
        assert!(validate_module_key(&"k".repeat(MAX_KEY_LENGTH + 1)).is_err());
        assert!(validate_module_key(&"k".repeat(MAX_KEY_LENGTH)).is_ok());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ModuleStatus::parse("INACTIVE"), Some(ModuleStatus::Inactive));
        assert_eq!(ModuleStatus::parse("Active"), Some(ModuleStatus::Active));
        assert_eq!(ModuleStatus::parse("archived"), None);
        assert!(ModuleStatus::try_from("archived".to_string()).is_err());
    }

    #[test]
    fn test_export_row() {
        let module = Module {
            id: Uuid::new_v4(),
            number: 42,
            key: "reports".into(),
            name: "Reports".into(),
            status: ModuleStatus::Inactive,
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let row = module.export_row();
        assert_eq!(row.len(), Module::EXPORT_HEADERS.len());
        assert_eq!(row[0], "42");
        assert_eq!(row[3], "Inactive");
        assert_eq!(row[4], "");
    }

    #[test]
    fn test_parse_row() {
        let row = SheetRow::new(
            2,
            [("Key", "Reports"), ("Name", "Reports"), ("Status", "inactive"), ("Description", "")],
        );
        let parsed = Module::parse_row(&row).unwrap();
        assert_eq!(parsed.key, "reports");
        assert_eq!(parsed.status, Some(ModuleStatus::Inactive));
        assert_eq!(parsed.description, None);

        let no_name = SheetRow::new(2, [("Key", "reports")]);
        assert_eq!(Module::parse_row(&no_name).unwrap_err(), "Name is required");

        let bad_status = SheetRow::new(2, [("Key", "reports"), ("Name", "R"), ("Status", "on")]);
        assert_eq!(Module::parse_row(&bad_status).unwrap_err(), "Invalid status: on");
    }
}
