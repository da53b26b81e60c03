/// Row-by-row spreadsheet import
///
/// Every data row is parsed and upserted on its own. A failing row is counted
/// and described, then the import moves on; only the first
/// [`MAX_REPORTED_ERRORS`] descriptions are kept.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;

use crate::auth::password::PasswordError;
use crate::resource::Resource;
use crate::spreadsheet::SheetRow;

/// Cap on error messages returned to the caller
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Result of an import request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Non-blank data rows processed
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,

    /// `"Row N: reason"`, at most [`MAX_REPORTED_ERRORS`] entries
    pub errors: Vec<String>,
}

impl ImportSummary {
    fn record_failure(&mut self, row_number: usize, reason: impl std::fmt::Display) {
        self.failed += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(format!("Row {}: {}", row_number, reason));
        }
    }
}

/// What an upsert did with a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Why a single row could not be stored
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Row content is unusable
    #[error("{0}")]
    Invalid(String),

    /// Database rejected the write
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    /// Password could not be hashed
    #[error("{0}")]
    Password(#[from] PasswordError),
}

/// A resource that can be created or updated from spreadsheet rows
#[async_trait]
pub trait Importable: Resource {
    /// Validated row content
    type Row: Send;

    /// Validates one row
    ///
    /// Returns the reason shown to the user on failure.
    fn parse_row(row: &SheetRow) -> Result<Self::Row, String>;

    /// Updates the record with the row's natural key, or creates it
    async fn upsert(pool: &PgPool, row: Self::Row) -> Result<UpsertOutcome, ImportError>;
}

/// Imports parsed sheet rows into resource `R`
///
/// Rows where every cell is blank are skipped and not counted.
pub async fn import_rows<R: Importable>(pool: &PgPool, rows: Vec<SheetRow>) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for row in rows {
        if row.is_blank() {
            continue;
        }
        summary.total_rows += 1;

        let parsed = match R::parse_row(&row) {
            Ok(parsed) => parsed,
            Err(reason) => {
                summary.record_failure(row.number, reason);
                continue;
            }
        };

        match R::upsert(pool, parsed).await {
            Ok(UpsertOutcome::Created) => summary.created += 1,
            Ok(UpsertOutcome::Updated) => summary.updated += 1,
            Err(e) => {
                tracing::warn!(resource = R::LABEL, row = row.number, error = %e, "Import row failed");
                summary.record_failure(row.number, e);
            }
        }
    }

    tracing::info!(
        resource = R::LABEL,
        total = summary.total_rows,
        created = summary.created,
        updated = summary.updated,
        failed = summary.failed,
        "Import finished"
    );

    summary
}

/// Required trimmed cell, or `"<header> is required"`
pub fn required_cell<'a>(row: &'a SheetRow, header: &str) -> Result<&'a str, String> {
    row.get(header).ok_or_else(|| format!("{} is required", header))
}
