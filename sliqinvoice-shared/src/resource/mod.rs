/// Generic resource repository
///
/// Users, Customers and Modules share one list/read/delete/export contract.
/// Each entity describes its table once through [`Resource`]; the functions
/// in [`repository`] and the list translation in [`query`] are written once
/// against that description.
///
/// Per-entity code is limited to inserts, partial updates, and spreadsheet
/// row mapping, which genuinely differ between entities.
///
/// # Example
///
/// ```no_run
/// use std::collections::HashMap;
/// use sliqinvoice_shared::models::customer::Customer;
/// use sliqinvoice_shared::resource::{query::ListParams, repository};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut query = HashMap::new();
/// query.insert("search".to_string(), "acme".to_string());
/// query.insert("status".to_string(), "active,suspended".to_string());
///
/// let params = ListParams::from_query::<Customer>(&query);
/// let page = repository::list::<Customer>(&pool, &params).await?;
/// println!("{} of {} customers", page.items.len(), page.pagination.total);
/// # Ok(())
/// # }
/// ```

pub mod query;
pub mod repository;

use serde::Serialize;
use sqlx::postgres::PgRow;
use uuid::Uuid;

/// How a filter query parameter maps onto a column
#[derive(Debug, Clone, Copy)]
pub enum FilterKind {
    /// Text column holding one of a fixed set of values
    OneOf(&'static [&'static str]),

    /// Boolean column exposed as two named states
    Flag {
        /// Value meaning `TRUE`
        on: &'static str,
        /// Value meaning `FALSE`
        off: &'static str,
    },
}

/// A filterable field of a resource
#[derive(Debug, Clone, Copy)]
pub struct FilterSpec {
    /// Query parameter name
    pub param: &'static str,

    /// Column the parameter constrains
    pub column: &'static str,

    /// Accepted values and their meaning
    pub kind: FilterKind,
}

/// Table description shared by the generic repository functions
///
/// Every constant is trusted SQL: column and table names are pushed into
/// queries verbatim, user input never is.
pub trait Resource:
    for<'r> sqlx::FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static
{
    /// Singular display name, used in messages ("Customer")
    const LABEL: &'static str;

    /// Table name
    const TABLE: &'static str;

    /// Comma-separated select list matching the `FromRow` impl
    const COLUMNS: &'static str;

    /// Unique natural key column
    const NATURAL_KEY: &'static str;

    /// Columns searched by the free-text `search` parameter
    const SEARCH_COLUMNS: &'static [&'static str];

    /// Filterable fields
    const FILTERS: &'static [FilterSpec];

    /// Columns accepted by `sort_by`
    const SORT_COLUMNS: &'static [&'static str];

    /// Sort column when `sort_by` is absent or not allowed
    const DEFAULT_SORT: &'static str = "created_at";

    /// Record identifier
    fn id(&self) -> Uuid;
}
