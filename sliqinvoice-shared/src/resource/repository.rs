/// Generic data access for [`Resource`] types
///
/// Column and table names come from the resource's constants; every
/// user-supplied value is bound as a parameter.

use sqlx::PgPool;
use uuid::Uuid;

use super::query::{count_query, select_query, ListParams, Page, Pagination};
use super::Resource;

/// Lists one page of records matching `params`
///
/// The total is counted with the same conditions as the page query.
pub async fn list<R: Resource>(pool: &PgPool, params: &ListParams) -> Result<Page<R>, sqlx::Error> {
    let total = count::<R>(pool, params).await?;

    let mut qb = select_query::<R>(params);
    qb.push(" LIMIT ")
        .push_bind(params.limit)
        .push(" OFFSET ")
        .push_bind(params.offset());

    let items = qb.build_query_as::<R>().fetch_all(pool).await?;

    tracing::debug!(
        resource = R::LABEL,
        page = params.page,
        limit = params.limit,
        total,
        returned = items.len(),
        "Listed records"
    );

    Ok(Page {
        items,
        pagination: Pagination::new(params.page, params.limit, total),
    })
}

/// Every record matching `params`, in list order, ignoring pagination
pub async fn fetch_all<R: Resource>(pool: &PgPool, params: &ListParams) -> Result<Vec<R>, sqlx::Error> {
    let mut qb = select_query::<R>(params);
    qb.build_query_as::<R>().fetch_all(pool).await
}

/// Number of records matching `params`
pub async fn count<R: Resource>(pool: &PgPool, params: &ListParams) -> Result<i64, sqlx::Error> {
    let mut qb = count_query::<R>(params);
    let (total,) = qb.build_query_as::<(i64,)>().fetch_one(pool).await?;
    Ok(total)
}

/// Finds a record by ID
pub async fn find_by_id<R: Resource>(pool: &PgPool, id: Uuid) -> Result<Option<R>, sqlx::Error> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", R::COLUMNS, R::TABLE);

    sqlx::query_as::<_, R>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Finds a record by its natural key
pub async fn find_by_key<R: Resource>(pool: &PgPool, key: &str) -> Result<Option<R>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = $1",
        R::COLUMNS,
        R::TABLE,
        R::NATURAL_KEY
    );

    sqlx::query_as::<_, R>(&sql)
        .bind(key)
        .fetch_optional(pool)
        .await
}

/// Whether the natural key is already used by a record other than `exclude`
pub async fn key_taken<R: Resource>(
    pool: &PgPool,
    key: &str,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1 AND ($2::uuid IS NULL OR id <> $2))",
        R::TABLE,
        R::NATURAL_KEY
    );

    let (taken,): (bool,) = sqlx::query_as(&sql)
        .bind(key)
        .bind(exclude)
        .fetch_one(pool)
        .await?;

    Ok(taken)
}

/// Deletes a record, returning whether it existed
pub async fn delete<R: Resource>(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let sql = format!("DELETE FROM {} WHERE id = $1", R::TABLE);

    let result = sqlx::query(&sql).bind(id).execute(pool).await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes every listed record in one statement
///
/// Returns the number of rows actually removed; IDs that do not exist are
/// silently skipped.
pub async fn delete_many<R: Resource>(pool: &PgPool, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let sql = format!("DELETE FROM {} WHERE id = ANY($1)", R::TABLE);

    let result = sqlx::query(&sql).bind(ids).execute(pool).await?;

    tracing::info!(
        resource = R::LABEL,
        requested = ids.len(),
        deleted = result.rows_affected(),
        "Bulk delete"
    );

    Ok(result.rows_affected())
}
