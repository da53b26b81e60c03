/// Handlers shared by every CRUD resource
///
/// Users, Customers and Modules expose the same surface; only create and
/// update differ per entity and are supplied by the entity module.
///
/// # Endpoints
///
/// - `GET /` - Filtered, sorted, paginated list
/// - `GET /export` - Same filters, whole set as `.xlsx`
/// - `POST /import` - Multipart `file` upload, upserted row by row
/// - `POST|DELETE /bulk-delete` - `{"ids": [...]}`
/// - `GET /:id`, `DELETE /:id`

use std::collections::HashMap;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    handler::Handler,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sliqinvoice_shared::{
    import::{import_rows, ImportSummary, Importable},
    resource::{query::ListParams, repository, Resource},
    spreadsheet::{export_filename, export_records, read_workbook, SheetExport, XLSX_CONTENT_TYPE},
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::{ApiResponse, ListResponse},
};

/// Largest accepted import upload
pub const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

/// Multipart field carrying the spreadsheet
pub const IMPORT_FIELD: &str = "file";

/// Routes for resource `R`, with the entity's own create and update handlers
pub fn routes<R, C, CT, U, UT>(create: C, update: U) -> Router<AppState>
where
    R: Resource + SheetExport + Importable,
    C: Handler<CT, AppState>,
    U: Handler<UT, AppState>,
    CT: 'static,
    UT: 'static,
{
    Router::new()
        .route("/", get(list::<R>).post(create))
        .route("/export", get(export::<R>))
        .route(
            "/import",
            post(import::<R>).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
        .route("/bulk-delete", post(bulk_delete::<R>).delete(bulk_delete::<R>))
        .route("/:id", get(get_one::<R>).put(update).delete(delete_one::<R>))
}

/// Parses a path ID, 400 when malformed
pub fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid ID: {}", raw)))
}

/// 404 for resource `R`
pub fn not_found<R: Resource>() -> ApiError {
    ApiError::NotFound(format!("{} not found", R::LABEL))
}

pub async fn list<R: Resource>(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListResponse<R>>> {
    let params = ListParams::from_query::<R>(&query);
    let page = repository::list::<R>(&state.db, &params).await?;

    Ok(Json(ListResponse::from(page)))
}

pub async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<R>>> {
    let id = parse_id(&id)?;
    let record = repository::find_by_id::<R>(&state.db, id)
        .await?
        .ok_or_else(not_found::<R>)?;

    Ok(Json(ApiResponse::success(record)))
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
}

pub async fn delete_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<DeletedResponse>>> {
    let id = parse_id(&id)?;

    if !repository::delete::<R>(&state.db, id).await? {
        return Err(not_found::<R>());
    }

    tracing::info!(resource = R::LABEL, %id, "Record deleted");
    Ok(Json(
        ApiResponse::success(DeletedResponse { id })
            .with_message(format!("{} deleted successfully", R::LABEL)),
    ))
}

/// Bulk delete request
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    /// Rows actually removed
    pub deleted_count: u64,

    /// IDs in the request
    pub requested_count: usize,
}

/// Parses every ID before anything is deleted
pub fn parse_ids(raw: &[String]) -> ApiResult<Vec<Uuid>> {
    if raw.is_empty() {
        return Err(ApiError::BadRequest("No IDs provided".to_string()));
    }

    raw.iter().map(|id| parse_id(id)).collect()
}

pub async fn bulk_delete<R: Resource>(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<BulkDeleteRequest>, ApiError>,
) -> ApiResult<Json<ApiResponse<BulkDeleteResponse>>> {
    let ids = parse_ids(&req.ids)?;
    let deleted_count = repository::delete_many::<R>(&state.db, &ids).await?;

    Ok(Json(
        ApiResponse::success(BulkDeleteResponse {
            deleted_count,
            requested_count: ids.len(),
        })
        .with_message(format!("{} of {} records deleted", deleted_count, ids.len())),
    ))
}

pub async fn export<R: Resource + SheetExport>(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let params = ListParams::from_query::<R>(&query);
    let records = repository::fetch_all::<R>(&state.db, &params).await?;
    let workbook = export_records(&records)?;

    let filename = export_filename(R::TABLE, Utc::now().date_naive());
    tracing::info!(resource = R::LABEL, rows = records.len(), %filename, "Export generated");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        workbook,
    )
        .into_response())
}

pub async fn import<R: Importable>(
    State(state): State<AppState>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<Json<ApiResponse<ImportSummary>>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMPORT_FIELD) {
            upload = Some(field.bytes().await?);
            break;
        }
    }

    let bytes = upload
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let rows = read_workbook(&bytes)?;
    let summary = import_rows::<R>(&state.db, rows).await;

    let message = format!(
        "Import completed: {} created, {} updated, {} failed",
        summary.created, summary.updated, summary.failed
    );
    Ok(Json(ApiResponse::success(summary).with_message(message)))
}
