//! Record handlers
//!
//! Generic CRUD endpoints, instantiated once per resource by [`routes`].
//! Record versions travel as `ETag`; sending `If-Match` on update turns
//! last-write-wins into a compare-and-swap.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::{
    CreateRecord, DeleteRecord, GetRecord, ListRecords, Paging, Resource, UpdateBody,
    UpdateRecord, Versioned,
};
use crate::domain::aggregate::AggregateId;
use crate::domain::tenant::TenantContext;
use crate::error::{AppError, DomainError};
use crate::AppState;

fn etag(version: i64) -> HeaderValue {
    // Digits and quotes are always valid header characters.
    HeaderValue::from_str(&format!("\"{}\"", version)).unwrap_or(HeaderValue::from_static("\"0\""))
}

/// Parse an `If-Match` header into an expected version.
///
/// Accepts `"3"` and bare `3`. A missing header or `*` means no version
/// check. `If-Match` compares strongly, so a weak tag (`W/"3"`) never
/// matches and fails like a stale version.
fn expected_version(headers: &HeaderMap) -> Result<Option<i64>, AppError> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| AppError::BadRequest("If-Match is not valid text".to_string()))?
        .trim();
    if raw == "*" {
        return Ok(None);
    }

    if raw.starts_with("W/") {
        return Err(DomainError::Conflict(format!(
            "Weak entity tag {} cannot satisfy If-Match",
            raw
        ))
        .into());
    }

    raw.trim_matches('"')
        .parse::<i64>()
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("If-Match is not a record version: {}", raw)))
}

fn versioned_response<D: Serialize>(status: StatusCode, versioned: Versioned<D>) -> Response {
    (
        status,
        [(header::ETAG, etag(versioned.version))],
        Json(versioned.value),
    )
        .into_response()
}

/// GET /{collection}
///
/// List the tenant's records, optionally filtered and paged.
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Query(filter): Query<R::Filter>,
    Query(paging): Query<Paging>,
) -> Result<Json<Vec<R::Dto>>, AppError> {
    let records = state
        .dispatcher
        .send(&tenant, ListRecords::<R> { filter, paging })
        .await?;

    Ok(Json(records))
}

/// GET /{collection}/{id}
pub async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = state
        .dispatcher
        .send(&tenant, GetRecord::<R>::new(AggregateId(id)))
        .await?;

    Ok(versioned_response(StatusCode::OK, record))
}

/// POST /{collection}
///
/// Create a record owned by the caller's tenant.
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Json(input): Json<R::Input>,
) -> Result<Response, AppError> {
    let record = state
        .dispatcher
        .send(&tenant, CreateRecord::<R> { input })
        .await?;

    let location = format!("/{}/{}", R::COLLECTION, record.id);
    let location = HeaderValue::from_str(&location)
        .map_err(|e| AppError::Internal(format!("Invalid Location header: {}", e)))?;

    let mut response = versioned_response(StatusCode::CREATED, record);
    response.headers_mut().insert(header::LOCATION, location);
    Ok(response)
}

/// PUT /{collection}/{id}
///
/// Replace the mutable fields of a record. A body `id` that differs from
/// the path is rejected without touching the store. `If-Match` must carry
/// a strong tag from an earlier response.
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody<R::Input>>,
) -> Result<Response, AppError> {
    let request = UpdateRecord::<R>::from_route(AggregateId(id), body, expected_version(&headers)?)
        .inspect_err(|e| tracing::warn!(error = %e, "Rejected update"))?;

    let record = state.dispatcher.send(&tenant, request).await?;

    Ok(versioned_response(StatusCode::OK, record))
}

/// DELETE /{collection}/{id}
pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .dispatcher
        .send(&tenant, DeleteRecord::<R>::new(AggregateId(id)))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// CRUD routes for `R`, mounted under its collection name
pub fn routes<R: Resource>() -> Router<AppState> {
    let collection = format!("/{}", R::COLLECTION);
    let item = format!("{}/:id", collection);

    Router::new()
        .route(&collection, get(list::<R>).post(create::<R>))
        .route(
            &item,
            get(get_one::<R>).put(update::<R>).delete(delete::<R>),
        )
}
