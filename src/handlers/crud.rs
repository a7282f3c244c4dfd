//! Generic CRUD handlers, instantiated once per resource by the router.
//!
//! These are not annotated for OpenAPI (utoipa cannot describe generic handlers); the
//! resource schemas are still registered on `ApiDoc`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::ApiError,
    models::Page,
    repository::{Repository, ResourceStore},
    resources::Resource,
    scope::Principal,
};

/// GET collection: visible rows, filtered and paged.
pub async fn list<R: Resource>(
    principal: Principal,
    State(state): State<AppState>,
    Query(page): Query<Page>,
    Query(filter): Query<R::Filter>,
) -> Result<Json<Vec<R>>, ApiError>
where
    dyn Repository: ResourceStore<R>,
{
    let scope = principal.scope();
    let rows =
        <dyn Repository as ResourceStore<R>>::list(state.repo.as_ref(), &scope, &filter, page)
            .await?;
    Ok(Json(rows))
}

/// POST collection → 201.
pub async fn create<R: Resource>(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<R::Create>,
) -> Result<(StatusCode, Json<R>), ApiError>
where
    dyn Repository: ResourceStore<R>,
{
    R::check_create(&payload).map_err(ApiError::BadRequest)?;
    let scope = principal.scope();
    let row =
        <dyn Repository as ResourceStore<R>>::create(state.repo.as_ref(), &scope, payload).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn retrieve<R: Resource>(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<R>, ApiError>
where
    dyn Repository: ResourceStore<R>,
{
    let scope = principal.scope();
    let row = <dyn Repository as ResourceStore<R>>::fetch(state.repo.as_ref(), &scope, id).await?;
    Ok(Json(row))
}

/// PUT/PATCH item: partial update, absent fields are kept.
pub async fn update<R: Resource>(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<R::Update>,
) -> Result<Json<R>, ApiError>
where
    dyn Repository: ResourceStore<R>,
{
    R::check_update(&payload).map_err(ApiError::BadRequest)?;
    let scope = principal.scope();
    let row =
        <dyn Repository as ResourceStore<R>>::update(state.repo.as_ref(), &scope, id, payload)
            .await?;
    Ok(Json(row))
}

/// DELETE item → 204.
pub async fn destroy<R: Resource>(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
    dyn Repository: ResourceStore<R>,
{
    let scope = principal.scope();
    <dyn Repository as ResourceStore<R>>::delete(state.repo.as_ref(), &scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
