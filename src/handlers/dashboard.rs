use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    error::ApiError,
    models::{Ba, DashboardStats, User},
    scope::Principal,
};

/// get_dashboard_stats
///
/// [Authenticated Route] Row counts restricted to what the caller can see.
#[utoipa::path(
    get,
    path = "/dashboard/stats",
    responses((status = 200, description = "Stats", body = DashboardStats))
)]
pub async fn get_dashboard_stats(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.repo.dashboard_stats(&principal.scope()).await?))
}

/// get_user_regions
///
/// [Authenticated Route] Distinct, non-empty regions of the visible agency users.
#[utoipa::path(
    get,
    path = "/users/regions",
    responses((status = 200, description = "Regions", body = [String]))
)]
pub async fn get_user_regions(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.repo.user_regions(&principal.scope()).await?))
}

/// toggle_user_status
///
/// [Authenticated Route] Flips `active` on an agency user. Deactivated users are
/// rejected on their next request.
#[utoipa::path(
    post,
    path = "/users/{id}/toggle-status",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 403, description = "Not writable"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn toggle_user_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        state.repo.toggle_user_status(&principal.scope(), id).await?,
    ))
}

/// toggle_ba_status
///
/// [Authenticated Route] Flips `active` on a field agent.
#[utoipa::path(
    post,
    path = "/bas/{id}/toggle-status",
    params(("id" = i64, Path, description = "BA ID")),
    responses(
        (status = 200, description = "Updated", body = Ba),
        (status = 403, description = "Not writable"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn toggle_ba_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Ba>, ApiError> {
    Ok(Json(state.repo.toggle_ba_status(&principal.scope(), id).await?))
}
