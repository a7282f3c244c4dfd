use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::issue_token,
    credentials::verify_password,
    error::ApiError,
    models::{LoginRequest, LoginResponse, Profile},
    scope::{Principal, PrincipalKind},
};

/// Shared login flow. Unknown usernames and wrong passwords are indistinguishable (401);
/// a correct password on a deactivated account yields 403.
async fn login_as(
    state: &AppState,
    kind: PrincipalKind,
    payload: LoginRequest,
) -> Result<Json<LoginResponse>, ApiError> {
    let credentials = state
        .repo
        .find_credentials(kind, &payload.username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&payload.password, &credentials.password_hash) {
        tracing::info!(kind = kind.as_str(), "login rejected: bad credentials");
        return Err(ApiError::Unauthorized);
    }
    if !credentials.active {
        return Err(ApiError::Forbidden("account is inactive".to_string()));
    }

    let principal = state
        .repo
        .load_principal(kind, credentials.id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let profile = state.repo.load_profile(&principal).await?;
    let token = issue_token(&state.config, kind, credentials.id)?;

    tracing::info!(kind = kind.as_str(), id = credentials.id, "login succeeded");
    Ok(Json(LoginResponse {
        token,
        kind,
        expires_in: state.config.token_ttl_secs,
        profile,
    }))
}

/// login
///
/// [Public Route] Agency user login.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Bad credentials"),
        (status = 403, description = "Account inactive")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    login_as(&state, PrincipalKind::User, payload).await
}

/// admin_login
///
/// [Public Route] Platform administrator login.
#[utoipa::path(
    post,
    path = "/admin-login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    login_as(&state, PrincipalKind::Admin, payload).await
}

/// ba_login
///
/// [Public Route] Field agent login, used by the mobile client.
#[utoipa::path(
    post,
    path = "/ba-login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Bad credentials"),
        (status = 403, description = "Account inactive")
    )
)]
pub async fn ba_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    login_as(&state, PrincipalKind::Ba, payload).await
}

/// get_profile
///
/// [Authenticated Route] The caller's identity and scope facts.
#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "Profile", body = Profile))
)]
pub async fn get_profile(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.repo.load_profile(&principal).await?))
}
