use axum::{Json, extract::State};

use crate::{
    AppState,
    error::ApiError,
    handlers::forms::submittable_form,
    models::{PresignedUrlRequest, PresignedUrlResponse},
    scope::Principal,
    storage::submission_photo_key,
};

/// get_presigned_url
///
/// [Authenticated Route] Issues a 10-minute presigned PUT URL for a submission photo.
/// The caller must be allowed to submit to the project; the returned `resource_key` is
/// sent back as `image_key` with the submission.
#[utoipa::path(
    post,
    path = "/uploads/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 403, description = "Caller may not submit to this project")
    )
)]
pub async fn get_presigned_url(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, ApiError> {
    if payload.file_type.trim().is_empty() {
        return Err(ApiError::BadRequest("file_type must not be empty".to_string()));
    }
    submittable_form(&state, &principal, payload.project_id).await?;

    let object_key = submission_photo_key(payload.project_id, &payload.filename);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}
