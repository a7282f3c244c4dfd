use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    error::ApiError,
    forms::{BaForms, FormDefinition, ProjectForm, Submitter, parse_submission},
    handlers::data::check_date_range,
    models::{BaDataQuery, SubmissionFilter, SubmissionReceipt, SubmitFormRequest},
    scope::{EntityKind, Ownership, Principal},
};

/// submittable_form
///
/// Loads the form of `project_id` and checks that the caller may submit to it: a field
/// agent assigned to the project, or an agency user of its agency. Shared with the
/// photo upload handler.
pub(crate) async fn submittable_form(
    state: &AppState,
    principal: &Principal,
    project_id: i64,
) -> Result<(FormDefinition, Submitter), ApiError> {
    let submitter = match principal {
        Principal::FieldAgent { id, .. } => Submitter::Ba(*id),
        Principal::AgencyUser { id, .. } => Submitter::User(*id),
        Principal::PlatformAdmin { .. } => {
            return Err(ApiError::Forbidden(
                "platform admins cannot submit forms".to_string(),
            ));
        }
    };

    let scope = principal.scope();
    let form = state.repo.form_definition(&scope, project_id).await?;

    let owner = Ownership {
        agency_id: Some(form.project.agency_id),
        project_id: Some(form.project.id),
        ba_id: match submitter {
            Submitter::Ba(id) => Some(id),
            Submitter::User(_) => None,
        },
        admin_id: None,
    };
    if !scope.can_write(EntityKind::Submission, &owner) {
        return Err(ApiError::Forbidden(
            "not allowed to submit to this project".to_string(),
        ));
    }
    Ok((form, submitter))
}

/// get_project_form
///
/// [Authenticated Route] The rendered form of one visible project.
#[utoipa::path(
    get,
    path = "/project-form-fields/{project_id}",
    params(("project_id" = i64, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Rendered form"),
        (status = 404, description = "Unknown or invisible project")
    )
)]
pub async fn get_project_form(
    principal: Principal,
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<ProjectForm>, ApiError> {
    let form = state
        .repo
        .form_definition(&principal.scope(), project_id)
        .await?;
    Ok(Json(ProjectForm(form)))
}

/// get_my_forms
///
/// [Authenticated Route] Field agents only: every assigned, active project rendered.
#[utoipa::path(
    get,
    path = "/me/forms",
    responses(
        (status = 200, description = "Forms of the calling field agent"),
        (status = 403, description = "Caller is not a field agent")
    )
)]
pub async fn get_my_forms(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<BaForms>, ApiError> {
    let Principal::FieldAgent { id, .. } = principal else {
        return Err(ApiError::Forbidden(
            "only field agents have assigned forms".to_string(),
        ));
    };
    let forms = state.repo.ba_forms(&principal.scope(), id).await?;
    Ok(Json(forms))
}

/// get_ba_rich_data
///
/// [Authenticated Route] The forms payload of any BA visible to the caller, optionally
/// narrowed to one project. With `include_data=true` every field carries that BA's
/// submitted values within the date range.
#[utoipa::path(
    get,
    path = "/rich-data/ba/{ba_id}",
    params(("ba_id" = i64, Path, description = "BA ID"), BaDataQuery),
    responses(
        (status = 200, description = "Forms of the BA"),
        (status = 400, description = "Malformed query"),
        (status = 404, description = "Unknown or invisible BA")
    )
)]
pub async fn get_ba_rich_data(
    principal: Principal,
    State(state): State<AppState>,
    Path(ba_id): Path<i64>,
    Query(query): Query<BaDataQuery>,
) -> Result<Json<BaForms>, ApiError> {
    check_date_range(query.start_date, query.end_date)?;
    let scope = principal.scope();
    let mut forms = state.repo.ba_forms(&scope, ba_id).await?;

    if let Some(project_id) = query.project_id {
        forms.projects.retain(|form| form.project.id == project_id);
    }
    if query.include_data.unwrap_or(false) {
        for form in &mut forms.projects {
            let filter = SubmissionFilter {
                project_id: Some(form.project.id),
                ba_id: Some(ba_id),
                start_date: query.start_date,
                end_date: query.end_date,
                ..Default::default()
            };
            let rows = state.repo.submission_values(&scope, &filter).await?;
            form.attach_values(&rows);
        }
    }
    Ok(Json(forms))
}

/// submit_form
///
/// [Authenticated Route] Validates a filled-in form against its definition and stores
/// the typed values. All validation problems are reported together (422).
#[utoipa::path(
    post,
    path = "/submit-form",
    request_body = SubmitFormRequest,
    responses(
        (status = 201, description = "Stored", body = SubmissionReceipt),
        (status = 403, description = "Caller may not submit to this project"),
        (status = 404, description = "Unknown or invisible project"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn submit_form(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<SubmitFormRequest>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), ApiError> {
    let (form, submitter) = submittable_form(&state, &principal, payload.project_id).await?;
    let values = parse_submission(&form, &payload, submitter, Utc::now().date_naive())?;
    let receipt = state.repo.insert_submission(values).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
