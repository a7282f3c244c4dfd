use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;

use crate::{
    AppState,
    error::ApiError,
    forms::ProjectForm,
    models::{ProjectDataQuery, RecordQuery, SubmissionFilter, WideRecord},
    scope::Principal,
};

/// get_project_data
///
/// [Authenticated Route] The rendered form of a project. With `include_data=true` every
/// field carries the visible submitted values as strings, oldest first.
#[utoipa::path(
    get,
    path = "/data/project-data/{project_id}",
    params(("project_id" = i64, Path, description = "Project ID"), ProjectDataQuery),
    responses(
        (status = 200, description = "Rendered form with optional data values"),
        (status = 400, description = "Malformed query"),
        (status = 404, description = "Unknown or invisible project")
    )
)]
pub async fn get_project_data(
    principal: Principal,
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(query): Query<ProjectDataQuery>,
) -> Result<Json<ProjectForm>, ApiError> {
    check_date_range(query.start_date, query.end_date)?;
    let scope = principal.scope();
    let mut form = state.repo.form_definition(&scope, project_id).await?;

    if query.include_data.unwrap_or(false) {
        let filter = SubmissionFilter {
            project_id: Some(project_id),
            ba_id: query.ba_id,
            start_date: query.start_date,
            end_date: query.end_date,
            ..Default::default()
        };
        let rows = state.repo.submission_values(&scope, &filter).await?;
        form.attach_values(&rows);
    }
    Ok(Json(ProjectForm(form)))
}

/// get_records
///
/// [Authenticated Route] Visible submissions pivoted into one object per form fill,
/// newest first. `limit` defaults to 100 and is capped at 1000. `fields=a,b` keeps only
/// those columns; a list naming no visible column is a 400.
#[utoipa::path(
    get,
    path = "/data/records",
    params(RecordQuery),
    responses(
        (status = 200, description = "Pivoted records", body = [WideRecord]),
        (status = 400, description = "Malformed query or no valid fields")
    )
)]
pub async fn get_records(
    principal: Principal,
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<WideRecord>>, ApiError> {
    check_date_range(query.start_date, query.end_date)?;
    let scope = principal.scope();

    let requested = query.field_names();
    let selected = if requested.is_empty() {
        None
    } else {
        let available = state.repo.visible_columns(&scope, query.project_id).await?;
        let valid: Vec<String> = requested
            .into_iter()
            .filter(|name| available.iter().any(|column| column == name))
            .map(str::to_string)
            .collect();
        if valid.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "no valid fields requested; available fields: {}",
                available.join(", ")
            )));
        }
        Some(valid)
    };

    let mut records = state.repo.wide_records(&scope, &query).await?;
    if let Some(valid) = selected {
        for record in &mut records {
            record.values.retain(|column, _| valid.contains(column));
        }
    }
    Ok(Json(records))
}

/// Rejects an inverted `start_date`/`end_date` pair.
pub(crate) fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ApiError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(ApiError::BadRequest(
            "start_date must not be after end_date".to_string(),
        )),
        _ => Ok(()),
    }
}
