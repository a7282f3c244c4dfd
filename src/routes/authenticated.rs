use crate::{
    AppState,
    handlers::{auth, crud, dashboard, data, forms, uploads},
    models::{
        Agency, Ba, BaProject, FormSection, InputOption, Project, ProjectField, Submission, User,
    },
    repository::{Repository, ResourceStore},
    resources::Resource,
};
use axum::{
    Router,
    routing::{get, post},
};

/// resource
///
/// Mounts the generic CRUD handlers for `R` at `path` and `path/{id}`. Read-only
/// resources get list, retrieve and delete only.
pub fn resource<R: Resource>(path: &str) -> Router<AppState>
where
    dyn Repository: ResourceStore<R>,
{
    let item = format!("{path}/{{id}}");
    if R::MUTABLE {
        Router::new()
            .route(path, get(crud::list::<R>).post(crud::create::<R>))
            .route(
                &item,
                get(crud::retrieve::<R>)
                    .put(crud::update::<R>)
                    .patch(crud::update::<R>)
                    .delete(crud::destroy::<R>),
            )
    } else {
        Router::new()
            .route(path, get(crud::list::<R>))
            .route(&item, get(crud::retrieve::<R>).delete(crud::destroy::<R>))
    }
}

/// Authenticated Router Module
///
/// Everything a signed-in principal can reach. The auth middleware on this router
/// resolves the `Principal`; each handler then scopes its reads and writes through the
/// access scope calculator, so the same route serves admins, agency users and BAs with
/// different visibility.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/profile", get(auth::get_profile))
        // --- Forms ---
        .route(
            "/project-form-fields/{project_id}",
            get(forms::get_project_form),
        )
        .route("/me/forms", get(forms::get_my_forms))
        .route("/rich-data/ba/{ba_id}", get(forms::get_ba_rich_data))
        .route("/submit-form", post(forms::submit_form))
        .route("/uploads/presigned", post(uploads::get_presigned_url))
        // --- Data views ---
        .route(
            "/data/project-data/{project_id}",
            get(data::get_project_data),
        )
        .route("/data/records", get(data::get_records))
        // --- Dashboard & account management ---
        .route("/dashboard/stats", get(dashboard::get_dashboard_stats))
        .route("/users/regions", get(dashboard::get_user_regions))
        .route(
            "/users/{id}/toggle-status",
            post(dashboard::toggle_user_status),
        )
        .route("/bas/{id}/toggle-status", post(dashboard::toggle_ba_status))
        // --- CRUD façade ---
        .merge(resource::<Agency>("/agencies"))
        .merge(resource::<Project>("/projects"))
        .merge(resource::<FormSection>("/forms"))
        .merge(resource::<ProjectField>("/project-fields"))
        .merge(resource::<InputOption>("/input-options"))
        .merge(resource::<User>("/users"))
        .merge(resource::<Ba>("/bas"))
        .merge(resource::<BaProject>("/ba-projects"))
        .merge(resource::<Submission>("/submissions"))
}
