use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod resources;
pub mod scope;
pub mod storage;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use error::ApiError;
use routes::{admin, authenticated, public};
use scope::Principal;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// The OpenAPI document served at `/api-docs/openapi.json`. The generic CRUD handlers
/// cannot be annotated, but every entity schema is registered so clients can still
/// generate types for them.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::admin_login, handlers::auth::ba_login,
        handlers::auth::get_profile,
        handlers::forms::get_project_form, handlers::forms::get_my_forms,
        handlers::forms::get_ba_rich_data, handlers::forms::submit_form,
        handlers::data::get_project_data, handlers::data::get_records,
        handlers::dashboard::get_dashboard_stats, handlers::dashboard::get_user_regions,
        handlers::dashboard::toggle_user_status, handlers::dashboard::toggle_ba_status,
        handlers::uploads::get_presigned_url,
    ),
    components(
        schemas(
            models::Agency, models::Project, models::FormSection, models::ProjectField,
            models::InputOption, models::User, models::Ba, models::BaProject, models::UAdmin,
            models::UAdminAgency, models::Submission, models::FieldValue,
            models::CreateAgencyRequest, models::UpdateAgencyRequest,
            models::CreateProjectRequest, models::UpdateProjectRequest,
            models::CreateFormSectionRequest, models::UpdateFormSectionRequest,
            models::CreateProjectFieldRequest, models::UpdateProjectFieldRequest,
            models::CreateInputOptionRequest, models::UpdateInputOptionRequest,
            models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateBaRequest, models::UpdateBaRequest,
            models::CreateBaProjectRequest, models::UpdateBaProjectRequest,
            models::CreateUAdminRequest, models::UpdateUAdminRequest,
            models::CreateUAdminAgencyRequest, models::UpdateUAdminAgencyRequest,
            models::SubmitFormRequest, models::SubmissionReceipt, models::WideRecord,
            models::LoginRequest, models::LoginResponse, models::Profile,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::DashboardStats, scope::PrincipalKind,
        )
    ),
    tags(
        (name = "baims", description = "Field data collection API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container holding the application services and configuration,
/// shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: scoped database access.
    pub repo: RepositoryState,
    /// Storage Layer: S3/MinIO presigned uploads.
    pub storage: StorageState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Resolves the `Principal` once per request (rejecting with 401 on failure) and stores
/// it in the request extensions, where the `Principal` extractor picks it up again
/// without a second database round trip.
async fn auth_middleware(principal: Principal, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(principal);
    next.run(request).await
}

/// admin_middleware
///
/// Guards `/admin`: authenticated platform admins only (403 for other principals).
async fn admin_middleware(
    principal: Principal,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !principal.is_platform_admin() {
        return Err(ApiError::Forbidden(
            "platform administrators only".to_string(),
        ));
    }
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles the routing structure, applies the guards and the observability stack, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_middleware,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, carrying the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span from the method, URI and `x-request-id`, so every log
/// line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
