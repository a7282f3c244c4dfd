use crate::{
    AppState,
    models::{UAdmin, UAdminAgency},
    routes::authenticated::resource,
};
use axum::Router;

/// Admin Router Module
///
/// Management of platform administrators and their agency links, nested under `/admin`.
///
/// Access Control:
/// The router is wrapped in a middleware that resolves the principal and admits
/// platform admins only. The scope rules narrow further: a scoped admin sees only
/// itself and its own links, and only superusers can write here.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .merge(resource::<UAdmin>("/u-admins"))
        .merge(resource::<UAdminAgency>("/u-admin-agencies"))
}
