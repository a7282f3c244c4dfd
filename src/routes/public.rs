use crate::{AppState, handlers::auth};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without credentials: the health check and the three login
/// gateways. Everything that reads tenant data lives behind the auth layer.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Used by the load balancer; answers "ok" without touching the database.
        .route("/health", get(|| async { "ok" }))
        // POST /login, /admin-login, /ba-login
        // Exchange a username/password for a bearer token of the matching principal kind.
        .route("/login", post(auth::login))
        .route("/admin-login", post(auth::admin_login))
        .route("/ba-login", post(auth::ba_login))
}
