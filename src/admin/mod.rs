//! Admin HTTP API.
//!
//! # Routes
//! ```text
//! GET  /admin/status                     daemon summary
//! GET  /admin/endpoints                  health snapshot
//! GET  /admin/endpoints/active           active endpoint (503 if none)
//! POST /admin/endpoints/{name}/reset     clear failures (204 / 404)
//! POST /admin/endpoints/{name}/failure   report a failure (204 / 404)
//! POST /admin/health-checks              run a sweep now
//! GET  /admin/seasons/current            active season (404 if none)
//! POST /admin/seasons/reset              end the season, open the next
//! ```
//! Every route requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::context::AppContext;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub ctx: Arc<AppContext>,
}

pub fn setup_admin_router(ctx: Arc<AppContext>) -> Router {
    let state = AdminState { ctx };
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/endpoints", get(get_endpoints))
        .route("/admin/endpoints/active", get(get_active_endpoint))
        .route("/admin/endpoints/{name}/reset", post(reset_endpoint))
        .route("/admin/endpoints/{name}/failure", post(report_failure))
        .route("/admin/health-checks", post(run_health_checks))
        .route("/admin/seasons/current", get(get_current_season))
        .route("/admin/seasons/reset", post(reset_season))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
