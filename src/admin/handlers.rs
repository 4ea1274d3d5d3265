use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::failover::{EndpointConfig, EndpointHealth, FailoverError};
use crate::game::{Season, SeasonError, SeasonResetReport};

/// Errors surfaced by admin handlers.
#[derive(Debug)]
pub enum AdminError {
    UnknownEndpoint(String),
    NoActiveEndpoint,
    NoActiveSeason,
    Internal(String),
}

impl From<FailoverError> for AdminError {
    fn from(e: FailoverError) -> Self {
        match e {
            FailoverError::UnknownEndpoint(name) => AdminError::UnknownEndpoint(name),
            other => AdminError::Internal(other.to_string()),
        }
    }
}

impl From<SeasonError> for AdminError {
    fn from(e: SeasonError) -> Self {
        match e {
            SeasonError::NoActiveSeason => AdminError::NoActiveSeason,
            other => AdminError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminError::UnknownEndpoint(name) => (StatusCode::NOT_FOUND, format!("unknown endpoint: {}", name)),
            AdminError::NoActiveEndpoint => (StatusCode::SERVICE_UNAVAILABLE, "no endpoint configured".to_string()),
            AdminError::NoActiveSeason => (StatusCode::NOT_FOUND, "no season is active".to_string()),
            AdminError::Internal(message) => {
                tracing::error!(error = %message, "Admin request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    /// "operational", "degraded" or "down".
    pub status: String,
    pub active_endpoint: Option<String>,
    pub healthy_endpoints: usize,
    pub total_endpoints: usize,
    pub periodic_checks: bool,
    pub last_rotation_ms: Option<u64>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let failover = &state.ctx.failover;
    let snapshot = failover.health_status();
    let healthy = snapshot.iter().filter(|e| e.record.healthy).count();

    let status = if healthy == snapshot.len() && healthy > 0 {
        "operational"
    } else if healthy > 0 {
        "degraded"
    } else {
        "down"
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: status.to_string(),
        active_endpoint: failover.active_endpoint().map(|e| e.name),
        healthy_endpoints: healthy,
        total_endpoints: snapshot.len(),
        periodic_checks: failover.periodic_checks_running(),
        last_rotation_ms: failover.last_rotation(),
    })
}

pub async fn get_endpoints(State(state): State<AdminState>) -> Json<Vec<EndpointHealth>> {
    Json(state.ctx.failover.health_status())
}

pub async fn get_active_endpoint(State(state): State<AdminState>) -> Result<Json<EndpointConfig>, AdminError> {
    state
        .ctx
        .failover
        .active_endpoint()
        .map(Json)
        .ok_or(AdminError::NoActiveEndpoint)
}

pub async fn reset_endpoint(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AdminError> {
    state.ctx.failover.reset_endpoint(&name)?;
    tracing::info!(endpoint = %name, "Endpoint reset via admin API");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn report_failure(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AdminError> {
    state.ctx.failover.report_failure(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn run_health_checks(State(state): State<AdminState>) -> Json<Vec<EndpointHealth>> {
    Json(state.ctx.failover.run_health_checks().await)
}

pub async fn get_current_season(State(state): State<AdminState>) -> Result<Json<Season>, AdminError> {
    state
        .ctx
        .seasons
        .current_season()?
        .map(Json)
        .ok_or(AdminError::NoActiveSeason)
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetSeasonRequest {
    /// Name of the season to open. Defaults to "Season N".
    pub name: Option<String>,
}

pub async fn reset_season(
    State(state): State<AdminState>,
    Json(request): Json<ResetSeasonRequest>,
) -> Result<Json<SeasonResetReport>, AdminError> {
    let seasons = &state.ctx.seasons;
    let name = match request.name {
        Some(name) => name,
        None => {
            let current = seasons.current_season()?.ok_or(AdminError::NoActiveSeason)?;
            format!("Season {}", current.id + 1)
        }
    };
    Ok(Json(seasons.reset_season(&name, Utc::now())?))
}

#[cfg(test)]
mod tests {
    use crate::admin::setup_admin_router;
    use crate::config::{EndpointSpec, KickoffConfig};
    use crate::context::AppContext;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    const KEY: &str = "test-admin-key";

    fn router() -> (Router, Arc<AppContext>) {
        let mut config = KickoffConfig::default();
        config.admin.api_key = KEY.to_string();
        for (name, priority) in [("primary", 2), ("backup", 1)] {
            config.endpoints.push(EndpointSpec {
                name: name.to_string(),
                url: "http://127.0.0.1:1".to_string(),
                priority,
                timeout_ms: Some(200),
                max_retries: None,
            });
        }
        let ctx = Arc::new(AppContext::build(config).unwrap());
        (setup_admin_router(ctx.clone()), ctx)
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", KEY))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let (app, _) = router();
        let response = app
            .clone()
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::get("/admin/status")
                    .header("Authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_and_active() {
        let (app, _) = router();
        let response = app.clone().oneshot(request("GET", "/admin/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["active_endpoint"], "primary");
        assert_eq!(body["total_endpoints"], 2);
        assert_eq!(body["status"], "operational");

        let response = app.oneshot(request("GET", "/admin/endpoints/active")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["name"], "primary");
    }

    #[tokio::test]
    async fn test_failure_reports_rotate_and_reset_restores() {
        let (app, ctx) = router();
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(request("POST", "/admin/endpoints/primary/failure"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }
        assert_eq!(ctx.failover.active_endpoint().unwrap().name, "backup");

        let response = app
            .clone()
            .oneshot(request("POST", "/admin/endpoints/primary/reset"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(request("GET", "/admin/endpoints")).await.unwrap();
        let body = json_body(response).await;
        let primary = body
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["name"] == "primary")
            .unwrap();
        assert_eq!(primary["healthy"], true);
        assert_eq!(primary["failure_count"], 0);
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_404() {
        let (app, _) = router();
        let response = app
            .clone()
            .oneshot(request("POST", "/admin/endpoints/nope/reset"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(request("POST", "/admin/endpoints/nope/failure"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_check_sweep_marks_failures() {
        let (app, _) = router();
        let response = app.oneshot(request("POST", "/admin/health-checks")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        for endpoint in body.as_array().unwrap() {
            assert_eq!(endpoint["failure_count"], 1);
        }
    }

    #[tokio::test]
    async fn test_season_routes() {
        let (app, ctx) = router();
        let response = app
            .clone()
            .oneshot(request("GET", "/admin/seasons/current"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        ctx.seasons.start_first_season("Kickoff", chrono::Utc::now()).unwrap();

        let reset = Request::builder()
            .method("POST")
            .uri("/admin/seasons/reset")
            .header("Authorization", format!("Bearer {}", KEY))
            .header("Content-Type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.clone().oneshot(reset).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["started"]["name"], "Season 2");

        let response = app.oneshot(request("GET", "/admin/seasons/current")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["id"], 2);
    }
}
