use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::{Json, response::IntoResponse};
use lreg_derive::{api_handler, api_model};
use lreg_domain::constants::{APP_NAME, SYSTEM_TAG};
use std::sync::LazyLock;
use std::time::Instant;

use super::ApiState;

#[api_model]
/// Health check response
struct HealthResponse {
    /// `up`, or `degraded` when the database does not answer
    status: &'static str,
    /// `up` or `down`
    database: &'static str,
    /// Version
    version: &'static str,
    /// Uptime in seconds
    uptime: u64,
}

#[api_model]
/// Service identification
pub(super) struct AppInfo {
    app_name: &'static str,
}

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

#[api_handler(
    get,
    path = "/health",
    responses(
        (status = OK, description = "Service and database are up", body = HealthResponse),
        (status = SERVICE_UNAVAILABLE, description = "Database unreachable", body = HealthResponse),
    ),
    tag = SYSTEM_TAG,
)]
pub(super) async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let database_up = state.database().health().await.is_ok();
    let body = HealthResponse {
        status: if database_up { "up" } else { "degraded" },
        database: if database_up { "up" } else { "down" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: START_TIME.elapsed().as_secs(),
    };
    let status = if database_up { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
}

#[api_handler(
    get,
    path = "/",
    responses((status = OK, description = "Application name", body = AppInfo)),
    tag = SYSTEM_TAG,
)]
pub(super) async fn app_info_handler() -> Json<AppInfo> {
    Json(AppInfo { app_name: APP_NAME })
}
