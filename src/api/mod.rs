pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{commands::CommandService, ingest::IngestService};
use handlers::ApiDoc;

/// Shared handler state. Every field is a cheap clone over the same pool.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub commands: CommandService,
    pub ingest: IngestService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            commands: CommandService::new(pool.clone()),
            ingest: IngestService::new(pool.clone()),
            pool,
        }
    }
}

pub fn router(pool: PgPool) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/device/{hardware_id}/commands", get(handlers::get_commands))
        .route("/device/readings", post(handlers::ingest_readings))
        .route(
            "/devices/{serial_number}/readings/latest",
            get(handlers::get_latest_readings),
        )
        .route(
            "/devices/{serial_number}/readings/{sensor_type}",
            get(handlers::get_sensor_readings),
        )
        .with_state(AppState::new(pool))
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
