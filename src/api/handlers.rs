use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use utoipa::OpenApi;

use super::{
    dto::{ErrorResponse, SensorReadingDto, SnapshotDto, TimeRangeParams},
    errors::AppError,
    AppState,
};
use crate::{
    commands::CommandPayload,
    db::{models::SensorType, telemetry},
    error::SyncError,
    ingest::{IngestReport, ItemError, ItemErrorKind},
};

// ---------------------------------------------------------------------------
// Device protocol
// ---------------------------------------------------------------------------

/// Poll for the current command set. Pending manual read requests are
/// returned once and cleared.
#[utoipa::path(
    get,
    path = "/device/{hardware_id}/commands",
    params(
        ("hardware_id" = String, Path, description = "Identifier reported by the physical unit"),
    ),
    responses(
        (status = 200, description = "Current commands", body = CommandPayload),
        (status = 404, description = "Unknown device or missing settings", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "device"
)]
pub async fn get_commands(
    State(state): State<AppState>,
    Path(hardware_id): Path<String>,
) -> Result<Json<CommandPayload>, AppError> {
    let payload = state.commands.resolve(&hardware_id).await?;
    Ok(Json(payload))
}

/// Push one snapshot or an array of snapshots. Valid items are stored even
/// when others in the batch are rejected.
#[utoipa::path(
    post,
    path = "/device/readings",
    request_body(content = Vec<SnapshotDto>, description = "A snapshot object or an array of them"),
    responses(
        (status = 201, description = "Readings stored", body = IngestReport),
        (status = 400, description = "Malformed body or no reading stored", body = ErrorResponse),
        (status = 500, description = "Transaction failed; nothing stored", body = ErrorResponse),
    ),
    tag = "device"
)]
pub async fn ingest_readings(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestReport>), AppError> {
    let Json(body) = body.map_err(|e| SyncError::Malformed(e.body_text()))?;
    let report = state.ingest.ingest(body).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

// ---------------------------------------------------------------------------
// Telemetry queries
// ---------------------------------------------------------------------------

/// Latest reading for each sensor type of one device.
#[utoipa::path(
    get,
    path = "/devices/{serial_number}/readings/latest",
    params(
        ("serial_number" = String, Path, description = "Device serial number"),
    ),
    responses(
        (status = 200, description = "Latest reading per sensor type", body = Vec<SensorReadingDto>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "telemetry"
)]
pub async fn get_latest_readings(
    State(state): State<AppState>,
    Path(serial_number): Path<String>,
) -> Result<Json<Vec<SensorReadingDto>>, AppError> {
    let rows = telemetry::latest_for_device(&state.pool, &serial_number).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Time series for one device and sensor type, oldest first. Optionally
/// bounded with `?from=<RFC3339>&to=<RFC3339>`.
#[utoipa::path(
    get,
    path = "/devices/{serial_number}/readings/{sensor_type}",
    params(
        ("serial_number" = String, Path, description = "Device serial number"),
        ("sensor_type" = SensorType, Path, description = "Sensor type"),
        ("from" = Option<DateTime<Utc>>, Query, description = "Start of time range (RFC3339)"),
        ("to"   = Option<DateTime<Utc>>, Query, description = "End of time range (RFC3339)"),
    ),
    responses(
        (status = 200, description = "Sensor readings", body = Vec<SensorReadingDto>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "telemetry"
)]
pub async fn get_sensor_readings(
    State(state): State<AppState>,
    Path((serial_number, sensor_type)): Path<(String, SensorType)>,
    Query(params): Query<TimeRangeParams>,
) -> Result<Json<Vec<SensorReadingDto>>, AppError> {
    let rows = telemetry::readings_in_range(
        &state.pool,
        &serial_number,
        sensor_type,
        params.from,
        params.to,
    )
    .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI document
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(get_commands, ingest_readings, get_latest_readings, get_sensor_readings, health),
    components(schemas(
        CommandPayload,
        SnapshotDto,
        IngestReport,
        ItemError,
        ItemErrorKind,
        ErrorResponse,
        SensorReadingDto,
        SensorType,
    )),
    tags(
        (name = "device",    description = "Endpoints polled and pushed to by greenhouse controllers"),
        (name = "telemetry", description = "Sensor reading queries"),
        (name = "system",    description = "System endpoints"),
    ),
    info(
        title = "Greenhouse Sync API",
        version = "0.1.0",
        description = "Command polling and telemetry ingestion for greenhouse controllers"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
