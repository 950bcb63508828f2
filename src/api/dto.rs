use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{db::models::SensorType, ingest::ItemError};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorReadingDto {
    pub id: Uuid,
    /// Serial number of the reporting device.
    pub device_id: String,
    pub sensor_type: SensorType,
    pub value: f64,
    /// `"°C"`, `"%"`, `"lux"`, `"pH"` or `"state"` (binary sensors).
    pub unit: String,
    /// Ingestion time.
    pub recorded_at: DateTime<Utc>,
}

impl From<crate::db::models::SensorReading> for SensorReadingDto {
    fn from(r: crate::db::models::SensorReading) -> Self {
        Self {
            id: r.id,
            device_id: r.device_id,
            sensor_type: r.sensor_type,
            value: r.value,
            unit: r.unit,
            recorded_at: r.recorded_at,
        }
    }
}

/// One device snapshot as posted to `POST /device/readings`.
/// The endpoint accepts either one of these or an array of them.
#[derive(Debug, ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub hardware_id: String,
    /// °C, -40 to 85.
    pub temperature: Option<f64>,
    /// %, 0 to 100.
    pub air_humidity: Option<f64>,
    /// %, 0 to 100.
    pub soil_humidity: Option<f64>,
    /// lux, 0 or more.
    pub light_level: Option<f64>,
    /// 0/1 (dry/wet) from float switches, otherwise a 0 to 100 percentage.
    pub water_level: Option<f64>,
    /// 0 to 14.
    pub ph: Option<f64>,
    /// 0/1.
    pub drainage: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Per-item failures, present when an ingestion call stored nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ItemError>>,
}

#[derive(Debug, Deserialize)]
pub struct TimeRangeParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
