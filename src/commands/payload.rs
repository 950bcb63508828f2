use chrono::NaiveTime;
use serde::{Serialize, Serializer};
use utoipa::ToSchema;

use crate::db::models::{ActuatorCommand, DeviceSettings, SensorType};

/// What a device receives when it polls for commands.
///
/// Continuous configuration passes through unchanged. Desired actuator
/// states become `"ON"`, `"OFF"` or `null`. `manualReadRequests` is left out
/// entirely when nothing is pending; minimal firmware does not expect an
/// empty list.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommandPayload {
    pub measurement_interval_minutes: i32,
    pub auto_irrigation_enabled: bool,
    pub irrigation_threshold_percent: i32,
    pub auto_ventilation_enabled: bool,
    pub temperature_on_threshold_celsius: f64,
    pub temperature_off_threshold_celsius: f64,
    pub auto_roof_enabled: bool,
    /// `"HH:MM"`.
    #[serde(serialize_with = "hh_mm")]
    #[schema(value_type = String, example = "08:00")]
    pub roof_open_time: NaiveTime,
    /// `"HH:MM"`.
    #[serde(serialize_with = "hh_mm")]
    #[schema(value_type = String, example = "20:00")]
    pub roof_close_time: NaiveTime,
    pub capture_interval_minutes: i32,
    pub temperature_unit: String,

    #[schema(value_type = Option<String>, example = "ON")]
    pub light_command: ActuatorCommand,
    #[schema(value_type = Option<String>, example = "OFF")]
    pub fan_command: ActuatorCommand,
    #[schema(value_type = Option<String>)]
    pub irrigation_command: ActuatorCommand,
    #[schema(value_type = Option<String>)]
    pub uv_light_command: ActuatorCommand,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manual_read_requests: Vec<SensorType>,
}

impl CommandPayload {
    pub fn new(settings: &DeviceSettings, manual_read_requests: Vec<SensorType>) -> Self {
        Self {
            measurement_interval_minutes: settings.measurement_interval_minutes,
            auto_irrigation_enabled: settings.auto_irrigation_enabled,
            irrigation_threshold_percent: settings.irrigation_threshold_percent,
            auto_ventilation_enabled: settings.auto_ventilation_enabled,
            temperature_on_threshold_celsius: settings.temperature_on_threshold_celsius,
            temperature_off_threshold_celsius: settings.temperature_off_threshold_celsius,
            auto_roof_enabled: settings.auto_roof_enabled,
            roof_open_time: settings.roof_open_time,
            roof_close_time: settings.roof_close_time,
            capture_interval_minutes: settings.capture_interval_minutes,
            temperature_unit: settings.temperature_unit.clone(),
            light_command: settings.light_state.into(),
            fan_command: settings.fan_state.into(),
            irrigation_command: settings.irrigation_state.into(),
            uv_light_command: settings.uv_light_state.into(),
            manual_read_requests,
        }
    }
}

/// Manual read flags that are currently raised, in a fixed order.
pub fn pending_manual_reads(settings: &DeviceSettings) -> Vec<SensorType> {
    [
        (settings.manual_read_temperature, SensorType::Temperature),
        (settings.manual_read_air_humidity, SensorType::AirHumidity),
        (settings.manual_read_soil_humidity, SensorType::SoilHumidity),
        (settings.manual_read_light, SensorType::Light),
    ]
    .into_iter()
    .filter_map(|(raised, sensor)| raised.then_some(sensor))
    .collect()
}

fn hh_mm<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format("%H:%M"))
}
