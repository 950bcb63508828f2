use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Mirrors the `sensor_type` Postgres enum.
///
/// The snake_case name doubles as the tag sent to devices in
/// `manualReadRequests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sensor_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Temperature,
    AirHumidity,
    SoilHumidity,
    Light,
    Ph,
    WaterLevel,
    Drainage,
}

impl SensorType {
    /// Column holding the one-shot manual read flag for this sensor, if the
    /// device supports on-demand reads of it.
    pub(crate) fn manual_read_column(self) -> Option<&'static str> {
        match self {
            SensorType::Temperature => Some("manual_read_temperature"),
            SensorType::AirHumidity => Some("manual_read_air_humidity"),
            SensorType::SoilHumidity => Some("manual_read_soil_humidity"),
            SensorType::Light => Some("manual_read_light"),
            SensorType::Ph | SensorType::WaterLevel | SensorType::Drainage => None,
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SensorType::Temperature => "temperature",
            SensorType::AirHumidity => "air_humidity",
            SensorType::SoilHumidity => "soil_humidity",
            SensorType::Light => "light",
            SensorType::Ph => "ph",
            SensorType::WaterLevel => "water_level",
            SensorType::Drainage => "drainage",
        };
        f.write_str(s)
    }
}

/// A controllable output on the greenhouse unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Light,
    Fan,
    Irrigation,
    UvLight,
}

impl Actuator {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Actuator::Light => "light_state",
            Actuator::Fan => "fan_state",
            Actuator::Irrigation => "irrigation_state",
            Actuator::UvLight => "uv_light_state",
        }
    }
}

/// Desired state of one actuator.
///
/// Stored as a nullable boolean; `Unset` means the actuator has never been
/// commanded and is sent to the device as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorCommand {
    #[default]
    Unset,
    On,
    Off,
}

impl From<Option<bool>> for ActuatorCommand {
    fn from(state: Option<bool>) -> Self {
        match state {
            None => ActuatorCommand::Unset,
            Some(true) => ActuatorCommand::On,
            Some(false) => ActuatorCommand::Off,
        }
    }
}

impl From<ActuatorCommand> for Option<bool> {
    fn from(cmd: ActuatorCommand) -> Self {
        match cmd {
            ActuatorCommand::Unset => None,
            ActuatorCommand::On => Some(true),
            ActuatorCommand::Off => Some(false),
        }
    }
}

impl Serialize for ActuatorCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActuatorCommand::Unset => serializer.serialize_none(),
            ActuatorCommand::On => serializer.serialize_str("ON"),
            ActuatorCommand::Off => serializer.serialize_str("OFF"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Device {
    pub serial_number: String,
    pub hardware_identifier: String,
    pub display_name: String,
    pub plant_type: Option<String>,
    pub location: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub warranty_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_powered_by_battery: bool,
    pub last_update_timestamp: Option<DateTime<Utc>>,
}

/// Input for registering a device together with its default settings.
#[derive(Debug, Clone, Default)]
pub struct NewDevice {
    pub serial_number: String,
    pub hardware_identifier: String,
    pub display_name: String,
    pub plant_type: Option<String>,
    pub location: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub warranty_expires_at: Option<DateTime<Utc>>,
    pub is_powered_by_battery: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct DeviceSettings {
    pub serial_number: String,

    pub measurement_interval_minutes: i32,
    pub auto_irrigation_enabled: bool,
    pub irrigation_threshold_percent: i32,
    pub auto_ventilation_enabled: bool,
    pub temperature_on_threshold_celsius: f64,
    pub temperature_off_threshold_celsius: f64,
    pub auto_roof_enabled: bool,
    pub roof_open_time: NaiveTime,
    pub roof_close_time: NaiveTime,
    pub capture_interval_minutes: i32,
    pub temperature_unit: String,

    pub light_state: Option<bool>,
    pub fan_state: Option<bool>,
    pub irrigation_state: Option<bool>,
    pub uv_light_state: Option<bool>,

    pub manual_read_temperature: bool,
    pub manual_read_air_humidity: bool,
    pub manual_read_soil_humidity: bool,
    pub manual_read_light: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: Uuid,
    /// Serial number of the reporting device.
    pub device_id: String,
    pub sensor_type: SensorType,
    pub value: f64,
    pub unit: String,
    /// Ingestion time, not the device clock.
    pub recorded_at: DateTime<Utc>,
}

/// A reading ready to be inserted; `id` is assigned by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub device_id: String,
    pub sensor_type: SensorType,
    pub value: f64,
    pub unit: &'static str,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actuator_command_from_nullable_bool() {
        assert_eq!(ActuatorCommand::from(None), ActuatorCommand::Unset);
        assert_eq!(ActuatorCommand::from(Some(true)), ActuatorCommand::On);
        assert_eq!(ActuatorCommand::from(Some(false)), ActuatorCommand::Off);
    }

    #[test]
    fn actuator_command_serializes_tri_state() {
        assert_eq!(serde_json::to_value(ActuatorCommand::Unset).unwrap(), serde_json::Value::Null);
        assert_eq!(serde_json::to_value(ActuatorCommand::On).unwrap(), "ON");
        assert_eq!(serde_json::to_value(ActuatorCommand::Off).unwrap(), "OFF");
    }

    #[test]
    fn actuator_command_back_to_column_value() {
        assert_eq!(Option::<bool>::from(ActuatorCommand::Unset), None);
        assert_eq!(Option::<bool>::from(ActuatorCommand::On), Some(true));
        assert_eq!(Option::<bool>::from(ActuatorCommand::Off), Some(false));
    }

    #[test]
    fn sensor_type_display_matches_serde_tag() {
        for t in [
            SensorType::Temperature,
            SensorType::AirHumidity,
            SensorType::SoilHumidity,
            SensorType::Light,
            SensorType::Ph,
            SensorType::WaterLevel,
            SensorType::Drainage,
        ] {
            assert_eq!(serde_json::to_value(t).unwrap(), t.to_string());
        }
    }

    #[test]
    fn only_four_sensor_types_have_manual_read_flags() {
        assert!(SensorType::Temperature.manual_read_column().is_some());
        assert!(SensorType::AirHumidity.manual_read_column().is_some());
        assert!(SensorType::SoilHumidity.manual_read_column().is_some());
        assert!(SensorType::Light.manual_read_column().is_some());
        assert!(SensorType::Ph.manual_read_column().is_none());
        assert!(SensorType::WaterLevel.manual_read_column().is_none());
        assert!(SensorType::Drainage.manual_read_column().is_none());
    }
}
