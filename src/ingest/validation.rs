use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::ItemError;
use crate::{
    db::models::{NewReading, SensorType},
    error::SyncError,
};

/// Wire shape of one snapshot. Every sensor field is optional; unknown keys
/// are ignored so newer firmware can report extra values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    hardware_id: Option<String>,
    temperature: Option<f64>,
    air_humidity: Option<f64>,
    soil_humidity: Option<f64>,
    light_level: Option<f64>,
    water_level: Option<f64>,
    ph: Option<f64>,
    drainage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub sensor_type: SensorType,
    pub value: f64,
    pub unit: &'static str,
}

/// A snapshot that passed validation; always carries at least one measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSnapshot {
    pub hardware_id: String,
    pub measurements: Vec<Measurement>,
}

impl ValidSnapshot {
    /// One reading per measurement, all stamped with the same ingestion time.
    pub fn expand<'a>(
        &'a self,
        device_id: &'a str,
        recorded_at: DateTime<Utc>,
    ) -> impl Iterator<Item = NewReading> + 'a {
        self.measurements.iter().map(move |m| NewReading {
            device_id: device_id.to_owned(),
            sensor_type: m.sensor_type,
            value: m.value,
            unit: m.unit,
            recorded_at,
        })
    }
}

/// Accept either a single snapshot object or an array of them.
pub fn split_batch(body: Value) -> Result<Vec<Value>, SyncError> {
    match body {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        other => Err(SyncError::Malformed(format!(
            "expected a snapshot object or an array of snapshots, got {}",
            json_kind(&other)
        ))),
    }
}

/// Validate one batch item in isolation.
pub fn validate_item(index: usize, item: Value) -> Result<ValidSnapshot, ItemError> {
    let declared_id = item
        .get("hardwareId")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty());

    let reject = |message: String| ItemError::validation(index, declared_id.clone(), message);

    if !item.is_object() {
        return Err(reject(format!("expected a snapshot object, got {}", json_kind(&item))));
    }

    let raw: RawSnapshot =
        serde_json::from_value(item).map_err(|e| reject(format!("invalid snapshot: {e}")))?;

    let hardware_id = raw
        .hardware_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| reject("hardwareId is required".to_owned()))?
        .to_owned();

    let measurements = collect_measurements(&raw).map_err(reject)?;
    if measurements.is_empty() {
        return Err(reject("snapshot carries no sensor values".to_owned()));
    }

    Ok(ValidSnapshot {
        hardware_id,
        measurements,
    })
}

fn collect_measurements(raw: &RawSnapshot) -> Result<Vec<Measurement>, String> {
    let mut out = Vec::new();

    if let Some(v) = raw.temperature {
        out.push(ranged("temperature", v, -40.0, 85.0, SensorType::Temperature, "°C")?);
    }
    if let Some(v) = raw.air_humidity {
        out.push(ranged("airHumidity", v, 0.0, 100.0, SensorType::AirHumidity, "%")?);
    }
    if let Some(v) = raw.soil_humidity {
        out.push(ranged("soilHumidity", v, 0.0, 100.0, SensorType::SoilHumidity, "%")?);
    }
    if let Some(v) = raw.light_level {
        out.push(ranged("lightLevel", v, 0.0, f64::MAX, SensorType::Light, "lux")?);
    }
    if let Some(v) = raw.water_level {
        let m = ranged("waterLevel", v, 0.0, 100.0, SensorType::WaterLevel, "%")?;
        out.push(Measurement {
            unit: water_level_unit(m.value),
            ..m
        });
    }
    if let Some(v) = raw.ph {
        out.push(ranged("ph", v, 0.0, 14.0, SensorType::Ph, "pH")?);
    }
    if let Some(v) = raw.drainage {
        if v != 0.0 && v != 1.0 {
            return Err(format!("drainage must be 0 or 1, got {v}"));
        }
        out.push(Measurement {
            sensor_type: SensorType::Drainage,
            value: v,
            unit: "state",
        });
    }

    Ok(out)
}

fn ranged(
    field: &str,
    value: f64,
    min: f64,
    max: f64,
    sensor_type: SensorType,
    unit: &'static str,
) -> Result<Measurement, String> {
    if !value.is_finite() || value < min || value > max {
        return Err(if max == f64::MAX {
            format!("{field} must be at least {min}, got {value}")
        } else {
            format!("{field} must be between {min} and {max}, got {value}")
        });
    }
    Ok(Measurement {
        sensor_type,
        value,
        unit,
    })
}

/// Float-switch firmware reports dry/wet as 0/1; probe firmware reports a
/// percentage.
pub fn water_level_unit(value: f64) -> &'static str {
    if value == 0.0 || value == 1.0 {
        "state"
    } else {
        "%"
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
