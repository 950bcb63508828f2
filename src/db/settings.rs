//! Device and per-device settings records.
//!
//! The protocol path only reads these rows, consumes manual read flags and
//! bumps liveness. Registration and the operator mutations live here too so
//! the registry and dashboard collaborators share one definition of the
//! schema.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool};

use super::models::{Actuator, ActuatorCommand, Device, DeviceSettings, NewDevice, SensorType};
use crate::error::SyncError;

pub async fn find_device_by_hardware_id<'e, E: PgExecutor<'e>>(
    executor: E,
    hardware_id: &str,
) -> Result<Option<Device>, sqlx::Error> {
    sqlx::query_as::<_, Device>(
        r#"
        SELECT serial_number, hardware_identifier, display_name, plant_type, location,
               activated_at, warranty_expires_at, is_active, is_powered_by_battery,
               last_update_timestamp
        FROM devices
        WHERE hardware_identifier = $1
        "#,
    )
    .bind(hardware_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_device_by_serial<'e, E: PgExecutor<'e>>(
    executor: E,
    serial_number: &str,
) -> Result<Option<Device>, sqlx::Error> {
    sqlx::query_as::<_, Device>(
        r#"
        SELECT serial_number, hardware_identifier, display_name, plant_type, location,
               activated_at, warranty_expires_at, is_active, is_powered_by_battery,
               last_update_timestamp
        FROM devices
        WHERE serial_number = $1
        "#,
    )
    .bind(serial_number)
    .fetch_optional(executor)
    .await
}

/// Map hardware identifiers to serial numbers in one round trip.
/// Unknown identifiers are simply absent from the result.
pub async fn resolve_hardware_ids<'e, E: PgExecutor<'e>>(
    executor: E,
    hardware_ids: &[String],
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT hardware_identifier, serial_number
        FROM devices
        WHERE hardware_identifier = ANY($1)
        "#,
    )
    .bind(hardware_ids)
    .fetch_all(executor)
    .await
}

pub async fn find_settings<'e, E: PgExecutor<'e>>(
    executor: E,
    serial_number: &str,
) -> Result<Option<DeviceSettings>, sqlx::Error> {
    sqlx::query_as::<_, DeviceSettings>("SELECT * FROM device_settings WHERE serial_number = $1")
        .bind(serial_number)
        .fetch_optional(executor)
        .await
}

/// Load the settings row and hold its row lock until the surrounding
/// transaction ends. Operator writes to the same row wait behind it.
pub async fn lock_settings(
    conn: &mut PgConnection,
    serial_number: &str,
) -> Result<Option<DeviceSettings>, sqlx::Error> {
    sqlx::query_as::<_, DeviceSettings>(
        "SELECT * FROM device_settings WHERE serial_number = $1 FOR UPDATE",
    )
    .bind(serial_number)
    .fetch_optional(conn)
    .await
}

/// Clear exactly the manual read flags listed in `consumed`; the others keep
/// whatever value they currently hold.
pub async fn clear_manual_reads(
    conn: &mut PgConnection,
    serial_number: &str,
    consumed: &[SensorType],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE device_settings
        SET manual_read_temperature   = manual_read_temperature   AND NOT $2,
            manual_read_air_humidity  = manual_read_air_humidity  AND NOT $3,
            manual_read_soil_humidity = manual_read_soil_humidity AND NOT $4,
            manual_read_light         = manual_read_light         AND NOT $5
        WHERE serial_number = $1
        "#,
    )
    .bind(serial_number)
    .bind(consumed.contains(&SensorType::Temperature))
    .bind(consumed.contains(&SensorType::AirHumidity))
    .bind(consumed.contains(&SensorType::SoilHumidity))
    .bind(consumed.contains(&SensorType::Light))
    .execute(conn)
    .await?;
    Ok(())
}

/// Set `is_active` and `last_update_timestamp` for every listed device.
pub async fn mark_devices_live(
    conn: &mut PgConnection,
    serial_numbers: &[String],
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE devices
        SET is_active = TRUE,
            last_update_timestamp = $1
        WHERE serial_number = ANY($2)
        "#,
    )
    .bind(at)
    .bind(serial_numbers)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Flip active devices that have not reported since `cutoff` to inactive.
pub async fn mark_stale_inactive<'e, E: PgExecutor<'e>>(
    executor: E,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE devices
        SET is_active = FALSE
        WHERE is_active
          AND (last_update_timestamp IS NULL OR last_update_timestamp < $1)
        "#,
    )
    .bind(cutoff)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Registry and dashboard writes
// ---------------------------------------------------------------------------

/// Insert a device and its default settings row in one transaction.
pub async fn register_device(pool: &PgPool, new: &NewDevice) -> Result<Device, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let device = sqlx::query_as::<_, Device>(
        r#"
        INSERT INTO devices (serial_number, hardware_identifier, display_name, plant_type,
                             location, activated_at, warranty_expires_at, is_powered_by_battery)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING serial_number, hardware_identifier, display_name, plant_type, location,
                  activated_at, warranty_expires_at, is_active, is_powered_by_battery,
                  last_update_timestamp
        "#,
    )
    .bind(&new.serial_number)
    .bind(&new.hardware_identifier)
    .bind(&new.display_name)
    .bind(&new.plant_type)
    .bind(&new.location)
    .bind(new.activated_at)
    .bind(new.warranty_expires_at)
    .bind(new.is_powered_by_battery)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO device_settings (serial_number) VALUES ($1)")
        .bind(&new.serial_number)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(device)
}

/// Delete a device; its settings and readings go with it.
pub async fn delete_device<'e, E: PgExecutor<'e>>(
    executor: E,
    serial_number: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM devices WHERE serial_number = $1")
        .bind(serial_number)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Last write wins. Returns `false` when the device has no settings row.
pub async fn set_desired_actuator<'e, E: PgExecutor<'e>>(
    executor: E,
    serial_number: &str,
    actuator: Actuator,
    command: ActuatorCommand,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE device_settings SET {} = $2 WHERE serial_number = $1",
        actuator.column()
    );
    let result = sqlx::query(&sql)
        .bind(serial_number)
        .bind(Option::<bool>::from(command))
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Raise the one-shot manual read flag for `sensor_type`.
pub async fn request_manual_read<'e, E: PgExecutor<'e>>(
    executor: E,
    serial_number: &str,
    sensor_type: SensorType,
) -> Result<bool, SyncError> {
    let column = sensor_type.manual_read_column().ok_or_else(|| {
        SyncError::Validation(format!("{sensor_type} does not support manual reads"))
    })?;
    let sql = format!("UPDATE device_settings SET {column} = TRUE WHERE serial_number = $1");
    let result = sqlx::query(&sql).bind(serial_number).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}
