//! Append-only sensor reading log. Rows are inserted and queried here, never
//! updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use super::models::{NewReading, SensorReading, SensorType};

/// Insert every reading on `conn`. Callers pass a transaction so the batch
/// lands as a whole or not at all.
pub async fn insert_readings(
    conn: &mut PgConnection,
    readings: &[NewReading],
) -> Result<u64, sqlx::Error> {
    let mut stored = 0;
    for r in readings {
        let result = sqlx::query(
            r#"
            INSERT INTO sensor_readings (device_id, sensor_type, value, unit, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&r.device_id)
        .bind(r.sensor_type)
        .bind(r.value)
        .bind(r.unit)
        .bind(r.recorded_at)
        .execute(&mut *conn)
        .await?;
        stored += result.rows_affected();
    }
    Ok(stored)
}

/// Latest reading per sensor type for one device.
pub async fn latest_for_device<'e, E: PgExecutor<'e>>(
    executor: E,
    device_id: &str,
) -> Result<Vec<SensorReading>, sqlx::Error> {
    sqlx::query_as::<_, SensorReading>(
        r#"
        SELECT DISTINCT ON (sensor_type)
            id, device_id, sensor_type, value, unit, recorded_at
        FROM sensor_readings
        WHERE device_id = $1
        ORDER BY sensor_type, recorded_at DESC
        "#,
    )
    .bind(device_id)
    .fetch_all(executor)
    .await
}

/// Readings of one type for a device, oldest first, optionally bounded by an
/// inclusive time range.
pub async fn readings_in_range<'e, E: PgExecutor<'e>>(
    executor: E,
    device_id: &str,
    sensor_type: SensorType,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<SensorReading>, sqlx::Error> {
    sqlx::query_as::<_, SensorReading>(
        r#"
        SELECT id, device_id, sensor_type, value, unit, recorded_at
        FROM sensor_readings
        WHERE device_id   = $1
          AND sensor_type = $2
          AND ($3::timestamptz IS NULL OR recorded_at >= $3)
          AND ($4::timestamptz IS NULL OR recorded_at <= $4)
        ORDER BY recorded_at ASC
        "#,
    )
    .bind(device_id)
    .bind(sensor_type)
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sqlx::PgPool;

    use super::*;
    use crate::db::{models::NewDevice, settings::register_device};

    async fn seed_device(pool: &PgPool, serial: &str) {
        register_device(
            pool,
            &NewDevice {
                serial_number: serial.to_owned(),
                hardware_identifier: format!("hw-{serial}"),
                display_name: serial.to_owned(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    fn reading(device: &str, sensor_type: SensorType, value: f64, at: DateTime<Utc>) -> NewReading {
        NewReading {
            device_id: device.to_owned(),
            sensor_type,
            value,
            unit: "%",
            recorded_at: at,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn latest_is_one_row_per_sensor_type(pool: PgPool) {
        seed_device(&pool, "SN-1").await;
        let t0 = Utc::now() - Duration::minutes(10);
        let t1 = Utc::now();

        let mut tx = pool.begin().await.unwrap();
        let stored = insert_readings(
            &mut tx,
            &[
                reading("SN-1", SensorType::SoilHumidity, 40.0, t0),
                reading("SN-1", SensorType::SoilHumidity, 45.0, t1),
                reading("SN-1", SensorType::AirHumidity, 60.0, t0),
            ],
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(stored, 3);

        let latest = latest_for_device(&pool, "SN-1").await.unwrap();
        assert_eq!(latest.len(), 2);
        let soil = latest
            .iter()
            .find(|r| r.sensor_type == SensorType::SoilHumidity)
            .unwrap();
        assert_eq!(soil.value, 45.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn range_query_is_ascending_and_bounded(pool: PgPool) {
        seed_device(&pool, "SN-1").await;
        let base = Utc::now() - Duration::hours(3);

        let mut tx = pool.begin().await.unwrap();
        insert_readings(
            &mut tx,
            &[
                reading("SN-1", SensorType::Light, 3.0, base + Duration::hours(2)),
                reading("SN-1", SensorType::Light, 1.0, base),
                reading("SN-1", SensorType::Light, 2.0, base + Duration::hours(1)),
                reading("SN-1", SensorType::Ph, 6.5, base),
            ],
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let all = readings_in_range(&pool, "SN-1", SensorType::Light, None, None)
            .await
            .unwrap();
        let values: Vec<f64> = all.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);

        let bounded = readings_in_range(
            &pool,
            "SN-1",
            SensorType::Light,
            Some(base + Duration::minutes(30)),
            Some(base + Duration::hours(1)),
        )
        .await
        .unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].value, 2.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn rolled_back_insert_leaves_nothing(pool: PgPool) {
        seed_device(&pool, "SN-1").await;

        let mut tx = pool.begin().await.unwrap();
        insert_readings(&mut tx, &[reading("SN-1", SensorType::Light, 1.0, Utc::now())])
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(latest_for_device(&pool, "SN-1").await.unwrap().is_empty());
    }
}
