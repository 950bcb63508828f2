use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{error, info, warn};

use super::{
    validation::{split_batch, validate_item, ValidSnapshot},
    IngestReport, ItemError,
};
use crate::{
    db::{models::NewReading, settings, telemetry},
    error::SyncError,
};

#[derive(Debug, Clone)]
pub struct IngestService {
    pool: PgPool,
}

impl IngestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Validates every snapshot in `body` independently, expands the valid
    /// ones into readings and commits them in a single transaction together
    /// with the liveness update of every contributing device.
    ///
    /// Items that fail validation or name an unknown device are reported in
    /// the result and never reach the write. When no reading survives the
    /// whole call fails with [`SyncError::NothingStored`]. A storage failure
    /// rolls back the entire batch.
    pub async fn ingest(&self, body: Value) -> Result<IngestReport, SyncError> {
        let items = split_batch(body)?;

        let mut errors = Vec::new();
        let mut accepted: Vec<(usize, ValidSnapshot)> = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            match validate_item(index, item) {
                Ok(snapshot) => accepted.push((index, snapshot)),
                Err(e) => errors.push(e),
            }
        }

        let hardware_ids: Vec<String> = accepted
            .iter()
            .map(|(_, s)| s.hardware_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let known: HashMap<String, String> = if hardware_ids.is_empty() {
            HashMap::new()
        } else {
            settings::resolve_hardware_ids(&self.pool, &hardware_ids)
                .await?
                .into_iter()
                .collect()
        };

        let recorded_at = Utc::now();
        let mut readings: Vec<NewReading> = Vec::new();
        let mut devices = BTreeSet::new();
        for (index, snapshot) in accepted {
            match known.get(&snapshot.hardware_id) {
                Some(serial_number) => {
                    readings.extend(snapshot.expand(serial_number, recorded_at));
                    devices.insert(serial_number.clone());
                }
                None => errors.push(ItemError::not_found(index, snapshot.hardware_id)),
            }
        }
        errors.sort_by_key(|e| e.index);

        for e in &errors {
            warn!(
                index = e.index,
                hardware_id = ?e.hardware_id,
                kind = ?e.kind,
                reason = %e.message,
                "Snapshot rejected"
            );
        }

        if readings.is_empty() {
            return Err(SyncError::NothingStored { errors });
        }

        let devices: Vec<String> = devices.into_iter().collect();
        let stored = self
            .commit(&readings, &devices, recorded_at)
            .await
            .inspect_err(|e| error!(error = %e, readings = readings.len(), "Ingestion transaction failed"))?;

        info!(
            stored,
            devices = devices.len(),
            rejected = errors.len(),
            "Sensor readings committed"
        );

        Ok(IngestReport {
            stored_count: stored,
            errors,
        })
    }

    async fn commit(
        &self,
        readings: &[NewReading],
        devices: &[String],
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let stored = telemetry::insert_readings(&mut tx, readings).await?;
        settings::mark_devices_live(&mut tx, devices, at).await?;
        tx.commit().await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        db::models::{NewDevice, SensorType},
        ingest::ItemErrorKind,
    };

    async fn seed(pool: &PgPool, serial: &str, hardware_id: &str) {
        settings::register_device(
            pool,
            &NewDevice {
                serial_number: serial.to_owned(),
                hardware_identifier: hardware_id.to_owned(),
                display_name: serial.to_owned(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    async fn reading_count(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sensor_readings")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn single_snapshot_expands_to_one_row_per_field(pool: PgPool) {
        seed(&pool, "SN-A", "hw-a").await;
        let service = IngestService::new(pool.clone());

        let report = service
            .ingest(json!({"hardwareId": "hw-a", "temperature": 22.5, "airHumidity": 61, "ph": 6.4}))
            .await
            .unwrap();
        assert_eq!(report.stored_count, 3);
        assert!(report.errors.is_empty());

        let distinct: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT recorded_at) FROM sensor_readings")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(distinct, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn bad_middle_item_does_not_block_the_rest(pool: PgPool) {
        seed(&pool, "SN-A", "hw-a").await;
        let service = IngestService::new(pool.clone());

        let report = service
            .ingest(json!([
                {"hardwareId": "hw-a", "temperature": 20},
                {"hardwareId": "hw-a", "soilHumidity": 140},
                {"hardwareId": "hw-a", "soilHumidity": 35},
            ]))
            .await
            .unwrap();

        assert_eq!(report.stored_count, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, 1);
        assert_eq!(report.errors[0].kind, ItemErrorKind::Validation);
        assert_eq!(reading_count(&pool).await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_device_is_reported_not_fatal(pool: PgPool) {
        seed(&pool, "SN-A", "hw-a").await;
        let service = IngestService::new(pool.clone());

        let report = service
            .ingest(json!([
                {"hardwareId": "hw-ghost", "temperature": 20},
                {"hardwareId": "hw-a", "temperature": 21},
            ]))
            .await
            .unwrap();

        assert_eq!(report.stored_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ItemErrorKind::NotFound);
        assert_eq!(report.errors[0].hardware_id.as_deref(), Some("hw-ghost"));

        let ghost_rows: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sensor_readings WHERE device_id <> 'SN-A'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(ghost_rows, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn nothing_stored_fails_with_all_item_errors(pool: PgPool) {
        seed(&pool, "SN-A", "hw-a").await;
        let service = IngestService::new(pool.clone());

        let err = service
            .ingest(json!([
                {"hardwareId": "hw-ghost", "temperature": 20},
                {"hardwareId": "hw-a", "ph": 15},
            ]))
            .await
            .unwrap_err();

        match err {
            SyncError::NothingStored { errors } => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].kind, ItemErrorKind::NotFound);
                assert_eq!(errors[1].kind, ItemErrorKind::Validation);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(reading_count(&pool).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn empty_batch_stores_nothing(pool: PgPool) {
        let err = IngestService::new(pool).ingest(json!([])).await.unwrap_err();
        assert!(matches!(err, SyncError::NothingStored { errors } if errors.is_empty()));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn malformed_body_fails_before_processing(pool: PgPool) {
        let err = IngestService::new(pool).ingest(json!("readings")).await.unwrap_err();
        assert!(matches!(err, SyncError::Malformed(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn liveness_touches_only_contributing_devices(pool: PgPool) {
        seed(&pool, "SN-A", "hw-a").await;
        seed(&pool, "SN-B", "hw-b").await;
        seed(&pool, "SN-C", "hw-c").await;

        IngestService::new(pool.clone())
            .ingest(json!([
                {"hardwareId": "hw-a", "temperature": 20},
                {"hardwareId": "hw-b", "lightLevel": 300},
                {"hardwareId": "hw-c", "soilHumidity": 101},
            ]))
            .await
            .unwrap();

        for serial in ["SN-A", "SN-B"] {
            let d = settings::find_device_by_serial(&pool, serial).await.unwrap().unwrap();
            assert!(d.is_active, "{serial} should be active");
            assert!(d.last_update_timestamp.is_some());
        }
        let c = settings::find_device_by_serial(&pool, "SN-C").await.unwrap().unwrap();
        assert!(!c.is_active);
        assert!(c.last_update_timestamp.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn storage_failure_rolls_back_whole_batch(pool: PgPool) {
        seed(&pool, "SN-A", "hw-a").await;
        seed(&pool, "SN-B", "hw-b").await;
        sqlx::query("ALTER TABLE sensor_readings ADD CONSTRAINT reject_ph CHECK (sensor_type <> 'ph')")
            .execute(&pool)
            .await
            .unwrap();

        let err = IngestService::new(pool.clone())
            .ingest(json!([
                {"hardwareId": "hw-a", "temperature": 20, "airHumidity": 50},
                {"hardwareId": "hw-b", "ph": 6.5},
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Storage(_)));
        assert_eq!(reading_count(&pool).await, 0);
        let a = settings::find_device_by_serial(&pool, "SN-A").await.unwrap().unwrap();
        assert!(!a.is_active);
        assert!(a.last_update_timestamp.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn water_level_units_are_stored(pool: PgPool) {
        seed(&pool, "SN-A", "hw-a").await;
        IngestService::new(pool.clone())
            .ingest(json!([
                {"hardwareId": "hw-a", "waterLevel": 1},
                {"hardwareId": "hw-a", "waterLevel": 42},
            ]))
            .await
            .unwrap();

        let rows: Vec<(f64, String)> = sqlx::query_as(
            "SELECT value, unit FROM sensor_readings WHERE sensor_type = $1 ORDER BY value",
        )
        .bind(SensorType::WaterLevel)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(rows, vec![(1.0, "state".to_owned()), (42.0, "%".to_owned())]);
    }
}
