use sqlx::PgPool;
use tracing::{debug, info};

use super::payload::{pending_manual_reads, CommandPayload};
use crate::{db::settings, error::SyncError};

#[derive(Debug, Clone)]
pub struct CommandService {
    pool: PgPool,
}

impl CommandService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds the command payload for the device presenting `hardware_id` and
    /// consumes its pending manual read requests.
    ///
    /// The settings row is locked for the whole read-then-clear, so a flag an
    /// operator raises while this runs either lands before the lock (and is
    /// delivered now) or after the commit (and survives to the next poll).
    /// Any error rolls the transaction back and leaves the flags raised.
    pub async fn resolve(&self, hardware_id: &str) -> Result<CommandPayload, SyncError> {
        let hardware_id = hardware_id.trim();
        if hardware_id.is_empty() {
            return Err(SyncError::Validation(
                "hardware identifier must not be empty".to_owned(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let device = settings::find_device_by_hardware_id(&mut *tx, hardware_id)
            .await?
            .ok_or_else(|| SyncError::DeviceNotFound(hardware_id.to_owned()))?;

        let current = settings::lock_settings(&mut tx, &device.serial_number)
            .await?
            .ok_or_else(|| SyncError::MissingSettings {
                serial_number: device.serial_number.clone(),
            })?;

        let consumed = pending_manual_reads(&current);
        if !consumed.is_empty() {
            settings::clear_manual_reads(&mut tx, &device.serial_number, &consumed).await?;
        }

        tx.commit().await?;

        if consumed.is_empty() {
            debug!(hardware_id = %hardware_id, serial_number = %device.serial_number, "Commands resolved");
        } else {
            info!(
                hardware_id = %hardware_id,
                serial_number = %device.serial_number,
                requests = ?consumed,
                "Commands resolved; manual read requests consumed"
            );
        }

        Ok(CommandPayload::new(&current, consumed))
    }
}
