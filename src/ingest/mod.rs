mod service;
pub mod validation;

use serde::Serialize;
use utoipa::ToSchema;

pub use service::IngestService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
    Validation,
    NotFound,
}

/// Why one item of an ingestion batch contributed no readings.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    /// Position of the item in the submitted batch (0 for a single object).
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_id: Option<String>,
    pub kind: ItemErrorKind,
    pub message: String,
}

impl ItemError {
    pub fn validation(index: usize, hardware_id: Option<String>, message: String) -> Self {
        Self {
            index,
            hardware_id,
            kind: ItemErrorKind::Validation,
            message,
        }
    }

    pub fn not_found(index: usize, hardware_id: String) -> Self {
        Self {
            message: format!("no device registered with hardware id {hardware_id:?}"),
            index,
            hardware_id: Some(hardware_id),
            kind: ItemErrorKind::NotFound,
        }
    }
}

/// Outcome of an ingestion call that stored at least one reading.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub stored_count: u64,
    /// Items that were skipped while the rest of the batch committed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ItemError>,
}
