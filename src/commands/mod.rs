mod payload;
mod service;

pub use payload::{pending_manual_reads, CommandPayload};
pub use service::CommandService;
