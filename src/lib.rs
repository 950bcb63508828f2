pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod liveness;
