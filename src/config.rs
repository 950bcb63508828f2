use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub db_max_connections: u32,
    /// A device that has not reported for this long is marked inactive.
    pub liveness_timeout_secs: u64,
    /// How often the liveness sweep runs.
    pub liveness_sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            db_max_connections: positive("DB_MAX_CONNECTIONS", &optional("DB_MAX_CONNECTIONS", "10"))?
                .try_into()
                .context("DB_MAX_CONNECTIONS is too large")?,
            liveness_timeout_secs: positive(
                "LIVENESS_TIMEOUT_SECS",
                &optional("LIVENESS_TIMEOUT_SECS", "3600"),
            )?,
            liveness_sweep_interval_secs: positive(
                "LIVENESS_SWEEP_INTERVAL_SECS",
                &optional("LIVENESS_SWEEP_INTERVAL_SECS", "300"),
            )?,
        })
    }
}

/// Parse a strictly positive integer, naming `key` in the error.
fn positive(key: &str, raw: &str) -> Result<u64> {
    let value: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer, got {raw:?}"))?;
    if value == 0 {
        bail!("{key} must be a positive integer, got 0");
    }
    Ok(value)
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
