// history-academy/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_DB_PATH: &str = "data/history_academy.db";

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            pool_size: 8,
            busy_timeout_ms: 5000,
            in_memory: false,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("HISTORY_ACADEMY_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let pool_size = match lookup("HISTORY_ACADEMY_POOL_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("HISTORY_ACADEMY_POOL_SIZE must be a positive integer, got '{}'", raw))?,
            None => defaults.pool_size,
        };
        if pool_size == 0 {
            anyhow::bail!("HISTORY_ACADEMY_POOL_SIZE must be at least 1");
        }

        let busy_timeout_ms = match lookup("HISTORY_ACADEMY_BUSY_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("HISTORY_ACADEMY_BUSY_TIMEOUT_MS must be milliseconds, got '{}'", raw))?,
            None => defaults.busy_timeout_ms,
        };

        let in_memory = match lookup("HISTORY_ACADEMY_IN_MEMORY") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("HISTORY_ACADEMY_IN_MEMORY must be true or false, got '{}'", raw))?,
            None => defaults.in_memory,
        };

        Ok(Self {
            db_path,
            pool_size,
            busy_timeout_ms,
            in_memory,
        })
    }

    pub fn print_config(&self) {
        info!("Store configuration:");
        if self.in_memory {
            info!("  Database: in-memory");
        } else {
            info!("  Database: {}", self.db_path.display());
        }
        info!("  Pool size: {}", self.pool_size);
        info!("  Busy timeout: {}ms", self.busy_timeout_ms);
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow::anyhow!("unrecognised flag '{}'", other)),
    }
}
