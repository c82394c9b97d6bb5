// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-driven configuration with sensible defaults

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP listen port (`PORT`)
    pub port: u16,
    /// Log filter (`LOG_LEVEL`): debug, info, warn, error
    pub log_level: String,
    /// Journal file path (`AOF_FILENAME`)
    pub aof_path: PathBuf,
    /// Record count below which a snapshot is a no-op
    /// (`SNAPSHOT_THRESHOLD`)
    pub snapshot_threshold: usize,
    /// How often the background snapshot runs
    /// (`SNAPSHOT_INTERVAL_SECS`)
    pub snapshot_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            log_level: "info".to_string(),
            aof_path: PathBuf::from("database.aof"),
            snapshot_threshold: crate::aof::DEFAULT_SNAPSHOT_THRESHOLD,
            snapshot_interval: Duration::from_secs(6 * 60 * 60),
        }
    }
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup. Unset
    /// variables take their defaults; unparseable numeric values fall back
    /// with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        Self {
            port: parse_var(&lookup, "PORT", defaults.port),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            aof_path: lookup("AOF_FILENAME")
                .map(PathBuf::from)
                .unwrap_or(defaults.aof_path),
            snapshot_threshold: parse_var(
                &lookup,
                "SNAPSHOT_THRESHOLD",
                defaults.snapshot_threshold,
            ),
            snapshot_interval: Duration::from_secs(parse_var(
                &lookup,
                "SNAPSHOT_INTERVAL_SECS",
                defaults.snapshot_interval.as_secs(),
            )),
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    fallback: T,
) -> T {
    match lookup(key) {
        Some(raw) => match raw.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key, raw = %raw, "unparseable value, using default");
                fallback
            }
        },
        None => fallback,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
