//! Application configuration.
//!
//! Defaults live here as constants. At startup `.env` is loaded with
//! `dotenvy`, then `TABCLEAN_*` environment variables override the defaults,
//! and CLI flags override both.

use std::env;

use crate::transform::DEFAULT_PREVIEW_ROWS;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum upload size for the HTTP API (in bytes).
///
/// 50 MB limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub const ENV_PORT: &str = "TABCLEAN_PORT";
pub const ENV_PREVIEW_ROWS: &str = "TABCLEAN_PREVIEW_ROWS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "TABCLEAN_MAX_UPLOAD_BYTES";

/// Runtime settings shared by the CLI and the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub preview_rows: usize,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `TABCLEAN_*` environment variables.
    ///
    /// Unparseable values are reported and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            port: parse_var(&lookup, ENV_PORT).unwrap_or(defaults.port),
            preview_rows: parse_var(&lookup, ENV_PREVIEW_ROWS).unwrap_or(defaults.preview_rows),
            max_upload_bytes: parse_var(&lookup, ENV_MAX_UPLOAD_BYTES)
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("⚠️  Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}
