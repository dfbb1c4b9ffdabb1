//! Process configuration, read once from the environment at boot.
//!
//! SECRET_KEY    — JWT signing key. Required unless DEBUG is set.
//! DEBUG         — "1"/"true"/"yes" relaxes CORS and allows the dev secret.
//! ALLOWED_HOSTS — comma-separated origins for CORS when not in debug.
//! DATABASE_URL  — path to the redb file (default "tasks.redb").
//! PORT          — listen port (default 8000).

use std::env;

/// Fallback signing key for local development. Rejected outside DEBUG.
const DEV_SECRET_KEY: &str = "dev-only-insecure-secret";

const DEFAULT_DATABASE_URL: &str = "tasks.redb";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct Settings {
    pub secret_key: String,
    pub debug: bool,
    pub allowed_hosts: Vec<String>,
    pub database_url: String,
    pub port: u16,
}

impl Settings {
    /// Read settings from the environment. Called once, before anything
    /// else touches the network or the database.
    pub fn from_env() -> Result<Settings, SettingsError> {
        let debug = env::var("DEBUG")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let secret_key = match env::var("SECRET_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ if debug => DEV_SECRET_KEY.to_string(),
            _ => return Err(SettingsError::MissingSecretKey),
        };

        let allowed_hosts = env::var("ALLOWED_HOSTS")
            .map(|v| parse_hosts(&v))
            .unwrap_or_default();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| SettingsError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Settings {
            secret_key,
            debug,
            allowed_hosts,
            database_url,
            port,
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_hosts(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    MissingSecretKey,
    InvalidPort(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::MissingSecretKey => {
                write!(f, "SECRET_KEY must be set when DEBUG is off")
            }
            SettingsError::InvalidPort(raw) => write!(f, "PORT is not a valid port: {raw:?}"),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
