//! Configuration loaded from `evsync.toml`.
//!
//! Values absent from the file use sensible defaults. Environment variables
//! take precedence over the file for secrets and store identifiers, so a
//! `.env` (loaded at startup) or the ambient environment is enough to run
//! without any config file at all.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use crate::calendar::DEFAULT_EVENT_TIME;
use crate::engine::DEFAULT_MAX_LOOPS;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EvsyncConfig {
    /// API key for the extraction model. Env: `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub anthropic_api_key: String,

    /// Bearer token for the Google APIs. Env: `GOOGLE_ACCESS_TOKEN`.
    #[serde(default)]
    pub google_access_token: String,

    /// Spreadsheet identifier. Env: `GOOGLE_SHEET_ID`.
    #[serde(default)]
    pub sheet_id: String,

    /// Worksheet name within the spreadsheet.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Target calendar. Env: `GOOGLE_CALENDAR_ID`.
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// IANA timezone for created calendar entries.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Start time used for events whose text carried a date but no time.
    #[serde(default = "default_event_time")]
    pub default_event_time: String,

    /// Ceiling on record-loops before a run is declared stuck.
    #[serde(default = "default_max_loops")]
    pub max_loop_iterations: u32,
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

fn default_event_time() -> String {
    DEFAULT_EVENT_TIME.to_string()
}

fn default_max_loops() -> u32 {
    DEFAULT_MAX_LOOPS
}

impl Default for EvsyncConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: String::new(),
            google_access_token: String::new(),
            sheet_id: String::new(),
            sheet_name: default_sheet_name(),
            calendar_id: default_calendar_id(),
            timezone: default_timezone(),
            default_event_time: default_event_time(),
            max_loop_iterations: default_max_loops(),
        }
    }
}

impl EvsyncConfig {
    /// Load `evsync.toml` from the current directory, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::from_path(Path::new("evsync.toml"))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<EvsyncConfig>(&contents)?
        } else {
            Self::default()
        };

        env_override(&mut config.anthropic_api_key, "ANTHROPIC_API_KEY");
        env_override(&mut config.google_access_token, "GOOGLE_ACCESS_TOKEN");
        env_override(&mut config.sheet_id, "GOOGLE_SHEET_ID");
        env_override(&mut config.calendar_id, "GOOGLE_CALENDAR_ID");

        Ok(config)
    }
}

// Environment takes precedence over the config file; an empty variable is
// treated as unset.
fn env_override(field: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var)
        && !value.is_empty()
    {
        *field = value;
    }
}
