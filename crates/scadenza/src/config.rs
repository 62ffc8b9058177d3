//! Configuration loading from environment variables.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::calendar::WeekStart;

const DEFAULT_DB: &str = "scadenza.db";
const DEFAULT_PORT: u16 = 8080;

/// Runtime settings. CLI flags override these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub port: u16,
    pub week_start: WeekStart,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB),
            port: DEFAULT_PORT,
            week_start: WeekStart::default(),
        }
    }
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// Reads `SCADENZA_DB`, `SCADENZA_PORT` and `SCADENZA_WEEK_START`, either
    /// from the environment or from a `.env` file. Unset variables keep their
    /// defaults; set but unparseable ones are an error.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(db) = lookup("SCADENZA_DB") {
            settings.db_path = PathBuf::from(db);
        }

        if let Some(port) = lookup("SCADENZA_PORT") {
            settings.port = port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("SCADENZA_PORT is not a valid port: {port}"))?;
        }

        if let Some(week_start) = lookup("SCADENZA_WEEK_START") {
            settings.week_start = week_start
                .parse::<WeekStart>()
                .map_err(anyhow::Error::msg)
                .context("Invalid SCADENZA_WEEK_START")?;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.week_start, WeekStart::Sunday);
    }

    #[test]
    fn test_reads_all_variables() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("SCADENZA_DB", "/tmp/issues.db"),
            ("SCADENZA_PORT", " 9090 "),
            ("SCADENZA_WEEK_START", "Monday"),
        ]))
        .unwrap();

        assert_eq!(settings.db_path, PathBuf::from("/tmp/issues.db"));
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.week_start, WeekStart::Monday);
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = Settings::from_lookup(lookup_from(&[("SCADENZA_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("SCADENZA_PORT"));
    }

    #[test]
    fn test_invalid_week_start_is_an_error() {
        let err =
            Settings::from_lookup(lookup_from(&[("SCADENZA_WEEK_START", "friday")])).unwrap_err();
        assert!(format!("{err:#}").contains("friday"));
    }
}
