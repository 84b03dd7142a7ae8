//! Settings for quill.
//!
//! [`Settings`] holds the logging and database configuration. It is passed
//! explicitly to [`setup_logging`](crate::logging::setup_logging) and to the
//! driver that opens the connection; see [`settings_loader`](crate::settings_loader)
//! for reading it from TOML and the environment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The database product name used to pick a dialect (e.g. `SQLite`,
    /// `PostgreSQL`, `DB2/LINUXX8664`).
    pub product_name: String,
    /// The database name (or file path for `SQLite`, `:memory:` for an
    /// in-memory database).
    pub name: String,
    /// Additional driver-specific options.
    pub options: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            product_name: "SQLite".to_string(),
            name: ":memory:".to_string(),
            options: HashMap::new(),
        }
    }
}

/// The complete set of quill settings.
///
/// # Examples
///
/// ```
/// use quill_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.database.product_name, "SQLite");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled. Controls the log format.
    pub debug: bool,

    /// The log filter (e.g. "info", "debug", "`quill_db=trace`").
    pub log_level: String,

    /// The database to connect to.
    pub database: DatabaseSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            database: DatabaseSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.database.product_name, "SQLite");
        assert_eq!(s.database.name, ":memory:");
        assert!(s.database.options.is_empty());
    }

    #[test]
    fn test_settings_round_trip_through_json() {
        let mut settings = Settings::default();
        settings.debug = false;
        settings
            .database
            .options
            .insert("journal_mode".to_string(), "WAL".to_string());

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["database"]["product_name"], "SQLite");
        let back: Settings = serde_json::from_value(json).unwrap();
        assert!(!back.debug);
        assert_eq!(back.database.options["journal_mode"], "WAL");
    }
}
