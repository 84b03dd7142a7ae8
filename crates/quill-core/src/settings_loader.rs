//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `QUILL_DEBUG` | `debug` |
//! | `QUILL_LOG_LEVEL` | `log_level` |
//! | `QUILL_DATABASE_PRODUCT` | `database.product_name` |
//! | `QUILL_DATABASE_NAME` | `database.name` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use quill_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("quill.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::QuillError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values, including
/// individual fields of the `[database]` table.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, QuillError> {
    // Merge through serde_json so that nested tables keep their defaults.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| QuillError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    let json_value = toml_to_json(toml_value);
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        QuillError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, json_value);
    serde_json::from_value(merged).map_err(|e| {
        QuillError::ConfigurationError(format!("Failed to deserialize settings from TOML: {e}"))
    })
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, QuillError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        QuillError::ConfigurationError(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, QuillError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `QUILL_*` environment variable overrides to a settings struct.
///
/// `QUILL_DEBUG` accepts "true", "1" or "yes" (case-insensitive) as true;
/// anything else is false.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("QUILL_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("QUILL_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("QUILL_DATABASE_PRODUCT") {
        settings.database.product_name = val;
    }

    if let Some(val) = lookup("QUILL_DATABASE_NAME") {
        settings.database.name = val;
    }
}

// ============================================================
// Helpers
// ============================================================

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            log_level = "quill_db=debug"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "quill_db=debug");
        // Defaults preserved
        assert_eq!(settings.database.product_name, "SQLite");
    }

    #[test]
    fn test_from_toml_str_database_partial() {
        let toml = r#"
            [database]
            name = "blog.db"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.database.name, "blog.db");
        assert_eq!(settings.database.product_name, "SQLite");
    }

    #[test]
    fn test_from_toml_str_database_options() {
        let toml = r#"
            [database]
            product_name = "PostgreSQL"
            name = "blog"

            [database.options]
            sslmode = "require"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.database.product_name, "PostgreSQL");
        assert_eq!(settings.database.options.get("sslmode").unwrap(), "require");
    }

    #[test]
    fn test_from_toml_str_ignores_unknown_tables() {
        let toml = r#"
            log_level = "warn"

            [cache]
            page_size = 25
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.database.name, ":memory:");
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("[[invalid toml content");
        assert!(matches!(result, Err(QuillError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        let result = from_toml_str("debug = \"sometimes\"");
        assert!(result.is_err());
    }

    // ── File loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_file() {
        let dir = std::env::temp_dir().join("quill_test_toml");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("quill.toml");

        std::fs::write(&path, "debug = false\n[database]\nname = \"file.db\"\n").unwrap();

        let settings = from_toml_file(&path).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.database.name, "file.db");

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = from_toml_file("/nonexistent/path/quill.toml");
        assert!(result.is_err());
    }

    // ── Environment overrides ───────────────────────────────────────

    #[test]
    fn test_overrides_debug_values() {
        for (raw, expected) in [("true", true), ("1", true), ("YES", true), ("false", false), ("0", false)] {
            let mut settings = Settings::default();
            settings.debug = !expected;
            apply_overrides(&mut settings, env(&[("QUILL_DEBUG", raw)]));
            assert_eq!(settings.debug, expected, "QUILL_DEBUG={raw}");
        }
    }

    #[test]
    fn test_overrides_database() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("QUILL_DATABASE_PRODUCT", "DB2/NT"),
                ("QUILL_DATABASE_NAME", "sample"),
                ("QUILL_LOG_LEVEL", "trace"),
            ]),
        );
        assert_eq!(settings.database.product_name, "DB2/NT");
        assert_eq!(settings.database.name, "sample");
        assert_eq!(settings.log_level, "trace");
    }

    #[test]
    fn test_overrides_absent_keep_values() {
        let mut settings = Settings::default();
        settings.database.name = "kept.db".to_string();
        apply_overrides(&mut settings, env(&[]));
        assert_eq!(settings.database.name, "kept.db");
        assert!(settings.debug);
    }

    // ── merge_json helper ───────────────────────────────────────────

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"outer": {"a": 1, "b": 2}});
        let over = serde_json::json!({"outer": {"b": 3}});
        let merged = merge_json(base, over);
        assert_eq!(merged["outer"]["a"], 1);
        assert_eq!(merged["outer"]["b"], 3);
    }

    #[test]
    fn test_merge_json_array_override() {
        let base = serde_json::json!({"list": [1, 2, 3]});
        let over = serde_json::json!({"list": [4, 5]});
        let merged = merge_json(base, over);
        assert_eq!(merged["list"], serde_json::json!([4, 5]));
    }
}
