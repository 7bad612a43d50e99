//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;
use toml::Value;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: Option<&PathBuf>) -> Result<()> {
    let config_path = config_path.cloned().unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = set_config_value(&settings, key, value)?;
            updated.save_to(&config_path)?;
            Output::success(&format!("Set {} = {}", key, value));
            Output::info(&format!("Saved to {}", config_path.display()));
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Return a copy of `settings` with the dotted `key` set to `raw`.
///
/// The new value takes the type of the value it replaces. Keys with no
/// current value (unset optionals) are parsed as integer, float or bool
/// before falling back to a string.
pub fn set_config_value(settings: &Settings, key: &str, raw: &str) -> Result<Settings> {
    let mut root = Value::try_from(settings).map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
        bail!("Config keys look like 'section.name', got '{}'", key);
    }
    let (field, sections) = parts.split_last().ok_or_else(|| anyhow!("Empty config key"))?;

    let mut table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config is not a table"))?;
    for section in sections {
        table = table
            .get_mut(*section)
            .and_then(Value::as_table_mut)
            .ok_or_else(|| anyhow!("Unknown config section '{}'", section))?;
    }

    let value = match table.get(*field) {
        Some(existing) => typed_like(existing, raw)?,
        None => inferred(raw),
    };
    table.insert(field.to_string(), value);

    root.try_into::<Settings>()
        .map_err(|e| anyhow!("Invalid value for {}: {}", key, e))
}

fn typed_like(existing: &Value, raw: &str) -> Result<Value> {
    Ok(match existing {
        Value::Integer(_) => Value::Integer(
            raw.parse()
                .map_err(|_| anyhow!("Expected an integer, got '{}'", raw))?,
        ),
        Value::Float(_) => Value::Float(
            raw.parse()
                .map_err(|_| anyhow!("Expected a number, got '{}'", raw))?,
        ),
        Value::Boolean(_) => Value::Boolean(
            raw.parse()
                .map_err(|_| anyhow!("Expected true or false, got '{}'", raw))?,
        ),
        Value::String(_) => Value::String(raw.to_string()),
        Value::Table(_) | Value::Array(_) | Value::Datetime(_) => {
            bail!("Only scalar values can be set from the command line")
        }
    })
}

fn inferred(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Float(f)
    } else if let Ok(b) = raw.parse::<bool>() {
        Value::Boolean(b)
    } else {
        Value::String(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_integer_value() {
        let settings = Settings::default();
        let updated = set_config_value(&settings, "server.port", "9001").unwrap();
        assert_eq!(updated.server.port, 9001);
    }

    #[test]
    fn test_set_string_and_bool_values() {
        let settings = Settings::default();
        let updated = set_config_value(&settings, "llm.model", "gpt-4o").unwrap();
        assert_eq!(updated.llm.model, "gpt-4o");

        let updated = set_config_value(&updated, "lecture.describe_images", "false").unwrap();
        assert!(!updated.lecture.describe_images);
        assert_eq!(updated.llm.model, "gpt-4o");
    }

    #[test]
    fn test_set_optional_value() {
        let settings = Settings::default();
        let updated = set_config_value(&settings, "prompts.custom_dir", "~/prompts").unwrap();
        assert_eq!(updated.prompts.custom_dir.as_deref(), Some("~/prompts"));
    }

    #[test]
    fn test_rejects_bad_keys_and_values() {
        let settings = Settings::default();
        assert!(set_config_value(&settings, "port", "1").is_err());
        assert!(set_config_value(&settings, "nosuch.port", "1").is_err());
        assert!(set_config_value(&settings, "server.port", "eighty").is_err());
    }

    #[test]
    fn test_set_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let action = ConfigAction::Set {
            key: "answer.answer_delay_ms".to_string(),
            value: "0".to_string(),
        };

        run_config(&action, Settings::default(), Some(&path)).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.answer.answer_delay_ms, 0);
    }
}
