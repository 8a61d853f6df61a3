//! Handlers for `gigo config {path,get,set,init,export}` and the TOML
//! dotted-key helpers behind them.
//!
//! Handlers return the text to print so the dispatch layer owns stdout.

use std::path::{Path, PathBuf};

use gigo_core::{Error, Result};

use crate::cli::ConfigAction;
use crate::config::GigoConfig;

// ============================================================================
// Command dispatch
// ============================================================================

/// Handle a config subcommand.
///
/// Receives the raw `--config` path (not a loaded config) because `path`
/// and `init` work before a config file exists.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    let output = match action {
        ConfigAction::Path => cmd_config_path(config_path)?,
        ConfigAction::Get { key } => cmd_config_get(config_path, &key)?,
        ConfigAction::Set { key, value } => cmd_config_set(config_path, &key, &value)?,
        ConfigAction::Init { file, force } => cmd_config_init(file.as_deref(), force)?,
        ConfigAction::Export { docker_env } => {
            cmd_config_export(&GigoConfig::load(config_path)?, docker_env)?
        }
    };
    println!("{output}");
    Ok(())
}

// ============================================================================
// Command handlers
// ============================================================================

fn cmd_config_path(config_path: Option<&str>) -> Result<String> {
    let path = GigoConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory for this platform"))?;
    if !path.exists() {
        log::warn!("{} does not exist; run `gigo config init` to create it", path.display());
    }
    Ok(path.display().to_string())
}

fn cmd_config_get(config_path: Option<&str>, key: &str) -> Result<String> {
    let config = GigoConfig::load(config_path)?;
    let value = toml::Value::try_from(&config).map_err(|e| Error::config(e.to_string()))?;
    get_nested_value(&value, key)
        .map(format_toml_value)
        .ok_or_else(|| Error::config(format!("Key '{key}' not found in configuration")))
}

/// Set a key in the config file, refusing edits that would leave the file
/// unloadable or the retrieval settings invalid.
fn cmd_config_set(config_path: Option<&str>, key: &str, value: &str) -> Result<String> {
    let path = GigoConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory"))?;

    if !path.exists() {
        return Err(Error::config(format!(
            "Config file does not exist at {}. Run `gigo config init` first.",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
    let mut doc: toml::Value = toml::from_str(&content)
        .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;

    set_nested_value(&mut doc, key, parse_value(value))?;
    validate_document(&doc)?;

    let toml_str = toml::to_string_pretty(&doc).map_err(|e| Error::config(e.to_string()))?;
    std::fs::write(&path, toml_str).map_err(|e| Error::io_with_path(e, &path))?;

    Ok(format!("Set {key} = {value} in {}", path.display()))
}

fn cmd_config_init(file: Option<&str>, force: bool) -> Result<String> {
    let path = match file {
        Some(p) => PathBuf::from(p),
        None => GigoConfig::default_config_path()
            .ok_or_else(|| Error::config("Could not determine config directory"))?,
    };

    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }

    write_default_config(&path)?;
    Ok(format!("Config file created at {}", path.display()))
}

fn cmd_config_export(config: &GigoConfig, docker_env: bool) -> Result<String> {
    let lines: Vec<String> = config
        .to_env_vars()?
        .into_iter()
        .map(|(key, value)| {
            if docker_env {
                format!("--env {key}={value}")
            } else {
                format!("{key}={value}")
            }
        })
        .collect();
    Ok(lines.join("\n"))
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }
    let toml_str = GigoConfig::default().to_toml_string()?;
    std::fs::write(path, toml_str).map_err(|e| Error::io_with_path(e, path))
}

/// The edited document must still deserialize and describe a usable
/// retrieval setup.
fn validate_document(doc: &toml::Value) -> Result<()> {
    let config: GigoConfig = doc
        .clone()
        .try_into()
        .map_err(|e| Error::config(format!("Invalid configuration: {e}")))?;
    config.retrieval.strategy_kind()?;
    config.retrieval.request("").validate()
}

// ============================================================================
// TOML dotted-key helpers
// ============================================================================

/// Navigate a dotted key path in a TOML value tree.
fn get_nested_value<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(value, |current, part| current.as_table()?.get(part))
}

/// Set a value at a dotted key path, creating intermediate tables as needed.
fn set_nested_value(root: &mut toml::Value, key: &str, value: toml::Value) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        return Err(Error::config("Empty key path"));
    };
    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::config(format!("Invalid key path '{key}'")));
    }

    let mut current = root;
    for part in parents {
        let table = current
            .as_table_mut()
            .ok_or_else(|| Error::config("Cannot navigate into a non-table value"))?;
        current = table
            .entry(part.to_string())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    current
        .as_table_mut()
        .ok_or_else(|| Error::config("Cannot set key on a non-table value"))?
        .insert(last.to_string(), value);
    Ok(())
}

/// Parse a string value into a TOML value, auto-detecting the type.
///
/// Priority: bool → integer → float → string.
fn parse_value(s: &str) -> toml::Value {
    match s {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        _ => s
            .parse::<i64>()
            .map(toml::Value::Integer)
            .or_else(|_| s.parse::<f64>().map(toml::Value::Float))
            .unwrap_or_else(|_| toml::Value::String(s.to_string())),
    }
}

/// Format a TOML value for display on stdout.
fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(_) | toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("config.toml");
        write_default_config(&path).unwrap();
        path
    }

    #[test]
    fn test_cmd_config_path_explicit() {
        let out = cmd_config_path(Some("/explicit/config.toml")).unwrap();
        assert_eq!(out, "/explicit/config.toml");
    }

    #[test]
    fn test_cmd_config_get() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir);
        let path = path.to_str().unwrap();

        assert_eq!(cmd_config_get(Some(path), "retrieval.collection_name").unwrap(), "hybrid_collection");
        assert_eq!(cmd_config_get(Some(path), "retrieval.prefetch_limit").unwrap(), "30");
        let err = cmd_config_get(Some(path), "retrieval.nonexistent").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_cmd_config_set_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir);
        let path_str = path.to_str().unwrap();

        cmd_config_set(Some(path_str), "retrieval.limit", "5").unwrap();
        cmd_config_set(Some(path_str), "references.scratch_path", "/data/scratch").unwrap();

        let config = GigoConfig::load(Some(path_str)).unwrap();
        assert_eq!(config.retrieval.limit, 5);
        assert_eq!(config.references.scratch_path.as_deref(), Some("/data/scratch"));
    }

    #[test]
    fn test_cmd_config_set_rejects_invalid_settings() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir);
        let path_str = path.to_str().unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let unknown = cmd_config_set(Some(path_str), "retrieval.strategy", "bm25").unwrap_err();
        assert!(unknown.is_configuration());

        let narrow = cmd_config_set(Some(path_str), "retrieval.prefetch_limit", "2").unwrap_err();
        assert!(narrow.to_string().contains("prefetch_limit"));

        let wrong_type = cmd_config_set(Some(path_str), "retrieval.limit", "many").unwrap_err();
        assert!(wrong_type.is_configuration());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_cmd_config_set_missing_file() {
        let err = cmd_config_set(Some("/nonexistent/config.toml"), "retrieval.limit", "5").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_cmd_config_init() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gigo").join("config.toml");
        let path_str = path.to_str().unwrap();

        cmd_config_init(Some(path_str), false).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[retrieval]"));
        assert!(content.contains("[qdrant]"));

        let err = cmd_config_init(Some(path_str), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(cmd_config_init(Some(path_str), true).is_ok());
    }

    #[test]
    fn test_cmd_config_export() {
        let config = GigoConfig::default();
        let plain = cmd_config_export(&config, false).unwrap();
        assert!(plain.lines().any(|l| l == "GIGO_RETRIEVAL_STRATEGY=hybrid"));

        let docker = cmd_config_export(&config, true).unwrap();
        assert!(docker.lines().all(|l| l.starts_with("--env GIGO_")));
    }

    #[test]
    fn test_nested_value_helpers() {
        let mut val = toml::Value::Table(toml::map::Map::new());
        set_nested_value(&mut val, "qdrant.url", toml::Value::String("http://q".into())).unwrap();
        assert_eq!(
            get_nested_value(&val, "qdrant.url"),
            Some(&toml::Value::String("http://q".into()))
        );
        assert!(get_nested_value(&val, "qdrant.missing").is_none());

        assert!(set_nested_value(&mut val, "qdrant.url.deeper", toml::Value::Integer(1)).is_err());
        assert!(set_nested_value(&mut val, "a..b", toml::Value::Integer(1)).is_err());
    }

    #[test]
    fn test_parse_value_types() {
        assert_eq!(parse_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_value("42"), toml::Value::Integer(42));
        assert_eq!(parse_value("4.5"), toml::Value::Float(4.5));
        assert_eq!(parse_value("hybrid"), toml::Value::String("hybrid".into()));
    }

    #[test]
    fn test_format_toml_value() {
        assert_eq!(format_toml_value(&toml::Value::String("hello".into())), "hello");
        assert_eq!(format_toml_value(&toml::Value::Float(4.5)), "4.5");
        assert_eq!(format_toml_value(&toml::Value::Boolean(false)), "false");
    }
}
