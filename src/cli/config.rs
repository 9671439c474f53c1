// FILE: src/cli/config.rs

use crate::error::{CompilerError, Result};
use crate::ConfigMap;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Load a configuration file into the flat namespace. `.toml` files are
/// parsed as TOML, everything else as JSON.
pub fn load(config_path: &Path) -> Result<ConfigMap> {
    let config_content = fs::read_to_string(config_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("Config file {}: {}", config_path.display(), e),
    })?;

    let value = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => {
            let table: toml::Value = toml::from_str(&config_content)
                .map_err(|e| CompilerError::config(format!("Invalid TOML config: {}", e)))?;
            serde_json::to_value(table)
                .map_err(|e| CompilerError::config(format!("Unsupported TOML value: {}", e)))?
        }
        _ => serde_json::from_str(&config_content)
            .map_err(|e| CompilerError::config(format!("Invalid JSON config: {}", e)))?,
    };

    log::info!("Loaded configuration from {}", config_path.display());
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CompilerError::config(format!(
            "Top level of {} must be an object, found {}",
            config_path.display(),
            other
        ))),
    }
}

/// Parse a `KEY=VALUE` override. The value is read as JSON when it parses,
/// otherwise it is kept as a plain string.
pub fn parse_define(define: &str) -> Result<(String, Value)> {
    let (key, value) = define.split_once('=').ok_or_else(|| {
        CompilerError::config(format!("Invalid definition: {}. Use KEY=VALUE format.", define))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CompilerError::config(format!("Missing key in definition: {}", define)));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
