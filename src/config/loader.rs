// src/config/loader.rs
//! Layered configuration loader: defaults, TOML files, then environment overrides

use crate::config::{constants::paths, ConfigError, SystemConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Loader using the discovered system, user and local paths
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment variable prefix
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Paths consulted, lowest precedence first
    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load system configuration with validation
    pub fn load(&self) -> Result<SystemConfig, ConfigError> {
        let mut merged = toml::Value::try_from(SystemConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        for config_path in &self.config_paths {
            if !config_path.exists() {
                continue;
            }
            let file_config = self.load_config_file(config_path)?;
            debug!(path = %config_path.display(), "merging configuration file");
            merge_toml_values(&mut merged, file_config);
        }

        self.apply_environment_overrides(&mut merged);

        let config: SystemConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate a single file on top of the defaults without loading it
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let mut merged = toml::Value::try_from(SystemConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        merge_toml_values(&mut merged, self.load_config_file(path)?);

        let config: SystemConfig = merged.try_into()?;
        config.validate()
    }

    /// Export a configuration to file
    pub fn export_config<P: AsRef<Path>>(config: &SystemConfig, path: P) -> Result<(), ConfigError> {
        let toml_content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;

        Ok(config)
    }

    /// `GESTURE_RECOGNIZER__DTW_THRESHOLD=190` sets `recognizer.dtw_threshold`
    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            let Some(stripped) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };
            let Some((section, field)) = stripped.split_once(paths::ENV_SECTION_SEPARATOR) else {
                continue;
            };
            if section.is_empty() || field.is_empty() {
                continue;
            }

            debug!(variable = %key, "applying environment override");
            set_nested_value(
                config,
                &section.to_lowercase(),
                &field.to_lowercase(),
                parse_env_value(&value),
            );
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        paths.push(PathBuf::from(paths::SYSTEM_CONFIG_PATH));

        if let Some(home_dir) = std::env::var_os("HOME").map(PathBuf::from) {
            paths.push(home_dir.join(paths::USER_CONFIG_DIR).join(paths::LOCAL_CONFIG_FILE));
        }

        paths.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));

        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, section: &str, field: &str, value: toml::Value) {
    let toml::Value::Table(root) = config else {
        return;
    };
    let entry = root
        .entry(section.to_string())
        .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));

    if let toml::Value::Table(table) = entry {
        // Integers given for float fields must stay floats
        let value = match (table.get(field), value) {
            (Some(toml::Value::Float(_)), toml::Value::Integer(i)) => toml::Value::Float(i as f64),
            (_, value) => value,
        };
        table.insert(field.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert!(!loader.config_paths().is_empty());
    }

    #[test]
    fn test_load_with_missing_files_gives_defaults() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/gesture.toml")])
            .with_env_prefix("GESTURE_TEST_UNUSED_");
        let config = loader.load().unwrap();
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[recognizer]
dtw_threshold = 190.0
cooldown_samples = 20

[serial]
port_name = "/dev/ttyACM0"
"#
        )
        .unwrap();

        let loader = ConfigLoader::with_paths(vec![temp_file.path().to_path_buf()])
            .with_env_prefix("GESTURE_TEST_UNUSED_");
        let config = loader.load().unwrap();

        assert_eq!(config.recognizer.dtw_threshold, 190.0);
        assert_eq!(config.recognizer.cooldown_samples, 20);
        assert_eq!(config.recognizer.template_length, 80);
        assert_eq!(config.serial.port_name, "/dev/ttyACM0");
    }

    #[test]
    fn test_invalid_config_validation() {
        let loader = ConfigLoader::new();

        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[recognizer]
template_length = 120
detection_window = 100
"#
        )
        .unwrap();

        assert!(loader.validate_config_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[recognizer\nstep_size = ").unwrap();

        let loader = ConfigLoader::with_paths(vec![temp_file.path().to_path_buf()]);
        assert!(matches!(loader.load(), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_config_export() {
        let temp_file = NamedTempFile::new().unwrap();

        ConfigLoader::export_config(&SystemConfig::default(), temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("[recognizer]"));
        assert!(content.contains("dtw_threshold"));
    }

    #[test]
    fn test_integer_override_of_float_field() {
        let mut value = toml::Value::try_from(SystemConfig::default()).unwrap();
        set_nested_value(&mut value, "recognizer", "dtw_threshold", toml::Value::Integer(200));

        let config: SystemConfig = value.try_into().unwrap();
        assert_eq!(config.recognizer.dtw_threshold, 200.0);
    }
}
