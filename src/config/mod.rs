// src/config/mod.rs
//! Configuration management: recognizer tuning, transport, template store and events

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration and start-up errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    #[error("no gesture templates loaded")]
    NoTemplates,

    #[error("duplicate gesture template '{0}'")]
    DuplicateGesture(String),

    #[error("template '{gesture}' has length {actual}, other templates use {expected}")]
    TemplateLengthMismatch {
        gesture: String,
        expected: usize,
        actual: usize,
    },

    #[error("configured template length {configured} does not match templates built with {templates}")]
    TemplateLengthConfigMismatch { configured: usize, templates: usize },
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Complete system configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SystemConfig {
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub templates: TemplateStoreConfig,
    #[serde(default)]
    pub events: EventConfig,
}

/// Recognizer tuning
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RecognizerConfig {
    /// Samples per analysis window, must match the templates
    #[serde(default = "defaults::template_length")]
    pub template_length: usize,

    /// Window buffer capacity
    #[serde(default = "defaults::detection_window")]
    pub detection_window: usize,

    /// Samples between successive evaluations
    #[serde(default = "defaults::step_size")]
    pub step_size: usize,

    /// Maximum DTW distance accepted as a match
    #[serde(default = "defaults::dtw_threshold")]
    pub dtw_threshold: f64,

    /// Minimum mean per-axis standard deviation worth evaluating
    #[serde(default = "defaults::min_activity")]
    pub min_activity: f64,

    /// Samples of suppression after a detection
    #[serde(default = "defaults::cooldown_samples")]
    pub cooldown_samples: usize,

    /// Required gap between best and second-best gesture
    #[serde(default = "defaults::similarity_margin")]
    pub similarity_margin: f64,

    /// Discard samples outside the plausible sensor range at ingest
    #[serde(default)]
    pub reject_out_of_range: bool,
}

/// Serial line transport settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "defaults::port_name")]
    pub port_name: String,

    /// Expected line rate; the device node is configured by the OS
    #[serde(default = "defaults::baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "defaults::settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Lines discarded right after opening (usually a partial line)
    #[serde(default = "defaults::skip_initial_lines")]
    pub skip_initial_lines: usize,

    /// Sleep between polls when no sample is available
    #[serde(default = "defaults::idle_sleep_ms")]
    pub idle_sleep_ms: u64,

    #[serde(default = "defaults::max_line_bytes")]
    pub max_line_bytes: usize,
}

/// Template store location and gesture selection
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TemplateStoreConfig {
    #[serde(default = "defaults::templates_dir")]
    pub directory: PathBuf,

    /// Restrict detection to these gestures (all when empty)
    #[serde(default)]
    pub gestures: Vec<String>,
}

/// Detection event delivery
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventConfig {
    #[serde(default = "defaults::channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "defaults::history_capacity")]
    pub history_capacity: usize,

    /// Gesture name to action label handed to the action sink
    #[serde(default = "defaults::actions")]
    pub actions: BTreeMap<String, String>,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    pub fn template_length() -> usize { recognizer::DEFAULT_TEMPLATE_LENGTH }
    pub fn detection_window() -> usize { recognizer::DEFAULT_DETECTION_WINDOW }
    pub fn step_size() -> usize { recognizer::DEFAULT_STEP_SIZE }
    pub fn dtw_threshold() -> f64 { recognizer::DEFAULT_DTW_THRESHOLD }
    pub fn min_activity() -> f64 { recognizer::DEFAULT_MIN_ACTIVITY }
    pub fn cooldown_samples() -> usize { recognizer::DEFAULT_COOLDOWN_SAMPLES }
    pub fn similarity_margin() -> f64 { recognizer::DEFAULT_SIMILARITY_MARGIN }

    pub fn port_name() -> String { serial::DEFAULT_PORT.to_string() }
    pub fn baud_rate() -> u32 { serial::DEFAULT_BAUD_RATE }
    pub fn settle_delay_ms() -> u64 { serial::DEFAULT_SETTLE_DELAY_MS }
    pub fn skip_initial_lines() -> usize { serial::DEFAULT_SKIP_INITIAL_LINES }
    pub fn idle_sleep_ms() -> u64 { serial::DEFAULT_IDLE_SLEEP_MS }
    pub fn max_line_bytes() -> usize { serial::MAX_LINE_BYTES }

    pub fn templates_dir() -> PathBuf { PathBuf::from(templates::DEFAULT_TEMPLATES_DIR) }

    pub fn channel_capacity() -> usize { events::DEFAULT_CHANNEL_CAPACITY }
    pub fn history_capacity() -> usize { events::DEFAULT_HISTORY_CAPACITY }

    pub fn actions() -> BTreeMap<String, String> {
        [
            ("Lumos_Nox", "light_toggle"),
            ("Wingardium_Leviosa", "levitation"),
            ("Ascendio", "volume_up"),
            ("Descendio", "volume_down"),
            ("Stupefy", "stun"),
            ("Reparo", "repair"),
            ("Expelliarmus", "disarm"),
        ]
        .into_iter()
        .map(|(gesture, action)| (gesture.to_string(), action.to_string()))
        .collect()
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            template_length: defaults::template_length(),
            detection_window: defaults::detection_window(),
            step_size: defaults::step_size(),
            dtw_threshold: defaults::dtw_threshold(),
            min_activity: defaults::min_activity(),
            cooldown_samples: defaults::cooldown_samples(),
            similarity_margin: defaults::similarity_margin(),
            reject_out_of_range: false,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: defaults::port_name(),
            baud_rate: defaults::baud_rate(),
            settle_delay_ms: defaults::settle_delay_ms(),
            skip_initial_lines: defaults::skip_initial_lines(),
            idle_sleep_ms: defaults::idle_sleep_ms(),
            max_line_bytes: defaults::max_line_bytes(),
        }
    }
}

impl Default for TemplateStoreConfig {
    fn default() -> Self {
        Self {
            directory: defaults::templates_dir(),
            gestures: Vec::new(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: defaults::channel_capacity(),
            history_capacity: defaults::history_capacity(),
            actions: defaults::actions(),
        }
    }
}

impl RecognizerConfig {
    /// Collect every violated constraint
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.template_length < recognizer::MIN_TEMPLATE_LENGTH
            || self.template_length > recognizer::MAX_TEMPLATE_LENGTH
        {
            errors.push(format!(
                "template_length must be within {}..={}, got {}",
                recognizer::MIN_TEMPLATE_LENGTH, recognizer::MAX_TEMPLATE_LENGTH, self.template_length
            ));
        }
        if self.detection_window < self.template_length {
            errors.push(format!(
                "detection_window ({}) must be >= template_length ({})",
                self.detection_window, self.template_length
            ));
        }
        if self.detection_window > recognizer::MAX_DETECTION_WINDOW {
            errors.push(format!(
                "detection_window ({}) exceeds {}",
                self.detection_window, recognizer::MAX_DETECTION_WINDOW
            ));
        }
        if self.step_size == 0 {
            errors.push("step_size must be at least 1".to_string());
        }
        if !(self.dtw_threshold.is_finite() && self.dtw_threshold > 0.0) {
            errors.push(format!("dtw_threshold must be positive, got {}", self.dtw_threshold));
        }
        if !(self.min_activity.is_finite() && self.min_activity >= 0.0) {
            errors.push(format!("min_activity must be non-negative, got {}", self.min_activity));
        }
        if !(self.similarity_margin.is_finite() && self.similarity_margin >= 0.0) {
            errors.push(format!(
                "similarity_margin must be non-negative, got {}",
                self.similarity_margin
            ));
        }

        errors
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = self.violations();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(errors))
        }
    }
}

impl SystemConfig {
    /// Validate every section, reporting all violations at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = self.recognizer.violations();

        if self.serial.port_name.is_empty() {
            errors.push("serial.port_name cannot be empty".to_string());
        }
        if self.serial.baud_rate < serial::MIN_BAUD_RATE || self.serial.baud_rate > serial::MAX_BAUD_RATE {
            errors.push(format!("Invalid baud rate: {}", self.serial.baud_rate));
        }
        if self.serial.idle_sleep_ms > serial::MAX_IDLE_SLEEP_MS {
            errors.push(format!(
                "serial.idle_sleep_ms ({}) exceeds {}",
                self.serial.idle_sleep_ms, serial::MAX_IDLE_SLEEP_MS
            ));
        }
        if self.serial.max_line_bytes == 0 {
            errors.push("serial.max_line_bytes must be at least 1".to_string());
        }
        if self.templates.directory.as_os_str().is_empty() {
            errors.push("templates.directory cannot be empty".to_string());
        }
        if self.events.channel_capacity == 0 || self.events.channel_capacity > events::MAX_CHANNEL_CAPACITY {
            errors.push(format!(
                "events.channel_capacity must be within 1..={}, got {}",
                events::MAX_CHANNEL_CAPACITY, self.events.channel_capacity
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(errors))
        }
    }

    /// Configuration summary for display/logging
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            template_length: self.recognizer.template_length,
            detection_window: self.recognizer.detection_window,
            step_size: self.recognizer.step_size,
            dtw_threshold: self.recognizer.dtw_threshold,
            port_name: self.serial.port_name.clone(),
            templates_dir: self.templates.directory.clone(),
        }
    }
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub template_length: usize,
    pub detection_window: usize,
    pub step_size: usize,
    pub dtw_threshold: f64,
    pub port_name: String,
    pub templates_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = SystemConfig::default();
        assert_eq!(config.recognizer.template_length, recognizer::DEFAULT_TEMPLATE_LENGTH);
        assert_eq!(config.recognizer.detection_window, recognizer::DEFAULT_DETECTION_WINDOW);
        assert_eq!(config.serial.baud_rate, serial::DEFAULT_BAUD_RATE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = SystemConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: SystemConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SystemConfig = toml::from_str(
            r#"
[recognizer]
dtw_threshold = 190.0
"#,
        )
        .unwrap();

        assert_eq!(config.recognizer.dtw_threshold, 190.0);
        assert_eq!(config.recognizer.step_size, recognizer::DEFAULT_STEP_SIZE);
        assert_eq!(config.serial.port_name, serial::DEFAULT_PORT);
    }

    #[test]
    fn test_window_smaller_than_template_rejected() {
        let mut config = SystemConfig::default();
        config.recognizer.detection_window = config.recognizer.template_length - 1;

        match config.validate() {
            Err(ConfigError::ValidationError(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("detection_window"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_all_violations_reported() {
        let mut config = SystemConfig::default();
        config.recognizer.step_size = 0;
        config.recognizer.dtw_threshold = 0.0;
        config.recognizer.similarity_margin = -1.0;
        config.serial.baud_rate = 0;

        match config.validate() {
            Err(ConfigError::ValidationError(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_action_map() {
        let config = EventConfig::default();
        assert_eq!(config.actions.get("Lumos_Nox").map(String::as_str), Some("light_toggle"));
    }
}
