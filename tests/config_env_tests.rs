// tests/config_env_tests.rs
//! Layered configuration: files then environment overrides

use imu_gesture_core::config::{ConfigError, ConfigLoader, SystemConfig};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

const PREFIX: &str = "GESTURE_IT_";

fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with(PREFIX) {
            std::env::remove_var(key);
        }
    }
}

fn loader(paths: Vec<std::path::PathBuf>) -> ConfigLoader {
    ConfigLoader::with_paths(paths).with_env_prefix(PREFIX)
}

#[test]
#[serial]
fn defaults_without_files_or_env() {
    clear_env();
    let config = loader(vec![]).load().unwrap();
    assert_eq!(config, SystemConfig::default());
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[recognizer]\ndtw_threshold = 120.0\nstep_size = 3").unwrap();

    std::env::set_var(format!("{}RECOGNIZER__DTW_THRESHOLD", PREFIX), "175");
    std::env::set_var(format!("{}SERIAL__PORT_NAME", PREFIX), "/dev/ttyACM0");
    let config = loader(vec![file.path().to_path_buf()]).load();
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.recognizer.dtw_threshold, 175.0);
    assert_eq!(config.recognizer.step_size, 3);
    assert_eq!(config.serial.port_name, "/dev/ttyACM0");
}

#[test]
#[serial]
fn invalid_override_fails_validation() {
    clear_env();
    std::env::set_var(format!("{}RECOGNIZER__DETECTION_WINDOW", PREFIX), "10");
    let result = loader(vec![]).load();
    clear_env();

    match result {
        Err(ConfigError::ValidationError(errors)) => {
            assert!(errors.iter().any(|e| e.contains("detection_window")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
#[serial]
fn variables_without_section_separator_are_ignored() {
    clear_env();
    std::env::set_var(format!("{}STEP_SIZE", PREFIX), "0");
    let result = loader(vec![]).load();
    clear_env();
    assert!(result.is_ok());
}

#[test]
#[serial]
fn exported_config_loads_back() {
    clear_env();
    let mut config = SystemConfig::default();
    config.recognizer.min_activity = 0.2;
    config.templates.gestures = vec!["circle".to_string()];

    let file = NamedTempFile::new().unwrap();
    ConfigLoader::export_config(&config, file.path()).unwrap();
    let loaded = loader(vec![file.path().to_path_buf()]).load().unwrap();
    assert_eq!(loaded, config);
}
