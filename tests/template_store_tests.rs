// tests/template_store_tests.rs
//! Template persistence against a real directory

mod common;

use common::*;
use imu_gesture_core::config::constants::testing::TEST_TEMPLATE_LENGTH;
use imu_gesture_core::config::ConfigError;
use imu_gesture_core::error::GestureError;
use imu_gesture_core::hal::SimulatedMotion;
use imu_gesture_core::templates::{TemplateError, TemplateRecord, TemplateStore};
use tempfile::TempDir;

fn store() -> (TempDir, TemplateStore) {
    let dir = TempDir::new().expect("temp dir");
    let store = TemplateStore::new(dir.path().join("models"));
    (dir, store)
}

#[test]
fn save_then_load_returns_same_template() {
    let (_dir, store) = store();
    let template = template_named("circle", SimulatedMotion::Circle);

    let path = store.save(&template).unwrap();
    assert!(path.ends_with("circle.json"));
    assert_eq!(store.load("circle").unwrap(), template);
}

#[test]
fn missing_directory_lists_nothing() {
    let (_dir, store) = store();
    assert!(store.list().unwrap().is_empty());
    assert!(matches!(store.load("circle"), Err(TemplateError::NotFound(_))));
}

#[test]
fn list_is_sorted_and_ignores_other_files() {
    let (_dir, store) = store();
    store.save(&template_named("shake", SimulatedMotion::Shake)).unwrap();
    store.save(&template_named("circle", SimulatedMotion::Circle)).unwrap();
    std::fs::write(store.directory().join("notes.txt"), "hello").unwrap();

    assert_eq!(store.list().unwrap(), vec!["circle", "shake"]);
    assert_eq!(store.load_all().unwrap().len(), 2);
}

#[test]
fn selected_loading_skips_missing_names() {
    let (_dir, store) = store();
    store.save(&template_named("circle", SimulatedMotion::Circle)).unwrap();

    let names = vec!["circle".to_string(), "missing".to_string()];
    let loaded = store.load_selected(&names).unwrap();
    assert_eq!(loaded.len(), 1);

    let none = vec!["missing".to_string()];
    assert!(matches!(store.load_selected(&none), Err(TemplateError::NoneFound(_))));
}

#[test]
fn corrupted_values_fail_checksum() {
    let (_dir, store) = store();
    let path = store.save(&template_named("flick", SimulatedMotion::Flick)).unwrap();

    let mut record: TemplateRecord = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    record.variants[0][0][0] += 1.0;
    std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();

    assert!(matches!(store.load("flick"), Err(TemplateError::ChecksumMismatch { .. })));
}

#[test]
fn invalid_json_is_reported_with_path() {
    let (_dir, store) = store();
    std::fs::create_dir_all(store.directory()).unwrap();
    std::fs::write(store.directory().join("broken.json"), "{ not json").unwrap();

    match store.load("broken") {
        Err(TemplateError::Json { path, .. }) => assert!(path.ends_with("broken.json")),
        other => panic!("expected json error, got {:?}", other),
    }
}

#[test]
fn remove_deletes_record() {
    let (_dir, store) = store();
    store.save(&template_named("circle", SimulatedMotion::Circle)).unwrap();
    store.remove("circle").unwrap();
    assert!(store.list().unwrap().is_empty());
    assert!(matches!(store.remove("circle"), Err(TemplateError::NotFound(_))));
}

#[test]
fn empty_store_cannot_build_a_set() {
    let (_dir, store) = store();
    let err = store.load_set(&[]).unwrap_err();
    assert!(matches!(
        err,
        GestureError::Configuration {
            error: ConfigError::NoTemplates,
            ..
        }
    ));
    assert_eq!(err.context().component, "templates");
    assert_eq!(err.context().operation, "load_set");
}

#[test]
fn unknown_selection_reports_template_context() {
    let (_dir, store) = store();
    let err = store.load_set(&["missing".to_string()]).unwrap_err();
    assert!(matches!(
        err,
        GestureError::Template {
            error: TemplateError::NoneFound(_),
            ..
        }
    ));
    assert_eq!(err.context().operation, "load_set");
}

#[test]
fn load_set_builds_validated_set() {
    let (_dir, store) = store();
    store.save(&template_named("circle", SimulatedMotion::Circle)).unwrap();
    store.save(&template_named("shake", SimulatedMotion::Shake)).unwrap();

    let set = store.load_set(&[]).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.template_length(), TEST_TEMPLATE_LENGTH);
}
