// tests/common/mod.rs
//! Shared fixtures for integration tests

#![allow(dead_code)]

use imu_gesture_core::config::constants::testing::*;
use imu_gesture_core::config::RecognizerConfig;
use imu_gesture_core::hal::{ImuSample, SensorLimits, SimulatedMotion};
use imu_gesture_core::templates::{BuilderConfig, GestureTemplate, TemplateBuilder, TemplateSet};
use std::sync::Arc;

pub fn test_config() -> RecognizerConfig {
    RecognizerConfig {
        template_length: TEST_TEMPLATE_LENGTH,
        detection_window: TEST_DETECTION_WINDOW,
        step_size: TEST_STEP_SIZE,
        cooldown_samples: TEST_COOLDOWN_SAMPLES,
        ..RecognizerConfig::default()
    }
}

pub fn motion(kind: SimulatedMotion) -> Vec<ImuSample> {
    kind.render(TEST_TEMPLATE_LENGTH, TEST_SIGNAL_AMPLITUDE)
}

pub fn rest(n: usize) -> Vec<ImuSample> {
    vec![ImuSample::from_parts([0.0; 3], [0.0, 0.0, 9.81]); n]
}

pub fn template_named(name: &str, kind: SimulatedMotion) -> GestureTemplate {
    let builder = TemplateBuilder::new(BuilderConfig {
        template_length: TEST_TEMPLATE_LENGTH,
        min_activity: 0.08,
        limits: SensorLimits::default(),
    });
    builder
        .build(name, &motion(kind))
        .expect("template builds from a full motion")
}

pub fn template_set(templates: Vec<GestureTemplate>) -> Arc<TemplateSet> {
    Arc::new(TemplateSet::new(templates).expect("valid template set"))
}
