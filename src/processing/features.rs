// src/processing/features.rs
//! Per-sample feature matrix shared by template building and live matching

use crate::config::constants::sensor::{AXIS_COUNT, FEATURE_COUNT};
use crate::hal::types::ImuSample;
use crate::processing::ProcessingError;
use ndarray::Array2;

/// Bump whenever the column layout or derivation changes; stored in every template
pub const FEATURE_PIPELINE_VERSION: u32 = 1;

/// L x 8 table: six raw axes, gyro magnitude, accel magnitude
pub type FeatureMatrix = Array2<f64>;

/// Turns a window of exactly `window_length` samples into a [`FeatureMatrix`]
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    window_length: usize,
}

impl FeatureExtractor {
    pub fn new(window_length: usize) -> Self {
        Self { window_length }
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn version(&self) -> u32 {
        FEATURE_PIPELINE_VERSION
    }

    pub fn extract(&self, window: &[ImuSample]) -> Result<FeatureMatrix, ProcessingError> {
        if window.len() != self.window_length {
            return Err(ProcessingError::WindowLength {
                expected: self.window_length,
                actual: window.len(),
            });
        }
        Ok(temporal_features(window))
    }
}

/// Feature rows for any window length
pub fn temporal_features(window: &[ImuSample]) -> FeatureMatrix {
    let mut matrix = Array2::zeros((window.len(), FEATURE_COUNT));
    for (mut row, sample) in matrix.rows_mut().into_iter().zip(window) {
        for (axis, &value) in sample.values().iter().enumerate() {
            row[axis] = value;
        }
        row[AXIS_COUNT] = sample.gyro_magnitude();
        row[AXIS_COUNT + 1] = sample.accel_magnitude();
    }
    matrix
}
