// src/processing/activity.rs
//! Motion energy estimates used to skip DTW on a resting sensor

use crate::config::constants::sensor::AXIS_COUNT;
use crate::hal::types::ImuSample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityReading {
    pub activity: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ActivityGate {
    min_activity: f64,
}

impl ActivityGate {
    pub fn new(min_activity: f64) -> Self {
        Self { min_activity }
    }

    pub fn min_activity(&self) -> f64 {
        self.min_activity
    }

    /// Active when the window activity reaches the floor (inclusive)
    pub fn evaluate(&self, window: &[ImuSample]) -> ActivityReading {
        let activity = window_activity(window);
        ActivityReading {
            activity,
            is_active: activity >= self.min_activity,
        }
    }
}

/// Mean over the six axes of each axis' sample standard deviation (n - 1).
/// Fewer than two samples yields 0.
pub fn window_activity(window: &[ImuSample]) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }

    let total: f64 = (0..AXIS_COUNT)
        .map(|axis| sample_std(window.iter().map(|s| s.values()[axis])))
        .sum();
    total / AXIS_COUNT as f64
}

/// Spread of a single sample's six readings (n - 1), used to rank recording windows
pub fn sample_activity(sample: &ImuSample) -> f64 {
    sample_std(sample.values().iter().copied())
}

fn sample_std<I>(values: I) -> f64
where
    I: Iterator<Item = f64> + Clone,
{
    let n = values.clone().count();
    if n < 2 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let sum_sq: f64 = values.map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (n - 1) as f64).sqrt()
}
