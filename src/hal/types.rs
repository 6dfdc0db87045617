// src/hal/types.rs
//! Core sample types for the inertial sensor stream

use crate::config::constants::sensor::{AXIS_COUNT, MAX_ABS_ACCEL, MAX_ABS_GYRO};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One 6-axis reading: angular velocity (x, y, z) then acceleration (x, y, z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    values: [f64; AXIS_COUNT],
}

/// Reasons a sample record is discarded
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("field {index} is not numeric: '{value}'")]
    NotNumeric { index: usize, value: String },

    #[error("field {index} is not finite")]
    NonFinite { index: usize },

    #[error("axis {axis} value {value} outside plausible range +-{limit}")]
    OutOfRange { axis: usize, value: f64, limit: f64 },
}

impl ImuSample {
    pub fn new(values: [f64; AXIS_COUNT]) -> Self {
        Self { values }
    }

    pub fn from_parts(gyro: [f64; 3], accel: [f64; 3]) -> Self {
        Self {
            values: [gyro[0], gyro[1], gyro[2], accel[0], accel[1], accel[2]],
        }
    }

    pub fn values(&self) -> &[f64; AXIS_COUNT] {
        &self.values
    }

    pub fn gyro(&self) -> [f64; 3] {
        [self.values[0], self.values[1], self.values[2]]
    }

    pub fn accel(&self) -> [f64; 3] {
        [self.values[3], self.values[4], self.values[5]]
    }

    pub fn gyro_magnitude(&self) -> f64 {
        let [x, y, z] = self.gyro();
        (x * x + y * y + z * z).sqrt()
    }

    pub fn accel_magnitude(&self) -> f64 {
        let [x, y, z] = self.accel();
        (x * x + y * y + z * z).sqrt()
    }

    /// CSV record in the transport's field order
    pub fn to_csv_line(&self) -> String {
        self.values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for ImuSample {
    type Err = ParseError;

    /// Parse `gx,gy,gz,ax,ay,az`; surrounding whitespace on fields is ignored
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let field_count = line.split(',').count();
        if field_count != AXIS_COUNT {
            return Err(ParseError::FieldCount { expected: AXIS_COUNT, actual: field_count });
        }

        let mut values = [0.0; AXIS_COUNT];
        for (index, field) in line.split(',').enumerate() {
            let field = field.trim();
            let value: f64 = field.parse().map_err(|_| ParseError::NotNumeric {
                index,
                value: field.to_string(),
            })?;
            if !value.is_finite() {
                return Err(ParseError::NonFinite { index });
            }
            values[index] = value;
        }

        Ok(Self { values })
    }
}

impl fmt::Display for ImuSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_csv_line())
    }
}

/// Plausible sensor ranges used to reject corrupted readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorLimits {
    pub max_abs_gyro: f64,
    pub max_abs_accel: f64,
}

impl Default for SensorLimits {
    fn default() -> Self {
        Self {
            max_abs_gyro: MAX_ABS_GYRO,
            max_abs_accel: MAX_ABS_ACCEL,
        }
    }
}

impl SensorLimits {
    pub fn check(&self, sample: &ImuSample) -> Result<(), ParseError> {
        for (axis, &value) in sample.values().iter().enumerate() {
            let limit = if axis < 3 { self.max_abs_gyro } else { self.max_abs_accel };
            if value.abs() > limit {
                return Err(ParseError::OutOfRange { axis, value, limit });
            }
        }
        Ok(())
    }

    pub fn contains(&self, sample: &ImuSample) -> bool {
        self.check(sample).is_ok()
    }
}

/// Parse a record and optionally apply the range check
pub fn parse_sample_line(line: &str, limits: Option<&SensorLimits>) -> Result<ImuSample, ParseError> {
    let sample: ImuSample = line.parse()?;
    if let Some(limits) = limits {
        limits.check(&sample)?;
    }
    Ok(sample)
}
