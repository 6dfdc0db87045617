//! imu-gesture-core: streaming DTW gesture recognition for 6-axis IMU streams
//!
//! Samples (gyro x,y,z and accel x,y,z) arrive one line at a time from a
//! serial device, a recorded CSV or the built-in simulator. The recognizer
//! keeps a bounded window, skips evaluation while the sensor is at rest and
//! otherwise compares the most recent window against pre-recorded templates
//! with dynamic time warping:
//!
//! - Hardware abstraction for line-oriented sample transports
//! - Versioned feature pipeline shared by template building and detection
//! - Threshold, margin and cooldown decision logic
//! - Non-blocking detection event delivery
//! - Layered TOML and environment configuration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use imu_gesture_core::config::ConfigLoader;
//! use imu_gesture_core::hal::SerialLineTransport;
//! use imu_gesture_core::recognizer::{DetectorRunner, GestureRecognizer};
//! use imu_gesture_core::templates::TemplateStore;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load()?;
//!     let store = TemplateStore::from_config(&config.templates);
//!     let templates = Arc::new(store.load_set(&config.templates.gestures)?);
//!
//!     let recognizer = GestureRecognizer::new(config.recognizer.clone(), templates)?;
//!     let transport = SerialLineTransport::open(&config.serial)?;
//!     let summary = DetectorRunner::new(recognizer).run(transport)?;
//!     println!("{} detections", summary.detections);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod processing;
pub mod recognizer;
pub mod templates;
pub mod utils;

pub use config::{ConfigError, ConfigLoader, RecognizerConfig, SystemConfig};
pub use error::{ErrorContext, GestureError, GestureResult};
pub use hal::{ImuSample, LineRead, SampleTransport, TransportError};
pub use recognizer::{DetectionEvent, DetectorRunner, GestureRecognizer, Outcome, StopSignal};
pub use templates::{GestureTemplate, TemplateSet, TemplateStore};
pub use utils::time::{current_timestamp_nanos, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Streaming DTW gesture recognition for 6-axis IMU sample streams".to_string(),
        feature_pipeline_version: processing::FEATURE_PIPELINE_VERSION,
        features: vec![
            "Serial, CSV replay and simulated transports".to_string(),
            "Activity-gated DTW matching".to_string(),
            "Template store with checksums".to_string(),
            "Bounded non-blocking event delivery".to_string(),
        ],
    }
}

#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Feature layout version stored in every template
    pub feature_pipeline_version: u32,
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert_eq!(info.feature_pipeline_version, 1);
        assert!(!info.features.is_empty());
    }
}
