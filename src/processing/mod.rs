// src/processing/mod.rs
//! Window analysis: activity gating, feature extraction, normalization and DTW matching

pub mod activity;
pub mod dtw;
pub mod features;
pub mod normalize;

pub use activity::{sample_activity, window_activity, ActivityGate, ActivityReading};
pub use dtw::{dtw_distance, DtwMatcher, GestureDistance, MatchReport};
pub use features::{FeatureExtractor, FeatureMatrix, FEATURE_PIPELINE_VERSION};
pub use normalize::{standardize, NormalizedMatrix};

use thiserror::Error;

/// Internal computation errors; length checks upstream should make these unreachable
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    #[error("empty input reached the matcher")]
    EmptyInput,

    #[error("window has {actual} samples, expected {expected}")]
    WindowLength { expected: usize, actual: usize },

    #[error("column count mismatch: {left} vs {right}")]
    ColumnMismatch { left: usize, right: usize },

    #[error("no templates to match against")]
    NoTemplates,

    #[error("matching gesture '{gesture}' variant {variant} failed: {source}")]
    Matching {
        gesture: String,
        variant: usize,
        #[source]
        source: Box<ProcessingError>,
    },
}
