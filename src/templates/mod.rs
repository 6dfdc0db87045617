// src/templates/mod.rs
//! Gesture templates: in-memory model, on-disk store and the builder that
//! turns a raw recording into normalized variants

pub mod builder;
pub mod model;
pub mod store;

pub use builder::{BuilderConfig, TemplateBuilder};
pub use model::{GestureTemplate, TemplateMetadata, TemplateSet};
pub use store::{TemplateRecord, TemplateStore};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("template '{gesture}' checksum mismatch: stored {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        gesture: String,
        stored: u32,
        computed: u32,
    },

    #[error("template '{gesture}' uses feature pipeline v{found}, this build expects v{expected}")]
    FeatureVersionMismatch {
        gesture: String,
        expected: u32,
        found: u32,
    },

    #[error("template '{gesture}' variant {variant} has {actual} rows, expected {expected}")]
    BadShape {
        gesture: String,
        variant: usize,
        expected: usize,
        actual: usize,
    },

    #[error("template '{0}' has no variants")]
    NoVariants(String),

    #[error("no template named '{0}'")]
    NotFound(String),

    #[error("none of the requested gestures were found: {}", .0.join(", "))]
    NoneFound(Vec<String>),

    #[error("invalid gesture name '{0}'")]
    InvalidName(String),

    #[error("recording for '{gesture}' has {available} usable samples, at least {required} required")]
    InsufficientSamples {
        gesture: String,
        required: usize,
        available: usize,
    },
}
