// src/templates/builder.rs
//! Builds a gesture template from a raw recording.
//!
//! The recording is range-filtered, the most active `template_length` window
//! becomes the first variant, and long recordings contribute a second variant
//! cut from their centre. Both go through the same feature and normalization
//! path the live recognizer uses.

use crate::config::constants::templates::SECOND_VARIANT_MIN_LENGTHS;
use crate::config::RecognizerConfig;
use crate::hal::serial_driver::LineTransport;
use crate::hal::traits::{LineRead, SampleTransport, TransportError};
use crate::hal::types::{parse_sample_line, ImuSample, SensorLimits};
use crate::processing::features::temporal_features;
use crate::processing::{sample_activity, standardize};
use crate::templates::{GestureTemplate, TemplateError, TemplateMetadata};
use crate::utils::time::{SystemTimeProvider, TimeProvider};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub template_length: usize,
    pub min_activity: f64,
    pub limits: SensorLimits,
}

impl From<&RecognizerConfig> for BuilderConfig {
    fn from(config: &RecognizerConfig) -> Self {
        Self {
            template_length: config.template_length,
            min_activity: config.min_activity,
            limits: SensorLimits::default(),
        }
    }
}

pub struct TemplateBuilder {
    config: BuilderConfig,
    clock: Arc<dyn TimeProvider>,
}

impl TemplateBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemTimeProvider),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn build(&self, name: &str, recording: &[ImuSample]) -> Result<GestureTemplate, TemplateError> {
        let length = self.config.template_length;
        let samples: Vec<ImuSample> = recording
            .iter()
            .filter(|s| self.config.limits.contains(s))
            .copied()
            .collect();

        let dropped = recording.len() - samples.len();
        if dropped > 0 {
            debug!(gesture = name, dropped, "dropped out-of-range samples");
        }
        if length == 0 || samples.len() < length {
            return Err(TemplateError::InsufficientSamples {
                gesture: name.to_string(),
                required: length.max(1),
                available: samples.len(),
            });
        }

        let activity: Vec<f64> = samples.iter().map(sample_activity).collect();
        let active = active_count(&activity, self.config.min_activity);
        if active < length {
            warn!(
                gesture = name,
                active,
                required = length,
                "few active samples in recording, template may be weak"
            );
        }

        let (best_start, best_activity) = most_active_window(&activity, length);
        let mut variants = vec![standardize(&temporal_features(&samples[best_start..best_start + length]))];

        if samples.len() >= SECOND_VARIANT_MIN_LENGTHS * length {
            let center = samples.len() / 2 - length / 2;
            variants.push(standardize(&temporal_features(&samples[center..center + length])));
        }

        info!(
            gesture = name,
            samples = samples.len(),
            variants = variants.len(),
            window_start = best_start,
            avg_activity = best_activity,
            "built template"
        );

        GestureTemplate::new(
            name,
            length,
            variants,
            TemplateMetadata {
                created_at_nanos: self.clock.now_nanos(),
                samples_used: samples.len(),
                avg_activity: best_activity,
            },
        )
    }

    /// Read a recorded CSV, skipping the header and any unparseable rows.
    /// Rows are decoded as Latin-1 like live serial records.
    pub fn read_recording(path: &Path) -> Result<Vec<ImuSample>, TemplateError> {
        let file = File::open(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut transport = LineTransport::from_reader(BufReader::new(file), path.display().to_string());

        let mut samples = Vec::new();
        let mut skipped = 0usize;
        loop {
            let line = match transport.read_line() {
                Ok(LineRead::Line(line)) => line,
                Ok(LineRead::Pending) => continue,
                Ok(LineRead::Closed) => break,
                Err(TransportError::Read { source, .. }) | Err(TransportError::Open { source, .. }) => {
                    return Err(TemplateError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
                }
                Err(TransportError::Closed) => break,
            };
            match parse_sample_line(&line, None) {
                Ok(sample) => samples.push(sample),
                Err(_) => skipped += 1,
            }
        }
        debug!(
            path = %path.display(),
            samples = samples.len(),
            skipped,
            oversized = transport.stats().oversized_lines,
            "read recording"
        );
        Ok(samples)
    }
}

/// Samples strictly above the activity threshold
fn active_count(activity: &[f64], min_activity: f64) -> usize {
    activity.iter().filter(|&&a| a > min_activity).count()
}

/// Start index and mean of the window with the highest mean activity; earliest wins ties
fn most_active_window(activity: &[f64], length: usize) -> (usize, f64) {
    let mut sum: f64 = activity[..length].iter().sum();
    let mut best = (0, sum);
    for start in 1..=activity.len() - length {
        sum += activity[start + length - 1] - activity[start - 1];
        if sum > best.1 {
            best = (start, sum);
        }
    }
    (best.0, best.1 / length as f64)
}
