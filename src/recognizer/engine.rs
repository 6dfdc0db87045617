// src/recognizer/engine.rs
//! Per-sample decision engine: buffering, step gating, activity gate,
//! DTW matching, threshold and margin checks, cooldown

use crate::config::RecognizerConfig;
use crate::error::{GestureError, GestureResult};
use crate::error_context;
use crate::hal::types::{parse_sample_line, ImuSample, SensorLimits};
use crate::processing::{
    standardize, ActivityGate, DtwMatcher, FeatureExtractor, GestureDistance, ProcessingError,
};
use crate::recognizer::events::DetectionEvent;
use crate::recognizer::state::DetectorState;
use crate::templates::TemplateSet;
use crate::utils::time::{SystemTimeProvider, TimeProvider};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// What happened for one accepted sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    /// Still suppressing after a detection
    Cooldown { remaining: usize },
    /// Not an evaluation step, or the buffer is shorter than a template
    Accumulating,
    /// Evaluated, but the window was below the activity floor
    Idle { activity: f64 },
    /// Best distance above the threshold
    NoMatch {
        distances: Vec<GestureDistance>,
        activity: f64,
    },
    /// Within the threshold but too close to another gesture
    Ambiguous {
        best: String,
        best_distance: f64,
        runner_up: String,
        second_best_distance: f64,
        distances: Vec<GestureDistance>,
    },
    Detected(DetectionEvent),
}

impl Outcome {
    pub fn detection(&self) -> Option<&DetectionEvent> {
        match self {
            Outcome::Detected(event) => Some(event),
            _ => None,
        }
    }
}

/// Running totals, for logs and run summaries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognizerStats {
    pub accepted: u64,
    pub rejected: u64,
    pub cooldown_samples: u64,
    pub evaluations: u64,
    pub idle: u64,
    pub no_match: u64,
    pub ambiguous: u64,
    pub detections: u64,
}

pub struct GestureRecognizer {
    config: RecognizerConfig,
    templates: Arc<TemplateSet>,
    state: DetectorState,
    gate: ActivityGate,
    extractor: FeatureExtractor,
    matcher: DtwMatcher,
    limits: Option<SensorLimits>,
    clock: Arc<dyn TimeProvider>,
    stats: RecognizerStats,
}

impl GestureRecognizer {
    /// Validates the options and checks they agree with the template set
    pub fn new(config: RecognizerConfig, templates: Arc<TemplateSet>) -> GestureResult<Self> {
        config.validate()?;
        templates.ensure_length(config.template_length)?;

        let limits = config.reject_out_of_range.then(SensorLimits::default);
        info!(
            gestures = templates.len(),
            template_length = config.template_length,
            detection_window = config.detection_window,
            step_size = config.step_size,
            threshold = config.dtw_threshold,
            "recognizer ready"
        );

        Ok(Self {
            state: DetectorState::new(config.detection_window),
            gate: ActivityGate::new(config.min_activity),
            extractor: FeatureExtractor::new(config.template_length),
            matcher: DtwMatcher::new(),
            limits,
            clock: Arc::new(SystemTimeProvider),
            stats: RecognizerStats::default(),
            config,
            templates,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_matcher(mut self, matcher: DtwMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn templates(&self) -> &Arc<TemplateSet> {
        &self.templates
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn stats(&self) -> &RecognizerStats {
        &self.stats
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Parse one transport record and process it. Malformed records are
    /// counted and yield `Ok(None)` without touching the detector state.
    pub fn process_line(&mut self, line: &str) -> GestureResult<Option<Outcome>> {
        match parse_sample_line(line, self.limits.as_ref()) {
            Ok(sample) => self.process_sample(sample).map(Some),
            Err(reason) => {
                self.stats.rejected += 1;
                trace!(%reason, "discarded record");
                Ok(None)
            }
        }
    }

    pub fn process_sample(&mut self, sample: ImuSample) -> GestureResult<Outcome> {
        self.stats.accepted += 1;
        self.state.push(sample);

        if self.state.cooldown() > 0 {
            let remaining = self.state.tick_cooldown();
            self.stats.cooldown_samples += 1;
            return Ok(Outcome::Cooldown { remaining });
        }

        let counter = self.state.tick_evaluation();
        if counter < self.config.step_size || self.state.buffer().len() < self.config.template_length {
            return Ok(Outcome::Accumulating);
        }
        self.state.reset_evaluation();

        self.evaluate()
    }

    fn evaluate(&mut self) -> GestureResult<Outcome> {
        self.stats.evaluations += 1;
        let evaluation = self.stats.evaluations;

        let window = self
            .state
            .buffer()
            .last(self.config.template_length)
            .ok_or_else(|| self.internal_error(ProcessingError::WindowLength {
                expected: self.config.template_length,
                actual: self.state.buffer().len(),
            }))?;

        let reading = self.gate.evaluate(&window);
        if !reading.is_active {
            self.stats.idle += 1;
            trace!(evaluation, activity = reading.activity, "window below activity floor");
            return Ok(Outcome::Idle {
                activity: reading.activity,
            });
        }

        let features = self
            .extractor
            .extract(&window)
            .map_err(|e| self.internal_error(e))?;
        let live = standardize(&features);
        let report = self
            .matcher
            .match_window(&live, &self.templates)
            .map_err(|e| self.internal_error(e))?;

        let best = match report.best() {
            Some(best) => best.clone(),
            None => {
                return Err(self.internal_error(ProcessingError::NoTemplates));
            }
        };
        let second_best_distance = report.second_best_distance();

        debug!(
            evaluation,
            activity = reading.activity,
            best = %best.gesture,
            best_distance = best.distance,
            second_best_distance,
            "window evaluated"
        );

        if best.distance > self.config.dtw_threshold {
            self.stats.no_match += 1;
            return Ok(Outcome::NoMatch {
                distances: report.into_distances(),
                activity: reading.activity,
            });
        }

        if second_best_distance - best.distance <= self.config.similarity_margin {
            self.stats.ambiguous += 1;
            let runner_up = report
                .runner_up()
                .map(|d| d.gesture.clone())
                .unwrap_or_default();
            debug!(
                best = %best.gesture,
                runner_up = %runner_up,
                gap = second_best_distance - best.distance,
                "ambiguous match"
            );
            return Ok(Outcome::Ambiguous {
                best: best.gesture,
                best_distance: best.distance,
                runner_up,
                second_best_distance,
                distances: report.into_distances(),
            });
        }

        let confidence_percent = (100.0 * (1.0 - best.distance / self.config.dtw_threshold)).clamp(0.0, 100.0);
        let event = DetectionEvent {
            gesture_name: best.gesture,
            distance: best.distance,
            confidence_percent,
            timestamp_nanos: self.clock.now_nanos(),
        };

        self.state.enter_cooldown(self.config.cooldown_samples);
        self.stats.detections += 1;
        info!(
            gesture = %event.gesture_name,
            distance = event.distance,
            confidence = event.confidence_percent,
            cooldown = self.config.cooldown_samples,
            "detection"
        );
        Ok(Outcome::Detected(event))
    }

    fn internal_error(&self, error: ProcessingError) -> GestureError {
        let context = error_context!("recognizer", "evaluate")
            .add_info("evaluation", self.stats.evaluations)
            .add_info("accepted", self.stats.accepted)
            .add_info("buffered", self.state.buffer().len());
        GestureError::from(error).with_context(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::processing::NormalizedMatrix;
    use crate::templates::{GestureTemplate, TemplateMetadata};
    use ndarray::Array2;

    fn config(length: usize) -> RecognizerConfig {
        RecognizerConfig {
            template_length: length,
            detection_window: length + 5,
            step_size: 2,
            ..RecognizerConfig::default()
        }
    }

    fn set(length: usize) -> Arc<TemplateSet> {
        let template = GestureTemplate::new(
            "g",
            length,
            vec![NormalizedMatrix::from_stored(Array2::zeros((length, 8)))],
            TemplateMetadata::default(),
        )
        .unwrap();
        Arc::new(TemplateSet::new(vec![template]).unwrap())
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let result = GestureRecognizer::new(config(10), set(12));
        assert!(matches!(
            result,
            Err(GestureError::Configuration {
                error: ConfigError::TemplateLengthConfigMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_lines_are_counted() {
        let mut recognizer = GestureRecognizer::new(config(10), set(10)).unwrap();
        assert_eq!(recognizer.process_line("1,2,3").unwrap(), None);
        assert_eq!(recognizer.process_line("a,b,c,d,e,f").unwrap(), None);
        assert!(recognizer.process_line("0,0,0,0,0,9.8").unwrap().is_some());
        assert_eq!(recognizer.stats().rejected, 2);
        assert_eq!(recognizer.stats().accepted, 1);
        assert_eq!(recognizer.state().buffer().len(), 1);
    }

    #[test]
    fn test_out_of_range_rejected_when_enabled() {
        let mut cfg = config(10);
        cfg.reject_out_of_range = true;
        let mut recognizer = GestureRecognizer::new(cfg, set(10)).unwrap();
        assert_eq!(recognizer.process_line("3000,0,0,0,0,0").unwrap(), None);
        assert_eq!(recognizer.stats().rejected, 1);
    }

    #[test]
    fn test_accumulates_until_window_full() {
        let mut recognizer = GestureRecognizer::new(config(10), set(10)).unwrap();
        for _ in 0..9 {
            let outcome = recognizer.process_sample(ImuSample::new([0.0; 6])).unwrap();
            assert_eq!(outcome, Outcome::Accumulating);
        }
        assert_eq!(recognizer.stats().evaluations, 0);
    }

    #[test]
    fn test_evaluates_every_step() {
        let mut recognizer = GestureRecognizer::new(config(10), set(10)).unwrap();
        for _ in 0..20 {
            recognizer.process_sample(ImuSample::new([0.0; 6])).unwrap();
        }
        // first at sample 10, then every second sample
        assert_eq!(recognizer.stats().evaluations, 6);
        assert_eq!(recognizer.stats().idle, 6);
    }
}
