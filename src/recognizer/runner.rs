// src/recognizer/runner.rs
//! The consumer loop: poll a transport, feed the recognizer, publish detections

use crate::error::{GestureError, GestureResult};
use crate::error_context;
use crate::hal::{LineRead, SampleTransport, TransportError};
use crate::recognizer::engine::{GestureRecognizer, Outcome, RecognizerStats};
use crate::recognizer::events::EventPublisher;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Cooperative cancellation flag shared between the loop and its controllers
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Stopped,
    TransportClosed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub reason: StopReason,
    pub lines: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub evaluations: u64,
    pub idle: u64,
    pub no_match: u64,
    pub ambiguous: u64,
    pub detections: u64,
    pub dropped_events: u64,
}

impl RunSummary {
    fn new(reason: StopReason, lines: u64, stats: &RecognizerStats, dropped_events: u64) -> Self {
        Self {
            reason,
            lines,
            accepted: stats.accepted,
            rejected: stats.rejected,
            evaluations: stats.evaluations,
            idle: stats.idle,
            no_match: stats.no_match,
            ambiguous: stats.ambiguous,
            detections: stats.detections,
            dropped_events,
        }
    }
}

/// Closes the wrapped transport exactly once, on whichever path leaves first
struct TransportGuard<T: SampleTransport> {
    transport: T,
    closed: bool,
}

impl<T: SampleTransport> TransportGuard<T> {
    fn new(transport: T) -> Self {
        Self {
            transport,
            closed: false,
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.transport.close()
    }
}

impl<T: SampleTransport> Drop for TransportGuard<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(transport = %self.transport.describe(), error = %e, "closing transport failed");
        }
    }
}

pub struct DetectorRunner {
    recognizer: GestureRecognizer,
    publisher: Option<EventPublisher>,
    stop: StopSignal,
    idle_sleep: Duration,
}

impl DetectorRunner {
    pub fn new(recognizer: GestureRecognizer) -> Self {
        Self {
            recognizer,
            publisher: None,
            stop: StopSignal::new(),
            idle_sleep: Duration::from_millis(crate::config::constants::serial::DEFAULT_IDLE_SLEEP_MS),
        }
    }

    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn recognizer(&self) -> &GestureRecognizer {
        &self.recognizer
    }

    /// Run until stopped or the transport closes. Transport and internal
    /// errors end the loop; the transport is released on every path.
    pub fn run<T: SampleTransport>(&mut self, transport: T) -> GestureResult<RunSummary> {
        let mut guard = TransportGuard::new(transport);
        let description = guard.transport.describe();
        info!(transport = %description, "detector loop started");

        let mut lines = 0u64;
        let reason = loop {
            if self.stop.is_stopped() {
                break StopReason::Stopped;
            }

            let read = guard.transport.read_line().map_err(|e| {
                error!(transport = %description, error = %e, "transport failed");
                GestureError::from(e).with_context(
                    error_context!("runner", "read_line").add_info("transport", &description),
                )
            })?;

            match read {
                LineRead::Line(line) => {
                    lines += 1;
                    let outcome = self.recognizer.process_line(&line).map_err(|e| {
                        error!(error = %e, line = lines, "evaluation failed");
                        e
                    })?;
                    if let Some(Outcome::Detected(event)) = outcome {
                        if let Some(publisher) = &self.publisher {
                            publisher.publish(event);
                        }
                    }
                }
                LineRead::Pending => std::thread::sleep(self.idle_sleep),
                LineRead::Closed => break StopReason::TransportClosed,
            }
        };

        if let Err(e) = guard.close() {
            warn!(transport = %description, error = %e, "closing transport failed");
        }

        let dropped = self.publisher.as_ref().map_or(0, EventPublisher::dropped);
        let summary = RunSummary::new(reason, lines, self.recognizer.stats(), dropped);
        info!(
            reason = ?summary.reason,
            lines = summary.lines,
            detections = summary.detections,
            rejected = summary.rejected,
            "detector loop finished"
        );
        debug!(?summary, "run summary");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecognizerConfig;
    use crate::processing::NormalizedMatrix;
    use crate::templates::{GestureTemplate, TemplateMetadata, TemplateSet};
    use ndarray::Array2;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedTransport {
        reads: VecDeque<Result<LineRead, TransportError>>,
        closes: Arc<AtomicUsize>,
    }

    impl SampleTransport for ScriptedTransport {
        fn read_line(&mut self) -> Result<LineRead, TransportError> {
            self.reads.pop_front().unwrap_or(Ok(LineRead::Closed))
        }

        fn close(&mut self) -> Result<(), TransportError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn runner() -> DetectorRunner {
        let template = GestureTemplate::new(
            "g",
            4,
            vec![NormalizedMatrix::from_stored(Array2::zeros((4, 8)))],
            TemplateMetadata::default(),
        )
        .unwrap();
        let config = RecognizerConfig {
            template_length: 4,
            detection_window: 8,
            step_size: 1,
            ..RecognizerConfig::default()
        };
        let recognizer =
            GestureRecognizer::new(config, Arc::new(TemplateSet::new(vec![template]).unwrap())).unwrap();
        DetectorRunner::new(recognizer).with_idle_sleep(Duration::from_millis(0))
    }

    fn transport(reads: Vec<Result<LineRead, TransportError>>) -> (ScriptedTransport, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        (
            ScriptedTransport {
                reads: reads.into(),
                closes: Arc::clone(&closes),
            },
            closes,
        )
    }

    #[test]
    fn test_eof_ends_loop_and_closes_once() {
        let (t, closes) = transport(vec![
            Ok(LineRead::Line("0,0,0,0,0,9.8".to_string())),
            Ok(LineRead::Pending),
            Ok(LineRead::Line("garbage".to_string())),
        ]);
        let summary = runner().run(t).unwrap();
        assert_eq!(summary.reason, StopReason::TransportClosed);
        assert_eq!(summary.lines, 2);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transport_error_is_fatal_and_releases() {
        let (t, closes) = transport(vec![Err(TransportError::Closed)]);
        let result = runner().run(t);
        assert!(matches!(result, Err(GestureError::Transport { .. })));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_signal_checked_first() {
        let (t, closes) = transport(vec![Ok(LineRead::Line("0,0,0,0,0,0".to_string()))]);
        let mut runner = runner();
        runner.stop_signal().stop();
        let summary = runner.run(t).unwrap();
        assert_eq!(summary.reason, StopReason::Stopped);
        assert_eq!(summary.lines, 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
