// src/recognizer/mod.rs
//! Streaming gesture recognition: detector state, decision engine, event
//! delivery and the loop that ties a transport to all of them

pub mod engine;
pub mod events;
pub mod runner;
pub mod state;

pub use engine::{GestureRecognizer, Outcome, RecognizerStats};
pub use events::{
    ActionSink, DetectionEvent, EventDispatcher, EventPublisher, EventSink, HistoryHandle, HistorySink,
    LogSink,
};
pub use runner::{DetectorRunner, RunSummary, StopReason, StopSignal};
pub use state::{DetectorPhase, DetectorState};
