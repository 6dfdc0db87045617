// src/recognizer/events.rs
//! Detection events and the sinks that consume them.
//!
//! The detector loop never blocks on a sink: events go through a bounded
//! crossbeam channel with `try_send`, and a single dispatcher thread hands
//! them to every registered sink in detection order.

use crate::config::EventConfig;
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub gesture_name: String,
    pub distance: f64,
    /// In [0, 100]
    pub confidence_percent: f64,
    pub timestamp_nanos: u64,
}

/// Consumer of detection events, called from the dispatcher thread
pub trait EventSink: Send {
    fn handle(&mut self, event: &DetectionEvent);

    fn name(&self) -> &str;
}

/// Logs every detection at info level
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn handle(&mut self, event: &DetectionEvent) {
        info!(
            gesture = %event.gesture_name,
            distance = event.distance,
            confidence = event.confidence_percent,
            "gesture detected"
        );
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Bounded in-memory history, readable from any thread through [`HistoryHandle`]
pub struct HistorySink {
    events: Arc<Mutex<VecDeque<DetectionEvent>>>,
    capacity: usize,
}

#[derive(Clone)]
pub struct HistoryHandle {
    events: Arc<Mutex<VecDeque<DetectionEvent>>>,
}

impl HistorySink {
    pub fn new(capacity: usize) -> (Self, HistoryHandle) {
        let events = Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024))));
        let handle = HistoryHandle {
            events: Arc::clone(&events),
        };
        (
            Self {
                events,
                capacity: capacity.max(1),
            },
            handle,
        )
    }
}

impl EventSink for HistorySink {
    fn handle(&mut self, event: &DetectionEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }

    fn name(&self) -> &str {
        "history"
    }
}

impl HistoryHandle {
    pub fn snapshot(&self) -> Vec<DetectionEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Maps gesture names to action labels and forwards them to a callback.
///
/// The callback is where device effects (lights, sound, display) are wired in.
pub struct ActionSink {
    actions: BTreeMap<String, String>,
    dispatch: Box<dyn FnMut(&str, &DetectionEvent) + Send>,
}

impl ActionSink {
    pub fn new<F>(actions: BTreeMap<String, String>, dispatch: F) -> Self
    where
        F: FnMut(&str, &DetectionEvent) + Send + 'static,
    {
        Self {
            actions,
            dispatch: Box::new(dispatch),
        }
    }

    /// Action labels are only logged
    pub fn logging(actions: BTreeMap<String, String>) -> Self {
        Self::new(actions, |action, event| {
            info!(action, gesture = %event.gesture_name, "action triggered");
        })
    }
}

impl EventSink for ActionSink {
    fn handle(&mut self, event: &DetectionEvent) {
        match self.actions.get(&event.gesture_name) {
            Some(action) => (self.dispatch)(action, event),
            None => warn!(gesture = %event.gesture_name, "no action mapped for gesture"),
        }
    }

    fn name(&self) -> &str {
        "action"
    }
}

/// Non-blocking handle the detector loop publishes through
#[derive(Clone)]
pub struct EventPublisher {
    sender: Sender<DetectionEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventPublisher {
    /// Returns false when the event was dropped
    pub fn publish(&self, event: DetectionEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(gesture = %event.gesture_name, dropped, "event channel full, dropping detection");
                false
            }
            Err(TrySendError::Disconnected(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(gesture = %event.gesture_name, "event dispatcher gone, dropping detection");
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Owns the dispatcher thread; dropping the last publisher and calling
/// [`EventDispatcher::shutdown`] drains the remaining events
pub struct EventDispatcher {
    publisher: Option<EventPublisher>,
    worker: Option<JoinHandle<u64>>,
}

impl EventDispatcher {
    pub fn spawn(capacity: usize, sinks: Vec<Box<dyn EventSink>>) -> std::io::Result<Self> {
        let (sender, receiver) = bounded(capacity.max(1));
        let names: Vec<String> = sinks.iter().map(|s| s.name().to_string()).collect();

        let worker = std::thread::Builder::new()
            .name("gesture-events".to_string())
            .spawn(move || dispatch_loop(receiver, sinks))?;

        debug!(capacity, sinks = ?names, "event dispatcher started");
        Ok(Self {
            publisher: Some(EventPublisher {
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            }),
            worker: Some(worker),
        })
    }

    /// Dispatcher with the standard sink set: log, bounded history and configured actions
    pub fn from_config(config: &EventConfig) -> std::io::Result<(Self, HistoryHandle)> {
        let (history, handle) = HistorySink::new(config.history_capacity);
        let sinks: Vec<Box<dyn EventSink>> = vec![
            Box::new(LogSink),
            Box::new(history),
            Box::new(ActionSink::logging(config.actions.clone())),
        ];
        let dispatcher = Self::spawn(config.channel_capacity, sinks)?;
        Ok((dispatcher, handle))
    }

    /// A publisher handle; `None` after shutdown
    pub fn publisher(&self) -> Option<EventPublisher> {
        self.publisher.clone()
    }

    /// Close the channel, wait for the worker and return the number of events it delivered.
    /// Outstanding publisher clones must be dropped first or this waits for them.
    pub fn shutdown(&mut self) -> u64 {
        self.publisher = None;
        match self.worker.take() {
            Some(worker) => match worker.join() {
                Ok(delivered) => delivered,
                Err(_) => {
                    warn!("event dispatcher thread panicked");
                    0
                }
            },
            None => 0,
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch_loop(receiver: Receiver<DetectionEvent>, mut sinks: Vec<Box<dyn EventSink>>) -> u64 {
    let mut delivered = 0u64;
    for event in receiver.iter() {
        for sink in sinks.iter_mut() {
            sink.handle(&event);
        }
        delivered += 1;
    }
    debug!(delivered, "event dispatcher stopped");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, ts: u64) -> DetectionEvent {
        DetectionEvent {
            gesture_name: name.to_string(),
            distance: 10.0,
            confidence_percent: 90.0,
            timestamp_nanos: ts,
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let (mut sink, handle) = HistorySink::new(2);
        sink.handle(&event("a", 1));
        sink.handle(&event("b", 2));
        sink.handle(&event("c", 3));
        let names: Vec<String> = handle.snapshot().into_iter().map(|e| e.gesture_name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_action_sink_maps_names() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&fired);
        let mut actions = BTreeMap::new();
        actions.insert("Lumos_Nox".to_string(), "light_toggle".to_string());

        let mut sink = ActionSink::new(actions, move |action, _| captured.lock().push(action.to_string()));
        sink.handle(&event("Lumos_Nox", 1));
        sink.handle(&event("unmapped", 2));
        assert_eq!(*fired.lock(), vec!["light_toggle".to_string()]);
    }

    #[test]
    fn test_dispatcher_preserves_order() {
        let (history, handle) = HistorySink::new(16);
        let mut dispatcher = EventDispatcher::spawn(8, vec![Box::new(history), Box::new(LogSink)]).unwrap();
        {
            let publisher = dispatcher.publisher().unwrap();
            for i in 0..5 {
                assert!(publisher.publish(event("g", i)));
            }
        }
        assert_eq!(dispatcher.shutdown(), 5);
        let stamps: Vec<u64> = handle.snapshot().iter().map(|e| e.timestamp_nanos).collect();
        assert_eq!(stamps, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_configured_dispatcher_keeps_bounded_history() {
        let config = EventConfig {
            channel_capacity: 8,
            history_capacity: 3,
            actions: BTreeMap::new(),
        };
        let (mut dispatcher, history) = EventDispatcher::from_config(&config).unwrap();
        {
            let publisher = dispatcher.publisher().unwrap();
            for i in 0..5 {
                assert!(publisher.publish(event("g", i)));
            }
        }
        assert_eq!(dispatcher.shutdown(), 5);
        let stamps: Vec<u64> = history.snapshot().iter().map(|e| e.timestamp_nanos).collect();
        assert_eq!(stamps, vec![2, 3, 4]);
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (sender, _receiver) = bounded(1);
        let publisher = EventPublisher {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        assert!(publisher.publish(event("a", 1)));
        assert!(!publisher.publish(event("b", 2)));
        assert_eq!(publisher.dropped(), 1);
    }
}
