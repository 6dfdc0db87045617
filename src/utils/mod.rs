//! Small shared helpers

pub mod time;

pub use time::{current_timestamp_nanos, MockTimeProvider, SystemTimeProvider, TimeProvider};
