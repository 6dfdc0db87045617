// src/recognizer/state.rs
//! Mutable per-stream detector state, owned by the loop that feeds samples

use crate::acquisition::WindowBuffer;
use crate::hal::types::ImuSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    Idle,
    Cooldown,
}

#[derive(Debug, Clone)]
pub struct DetectorState {
    buffer: WindowBuffer,
    cooldown: usize,
    evaluation_counter: usize,
}

impl DetectorState {
    pub fn new(detection_window: usize) -> Self {
        Self {
            buffer: WindowBuffer::new(detection_window),
            cooldown: 0,
            evaluation_counter: 0,
        }
    }

    pub fn phase(&self) -> DetectorPhase {
        if self.cooldown > 0 {
            DetectorPhase::Cooldown
        } else {
            DetectorPhase::Idle
        }
    }

    pub fn buffer(&self) -> &WindowBuffer {
        &self.buffer
    }

    pub fn cooldown(&self) -> usize {
        self.cooldown
    }

    pub fn evaluation_counter(&self) -> usize {
        self.evaluation_counter
    }

    pub(crate) fn push(&mut self, sample: ImuSample) {
        self.buffer.push(sample);
    }

    /// Decrement and return the remaining cooldown
    pub(crate) fn tick_cooldown(&mut self) -> usize {
        self.cooldown = self.cooldown.saturating_sub(1);
        self.cooldown
    }

    /// Count one sample towards the next evaluation, returning the new count
    pub(crate) fn tick_evaluation(&mut self) -> usize {
        self.evaluation_counter += 1;
        self.evaluation_counter
    }

    pub(crate) fn reset_evaluation(&mut self) {
        self.evaluation_counter = 0;
    }

    /// Post-detection reset: empty buffer, cooldown armed
    pub(crate) fn enter_cooldown(&mut self, samples: usize) {
        self.buffer.clear();
        self.cooldown = samples;
    }

    /// Back to a fresh start, keeping the buffer capacity
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cooldown = 0;
        self.evaluation_counter = 0;
    }
}
