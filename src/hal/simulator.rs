// src/hal/simulator.rs
//! Synthetic IMU source for demos, tests and benchmarks
//!
//! Emits rest noise and, on a fixed schedule, one of a few scripted motions.
//! Output is deterministic for a given seed.

use crate::hal::traits::{LineRead, SampleTransport, TransportError};
use crate::hal::types::ImuSample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const GRAVITY: f64 = 9.81;

/// Scripted motions the simulator can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulatedMotion {
    /// Wrist circle in the x/y plane
    Circle,
    /// Single sharp flick around z
    Flick,
    /// Fast side-to-side shake
    Shake,
}

impl SimulatedMotion {
    pub fn name(&self) -> &'static str {
        match self {
            SimulatedMotion::Circle => "circle",
            SimulatedMotion::Flick => "flick",
            SimulatedMotion::Shake => "shake",
        }
    }

    /// Noise-free sample at `phase` in [0, 1)
    pub fn sample_at(&self, phase: f64, amplitude: f64) -> ImuSample {
        let theta = 2.0 * PI * phase;
        match self {
            SimulatedMotion::Circle => ImuSample::from_parts(
                [amplitude * theta.sin(), amplitude * theta.cos(), 0.1 * amplitude],
                [0.5 * theta.cos(), 0.5 * theta.sin(), GRAVITY],
            ),
            SimulatedMotion::Flick => {
                let bump = (-((phase - 0.5) / 0.12).powi(2)).exp();
                ImuSample::from_parts(
                    [0.2 * amplitude * bump, 0.0, 3.0 * amplitude * bump],
                    [4.0 * bump * (theta).sin(), 0.0, GRAVITY - 2.0 * bump],
                )
            }
            SimulatedMotion::Shake => ImuSample::from_parts(
                [amplitude * (4.0 * theta).sin(), 0.0, 0.3 * amplitude * (4.0 * theta).cos()],
                [3.0 * (4.0 * theta).cos(), 0.0, GRAVITY],
            ),
        }
    }

    /// `length` noise-free samples spanning one full motion
    pub fn render(&self, length: usize, amplitude: f64) -> Vec<ImuSample> {
        (0..length)
            .map(|i| self.sample_at(i as f64 / length.max(1) as f64, amplitude))
            .collect()
    }
}

/// Simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub seed: u64,
    /// Rest samples between motions
    pub rest_samples: usize,
    /// Samples per motion
    pub motion_samples: usize,
    /// Motions performed in order, repeating
    pub schedule: Vec<SimulatedMotion>,
    pub amplitude: f64,
    /// Uniform noise half-width added to every axis
    pub noise_level: f64,
    /// Probability of emitting a corrupted record instead of a sample
    pub corrupt_probability: f64,
    /// Stop after this many records
    pub max_records: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            rest_samples: 60,
            motion_samples: 80,
            schedule: vec![SimulatedMotion::Circle, SimulatedMotion::Flick, SimulatedMotion::Shake],
            amplitude: 2.0,
            noise_level: 0.01,
            corrupt_probability: 0.0,
            max_records: None,
        }
    }
}

/// Synthetic transport producing CSV sample records
pub struct ImuSimulator {
    config: SimulatorConfig,
    rng: StdRng,
    position: u64,
    records: u64,
    closed: bool,
}

impl ImuSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            position: 0,
            records: 0,
            closed: false,
        }
    }

    pub fn records_emitted(&self) -> u64 {
        self.records
    }

    /// Motion active at the current position, if any
    fn current_motion(&self) -> Option<(SimulatedMotion, f64)> {
        let cycle = (self.config.rest_samples + self.config.motion_samples) as u64;
        if cycle == 0 || self.config.schedule.is_empty() || self.config.motion_samples == 0 {
            return None;
        }
        let cycle_index = self.position / cycle;
        let offset = (self.position % cycle) as usize;
        if offset < self.config.rest_samples {
            return None;
        }
        let motion = self.config.schedule[(cycle_index % self.config.schedule.len() as u64) as usize];
        let phase = (offset - self.config.rest_samples) as f64 / self.config.motion_samples as f64;
        Some((motion, phase))
    }

    /// Next sample including noise
    pub fn next_sample(&mut self) -> ImuSample {
        let base = match self.current_motion() {
            Some((motion, phase)) => motion.sample_at(phase, self.config.amplitude),
            None => ImuSample::from_parts([0.0; 3], [0.0, 0.0, GRAVITY]),
        };
        self.position += 1;

        let noise = self.config.noise_level.abs();
        if noise == 0.0 {
            return base;
        }
        let mut values = *base.values();
        for value in values.iter_mut() {
            *value += self.rng.gen_range(-noise..=noise);
        }
        ImuSample::new(values)
    }
}

impl SampleTransport for ImuSimulator {
    fn read_line(&mut self) -> Result<LineRead, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if let Some(max) = self.config.max_records {
            if self.records >= max {
                return Ok(LineRead::Closed);
            }
        }
        self.records += 1;

        if self.config.corrupt_probability > 0.0 && self.rng.gen_bool(self.config.corrupt_probability.min(1.0)) {
            return Ok(LineRead::Line("0.1,0.2,#ERR".to_string()));
        }
        Ok(LineRead::Line(self.next_sample().to_csv_line()))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.closed = true;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("simulator(seed={})", self.config.seed)
    }
}
