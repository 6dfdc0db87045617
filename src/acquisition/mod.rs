// src/acquisition/mod.rs
//! Sample buffering ahead of the feature pipeline

pub mod window_buffer;

pub use window_buffer::WindowBuffer;
