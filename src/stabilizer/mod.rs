//! Multi-stage motion stabilization.
//!
//! Turns the noisy raw per-axis scalars coming from the tracking
//! collaborator into smooth, recordable 0-100 values, once per axis per
//! frame at the ~90 Hz sampling cadence.
//!
//! ```text
//! MotionFrame ──► PipelineManager ──► per-axis AxisPipeline ──► StabilizedFrame
//!                       ▲                                            │
//!                 StabilizerCommand                            watch broadcast
//!                 (presets, locks)                          (recorder, display)
//! ```
//!
//! The pipeline itself is synchronous and allocation-free; the service in
//! [`service`] wraps it in a tokio task and serializes control commands
//! against frame processing.

pub mod config;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod post_map;
pub mod preset;
pub mod service;
pub mod stages;

pub use config::PipelineConfig;
pub use error::StabilizerError;
pub use manager::{ConfigSnapshot, PipelineManager, NEUTRAL_OUTPUT};
pub use pipeline::AxisPipeline;
pub use preset::StabilizationPreset;
pub use service::{StabilizerCommand, StabilizerHandle};

use crate::axis::AxisMap;

/// One fully processed frame, broadcast to the recorder and the live
/// display.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StabilizedFrame {
    /// Raw per-axis values as delivered by the tracker (pre-stabilization).
    pub raw: AxisMap<f64>,
    /// Stabilized 0-100 values, ready for recording.
    pub mapped: AxisMap<f64>,
    /// Which axes were locked while this frame was produced.
    pub locked: AxisMap<bool>,
    /// Monotonic timestamp of the source frame, seconds.
    pub timestamp: f64,
}
