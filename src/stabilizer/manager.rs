//! Pipeline ownership, preset switching and axis locking.
//!
//! [`PipelineManager`] is the synchronous core the service task owns
//! exclusively. The hot path is [`process`](PipelineManager::process),
//! called once per axis per frame; preset changes and lock operations are
//! control-path calls applied between frames by whoever owns the manager.
//!
//! The active configuration lives in an immutable [`Arc`] snapshot with
//! the kind-scaled variants precomputed. `set_preset` builds a fresh
//! snapshot and swaps the pointer, so the hot path never observes a
//! half-updated parameter set and never waits on the control path.

use crate::axis::{Axis, AxisKind, AxisMap};
use crate::stabilizer::config::PipelineConfig;
use crate::stabilizer::pipeline::AxisPipeline;
use crate::stabilizer::preset::StabilizationPreset;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Output value used before an axis has produced anything: the midpoint
/// of the 0-100 recording scale.
pub const NEUTRAL_OUTPUT: f64 = 50.0;

/// Immutable configuration snapshot shared by all axes.
///
/// The position/rotation variants are derived once at construction so the
/// per-frame lookup is a plain field access.
#[derive(Clone, Debug)]
pub struct ConfigSnapshot {
    preset: StabilizationPreset,
    position: PipelineConfig,
    rotation: PipelineConfig,
}

impl ConfigSnapshot {
    pub fn from_preset(preset: StabilizationPreset) -> Self {
        let nominal = preset.config();
        debug_assert!(nominal.validate().is_ok(), "preset table must validate");
        Self {
            preset,
            position: nominal.scaled_for(AxisKind::Position),
            rotation: nominal.scaled_for(AxisKind::Rotation),
        }
    }

    pub fn preset(&self) -> StabilizationPreset {
        self.preset
    }

    pub fn for_kind(&self, kind: AxisKind) -> &PipelineConfig {
        match kind {
            AxisKind::Position => &self.position,
            AxisKind::Rotation => &self.rotation,
        }
    }
}

/// Owns one [`AxisPipeline`] per axis plus the lock and preset state.
#[derive(Debug)]
pub struct PipelineManager {
    pipelines: AxisMap<AxisPipeline>,
    config: Arc<ConfigSnapshot>,
    /// `Some(captured)` while the axis is locked.
    locks: AxisMap<Option<f64>>,
    /// Last value emitted per axis, the fallback for transient faults.
    last_output: AxisMap<Option<f64>>,
}

impl Default for PipelineManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineManager {
    /// Creates a manager with the default Medium preset and empty stage
    /// state on every axis.
    pub fn new() -> Self {
        Self::with_preset(StabilizationPreset::default())
    }

    pub fn with_preset(preset: StabilizationPreset) -> Self {
        info!("Creating pipeline manager with preset: {}", preset);
        Self {
            pipelines: AxisMap::from_fn(AxisPipeline::new),
            config: Arc::new(ConfigSnapshot::from_preset(preset)),
            locks: AxisMap::default(),
            last_output: AxisMap::default(),
        }
    }

    pub fn preset(&self) -> StabilizationPreset {
        self.config.preset()
    }

    /// Runs one raw sample for one axis through its pipeline.
    ///
    /// Hot path: no allocation, no locking, no I/O. A locked axis
    /// short-circuits to its captured value. Non-finite input is treated
    /// as a transient fault and answered with the previous output; the
    /// same guard covers the mapper's result, so the returned value is
    /// always finite.
    pub fn process<F>(&mut self, axis: Axis, raw: f64, timestamp: f64, map: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        if let Some(captured) = self.locks[axis] {
            return captured;
        }

        let fallback = self.last_output[axis].unwrap_or(NEUTRAL_OUTPUT);
        if !raw.is_finite() {
            return fallback;
        }

        let config = Arc::clone(&self.config);
        let output = self.pipelines[axis].process(config.for_kind(axis.kind()), raw, timestamp, map);
        let output = if output.is_finite() { output } else { fallback };

        self.last_output[axis] = Some(output);
        output
    }

    /// Swaps the parameter snapshot for all axes at once.
    ///
    /// Accumulated stage state is deliberately kept so the output stays
    /// continuous across the change.
    pub fn set_preset(&mut self, preset: StabilizationPreset) {
        if preset == self.config.preset() {
            debug!("Preset {} already active", preset);
            return;
        }
        info!("Switching stabilization preset: {} -> {}", self.config.preset(), preset);
        self.config = Arc::new(ConfigSnapshot::from_preset(preset));
    }

    /// Freezes an axis at its current stabilized value.
    ///
    /// Every `process` call until [`unlock_axis`](Self::unlock_axis)
    /// returns the captured value and leaves all stage state untouched.
    /// Returns the captured value.
    pub fn lock_axis(&mut self, axis: Axis) -> f64 {
        if let Some(captured) = self.locks[axis] {
            warn!("Axis {} is already locked", axis);
            return captured;
        }
        let captured = self.last_output[axis].unwrap_or(NEUTRAL_OUTPUT);
        info!("Locking axis {} at {:.1}", axis, captured);
        self.locks[axis] = Some(captured);
        captured
    }

    /// Releases a locked axis and clears its stage state.
    ///
    /// The next sample reseeds every stage, so live tracking resumes from
    /// the controller's actual position without a snap from the pre-lock
    /// trajectory.
    pub fn unlock_axis(&mut self, axis: Axis) {
        if self.locks[axis].take().is_some() {
            info!("Unlocking axis {}", axis);
            self.pipelines[axis].reset();
        } else {
            debug!("Unlock requested for axis {} which was not locked", axis);
        }
    }

    pub fn is_locked(&self, axis: Axis) -> bool {
        self.locks[axis].is_some()
    }

    /// Snapshot of the lock flags, canonical axis order.
    pub fn lock_flags(&self) -> AxisMap<bool> {
        AxisMap::from_fn(|axis| self.is_locked(axis))
    }

    /// Clears stage state on one axis without touching its lock.
    pub fn reset_axis(&mut self, axis: Axis) {
        debug!("Resetting stage state for axis {}", axis);
        self.pipelines[axis].reset();
    }

    /// Clears all stage state and fault fallbacks, e.g. when a new
    /// tracking or recording session starts. Locks are released too.
    pub fn reset_all(&mut self) {
        info!("Resetting all axis pipelines");
        for axis in Axis::ALL {
            self.pipelines[axis].reset();
            self.locks[axis] = None;
            self.last_output[axis] = None;
        }
    }
}
