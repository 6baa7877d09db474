//! Per-axis stage chain.
//!
//! ```text
//! raw ──► SpikeReject ──► OneEuro ──► Slew ──► Jerk ──► [mapper 0-100]
//!                                                           │
//!                   stabilized ◄── Hysteresis ◄── Deadzone ◄┘
//! ```
//!
//! Stage order is fixed; disabled stages are skipped transparently. The
//! calibration mapper sits between the two halves and is injected by the
//! caller; the pipeline never owns calibration data.

use crate::axis::Axis;
use crate::stabilizer::config::PipelineConfig;
use crate::stabilizer::post_map::{Deadzone, Hysteresis};
use crate::stabilizer::stages::{
    FilterStage, JerkLimiter, OneEuroFilter, SlewRateLimiter, SpikeRejector, MIN_DT,
};

/// Complete stabilization chain for a single axis.
///
/// Holds only state; parameters arrive with every call as an immutable
/// config so that preset swaps never disturb accumulated stage state.
#[derive(Clone, Debug)]
pub struct AxisPipeline {
    axis: Axis,
    last_timestamp: Option<f64>,
    spike: SpikeRejector,
    one_euro: OneEuroFilter,
    slew: SlewRateLimiter,
    jerk: JerkLimiter,
    deadzone: Deadzone,
    hysteresis: Hysteresis,
}

impl AxisPipeline {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            last_timestamp: None,
            spike: SpikeRejector::default(),
            one_euro: OneEuroFilter::default(),
            slew: SlewRateLimiter::default(),
            jerk: JerkLimiter::default(),
            deadzone: Deadzone::default(),
            hysteresis: Hysteresis::default(),
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Runs one raw sample through the full chain.
    ///
    /// `config` must already be scaled for this axis's kind. `map` is the
    /// externally owned pure calibration function taking the stabilized
    /// raw value to the 0-100 recording scale.
    pub fn process<F>(&mut self, config: &PipelineConfig, raw: f64, timestamp: f64, map: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        let dt = self.elapsed(timestamp);

        let mut value = raw;
        if config.spike.enabled {
            value = self.spike.apply(&config.spike, value, dt);
        }
        if config.one_euro.enabled {
            value = self.one_euro.apply(&config.one_euro, value, dt);
        }
        if config.slew.enabled {
            value = self.slew.apply(&config.slew, value, dt);
        }
        if config.jerk.enabled {
            value = self.jerk.apply(&config.jerk, value, dt);
        }

        let mut mapped = map(value);

        if config.deadzone.enabled {
            mapped = self.deadzone.apply(&config.deadzone, mapped, dt);
        }
        if config.hysteresis.enabled {
            mapped = self.hysteresis.apply(&config.hysteresis, mapped, dt);
        }
        mapped
    }

    /// Clears every stage and the timestamp baseline. The next sample
    /// reseeds the chain and passes through unchanged.
    pub fn reset(&mut self) {
        self.last_timestamp = None;
        self.spike.reset();
        self.one_euro.reset();
        self.slew.reset();
        self.jerk.reset();
        self.deadzone.reset();
        self.hysteresis.reset();
    }

    /// Frame interval derived from the previous call, clamped so that
    /// duplicate or out-of-order timestamps cannot produce a zero or
    /// negative Δt further down the chain.
    fn elapsed(&mut self, timestamp: f64) -> f64 {
        let dt = match self.last_timestamp {
            Some(prev) => (timestamp - prev).max(MIN_DT),
            None => MIN_DT,
        };
        self.last_timestamp = Some(timestamp);
        dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stabilizer::preset::StabilizationPreset;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 90.0;

    fn timestamps() -> impl Iterator<Item = f64> {
        (0..).map(|i| i as f64 * DT)
    }

    /// Identity mapper for tests that inspect raw-unit behavior.
    fn identity(v: f64) -> f64 {
        v
    }

    #[test]
    fn off_preset_is_identity_around_the_mapper() {
        let config = StabilizationPreset::Off.config();
        let mut pipeline = AxisPipeline::new(Axis::Stroke);

        let inputs = [0.1, 0.9, 0.05, 0.5, 0.55, 0.2];
        for (raw, t) in inputs.iter().zip(timestamps()) {
            let out = pipeline.process(&config, *raw, t, |v| v * 100.0);
            assert_relative_eq!(out, raw * 100.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn disabled_stage_parameters_are_irrelevant() {
        // Absurd thresholds on disabled stages must change nothing.
        let mut config = StabilizationPreset::Off.config();
        config.slew.max_rate = 1e-9;
        config.deadzone.threshold = 1e9;
        config.hysteresis.band = 1e9;

        let mut pipeline = AxisPipeline::new(Axis::Stroke);
        for (raw, t) in [0.0, 1.0, -1.0, 0.5].iter().zip(timestamps()) {
            let out = pipeline.process(&config, *raw, t, |v| v * 100.0);
            assert_relative_eq!(out, raw * 100.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn first_sample_passes_the_whole_chain_unchanged() {
        let config = StabilizationPreset::Heavy.config();
        let mut pipeline = AxisPipeline::new(Axis::Stroke);
        let out = pipeline.process(&config, 0.42, 0.0, |v| v * 100.0);
        assert_relative_eq!(out, 42.0, epsilon = 1e-12);
    }

    #[test]
    fn duplicate_timestamps_stay_finite() {
        let config = StabilizationPreset::Medium.config();
        let mut pipeline = AxisPipeline::new(Axis::Stroke);

        pipeline.process(&config, 0.5, 1.0, identity);
        let out = pipeline.process(&config, 0.52, 1.0, identity);
        assert!(out.is_finite());
        let out = pipeline.process(&config, 0.54, 0.9, identity);
        assert!(out.is_finite());
    }

    #[test]
    fn rotation_scaling_admits_sixty_fold_delta() {
        // Same nominal slew limit, position vs rotation kind: the rotation
        // axis may move 60x further in one frame.
        let mut config = StabilizationPreset::Off.config();
        config.slew.enabled = true;
        config.slew.max_rate = 5.0;

        let position_config = config.scaled_for(Axis::Stroke.kind());
        let rotation_config = config.scaled_for(Axis::Roll.kind());

        let mut position = AxisPipeline::new(Axis::Stroke);
        let mut rotation = AxisPipeline::new(Axis::Roll);

        position.process(&position_config, 0.0, 0.0, identity);
        rotation.process(&rotation_config, 0.0, 0.0, identity);

        let position_out = position.process(&position_config, 1000.0, DT, identity);
        let rotation_out = rotation.process(&rotation_config, 1000.0, DT, identity);

        assert_relative_eq!(position_out, 5.0 * DT, epsilon = 1e-9);
        assert_relative_eq!(rotation_out, 300.0 * DT, epsilon = 1e-9);
        assert_relative_eq!(rotation_out / position_out, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn reset_reseeds_cleanly() {
        let config = StabilizationPreset::Heavy.config();
        let mut pipeline = AxisPipeline::new(Axis::Stroke);

        for (raw, t) in [0.1, 0.12, 0.14, 0.16].iter().zip(timestamps()) {
            pipeline.process(&config, *raw, t, |v| v * 100.0);
        }

        pipeline.reset();

        // A wildly different value right after reset comes through without
        // residual lag from the pre-reset state.
        let out = pipeline.process(&config, 0.9, 10.0, |v| v * 100.0);
        assert_relative_eq!(out, 90.0, epsilon = 1e-12);
    }
}
