//! Pre-map filter stages.
//!
//! Each stage is a small state machine that consumes one scalar sample per
//! frame together with the elapsed time since the previous frame and emits
//! one scalar. Stages hold state only; their parameters live in the config
//! snapshot and are passed in on every call, which is what lets a preset
//! change swap thresholds mid-stream without touching accumulated state.
//!
//! All stages are causal and seed themselves from the first sample they
//! see: the first call after construction or [`reset`](FilterStage::reset)
//! returns its input unchanged.

use crate::stabilizer::config::{JerkConfig, OneEuroConfig, SlewConfig, SpikeConfig};

/// Smallest accepted frame interval in seconds.
///
/// Duplicate or out-of-order timestamps produce Δt ≤ 0; every stage that
/// divides by Δt clamps to this instead.
pub const MIN_DT: f64 = 1e-6;

/// One unit of the stabilization chain.
///
/// Stages are concrete types composed statically by the pipeline; the
/// trait exists for the shared contract (and to keep the stages
/// independently testable), not for dynamic dispatch on the frame path.
pub trait FilterStage {
    type Config;

    /// Feeds one sample. `dt` is the elapsed time in seconds since the
    /// previous sample on this axis, already clamped to at least
    /// [`MIN_DT`] by the caller.
    fn apply(&mut self, config: &Self::Config, value: f64, dt: f64) -> f64;

    /// Clears all state. The next sample passes through unchanged and
    /// becomes the new baseline.
    fn reset(&mut self);
}

/// Rejects single-frame outliers by holding suspicious samples back for
/// one frame of corroboration.
///
/// A sample whose implied velocity exceeds the configured bound is not
/// emitted immediately; the previous value is repeated and the sample is
/// kept as a candidate. The next sample decides: if it stays with the
/// candidate the jump was real motion and the candidate becomes the new
/// baseline (one frame late); if it reverts toward the pre-spike trend
/// the candidate is dropped on the floor.
#[derive(Clone, Debug, Default)]
pub struct SpikeRejector {
    prev: Option<f64>,
    held: Option<f64>,
}

impl FilterStage for SpikeRejector {
    type Config = SpikeConfig;

    fn apply(&mut self, config: &SpikeConfig, value: f64, dt: f64) -> f64 {
        let mut baseline = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some(value);
                return value;
            }
        };

        if let Some(held) = self.held.take() {
            // Candidate from last frame: corroborated when the new sample
            // lands at least as close to it as to the pre-spike baseline.
            if (value - held).abs() <= (value - baseline).abs() {
                baseline = held;
                self.prev = Some(held);
            }
        }

        let velocity = (value - baseline).abs() / dt.max(MIN_DT);
        if velocity > config.max_velocity {
            self.held = Some(value);
            baseline
        } else {
            self.prev = Some(value);
            value
        }
    }

    fn reset(&mut self) {
        self.prev = None;
        self.held = None;
    }
}

/// The 1-Euro filter, an adaptive one-pole low-pass.
///
/// The cutoff frequency rises with the smoothed derivative of the signal:
/// slow movement gets smoothed hard, fast movement passes with little lag.
#[derive(Clone, Debug, Default)]
pub struct OneEuroFilter {
    x_prev: Option<f64>,
    dx_prev: f64,
}

/// Exponential smoothing factor for a given cutoff frequency and frame
/// interval: α = r / (r + 1) with r = 2π·cutoff·Δt.
fn smoothing_factor(dt: f64, cutoff: f64) -> f64 {
    let r = 2.0 * std::f64::consts::PI * cutoff * dt;
    r / (r + 1.0)
}

impl FilterStage for OneEuroFilter {
    type Config = OneEuroConfig;

    fn apply(&mut self, config: &OneEuroConfig, value: f64, dt: f64) -> f64 {
        let x_prev = match self.x_prev {
            Some(x) => x,
            None => {
                self.x_prev = Some(value);
                self.dx_prev = 0.0;
                return value;
            }
        };

        let dt = dt.max(MIN_DT);

        // Smooth the derivative first, then let it drive the cutoff.
        let dx = (value - x_prev) / dt;
        let a_d = smoothing_factor(dt, config.d_cutoff);
        let dx_hat = a_d * dx + (1.0 - a_d) * self.dx_prev;

        let cutoff = config.min_cutoff + config.beta * dx_hat.abs();
        let a = smoothing_factor(dt, cutoff);
        let x_hat = a * value + (1.0 - a) * x_prev;

        self.x_prev = Some(x_hat);
        self.dx_prev = dx_hat;
        x_hat
    }

    fn reset(&mut self) {
        self.x_prev = None;
        self.dx_prev = 0.0;
    }
}

/// Caps the output's rate of change to ±max_rate units per second.
///
/// The clamp is applied against the previous *output*, so a persistent
/// input step ramps linearly instead of jumping.
#[derive(Clone, Debug, Default)]
pub struct SlewRateLimiter {
    prev: Option<f64>,
}

impl FilterStage for SlewRateLimiter {
    type Config = SlewConfig;

    fn apply(&mut self, config: &SlewConfig, value: f64, dt: f64) -> f64 {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some(value);
                return value;
            }
        };

        let max_delta = config.max_rate * dt.max(MIN_DT);
        let output = prev + (value - prev).clamp(-max_delta, max_delta);
        self.prev = Some(output);
        output
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}

/// Limits how fast the output's velocity may change.
///
/// The requested velocity for this frame is clamped to within
/// ±max_jerk·Δt of the previous frame's velocity, then integrated onto
/// the previous output.
#[derive(Clone, Debug, Default)]
pub struct JerkLimiter {
    prev: Option<f64>,
    vel_prev: f64,
}

impl FilterStage for JerkLimiter {
    type Config = JerkConfig;

    fn apply(&mut self, config: &JerkConfig, value: f64, dt: f64) -> f64 {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some(value);
                self.vel_prev = 0.0;
                return value;
            }
        };

        let dt = dt.max(MIN_DT);
        let requested = (value - prev) / dt;
        let max_delta_v = config.max_jerk * dt;
        let velocity = self.vel_prev + (requested - self.vel_prev).clamp(-max_delta_v, max_delta_v);

        let output = prev + velocity * dt;
        self.prev = Some(output);
        self.vel_prev = velocity;
        output
    }

    fn reset(&mut self) {
        self.prev = None;
        self.vel_prev = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT_90HZ: f64 = 1.0 / 90.0;

    fn spike_config(max_velocity: f64) -> SpikeConfig {
        SpikeConfig {
            enabled: true,
            max_velocity,
        }
    }

    #[test]
    fn spike_first_sample_passes_through() {
        let mut stage = SpikeRejector::default();
        assert_eq!(stage.apply(&spike_config(45.0), 10.0, DT_90HZ), 10.0);
    }

    #[test]
    fn spike_single_frame_outlier_is_discarded() {
        // 0.5 raw units per frame at 90 Hz
        let config = spike_config(45.0);
        let mut stage = SpikeRejector::default();

        let inputs = [10.0, 10.0, 95.0, 10.0, 10.0];
        let outputs: Vec<f64> = inputs
            .iter()
            .map(|&x| stage.apply(&config, x, DT_90HZ))
            .collect();

        // The 95 is held, never emitted, and the signal stays at 10.
        assert_eq!(outputs, vec![10.0, 10.0, 10.0, 10.0, 10.0]);
    }

    #[test]
    fn spike_sustained_jump_is_real_motion() {
        let config = spike_config(45.0);
        let mut stage = SpikeRejector::default();

        let inputs = [10.0, 10.0, 95.0, 95.0, 95.0];
        let outputs: Vec<f64> = inputs
            .iter()
            .map(|&x| stage.apply(&config, x, DT_90HZ))
            .collect();

        // Corroborated on the following frame: one frame of latency, then
        // the jump is accepted as-is.
        assert_eq!(outputs, vec![10.0, 10.0, 10.0, 95.0, 95.0]);
    }

    #[test]
    fn spike_fast_ramp_keeps_moving() {
        // A continued super-threshold ramp corroborates itself each frame
        // instead of being swallowed.
        let config = spike_config(45.0);
        let mut stage = SpikeRejector::default();

        stage.apply(&config, 10.0, DT_90HZ);
        assert_eq!(stage.apply(&config, 95.0, DT_90HZ), 10.0);
        assert_eq!(stage.apply(&config, 180.0, DT_90HZ), 95.0);
        assert_eq!(stage.apply(&config, 265.0, DT_90HZ), 180.0);
    }

    #[test]
    fn one_euro_first_sample_is_identity() {
        let config = OneEuroConfig {
            enabled: true,
            min_cutoff: 1.5,
            beta: 0.007,
            d_cutoff: 1.0,
        };
        let mut stage = OneEuroFilter::default();
        assert_eq!(stage.apply(&config, 42.0, DT_90HZ), 42.0);
    }

    #[test]
    fn one_euro_output_stays_between_previous_and_input() {
        let config = OneEuroConfig {
            enabled: true,
            min_cutoff: 1.5,
            beta: 0.007,
            d_cutoff: 1.0,
        };
        let mut stage = OneEuroFilter::default();

        stage.apply(&config, 0.0, DT_90HZ);
        let out = stage.apply(&config, 1.0, DT_90HZ);
        assert!(out > 0.0 && out < 1.0, "out = {}", out);

        // Repeated constant input converges toward it.
        let mut last = out;
        for _ in 0..500 {
            last = stage.apply(&config, 1.0, DT_90HZ);
        }
        assert_relative_eq!(last, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn one_euro_faster_motion_smooths_less() {
        let config = OneEuroConfig {
            enabled: true,
            min_cutoff: 1.0,
            beta: 0.5,
            d_cutoff: 1.0,
        };

        // Same step size applied after a slow and after a fast run-up: the
        // fast signal must retain a larger fraction of the step.
        let mut slow = OneEuroFilter::default();
        slow.apply(&config, 0.0, DT_90HZ);
        let slow_out = slow.apply(&config, 0.01, DT_90HZ);
        let slow_fraction = slow_out / 0.01;

        let mut fast = OneEuroFilter::default();
        fast.apply(&config, 0.0, DT_90HZ);
        let fast_out = fast.apply(&config, 10.0, DT_90HZ);
        let fast_fraction = fast_out / 10.0;

        assert!(
            fast_fraction > slow_fraction,
            "fast {} vs slow {}",
            fast_fraction,
            slow_fraction
        );
    }

    #[test]
    fn one_euro_degenerate_dt_stays_finite() {
        let config = OneEuroConfig {
            enabled: true,
            min_cutoff: 1.5,
            beta: 0.007,
            d_cutoff: 1.0,
        };
        let mut stage = OneEuroFilter::default();
        stage.apply(&config, 5.0, 0.0);
        let out = stage.apply(&config, 6.0, 0.0);
        assert!(out.is_finite());
        let out = stage.apply(&config, 7.0, -1.0);
        assert!(out.is_finite());
    }

    #[test]
    fn slew_bounds_single_call_delta() {
        let config = SlewConfig {
            enabled: true,
            max_rate: 8.0,
        };
        let mut stage = SlewRateLimiter::default();

        stage.apply(&config, 0.0, DT_90HZ);
        let out = stage.apply(&config, 1.0, DT_90HZ);

        let bound = 8.0 * DT_90HZ;
        assert!(out <= bound + 1e-12, "out = {}, bound = {}", out, bound);
        assert_relative_eq!(out, bound, epsilon = 1e-12);
    }

    #[test]
    fn slew_ramps_to_target_and_follows_small_moves() {
        let config = SlewConfig {
            enabled: true,
            max_rate: 8.0,
        };
        let mut stage = SlewRateLimiter::default();

        stage.apply(&config, 0.0, DT_90HZ);
        let mut out = 0.0;
        for _ in 0..20 {
            out = stage.apply(&config, 1.0, DT_90HZ);
        }
        assert_relative_eq!(out, 1.0, epsilon = 1e-12);

        // Sub-limit moves pass through exactly.
        let small = out + 0.5 * 8.0 * DT_90HZ;
        assert_relative_eq!(stage.apply(&config, small, DT_90HZ), small, epsilon = 1e-12);
    }

    #[test]
    fn jerk_limits_velocity_change() {
        let config = JerkConfig {
            enabled: true,
            max_jerk: 15.0,
        };
        let mut stage = JerkLimiter::default();

        stage.apply(&config, 0.0, DT_90HZ);

        // From standstill the velocity may grow by at most max_jerk * dt,
        // so the first frame of a step moves max_jerk * dt^2.
        let out = stage.apply(&config, 1.0, DT_90HZ);
        assert_relative_eq!(out, 15.0 * DT_90HZ * DT_90HZ, epsilon = 1e-12);

        // The next frame may add another jerk increment on top.
        let out2 = stage.apply(&config, 1.0, DT_90HZ);
        let max_second_step = 2.0 * 15.0 * DT_90HZ * DT_90HZ;
        assert!(out2 - out <= max_second_step + 1e-12);
        assert!(out2 > out);
    }

    #[test]
    fn jerk_constant_input_settles() {
        let config = JerkConfig {
            enabled: true,
            max_jerk: 15.0,
        };
        let mut stage = JerkLimiter::default();

        stage.apply(&config, 0.0, DT_90HZ);
        let mut out = 0.0;
        for _ in 0..2000 {
            out = stage.apply(&config, 1.0, DT_90HZ);
        }
        assert_relative_eq!(out, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn reset_makes_next_sample_identity() {
        let spike_cfg = spike_config(45.0);
        let slew_cfg = SlewConfig {
            enabled: true,
            max_rate: 1.0,
        };

        let mut spike = SpikeRejector::default();
        let mut slew = SlewRateLimiter::default();
        for &x in &[0.0, 0.2, 0.4] {
            spike.apply(&spike_cfg, x, DT_90HZ);
            slew.apply(&slew_cfg, x, DT_90HZ);
        }

        spike.reset();
        slew.reset();
        assert_eq!(spike.apply(&spike_cfg, 99.0, DT_90HZ), 99.0);
        assert_eq!(slew.apply(&slew_cfg, 99.0, DT_90HZ), 99.0);
    }
}
