//! Stage parameter bundles for one axis pipeline.
//!
//! Every filter stage has its own small config struct carrying an enable
//! flag plus its thresholds. [`PipelineConfig`] groups all six; the
//! manager swaps whole snapshots of it at preset changes, so the per-frame
//! path only ever reads an immutable copy and the stages themselves carry
//! no parameters.

use crate::axis::AxisKind;
use crate::stabilizer::error::StabilizerError;
use serde::{Deserialize, Serialize};

/// Spike rejection stage parameters (raw units per second).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpikeConfig {
    pub enabled: bool,
    /// Implied velocities above this are held back for one frame of
    /// corroboration before they are believed.
    pub max_velocity: f64,
}

/// One Euro filter parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneEuroConfig {
    pub enabled: bool,
    /// Minimum cutoff frequency in Hz. Lower = more smoothing at rest.
    pub min_cutoff: f64,
    /// Speed coefficient. Higher = less lag during fast movement.
    pub beta: f64,
    /// Cutoff for the derivative estimate, normally left at 1.0.
    pub d_cutoff: f64,
}

/// Slew-rate limiter parameters (raw units per second).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlewConfig {
    pub enabled: bool,
    pub max_rate: f64,
}

/// Jerk limiter parameters (raw units per second squared).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JerkConfig {
    pub enabled: bool,
    pub max_jerk: f64,
}

/// Post-map deadzone parameters (mapped 0-100 units).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeadzoneConfig {
    pub enabled: bool,
    pub threshold: f64,
}

/// Post-map hysteresis parameters (mapped 0-100 units).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HysteresisConfig {
    pub enabled: bool,
    pub band: f64,
}

/// Complete parameter set for one axis pipeline.
///
/// The pre-map stage parameters (`spike`, `slew`, `jerk`) are expressed in
/// position-axis units; [`scaled_for`](PipelineConfig::scaled_for) derives
/// the rotation-axis variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub spike: SpikeConfig,
    pub one_euro: OneEuroConfig,
    pub slew: SlewConfig,
    pub jerk: JerkConfig,
    pub deadzone: DeadzoneConfig,
    pub hysteresis: HysteresisConfig,
}

impl Default for PipelineConfig {
    /// Medium preset values, the default for new tracking sessions.
    fn default() -> Self {
        Self {
            spike: SpikeConfig {
                enabled: true,
                max_velocity: 45.0,
            },
            one_euro: OneEuroConfig {
                enabled: true,
                min_cutoff: 1.5,
                beta: 0.007,
                d_cutoff: 1.0,
            },
            slew: SlewConfig {
                enabled: true,
                max_rate: 5.0,
            },
            jerk: JerkConfig {
                enabled: false,
                max_jerk: 20.0,
            },
            deadzone: DeadzoneConfig {
                enabled: true,
                threshold: 1.0,
            },
            hysteresis: HysteresisConfig {
                enabled: true,
                band: 1.5,
            },
        }
    }
}

impl PipelineConfig {
    /// Checks every stage parameter for validity.
    ///
    /// Runs at preset construction time, before any `process` call can see
    /// the values; disabled stages are validated too so that toggling a
    /// stage on never introduces a bad parameter.
    pub fn validate(&self) -> Result<(), StabilizerError> {
        fn positive(stage: &str, field: &str, value: f64) -> Result<(), StabilizerError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(StabilizerError::ConfigError(format!(
                    "{}.{} must be a positive finite number (got {})",
                    stage, field, value
                )))
            }
        }
        fn non_negative(stage: &str, field: &str, value: f64) -> Result<(), StabilizerError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(StabilizerError::ConfigError(format!(
                    "{}.{} must be a non-negative finite number (got {})",
                    stage, field, value
                )))
            }
        }

        positive("spike", "max_velocity", self.spike.max_velocity)?;
        positive("one_euro", "min_cutoff", self.one_euro.min_cutoff)?;
        non_negative("one_euro", "beta", self.one_euro.beta)?;
        positive("one_euro", "d_cutoff", self.one_euro.d_cutoff)?;
        positive("slew", "max_rate", self.slew.max_rate)?;
        positive("jerk", "max_jerk", self.jerk.max_jerk)?;
        non_negative("deadzone", "threshold", self.deadzone.threshold)?;
        non_negative("hysteresis", "band", self.hysteresis.band)?;
        Ok(())
    }

    /// Returns a copy with the raw-unit thresholds scaled for `kind`.
    ///
    /// Rotation axes report degrees, position axes meters; the pre-map
    /// thresholds scale by [`AxisKind::raw_unit_scale`] so the same preset
    /// behaves comparably on both. The post-map stages operate on the
    /// normalized 0-100 value and keep their nominal thresholds.
    pub fn scaled_for(&self, kind: AxisKind) -> PipelineConfig {
        let scale = kind.raw_unit_scale();
        let mut config = *self;
        config.spike.max_velocity *= scale;
        config.slew.max_rate *= scale;
        config.jerk.max_jerk *= scale;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut config = PipelineConfig::default();
        config.deadzone.threshold = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("deadzone.threshold"));
    }

    #[test]
    fn non_positive_cutoff_is_rejected() {
        let mut config = PipelineConfig::default();
        config.one_euro.min_cutoff = 0.0;
        assert!(config.validate().is_err());

        config.one_euro.min_cutoff = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn disabled_stages_are_still_validated() {
        let mut config = PipelineConfig::default();
        config.jerk.enabled = false;
        config.jerk.max_jerk = -5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rotation_scaling_touches_only_raw_unit_stages() {
        let nominal = PipelineConfig::default();
        let rotation = nominal.scaled_for(AxisKind::Rotation);

        assert_eq!(rotation.spike.max_velocity, nominal.spike.max_velocity * 60.0);
        assert_eq!(rotation.slew.max_rate, nominal.slew.max_rate * 60.0);
        assert_eq!(rotation.jerk.max_jerk, nominal.jerk.max_jerk * 60.0);

        // Mapped-scale stages and smoothing parameters stay nominal.
        assert_eq!(rotation.deadzone, nominal.deadzone);
        assert_eq!(rotation.hysteresis, nominal.hysteresis);
        assert_eq!(rotation.one_euro, nominal.one_euro);
    }

    #[test]
    fn position_scaling_is_identity() {
        let nominal = PipelineConfig::default();
        assert_eq!(nominal.scaled_for(AxisKind::Position), nominal);
    }
}
