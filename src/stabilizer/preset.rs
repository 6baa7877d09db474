//! Named stabilization presets.
//!
//! A preset is a complete [`PipelineConfig`] applied uniformly to all six
//! axes. The UI only ever exposes these four; per-axis tweaking was
//! considered and dropped to keep the control surface small.

use crate::stabilizer::config::{
    DeadzoneConfig, HysteresisConfig, JerkConfig, OneEuroConfig, PipelineConfig, SlewConfig,
    SpikeConfig,
};
use crate::stabilizer::error::StabilizerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selectable smoothing strength.
///
/// `Off` bypasses every stage. `Light` through `Heavy` trade
/// responsiveness for stability; `Heavy` additionally engages the jerk
/// limiter for very noisy tracking setups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilizationPreset {
    Off,
    Light,
    #[default]
    Medium,
    Heavy,
}

impl StabilizationPreset {
    /// All presets in UI order.
    pub const ALL: [StabilizationPreset; 4] = [
        StabilizationPreset::Off,
        StabilizationPreset::Light,
        StabilizationPreset::Medium,
        StabilizationPreset::Heavy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StabilizationPreset::Off => "off",
            StabilizationPreset::Light => "light",
            StabilizationPreset::Medium => "medium",
            StabilizationPreset::Heavy => "heavy",
        }
    }

    /// The parameter table behind each preset.
    ///
    /// Spike velocities correspond to per-frame deltas of 0.8/0.5/0.3 raw
    /// units at the 90 Hz sampling cadence.
    pub fn config(self) -> PipelineConfig {
        match self {
            StabilizationPreset::Off => PipelineConfig {
                spike: SpikeConfig {
                    enabled: false,
                    ..medium().spike
                },
                one_euro: OneEuroConfig {
                    enabled: false,
                    ..medium().one_euro
                },
                slew: SlewConfig {
                    enabled: false,
                    ..medium().slew
                },
                jerk: JerkConfig {
                    enabled: false,
                    ..medium().jerk
                },
                deadzone: DeadzoneConfig {
                    enabled: false,
                    ..medium().deadzone
                },
                hysteresis: HysteresisConfig {
                    enabled: false,
                    ..medium().hysteresis
                },
            },
            StabilizationPreset::Light => PipelineConfig {
                spike: SpikeConfig {
                    enabled: true,
                    max_velocity: 72.0,
                },
                one_euro: OneEuroConfig {
                    enabled: true,
                    min_cutoff: 2.5,
                    beta: 0.01,
                    d_cutoff: 1.0,
                },
                slew: SlewConfig {
                    enabled: true,
                    max_rate: 8.0,
                },
                jerk: JerkConfig {
                    enabled: false,
                    max_jerk: 20.0,
                },
                deadzone: DeadzoneConfig {
                    enabled: true,
                    threshold: 0.5,
                },
                hysteresis: HysteresisConfig {
                    enabled: true,
                    band: 1.0,
                },
            },
            StabilizationPreset::Medium => medium(),
            StabilizationPreset::Heavy => PipelineConfig {
                spike: SpikeConfig {
                    enabled: true,
                    max_velocity: 27.0,
                },
                one_euro: OneEuroConfig {
                    enabled: true,
                    min_cutoff: 0.8,
                    beta: 0.004,
                    d_cutoff: 1.0,
                },
                slew: SlewConfig {
                    enabled: true,
                    max_rate: 3.0,
                },
                jerk: JerkConfig {
                    enabled: true,
                    max_jerk: 15.0,
                },
                deadzone: DeadzoneConfig {
                    enabled: true,
                    threshold: 2.0,
                },
                hysteresis: HysteresisConfig {
                    enabled: true,
                    band: 2.5,
                },
            },
        }
    }
}

/// Medium is both the default preset and the parameter baseline that
/// `Off` keeps around for when stages get re-enabled.
fn medium() -> PipelineConfig {
    PipelineConfig::default()
}

impl fmt::Display for StabilizationPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StabilizationPreset {
    type Err = StabilizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(StabilizationPreset::Off),
            "light" => Ok(StabilizationPreset::Light),
            "medium" => Ok(StabilizationPreset::Medium),
            "heavy" => Ok(StabilizationPreset::Heavy),
            other => Err(StabilizerError::UnknownPreset(other.to_string())),
        }
    }
}
