//! Post-map filter stages.
//!
//! These run on the calibration-mapped 0-100 value, after the pre-map
//! chain and the external mapper. Both are pure threshold logic and ignore
//! the frame interval.

use crate::stabilizer::config::{DeadzoneConfig, HysteresisConfig};
use crate::stabilizer::stages::FilterStage;

/// Suppresses changes smaller than the configured threshold.
///
/// The comparison is always against the last *emitted* value, so a slow
/// creep eventually accumulates enough distance to break out.
#[derive(Clone, Debug, Default)]
pub struct Deadzone {
    last_emitted: Option<f64>,
}

impl FilterStage for Deadzone {
    type Config = DeadzoneConfig;

    fn apply(&mut self, config: &DeadzoneConfig, value: f64, _dt: f64) -> f64 {
        let last = match self.last_emitted {
            Some(last) => last,
            None => {
                self.last_emitted = Some(value);
                return value;
            }
        };

        if (value - last).abs() >= config.threshold {
            self.last_emitted = Some(value);
            value
        } else {
            last
        }
    }

    fn reset(&mut self) {
        self.last_emitted = None;
    }
}

/// Travel direction tracked by the hysteresis stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Direction {
    #[default]
    None,
    Increasing,
    Decreasing,
}

/// Requires the signal to back off past a band before a direction
/// reversal is accepted.
///
/// Motion continuing in the established direction always passes and moves
/// the reference with it. A reversal only passes once the new value is at
/// least `band` away from the reference on the other side; until then the
/// reference value keeps being emitted. With no established direction any
/// motion is accepted and sets one.
#[derive(Clone, Debug, Default)]
pub struct Hysteresis {
    reference: Option<f64>,
    direction: Direction,
}

impl FilterStage for Hysteresis {
    type Config = HysteresisConfig;

    fn apply(&mut self, config: &HysteresisConfig, value: f64, _dt: f64) -> f64 {
        let reference = match self.reference {
            Some(reference) => reference,
            None => {
                self.reference = Some(value);
                return value;
            }
        };

        let delta = value - reference;
        if delta == 0.0 {
            return reference;
        }

        let moving = if delta > 0.0 {
            Direction::Increasing
        } else {
            Direction::Decreasing
        };

        let accepted = match self.direction {
            Direction::None => true,
            direction if direction == moving => true,
            // Reversal: must clear the band measured from the reference.
            _ => delta.abs() >= config.band,
        };

        if accepted {
            self.reference = Some(value);
            self.direction = moving;
            value
        } else {
            reference
        }
    }

    fn reset(&mut self) {
        self.reference = None;
        self.direction = Direction::None;
    }
}
