//! Calibration mapping from raw axis units to the 0-100 recording scale.
//!
//! Calibration data is owned by the external calibration wizard; the
//! stabilizer only ever evaluates it as a pure function between the
//! pre-map and post-map filter stages.

use crate::axis::{AxisKind, AxisMap};
use serde::{Deserialize, Serialize};

/// Mapping of one axis's raw range onto 0-100.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisCalibration {
    /// Raw value mapped to 0 (or 100 when inverted).
    pub min_val: f64,
    /// Raw value mapped to 100 (or 0 when inverted).
    pub max_val: f64,
    pub inverted: bool,
    /// Movement scaling around the 50 midpoint; 1.0 = linear.
    pub sensitivity: f64,
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self {
            min_val: 0.0,
            max_val: 1.0,
            inverted: false,
            sensitivity: 1.0,
        }
    }
}

impl AxisCalibration {
    pub fn new(min_val: f64, max_val: f64) -> Self {
        Self {
            min_val,
            max_val,
            ..Self::default()
        }
    }

    /// Maps a raw value to the 0-100 scale.
    ///
    /// Total over all inputs: a degenerate calibration range answers the
    /// scale midpoint instead of dividing by zero, and the result is
    /// always clamped to [0, 100].
    pub fn map_value(&self, raw: f64) -> f64 {
        let range = self.max_val - self.min_val;
        if range == 0.0 {
            return 50.0;
        }

        let mut normalized = (raw - self.min_val) / range;

        // Sensitivity scales around the center point.
        if self.sensitivity != 1.0 {
            normalized = (normalized - 0.5) * self.sensitivity + 0.5;
        }

        normalized = normalized.clamp(0.0, 1.0);

        if self.inverted {
            normalized = 1.0 - normalized;
        }

        normalized * 100.0
    }
}

/// Calibration for all six axes.
pub type CalibrationSet = AxisMap<AxisCalibration>;

/// Calibration with plausible tracking ranges for a typical seated rig:
/// half a meter of travel on the position axes, a half turn on the
/// rotation axes. Real setups come from the calibration wizard instead.
pub fn demo_rig() -> CalibrationSet {
    AxisMap::from_fn(|axis| match axis.kind() {
        AxisKind::Position => AxisCalibration::new(-0.25, 0.25),
        AxisKind::Rotation => AxisCalibration::new(-90.0, 90.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;
    use approx::assert_relative_eq;

    #[test]
    fn linear_mapping_covers_the_range() {
        let calibration = AxisCalibration::new(0.0, 1.0);
        assert_relative_eq!(calibration.map_value(0.0), 0.0);
        assert_relative_eq!(calibration.map_value(0.5), 50.0);
        assert_relative_eq!(calibration.map_value(1.0), 100.0);
    }

    #[test]
    fn out_of_range_input_clamps() {
        let calibration = AxisCalibration::new(0.0, 1.0);
        assert_relative_eq!(calibration.map_value(-2.0), 0.0);
        assert_relative_eq!(calibration.map_value(3.0), 100.0);
    }

    #[test]
    fn inverted_mapping_flips() {
        let calibration = AxisCalibration {
            inverted: true,
            ..AxisCalibration::new(0.0, 1.0)
        };
        assert_relative_eq!(calibration.map_value(0.0), 100.0);
        assert_relative_eq!(calibration.map_value(1.0), 0.0);
        assert_relative_eq!(calibration.map_value(0.5), 50.0);
    }

    #[test]
    fn sensitivity_scales_around_midpoint() {
        let calibration = AxisCalibration {
            sensitivity: 2.0,
            ..AxisCalibration::new(0.0, 1.0)
        };
        // Midpoint is a fixed point; excursions double until they clamp.
        assert_relative_eq!(calibration.map_value(0.5), 50.0);
        assert_relative_eq!(calibration.map_value(0.6), 70.0);
        assert_relative_eq!(calibration.map_value(0.9), 100.0);
    }

    #[test]
    fn degenerate_range_answers_midpoint() {
        let calibration = AxisCalibration::new(0.3, 0.3);
        assert_relative_eq!(calibration.map_value(0.3), 50.0);
        assert_relative_eq!(calibration.map_value(99.0), 50.0);
    }

    #[test]
    fn demo_rig_spans_both_kinds() {
        let set = demo_rig();
        assert_relative_eq!(set[Axis::Stroke].map_value(0.0), 50.0);
        assert_relative_eq!(set[Axis::Roll].map_value(90.0), 100.0);
        assert_relative_eq!(set[Axis::Roll].map_value(-90.0), 0.0);
    }
}
