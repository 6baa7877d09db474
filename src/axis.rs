//! Axis identifiers and strongly typed per-axis storage.
//!
//! The tracker decomposes controller motion into six independent scalar
//! axes: three translations (meters) and three rotations (degrees). All
//! per-axis state in the crate is kept in [`AxisMap`], a fixed array
//! indexed by [`Axis`], so the per-frame path never touches a hash map.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// One of the six tracked motion axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Up/down translation (the primary recorded axis)
    Stroke,
    /// Forward/back translation
    Surge,
    /// Left/right translation
    Sway,
    /// Rotation around the vertical axis
    Twist,
    /// Rotation around the forward axis
    Roll,
    /// Rotation around the lateral axis
    Pitch,
}

/// Classification of an axis by its raw unit.
///
/// Position axes report meters, rotation axes report degrees. The two
/// differ by roughly a factor of 60 in numeric range for the same gesture
/// (±1.5 m vs ±180°), which is what
/// [`raw_unit_scale`](AxisKind::raw_unit_scale) captures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Position,
    Rotation,
}

impl AxisKind {
    /// Multiplier applied to raw-unit thresholds so one nominal parameter
    /// set serves both meters and degrees.
    pub fn raw_unit_scale(self) -> f64 {
        match self {
            AxisKind::Position => 1.0,
            AxisKind::Rotation => 60.0,
        }
    }
}

impl Axis {
    /// All axes in canonical processing order.
    pub const ALL: [Axis; 6] = [
        Axis::Stroke,
        Axis::Surge,
        Axis::Sway,
        Axis::Twist,
        Axis::Roll,
        Axis::Pitch,
    ];

    pub fn kind(self) -> AxisKind {
        match self {
            Axis::Stroke | Axis::Surge | Axis::Sway => AxisKind::Position,
            Axis::Twist | Axis::Roll | Axis::Pitch => AxisKind::Rotation,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Stroke => "stroke",
            Axis::Surge => "surge",
            Axis::Sway => "sway",
            Axis::Twist => "twist",
            Axis::Roll => "roll",
            Axis::Pitch => "pitch",
        }
    }

    fn index(self) -> usize {
        match self {
            Axis::Stroke => 0,
            Axis::Surge => 1,
            Axis::Sway => 2,
            Axis::Twist => 3,
            Axis::Roll => 4,
            Axis::Pitch => 5,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stroke" => Ok(Axis::Stroke),
            "surge" => Ok(Axis::Surge),
            "sway" => Ok(Axis::Sway),
            "twist" => Ok(Axis::Twist),
            "roll" => Ok(Axis::Roll),
            "pitch" => Ok(Axis::Pitch),
            other => Err(format!("unknown axis name: {}", other)),
        }
    }
}

/// Fixed-size storage with one slot per [`Axis`].
///
/// Indexing is infallible and the layout is a plain array, so the hot path
/// pays no hashing or allocation for per-axis lookups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisMap<T> {
    slots: [T; 6],
}

impl<T> AxisMap<T> {
    /// Builds a map by evaluating `f` once per axis, in canonical order.
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self {
            slots: Axis::ALL.map(&mut f),
        }
    }

    /// Iterates `(axis, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> + '_ {
        Axis::ALL.iter().map(move |&axis| (axis, &self[axis]))
    }
}

impl<T> Index<Axis> for AxisMap<T> {
    type Output = T;

    fn index(&self, axis: Axis) -> &T {
        &self.slots[axis.index()]
    }
}

impl<T> IndexMut<Axis> for AxisMap<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        &mut self.slots[axis.index()]
    }
}

/// One frame of raw motion as delivered by the device-tracking collaborator.
///
/// `timestamp` is monotonic seconds from the tracking session start; it is
/// never wall-clock time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionFrame {
    pub values: AxisMap<f64>,
    pub timestamp: f64,
}

impl MotionFrame {
    pub fn new(values: AxisMap<f64>, timestamp: f64) -> Self {
        Self { values, timestamp }
    }
}
