//! Motion stabilization for spatial controller recording.
//!
//! Takes the raw six-axis motion stream of a tracked controller and turns
//! it into smooth, recordable 0-100 values at the sampling cadence, while
//! staying responsive to intentional fast movement. The heart of the
//! crate is the per-axis filter chain in [`stabilizer`]; [`axis`] and
//! [`calibration`] define the data model around it and [`settings`]
//! persists the one piece of durable state, the active preset.

pub mod axis;
pub mod calibration;
pub mod settings;
pub mod stabilizer;
