//! # Adapter Module
//!
//! Consumer side of the library: what a host does with each decoded input.
//!
//! This module handles:
//! - Button press/release transitions between snapshots
//! - Normalized stick and trigger ratios with deadzones
//! - Raw gyroscope and accelerometer delivery
//! - Building the per-tick output (rumble, LEDs, trigger effects)

pub mod calibration;
pub mod dispatcher;
pub mod feedback;

use crate::report::protocol::Connection;

pub use calibration::AxisCalibration;
pub use dispatcher::{Axis, ButtonTransition, InputDispatcher, InputSink, Motion};
pub use feedback::{Feedback, FeedbackProfile};

/// Scale factor for per-tick effect steps
///
/// Bluetooth ticks arrive slower than USB ticks, so per-tick decrements are
/// divided by this factor to keep effects the same length in wall time.
pub const fn transport_tick_multiplier(connection: Connection) -> u16 {
    match connection {
        Connection::Usb => 1,
        Connection::Bluetooth => 10,
    }
}
