//! # DualSense Report Module
//!
//! Pure byte-level codec for the DualSense HID reports.
//!
//! This module handles:
//! - Input report decoding (sticks, buttons, motion, touch, battery)
//! - Output report encoding (rumble, adaptive triggers, LEDs)
//! - USB vs. Bluetooth framing and the Bluetooth CRC-32
//!
//! Nothing here performs I/O.

pub mod protocol;
pub mod state;
pub mod encoder;
pub mod decoder;
pub mod crc;
