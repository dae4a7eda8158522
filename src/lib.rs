//! # DS5W Library
//!
//! Talk to Sony DualSense and DualSense Edge controllers over USB and
//! Bluetooth HID.
//!
//! This library provides:
//! - Enumeration of attached controllers ([`device::enumerate_devices`])
//! - A per-controller context with reconnect and reopen ([`device::DeviceContext`])
//! - Decoding of input reports into [`report::state::InputState`]
//! - Encoding of [`report::state::OutputState`] (rumble, LEDs, adaptive
//!   triggers) into output reports, CRC-sealed on Bluetooth
//! - A consumer adapter delivering button transitions, normalized analog
//!   ratios and motion vectors ([`adapter`])
//!
//! ## Usage
//!
//! ```no_run
//! use ds5w::device::{enumerate, DeviceContext};
//! use ds5w::report::state::{Color, OutputState};
//! use ds5w::transport::hid::SystemHid;
//!
//! let backend = SystemHid::new()?;
//! let devices = enumerate(&backend)?;
//! if let Some(info) = devices.first() {
//!     let mut context = DeviceContext::open(&backend, info)?;
//!     let input = context.read_input()?;
//!     println!("left stick: {:?}", input.left_stick);
//!
//!     let output = OutputState {
//!         lightbar: Color::new(255, 0, 0),
//!         ..Default::default()
//!     };
//!     context.write_output(&output)?;
//! }
//! # Ok::<(), ds5w::error::Ds5Error>(())
//! ```

pub mod adapter;
pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod report;
pub mod transport;
