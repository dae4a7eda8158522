//! # Device Module
//!
//! Discovery of connected DualSense controllers and ownership of opened ones.

pub mod enumerator;
pub mod context;

pub use context::{ContextState, DeviceContext};
pub use enumerator::{enumerate, enumerate_devices, DeviceEnumInfo, EnumBuffer};
