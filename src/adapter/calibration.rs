//! # Calibration Module
//!
//! Normalizes raw analog values and applies deadzones.
//!
//! ## Deadzone
//!
//! A deadzone eliminates small stick movements near center to prevent drift.
//! Values within the deadzone are mapped to 0.0, while values outside are
//! scaled to use the full range.
//!
//! ## Usage
//!
//! ```
//! use ds5w::adapter::calibration::Deadzone;
//!
//! let dz = Deadzone::new(0.05);
//!
//! // Input near center (within deadzone)
//! assert_eq!(dz.apply(0.02), 0.0);
//!
//! // Input at full deflection
//! assert!((dz.apply(1.0) - 1.0).abs() < 0.001);
//! ```

/// Maximum accepted deadzone fraction
pub const MAX_DEADZONE: f32 = 0.25;

/// Deadzone applied to a normalized input.
///
/// Input and output are in the range -1.0 to 1.0, where 0.0 is rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deadzone {
    /// Deadzone as a fraction (0.0 to 0.25).
    fraction: f32,
}

impl Default for Deadzone {
    fn default() -> Self {
        Self { fraction: 0.05 }
    }
}

impl Deadzone {
    /// Creates a deadzone of `fraction` of full travel.
    ///
    /// # Arguments
    ///
    /// * `fraction` - Deadzone fraction (0.0 to 0.25). Values outside this range are clamped.
    #[must_use]
    pub fn new(fraction: f32) -> Self {
        Self {
            fraction: fraction.clamp(0.0, MAX_DEADZONE),
        }
    }

    /// Creates a pass-through deadzone.
    #[must_use]
    pub fn none() -> Self {
        Self { fraction: 0.0 }
    }

    /// Returns the configured fraction.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    /// Applies the deadzone to a normalized input.
    ///
    /// # Arguments
    ///
    /// * `input` - Normalized input value (-1.0 to 1.0)
    ///
    /// # Returns
    ///
    /// Output value (-1.0 to 1.0), 0.0 inside the deadzone
    ///
    /// # Examples
    ///
    /// ```
    /// use ds5w::adapter::calibration::Deadzone;
    ///
    /// let dz = Deadzone::new(0.1);
    /// assert_eq!(dz.apply(-0.05), 0.0);
    /// assert!((dz.apply(-0.55) - (-0.5)).abs() < 0.01);
    /// ```
    #[must_use]
    pub fn apply(&self, input: f32) -> f32 {
        let abs_input = input.abs();
        if abs_input <= self.fraction {
            0.0
        } else {
            // Scale remaining range to 0..1
            input.signum() * (abs_input - self.fraction) / (1.0 - self.fraction)
        }
    }
}

/// Deadzones for the sticks and the triggers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisCalibration {
    pub stick: Deadzone,
    pub trigger: Deadzone,
}

impl AxisCalibration {
    /// Creates axis calibration from config values.
    ///
    /// # Examples
    ///
    /// ```
    /// use ds5w::adapter::calibration::AxisCalibration;
    ///
    /// let cal = AxisCalibration::from_config(0.05, 0.10);
    /// assert_eq!(cal.trigger_ratio(0), 0.0);
    /// ```
    #[must_use]
    pub fn from_config(deadzone_stick: f32, deadzone_trigger: f32) -> Self {
        Self {
            stick: Deadzone::new(deadzone_stick),
            trigger: Deadzone::new(deadzone_trigger),
        }
    }

    /// Stick value (-128..127) to a ratio in -1.0..=1.0
    #[must_use]
    pub fn stick_ratio(&self, raw: i8) -> f32 {
        self.stick.apply(normalize_stick(raw))
    }

    /// Trigger value (0-255) to a ratio in 0.0..=1.0
    #[must_use]
    pub fn trigger_ratio(&self, raw: u8) -> f32 {
        self.trigger.apply(normalize_trigger(raw))
    }
}

/// Converts a signed stick value (-128..127) to -1.0..=1.0.
///
/// # Examples
///
/// ```
/// use ds5w::adapter::calibration::normalize_stick;
///
/// assert_eq!(normalize_stick(-128), -1.0);
/// assert_eq!(normalize_stick(0), 0.0);
/// assert_eq!(normalize_stick(127), 1.0);
/// ```
#[must_use]
pub fn normalize_stick(raw: i8) -> f32 {
    (raw as f32 / 127.0).clamp(-1.0, 1.0)
}

/// Converts raw trigger value (0-255) to normalized value (0.0 to 1.0).
///
/// # Examples
///
/// ```
/// use ds5w::adapter::calibration::normalize_trigger;
///
/// assert!((normalize_trigger(0) - 0.0).abs() < 0.01);
/// assert!((normalize_trigger(255) - 1.0).abs() < 0.01);
/// ```
#[must_use]
pub fn normalize_trigger(raw: u8) -> f32 {
    raw as f32 / 255.0
}
