//! # Controller State Types
//!
//! Structured views of the DualSense input and output reports.
//!
//! [`InputState`] is produced by the decoder on every poll, [`OutputState`]
//! is consumed by the encoder on every push. Buttons are exposed as typed
//! bitflags with named predicates rather than raw integers.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::protocol::TRIGGER_PARAM_SIZE;

bitflags! {
    /// Face buttons and D-pad directions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FaceButtons: u8 {
        const DPAD_LEFT = 0x01;
        const DPAD_DOWN = 0x02;
        const DPAD_RIGHT = 0x04;
        const DPAD_UP = 0x08;
        const SQUARE = 0x10;
        const CROSS = 0x20;
        const CIRCLE = 0x40;
        const TRIANGLE = 0x80;
    }
}

bitflags! {
    /// Shoulder, trigger, stick-click and menu buttons
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ShoulderButtons: u8 {
        const LEFT_BUMPER = 0x01;
        const RIGHT_BUMPER = 0x02;
        const LEFT_TRIGGER = 0x04;
        const RIGHT_TRIGGER = 0x08;
        const CREATE = 0x10;
        const OPTIONS = 0x20;
        const LEFT_STICK = 0x40;
        const RIGHT_STICK = 0x80;
    }
}

bitflags! {
    /// PS logo, touchpad click, mic button and the DualSense Edge extras
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SystemButtons: u8 {
        const PLAYSTATION = 0x01;
        const TOUCHPAD = 0x02;
        const MIC = 0x04;
        const LEFT_FUNCTION = 0x10;
        const RIGHT_FUNCTION = 0x20;
        const LEFT_PADDLE = 0x40;
        const RIGHT_PADDLE = 0x80;
    }
}

bitflags! {
    /// Player indicator LEDs, left to right
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PlayerLedMask: u8 {
        const LEFT = 0x01;
        const MIDDLE_LEFT = 0x02;
        const MIDDLE = 0x04;
        const MIDDLE_RIGHT = 0x08;
        const RIGHT = 0x10;
    }
}

/// Every individually addressable button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Square,
    Cross,
    Circle,
    Triangle,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    LeftBumper,
    RightBumper,
    LeftTrigger,
    RightTrigger,
    Create,
    Options,
    LeftStick,
    RightStick,
    PlayStation,
    Touchpad,
    Mic,
    LeftFunction,
    RightFunction,
    LeftPaddle,
    RightPaddle,
}

impl Button {
    /// All buttons in a stable order
    pub const ALL: [Button; 23] = [
        Button::Square,
        Button::Cross,
        Button::Circle,
        Button::Triangle,
        Button::DpadUp,
        Button::DpadDown,
        Button::DpadLeft,
        Button::DpadRight,
        Button::LeftBumper,
        Button::RightBumper,
        Button::LeftTrigger,
        Button::RightTrigger,
        Button::Create,
        Button::Options,
        Button::LeftStick,
        Button::RightStick,
        Button::PlayStation,
        Button::Touchpad,
        Button::Mic,
        Button::LeftFunction,
        Button::RightFunction,
        Button::LeftPaddle,
        Button::RightPaddle,
    ];
}

/// Analog stick position, 0 = center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalogStick {
    pub x: i8,
    pub y: i8,
}

/// Three component vector (raw sensor units)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// One touchpad contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Touch {
    /// Finger currently on the pad
    pub active: bool,
    /// Firmware-assigned finger id (7 bits)
    pub id: u8,
    /// X position (~0 - 1919)
    pub x: u16,
    /// Y position (~0 - 1079)
    pub y: u16,
}

/// Battery status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Battery {
    pub charging: bool,
    pub fully_charged: bool,
    /// Charge level, 0x0 to 0xA on current firmware
    pub level: u8,
    /// Raw state nibble when it is none of discharging, charging or full
    ///
    /// Firmware reports 0xA (abnormal voltage), 0xB (abnormal temperature)
    /// and 0xF (charging error) here.
    pub fault: Option<u8>,
}

impl Battery {
    const STATE_DISCHARGING: u8 = 0x0;
    const STATE_CHARGING: u8 = 0x1;
    const STATE_FULL: u8 = 0x2;

    /// Unpack the wire status byte (high nibble state, low nibble level)
    pub const fn from_status_byte(byte: u8) -> Self {
        let state = byte >> 4;
        let fault = match state {
            Self::STATE_DISCHARGING | Self::STATE_CHARGING | Self::STATE_FULL => None,
            other => Some(other),
        };
        Self {
            charging: state == Self::STATE_CHARGING,
            fully_charged: state == Self::STATE_FULL,
            level: byte & 0x0F,
            fault,
        }
    }

    /// Pack back into the wire status byte
    pub const fn to_status_byte(&self) -> u8 {
        let state = if let Some(fault) = self.fault {
            fault & 0x0F
        } else if self.fully_charged {
            Self::STATE_FULL
        } else if self.charging {
            Self::STATE_CHARGING
        } else {
            Self::STATE_DISCHARGING
        };
        (state << 4) | (self.level & 0x0F)
    }
}

/// Decoded snapshot of one input report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputState {
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub face_buttons: FaceButtons,
    pub shoulder_buttons: ShoulderButtons,
    pub system_buttons: SystemButtons,
    pub accelerometer: Vec3,
    pub gyroscope: Vec3,
    pub touch_point_1: Touch,
    pub touch_point_2: Touch,
    pub battery: Battery,
    pub headphones_connected: bool,
    /// Left adaptive trigger feedback (only meaningful while an effect is active)
    pub left_trigger_feedback: u8,
    /// Right adaptive trigger feedback (only meaningful while an effect is active)
    pub right_trigger_feedback: u8,
}

impl InputState {
    /// Whether `button` is held in this snapshot
    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::Square => self.face_buttons.contains(FaceButtons::SQUARE),
            Button::Cross => self.face_buttons.contains(FaceButtons::CROSS),
            Button::Circle => self.face_buttons.contains(FaceButtons::CIRCLE),
            Button::Triangle => self.face_buttons.contains(FaceButtons::TRIANGLE),
            Button::DpadUp => self.face_buttons.contains(FaceButtons::DPAD_UP),
            Button::DpadDown => self.face_buttons.contains(FaceButtons::DPAD_DOWN),
            Button::DpadLeft => self.face_buttons.contains(FaceButtons::DPAD_LEFT),
            Button::DpadRight => self.face_buttons.contains(FaceButtons::DPAD_RIGHT),
            Button::LeftBumper => self.shoulder_buttons.contains(ShoulderButtons::LEFT_BUMPER),
            Button::RightBumper => self.shoulder_buttons.contains(ShoulderButtons::RIGHT_BUMPER),
            Button::LeftTrigger => self.shoulder_buttons.contains(ShoulderButtons::LEFT_TRIGGER),
            Button::RightTrigger => self.shoulder_buttons.contains(ShoulderButtons::RIGHT_TRIGGER),
            Button::Create => self.shoulder_buttons.contains(ShoulderButtons::CREATE),
            Button::Options => self.shoulder_buttons.contains(ShoulderButtons::OPTIONS),
            Button::LeftStick => self.shoulder_buttons.contains(ShoulderButtons::LEFT_STICK),
            Button::RightStick => self.shoulder_buttons.contains(ShoulderButtons::RIGHT_STICK),
            Button::PlayStation => self.system_buttons.contains(SystemButtons::PLAYSTATION),
            Button::Touchpad => self.system_buttons.contains(SystemButtons::TOUCHPAD),
            Button::Mic => self.system_buttons.contains(SystemButtons::MIC),
            Button::LeftFunction => self.system_buttons.contains(SystemButtons::LEFT_FUNCTION),
            Button::RightFunction => self.system_buttons.contains(SystemButtons::RIGHT_FUNCTION),
            Button::LeftPaddle => self.system_buttons.contains(SystemButtons::LEFT_PADDLE),
            Button::RightPaddle => self.system_buttons.contains(SystemButtons::RIGHT_PADDLE),
        }
    }

    /// Iterator over the buttons held in this snapshot
    pub fn pressed_buttons(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.is_pressed(*b))
    }
}

/// Microphone LED state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum MicLed {
    #[default]
    Off = 0x00,
    On = 0x01,
    Pulse = 0x02,
}

/// Player LED brightness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LedBrightness {
    #[default]
    High = 0x00,
    Medium = 0x01,
    Low = 0x02,
}

/// Player indicator LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerLeds {
    pub bitmask: PlayerLedMask,
    /// Fade the LEDs in instead of switching instantly
    pub fade: bool,
    pub brightness: LedBrightness,
}

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Adaptive trigger effect
///
/// Each variant carries only the parameters meaningful for its effect type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerEffect {
    /// No resistance is applied
    #[default]
    NoResistance,
    /// Constant resistance from `start_position` onwards
    ContinuousResistance { start_position: u8, force: u8 },
    /// Resistance between two positions (`end_position >= start_position`)
    SectionResistance { start_position: u8, end_position: u8 },
    /// Extended effect with force profile and vibration
    EffectEx {
        start_position: u8,
        /// Keep playing when the trigger goes beyond the end of travel
        keep_effect: bool,
        begin_force: u8,
        middle_force: u8,
        end_force: u8,
        frequency: u8,
    },
    /// Trigger calibration
    Calibrate,
}

impl TriggerEffect {
    pub const TAG_NO_RESISTANCE: u8 = 0x00;
    pub const TAG_CONTINUOUS_RESISTANCE: u8 = 0x01;
    pub const TAG_SECTION_RESISTANCE: u8 = 0x02;
    pub const TAG_EFFECT_EX: u8 = 0x26;
    pub const TAG_CALIBRATE: u8 = 0xFC;

    /// Effect type tag written ahead of the parameter block
    pub const fn type_tag(&self) -> u8 {
        match self {
            TriggerEffect::NoResistance => Self::TAG_NO_RESISTANCE,
            TriggerEffect::ContinuousResistance { .. } => Self::TAG_CONTINUOUS_RESISTANCE,
            TriggerEffect::SectionResistance { .. } => Self::TAG_SECTION_RESISTANCE,
            TriggerEffect::EffectEx { .. } => Self::TAG_EFFECT_EX,
            TriggerEffect::Calibrate => Self::TAG_CALIBRATE,
        }
    }

    /// Raw parameter block of the active variant; unused bytes are zero
    pub const fn params(&self) -> [u8; TRIGGER_PARAM_SIZE] {
        match *self {
            TriggerEffect::NoResistance | TriggerEffect::Calibrate => [0; TRIGGER_PARAM_SIZE],
            TriggerEffect::ContinuousResistance { start_position, force } => {
                [start_position, force, 0, 0, 0, 0]
            }
            TriggerEffect::SectionResistance { start_position, end_position } => {
                [start_position, end_position, 0, 0, 0, 0]
            }
            TriggerEffect::EffectEx {
                start_position,
                keep_effect,
                begin_force,
                middle_force,
                end_force,
                frequency,
            } => [
                start_position,
                keep_effect as u8,
                begin_force,
                middle_force,
                end_force,
                frequency,
            ],
        }
    }
}

/// State pushed to the controller
///
/// `Default` yields an all-zero state: motors off, LEDs dark, triggers free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputState {
    /// Left / hard rumble motor
    pub left_rumble: u8,
    /// Right / soft rumble motor
    pub right_rumble: u8,
    pub microphone_led: MicLed,
    /// Turn every LED off
    pub disable_leds: bool,
    pub player_leds: PlayerLeds,
    pub lightbar: Color,
    pub left_trigger_effect: TriggerEffect,
    pub right_trigger_effect: TriggerEffect,
}
