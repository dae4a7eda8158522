//! # Feedback Module
//!
//! Builds the [`OutputState`] pushed back to the controller each tick from
//! the latest input.
//!
//! - Lightbar and player LEDs are static.
//! - The mic button lights the mic LED, the PS button turns it off.
//! - Rumble mirrors the analog triggers, and a full trigger pull kicks a
//!   decaying rumble envelope.
//! - With trigger resistance enabled, a fully pulled trigger engages its
//!   effect and a fully released trigger frees it again.

use super::transport_tick_multiplier;
use crate::report::protocol::Connection;
use crate::report::state::{
    Color, InputState, LedBrightness, MicLed, OutputState, PlayerLedMask, PlayerLeds,
    SystemButtons, TriggerEffect,
};

/// Per-tick envelope decay of the left motor (USB rate)
const LEFT_RUMBLE_DECAY: u16 = 0x200;
/// Per-tick envelope decay of the right motor (USB rate)
const RIGHT_RUMBLE_DECAY: u16 = 0x100;
/// Envelope value after a kick, 8.8 fixed point
const RUMBLE_KICK: u16 = 0xFF00;

/// Left trigger effect while engaged
pub const LEFT_ENGAGED_EFFECT: TriggerEffect = TriggerEffect::SectionResistance {
    start_position: 0x00,
    end_position: 0x60,
};

/// Right trigger effect while engaged
pub const RIGHT_ENGAGED_EFFECT: TriggerEffect = TriggerEffect::ContinuousResistance {
    start_position: 0x00,
    force: 0xFF,
};

/// Static feedback settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackProfile {
    pub lightbar: Color,
    pub player_leds: PlayerLedMask,
    pub player_led_brightness: LedBrightness,
    pub mic_led: MicLed,
    pub rumble_from_triggers: bool,
    pub trigger_resistance: bool,
}

impl Default for FeedbackProfile {
    fn default() -> Self {
        Self {
            lightbar: Color::new(0, 0, 64),
            player_leds: PlayerLedMask::MIDDLE,
            player_led_brightness: LedBrightness::High,
            mic_led: MicLed::Off,
            rumble_from_triggers: true,
            trigger_resistance: false,
        }
    }
}

/// Decaying rumble level for both motors, 8.8 fixed point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RumbleEnvelope {
    left: u16,
    right: u16,
}

impl RumbleEnvelope {
    /// Restart both motors at full strength
    pub fn kick(&mut self) {
        self.left = RUMBLE_KICK;
        self.right = RUMBLE_KICK;
    }

    /// Advance one tick; slower transports decay by a smaller step per tick
    pub fn tick(&mut self, connection: Connection) {
        let multiplier = transport_tick_multiplier(connection);
        self.left = self.left.saturating_sub(LEFT_RUMBLE_DECAY / multiplier);
        self.right = self.right.saturating_sub(RIGHT_RUMBLE_DECAY / multiplier);
    }

    /// Current motor intensities `(left, right)`
    pub fn levels(&self) -> (u8, u8) {
        ((self.left >> 8) as u8, (self.right >> 8) as u8)
    }
}

/// Feedback generator, one per controller
#[derive(Debug, Clone)]
pub struct Feedback {
    profile: FeedbackProfile,
    mic_led: MicLed,
    envelope: RumbleEnvelope,
    left_effect: TriggerEffect,
    right_effect: TriggerEffect,
}

impl Feedback {
    pub fn new(profile: FeedbackProfile) -> Self {
        Self {
            mic_led: profile.mic_led,
            profile,
            envelope: RumbleEnvelope::default(),
            left_effect: TriggerEffect::NoResistance,
            right_effect: TriggerEffect::NoResistance,
        }
    }

    /// Compute this tick's output from the latest input
    pub fn update(&mut self, input: &InputState, connection: Connection) -> OutputState {
        if input.system_buttons.contains(SystemButtons::MIC) {
            self.mic_led = MicLed::On;
        } else if input.system_buttons.contains(SystemButtons::PLAYSTATION) {
            self.mic_led = MicLed::Off;
        }

        self.envelope.tick(connection);
        if self.profile.rumble_from_triggers
            && (input.left_trigger == u8::MAX || input.right_trigger == u8::MAX)
        {
            self.envelope.kick();
        }

        if self.profile.trigger_resistance {
            self.left_effect = next_effect(self.left_effect, input.left_trigger, LEFT_ENGAGED_EFFECT);
            self.right_effect =
                next_effect(self.right_effect, input.right_trigger, RIGHT_ENGAGED_EFFECT);
        }

        let (left_rumble, right_rumble) = if self.profile.rumble_from_triggers {
            let (left, right) = self.envelope.levels();
            (left.max(input.left_trigger), right.max(input.right_trigger))
        } else {
            (0, 0)
        };

        OutputState {
            left_rumble,
            right_rumble,
            microphone_led: self.mic_led,
            disable_leds: false,
            player_leds: PlayerLeds {
                bitmask: self.profile.player_leds,
                fade: true,
                brightness: self.profile.player_led_brightness,
            },
            lightbar: self.profile.lightbar,
            left_trigger_effect: self.left_effect,
            right_trigger_effect: self.right_effect,
        }
    }
}

/// Engage at full pull, release at rest, otherwise keep the current effect
fn next_effect(current: TriggerEffect, trigger: u8, engaged: TriggerEffect) -> TriggerEffect {
    match trigger {
        u8::MAX => engaged,
        0 => TriggerEffect::NoResistance,
        _ => current,
    }
}
