//! # Output Report Encoder
//!
//! Encodes [`OutputState`] into DualSense output reports.
//!
//! ## Report Structure
//!
//! ```text
//! USB:       [0x02][common block (47)]
//! Bluetooth: [0x31][seq << 4][0x10][common block (47)][reserved][CRC32 LE]
//! ```
//!
//! The common block holds the valid-flag bytes, rumble motors, mic LED, both
//! adaptive trigger blocks, player LEDs and lightbar color.

use super::crc::crc32_seeded;
use super::protocol::{output, Connection, BT_OUTPUT_TAG, OUTPUT_COMMON_SIZE, TRIGGER_BLOCK_SIZE};
use super::state::{
    Color, LedBrightness, MicLed, OutputState, PlayerLedMask, PlayerLeds, TriggerEffect,
};
use crate::error::{Ds5Error, Result};

/// Encode an output report into `buffer`
///
/// The report area of `buffer` is zeroed first, so every byte not carrying a
/// field is deterministic. Nothing is written when validation fails.
///
/// # Arguments
///
/// * `state` - Desired controller output
/// * `connection` - Transport the report will be written to
/// * `sequence` - Bluetooth sequence counter (low 4 bits used, ignored on USB)
/// * `buffer` - Target buffer, at least the transport's output report length
///
/// # Returns
///
/// * `Result<usize>` - Number of bytes of `buffer` making up the report
///
/// # Errors
///
/// Returns error if:
/// - `buffer` is shorter than the output report (`InsufficientBuffer`)
/// - A section resistance effect ends before it starts (`InvalidArguments`)
///
/// # Examples
///
/// ```
/// use ds5w::report::encoder::encode_output;
/// use ds5w::report::protocol::Connection;
/// use ds5w::report::state::{Color, OutputState};
///
/// let state = OutputState {
///     lightbar: Color::new(0, 0, 255),
///     ..Default::default()
/// };
/// let mut buffer = [0u8; 78];
/// let len = encode_output(&state, Connection::Bluetooth, 0, &mut buffer).unwrap();
/// assert_eq!(len, 78);
/// assert_eq!(buffer[0], 0x31);
/// ```
pub fn encode_output(
    state: &OutputState,
    connection: Connection,
    sequence: u8,
    buffer: &mut [u8],
) -> Result<usize> {
    let layout = connection.output_layout();

    if buffer.len() < layout.report_len {
        return Err(Ds5Error::InsufficientBuffer {
            required: layout.report_len,
            actual: buffer.len(),
        });
    }
    validate_trigger_effect(&state.left_trigger_effect)?;
    validate_trigger_effect(&state.right_trigger_effect)?;

    let report = &mut buffer[..layout.report_len];
    report.fill(0);
    report[0] = layout.report_id;
    if connection == Connection::Bluetooth {
        report[1] = (sequence & 0x0F) << 4;
        report[2] = BT_OUTPUT_TAG;
    }

    let common = &mut report[layout.common_offset..layout.common_offset + OUTPUT_COMMON_SIZE];
    encode_common(state, common);

    if let (Some(seed), Some(crc_at)) = (layout.crc_seed, layout.crc_offset()) {
        let crc = crc32_seeded(seed, &report[..crc_at]);
        report[crc_at..crc_at + 4].copy_from_slice(&crc.to_le_bytes());
    }

    Ok(layout.report_len)
}

fn validate_trigger_effect(effect: &TriggerEffect) -> Result<()> {
    if let TriggerEffect::SectionResistance {
        start_position,
        end_position,
    } = *effect
    {
        if end_position < start_position {
            return Err(Ds5Error::InvalidArguments(format!(
                "section resistance end ({}) before start ({})",
                end_position, start_position
            )));
        }
    }
    Ok(())
}

fn encode_common(state: &OutputState, common: &mut [u8]) {
    common[output::VALID_FLAGS_0] = output::VALID_FLAGS_0_ALL;
    common[output::VALID_FLAGS_1] = output::VALID_FLAGS_1_ALL;
    common[output::VALID_FLAGS_2] = output::VALID_FLAGS_2_LIGHTBAR_SETUP;

    common[output::RIGHT_RUMBLE] = state.right_rumble;
    common[output::LEFT_RUMBLE] = state.left_rumble;
    common[output::MIC_LED] = state.microphone_led as u8;

    encode_trigger_block(
        &state.right_trigger_effect,
        &mut common[output::RIGHT_TRIGGER..output::RIGHT_TRIGGER + TRIGGER_BLOCK_SIZE],
    );
    encode_trigger_block(
        &state.left_trigger_effect,
        &mut common[output::LEFT_TRIGGER..output::LEFT_TRIGGER + TRIGGER_BLOCK_SIZE],
    );

    common[output::LIGHTBAR_SETUP] = if state.disable_leds {
        output::LIGHTBAR_SETUP_DISABLE_LEDS
    } else {
        output::LIGHTBAR_SETUP_ENABLE_LEDS
    };
    common[output::PLAYER_LED_BRIGHTNESS] = state.player_leds.brightness as u8;

    let mut leds = state.player_leds.bitmask.bits();
    if !state.player_leds.fade {
        leds |= output::PLAYER_LEDS_NO_FADE;
    }
    common[output::PLAYER_LEDS] = leds;

    common[output::LIGHTBAR_RED] = state.lightbar.r;
    common[output::LIGHTBAR_GREEN] = state.lightbar.g;
    common[output::LIGHTBAR_BLUE] = state.lightbar.b;
}

/// Write `[tag][params...]` into an 11-byte trigger block
fn encode_trigger_block(effect: &TriggerEffect, block: &mut [u8]) {
    let params = effect.params();
    block[0] = effect.type_tag();
    block[1..1 + params.len()].copy_from_slice(&params);
}

/// Parse an output report back into [`OutputState`]
///
/// Inverse of [`encode_output`], used to inspect reports captured in loopback
/// or produced by other tools.
///
/// # Errors
///
/// Returns error if:
/// - Report is shorter than the transport's output report (`InsufficientBuffer`)
/// - Report ID, Bluetooth tag or CRC is wrong
/// - A field carries a value no [`OutputState`] can produce (`InvalidArguments`)
pub fn decode_output(report: &[u8], connection: Connection) -> Result<OutputState> {
    let layout = connection.output_layout();

    if report.len() < layout.report_len {
        return Err(Ds5Error::InsufficientBuffer {
            required: layout.report_len,
            actual: report.len(),
        });
    }
    if report[0] != layout.report_id {
        return Err(Ds5Error::InvalidArguments(format!(
            "unexpected output report ID 0x{:02X}",
            report[0]
        )));
    }

    if let (Some(seed), Some(crc_at)) = (layout.crc_seed, layout.crc_offset()) {
        if report[2] != BT_OUTPUT_TAG {
            return Err(Ds5Error::BluetoothCommunication(format!(
                "unexpected output tag 0x{:02X}",
                report[2]
            )));
        }
        let received = u32::from_le_bytes([
            report[crc_at],
            report[crc_at + 1],
            report[crc_at + 2],
            report[crc_at + 3],
        ]);
        if received != crc32_seeded(seed, &report[..crc_at]) {
            return Err(Ds5Error::BluetoothCommunication(
                "output CRC mismatch".to_string(),
            ));
        }
    }

    let common = &report[layout.common_offset..layout.common_offset + OUTPUT_COMMON_SIZE];

    let microphone_led = match common[output::MIC_LED] {
        0x00 => MicLed::Off,
        0x01 => MicLed::On,
        0x02 => MicLed::Pulse,
        other => {
            return Err(Ds5Error::InvalidArguments(format!("mic LED value 0x{:02X}", other)))
        }
    };
    let brightness = match common[output::PLAYER_LED_BRIGHTNESS] {
        0x00 => LedBrightness::High,
        0x01 => LedBrightness::Medium,
        0x02 => LedBrightness::Low,
        other => {
            return Err(Ds5Error::InvalidArguments(format!(
                "player LED brightness 0x{:02X}",
                other
            )))
        }
    };
    let leds = common[output::PLAYER_LEDS];

    Ok(OutputState {
        left_rumble: common[output::LEFT_RUMBLE],
        right_rumble: common[output::RIGHT_RUMBLE],
        microphone_led,
        disable_leds: common[output::LIGHTBAR_SETUP] == output::LIGHTBAR_SETUP_DISABLE_LEDS,
        player_leds: PlayerLeds {
            bitmask: PlayerLedMask::from_bits_truncate(leds),
            fade: leds & output::PLAYER_LEDS_NO_FADE == 0,
            brightness,
        },
        lightbar: Color::new(
            common[output::LIGHTBAR_RED],
            common[output::LIGHTBAR_GREEN],
            common[output::LIGHTBAR_BLUE],
        ),
        left_trigger_effect: decode_trigger_block(
            &common[output::LEFT_TRIGGER..output::LEFT_TRIGGER + TRIGGER_BLOCK_SIZE],
        )?,
        right_trigger_effect: decode_trigger_block(
            &common[output::RIGHT_TRIGGER..output::RIGHT_TRIGGER + TRIGGER_BLOCK_SIZE],
        )?,
    })
}

fn decode_trigger_block(block: &[u8]) -> Result<TriggerEffect> {
    let p = &block[1..];
    let effect = match block[0] {
        TriggerEffect::TAG_NO_RESISTANCE => TriggerEffect::NoResistance,
        TriggerEffect::TAG_CONTINUOUS_RESISTANCE => TriggerEffect::ContinuousResistance {
            start_position: p[0],
            force: p[1],
        },
        TriggerEffect::TAG_SECTION_RESISTANCE => TriggerEffect::SectionResistance {
            start_position: p[0],
            end_position: p[1],
        },
        TriggerEffect::TAG_EFFECT_EX => TriggerEffect::EffectEx {
            start_position: p[0],
            keep_effect: p[1] != 0,
            begin_force: p[2],
            middle_force: p[3],
            end_force: p[4],
            frequency: p[5],
        },
        TriggerEffect::TAG_CALIBRATE => TriggerEffect::Calibrate,
        other => {
            return Err(Ds5Error::InvalidArguments(format!(
                "unknown trigger effect tag 0x{:02X}",
                other
            )))
        }
    };
    Ok(effect)
}
