//! # Input Report Decoder
//!
//! Decodes raw DualSense input reports into [`InputState`].

use super::crc::crc32_seeded;
use super::protocol::{input, Connection};
use super::state::{
    AnalogStick, Battery, FaceButtons, InputState, ShoulderButtons, SystemButtons, Touch, Vec3,
};
use crate::error::{Ds5Error, Result};

/// Decode a complete input report
///
/// # Arguments
///
/// * `report` - Raw report bytes as read from the device, starting with the report ID
/// * `connection` - Transport the report was read from
///
/// # Returns
///
/// * `Result<InputState>` - Fully populated snapshot
///
/// # Errors
///
/// Returns error if:
/// - Report is shorter than the transport's report size (`InsufficientBuffer`)
/// - Report ID is wrong (`BluetoothCommunication` on Bluetooth, `InvalidArguments` on USB)
/// - Bluetooth CRC check fails (`BluetoothCommunication`)
///
/// # Examples
///
/// ```
/// use ds5w::report::decoder::decode_input;
/// use ds5w::report::protocol::Connection;
///
/// let mut report = [0u8; 64];
/// report[0] = 0x01;
/// report[1] = 128; // left stick X centered
/// let state = decode_input(&report, Connection::Usb).unwrap();
/// assert_eq!(state.left_stick.x, 0);
/// ```
pub fn decode_input(report: &[u8], connection: Connection) -> Result<InputState> {
    let layout = connection.input_layout();

    if report.len() < layout.report_len {
        return Err(Ds5Error::InsufficientBuffer {
            required: layout.report_len,
            actual: report.len(),
        });
    }

    if report[0] != layout.report_id {
        let msg = format!(
            "unexpected input report ID 0x{:02X} (expected 0x{:02X})",
            report[0], layout.report_id
        );
        return Err(match connection {
            Connection::Bluetooth => Ds5Error::BluetoothCommunication(msg),
            Connection::Usb => Ds5Error::InvalidArguments(msg),
        });
    }

    if let (Some(seed), Some(crc_at)) = (layout.crc_seed, layout.crc_offset()) {
        let received = u32::from_le_bytes([
            report[crc_at],
            report[crc_at + 1],
            report[crc_at + 2],
            report[crc_at + 3],
        ]);
        let calculated = crc32_seeded(seed, &report[..crc_at]);
        if received != calculated {
            return Err(Ds5Error::BluetoothCommunication(format!(
                "input CRC mismatch: expected 0x{:08X}, got 0x{:08X}",
                calculated, received
            )));
        }
    }

    let payload = &report[layout.payload_offset..layout.payload_offset + input::PAYLOAD_LEN];
    Ok(decode_payload(payload))
}

/// Decode the transport-independent payload
///
/// `payload` must be at least [`input::PAYLOAD_LEN`] bytes; [`decode_input`]
/// guarantees this.
fn decode_payload(payload: &[u8]) -> InputState {
    let face_raw = payload[input::BUTTONS_FACE];
    let face_buttons =
        FaceButtons::from_bits_truncate(face_raw & 0xF0) | decode_dpad(face_raw & 0x0F);

    let peripherals = payload[input::PERIPHERALS];

    InputState {
        left_stick: AnalogStick {
            x: stick_axis(payload[input::LEFT_STICK_X]),
            y: stick_axis(payload[input::LEFT_STICK_Y]),
        },
        right_stick: AnalogStick {
            x: stick_axis(payload[input::RIGHT_STICK_X]),
            y: stick_axis(payload[input::RIGHT_STICK_Y]),
        },
        left_trigger: payload[input::LEFT_TRIGGER],
        right_trigger: payload[input::RIGHT_TRIGGER],
        face_buttons,
        shoulder_buttons: ShoulderButtons::from_bits_retain(payload[input::BUTTONS_A]),
        system_buttons: SystemButtons::from_bits_truncate(payload[input::BUTTONS_B]),
        accelerometer: read_vec3(payload, input::ACCELEROMETER),
        gyroscope: read_vec3(payload, input::GYROSCOPE),
        touch_point_1: decode_touch(&payload[input::TOUCH_POINT_1..input::TOUCH_POINT_1 + 4]),
        touch_point_2: decode_touch(&payload[input::TOUCH_POINT_2..input::TOUCH_POINT_2 + 4]),
        battery: Battery::from_status_byte(payload[input::BATTERY_STATUS]),
        headphones_connected: peripherals & input::PERIPHERAL_HEADPHONES != 0,
        left_trigger_feedback: payload[input::LEFT_TRIGGER_FEEDBACK],
        right_trigger_feedback: payload[input::RIGHT_TRIGGER_FEEDBACK],
    }
}

/// Map a raw stick byte (0-255, 128 = center) to a signed value (-128..127)
#[inline]
pub fn stick_axis(raw: u8) -> i8 {
    (raw as i16 - 128) as i8
}

/// Expand the hat switch value into D-pad direction bits
///
/// Hat values run clockwise from 0 (up) to 7 (up-left); 8 means released.
pub fn decode_dpad(hat: u8) -> FaceButtons {
    match hat {
        0 => FaceButtons::DPAD_UP,
        1 => FaceButtons::DPAD_UP | FaceButtons::DPAD_RIGHT,
        2 => FaceButtons::DPAD_RIGHT,
        3 => FaceButtons::DPAD_DOWN | FaceButtons::DPAD_RIGHT,
        4 => FaceButtons::DPAD_DOWN,
        5 => FaceButtons::DPAD_DOWN | FaceButtons::DPAD_LEFT,
        6 => FaceButtons::DPAD_LEFT,
        7 => FaceButtons::DPAD_UP | FaceButtons::DPAD_LEFT,
        _ => FaceButtons::empty(),
    }
}

fn read_vec3(payload: &[u8], at: usize) -> Vec3 {
    let axis = |i: usize| i16::from_le_bytes([payload[at + 2 * i], payload[at + 2 * i + 1]]);
    Vec3 {
        x: axis(0),
        y: axis(1),
        z: axis(2),
    }
}

/// Decode one 4-byte touch contact
///
/// Byte 0: bit 7 set = finger lifted, bits 0-6 = finger id.
/// Bytes 1-3: 12-bit X then 12-bit Y, little-endian nibble packed.
fn decode_touch(raw: &[u8]) -> Touch {
    Touch {
        active: raw[0] & input::TOUCH_INACTIVE == 0,
        id: raw[0] & !input::TOUCH_INACTIVE,
        x: raw[1] as u16 | ((raw[2] & 0x0F) as u16) << 8,
        y: (raw[2] >> 4) as u16 | (raw[3] as u16) << 4,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::report::protocol::MAX_REPORT_SIZE;

    #[test]
    fn test_decode_idle_report_both_transports() {
        for conn in [Connection::Usb, Connection::Bluetooth] {
            let report = input_report(conn, &idle_payload());
            let state = decode_input(&report, conn).unwrap();

            assert_eq!(state.left_stick, AnalogStick { x: 0, y: 0 });
            assert_eq!(state.right_stick, AnalogStick { x: 0, y: 0 });
            assert!(state.face_buttons.is_empty());
            assert!(state.shoulder_buttons.is_empty());
            assert!(state.system_buttons.is_empty());
            assert!(!state.touch_point_1.active);
            assert!(!state.touch_point_2.active);
        }
    }

    #[test]
    fn test_stick_axis_all_values() {
        for b in 0u8..=255 {
            let value = stick_axis(b);
            assert_eq!(value as i16, b as i16 - 128, "raw byte {}", b);
        }
        assert_eq!(stick_axis(128), 0);
        assert_eq!(stick_axis(0), -128);
        assert_eq!(stick_axis(255), 127);
    }

    #[test]
    fn test_decode_sticks_and_triggers() {
        let mut payload = idle_payload();
        payload[input::LEFT_STICK_X] = 0;
        payload[input::LEFT_STICK_Y] = 255;
        payload[input::RIGHT_STICK_X] = 200;
        payload[input::RIGHT_STICK_Y] = 100;
        payload[input::LEFT_TRIGGER] = 0x7F;
        payload[input::RIGHT_TRIGGER] = 0xFF;

        let state = decode_input(&input_report(Connection::Usb, &payload), Connection::Usb).unwrap();
        assert_eq!(state.left_stick, AnalogStick { x: -128, y: 127 });
        assert_eq!(state.right_stick, AnalogStick { x: 72, y: -28 });
        assert_eq!(state.left_trigger, 0x7F);
        assert_eq!(state.right_trigger, 0xFF);
    }

    #[test]
    fn test_decode_dpad_hat_values() {
        assert_eq!(decode_dpad(0), FaceButtons::DPAD_UP);
        assert_eq!(decode_dpad(2), FaceButtons::DPAD_RIGHT);
        assert_eq!(decode_dpad(4), FaceButtons::DPAD_DOWN);
        assert_eq!(decode_dpad(6), FaceButtons::DPAD_LEFT);
        assert_eq!(decode_dpad(5), FaceButtons::DPAD_DOWN | FaceButtons::DPAD_LEFT);
        assert_eq!(decode_dpad(7), FaceButtons::DPAD_UP | FaceButtons::DPAD_LEFT);
        assert_eq!(decode_dpad(8), FaceButtons::empty());
        assert_eq!(decode_dpad(0x0F), FaceButtons::empty());
    }

    #[test]
    fn test_decode_buttons() {
        let mut payload = idle_payload();
        payload[input::BUTTONS_FACE] = 0x20 | 0x80 | 0x02; // cross, triangle, hat right
        payload[input::BUTTONS_A] = 0x01 | 0x20; // L1, options
        payload[input::BUTTONS_B] = 0x01 | 0x04; // PS, mic

        let state = decode_input(&input_report(Connection::Usb, &payload), Connection::Usb).unwrap();
        assert_eq!(
            state.face_buttons,
            FaceButtons::CROSS | FaceButtons::TRIANGLE | FaceButtons::DPAD_RIGHT
        );
        assert_eq!(
            state.shoulder_buttons,
            ShoulderButtons::LEFT_BUMPER | ShoulderButtons::OPTIONS
        );
        assert_eq!(state.system_buttons, SystemButtons::PLAYSTATION | SystemButtons::MIC);
    }

    #[test]
    fn test_decode_motion_little_endian() {
        let mut payload = idle_payload();
        payload[input::GYROSCOPE..input::GYROSCOPE + 6]
            .copy_from_slice(&[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80]);
        payload[input::ACCELEROMETER..input::ACCELEROMETER + 6]
            .copy_from_slice(&[0x34, 0x12, 0x00, 0x20, 0xFE, 0x7F]);

        let state = decode_input(&input_report(Connection::Usb, &payload), Connection::Usb).unwrap();
        assert_eq!(state.gyroscope, Vec3 { x: 1, y: -1, z: i16::MIN });
        assert_eq!(state.accelerometer, Vec3 { x: 0x1234, y: 0x2000, z: 0x7FFE });
    }

    #[test]
    fn test_decode_touch_points_independent() {
        let mut payload = idle_payload();
        // Point 1 active, id 5, x = 0x3A7, y = 0x1F2
        payload[input::TOUCH_POINT_1..input::TOUCH_POINT_1 + 4]
            .copy_from_slice(&[0x05, 0xA7, 0x23, 0x1F]);
        // Point 2 inactive (bit 7 set), id 6, x = 0x7FF, y = 0x437
        payload[input::TOUCH_POINT_2..input::TOUCH_POINT_2 + 4]
            .copy_from_slice(&[0x86, 0xFF, 0x77, 0x43]);

        let state =
            decode_input(&input_report(Connection::Bluetooth, &payload), Connection::Bluetooth)
                .unwrap();

        assert_eq!(state.touch_point_1, Touch { active: true, id: 5, x: 0x3A7, y: 0x1F2 });
        assert_eq!(state.touch_point_2, Touch { active: false, id: 6, x: 0x7FF, y: 0x437 });
    }

    #[test]
    fn test_decode_battery_headphones_feedback() {
        let mut payload = idle_payload();
        payload[input::BATTERY_STATUS] = 0x17;
        payload[input::PERIPHERALS] = 0x01;
        payload[input::LEFT_TRIGGER_FEEDBACK] = 0x21;
        payload[input::RIGHT_TRIGGER_FEEDBACK] = 0x93;

        let state = decode_input(&input_report(Connection::Usb, &payload), Connection::Usb).unwrap();
        assert_eq!(
            state.battery,
            Battery {
                charging: true,
                fully_charged: false,
                level: 7,
                fault: None,
            }
        );
        assert_eq!(state.battery.to_status_byte(), 0x17);
        assert!(state.headphones_connected);
        assert_eq!(state.left_trigger_feedback, 0x21);
        assert_eq!(state.right_trigger_feedback, 0x93);
    }

    #[test]
    fn test_decode_short_buffer_fails() {
        for conn in [Connection::Usb, Connection::Bluetooth] {
            let len = conn.input_layout().report_len;
            let report = input_report(conn, &idle_payload());
            for short in [0, 1, len / 2, len - 1] {
                match decode_input(&report[..short], conn) {
                    Err(Ds5Error::InsufficientBuffer { required, actual }) => {
                        assert_eq!(required, len);
                        assert_eq!(actual, short);
                    }
                    other => panic!("Expected InsufficientBuffer, got: {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_decode_accepts_oversized_scratch_buffer() {
        let mut scratch = vec![0u8; MAX_REPORT_SIZE];
        let report = input_report(Connection::Bluetooth, &idle_payload());
        scratch[..report.len()].copy_from_slice(&report);

        assert!(decode_input(&scratch, Connection::Bluetooth).is_ok());
    }

    #[test]
    fn test_decode_bluetooth_crc_mismatch() {
        let mut report = input_report(Connection::Bluetooth, &idle_payload());
        report[10] ^= 0xFF;

        match decode_input(&report, Connection::Bluetooth) {
            Err(Ds5Error::BluetoothCommunication(msg)) => assert!(msg.contains("CRC")),
            other => panic!("Expected BluetoothCommunication, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_wrong_report_id() {
        let mut report = input_report(Connection::Usb, &idle_payload());
        report[0] = 0x05;
        assert!(matches!(
            decode_input(&report, Connection::Usb),
            Err(Ds5Error::InvalidArguments(_))
        ));

        // Reduced-mode Bluetooth report
        let mut report = input_report(Connection::Bluetooth, &idle_payload());
        report[0] = 0x01;
        seal_bt_input(&mut report);
        assert!(matches!(
            decode_input(&report, Connection::Bluetooth),
            Err(Ds5Error::BluetoothCommunication(_))
        ));
    }

    #[test]
    fn test_usb_report_has_no_checksum() {
        let mut report = input_report(Connection::Usb, &idle_payload());
        // Bytes past the payload are ignored on USB
        report[63] = 0xAB;
        assert!(decode_input(&report, Connection::Usb).is_ok());
    }
}
