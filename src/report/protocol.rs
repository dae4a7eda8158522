//! # DualSense Report Constants and Layouts
//!
//! Report IDs, report sizes and byte offsets of the DualSense HID reports.
//!
//! USB and Bluetooth carry the same logical fields at different positions:
//! Bluetooth prepends an extra header byte to input reports, wraps output
//! reports in a sequence/tag header and appends a CRC-32. The differences are
//! captured by one [`InputLayout`] and one [`OutputLayout`] per transport;
//! field offsets inside the payload are shared.

use serde::{Deserialize, Serialize};

/// Sony vendor ID
pub const DS5_VENDOR_ID: u16 = 0x054C;

/// DualSense product ID
pub const DS5_PRODUCT_ID: u16 = 0x0CE6;

/// DualSense Edge product ID
pub const DS5_EDGE_PRODUCT_ID: u16 = 0x0DF2;

/// All product IDs handled by this crate
pub const DS5_PRODUCT_IDS: [u16; 2] = [DS5_PRODUCT_ID, DS5_EDGE_PRODUCT_ID];

/// Size of the scratch buffer owned by every device context.
///
/// Large enough for the biggest report the controller can produce.
pub const MAX_REPORT_SIZE: usize = 547;

/// CRC seed byte prepended to Bluetooth input reports
pub const BT_INPUT_CRC_SEED: u8 = 0xA1;

/// CRC seed byte prepended to Bluetooth output reports
pub const BT_OUTPUT_CRC_SEED: u8 = 0xA2;

/// Size of the trailing CRC-32 on Bluetooth reports
pub const BT_CRC_SIZE: usize = 4;

/// Feature report that switches a Bluetooth controller to full 0x31 reports
pub const FEATURE_REPORT_CALIBRATION: u8 = 0x05;

/// Size of the calibration feature report (including report ID)
pub const FEATURE_REPORT_CALIBRATION_SIZE: usize = 41;

/// Tag byte following the sequence byte in Bluetooth output reports
pub const BT_OUTPUT_TAG: u8 = 0x10;

/// Size of the common output block shared by both transports
pub const OUTPUT_COMMON_SIZE: usize = 47;

/// Size of one adaptive trigger block (mode + 10 parameter bytes)
pub const TRIGGER_BLOCK_SIZE: usize = 11;

/// Size of the raw trigger effect parameter block
pub const TRIGGER_PARAM_SIZE: usize = 6;

/// Physical link a controller is attached over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connection {
    Usb,
    Bluetooth,
}

impl Connection {
    /// Input report layout for this transport
    pub const fn input_layout(self) -> &'static InputLayout {
        match self {
            Connection::Usb => &USB_INPUT_LAYOUT,
            Connection::Bluetooth => &BT_INPUT_LAYOUT,
        }
    }

    /// Output report layout for this transport
    pub const fn output_layout(self) -> &'static OutputLayout {
        match self {
            Connection::Usb => &USB_OUTPUT_LAYOUT,
            Connection::Bluetooth => &BT_OUTPUT_LAYOUT,
        }
    }

    /// Classify a HID interface as USB or Bluetooth.
    ///
    /// The OS reports no USB interface number (`-1`) for Bluetooth HID
    /// devices.
    pub const fn from_interface_number(interface_number: i32) -> Self {
        if interface_number < 0 {
            Connection::Bluetooth
        } else {
            Connection::Usb
        }
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connection::Usb => f.write_str("USB"),
            Connection::Bluetooth => f.write_str("Bluetooth"),
        }
    }
}

/// Framing of an input report on one transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLayout {
    /// Expected first byte of the report
    pub report_id: u8,
    /// Full report size including header and checksum
    pub report_len: usize,
    /// Offset of the shared payload inside the report
    pub payload_offset: usize,
    /// CRC seed byte, `None` when the report carries no checksum
    pub crc_seed: Option<u8>,
}

/// Framing of an output report on one transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    /// First byte of the report
    pub report_id: u8,
    /// Full report size including header and checksum
    pub report_len: usize,
    /// Offset of the common output block inside the report
    pub common_offset: usize,
    /// CRC seed byte, `None` when the report carries no checksum
    pub crc_seed: Option<u8>,
}

impl InputLayout {
    /// Offset of the trailing CRC, if any
    pub const fn crc_offset(&self) -> Option<usize> {
        match self.crc_seed {
            Some(_) => Some(self.report_len - BT_CRC_SIZE),
            None => None,
        }
    }
}

impl OutputLayout {
    /// Offset of the trailing CRC, if any
    pub const fn crc_offset(&self) -> Option<usize> {
        match self.crc_seed {
            Some(_) => Some(self.report_len - BT_CRC_SIZE),
            None => None,
        }
    }
}

/// USB input report: `[0x01][payload...]`
pub const USB_INPUT_LAYOUT: InputLayout = InputLayout {
    report_id: 0x01,
    report_len: 64,
    payload_offset: 1,
    crc_seed: None,
};

/// Bluetooth input report: `[0x31][seq][payload...][crc32]`
pub const BT_INPUT_LAYOUT: InputLayout = InputLayout {
    report_id: 0x31,
    report_len: 78,
    payload_offset: 2,
    crc_seed: Some(BT_INPUT_CRC_SEED),
};

/// USB output report: `[0x02][common...]`
pub const USB_OUTPUT_LAYOUT: OutputLayout = OutputLayout {
    report_id: 0x02,
    report_len: 48,
    common_offset: 1,
    crc_seed: None,
};

/// Bluetooth output report: `[0x31][seq tag][0x10][common...][reserved][crc32]`
pub const BT_OUTPUT_LAYOUT: OutputLayout = OutputLayout {
    report_id: 0x31,
    report_len: 78,
    common_offset: 3,
    crc_seed: Some(BT_OUTPUT_CRC_SEED),
};

/// Field offsets inside the input payload (identical on both transports)
pub mod input {
    pub const LEFT_STICK_X: usize = 0x00;
    pub const LEFT_STICK_Y: usize = 0x01;
    pub const RIGHT_STICK_X: usize = 0x02;
    pub const RIGHT_STICK_Y: usize = 0x03;
    pub const LEFT_TRIGGER: usize = 0x04;
    pub const RIGHT_TRIGGER: usize = 0x05;
    /// Hat switch (low nibble) and face buttons (high nibble)
    pub const BUTTONS_FACE: usize = 0x07;
    pub const BUTTONS_A: usize = 0x08;
    pub const BUTTONS_B: usize = 0x09;
    pub const GYROSCOPE: usize = 0x0F;
    pub const ACCELEROMETER: usize = 0x15;
    pub const TOUCH_POINT_1: usize = 0x20;
    pub const TOUCH_POINT_2: usize = 0x24;
    pub const LEFT_TRIGGER_FEEDBACK: usize = 0x29;
    pub const RIGHT_TRIGGER_FEEDBACK: usize = 0x2A;
    pub const BATTERY_STATUS: usize = 0x34;
    pub const PERIPHERALS: usize = 0x35;

    /// Bit 0 of the peripheral byte: headphones plugged in
    pub const PERIPHERAL_HEADPHONES: u8 = 0x01;
    /// Bit 7 of a touch contact byte: finger NOT on the pad
    pub const TOUCH_INACTIVE: u8 = 0x80;
    /// Hat value reported when no direction is held
    pub const HAT_RELEASED: u8 = 0x08;

    /// Payload bytes the decoder needs
    pub const PAYLOAD_LEN: usize = PERIPHERALS + 1;
}

/// Field offsets inside the common output block
pub mod output {
    pub const VALID_FLAGS_0: usize = 0x00;
    pub const VALID_FLAGS_1: usize = 0x01;
    pub const RIGHT_RUMBLE: usize = 0x02;
    pub const LEFT_RUMBLE: usize = 0x03;
    pub const MIC_LED: usize = 0x08;
    pub const RIGHT_TRIGGER: usize = 0x0A;
    pub const LEFT_TRIGGER: usize = 0x15;
    pub const VALID_FLAGS_2: usize = 0x26;
    pub const LIGHTBAR_SETUP: usize = 0x29;
    pub const PLAYER_LED_BRIGHTNESS: usize = 0x2A;
    pub const PLAYER_LEDS: usize = 0x2B;
    pub const LIGHTBAR_RED: usize = 0x2C;
    pub const LIGHTBAR_GREEN: usize = 0x2D;
    pub const LIGHTBAR_BLUE: usize = 0x2E;

    /// Enable rumble, trigger, audio and haptics fields
    pub const VALID_FLAGS_0_ALL: u8 = 0xFF;
    /// Enable mic LED, power save, lightbar and player LED fields
    pub const VALID_FLAGS_1_ALL: u8 = 0xF7;
    /// Enable the lightbar setup field
    pub const VALID_FLAGS_2_LIGHTBAR_SETUP: u8 = 0x02;

    pub const LIGHTBAR_SETUP_DISABLE_LEDS: u8 = 0x01;
    pub const LIGHTBAR_SETUP_ENABLE_LEDS: u8 = 0x02;

    /// Player LED mask bit that suppresses the fade-in animation
    pub const PLAYER_LEDS_NO_FADE: u8 = 0x20;
}
