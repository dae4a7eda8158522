//! # Transport Layer
//!
//! Moves single reports between a HID handle and the report codec.
//!
//! This module handles:
//! - Blocking read of one input report and its decoding
//! - Encoding and writing of one output report (Bluetooth CRC included)
//! - Switching Bluetooth controllers to full input reports

pub mod hid;

use tracing::{debug, trace, warn};

use crate::error::{Ds5Error, Result};
use crate::report::decoder::decode_input;
use crate::report::encoder::encode_output;
use crate::report::protocol::{
    Connection, FEATURE_REPORT_CALIBRATION, FEATURE_REPORT_CALIBRATION_SIZE,
};
use crate::report::state::{InputState, OutputState};
use hid::HidHandle;

/// Read and decode one input report
///
/// `buffer` is scratch space, at least the transport's input report length.
///
/// # Errors
///
/// Returns error if:
/// - The OS read fails (`DeviceRemoved` or `ExternalApi`)
/// - The report is malformed (see [`decode_input`]). A short Bluetooth
///   frame, such as a reduced 0x01 report sent before activation, is
///   `BluetoothCommunication` rather than `InsufficientBuffer`
pub fn read_input(
    handle: &mut dyn HidHandle,
    connection: Connection,
    buffer: &mut [u8],
) -> Result<InputState> {
    let n = handle.read(buffer)?;
    trace!("Read {} byte input report over {}", n, connection);

    decode_input(&buffer[..n], connection).map_err(|e| {
        let e = match (connection, e) {
            (Connection::Bluetooth, Ds5Error::InsufficientBuffer { required, actual }) => {
                Ds5Error::BluetoothCommunication(format!(
                    "short input report: {} of {} bytes",
                    actual, required
                ))
            }
            (_, e) => e,
        };
        if let Ds5Error::BluetoothCommunication(ref msg) = e {
            warn!("Dropping corrupt input report: {}", msg);
        }
        e
    })
}

/// Encode and write one output report
///
/// # Errors
///
/// Returns error if:
/// - The state cannot be encoded (see [`encode_output`])
/// - The OS write fails or is short
pub fn write_output(
    handle: &mut dyn HidHandle,
    connection: Connection,
    buffer: &mut [u8],
    state: &OutputState,
    sequence: u8,
) -> Result<()> {
    let len = encode_output(state, connection, sequence, buffer)?;
    let written = handle.write(&buffer[..len])?;

    if written < len {
        return Err(Ds5Error::ExternalApi(format!(
            "short output write: {} of {} bytes",
            written, len
        )));
    }

    trace!("Wrote {} byte output report over {}", len, connection);
    Ok(())
}

/// Switch a Bluetooth controller from reduced to full input reports
///
/// Reading the calibration feature report is what makes the firmware start
/// sending 0x31 reports.
///
/// # Errors
///
/// Returns `BluetoothCommunication` if the feature report cannot be read.
pub fn enable_extended_reports(handle: &mut dyn HidHandle) -> Result<()> {
    let mut report = [0u8; FEATURE_REPORT_CALIBRATION_SIZE];
    report[0] = FEATURE_REPORT_CALIBRATION;

    handle.get_feature_report(&mut report).map_err(|e| {
        Ds5Error::BluetoothCommunication(format!("enabling extended reports failed: {}", e))
    })?;

    debug!("Bluetooth extended input reports enabled");
    Ok(())
}
