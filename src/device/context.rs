//! Device context lifecycle
//!
//! A [`DeviceContext`] owns the OS handle and scratch buffer of one opened
//! controller and walks the state machine
//!
//! ```text
//! Closed --open--> Connected --device removed--> Disconnected
//!                      ^                             |
//!                      +---------reconnect-----------+--failed--> Closed
//! ```
//!
//! `reconnect` only leaves `Disconnected`; a `Closed` context comes back
//! through `reopen`.
//!
//! Ticking is caller-driven: every call blocks on the OS and returns.

use tracing::{debug, info, warn};

use super::enumerator::DeviceEnumInfo;
use crate::error::{Ds5Error, Result};
use crate::report::protocol::{Connection, MAX_REPORT_SIZE};
use crate::report::state::{InputState, OutputState};
use crate::transport::hid::{HidBackend, HidHandle};
use crate::transport::{enable_extended_reports, read_input, write_output};

/// Lifecycle state of a [`DeviceContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No handle, initial and terminal state
    Closed,
    /// Handle open and usable
    Connected,
    /// Device went away, handle released, path retained for reconnect
    Disconnected,
}

/// Live connection to one controller
pub struct DeviceContext {
    path: String,
    connection: Connection,
    handle: Option<Box<dyn HidHandle>>,
    state: ContextState,
    buffer: Box<[u8; MAX_REPORT_SIZE]>,
    output_sequence: u8,
    last_input: InputState,
}

impl DeviceContext {
    /// Open the controller behind an enumeration entry
    ///
    /// On Bluetooth the controller is also switched to full input reports.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The OS open fails (`ExternalApi`); re-enumerate and retry
    /// - Bluetooth activation fails (`BluetoothCommunication`); the handle is released
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ds5w::device::{enumerate, DeviceContext};
    /// use ds5w::transport::hid::SystemHid;
    ///
    /// let hid = SystemHid::new().unwrap();
    /// let devices = enumerate(&hid).unwrap();
    /// let mut ctx = DeviceContext::open(&hid, &devices[0]).unwrap();
    /// let state = ctx.read_input().unwrap();
    /// println!("left stick: {:?}", state.left_stick);
    /// ```
    pub fn open(backend: &dyn HidBackend, info: &DeviceEnumInfo) -> Result<Self> {
        let mut ctx = Self {
            path: info.path.clone(),
            connection: info.connection,
            handle: None,
            state: ContextState::Closed,
            buffer: Box::new([0u8; MAX_REPORT_SIZE]),
            output_sequence: 0,
            last_input: InputState::default(),
        };
        ctx.connect(backend)?;
        info!("Opened DualSense at {} over {}", ctx.path, ctx.connection);
        Ok(ctx)
    }

    /// Re-initialize this context from a fresh enumeration entry
    ///
    /// Fallback when [`reconnect`](Self::reconnect) fails because the device
    /// came back under a different path. Any current handle is released
    /// first; the scratch buffer is reused.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open). The context is `Closed` on failure.
    pub fn reopen(&mut self, backend: &dyn HidBackend, info: &DeviceEnumInfo) -> Result<()> {
        self.release();
        self.path = info.path.clone();
        self.connection = info.connection;
        self.connect(backend)?;
        info!("Reopened DualSense at {} over {}", self.path, self.connection);
        Ok(())
    }

    /// Reopen the handle at the stored path without re-enumerating
    ///
    /// A no-op on a connected context.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The context is `Closed` (`InvalidArguments`); use [`reopen`](Self::reopen)
    /// - The path cannot be opened; the context is then `Closed` and the
    ///   caller should re-enumerate and [`reopen`](Self::reopen)
    pub fn reconnect(&mut self, backend: &dyn HidBackend) -> Result<()> {
        match self.state {
            ContextState::Connected => return Ok(()),
            ContextState::Closed => {
                return Err(Ds5Error::InvalidArguments(
                    "device context is closed".to_string(),
                ))
            }
            ContextState::Disconnected => {}
        }

        debug!("Reconnecting DualSense at {}", self.path);
        match self.connect(backend) {
            Ok(()) => {
                info!("Reconnected DualSense at {}", self.path);
                Ok(())
            }
            Err(e) => {
                warn!("Reconnect to {} failed: {}", self.path, e);
                Err(e)
            }
        }
    }

    /// Release the OS handle; safe to call repeatedly
    pub fn close(&mut self) {
        if self.state != ContextState::Closed {
            debug!("Closing DualSense at {}", self.path);
        }
        self.release();
    }

    /// Read and decode the next input report
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The context is closed (`InvalidArguments`)
    /// - The device is gone (`DeviceRemoved`); the context becomes `Disconnected`
    /// - The report is corrupt or the OS read fails
    pub fn read_input(&mut self) -> Result<InputState> {
        let handle = live_handle(self.state, &mut self.handle)?;

        match read_input(handle, self.connection, &mut self.buffer[..]) {
            Ok(state) => {
                self.last_input = state;
                Ok(state)
            }
            Err(e) => Err(self.note_failure(e)),
        }
    }

    /// Encode and push an output state
    ///
    /// # Errors
    ///
    /// Same as [`read_input`](Self::read_input), plus encode failures.
    pub fn write_output(&mut self, state: &OutputState) -> Result<()> {
        let handle = live_handle(self.state, &mut self.handle)?;

        let sequence = self.output_sequence;
        match write_output(handle, self.connection, &mut self.buffer[..], state, sequence) {
            Ok(()) => {
                self.output_sequence = (self.output_sequence + 1) & 0x0F;
                Ok(())
            }
            Err(e) => Err(self.note_failure(e)),
        }
    }

    /// Transport the controller is attached over
    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// OS path this context opens on reconnect
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Most recent successfully decoded input
    pub fn last_input(&self) -> &InputState {
        &self.last_input
    }

    fn connect(&mut self, backend: &dyn HidBackend) -> Result<()> {
        self.release();

        let mut handle = backend.open_path(&self.path)?;
        if self.connection == Connection::Bluetooth {
            // Dropping `handle` on error releases it
            enable_extended_reports(handle.as_mut())?;
        }

        self.buffer.fill(0);
        self.handle = Some(handle);
        self.state = ContextState::Connected;
        Ok(())
    }

    fn release(&mut self) {
        self.handle = None;
        self.state = ContextState::Closed;
    }

    fn note_failure(&mut self, error: Ds5Error) -> Ds5Error {
        if matches!(error, Ds5Error::DeviceRemoved) {
            warn!("DualSense at {} was removed", self.path);
            self.handle = None;
            self.state = ContextState::Disconnected;
        }
        error
    }
}

/// Handle usable for I/O in `state`, or the error a call must fail with
fn live_handle(
    state: ContextState,
    handle: &mut Option<Box<dyn HidHandle>>,
) -> Result<&mut dyn HidHandle> {
    match state {
        ContextState::Closed => Err(Ds5Error::InvalidArguments(
            "device context is closed".to_string(),
        )),
        ContextState::Disconnected => Err(Ds5Error::DeviceRemoved),
        // Connected always carries a handle
        ContextState::Connected => match handle {
            Some(h) => Ok(h.as_mut()),
            None => Err(Ds5Error::StackOverflow),
        },
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::enumerator::enumerate;
    use crate::report::decoder::fixtures::{idle_payload, input_report};
    use crate::report::protocol::input;
    use crate::report::state::Color;
    use crate::transport::hid::mocks::FakeHidBackend;

    const USB_PATH: &str = "/dev/hidraw1";
    const BT_PATH: &str = "/dev/hidraw2";

    fn backend() -> FakeHidBackend {
        let backend = FakeHidBackend::new();
        backend.add_device(USB_PATH, 0x0CE6, 3);
        backend.add_device(BT_PATH, 0x0CE6, -1);
        backend
    }

    fn info_for(backend: &FakeHidBackend, path: &str) -> DeviceEnumInfo {
        enumerate(backend)
            .unwrap()
            .into_iter()
            .find(|d| d.path() == path)
            .unwrap()
    }

    #[test]
    fn test_open_read_write_usb() {
        let backend = backend();
        let mut payload = idle_payload();
        payload[input::LEFT_TRIGGER] = 0x42;
        backend.push_read(input_report(Connection::Usb, &payload));

        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, USB_PATH)).unwrap();
        assert_eq!(ctx.state(), ContextState::Connected);
        assert_eq!(ctx.connection(), Connection::Usb);

        let state = ctx.read_input().unwrap();
        assert_eq!(state.left_trigger, 0x42);
        assert_eq!(ctx.last_input().left_trigger, 0x42);

        let out = OutputState {
            lightbar: Color::new(1, 2, 3),
            ..Default::default()
        };
        ctx.write_output(&out).unwrap();

        let written = backend.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].len(), 48);
        assert_eq!(written[0][0], 0x02);
    }

    #[test]
    fn test_open_bluetooth_advances_sequence() {
        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, BT_PATH)).unwrap();

        for _ in 0..17 {
            ctx.write_output(&OutputState::default()).unwrap();
        }

        let written = backend.written();
        assert_eq!(written[0][1], 0x00);
        assert_eq!(written[1][1], 0x10);
        assert_eq!(written[15][1], 0xF0);
        assert_eq!(written[16][1], 0x00);
    }

    #[test]
    fn test_open_bluetooth_activation_failure_releases_handle() {
        let backend = backend();
        backend.set_feature_report_fails(true);

        let result = DeviceContext::open(&backend, &info_for(&backend, BT_PATH));
        assert!(matches!(result, Err(Ds5Error::BluetoothCommunication(_))));
        assert_eq!(backend.live_handles(), 0);
    }

    #[test]
    fn test_open_missing_device_is_external_api() {
        let backend = backend();
        let info = info_for(&backend, USB_PATH);
        backend.unplug(USB_PATH);

        assert!(matches!(
            DeviceContext::open(&backend, &info),
            Err(Ds5Error::ExternalApi(_))
        ));
    }

    #[test]
    fn test_removal_then_reconnect_same_path() {
        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, BT_PATH)).unwrap();

        backend.unplug(BT_PATH);
        assert!(matches!(ctx.read_input(), Err(Ds5Error::DeviceRemoved)));
        assert_eq!(ctx.state(), ContextState::Disconnected);
        assert_eq!(backend.live_handles(), 0);

        // Further calls fail fast without touching the OS
        assert!(matches!(
            ctx.write_output(&OutputState::default()),
            Err(Ds5Error::DeviceRemoved)
        ));

        backend.replug(BT_PATH);
        backend.push_read(input_report(Connection::Bluetooth, &idle_payload()));
        ctx.reconnect(&backend).unwrap();
        assert_eq!(ctx.state(), ContextState::Connected);
        assert!(ctx.read_input().is_ok());

        assert_eq!(backend.max_live_handles(), 1);
    }

    #[test]
    fn test_failed_reconnect_then_reopen_new_path() {
        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, USB_PATH)).unwrap();

        backend.unplug(USB_PATH);
        assert!(ctx.read_input().is_err());

        // Re-plug under a different path
        backend.add_device("/dev/hidraw7", 0x0CE6, 1);
        let err = ctx.reconnect(&backend).unwrap_err();
        assert!(matches!(err, Ds5Error::ExternalApi(_)));
        assert_eq!(ctx.state(), ContextState::Closed);
        assert!(matches!(ctx.read_input(), Err(Ds5Error::InvalidArguments(_))));

        let fresh = enumerate(&backend).unwrap();
        let replugged = fresh.iter().find(|d| d.path() == "/dev/hidraw7").unwrap();
        ctx.reopen(&backend, replugged).unwrap();

        assert_eq!(ctx.state(), ContextState::Connected);
        assert_eq!(ctx.path(), "/dev/hidraw7");
        assert_eq!(backend.live_handles(), 1);
        assert_eq!(backend.max_live_handles(), 1);
    }

    #[test]
    fn test_usb_removal_then_reconnect_same_path() {
        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, USB_PATH)).unwrap();

        backend.push_read_error(Ds5Error::DeviceRemoved);
        assert!(matches!(ctx.read_input(), Err(Ds5Error::DeviceRemoved)));
        assert_eq!(ctx.state(), ContextState::Disconnected);
        assert_eq!(backend.live_handles(), 0);

        let mut payload = idle_payload();
        payload[input::RIGHT_TRIGGER] = 0x80;
        backend.push_read(input_report(Connection::Usb, &payload));
        ctx.reconnect(&backend).unwrap();
        assert_eq!(ctx.state(), ContextState::Connected);
        assert_eq!(ctx.connection(), Connection::Usb);
        assert_eq!(ctx.read_input().unwrap().right_trigger, 0x80);

        ctx.write_output(&OutputState::default()).unwrap();
        assert_eq!(backend.written()[0][0], 0x02);
        assert_eq!(backend.open_count(), 2);
        assert_eq!(backend.max_live_handles(), 1);
    }

    #[test]
    fn test_reconnect_after_close_is_rejected() {
        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, USB_PATH)).unwrap();
        ctx.close();

        assert!(matches!(
            ctx.reconnect(&backend),
            Err(Ds5Error::InvalidArguments(_))
        ));
        assert_eq!(ctx.state(), ContextState::Closed);
        assert_eq!(backend.live_handles(), 0);
        assert_eq!(backend.open_count(), 1);
    }

    #[test]
    fn test_reconnect_after_failed_reconnect_is_rejected() {
        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, USB_PATH)).unwrap();

        backend.unplug(USB_PATH);
        assert!(ctx.read_input().is_err());
        assert!(ctx.reconnect(&backend).is_err());
        assert_eq!(ctx.state(), ContextState::Closed);

        backend.replug(USB_PATH);
        assert!(matches!(
            ctx.reconnect(&backend),
            Err(Ds5Error::InvalidArguments(_))
        ));
        assert_eq!(backend.live_handles(), 0);

        ctx.reopen(&backend, &info_for(&backend, USB_PATH)).unwrap();
        assert_eq!(ctx.state(), ContextState::Connected);
    }

    #[test]
    fn test_reconnect_when_connected_is_noop() {
        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, USB_PATH)).unwrap();

        ctx.reconnect(&backend).unwrap();
        assert_eq!(backend.open_count(), 1);
        assert_eq!(backend.max_live_handles(), 1);
    }

    #[test]
    fn test_reopen_while_connected_never_holds_two_handles() {
        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, USB_PATH)).unwrap();

        ctx.reopen(&backend, &info_for(&backend, BT_PATH)).unwrap();
        assert_eq!(ctx.connection(), Connection::Bluetooth);
        assert_eq!(backend.max_live_handles(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, USB_PATH)).unwrap();

        ctx.close();
        ctx.close();
        assert_eq!(ctx.state(), ContextState::Closed);
        assert_eq!(backend.live_handles(), 0);
        assert!(matches!(
            ctx.write_output(&OutputState::default()),
            Err(Ds5Error::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_drop_releases_handle() {
        let backend = backend();
        {
            let _ctx = DeviceContext::open(&backend, &info_for(&backend, USB_PATH)).unwrap();
            assert_eq!(backend.live_handles(), 1);
        }
        assert_eq!(backend.live_handles(), 0);
    }

    #[test]
    fn test_corrupt_report_keeps_connection() {
        let backend = backend();
        let mut report = input_report(Connection::Bluetooth, &idle_payload());
        report[5] ^= 0xFF;
        backend.push_read(report);

        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, BT_PATH)).unwrap();
        let err = ctx.read_input().unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(ctx.state(), ContextState::Connected);
    }

    #[test]
    fn test_invalid_output_does_not_advance_sequence() {
        use crate::report::state::TriggerEffect;

        let backend = backend();
        let mut ctx = DeviceContext::open(&backend, &info_for(&backend, BT_PATH)).unwrap();

        let bad = OutputState {
            left_trigger_effect: TriggerEffect::SectionResistance {
                start_position: 9,
                end_position: 1,
            },
            ..Default::default()
        };
        assert!(matches!(ctx.write_output(&bad), Err(Ds5Error::InvalidArguments(_))));
        assert_eq!(ctx.state(), ContextState::Connected);

        ctx.write_output(&OutputState::default()).unwrap();
        assert_eq!(backend.written()[0][1], 0x00);
    }

    #[test]
    #[ignore] // Requires a connected DualSense
    fn test_hardware_read_write() {
        use crate::transport::hid::SystemHid;

        let hid = SystemHid::new().unwrap();
        let devices = enumerate(&hid).unwrap();
        let mut ctx = DeviceContext::open(&hid, &devices[0]).unwrap();

        let state = ctx.read_input().unwrap();
        println!("{:?}", state);
        ctx.write_output(&OutputState {
            lightbar: Color::new(0, 255, 0),
            ..Default::default()
        })
        .unwrap();
    }
}
