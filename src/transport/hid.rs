//! Trait abstraction over the OS HID stack to enable testing

use std::ffi::CString;
use std::sync::Mutex;

use hidapi::{HidApi, HidDevice, HidError};
use tracing::{debug, trace};

use crate::error::{Ds5Error, Result};

/// One HID interface as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidDeviceEntry {
    /// OS device path
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    /// USB interface number, `-1` when the device is not on USB
    pub interface_number: i32,
}

/// Open HID device handle
///
/// Dropping the handle releases the OS resource.
#[cfg_attr(test, mockall::automock)]
pub trait HidHandle: Send {
    /// Blocking read of one input report into `buf`
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write one output report, first byte is the report ID
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read the feature report whose ID is in `buf[0]`
    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Source of HID devices: enumeration and open-by-path
pub trait HidBackend {
    /// Snapshot of the HID interfaces currently present
    fn devices(&self) -> Result<Vec<HidDeviceEntry>>;

    /// Open the interface at `path`
    fn open_path(&self, path: &str) -> Result<Box<dyn HidHandle>>;
}

/// [`HidBackend`] on top of `hidapi`
pub struct SystemHid {
    api: Mutex<HidApi>,
}

impl SystemHid {
    /// Initialize the platform HID library
    ///
    /// # Errors
    ///
    /// Returns `ExternalApi` if `hidapi` cannot be initialized.
    pub fn new() -> Result<Self> {
        let api = HidApi::new().map_err(|e| Ds5Error::ExternalApi(e.to_string()))?;
        Ok(Self {
            api: Mutex::new(api),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HidApi>> {
        self.api
            .lock()
            .map_err(|_| Ds5Error::ExternalApi("HID API lock poisoned".to_string()))
    }
}

impl HidBackend for SystemHid {
    fn devices(&self) -> Result<Vec<HidDeviceEntry>> {
        let mut api = self.lock()?;
        api.refresh_devices().map_err(|e| classify_hid_error(&e))?;

        Ok(api
            .device_list()
            .map(|info| HidDeviceEntry {
                path: info.path().to_string_lossy().into_owned(),
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                interface_number: info.interface_number(),
            })
            .collect())
    }

    fn open_path(&self, path: &str) -> Result<Box<dyn HidHandle>> {
        let c_path = CString::new(path)
            .map_err(|_| Ds5Error::InvalidArguments(format!("device path contains NUL: {:?}", path)))?;

        let api = self.lock()?;
        let device = api
            .open_path(&c_path)
            .map_err(|e| Ds5Error::ExternalApi(e.to_string()))?;
        // Reads block until a report arrives
        device
            .set_blocking_mode(true)
            .map_err(|e| classify_hid_error(&e))?;

        debug!("Opened HID device {}", path);
        Ok(Box::new(SystemHidHandle { device }))
    }
}

struct SystemHidHandle {
    device: HidDevice,
}

impl HidHandle for SystemHidHandle {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.device.read(buf).map_err(|e| classify_hid_error(&e))?;
        trace!("HID read {} bytes", n);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.device.write(data).map_err(|e| classify_hid_error(&e))
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.device
            .get_feature_report(buf)
            .map_err(|e| classify_hid_error(&e))
    }
}

/// OS messages meaning the device is gone (Linux ENODEV, Windows
/// ERROR_DEVICE_NOT_CONNECTED and friends)
const REMOVED_MARKERS: [&str; 6] = [
    "not connected",
    "no such device",
    "disconnected",
    "removed",
    "os error 19",
    "os error 1167",
];

/// Map a `hidapi` failure onto the error taxonomy
///
/// Device-gone conditions become `DeviceRemoved`, everything else
/// `ExternalApi`.
pub fn classify_hid_error(err: &HidError) -> Ds5Error {
    classify_message(&err.to_string())
}

fn classify_message(msg: &str) -> Ds5Error {
    let lower = msg.to_ascii_lowercase();
    if REMOVED_MARKERS.iter().any(|marker| lower.contains(marker)) {
        Ds5Error::DeviceRemoved
    } else {
        Ds5Error::ExternalApi(msg.to_string())
    }
}
