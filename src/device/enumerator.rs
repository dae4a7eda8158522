//! DualSense discovery
//!
//! Lists connected controllers without opening them.

use serde::Serialize;
use tracing::debug;

use crate::error::{Ds5Error, Result};
use crate::report::protocol::{Connection, DS5_PRODUCT_IDS, DS5_VENDOR_ID};
use crate::transport::hid::{HidBackend, HidDeviceEntry};

/// Unopened reference to a discovered controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEnumInfo {
    pub(crate) path: String,
    pub(crate) connection: Connection,
    pub(crate) product_id: u16,
}

impl DeviceEnumInfo {
    /// OS device path
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    fn from_entry(entry: &HidDeviceEntry) -> Self {
        Self {
            path: entry.path.clone(),
            connection: Connection::from_interface_number(entry.interface_number),
            product_id: entry.product_id,
        }
    }
}

/// Caller-provided storage for [`enumerate_devices`]
pub enum EnumBuffer<'a, 'b> {
    /// Contiguous array of entries
    Flat(&'a mut [Option<DeviceEnumInfo>]),
    /// Array of references to entries stored elsewhere
    Pointers(&'a mut [&'b mut Option<DeviceEnumInfo>]),
}

impl EnumBuffer<'_, '_> {
    /// Number of entries the buffer can hold
    pub fn capacity(&self) -> usize {
        match self {
            EnumBuffer::Flat(slots) => slots.len(),
            EnumBuffer::Pointers(slots) => slots.len(),
        }
    }

    fn slot(&mut self, index: usize) -> &mut Option<DeviceEnumInfo> {
        match self {
            EnumBuffer::Flat(slots) => &mut slots[index],
            EnumBuffer::Pointers(slots) => &mut *slots[index],
        }
    }
}

fn is_dualsense(entry: &HidDeviceEntry) -> bool {
    entry.vendor_id == DS5_VENDOR_ID && DS5_PRODUCT_IDS.contains(&entry.product_id)
}

fn collect_matches(backend: &dyn HidBackend) -> Result<Vec<DeviceEnumInfo>> {
    let mut matches: Vec<DeviceEnumInfo> = Vec::new();
    for entry in backend.devices()?.iter().filter(|e| is_dualsense(e)) {
        if matches.iter().any(|m| m.path == entry.path) {
            continue;
        }
        matches.push(DeviceEnumInfo::from_entry(entry));
    }
    Ok(matches)
}

/// Enumerate connected controllers into a caller-provided buffer
///
/// Fills up to `buffer.capacity()` entries in discovery order. Entries past
/// the number filled are left untouched.
///
/// # Arguments
///
/// * `backend` - HID stack to query
/// * `buffer` - Flat or pointer-array storage for the results
/// * `total` - If supplied, receives the true number of matches, which may
///   exceed the capacity
///
/// # Returns
///
/// * `Result<usize>` - Number of entries written
///
/// # Errors
///
/// Returns error if:
/// - The buffer has no room, controllers exist and `total` is `None` (`InsufficientBuffer`)
/// - The OS enumeration fails (`ExternalApi`)
///
/// # Examples
///
/// ```no_run
/// use ds5w::device::enumerator::{enumerate_devices, EnumBuffer};
/// use ds5w::transport::hid::SystemHid;
///
/// let hid = SystemHid::new().unwrap();
/// let mut slots: [Option<_>; 16] = Default::default();
/// let mut total = 0;
/// let found = enumerate_devices(&hid, EnumBuffer::Flat(&mut slots), Some(&mut total)).unwrap();
/// println!("{} of {} controllers listed", found, total);
/// ```
pub fn enumerate_devices(
    backend: &dyn HidBackend,
    mut buffer: EnumBuffer<'_, '_>,
    total: Option<&mut usize>,
) -> Result<usize> {
    let matches = collect_matches(backend)?;
    let capacity = buffer.capacity();

    if capacity == 0 && !matches.is_empty() && total.is_none() {
        return Err(Ds5Error::InsufficientBuffer {
            required: matches.len(),
            actual: 0,
        });
    }

    let filled = matches.len().min(capacity);
    for (index, info) in matches.iter().take(filled).enumerate() {
        *buffer.slot(index) = Some(info.clone());
    }

    if let Some(total) = total {
        *total = matches.len();
    }

    debug!(
        "Enumerated {} DualSense controller(s), listed {}",
        matches.len(),
        filled
    );
    Ok(filled)
}

/// Enumerate every connected controller
pub fn enumerate(backend: &dyn HidBackend) -> Result<Vec<DeviceEnumInfo>> {
    let matches = collect_matches(backend)?;
    debug!("Enumerated {} DualSense controller(s)", matches.len());
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::hid::mocks::FakeHidBackend;

    fn two_controllers() -> FakeHidBackend {
        let backend = FakeHidBackend::new();
        backend.add_foreign_device("/dev/hidraw0", 0x046D, 0xC52B);
        backend.add_device("/dev/hidraw1", 0x0CE6, 3);
        backend.add_device("/dev/hidraw2", 0x0DF2, -1);
        backend.add_foreign_device("/dev/hidraw3", 0x054C, 0x09CC); // DualShock 4
        backend
    }

    #[test]
    fn test_enumerate_filters_and_classifies() {
        let found = enumerate(&two_controllers()).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path(), "/dev/hidraw1");
        assert_eq!(found[0].connection(), Connection::Usb);
        assert_eq!(found[1].path(), "/dev/hidraw2");
        assert_eq!(found[1].connection(), Connection::Bluetooth);
        assert_eq!(found[1].product_id(), 0x0DF2);
    }

    #[test]
    fn test_enumerate_devices_flat_buffer() {
        let backend = two_controllers();
        let mut slots: [Option<DeviceEnumInfo>; 4] = Default::default();
        let mut total = 0;

        let filled =
            enumerate_devices(&backend, EnumBuffer::Flat(&mut slots), Some(&mut total)).unwrap();

        assert_eq!(filled, 2);
        assert_eq!(total, 2);
        assert!(slots[0].is_some());
        assert!(slots[1].is_some());
        assert!(slots[2].is_none());
    }

    #[test]
    fn test_enumerate_devices_pointer_buffer() {
        let backend = two_controllers();
        let mut first = None;
        let mut second = None;
        {
            let mut pointers = [&mut first, &mut second];
            let filled =
                enumerate_devices(&backend, EnumBuffer::Pointers(&mut pointers), None).unwrap();
            assert_eq!(filled, 2);
        }

        assert_eq!(first.unwrap().path(), "/dev/hidraw1");
        assert_eq!(second.unwrap().path(), "/dev/hidraw2");
    }

    #[test]
    fn test_enumerate_devices_truncates_and_reports_total() {
        let backend = two_controllers();
        let mut slots: [Option<DeviceEnumInfo>; 1] = Default::default();
        let mut total = 0;

        let filled =
            enumerate_devices(&backend, EnumBuffer::Flat(&mut slots), Some(&mut total)).unwrap();

        assert_eq!(filled, 1);
        assert_eq!(total, 2);
        assert_eq!(slots[0].as_ref().unwrap().path(), "/dev/hidraw1");
    }

    #[test]
    fn test_enumerate_devices_zero_capacity() {
        let backend = two_controllers();

        match enumerate_devices(&backend, EnumBuffer::Flat(&mut []), None) {
            Err(Ds5Error::InsufficientBuffer { required, actual }) => {
                assert_eq!(required, 2);
                assert_eq!(actual, 0);
            }
            other => panic!("Expected InsufficientBuffer, got: {:?}", other),
        }

        // Counting mode is allowed with no room
        let mut total = 0;
        let filled =
            enumerate_devices(&backend, EnumBuffer::Flat(&mut []), Some(&mut total)).unwrap();
        assert_eq!(filled, 0);
        assert_eq!(total, 2);
    }

    #[test]
    fn test_enumerate_devices_nothing_connected() {
        let backend = FakeHidBackend::new();
        let filled = enumerate_devices(&backend, EnumBuffer::Flat(&mut []), None).unwrap();
        assert_eq!(filled, 0);
    }

    #[test]
    fn test_enumerate_skips_unplugged() {
        let backend = two_controllers();
        backend.unplug("/dev/hidraw1");

        let found = enumerate(&backend).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path(), "/dev/hidraw2");
    }

    #[test]
    fn test_enumerate_does_not_open_devices() {
        let backend = two_controllers();
        enumerate(&backend).unwrap();
        assert_eq!(backend.open_count(), 0);
    }
}
