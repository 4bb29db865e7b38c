use crate::{DeviceInfo, Result};

/// Entry point of a HID backend: discovers devices and opens them.
pub trait HidHost {
    type Device: HidDevice;

    /// Re-enumerate attached devices and return those matching `vendor_id`.
    fn enumerate(&mut self, vendor_id: u16) -> Result<Vec<DeviceInfo>>;

    /// Open a device by the path reported from [`HidHost::enumerate`].
    fn open(&mut self, path: &str) -> Result<Self::Device>;
}

/// A minimal blocking interface over one open HID device.
pub trait HidDevice {
    /// Request feature report `report_id`, reading at most `len` bytes.
    ///
    /// On success byte 0 of the returned buffer is the report id echoed by the device.
    /// An empty buffer means the device answered with no data.
    fn get_feature_report(&mut self, report_id: u8, len: usize) -> Result<Vec<u8>>;

    /// Release the handle. Closing an already closed device does nothing.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}
