use core::fmt;

/// One enumerated HID interface.
///
/// `path` is only meaningful for the enumeration pass that produced it; it may change when
/// the device is replugged or the host restarts.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DeviceInfo {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{path} (vid=0x{vid:04X}, pid=0x{pid:04X})",
            path = self.path,
            vid = self.vendor_id,
            pid = self.product_id
        )
    }
}
