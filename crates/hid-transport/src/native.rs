use crate::{DeviceInfo, HidDevice, HidHost, Result, TransportError};
use hidapi::{HidApi, HidDevice as RawDevice};
use std::ffi::CString;
use tracing::debug;

/// Native backend over the system hidapi library.
pub struct HidapiHost {
    api: HidApi,
}

impl HidapiHost {
    pub fn new() -> Result<Self> {
        let api = HidApi::new().map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(Self { api })
    }
}

impl HidHost for HidapiHost {
    type Device = HidapiDevice;

    fn enumerate(&mut self, vendor_id: u16) -> Result<Vec<DeviceInfo>> {
        self.api
            .refresh_devices()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let mut out = Vec::new();
        for info in self.api.device_list() {
            debug!(
                "HID device: vid=0x{:04X} pid=0x{:04X} path={:?}",
                info.vendor_id(),
                info.product_id(),
                info.path()
            );
            if info.vendor_id() == vendor_id {
                out.push(DeviceInfo {
                    path: info.path().to_string_lossy().into_owned(),
                    vendor_id: info.vendor_id(),
                    product_id: info.product_id(),
                });
            }
        }
        Ok(out)
    }

    fn open(&mut self, path: &str) -> Result<HidapiDevice> {
        let c_path =
            CString::new(path).map_err(|_| TransportError::DeviceNotFound(path.to_string()))?;
        let device = self
            .api
            .open_path(&c_path)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(HidapiDevice {
            device: Some(device),
        })
    }
}

/// Open hidapi handle. Dropping the inner device closes it.
pub struct HidapiDevice {
    device: Option<RawDevice>,
}

impl HidDevice for HidapiDevice {
    fn get_feature_report(&mut self, report_id: u8, len: usize) -> Result<Vec<u8>> {
        let device = self.device.as_ref().ok_or(TransportError::Closed)?;
        let mut buf = vec![0u8; len.max(1)];
        buf[0] = report_id;
        let n = device
            .get_feature_report(&mut buf)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        buf.truncate(n);
        Ok(buf)
    }

    fn close(&mut self) {
        self.device.take();
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }
}
