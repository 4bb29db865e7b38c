use crate::{DeviceInfo, HidDevice, HidHost, Result, TransportError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// In-process HID host. Clones share state, so a test can keep one clone to script
/// responses and inspect counters while another is owned by the code under test.
#[derive(Clone, Default)]
pub struct MockHost {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    devices: Vec<MockEntry>,
    enumerations: usize,
    opens: usize,
    closes: usize,
}

struct MockEntry {
    info: DeviceInfo,
    attached: bool,
    // Persistent payloads, echoed behind the requested address.
    registers: HashMap<u8, Vec<u8>>,
    // One-shot raw reports, consumed before falling back to `registers`.
    queued: HashMap<u8, VecDeque<Vec<u8>>>,
    requests: HashMap<u8, usize>,
}

impl MockState {
    fn entry_mut(&mut self, path: &str) -> Option<&mut MockEntry> {
        self.devices.iter_mut().find(|d| d.info.path == path)
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| TransportError::Io("mock state poisoned".to_string()))
    }

    /// Attach a device. Re-plugging a known path marks it attached again and keeps its
    /// registers.
    pub fn plug(&self, path: &str, vendor_id: u16, product_id: u16) {
        if let Ok(mut st) = self.lock() {
            if let Some(entry) = st.entry_mut(path) {
                entry.attached = true;
                return;
            }
            st.devices.push(MockEntry {
                info: DeviceInfo {
                    path: path.to_string(),
                    vendor_id,
                    product_id,
                },
                attached: true,
                registers: HashMap::new(),
                queued: HashMap::new(),
                requests: HashMap::new(),
            });
        }
    }

    /// Detach a device: it disappears from enumeration and open handles start failing.
    pub fn unplug(&self, path: &str) {
        if let Ok(mut st) = self.lock() {
            if let Some(entry) = st.entry_mut(path) {
                entry.attached = false;
                debug!("mock: unplugged {path}");
            }
        }
    }

    /// Answer every request for `address` with `[address, payload..]`.
    pub fn set_register(&self, path: &str, address: u8, payload: &[u8]) {
        if let Ok(mut st) = self.lock() {
            if let Some(entry) = st.entry_mut(path) {
                entry.registers.insert(address, payload.to_vec());
            }
        }
    }

    /// Answer the next request for `address` with exactly `report` (may be empty).
    pub fn queue_report(&self, path: &str, address: u8, report: Vec<u8>) {
        if let Ok(mut st) = self.lock() {
            if let Some(entry) = st.entry_mut(path) {
                entry.queued.entry(address).or_default().push_back(report);
            }
        }
    }

    pub fn enumerations(&self) -> usize {
        self.lock().map(|st| st.enumerations).unwrap_or(0)
    }

    pub fn opens(&self) -> usize {
        self.lock().map(|st| st.opens).unwrap_or(0)
    }

    pub fn closes(&self) -> usize {
        self.lock().map(|st| st.closes).unwrap_or(0)
    }

    /// Number of feature-report requests `path` has seen for `address`.
    pub fn requests(&self, path: &str, address: u8) -> usize {
        let Ok(mut st) = self.lock() else {
            return 0;
        };
        let count = st
            .entry_mut(path)
            .and_then(|e| e.requests.get(&address).copied());
        count.unwrap_or(0)
    }
}

impl HidHost for MockHost {
    type Device = MockDevice;

    fn enumerate(&mut self, vendor_id: u16) -> Result<Vec<DeviceInfo>> {
        let mut st = self.lock()?;
        st.enumerations += 1;
        Ok(st
            .devices
            .iter()
            .filter(|d| d.attached && d.info.vendor_id == vendor_id)
            .map(|d| d.info.clone())
            .collect())
    }

    fn open(&mut self, path: &str) -> Result<MockDevice> {
        let mut st = self.lock()?;
        match st.entry_mut(path) {
            Some(entry) if entry.attached => {}
            _ => return Err(TransportError::DeviceNotFound(path.to_string())),
        }
        st.opens += 1;
        Ok(MockDevice {
            path: path.to_string(),
            state: self.state.clone(),
            open: true,
        })
    }
}

/// Handle returned by [`MockHost::open`].
pub struct MockDevice {
    path: String,
    state: Arc<Mutex<MockState>>,
    open: bool,
}

impl HidDevice for MockDevice {
    fn get_feature_report(&mut self, report_id: u8, len: usize) -> Result<Vec<u8>> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        let mut st = self
            .state
            .lock()
            .map_err(|_| TransportError::Io("mock state poisoned".to_string()))?;
        let entry = st
            .entry_mut(&self.path)
            .ok_or_else(|| TransportError::DeviceNotFound(self.path.clone()))?;
        if !entry.attached {
            return Err(TransportError::Io(format!("{} disconnected", self.path)));
        }
        *entry.requests.entry(report_id).or_insert(0) += 1;

        let mut report = match entry.queued.get_mut(&report_id).and_then(|q| q.pop_front()) {
            Some(raw) => raw,
            None => match entry.registers.get(&report_id) {
                Some(payload) => {
                    let mut out = Vec::with_capacity(payload.len() + 1);
                    out.push(report_id);
                    out.extend_from_slice(payload);
                    out
                }
                None => Vec::new(),
            },
        };
        report.truncate(len);
        Ok(report)
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Ok(mut st) = self.state.lock() {
            st.closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
