use crate::{Battery, DriverConfig, Result, Snapshot};
use hid_transport::HidHost;
use tracing::{debug, error, info, warn};

/// Keeps at most one [`Battery`] open and drops it whenever a read fails at the transport
/// level, so the next cycle rediscovers the unit, possibly under a new path.
pub struct Collector<H: HidHost> {
    host: H,
    config: DriverConfig,
    battery: Option<Battery<H::Device>>,
    battery_path: String,
}

impl<H: HidHost> Collector<H> {
    pub fn new(host: H, config: DriverConfig) -> Result<Self> {
        crate::TRIPPLITE.validate()?;
        Ok(Self {
            host,
            config,
            battery: None,
            battery_path: String::new(),
        })
    }

    pub fn battery(&self) -> Option<&Battery<H::Device>> {
        self.battery.as_ref()
    }

    /// Path of the held battery, empty when none is held.
    pub fn battery_path(&self) -> &str {
        &self.battery_path
    }

    /// Connect to the first enumerated unit unless one is already held. An absent or
    /// vanished unit is logged and left for the next cycle.
    pub fn open_battery(&mut self) {
        if self.battery.is_some() {
            return;
        }
        let candidates = match self.host.enumerate(self.config.vendor_id) {
            Ok(c) => c,
            Err(e) => {
                error!("Unable to enumerate HID devices: {e}");
                return;
            }
        };
        let Some(first) = candidates.first() else {
            error!("No Tripplite battery found");
            return;
        };
        debug!("Opening {first}");
        let path = first.path.clone();
        let mut battery = Battery::new(path.clone(), &self.config);
        match battery.open(&mut self.host) {
            Ok(()) => {
                info!("Connected to {path} battery");
                self.battery = Some(battery);
                self.battery_path = path;
            }
            Err(e) => warn!("Unable to open {path}: {e}"),
        }
    }

    /// Close the held battery so the next [`Collector::open_battery`] enumerates afresh.
    pub fn close_battery(&mut self) {
        if let Some(mut battery) = self.battery.take() {
            battery.close();
            info!(
                "Disconnecting {} battery to try reconnect",
                self.battery_path
            );
        }
        self.battery_path.clear();
    }

    /// Read a snapshot from the held battery.
    ///
    /// Returns `Ok(None)` when no battery is held or when the read failed in a way a
    /// reconnect can fix; in the latter case the battery is dropped. Protocol errors are
    /// returned to the caller and the battery is kept.
    pub fn get_data(&mut self) -> Result<Option<Snapshot>> {
        let Some(battery) = self.battery.as_mut() else {
            return Ok(None);
        };
        match battery.get() {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) if e.is_recoverable() => {
                error!(
                    "Unable to read from USB HID for {}: {e}",
                    self.battery_path
                );
                self.close_battery();
                Ok(None)
            }
            Err(e) => {
                error!("Bad data from {}: {e}", self.battery_path);
                Err(e)
            }
        }
    }

    /// One full cycle: connect if needed, then read.
    pub fn collect(&mut self) -> Result<Option<Snapshot>> {
        self.open_battery();
        self.get_data()
    }
}

impl<H: HidHost> Drop for Collector<H> {
    fn drop(&mut self) {
        self.close_battery();
    }
}
