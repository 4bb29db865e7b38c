use crate::{decode, DriverConfig, FieldDescriptor, Layout, Reading, RegisterMap, Result, UpsError};
use hid_transport::{HidDevice, HidHost};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Value of one top-level category in a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum CategoryValue {
    Reading(Reading),
    Group(BTreeMap<&'static str, Reading>),
}

const DEVICE_ID: &str = "device_id";

/// Every field of the register map as read in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub device_id: String,
    pub categories: BTreeMap<&'static str, CategoryValue>,
}

impl Snapshot {
    /// Top-level keys as they appear in the serialized form.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.categories.keys().copied().collect();
        keys.push(DEVICE_ID);
        keys.sort_unstable();
        keys
    }
}

// One flat map, keys in sorted order with `device_id` among the categories.
impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len() + 1))?;
        let mut device_id_pending = true;
        for (name, value) in &self.categories {
            if device_id_pending && *name > DEVICE_ID {
                map.serialize_entry(DEVICE_ID, &self.device_id)?;
                device_id_pending = false;
            }
            map.serialize_entry(name, value)?;
        }
        if device_id_pending {
            map.serialize_entry(DEVICE_ID, &self.device_id)?;
        }
        map.end()
    }
}

enum ReadOutcome {
    Report(Vec<u8>),
    Exhausted { attempts: u32 },
}

/// Driver for one Tripp Lite unit.
///
/// Created unopened; [`Battery::open`] binds it to a device handle and [`Battery::close`]
/// releases it. Failure handling beyond the per-read retry budget is left to the caller.
pub struct Battery<D: HidDevice> {
    path: String,
    vendor_id: u16,
    retries: u32,
    map: &'static RegisterMap,
    device: Option<D>,
}

impl<D: HidDevice> Battery<D> {
    pub fn new(path: impl Into<String>, config: &DriverConfig) -> Self {
        Self::with_map(path, config, &crate::TRIPPLITE)
    }

    pub fn with_map(
        path: impl Into<String>,
        config: &DriverConfig,
        map: &'static RegisterMap,
    ) -> Self {
        Self {
            path: path.into(),
            vendor_id: config.vendor_id,
            retries: config.retries,
            map,
            device: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.device.as_ref().is_some_and(|d| d.is_open())
    }

    /// Acquire the device handle. The path must be among the devices enumerated right now,
    /// and the register map must validate.
    pub fn open<H>(&mut self, host: &mut H) -> Result<()>
    where
        H: HidHost<Device = D>,
    {
        if self.is_open() {
            return Ok(());
        }
        self.map.validate()?;
        let candidates = host.enumerate(self.vendor_id).map_err(UpsError::connection)?;
        if candidates.is_empty() {
            return Err(UpsError::Connection(format!(
                "could not find any connected devices with vendor id 0x{:04X}",
                self.vendor_id
            )));
        }
        if !candidates.iter().any(|c| c.path == self.path) {
            let known: Vec<&str> = candidates.iter().map(|c| c.path.as_str()).collect();
            return Err(UpsError::Connection(format!(
                "path {} not in {}",
                self.path,
                known.join(", ")
            )));
        }
        let device = host.open(&self.path).map_err(UpsError::connection)?;
        debug!("opened {}", self.path);
        self.device = Some(device);
        Ok(())
    }

    /// Release the device handle. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
            debug!("closed {}", self.path);
        }
    }

    /// Read one field with the configured retry budget.
    pub fn read_field(&mut self, desc: &FieldDescriptor) -> Result<Reading> {
        self.read_field_with_retries(desc, self.retries)
    }

    /// Read one field, retrying up to `retries` more times while the device returns an
    /// empty report.
    pub fn read_field_with_retries(
        &mut self,
        desc: &FieldDescriptor,
        retries: u32,
    ) -> Result<Reading> {
        match self.request(desc, retries)? {
            ReadOutcome::Report(report) => decode(desc, &report),
            ReadOutcome::Exhausted { attempts } => Err(UpsError::Transport(format!(
                "no data from address {} after {attempts} attempt(s)",
                desc.address
            ))),
        }
    }

    fn request(&mut self, desc: &FieldDescriptor, retries: u32) -> Result<ReadOutcome> {
        let device = match self.device.as_mut() {
            Some(d) => d,
            None => return Err(UpsError::Transport(format!("{} is not open", self.path))),
        };
        let attempts = retries.saturating_add(1);
        for attempt in 1..=attempts {
            let report = device
                .get_feature_report(desc.address, desc.report_len())
                .map_err(UpsError::transport)?;
            if !report.is_empty() {
                return Ok(ReadOutcome::Report(report));
            }
            debug!(
                address = desc.address,
                attempt, "empty feature report from {}", self.path
            );
        }
        Ok(ReadOutcome::Exhausted { attempts })
    }

    /// Read the whole register map. Any field that cannot be read fails the snapshot.
    pub fn get(&mut self) -> Result<Snapshot> {
        let map = self.map;
        let mut categories = BTreeMap::new();
        for cat in map.categories() {
            let value = match &cat.layout {
                Layout::Field(desc) => CategoryValue::Reading(self.read_field(desc)?),
                Layout::Group(subs) => {
                    let mut group = BTreeMap::new();
                    for (sub, desc) in subs.iter() {
                        group.insert(*sub, self.read_field(desc)?);
                    }
                    CategoryValue::Group(group)
                }
            };
            categories.insert(cat.name, value);
        }
        info!("read {} categories from {}", categories.len(), self.path);
        Ok(Snapshot {
            device_id: self.path.clone(),
            categories,
        })
    }
}

impl<D: HidDevice> Drop for Battery<D> {
    fn drop(&mut self) {
        self.close();
    }
}
