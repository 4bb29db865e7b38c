//! tripplite: telemetry for TrippLite UPS battery backups over USB HID
//!
//! The unit exposes its readings as addressed HID feature reports. [`TRIPPLITE`] declares
//! which address holds which field and how it is encoded, [`decode`] turns one report into
//! a [`Reading`], [`Battery`] walks the whole map into a [`Snapshot`], and [`Collector`]
//! keeps a long-running process connected across unplug and power-cycle events.

mod error;
pub use error::{Result, UpsError};

mod types;
pub use types::{Category, DriverConfig, FieldDescriptor, Format, Layout, RegisterMap};

mod registers;
pub use registers::{STATUS_FLAGS, TRIPPLITE, VENDOR_ID};

mod decode;
pub use decode::{decode, Flags, Reading};

mod driver;
pub use driver::{Battery, CategoryValue, Snapshot};

mod collector;
pub use collector::Collector;

mod snapshot;
pub use snapshot::{read_all, read_path, to_json};

mod metrics;
pub use metrics::{render, samples, MetricsExporter, MetricsSource, Sample, METRIC_PREFIX};

#[cfg(feature = "mock")]
mod demo;

#[cfg(feature = "mock")]
pub use demo::{demo_host, load_demo_registers, DEMO_PATH};
