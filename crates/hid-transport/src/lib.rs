//! hid-transport: blocking access to USB HID feature reports
//!
//! This crate provides the traits and types used to enumerate HID devices by vendor id,
//! open them by path and request addressed feature reports. The default build enables a
//! `mock` backend so that binaries and tests run on any host without a device attached;
//! the `hidapi` feature adds the native backend.

mod types;
pub use types::DeviceInfo;

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::{HidDevice, HidHost};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockDevice, MockHost};

#[cfg(feature = "hidapi")]
mod native;

#[cfg(feature = "hidapi")]
pub use native::{HidapiDevice, HidapiHost};
