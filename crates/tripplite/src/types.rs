use crate::{Result, UpsError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the payload bytes of a feature report are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One byte, one flag per bit. Names are listed least-significant bit first.
    Bitfield(&'static [&'static str; 8]),
    /// Unsigned integer, low-order byte first.
    UnsignedInt,
    /// Two-byte unsigned integer holding the value times ten.
    ScaledFloat,
}

impl Format {
    fn accepts_width(&self, width: u8) -> bool {
        match self {
            Format::Bitfield(_) => width == 1,
            Format::UnsignedInt => width == 1 || width == 2,
            Format::ScaledFloat => width == 2,
        }
    }
}

/// Location and encoding of one telemetry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub address: u8,
    pub width: u8,
    pub format: Format,
}

impl FieldDescriptor {
    pub const fn bitfield(address: u8, keys: &'static [&'static str; 8]) -> Self {
        Self {
            address,
            width: 1,
            format: Format::Bitfield(keys),
        }
    }

    pub const fn uint8(address: u8) -> Self {
        Self {
            address,
            width: 1,
            format: Format::UnsignedInt,
        }
    }

    pub const fn uint16(address: u8) -> Self {
        Self {
            address,
            width: 2,
            format: Format::UnsignedInt,
        }
    }

    pub const fn scaled(address: u8) -> Self {
        Self {
            address,
            width: 2,
            format: Format::ScaledFloat,
        }
    }

    /// Build a descriptor from loose parts, rejecting width/format combinations the
    /// decoder does not understand.
    pub fn new(address: u8, width: u8, format: Format) -> Result<Self> {
        let desc = Self {
            address,
            width,
            format,
        };
        desc.check()?;
        Ok(desc)
    }

    pub fn check(&self) -> Result<()> {
        if self.format.accepts_width(self.width) {
            Ok(())
        } else {
            Err(UpsError::Config(format!(
                "address {}: {:?} cannot be {} byte(s) wide",
                self.address, self.format, self.width
            )))
        }
    }

    /// Length of the feature report to request: the echoed address plus the payload.
    pub fn report_len(&self) -> usize {
        usize::from(self.width) + 1
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Layout {
    Field(FieldDescriptor),
    Group(&'static [(&'static str, FieldDescriptor)]),
}

#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub name: &'static str,
    pub layout: Layout,
}

/// Static table of every telemetry field a unit exposes, in read order.
#[derive(Debug, Clone, Copy)]
pub struct RegisterMap {
    categories: &'static [Category],
}

impl RegisterMap {
    pub const fn new(categories: &'static [Category]) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &'static [Category] {
        self.categories
    }

    /// Every leaf as `(category, subcategory, descriptor)`, in declared order.
    pub fn fields(
        &self,
    ) -> impl Iterator<Item = (&'static str, Option<&'static str>, &'static FieldDescriptor)> {
        let categories: &'static [Category] = self.categories;
        categories.iter().flat_map(|cat| {
            let leaves: Vec<_> = match &cat.layout {
                Layout::Field(desc) => vec![(cat.name, None, desc)],
                Layout::Group(subs) => subs
                    .iter()
                    .map(|(sub, desc)| (cat.name, Some(*sub), desc))
                    .collect(),
            };
            leaves
        })
    }

    /// Check width/format agreement and that no two fields share an address; the device
    /// echoes the address it answers for, so a collision would defeat that check.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashMap<u8, String> = HashMap::new();
        for (cat, sub, desc) in self.fields() {
            desc.check()?;
            let name = match sub {
                Some(sub) => format!("{cat}/{sub}"),
                None => cat.to_string(),
            };
            if let Some(prev) = seen.insert(desc.address, name.clone()) {
                return Err(UpsError::Config(format!(
                    "address {} used by both {prev} and {name}",
                    desc.address
                )));
            }
        }
        Ok(())
    }
}

/// Settings shared by the driver and the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// USB vendor id to enumerate.
    pub vendor_id: u16,
    /// Extra attempts after an empty feature report.
    pub retries: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            vendor_id: crate::VENDOR_ID,
            retries: 2,
        }
    }
}
