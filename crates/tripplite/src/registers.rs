use crate::{Category, FieldDescriptor, Layout, RegisterMap};

/// USB vendor id assigned to Tripp Lite.
pub const VENDOR_ID: u16 = 0x09AE;

/// Status bits, least-significant first.
pub static STATUS_FLAGS: [&str; 8] = [
    "shutdown imminent",
    "ac present",
    "charging",
    "discharging",
    "needs replacement",
    "below remaining capacity",
    "fully charged",
    "fully discharged",
];

static CONFIG: [(&str, FieldDescriptor); 3] = [
    ("voltage", FieldDescriptor::uint8(48)),
    ("frequency", FieldDescriptor::uint8(2)),
    ("power", FieldDescriptor::uint16(3)),
];

static INPUT: [(&str, FieldDescriptor); 2] = [
    ("voltage", FieldDescriptor::scaled(24)),
    ("frequency", FieldDescriptor::scaled(25)),
];

static OUTPUT: [(&str, FieldDescriptor); 2] = [
    ("voltage", FieldDescriptor::scaled(27)),
    ("power", FieldDescriptor::uint16(71)),
];

static CATEGORIES: [Category; 6] = [
    Category {
        name: "config",
        layout: Layout::Group(&CONFIG),
    },
    Category {
        name: "status",
        layout: Layout::Field(FieldDescriptor::bitfield(50, &STATUS_FLAGS)),
    },
    Category {
        name: "input",
        layout: Layout::Group(&INPUT),
    },
    Category {
        name: "output",
        layout: Layout::Group(&OUTPUT),
    },
    Category {
        name: "health",
        layout: Layout::Field(FieldDescriptor::uint8(52)),
    },
    Category {
        name: "time to empty",
        layout: Layout::Field(FieldDescriptor::uint16(53)),
    },
];

/// Register layout shared by the supported Tripp Lite HID units.
pub static TRIPPLITE: RegisterMap = RegisterMap::new(&CATEGORIES);
