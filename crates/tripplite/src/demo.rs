use hid_transport::MockHost;

/// Path under which [`demo_host`] attaches its unit.
pub const DEMO_PATH: &str = "mock0";

// (address, little-endian payload) for a healthy unit on mains power.
const DEMO_REGISTERS: [(u8, &[u8]); 10] = [
    (48, &[120]),         // config voltage
    (2, &[60]),           // config frequency
    (3, &[0xDC, 0x05]),   // config power, 1500
    (50, &[0b0100_0010]), // ac present, fully charged
    (24, &[0xBE, 0x04]),  // input voltage, 121.4
    (25, &[0x58, 0x02]),  // input frequency, 60.0
    (27, &[0xB0, 0x04]),  // output voltage, 120.0
    (71, &[0x38, 0x01]),  // output power, 312
    (52, &[100]),         // health
    (53, &[0x8C, 0x0A]),  // time to empty, 2700
];

/// Answer every register of the Tripp Lite map on `path` with plausible values.
pub fn load_demo_registers(host: &MockHost, path: &str) {
    for (address, payload) in DEMO_REGISTERS {
        host.set_register(path, address, payload);
    }
}

/// A mock host with one fully populated unit attached at [`DEMO_PATH`].
pub fn demo_host() -> MockHost {
    let host = MockHost::new();
    host.plug(DEMO_PATH, crate::VENDOR_ID, 0x2012);
    load_demo_registers(&host, DEMO_PATH);
    host
}
