use hid_transport::MockHost;
use tripplite::{
    load_demo_registers, Collector, DriverConfig, MetricsExporter, MetricsSource, VENDOR_ID,
};

fn collector(host: &MockHost) -> Collector<MockHost> {
    Collector::new(host.clone(), DriverConfig::default()).unwrap()
}

#[test]
fn transport_error_forces_rediscovery() {
    let host = MockHost::new();
    host.plug("usb-1", VENDOR_ID, 0x2012);
    load_demo_registers(&host, "usb-1");
    let mut c = collector(&host);

    assert!(c.collect().unwrap().is_some());
    assert_eq!(c.battery_path(), "usb-1");

    host.unplug("usb-1");
    assert!(c.get_data().unwrap().is_none());
    assert!(c.battery().is_none());

    let before = host.enumerations();
    c.open_battery();
    assert!(host.enumerations() > before);
    assert!(c.battery().is_none());
}

#[test]
fn replugged_unit_is_found_under_its_new_path() {
    let host = MockHost::new();
    host.plug("usb-1", VENDOR_ID, 0x2012);
    load_demo_registers(&host, "usb-1");
    let mut c = collector(&host);
    assert!(c.collect().unwrap().is_some());

    host.unplug("usb-1");
    assert!(c.collect().unwrap().is_none());

    host.plug("usb-7", VENDOR_ID, 0x2012);
    load_demo_registers(&host, "usb-7");
    let snap = c.collect().unwrap().unwrap();
    assert_eq!(snap.device_id, "usb-7");
    assert_eq!(c.battery_path(), "usb-7");
    assert_eq!(host.opens(), 2);
}

#[test]
fn collect_without_device_yields_nothing() {
    let host = MockHost::new();
    let mut c = collector(&host);
    assert!(c.collect().unwrap().is_none());
    assert!(c.collect().unwrap().is_none());
    assert_eq!(host.opens(), 0);
}

#[test]
fn scrape_is_empty_until_a_unit_appears() {
    let host = MockHost::new();
    let exporter = MetricsExporter::new(collector(&host), "ups-host");
    assert_eq!(exporter.scrape().unwrap(), "");

    host.plug("usb-1", VENDOR_ID, 0x2012);
    load_demo_registers(&host, "usb-1");
    let body = exporter.scrape().unwrap();
    assert!(body.contains("tripplite_health{hostname=\"ups-host\"} 100"));
    assert!(body.contains("tripplite_time_to_empty{hostname=\"ups-host\"} 2700"));
    assert!(body.contains("tripplite_config_power{hostname=\"ups-host\"} 1500"));
    assert!(body.contains("tripplite_status_fully_charged{hostname=\"ups-host\"} 1"));
    assert!(!body.contains("device_id"));
}

#[test]
fn failed_read_mid_scrape_is_an_empty_scrape() {
    let host = MockHost::new();
    host.plug("usb-1", VENDOR_ID, 0x2012);
    load_demo_registers(&host, "usb-1");
    let exporter = MetricsExporter::new(collector(&host), "ups-host");
    assert!(!exporter.scrape().unwrap().is_empty());

    host.unplug("usb-1");
    assert_eq!(exporter.scrape().unwrap(), "");
}

#[test]
fn protocol_error_surfaces_from_scrape() {
    let host = MockHost::new();
    host.plug("usb-1", VENDOR_ID, 0x2012);
    load_demo_registers(&host, "usb-1");
    host.queue_report("usb-1", 50, vec![52, 0]);
    let exporter = MetricsExporter::new(collector(&host), "ups-host");
    let err = exporter.scrape().unwrap_err();
    assert!(err.to_string().contains("protocol"));
    // The handle survives, so the next scrape succeeds without reopening.
    assert!(!exporter.scrape().unwrap().is_empty());
    assert_eq!(host.opens(), 1);
}
