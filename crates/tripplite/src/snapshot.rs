use crate::{Battery, DriverConfig, Result, Snapshot, UpsError};
use hid_transport::HidHost;
use tracing::info;

/// Read one snapshot from every enumerated unit, in enumeration order. Any failure aborts
/// the whole run.
pub fn read_all<H: HidHost>(host: &mut H, config: &DriverConfig) -> Result<Vec<Snapshot>> {
    crate::TRIPPLITE.validate()?;
    let devices = host
        .enumerate(config.vendor_id)
        .map_err(|e| UpsError::Connection(e.to_string()))?;
    if devices.is_empty() {
        return Err(UpsError::Connection(
            "could not find any connected TrippLite devices".to_string(),
        ));
    }
    info!("found {} device(s)", devices.len());
    let mut out = Vec::with_capacity(devices.len());
    for dev in devices {
        out.push(read_path(host, config, &dev.path)?);
    }
    Ok(out)
}

/// Open `path`, read one snapshot and close it again.
pub fn read_path<H: HidHost>(host: &mut H, config: &DriverConfig, path: &str) -> Result<Snapshot> {
    let mut battery = Battery::new(path, config);
    battery.open(host)?;
    let snapshot = battery.get();
    battery.close();
    snapshot
}

/// Pretty JSON: a lone snapshot prints as an object, several as an array.
pub fn to_json(snapshots: &[Snapshot]) -> serde_json::Result<String> {
    match snapshots {
        [one] => serde_json::to_string_pretty(one),
        many => serde_json::to_string_pretty(many),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hid_transport::MockHost;

    #[test]
    fn no_devices_is_a_connection_error() {
        let mut host = MockHost::new();
        assert!(matches!(
            read_all(&mut host, &DriverConfig::default()),
            Err(UpsError::Connection(_))
        ));
    }

    #[test]
    fn every_device_is_closed_after_reading() {
        let mut host = MockHost::new();
        for path in ["a", "b"] {
            host.plug(path, crate::VENDOR_ID, 1);
            crate::load_demo_registers(&host, path);
        }
        let snaps = read_all(&mut host, &DriverConfig::default()).unwrap();
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].device_id, "a");
        assert_eq!(snaps[1].device_id, "b");
        assert_eq!(host.opens(), 2);
        assert_eq!(host.closes(), 2);
    }

    #[test]
    fn failing_device_aborts_the_run_and_still_closes() {
        let mut host = MockHost::new();
        host.plug("a", crate::VENDOR_ID, 1);
        let err = read_all(&mut host, &DriverConfig::default()).unwrap_err();
        assert!(matches!(err, UpsError::Transport(_)));
        assert_eq!(host.closes(), 1);
    }

    #[test]
    fn single_snapshot_prints_as_object() {
        let mut host = crate::demo_host();
        let snaps = read_all(&mut host, &DriverConfig::default()).unwrap();
        let json = to_json(&snaps).unwrap();
        assert!(json.trim_start().starts_with('{'));
        let two = to_json(&[snaps[0].clone(), snaps[0].clone()]).unwrap();
        assert!(two.trim_start().starts_with('['));
    }
}
