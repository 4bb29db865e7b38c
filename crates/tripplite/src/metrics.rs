use crate::{CategoryValue, Collector, Reading, Result, Snapshot, UpsError};
use hid_transport::HidHost;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::{info, warn};

pub const METRIC_PREFIX: &str = "tripplite";

/// One flattened numeric value from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Flattened key, e.g. `input_voltage` or `status_ac_present`.
    pub key: String,
    pub value: f64,
}

impl Sample {
    pub fn metric_name(&self) -> String {
        format!("{METRIC_PREFIX}_{}", self.key)
    }

    pub fn help(&self) -> &'static str {
        match self.key.as_str() {
            "health" => "UPS components health",
            "time_to_empty" => "Runtime left in seconds",
            _ => "Tripplite Metric",
        }
    }
}

fn push_reading(out: &mut Vec<Sample>, key: &str, reading: &Reading) {
    match reading {
        Reading::Flags(flags) => {
            for (bit, set) in flags.iter() {
                out.push(Sample {
                    key: normalize(&format!("{key}_{bit}")),
                    value: if set { 1.0 } else { 0.0 },
                });
            }
        }
        scalar => {
            if let Some(value) = scalar.as_f64() {
                out.push(Sample {
                    key: normalize(key),
                    value,
                });
            }
        }
    }
}

fn normalize(key: &str) -> String {
    key.replace(' ', "_")
}

/// Flatten a snapshot into `category[_subcategory][_bit]` samples. `device_id` is not a
/// sample.
pub fn samples(snapshot: &Snapshot) -> Vec<Sample> {
    let mut out = Vec::new();
    for (category, value) in &snapshot.categories {
        match value {
            CategoryValue::Reading(reading) => push_reading(&mut out, category, reading),
            CategoryValue::Group(group) => {
                for (sub, reading) in group {
                    push_reading(&mut out, &format!("{category}_{sub}"), reading);
                }
            }
        }
    }
    out
}

/// Render samples as Prometheus text exposition, one gauge each, labelled by host.
pub fn render(samples: &[Sample], hostname: &str) -> Result<String> {
    let registry = Registry::new();
    for sample in samples {
        let opts =
            Opts::new(sample.metric_name(), sample.help()).const_label("hostname", hostname);
        let gauge = Gauge::with_opts(opts)
            .map_err(|e| UpsError::Metrics(format!("metrics init error: {e}")))?;
        gauge.set(sample.value);
        registry
            .register(Box::new(gauge))
            .map_err(|e| UpsError::Metrics(format!("metrics register error: {e}")))?;
    }
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buf)
        .map_err(|e| UpsError::Metrics(format!("error encoding metrics: {e}")))?;
    String::from_utf8(buf).map_err(|e| UpsError::Metrics(e.to_string()))
}

/// Something that can answer a metrics scrape.
pub trait MetricsSource: Send + Sync {
    /// Exposition text for this scrape; empty when there is nothing to report.
    fn scrape(&self) -> Result<String>;
}

/// Serialises scrapes onto one [`Collector`]: the lock is held for connect and read.
pub struct MetricsExporter<H: HidHost> {
    collector: Mutex<Collector<H>>,
    hostname: String,
}

impl<H: HidHost> MetricsExporter<H> {
    pub fn new(collector: Collector<H>, hostname: impl Into<String>) -> Self {
        Self {
            collector: Mutex::new(collector),
            hostname: hostname.into(),
        }
    }

    /// Take the collector, recovering from a scrape that panicked while holding it. The
    /// battery it left behind is closed so the next cycle reconnects from scratch.
    fn collector(&self) -> MutexGuard<'_, Collector<H>> {
        match self.collector.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Previous collection panicked; resetting connection");
                let mut guard = poisoned.into_inner();
                guard.close_battery();
                self.collector.clear_poison();
                guard
            }
        }
    }
}

impl<H> MetricsSource for MetricsExporter<H>
where
    H: HidHost + Send,
    H::Device: Send,
{
    fn scrape(&self) -> Result<String> {
        let started = Instant::now();
        info!("Collection started");
        let data = self.collector().collect()?;
        let Some(snapshot) = data else {
            return Ok(String::new());
        };
        let body = render(&samples(&snapshot), &self.hostname)?;
        info!("Collection finished in {:?}", started.elapsed());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode, FieldDescriptor, STATUS_FLAGS};
    use std::collections::BTreeMap;

    fn snapshot() -> Snapshot {
        let status = decode(&FieldDescriptor::bitfield(50, &STATUS_FLAGS), &[50, 0b10]).unwrap();
        let mut input = BTreeMap::new();
        input.insert("voltage", Reading::Float(121.4));
        let mut categories = BTreeMap::new();
        categories.insert("status", CategoryValue::Reading(status));
        categories.insert("input", CategoryValue::Group(input));
        categories.insert("time to empty", CategoryValue::Reading(Reading::Int(2700)));
        Snapshot {
            device_id: "p0".to_string(),
            categories,
        }
    }

    #[test]
    fn flattens_groups_and_bits() {
        let samples = samples(&snapshot());
        let keys: Vec<&str> = samples.iter().map(|s| s.key.as_str()).collect();
        assert!(keys.contains(&"input_voltage"));
        assert!(keys.contains(&"time_to_empty"));
        assert!(keys.contains(&"status_ac_present"));
        assert!(keys.contains(&"status_below_remaining_capacity"));
        assert_eq!(samples.len(), 1 + 1 + 8);
        assert!(!keys.iter().any(|k| k.contains("device")));

        let ac = samples.iter().find(|s| s.key == "status_ac_present").unwrap();
        assert_eq!(ac.value, 1.0);
        let charging = samples.iter().find(|s| s.key == "status_charging").unwrap();
        assert_eq!(charging.value, 0.0);
    }

    #[test]
    fn renders_named_gauges_with_hostname() {
        let text = render(&samples(&snapshot()), "ups.example.net").unwrap();
        assert!(text.contains("# HELP tripplite_time_to_empty Runtime left in seconds"));
        assert!(text.contains("# TYPE tripplite_input_voltage gauge"));
        assert!(text.contains("tripplite_input_voltage{hostname=\"ups.example.net\"} 121.4"));
        assert!(text.contains("tripplite_status_ac_present{hostname=\"ups.example.net\"} 1"));
        assert!(text.contains("# HELP tripplite_input_voltage Tripplite Metric"));
    }

    #[test]
    fn empty_samples_render_empty_body() {
        assert_eq!(render(&[], "h").unwrap(), "");
    }

    #[test]
    fn scrape_survives_a_panicked_holder() {
        let host = crate::demo_host();
        let collector = Collector::new(host.clone(), crate::DriverConfig::default()).unwrap();
        let exporter = MetricsExporter::new(collector, "h");
        assert!(!exporter.scrape().unwrap().is_empty());
        assert_eq!(host.opens(), 1);

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = exporter.collector.lock().unwrap();
            panic!("collector holder failed");
        }));
        assert!(exporter.collector.is_poisoned());

        let body = exporter.scrape().unwrap();
        assert!(body.contains("tripplite_health{hostname=\"h\"} 100"));
        assert!(!exporter.collector.is_poisoned());
        assert_eq!(host.closes(), 1);
        assert_eq!(host.opens(), 2);
    }
}
