//! Metrics sink — the Prometheus registry and the gauges the exporter owns.
//!
//! One `SmartctlMetrics` is built at startup and shared by `Arc` between the
//! collector (writes) and the HTTP surface (exposition). `GaugeVec` is
//! internally synchronized, so concurrent device tasks can write freely.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::error::MetricsError;

/// Labels on every per-device gauge.
pub const DEVICE_LABELS: [&str; 3] = ["device", "model_name", "serial_number"];

/// Labels on the attribute table gauge.
pub const ATTRIBUTE_LABELS: [&str; 4] = ["device", "model_name", "serial_number", "attribute"];

pub struct SmartctlMetrics {
    registry: Registry,

    pub user_capacity_blocks: GaugeVec,
    pub user_capacity_bytes: GaugeVec,
    pub interface_speed_current: GaugeVec,
    pub interface_speed_max: GaugeVec,
    pub smart_status: GaugeVec,
    pub ata_smart_attribute: GaugeVec,
    pub power_on_time_hours: GaugeVec,
    pub power_cycle_time: GaugeVec,
    pub temperature: GaugeVec,
    pub last_update: GaugeVec,
}

impl SmartctlMetrics {
    /// Create every gauge and register it with a fresh registry.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let metrics = Self {
            user_capacity_blocks: device_gauge(
                "smartctl_user_capacity_blocks",
                "User capacity of the device in logical blocks",
            )?,
            user_capacity_bytes: device_gauge(
                "smartctl_user_capacity_bytes",
                "User capacity of the device in bytes",
            )?,
            interface_speed_current: device_gauge(
                "smartctl_interface_speed_current",
                "Negotiated interface speed in bits per second",
            )?,
            interface_speed_max: device_gauge(
                "smartctl_interface_speed_max",
                "Maximum supported interface speed in bits per second",
            )?,
            smart_status: device_gauge(
                "smartctl_smart_status",
                "Overall SMART health verdict (1 = passed, 0 = failed)",
            )?,
            ata_smart_attribute: GaugeVec::new(
                Opts::new(
                    "smartctl_ata_smart_attribute_value",
                    "Raw value of an ATA SMART attribute",
                ),
                &ATTRIBUTE_LABELS,
            )?,
            power_on_time_hours: device_gauge(
                "smartctl_power_on_time_hours",
                "Accumulated power-on time in hours",
            )?,
            power_cycle_time: device_gauge(
                "smartctl_power_cycle_time",
                "Number of power cycles",
            )?,
            temperature: device_gauge(
                "smartctl_temperature",
                "Current drive temperature in degrees Celsius",
            )?,
            last_update: device_gauge(
                "smartctl_last_update",
                "Unix time of the last successful collection for the device",
            )?,
            registry,
        };

        for gauge in metrics.gauges() {
            metrics.registry.register(Box::new(gauge.clone()))?;
        }

        Ok(metrics)
    }

    fn gauges(&self) -> [&GaugeVec; 10] {
        [
            &self.user_capacity_blocks,
            &self.user_capacity_bytes,
            &self.interface_speed_current,
            &self.interface_speed_max,
            &self.smart_status,
            &self.ata_smart_attribute,
            &self.power_on_time_hours,
            &self.power_cycle_time,
            &self.temperature,
            &self.last_update,
        ]
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn device_gauge(name: &str, help: &str) -> Result<GaugeVec, MetricsError> {
    Ok(GaugeVec::new(Opts::new(name, help), &DEVICE_LABELS)?)
}

#[cfg(test)]
impl SmartctlMetrics {
    /// Look up the current value of a series without creating it.
    pub(crate) fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric().iter())
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == labels.len()
                    && labels.iter().all(|(key, value)| {
                        pairs
                            .iter()
                            .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                    })
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Number of series currently held by one metric family.
    pub(crate) fn series_count(&self, name: &str) -> usize {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .map(|family| family.get_metric().len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_gauges() {
        let metrics = SmartctlMetrics::new().unwrap();
        metrics
            .temperature
            .with_label_values(&["/dev/sda", "m", "s"])
            .set(40.0);
        assert_eq!(
            metrics.value(
                "smartctl_temperature",
                &[("device", "/dev/sda"), ("model_name", "m"), ("serial_number", "s")]
            ),
            Some(40.0)
        );
    }

    #[test]
    fn encode_renders_text_format() {
        let metrics = SmartctlMetrics::new().unwrap();
        metrics
            .smart_status
            .with_label_values(&["/dev/sda", "WDC", "WD-1"])
            .set(1.0);

        let text = metrics.encode().unwrap();
        assert!(text.contains("# TYPE smartctl_smart_status gauge"));
        assert!(text.contains(
            r#"smartctl_smart_status{device="/dev/sda",model_name="WDC",serial_number="WD-1"} 1"#
        ));
    }

    #[test]
    fn empty_registry_encodes_to_empty_text() {
        let metrics = SmartctlMetrics::new().unwrap();
        assert_eq!(metrics.encode().unwrap(), "");
    }

    #[test]
    fn registries_are_independent() {
        let a = SmartctlMetrics::new().unwrap();
        let b = SmartctlMetrics::new().unwrap();
        a.power_cycle_time
            .with_label_values(&["/dev/sda", "m", "s"])
            .set(3.0);
        assert_eq!(b.series_count("smartctl_power_cycle_time"), 0);
    }
}
