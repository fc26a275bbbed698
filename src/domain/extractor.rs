//! Metric extraction — maps one decoded report onto the exporter's gauges.

use chrono::Utc;

use super::metrics::SmartctlMetrics;
use super::smartctl_report::{DeviceRef, SmartAttribute, SmartctlReport};

/// Attribute rows smartctl could not name carry no stable meaning.
const UNKNOWN_ATTRIBUTE: &str = "Unknown_Attribute";

/// Vendors pack min/max readings above the current temperature in the raw
/// value; only the lowest byte is the reading in degrees Celsius.
const TEMPERATURE_CELSIUS: &str = "Temperature_Celsius";

/// Write every metric derived from `report` for `device`.
pub fn extract(metrics: &SmartctlMetrics, device: &DeviceRef, report: &SmartctlReport) {
    let labels = [
        device.name.as_str(),
        report.model_name.as_str(),
        report.serial_number.as_str(),
    ];

    metrics
        .user_capacity_blocks
        .with_label_values(&labels)
        .set(report.user_capacity.blocks as f64);
    metrics
        .user_capacity_bytes
        .with_label_values(&labels)
        .set(report.user_capacity.bytes as f64);

    metrics
        .interface_speed_current
        .with_label_values(&labels)
        .set(report.interface_speed.current.bits_per_second() as f64);
    metrics
        .interface_speed_max
        .with_label_values(&labels)
        .set(report.interface_speed.max.bits_per_second() as f64);

    let passed = if report.smart_status.passed { 1.0 } else { 0.0 };
    metrics.smart_status.with_label_values(&labels).set(passed);

    for attribute in &report.ata_smart_attributes.table {
        let Some(value) = attribute_value(attribute) else {
            continue;
        };
        metrics
            .ata_smart_attribute
            .with_label_values(&[labels[0], labels[1], labels[2], attribute.name.as_str()])
            .set(value as f64);
    }

    metrics
        .power_on_time_hours
        .with_label_values(&labels)
        .set(report.power_on_time.hours as f64);
    metrics
        .power_cycle_time
        .with_label_values(&labels)
        .set(report.power_cycle_count as f64);
    metrics
        .temperature
        .with_label_values(&labels)
        .set(report.temperature.current as f64);

    metrics
        .last_update
        .with_label_values(&labels)
        .set(unix_now());
}

/// The value to export for one attribute row, or `None` if the row is skipped.
fn attribute_value(attribute: &SmartAttribute) -> Option<i64> {
    match attribute.name.as_str() {
        UNKNOWN_ATTRIBUTE => None,
        TEMPERATURE_CELSIUS => Some(attribute.raw.value & 0xFF),
        _ => Some(attribute.raw.value),
    }
}

fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
