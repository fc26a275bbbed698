//! smartctl report — the JSON document printed by `smartctl -a --json`.
//!
//! Every field is optional on the wire. A missing, `null` or mistyped field
//! decodes to its `Default` instead of failing the whole document, so a
//! partially understood report still yields metrics for the fields that did
//! decode. Only output that is not a JSON object at all is rejected.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::SmartctlError;

/// Decode one device report.
pub fn parse_report(raw: &[u8]) -> Result<SmartctlReport, SmartctlError> {
    parse_object(raw)
}

/// Decode the output of `smartctl --scan-open --json`.
pub fn parse_scan(raw: &[u8]) -> Result<Vec<DeviceRef>, SmartctlError> {
    let scan: SmartctlScan = parse_object(raw)?;
    Ok(scan.devices)
}

// Derived struct impls also accept JSON arrays; smartctl always prints an
// object, so anything else is malformed.
fn parse_object<T: DeserializeOwned>(raw: &[u8]) -> Result<T, SmartctlError> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(raw)?;
    Ok(T::deserialize(serde_json::Value::Object(object))?)
}

/// Bind a field on its own: anything that does not decode as `T` becomes
/// `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Bind each table row on its own: rows that are not objects are dropped,
/// the rest still decode.
fn lenient_rows<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let rows = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(rows) => rows,
        _ => return Ok(Vec::new()),
    };
    Ok(rows
        .into_iter()
        .filter(serde_json::Value::is_object)
        .filter_map(|row| T::deserialize(row).ok())
        .collect())
}

// ── Scan ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
struct SmartctlScan {
    #[serde(default)]
    devices: Vec<DeviceRef>,
}

/// A device as reported by the scan, and how smartctl should address it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub info_name: String,
    #[serde(default, rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub protocol: String,
}

#[cfg(test)]
impl DeviceRef {
    pub fn new(name: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device_type: device_type.into(),
            ..Default::default()
        }
    }
}

// ── Report ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartctlReport {
    #[serde(default, deserialize_with = "lenient")]
    pub json_format_version: Vec<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub smartctl: SmartctlInfo,
    #[serde(default, deserialize_with = "lenient")]
    pub local_time: LocalTime,
    #[serde(default, deserialize_with = "lenient")]
    pub device: DeviceInfo,
    #[serde(default, deserialize_with = "lenient")]
    pub model_family: String,
    #[serde(default, deserialize_with = "lenient")]
    pub model_name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub serial_number: String,
    #[serde(default, deserialize_with = "lenient")]
    pub wwn: Wwn,
    #[serde(default, deserialize_with = "lenient")]
    pub firmware_version: String,
    #[serde(default, deserialize_with = "lenient")]
    pub user_capacity: UserCapacity,
    #[serde(default, deserialize_with = "lenient")]
    pub logical_block_size: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub physical_block_size: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub rotation_rate: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub form_factor: FormFactor,
    #[serde(default, deserialize_with = "lenient")]
    pub trim: Trim,
    #[serde(default, deserialize_with = "lenient")]
    pub in_smartctl_database: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub ata_version: VersionInfo,
    #[serde(default, deserialize_with = "lenient")]
    pub sata_version: VersionInfo,
    #[serde(default, deserialize_with = "lenient")]
    pub interface_speed: InterfaceSpeed,
    #[serde(default, deserialize_with = "lenient")]
    pub smart_support: SmartSupport,
    #[serde(default, deserialize_with = "lenient")]
    pub smart_status: SmartStatus,
    #[serde(default, deserialize_with = "lenient")]
    pub ata_smart_data: AtaSmartData,
    #[serde(default, deserialize_with = "lenient")]
    pub ata_sct_capabilities: SctCapabilities,
    #[serde(default, deserialize_with = "lenient")]
    pub ata_smart_attributes: AtaSmartAttributes,
    #[serde(default, deserialize_with = "lenient")]
    pub power_on_time: PowerOnTime,
    #[serde(default, deserialize_with = "lenient")]
    pub power_cycle_count: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub temperature: Temperature,
    #[serde(default, deserialize_with = "lenient")]
    pub ata_smart_error_log: AtaSmartErrorLog,
    #[serde(default, deserialize_with = "lenient")]
    pub ata_smart_self_test_log: AtaSmartSelfTestLog,
}

// ── smartctl build / invocation ────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartctlInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub version: Vec<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub pre_release: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub svn_revision: String,
    #[serde(default, deserialize_with = "lenient")]
    pub platform_info: String,
    #[serde(default, deserialize_with = "lenient")]
    pub build_info: String,
    #[serde(default, deserialize_with = "lenient")]
    pub argv: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub drive_database_version: DisplayString,
    #[serde(default, deserialize_with = "lenient")]
    pub messages: Vec<SmartctlMessage>,
    #[serde(default, deserialize_with = "lenient")]
    pub exit_status: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartctlMessage {
    #[serde(default, deserialize_with = "lenient")]
    pub string: String,
    #[serde(default, deserialize_with = "lenient")]
    pub severity: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayString {
    #[serde(default, deserialize_with = "lenient")]
    pub string: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalTime {
    #[serde(default, deserialize_with = "lenient")]
    pub time_t: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub asctime: String,
}

// ── Identity ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub info_name: String,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub device_type: String,
    #[serde(default, deserialize_with = "lenient")]
    pub protocol: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wwn {
    #[serde(default, deserialize_with = "lenient")]
    pub naa: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub oui: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserCapacity {
    #[serde(default, deserialize_with = "lenient")]
    pub blocks: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormFactor {
    #[serde(default, deserialize_with = "lenient")]
    pub ata_value: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trim {
    #[serde(default, deserialize_with = "lenient")]
    pub supported: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub string: String,
    #[serde(default, deserialize_with = "lenient")]
    pub major_value: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub minor_value: i64,
}

// ── Interface speed ────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterfaceSpeed {
    #[serde(default, deserialize_with = "lenient")]
    pub max: SpeedDetail,
    #[serde(default, deserialize_with = "lenient")]
    pub current: SpeedDetail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeedDetail {
    #[serde(default, deserialize_with = "lenient")]
    pub sata_value: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub string: String,
    #[serde(default, deserialize_with = "lenient")]
    pub units_per_second: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub bits_per_unit: i64,
}

impl SpeedDetail {
    /// Effective link speed in bits per second.
    pub fn bits_per_second(&self) -> i64 {
        self.bits_per_unit.saturating_mul(self.units_per_second)
    }
}

// ── Health ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartSupport {
    #[serde(default, deserialize_with = "lenient")]
    pub available: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartStatus {
    #[serde(default, deserialize_with = "lenient")]
    pub passed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtaSmartData {
    #[serde(default, deserialize_with = "lenient")]
    pub offline_data_collection: OfflineDataCollection,
    #[serde(default, deserialize_with = "lenient")]
    pub self_test: SelfTest,
    #[serde(default, deserialize_with = "lenient")]
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfflineDataCollection {
    #[serde(default, deserialize_with = "lenient")]
    pub status: StatusDetail,
    #[serde(default, deserialize_with = "lenient")]
    pub completion_seconds: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusDetail {
    #[serde(default, deserialize_with = "lenient")]
    pub value: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub string: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfTest {
    #[serde(default, deserialize_with = "lenient")]
    pub status: SelfTestStatus,
    #[serde(default, deserialize_with = "lenient")]
    pub polling_minutes: PollingMinutes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfTestStatus {
    #[serde(default, deserialize_with = "lenient")]
    pub value: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub string: String,
    #[serde(default, deserialize_with = "lenient")]
    pub passed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollingMinutes {
    #[serde(default, deserialize_with = "lenient")]
    pub short: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub extended: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub conveyance: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default, deserialize_with = "lenient")]
    pub values: Vec<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub exec_offline_immediate_supported: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub offline_is_aborted_upon_new_cmd: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub offline_surface_scan_supported: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub self_tests_supported: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub conveyance_self_test_supported: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub selective_self_test_supported: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub attribute_autosave_enabled: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub error_logging_supported: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub gp_logging_supported: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SctCapabilities {
    #[serde(default, deserialize_with = "lenient")]
    pub value: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub error_recovery_control_supported: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub feature_control_supported: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub data_table_supported: bool,
}

// ── Attribute table ────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtaSmartAttributes {
    #[serde(default, deserialize_with = "lenient")]
    pub revision: i64,
    #[serde(default, deserialize_with = "lenient_rows")]
    pub table: Vec<SmartAttribute>,
}

/// One row of the vendor attribute table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartAttribute {
    #[serde(default, deserialize_with = "lenient")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub value: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub worst: i64,
    #[serde(default, rename = "thresh", deserialize_with = "lenient")]
    pub threshold: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub when_failed: String,
    #[serde(default, deserialize_with = "lenient")]
    pub flags: AttributeFlags,
    #[serde(default, deserialize_with = "lenient")]
    pub raw: RawValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeFlags {
    #[serde(default, deserialize_with = "lenient")]
    pub value: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub string: String,
    #[serde(default, deserialize_with = "lenient")]
    pub prefailure: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_online: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub performance: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub error_rate: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub event_count: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub auto_keep: bool,
}

/// Raw attribute counter. Vendors may pack several sub-fields into `value`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawValue {
    #[serde(default, deserialize_with = "lenient")]
    pub value: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub string: String,
}

// ── Counters ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerOnTime {
    #[serde(default, deserialize_with = "lenient")]
    pub hours: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Temperature {
    #[serde(default, deserialize_with = "lenient")]
    pub current: i64,
}

// ── Logs ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtaSmartErrorLog {
    #[serde(default, deserialize_with = "lenient")]
    pub summary: LogSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtaSmartSelfTestLog {
    #[serde(default, deserialize_with = "lenient")]
    pub standard: LogSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSummary {
    #[serde(default, deserialize_with = "lenient")]
    pub revision: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const WD_RED: &str = r#"{
      "json_format_version": [1, 0],
      "smartctl": {
        "version": [7, 3],
        "argv": ["smartctl", "/dev/sdb", "-d", "sat", "-a", "--json"],
        "drive_database_version": { "string": "7.3/5319" },
        "exit_status": 0
      },
      "device": { "name": "/dev/sdb", "info_name": "/dev/sdb [SAT]", "type": "sat", "protocol": "ATA" },
      "model_name": "WDC WD80EFZZ-68BTXN0",
      "serial_number": "WD-CAZXCVBN",
      "user_capacity": { "blocks": 15628053168, "bytes": 8001563222016 },
      "rotation_rate": 5400,
      "smart_status": { "passed": true },
      "ata_smart_attributes": {
        "revision": 16,
        "table": [
          {
            "id": 194,
            "name": "Temperature_Celsius",
            "value": 112,
            "worst": 103,
            "thresh": 0,
            "when_failed": "",
            "flags": { "value": 34, "string": "-O---K ", "updated_online": true, "auto_keep": true },
            "raw": { "value": 240519282721, "string": "33 (Min/Max 18/56)" }
          }
        ]
      },
      "power_on_time": { "hours": 10973 },
      "power_cycle_count": 38,
      "temperature": { "current": 33 }
    }"#;

    #[test]
    fn parses_full_report() {
        let report = parse_report(WD_RED.as_bytes()).unwrap();
        assert_eq!(report.json_format_version, vec![1, 0]);
        assert_eq!(report.smartctl.drive_database_version.string, "7.3/5319");
        assert_eq!(report.device.device_type, "sat");
        assert_eq!(report.model_name, "WDC WD80EFZZ-68BTXN0");
        assert_eq!(report.user_capacity.bytes, 8_001_563_222_016);
        assert!(report.smart_status.passed);

        let row = &report.ata_smart_attributes.table[0];
        assert_eq!(row.id, 194);
        assert_eq!(row.threshold, 0);
        assert!(row.flags.auto_keep);
        assert_eq!(row.raw.value, 240_519_282_721);
        assert_eq!(report.power_cycle_count, 38);
    }

    #[test]
    fn empty_object_decodes_to_zero_values() {
        let report = parse_report(b"{}").unwrap();
        assert_eq!(report.model_name, "");
        assert_eq!(report.user_capacity.blocks, 0);
        assert!(!report.smart_status.passed);
        assert!(report.ata_smart_attributes.table.is_empty());
        assert_eq!(report.temperature.current, 0);
    }

    #[test]
    fn mistyped_leaf_resolves_to_zero_without_failing() {
        let raw = br#"{
          "model_name": "ST4000VN008",
          "power_cycle_count": "many",
          "user_capacity": { "blocks": "lots", "bytes": 4000787030016 },
          "smart_status": null,
          "temperature": 41
        }"#;
        let report = parse_report(raw).unwrap();
        assert_eq!(report.model_name, "ST4000VN008");
        assert_eq!(report.power_cycle_count, 0);
        assert_eq!(report.user_capacity.blocks, 0);
        assert_eq!(report.user_capacity.bytes, 4_000_787_030_016);
        assert!(!report.smart_status.passed);
        assert_eq!(report.temperature.current, 0);
    }

    #[test]
    fn bad_attribute_row_keeps_the_other_rows() {
        let raw = br#"{
          "ata_smart_attributes": { "revision": 16, "table": [
            { "id": 9, "name": "Power_On_Hours", "raw": { "value": 5 } },
            null,
            "Spin_Up_Time",
            [3, "Spin_Up_Time"],
            { "id": 194, "name": "Temperature_Celsius", "raw": "hot" }
          ] }
        }"#;
        let report = parse_report(raw).unwrap();
        let table = &report.ata_smart_attributes.table;
        assert_eq!(report.ata_smart_attributes.revision, 16);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].name, "Power_On_Hours");
        assert_eq!(table[0].raw.value, 5);
        assert_eq!(table[1].name, "Temperature_Celsius");
        assert_eq!(table[1].raw.value, 0);
    }

    #[test]
    fn table_that_is_not_a_list_is_empty() {
        let report = parse_report(br#"{ "ata_smart_attributes": { "table": {} } }"#).unwrap();
        assert!(report.ata_smart_attributes.table.is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = br#"{ "serial_number": "S1", "nvme_smart_health_information_log": { "critical_warning": 0 } }"#;
        let report = parse_report(raw).unwrap();
        assert_eq!(report.serial_number, "S1");
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_report(b"smartctl 7.3: command not found").unwrap_err();
        assert!(matches!(err, SmartctlError::Decode(_)));
    }

    #[test]
    fn rejects_non_object_top_level() {
        assert!(parse_report(b"[1, 2, 3]").is_err());
    }

    #[test]
    fn parses_scan_devices() {
        let raw = br#"{
          "json_format_version": [1, 0],
          "devices": [
            { "name": "/dev/sda", "info_name": "/dev/sda [SAT]", "type": "sat", "protocol": "ATA" },
            { "name": "/dev/nvme0", "info_name": "/dev/nvme0", "type": "nvme", "protocol": "NVMe" }
          ]
        }"#;
        let devices = parse_scan(raw).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "/dev/sda");
        assert_eq!(devices[0].device_type, "sat");
        assert_eq!(devices[1].protocol, "NVMe");
    }

    #[test]
    fn scan_without_devices_is_empty() {
        assert!(parse_scan(b"{}").unwrap().is_empty());
    }

    #[test]
    fn scan_rejects_garbage() {
        assert!(parse_scan(b"not json").is_err());
    }

    #[test]
    fn bits_per_second_multiplies_units() {
        let speed = SpeedDetail {
            units_per_second: 30,
            bits_per_unit: 100_000_000,
            ..Default::default()
        };
        assert_eq!(speed.bits_per_second(), 3_000_000_000);
    }
}
