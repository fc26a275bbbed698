//! smartctl invocation — device discovery and per-device report retrieval.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::SmartctlError;

use super::smartctl_report::{parse_report, parse_scan, DeviceRef, SmartctlReport};

/// Longest output excerpt carried in an error.
const EXCERPT_LEN: usize = 512;

/// Source of raw smartctl output. Both calls return stdout on success.
#[async_trait]
pub trait SmartctlRunner: Send + Sync {
    /// `smartctl --scan-open --json`
    async fn scan(&self) -> Result<Vec<u8>, SmartctlError>;

    /// `smartctl <name> -d <type> -a --json`
    async fn device_report(&self, device: &DeviceRef) -> Result<Vec<u8>, SmartctlError>;
}

/// Runs the real `smartctl` binary.
pub struct SmartctlCommand {
    program: PathBuf,
}

impl SmartctlCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, SmartctlError> {
        debug!(program = %self.program.display(), ?args, "running smartctl");

        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| SmartctlError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(SmartctlError::Failed {
                code: output.status.code(),
                message: failure_reason(&output.stdout, &output.stderr),
            })
        }
    }
}

#[async_trait]
impl SmartctlRunner for SmartctlCommand {
    async fn scan(&self) -> Result<Vec<u8>, SmartctlError> {
        self.run(&["--scan-open", "--json"]).await
    }

    async fn device_report(&self, device: &DeviceRef) -> Result<Vec<u8>, SmartctlError> {
        self.run(&[
            device.name.as_str(),
            "-d",
            device.device_type.as_str(),
            "-a",
            "--json",
        ])
        .await
    }
}

/// Enumerate the devices smartctl can currently open.
pub async fn discover(runner: &dyn SmartctlRunner) -> Result<Vec<DeviceRef>, SmartctlError> {
    let raw = runner.scan().await?;
    parse_scan(&raw)
}

/// Fetch and decode the full report for one device. Returns the raw output
/// alongside the report for logging.
pub async fn fetch_report(
    runner: &dyn SmartctlRunner,
    device: &DeviceRef,
) -> Result<(SmartctlReport, Vec<u8>), SmartctlError> {
    let raw = runner.device_report(device).await?;
    let report = parse_report(&raw)?;
    Ok((report, raw))
}

/// Collapse all whitespace runs (newlines included) into single spaces.
pub fn normalize_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// With `--json`, smartctl reports open and permission errors in
/// `smartctl.messages` on stdout and leaves stderr empty.
fn failure_reason(stdout: &[u8], stderr: &[u8]) -> String {
    if let Ok(report) = parse_report(stdout) {
        let messages: Vec<&str> = report
            .smartctl
            .messages
            .iter()
            .map(|m| m.string.trim())
            .filter(|m| !m.is_empty())
            .collect();
        if !messages.is_empty() {
            return excerpt(&messages.join("; "));
        }
    }

    let stdout = normalize_output(stdout);
    if !stdout.is_empty() {
        return excerpt(&stdout);
    }
    excerpt(&normalize_output(stderr))
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_LEN) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
