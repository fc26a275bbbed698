//! Collector — drives the periodic discovery → report → metrics pipeline.
//!
//! Each pass discovers devices, then collects every device in its own task.
//! A device failure is logged and isolated; a discovery failure abandons the
//! pass. Passes are spawned on every tick without waiting for the previous
//! one, so slow smartctl calls may make passes overlap. Gauge writes are
//! per label set and last-write-wins, so overlapping passes are harmless.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, Level};

use crate::error::CollectionError;

use super::extractor::extract;
use super::metrics::SmartctlMetrics;
use super::smartctl::{discover, fetch_report, normalize_output, SmartctlRunner};
use super::smartctl_report::DeviceRef;

/// Outcome of one collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub devices: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Collector {
    runner: Arc<dyn SmartctlRunner>,
    metrics: Arc<SmartctlMetrics>,
}

impl Collector {
    pub fn new(runner: Arc<dyn SmartctlRunner>, metrics: Arc<SmartctlMetrics>) -> Self {
        Self { runner, metrics }
    }

    /// Run one pass: discover, then collect every device concurrently.
    ///
    /// Device failures are logged here and counted in the summary. A
    /// discovery failure is returned without touching any device.
    pub async fn run_pass(&self) -> Result<PassSummary, CollectionError> {
        info!("looking for devices");
        let devices = discover(self.runner.as_ref())
            .await
            .map_err(CollectionError::Discovery)?;
        info!(count = devices.len(), "discovered devices");

        let mut tasks = JoinSet::new();
        for device in devices {
            let runner = self.runner.clone();
            let metrics = self.metrics.clone();
            tasks.spawn(async move { collect_device(runner.as_ref(), &metrics, &device).await });
        }

        let mut summary = PassSummary {
            devices: tasks.len(),
            ..Default::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(CollectionError::from).and_then(|result| result) {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    let device = match &e {
                        CollectionError::Device { device, .. } => device.as_str(),
                        _ => "unknown",
                    };
                    error!(device, error = %e, "fetching metrics for device failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Spawn a pass on every tick, forever. The first tick fires immediately.
    pub async fn run(self: Arc<Self>, every: Duration) {
        info!(interval_secs = every.as_secs(), "starting collection loop");

        let mut interval = pass_interval(every);
        loop {
            interval.tick().await;
            let collector = self.clone();
            tokio::spawn(async move {
                match collector.run_pass().await {
                    Ok(summary) => info!(
                        devices = summary.devices,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        "collection pass completed"
                    ),
                    Err(e) => error!(error = %e, "scanning for devices failed"),
                }
            });
        }
    }
}

/// Start-to-start ticks, first one immediate. Ticks missed while the runtime
/// was stalled are dropped rather than fired back to back.
fn pass_interval(every: Duration) -> Interval {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn collect_device(
    runner: &dyn SmartctlRunner,
    metrics: &SmartctlMetrics,
    device: &DeviceRef,
) -> Result<(), CollectionError> {
    info!(device = %device.name, device_type = %device.device_type, "scanning device");

    let (report, raw) =
        fetch_report(runner, device)
            .await
            .map_err(|source| CollectionError::Device {
                device: device.name.clone(),
                source,
            })?;

    if tracing::enabled!(Level::DEBUG) {
        debug!(
            device = %device.name,
            command_output = %normalize_output(&raw),
            loaded_report = %serde_json::to_string(&report).unwrap_or_default(),
            "loaded smartctl device report"
        );
    }

    extract(metrics, device, &report);

    info!(
        device = %device.name,
        model_name = %report.model_name,
        serial_number = %report.serial_number,
        "device metrics updated"
    );
    Ok(())
}
