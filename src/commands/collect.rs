//! `smartctl-exporter collect` — run one pass and print the exposition.
//!
//! Useful to check what the exporter would publish without starting the
//! HTTP server. Logs go to stderr so stdout stays scrape-format only.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::domain::collector::Collector;
use crate::domain::metrics::SmartctlMetrics;
use crate::domain::smartctl::SmartctlCommand;

use super::{load_config, Overrides};

pub fn run(overrides: Overrides) -> Result<()> {
    let config = load_config(overrides)?;

    crate::server::init_tracing(&config.log_level, std::io::stderr);

    let rt = tokio::runtime::Runtime::new()?;
    let text = rt.block_on(async {
        let metrics = Arc::new(SmartctlMetrics::new().context("registering metrics")?);
        let runner = Arc::new(SmartctlCommand::new(&config.collector.smartctl_path));
        let collector = Collector::new(runner, metrics.clone());

        let summary = collector.run_pass().await?;
        tracing::info!(
            devices = summary.devices,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "collection pass completed"
        );

        metrics.encode().context("encoding metrics")
    })?;

    print!("{text}");
    Ok(())
}
