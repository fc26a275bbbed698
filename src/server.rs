use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

use crate::api::rest::{self, AppState};
use crate::config::Config;
use crate::domain::collector::Collector;
use crate::domain::metrics::SmartctlMetrics;
use crate::domain::smartctl::SmartctlCommand;

/// JSON logs to `writer`; `RUST_LOG` wins over the configured level.
pub fn init_tracing<W>(log_level: &str, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    log_subscriber(log_level, writer).init();
}

fn log_subscriber<W>(log_level: &str, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .json()
        .finish()
}

pub async fn run(config: Config) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "smartctl exporter starting");

    let metrics = Arc::new(SmartctlMetrics::new().context("registering metrics")?);
    let runner = Arc::new(SmartctlCommand::new(&config.collector.smartctl_path));
    let collector = Arc::new(Collector::new(runner, metrics.clone()));

    let app = rest::router(AppState { metrics }, &config.static_files.dir)
        .layer(TraceLayer::new_for_http());

    // Binding is the only fatal failure; everything after it keeps serving.
    let http_addr = &config.http_addr;
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("binding to {}", http_addr))?;

    info!(
        addr = %http_addr,
        static_dir = %config.static_files.dir.display(),
        "HTTP server listening"
    );

    // Spawn the collection loop (first pass runs immediately, in the background)
    let interval = config.collector.interval();
    tokio::spawn(collector.run(interval));

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("smartctl exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("Received Ctrl+C, shutting down"); },
        _ = terminate => { info!("Received SIGTERM, shutting down"); },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn logs_are_json_lines_on_the_given_writer() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = log_subscriber("info", move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            warn!(device = "/dev/sda", "fetching metrics for device failed");
        });

        let bytes = captured.0.lock().unwrap().clone();
        let text = String::from_utf8(bytes).unwrap();
        let line: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["fields"]["message"], "fetching metrics for device failed");
        assert_eq!(line["fields"]["device"], "/dev/sda");
    }
}
