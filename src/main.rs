mod api;
mod commands;
mod config;
mod domain;
mod error;
mod server;

use clap::{Args, Parser, Subcommand};

use commands::Overrides;

#[derive(Parser)]
#[command(
    name = "smartctl-exporter",
    version,
    about = "Export smartctl S.M.A.R.T. data as Prometheus metrics"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// HTTP listen address (overrides config)
    #[arg(long, global = true)]
    http_addr: Option<String>,

    /// Log level (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve /metrics and collect on a fixed interval (default)
    Serve,

    /// Run a single collection pass and print the metrics to stdout
    Collect,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = Overrides {
        config: cli.global.config,
        http_addr: cli.global.http_addr,
        log_level: cli.global.log_level,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::run(overrides),
        Commands::Collect => commands::collect::run(overrides),
    }
}
