use anyhow::Result;

use super::{load_config, Overrides};

pub fn run(overrides: Overrides) -> Result<()> {
    let config = load_config(overrides)?;
    crate::server::init_tracing(&config.log_level, std::io::stdout);

    // Build tokio runtime explicitly (no #[tokio::main] on fn main)
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(crate::server::run(config))
}
