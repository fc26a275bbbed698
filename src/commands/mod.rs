pub mod collect;
pub mod serve;

use std::path::Path;

use anyhow::Result;

use crate::config::{self, Config};

/// Command-line values that take precedence over file and env config.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<String>,
    pub http_addr: Option<String>,
    pub log_level: Option<String>,
}

/// Load configuration (custom path or defaults + env), then apply CLI flags.
pub fn load_config(overrides: Overrides) -> Result<Config> {
    let mut cfg = config::load(overrides.config.as_deref().map(Path::new))?;

    if let Some(addr) = overrides.http_addr {
        cfg.http_addr = addr;
    }
    if let Some(level) = overrides.log_level {
        cfg.log_level = level;
    }

    Ok(cfg)
}
