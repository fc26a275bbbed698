use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variables with this prefix override file values; `__`
/// separates nested keys (`SMARTCTL_EXPORTER_COLLECTOR__INTERVAL_SECS`).
pub const ENV_PREFIX: &str = "SMARTCTL_EXPORTER_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http_addr: String,
    pub log_level: String,
    pub collector: CollectorConfig,
    pub static_files: StaticFilesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:9000".to_string(),
            log_level: "info".to_string(),
            collector: CollectorConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// smartctl binary, resolved through `PATH` when not absolute.
    pub smartctl_path: PathBuf,
    /// Seconds between the starts of two collection passes.
    pub interval_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            smartctl_path: PathBuf::from("smartctl"),
            interval_secs: 300,
        }
    }
}

impl CollectorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Directory holding the dashboard and Prometheus config served verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub dir: PathBuf,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/dashboards"),
        }
    }
}

/// Load configuration: defaults, then the YAML file (if given), then env.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = path {
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        figment = figment.merge(Yaml::file(path));
    }

    let config: Config = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("loading configuration")?;

    config.validate()?;
    Ok(config)
}

impl Config {
    fn validate(&self) -> Result<()> {
        if self.collector.interval_secs == 0 {
            bail!("collector.interval_secs must be greater than zero");
        }
        if self.http_addr.trim().is_empty() {
            bail!("http_addr must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults() {
        Jail::expect_with(|_jail| {
            let config = load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.http_addr, "0.0.0.0:9000");
            assert_eq!(config.log_level, "info");
            assert_eq!(config.collector.smartctl_path, PathBuf::from("smartctl"));
            assert_eq!(config.collector.interval(), Duration::from_secs(300));
            assert_eq!(config.static_files.dir, PathBuf::from("/dashboards"));
            Ok(())
        });
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "exporter.yaml",
                r#"
http_addr: "127.0.0.1:9633"
collector:
  interval_secs: 60
static_files:
  dir: /srv/dashboards
"#,
            )?;
            let config = load(Some(Path::new("exporter.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.http_addr, "127.0.0.1:9633");
            assert_eq!(config.collector.interval_secs, 60);
            assert_eq!(config.collector.smartctl_path, PathBuf::from("smartctl"));
            assert_eq!(config.static_files.dir, PathBuf::from("/srv/dashboards"));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("exporter.yaml", "log_level: warn\n")?;
            jail.set_env("SMARTCTL_EXPORTER_LOG_LEVEL", "debug");
            jail.set_env("SMARTCTL_EXPORTER_COLLECTOR__SMARTCTL_PATH", "/usr/sbin/smartctl");
            let config = load(Some(Path::new("exporter.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.log_level, "debug");
            assert_eq!(
                config.collector.smartctl_path,
                PathBuf::from("/usr/sbin/smartctl")
            );
            Ok(())
        });
    }

    #[test]
    fn zero_interval_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("exporter.yaml", "collector:\n  interval_secs: 0\n")?;
            let err = load(Some(Path::new("exporter.yaml"))).unwrap_err();
            assert!(err.to_string().contains("interval_secs"));
            Ok(())
        });
    }

    #[test]
    fn missing_config_file_is_an_error() {
        Jail::expect_with(|_jail| {
            assert!(load(Some(Path::new("does-not-exist.yaml"))).is_err());
            Ok(())
        });
    }
}
