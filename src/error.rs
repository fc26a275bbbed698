//! Error taxonomy for the scan → parse → map pipeline.
//!
//! Field-level decode problems never show up here: the report model resolves
//! them to zero values. Only process failures and fundamentally malformed
//! output become errors.

use thiserror::Error;

/// Failure of a single `smartctl` invocation or of decoding its output.
#[derive(Debug, Error)]
pub enum SmartctlError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// `message` is what smartctl said about the failure: its JSON
    /// messages if stdout carried any, otherwise raw stdout or stderr.
    #[error("smartctl exited with {}: {message}", exit_code_display(.code))]
    Failed { code: Option<i32>, message: String },

    #[error("failed to decode smartctl output: {0}")]
    Decode(#[from] serde_json::Error),
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Failure of a collection pass, or of one device within it.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// Discovery failed; the whole pass is abandoned.
    #[error("device discovery failed: {0}")]
    Discovery(#[source] SmartctlError),

    /// Collection failed for one device; other devices are unaffected.
    #[error("collecting {device} failed: {source}")]
    Device {
        device: String,
        #[source]
        source: SmartctlError,
    },

    /// A device task panicked or was cancelled.
    #[error("device task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Registration or encoding failure in the metrics registry.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus registry error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metrics exposition is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_display_includes_exit_code() {
        let err = SmartctlError::Failed {
            code: Some(2),
            message: "open device failed".into(),
        };
        assert_eq!(
            err.to_string(),
            "smartctl exited with status 2: open device failed"
        );
    }

    #[test]
    fn failed_display_without_code_mentions_signal() {
        let err = SmartctlError::Failed {
            code: None,
            message: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn device_error_names_device() {
        let err = CollectionError::Device {
            device: "/dev/sda".into(),
            source: SmartctlError::Failed {
                code: Some(1),
                message: "boom".into(),
            },
        };
        assert!(err.to_string().starts_with("collecting /dev/sda failed"));
    }
}
