use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct BasaltConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
}

/// Limits for an admission queue.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "defaults::max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "defaults::max_metrics_history")]
    pub max_metrics_history: usize,
}

/// Shape of the simulated fan-out the `basalt` binary drives.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadConfig {
    #[serde(default = "defaults::tasks")]
    pub tasks: usize,
    #[serde(default = "defaults::latency_window")]
    pub latency_window: usize,
    /// Every n-th task fails. `0` disables failures.
    #[serde(default = "defaults::failure_every")]
    pub failure_every: usize,
    #[serde(default = "defaults::base_latency_ms")]
    pub base_latency_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn max_concurrent() -> usize {
        10
    }

    pub fn max_queue_size() -> usize {
        1_000
    }

    pub fn max_metrics_history() -> usize {
        100
    }

    pub fn tasks() -> usize {
        200
    }

    pub fn latency_window() -> usize {
        64
    }

    pub fn failure_every() -> usize {
        17
    }

    pub fn base_latency_ms() -> u64 {
        5
    }
}

impl Default for BasaltConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            admission: AdmissionConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            max_queue_size: defaults::max_queue_size(),
            max_metrics_history: defaults::max_metrics_history(),
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            tasks: defaults::tasks(),
            latency_window: defaults::latency_window(),
            failure_every: defaults::failure_every(),
            base_latency_ms: defaults::base_latency_ms(),
        }
    }
}

impl BasaltConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&toml_to_str)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let basalt_config: BasaltConfig = toml::from_str(raw)?;
        basalt_config.validate()?;
        Ok(basalt_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.admission.validate()?;
        if self.workload.latency_window == 0 {
            return Err(ConfigError::Invalid {
                field: "workload.latency_window",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

impl AdmissionConfig {
    /// Zero limits would either never run anything or reject everything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("admission.max_concurrent", self.max_concurrent),
            ("admission.max_queue_size", self.max_queue_size),
            ("admission.max_metrics_history", self.max_metrics_history),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = BasaltConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.admission, AdmissionConfig::default());
        assert_eq!(cfg.admission.max_concurrent, 10);
        assert_eq!(cfg.admission.max_queue_size, 1_000);
        assert_eq!(cfg.admission.max_metrics_history, 100);
        assert_eq!(cfg.workload, WorkloadConfig::default());
    }

    #[test]
    fn partial_tables_fill_remaining_fields() {
        let cfg = BasaltConfig::from_toml_str(
            r#"
            log_level = "debug"

            [admission]
            max_concurrent = 2
            max_queue_size = 1
            "#,
        )
        .unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.admission.max_concurrent, 2);
        assert_eq!(cfg.admission.max_queue_size, 1);
        assert_eq!(cfg.admission.max_metrics_history, 100);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = BasaltConfig::from_toml_str("[admission]\nmax_queue_size = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "admission.max_queue_size",
                ..
            }
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = BasaltConfig::from_toml_str("[admission\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = BasaltConfig::load("/nonexistent/basalt.toml").unwrap_err();
        match err {
            ConfigError::Read { path, .. } => assert_eq!(path, "/nonexistent/basalt.toml"),
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
