mod config;

pub use config::{AdmissionConfig, BasaltConfig, ConfigError, WorkloadConfig};
