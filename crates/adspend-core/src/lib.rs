pub mod app_config;
pub mod config;
pub mod metrics;
pub mod normalize;
pub mod records;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use metrics::{
    delta_pct, parse_store_date, DateWindow, MetricsComparison, MetricsDelta, MetricsWindow,
    TrailingWindows,
};
pub use normalize::{coerce_number, normalize_rows, BatchDefaults, RawRow, FALLBACK_SOURCE_FILE};
pub use records::{BatchKey, SpendRecord};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
