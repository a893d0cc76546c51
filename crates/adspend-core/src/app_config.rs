use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Startup configuration shared by the store and the HTTP server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Location of the SQLite file. May be relative; reported absolute.
    pub db_path: PathBuf,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_busy_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Largest accepted `POST /ingest` body, in bytes.
    pub ingest_max_body_bytes: usize,
}

impl AppConfig {
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }
}
