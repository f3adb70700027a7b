//! Server configuration loaded from environment variables.

use std::path::PathBuf;

/// Runtime configuration, loaded once at startup.
///
/// All fields have defaults suitable for local development; override via
/// environment variables (or a `.env` file) in production.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5001`).
    pub port: u16,
    /// SQLite connection string (default: `sqlite://beacon.db`).
    pub database_url: String,
    /// Directory finished reports are written to (default: `reports`).
    pub reports_dir: PathBuf,
    /// Lighthouse executable (default: `lighthouse`, resolved via PATH).
    pub lighthouse_bin: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var          | Default               |
    /// |------------------|-----------------------|
    /// | `HOST`           | `0.0.0.0`             |
    /// | `PORT`           | `5001`                |
    /// | `DATABASE_URL`   | `sqlite://beacon.db`  |
    /// | `REPORTS_DIR`    | `reports`             |
    /// | `LIGHTHOUSE_BIN` | `lighthouse`          |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5001".into())
            .parse()
            .expect("PORT must be a valid u16");

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://beacon.db".into());

        let reports_dir: PathBuf = std::env::var("REPORTS_DIR")
            .unwrap_or_else(|_| "reports".into())
            .into();

        let lighthouse_bin: PathBuf = std::env::var("LIGHTHOUSE_BIN")
            .unwrap_or_else(|_| "lighthouse".into())
            .into();

        Self {
            host,
            port,
            database_url,
            reports_dir,
            lighthouse_bin,
        }
    }
}
