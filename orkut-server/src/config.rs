use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Development-only secret; deployments set `JWT_SECRET`
pub const DEFAULT_JWT_SECRET: &str = "orkut-dev-secret-change-me";

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub jwt_secret: String,
    pub session_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Uploads {
    pub dir: String,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub auth: Auth,
    pub uploads: Uploads,
    pub rate_limit: RateLimit,
}

/// Environment variables that override file and default values
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("DATABASE_PATH", "database.path"),
    ("JWT_SECRET", "auth.jwt_secret"),
    ("SESSION_DAYS", "auth.session_days"),
    ("UPLOADS_DIR", "uploads.dir"),
    ("MAX_UPLOAD_BYTES", "uploads.max_bytes"),
];

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Self::defaults()?;

        // settings.toml in the working directory, or next to the crate during development
        let config_file_name = "settings.toml";

        let current_dir_path = PathBuf::from(config_file_name);
        if current_dir_path.exists() {
            builder = builder.add_source(File::from(current_dir_path).required(false));
        }

        let dev_path = PathBuf::from("orkut-server").join(config_file_name);
        if dev_path.exists() {
            builder = builder.add_source(File::from(dev_path).required(false));
        }

        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        let s = builder.build()?;
        s.try_deserialize()
    }

    /// Defaults only, no files or environment. Used by tests.
    pub fn default_settings() -> Result<Self, ConfigError> {
        Self::defaults()?.build()?.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.path", "orkut.db")?
            .set_default("auth.jwt_secret", DEFAULT_JWT_SECRET)?
            .set_default("auth.session_days", 30)?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.max_bytes", 5 * 1024 * 1024)?
            .set_default("rate_limit.max_requests", 100)?
            .set_default("rate_limit.window_seconds", 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default_settings().expect("defaults should deserialize");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.database.path, "orkut.db");
        assert_eq!(settings.auth.session_days, 30);
        assert_eq!(settings.uploads.max_bytes, 5 * 1024 * 1024);
        assert_eq!(settings.rate_limit.max_requests, 100);
        assert_eq!(settings.rate_limit.window_seconds, 60);
    }
}
