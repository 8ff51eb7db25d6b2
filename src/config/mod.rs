pub mod app;
pub mod database;
pub mod seeding;
pub mod storage;

pub use app::AppConfig;
pub use database::{run_migrations, DatabaseConfig};
pub use seeding::{AdminAccount, AdminSeeder, SeedOutcome};
pub use storage::{StorageConfig, UploadConfig};

use std::env;
use std::str::FromStr;

/// Read an environment variable, falling back to `default` when unset or unparsable
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean flags accept `true/false`, `1/0`, `yes/no`
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key).map(|v| v.trim().to_lowercase()) {
        Ok(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Ok(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
