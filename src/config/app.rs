use anyhow::{bail, Result};
use std::env;

use super::env_or;

const DEV_JWT_SECRET: &str = "liftlog-development-secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
    pub default_membership_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_days: 7,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            default_membership_days: 30,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = AppConfig {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_days: env_or("TOKEN_TTL_DAYS", defaults.token_ttl_days),
            bcrypt_cost: env_or("BCRYPT_COST", defaults.bcrypt_cost),
            default_membership_days: env_or("DEFAULT_MEMBERSHIP_DAYS", defaults.default_membership_days),
        };

        if config.is_production() && config.jwt_secret == DEV_JWT_SECRET {
            bail!("JWT_SECRET must be set in production");
        }
        if !(4..=31).contains(&config.bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31, got {}", config.bcrypt_cost);
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.default_membership_days, 30);
        assert_eq!(config.server_address(), "0.0.0.0:3000");
        assert!(config.is_development());
    }
}
