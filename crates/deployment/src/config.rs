//! Environment-driven settings, read once at startup.

use services::services::sales_import::{
    DEFAULT_CLIENT_BATCH_SIZE, DEFAULT_SALE_BATCH_SIZE, clamp_client_batch_size,
    clamp_sale_batch_size,
};
use tracing::warn;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://bizadmin.db";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub import_batch_size: usize,
    pub client_batch_size: usize,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            import_batch_size: DEFAULT_SALE_BATCH_SIZE,
            client_batch_size: DEFAULT_CLIENT_BATCH_SIZE,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %value, "Ignoring invalid setting, using default");
            default
        }),
        None => default,
    }
}

impl DeploymentConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. `BACKEND_PORT` takes precedence over `PORT`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let port_raw = lookup("BACKEND_PORT").or_else(|| lookup("PORT"));

        Self {
            database_url: lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.database_url),
            host: lookup("HOST")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.host),
            port: parse_or("PORT", port_raw, defaults.port),
            import_batch_size: clamp_sale_batch_size(parse_or(
                "IMPORT_BATCH_SIZE",
                lookup("IMPORT_BATCH_SIZE"),
                defaults.import_batch_size,
            )),
            client_batch_size: clamp_client_batch_size(parse_or(
                "CLIENT_BATCH_SIZE",
                lookup("CLIENT_BATCH_SIZE"),
                defaults.client_batch_size,
            )),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
