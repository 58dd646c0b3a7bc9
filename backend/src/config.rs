//! Application configuration.
//!
//! Settings are read from `tour-booking.toml` and then overridden by
//! environment variables. Every table and key is optional; a missing file
//! yields a configuration suitable for local development (in-memory store,
//! mock payment gateway, mock translator, in-memory object storage).
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! public_base_url = "https://tours.example.com"
//!
//! [repository]
//! type = "postgres"
//!
//! [postgres]
//! database_url = "postgres://tours@localhost/tours"
//!
//! [payment]
//! provider = "stripe"
//!
//! [auth.static_tokens]
//! "dev-admin-token" = "admin-user-id"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::db::RepositoryConfig;
use crate::models::Language;
use crate::services::catalog::CatalogSettings;
use crate::services::uploads::DEFAULT_MAX_UPLOAD_BYTES;
use crate::services::CheckoutSettings;

pub const CONFIG_FILE_NAME: &str = "tour-booking.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TOUR_BOOKING_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    /// `[repository]` and `[postgres]` tables.
    #[serde(flatten)]
    pub database: RepositoryConfig,
    #[serde(default)]
    pub payment: PaymentSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub translator: TranslatorSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Storefront origin used in payment return URLs.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Allowed CORS origins; any origin when empty.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: default_public_base_url(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub default_language: Language,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            default_language: Language::En,
        }
    }
}

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    #[default]
    Mock,
    Stripe,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentSettings {
    #[serde(default)]
    pub provider: PaymentProvider,
    #[serde(default)]
    pub secret_key: String,
    /// Override of the gateway API origin.
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    Memory,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub service_key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Memory,
            url: String::new(),
            bucket: default_bucket(),
            service_key: String::new(),
        }
    }
}

fn default_bucket() -> String {
    "media".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorProvider {
    #[default]
    Mock,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorSettings {
    #[serde(default)]
    pub provider: TranslatorProvider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            provider: TranslatorProvider::Mock,
            api_key: String::new(),
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Static,
    Http,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub provider: AuthProvider,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    /// Token → auth subject, for the static verifier.
    #[serde(default)]
    pub static_tokens: HashMap<String, String>,
    /// Auth subject → email of profiles granted the admin role at startup.
    #[serde(default)]
    pub bootstrap_admins: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl AppConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Places searched for the config file, in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from(CONFIG_FILE_NAME));
        paths.push(Path::new("config").join(CONFIG_FILE_NAME));
        paths.push(Path::new("/etc/tour-booking").join(CONFIG_FILE_NAME));
        paths
    }

    /// Load the first config file found (defaults when none exists), then
    /// apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                log::info!("No {} found, using defaults", CONFIG_FILE_NAME);
                Self::default()
            }
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT must be a number, got '{}'", port)))?;
        }
        if let Some(url) = lookup("PUBLIC_BASE_URL") {
            self.server.public_base_url = url;
        }
        if let Some(repo_type) = lookup("REPOSITORY_TYPE") {
            self.database.repository.repo_type = repo_type;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.postgres.database_url = url;
        }
        if let Some(key) = lookup("STRIPE_SECRET_KEY") {
            self.payment.secret_key = key;
            self.payment.provider = PaymentProvider::Stripe;
        }
        if let Some(url) = lookup("STORAGE_URL") {
            self.storage.url = url;
            self.storage.provider = StorageProvider::Http;
        }
        if let Some(key) = lookup("STORAGE_SERVICE_KEY") {
            self.storage.service_key = key;
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.translator.api_key = key;
            self.translator.provider = TranslatorProvider::Anthropic;
        }
        if let Some(url) = lookup("AUTH_URL") {
            self.auth.url = url;
            self.auth.provider = AuthProvider::Http;
        }
        if let Some(key) = lookup("AUTH_API_KEY") {
            self.auth.api_key = key;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database
            .repository_type()
            .map_err(ConfigError::Invalid)?;
        if self.store.currency.len() != 3 || !self.store.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid(format!(
                "currency must be a three-letter code, got '{}'",
                self.store.currency
            )));
        }
        if self.payment.provider == PaymentProvider::Stripe && self.payment.secret_key.is_empty() {
            return Err(ConfigError::Invalid(
                "payment.secret_key is required for the stripe provider".to_string(),
            ));
        }
        if self.storage.provider == StorageProvider::Http && self.storage.url.is_empty() {
            return Err(ConfigError::Invalid(
                "storage.url is required for the http provider".to_string(),
            ));
        }
        if self.auth.provider == AuthProvider::Http && self.auth.url.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.url is required for the http provider".to_string(),
            ));
        }
        if self.uploads.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "uploads.max_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            public_base_url: self.server.public_base_url.clone(),
            currency: self.store.currency.to_uppercase(),
            default_language: self.store.default_language,
        }
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            default_language: self.store.default_language,
            currency: self.store.currency.to_uppercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("", Path::new("empty.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.repository.repo_type, "local");
        assert_eq!(config.payment.provider, PaymentProvider::Mock);
        assert_eq!(config.uploads.max_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tables_parse() {
        let content = r#"
            [server]
            port = 9000
            public_base_url = "https://tours.example.com"

            [store]
            currency = "usd"
            default_language = "es"

            [repository]
            type = "postgres"

            [postgres]
            database_url = "postgres://localhost/tours"
            max_connections = 4

            [auth.static_tokens]
            "tok" = "user-1"
        "#;
        let config = AppConfig::from_toml_str(content, Path::new("t.toml")).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.database.postgres.max_connections, 4);
        assert_eq!(config.auth.static_tokens["tok"], "user-1");
        assert_eq!(config.checkout_settings().currency, "USD");
        assert_eq!(config.catalog_settings().default_language, Language::Es);
    }

    #[test]
    fn test_env_overrides_switch_providers() {
        let mut config = AppConfig::default();
        let env: HashMap<&str, &str> = [
            ("PORT", "7000"),
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("AUTH_URL", "https://auth.example.com"),
            ("REPOSITORY_TYPE", "postgres"),
        ]
        .into_iter()
        .collect();
        config
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.payment.provider, PaymentProvider::Stripe);
        assert_eq!(config.auth.provider, AuthProvider::Http);
        assert_eq!(config.database.repository.repo_type, "postgres");
        assert!(config.validate().is_ok());

        let bad_port: HashMap<&str, &str> = [("PORT", "http")].into_iter().collect();
        assert!(config
            .apply_env_from(|key| bad_port.get(key).map(|v| v.to_string()))
            .is_err());
    }

    #[test]
    fn test_validation_catches_missing_credentials() {
        let mut config = AppConfig::default();
        config.payment.provider = PaymentProvider::Stripe;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.store.currency = "euro".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.repository.repo_type = "mongo".to_string();
        assert!(config.validate().is_err());
    }
}
