use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CollaboratorConfig,
    pub promotion: CollaboratorConfig,
    pub checkout: CheckoutConfig,
    pub orders: CollaboratorConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Base URL + timeout for one external collaborator.
#[derive(Clone, Debug)]
pub struct CollaboratorConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_base_url: Option<String>,
    pub promotion_base_url: Option<String>,
    pub checkout_base_url: Option<String>,
    pub orders_base_url: Option<String>,
    pub checkout_api_key: Option<String>,
    pub storage_backend: Option<StorageBackend>,
    pub storage_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CollaboratorConfig {
                base_url: "http://localhost:4000/api/catalog".to_string(),
                timeout_secs: 15,
            },
            promotion: CollaboratorConfig {
                base_url: "http://localhost:4000/api/promotions".to_string(),
                timeout_secs: 15,
            },
            checkout: CheckoutConfig {
                base_url: "http://localhost:4000/api/checkout".to_string(),
                timeout_secs: 30,
                api_key: None,
            },
            orders: CollaboratorConfig {
                base_url: "http://localhost:4000/api/orders".to_string(),
                timeout_secs: 15,
            },
            storage: StorageConfig { backend: StorageBackend::Memory, path: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(ConfigError::Validation(format!(
                "unsupported storage backend `{other}` (expected memory|file)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("boostline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            apply_collaborator_patch(&mut self.catalog, catalog);
        }
        if let Some(promotion) = patch.promotion {
            apply_collaborator_patch(&mut self.promotion, promotion);
        }
        if let Some(orders) = patch.orders {
            apply_collaborator_patch(&mut self.orders, orders);
        }

        if let Some(checkout) = patch.checkout {
            if let Some(base_url) = checkout.base_url {
                self.checkout.base_url = base_url;
            }
            if let Some(timeout_secs) = checkout.timeout_secs {
                self.checkout.timeout_secs = timeout_secs;
            }
            if let Some(api_key_value) = checkout.api_key {
                self.checkout.api_key = Some(api_key_value.into());
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(backend) = storage.backend {
                self.storage.backend = backend;
            }
            if let Some(path) = storage.path {
                self.storage.path = Some(path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BOOSTLINE_CATALOG_BASE_URL") {
            self.catalog.base_url = value;
        }
        if let Some(value) = read_env("BOOSTLINE_CATALOG_TIMEOUT_SECS") {
            self.catalog.timeout_secs = parse_u64("BOOSTLINE_CATALOG_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BOOSTLINE_PROMOTION_BASE_URL") {
            self.promotion.base_url = value;
        }
        if let Some(value) = read_env("BOOSTLINE_PROMOTION_TIMEOUT_SECS") {
            self.promotion.timeout_secs = parse_u64("BOOSTLINE_PROMOTION_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BOOSTLINE_CHECKOUT_BASE_URL") {
            self.checkout.base_url = value;
        }
        if let Some(value) = read_env("BOOSTLINE_CHECKOUT_TIMEOUT_SECS") {
            self.checkout.timeout_secs = parse_u64("BOOSTLINE_CHECKOUT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BOOSTLINE_CHECKOUT_API_KEY") {
            self.checkout.api_key = Some(value.into());
        }
        if let Some(value) = read_env("BOOSTLINE_ORDERS_BASE_URL") {
            self.orders.base_url = value;
        }
        if let Some(value) = read_env("BOOSTLINE_ORDERS_TIMEOUT_SECS") {
            self.orders.timeout_secs = parse_u64("BOOSTLINE_ORDERS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BOOSTLINE_STORAGE_BACKEND") {
            self.storage.backend = value.parse()?;
        }
        if let Some(value) = read_env("BOOSTLINE_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(value));
        }

        let log_level =
            read_env("BOOSTLINE_LOGGING_LEVEL").or_else(|| read_env("BOOSTLINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BOOSTLINE_LOGGING_FORMAT").or_else(|| read_env("BOOSTLINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.catalog_base_url {
            self.catalog.base_url = base_url;
        }
        if let Some(base_url) = overrides.promotion_base_url {
            self.promotion.base_url = base_url;
        }
        if let Some(base_url) = overrides.checkout_base_url {
            self.checkout.base_url = base_url;
        }
        if let Some(base_url) = overrides.orders_base_url {
            self.orders.base_url = base_url;
        }
        if let Some(api_key) = overrides.checkout_api_key {
            self.checkout.api_key = Some(api_key.into());
        }
        if let Some(backend) = overrides.storage_backend {
            self.storage.backend = backend;
        }
        if let Some(path) = overrides.storage_path {
            self.storage.path = Some(path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_collaborator("catalog", &self.catalog)?;
        validate_collaborator("promotion", &self.promotion)?;
        validate_collaborator("orders", &self.orders)?;
        validate_base_url("checkout", &self.checkout.base_url)?;
        validate_timeout("checkout", self.checkout.timeout_secs)?;
        validate_storage(&self.storage)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_collaborator_patch(target: &mut CollaboratorConfig, patch: CollaboratorPatch) {
    if let Some(base_url) = patch.base_url {
        target.base_url = base_url;
    }
    if let Some(timeout_secs) = patch.timeout_secs {
        target.timeout_secs = timeout_secs;
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("boostline.toml"), PathBuf::from("config/boostline.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_collaborator(name: &str, config: &CollaboratorConfig) -> Result<(), ConfigError> {
    validate_base_url(name, &config.base_url)?;
    validate_timeout(name, config.timeout_secs)
}

fn validate_base_url(name: &str, base_url: &str) -> Result<(), ConfigError> {
    let url = base_url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{name}.base_url must start with http:// or https://"
        )));
    }
    Ok(())
}

fn validate_timeout(name: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "{name}.timeout_secs must be in range 1..=300"
        )));
    }
    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.backend == StorageBackend::File && storage.path.is_none() {
        return Err(ConfigError::Validation(
            "storage.path is required when storage.backend is `file`".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CollaboratorPatch>,
    promotion: Option<CollaboratorPatch>,
    checkout: Option<CheckoutPatch>,
    orders: Option<CollaboratorPatch>,
    storage: Option<StoragePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CollaboratorPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    backend: Option<StorageBackend>,
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
