use serde::Serialize;

use boostline_core::config::{AppConfig, LoadOptions, LogFormat, StorageBackend};

/// Renders the effective configuration after defaults, file, and environment
/// are folded together. The checkout API key is never printed, only whether
/// one is set.
pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => render(&config),
        Err(error) => format!("configuration failed to load: {error}"),
    }
}

#[derive(Debug, Serialize)]
struct EffectiveCollaborator<'a> {
    base_url: &'a str,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct EffectiveConfig<'a> {
    catalog: EffectiveCollaborator<'a>,
    promotion: EffectiveCollaborator<'a>,
    checkout: EffectiveCheckout<'a>,
    orders: EffectiveCollaborator<'a>,
    storage_backend: StorageBackend,
    storage_path: Option<String>,
    log_level: &'a str,
    log_format: LogFormat,
}

#[derive(Debug, Serialize)]
struct EffectiveCheckout<'a> {
    base_url: &'a str,
    timeout_secs: u64,
    api_key: &'static str,
}

fn render(config: &AppConfig) -> String {
    let view = EffectiveConfig {
        catalog: EffectiveCollaborator {
            base_url: &config.catalog.base_url,
            timeout_secs: config.catalog.timeout_secs,
        },
        promotion: EffectiveCollaborator {
            base_url: &config.promotion.base_url,
            timeout_secs: config.promotion.timeout_secs,
        },
        checkout: EffectiveCheckout {
            base_url: &config.checkout.base_url,
            timeout_secs: config.checkout.timeout_secs,
            api_key: if config.checkout.api_key.is_some() { "[redacted]" } else { "[not set]" },
        },
        orders: EffectiveCollaborator {
            base_url: &config.orders.base_url,
            timeout_secs: config.orders.timeout_secs,
        },
        storage_backend: config.storage.backend,
        storage_path: config.storage.path.as_ref().map(|path| path.display().to_string()),
        log_level: &config.logging.level,
        log_format: config.logging.format,
    };

    serde_json::to_string_pretty(&view)
        .unwrap_or_else(|error| format!("config serialization failed: {error}"))
}
