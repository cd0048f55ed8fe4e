use std::collections::HashSet;

use serde::Deserialize;
use serde::de::Deserializer;

pub mod loader;
pub mod types;
pub mod wallet;

pub use loader::*;
pub use types::*;

use self::types as cfg;

pub(crate) fn default_logging_level() -> String {
    "info".to_string()
}

pub(crate) fn default_timezone_offset_hours() -> i8 {
    0
}

pub(crate) fn default_unit_delay_ms() -> u64 {
    1_000
}

pub(crate) fn default_balance_concurrency() -> usize {
    8
}

pub(crate) fn default_fee_reserve_lamports() -> u64 {
    5_000_000
}

pub(crate) fn default_builder_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

pub(crate) fn default_builder_timeout_ms() -> u64 {
    15_000
}

pub(crate) fn default_lander_timeout_ms() -> u64 {
    10_000
}

pub(crate) fn default_prometheus_listen() -> String {
    "0.0.0.0:9898".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrlListField {
    Single(String),
    Multiple(Vec<String>),
}

/// 接受单个字符串或字符串列表，去空白并去重。
pub(crate) fn deserialize_url_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let helper = Option::<UrlListField>::deserialize(deserializer)?;
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    let values = match helper {
        Some(UrlListField::Single(url)) => vec![url],
        Some(UrlListField::Multiple(list)) => list,
        None => Vec::new(),
    };

    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            urls.push(trimmed.to_string());
        }
    }

    Ok(urls)
}

impl Default for cfg::FlotillaConfig {
    fn default() -> Self {
        Self {
            global: cfg::GlobalConfig::default(),
            executor: cfg::ExecutorConfig::default(),
            capacity: Default::default(),
            builder: cfg::BuilderConfig::default(),
            lander: cfg::LanderSettings::default(),
            prometheus: cfg::PrometheusConfig::default(),
        }
    }
}

impl Default for cfg::GlobalConfig {
    fn default() -> Self {
        Self {
            rpc_urls: Vec::new(),
            wallets_file: None,
            logging: cfg::LoggingConfig::default(),
        }
    }
}

impl Default for cfg::LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            json: false,
            timezone_offset_hours: default_timezone_offset_hours(),
        }
    }
}

impl Default for cfg::ExecutorConfig {
    fn default() -> Self {
        Self {
            unit_delay_ms: default_unit_delay_ms(),
            balance_concurrency: default_balance_concurrency(),
            fee_reserve_lamports: default_fee_reserve_lamports(),
        }
    }
}

impl Default for cfg::BuilderConfig {
    fn default() -> Self {
        Self {
            base_url: default_builder_base_url(),
            timeout_ms: default_builder_timeout_ms(),
            api_key: None,
        }
    }
}

impl Default for cfg::LanderSettings {
    fn default() -> Self {
        Self {
            kind: cfg::LanderKind::default(),
            jito_endpoints: Vec::new(),
            encoding: cfg::TransactionEncoding::default(),
            timeout_ms: default_lander_timeout_ms(),
            skip_preflight: false,
        }
    }
}

impl Default for cfg::PrometheusConfig {
    fn default() -> Self {
        Self {
            enable: false,
            listen: default_prometheus_listen(),
        }
    }
}
