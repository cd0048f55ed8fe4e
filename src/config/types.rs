use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct FlotillaConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// 覆盖默认容量上限，键为操作类型字符串（如 `buy@raydium`）。
    #[serde(default)]
    pub capacity: BTreeMap<String, usize>,
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub lander: LanderSettings,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    #[serde(default, deserialize_with = "super::deserialize_url_list")]
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub wallets_file: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GlobalConfig {
    pub fn primary_rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "super::default_logging_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "super::default_timezone_offset_hours")]
    pub timezone_offset_hours: i8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// 相邻两个单元网络调用之间的最小间隔。
    #[serde(default = "super::default_unit_delay_ms")]
    pub unit_delay_ms: u64,
    #[serde(default = "super::default_balance_concurrency")]
    pub balance_concurrency: usize,
    /// 买入/转账/部署时为手续费预留的 lamports。
    #[serde(default = "super::default_fee_reserve_lamports")]
    pub fee_reserve_lamports: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuilderConfig {
    #[serde(default = "super::default_builder_base_url")]
    pub base_url: String,
    #[serde(default = "super::default_builder_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LanderKind {
    #[default]
    Jito,
    Rpc,
    DryRun,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionEncoding {
    #[default]
    Base58,
    Base64,
}

impl TransactionEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionEncoding::Base58 => "base58",
            TransactionEncoding::Base64 => "base64",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanderSettings {
    #[serde(default)]
    pub kind: LanderKind,
    #[serde(default, deserialize_with = "super::deserialize_url_list")]
    pub jito_endpoints: Vec<String>,
    /// builder 返回交易所用的编码，签名后保持相同编码提交。
    #[serde(default)]
    pub encoding: TransactionEncoding,
    #[serde(default = "super::default_lander_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub skip_preflight: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "super::default_prometheus_listen")]
    pub listen: String,
}
