use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use time::{UtcOffset, macros::format_description};
use tracing::warn;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::wallet::load_wallet_file;
use crate::config::{CONFIG_TEMPLATE, FlotillaConfig, GlobalConfig, LoggingConfig};
use crate::wallet::WalletSet;

const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

const QUIET_TARGETS: &[(&str, &str)] = &[
    ("hyper", "warn"),
    ("hyper_util::client::legacy", "warn"),
    ("reqwest", "info"),
];

/// 初始化 tracing，支持 JSON 与文本两种输出。
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let mut filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    for (module, level) in QUIET_TARGETS {
        if !config.level.contains(module) {
            if let Ok(directive) = format!("{module}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    let time_format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::from_hms(config.timezone_offset_hours, 0, 0).map_err(|err| {
        anyhow!(
            "invalid logging timezone offset {}: {err}",
            config.timezone_offset_hours
        )
    })?;

    let base = fmt()
        .with_timer(OffsetTime::new(offset, time_format))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true)
        .with_level(true);

    if config.json {
        base.json()
            .with_current_span(false)
            .with_span_list(false)
            .with_env_filter(filter)
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    } else {
        base.with_env_filter(filter)
            .event_format(fmt::format().compact())
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    }
    Ok(())
}

pub fn init_configs(args: crate::cli::args::InitCmd) -> Result<()> {
    let output_dir = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    fs::create_dir_all(&output_dir)?;

    let target_path = output_dir.join("flotilla.yaml");
    if target_path.exists() && !args.force {
        println!(
            "跳过 {}（文件已存在，如需覆盖请加 --force）",
            target_path.display()
        );
        return Ok(());
    }

    fs::write(&target_path, CONFIG_TEMPLATE)?;
    println!("已写入 {}", target_path.display());
    Ok(())
}

pub fn resolve_rpc_client(global: &GlobalConfig) -> Arc<RpcClient> {
    let url = global.primary_rpc_url().unwrap_or_else(|| {
        warn!(target: "cli", "未配置 global.rpc_urls，使用默认主网 RPC");
        DEFAULT_RPC_URL
    });
    Arc::new(RpcClient::new_with_commitment(
        url.to_string(),
        CommitmentConfig::confirmed(),
    ))
}

pub fn build_http_client(timeout_ms: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms.max(1)))
        .build()
        .context("构建 HTTP 客户端失败")
}

pub fn load_wallets(config: &FlotillaConfig) -> Result<WalletSet> {
    let path = config
        .global
        .wallets_file
        .as_deref()
        .ok_or_else(|| anyhow!("未配置 global.wallets_file"))?;
    let wallets = load_wallet_file(path)?;
    if wallets.is_empty() {
        return Err(anyhow!("钱包文件 {} 中没有可用私钥", path.display()));
    }
    Ok(wallets)
}
