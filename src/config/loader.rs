use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::FlotillaConfig;

pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "flotilla.yaml",
    "config/flotilla.yaml",
    "flotilla.toml",
];

pub const CONFIG_TEMPLATE: &str = r#"global:
  rpc_urls:
    - https://api.mainnet-beta.solana.com
  wallets_file: wallets.yaml
  logging:
    level: info
    json: false
    timezone_offset_hours: 0

executor:
  unit_delay_ms: 1000
  balance_concurrency: 8
  fee_reserve_lamports: 5000000

# 覆盖默认容量上限
capacity:
  buy@pumpfun: 120
  sell@pumpfun: 180

builder:
  base_url: http://127.0.0.1:8080
  timeout_ms: 15000

lander:
  kind: jito
  jito_endpoints:
    - https://mainnet.block-engine.jito.wtf/api/v1/bundles
  encoding: base58

prometheus:
  enable: false
  listen: 0.0.0.0:9898
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_config(path: Option<PathBuf>) -> Result<FlotillaConfig, ConfigError> {
    let candidate_paths = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::Invalid(format!(
                    "指定的配置文件不存在: {}",
                    p.display()
                )));
            }
            vec![p]
        }
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<PathBuf>>(),
    };

    let mut config = None;
    for candidate in candidate_paths {
        if let Some(loaded) = try_load_file(&candidate)? {
            config = Some(loaded);
            break;
        }
    }

    let mut config = config.unwrap_or_default();
    apply_env_overrides(&mut config);
    Ok(config)
}

fn try_load_file(path: &Path) -> Result<Option<FlotillaConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(path, &contents).map(Some)
}

pub fn parse_config(path: &Path, contents: &str) -> Result<FlotillaConfig, ConfigError> {
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    } else {
        serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

fn apply_env_overrides(config: &mut FlotillaConfig) {
    if let Some(url) = non_empty_env("FLOTILLA_RPC_URL") {
        config.global.rpc_urls.retain(|existing| existing != &url);
        config.global.rpc_urls.insert(0, url);
    }
    if let Some(key) = non_empty_env("FLOTILLA_BUILDER_API_KEY") {
        config.builder.api_key = Some(key);
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
