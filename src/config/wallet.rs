//! 钱包导入：从钥匙文件解析出内存中的 [`WalletHandle`] 列表。
//!
//! 支持两种文件格式：
//! - YAML 列表，每项 `{ private_key, label, active }`；
//! - 纯文本，每行一个私钥，`#` 开头的行视为注释。

use std::fs;
use std::path::Path;

use serde::Deserialize;
use solana_sdk::signature::Keypair;
use tracing::info;
use zeroize::Zeroizing;

use super::ConfigError;
use crate::wallet::{WalletHandle, WalletSet};

#[derive(Deserialize)]
struct WalletKeyEntry {
    private_key: String,
    #[serde(default)]
    label: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

pub fn load_wallet_file(path: &Path) -> Result<WalletSet, ConfigError> {
    let contents = Zeroizing::new(fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?);

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "yaml" | "yml"));

    let handles = if is_yaml {
        parse_yaml_entries(path, contents.as_str())?
    } else {
        parse_plain_lines(path, contents.as_str())?
    };

    let set = WalletSet::new(handles);
    info!(
        target: "config",
        path = %path.display(),
        wallets = set.len(),
        active = set.active().count(),
        "钱包导入完成"
    );
    Ok(set)
}

fn parse_yaml_entries(path: &Path, contents: &str) -> Result<Vec<WalletHandle>, ConfigError> {
    let entries: Vec<WalletKeyEntry> =
        serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            let private_key = Zeroizing::new(entry.private_key);
            let keypair = parse_keypair_string(private_key.as_str()).map_err(|err| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: format!("第 {} 个钱包私钥非法: {err}", idx + 1),
                }
            })?;
            Ok(WalletHandle::new(keypair, entry.active).with_label(entry.label))
        })
        .collect()
}

fn parse_plain_lines(path: &Path, contents: &str) -> Result<Vec<WalletHandle>, ConfigError> {
    contents
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(idx, line)| {
            let keypair = parse_keypair_string(line).map_err(|err| ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!("第 {} 行私钥非法: {err}", idx + 1),
            })?;
            Ok(WalletHandle::new(keypair, true))
        })
        .collect()
}

/// 解析 base58、JSON 字节数组或逗号分隔字节形式的私钥。
pub fn parse_keypair_string(raw: &str) -> Result<Keypair, anyhow::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("keypair string empty");
    }

    let bytes: Zeroizing<Vec<u8>> = if trimmed.starts_with('[') {
        Zeroizing::new(serde_json::from_str(trimmed)?)
    } else if trimmed.contains(',') {
        Zeroizing::new(
            trimmed
                .split(',')
                .map(|part| part.trim())
                .filter(|part| !part.is_empty())
                .map(|part| part.parse::<u8>())
                .collect::<Result<Vec<_>, _>>()?,
        )
    } else {
        Zeroizing::new(bs58::decode(trimmed).into_vec()?)
    };
    Ok(Keypair::try_from(bytes.as_slice())?)
}
