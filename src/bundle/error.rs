use std::fmt;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("交易解码失败: {0}")]
    Decode(String),
    #[error("交易编码失败: {0}")]
    Encode(String),
    #[error("缺少签名者: {}", format_pubkeys(.0))]
    UnresolvedSigners(Vec<Pubkey>),
    #[error("builder 请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("builder 拒绝请求: {0}")]
    Rejected(String),
    #[error("{0}")]
    Fatal(String),
}

impl BundleError {
    pub fn fatal(reason: impl fmt::Display) -> Self {
        Self::Fatal(reason.to_string())
    }
}

fn format_pubkeys(keys: &[Pubkey]) -> String {
    keys.iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
