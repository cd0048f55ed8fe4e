use std::fmt;

use reqwest::Error as ReqwestError;
use solana_client::client_error::ClientError;
use thiserror::Error;

use crate::bundle::BundleError;

#[derive(Debug, Error)]
pub enum LanderError {
    #[error("RPC 提交失败: {0}")]
    Rpc(#[from] ClientError),
    #[error("网络请求失败: {0}")]
    Network(#[from] ReqwestError),
    #[error("交易编解码失败: {0}")]
    Codec(#[from] BundleError),
    #[error("{0}")]
    Fatal(String),
}

impl LanderError {
    pub fn fatal(reason: impl fmt::Display) -> Self {
        Self::Fatal(reason.to_string())
    }
}
