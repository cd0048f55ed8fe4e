//! 远程 builder 返回的未签名 bundle：解码、匹配签名者、本地签名、按原编码回写。

pub mod builder;
pub mod codec;
pub mod error;
pub mod pipeline;
pub mod signer;

use solana_sdk::transaction::VersionedTransaction;

use crate::config::TransactionEncoding;

pub use builder::{BundleSource, HttpBundleBuilder};
pub use codec::{decode_transaction, encode_transaction};
pub use error::BundleError;
pub use pipeline::BundlePipeline;

/// builder 返回的一组有序交易，内容不透明。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedBundle {
    pub transactions: Vec<String>,
    pub encoding: TransactionEncoding,
}

impl UnsignedBundle {
    pub fn new(transactions: Vec<String>, encoding: TransactionEncoding) -> Self {
        Self {
            transactions,
            encoding,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[derive(Debug)]
pub struct PayloadFailure {
    /// 在原始 bundle 中的位置。
    pub index: usize,
    pub error: BundleError,
}

/// 签名后的 bundle。失败的 payload 被丢弃，其余保持原顺序。
#[derive(Debug)]
pub struct SignedBundle {
    pub transactions: Vec<String>,
    pub encoding: TransactionEncoding,
    pub failures: Vec<PayloadFailure>,
}

impl SignedBundle {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn decode_all(&self) -> Result<Vec<VersionedTransaction>, BundleError> {
        self.transactions
            .iter()
            .map(|raw| decode_transaction(raw, self.encoding))
            .collect()
    }

    pub fn first_failure(&self) -> Option<&PayloadFailure> {
        self.failures.first()
    }
}
