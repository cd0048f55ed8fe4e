use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// 预检失败：单元被跳过并计为失败。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("钱包列表为空")]
    EmptyWalletSet,
    #[error("缺少 mint")]
    MissingMint,
    #[error("缺少 SOL 数量")]
    MissingAmount,
    #[error("数量必须大于 0，实际为 {0}")]
    AmountOutOfRange(f64),
    #[error("缺少百分比")]
    MissingPercentage,
    #[error("百分比必须位于 (0, 100]，实际为 {0}")]
    PercentageOutOfRange(f64),
    #[error("滑点 {0} bps 超过 10000")]
    SlippageOutOfRange(u16),
    #[error("缺少买方")]
    MissingBuyer,
    #[error("需要 {expected} 个钱包，实际为 {actual}")]
    WalletCount { expected: usize, actual: usize },
    #[error("缺少接收地址")]
    MissingRecipient,
    #[error("接收地址 {0} 同时也是发送方")]
    SelfTransfer(Pubkey),
    #[error("缺少代币元数据")]
    MissingMetadata,
    #[error("代币元数据非法: {0}")]
    InvalidMetadata(String),
    #[error("钱包 {0} 的余额未知")]
    BalanceUnknown(Pubkey),
    #[error("钱包 {wallet} 余额不足: 需要 {required} lamports，可用 {available}")]
    InsufficientBalance {
        wallet: Pubkey,
        required: u64,
        available: u64,
    },
    #[error("钱包 {wallet} 未持有 {mint}")]
    NoTokenBalance { wallet: Pubkey, mint: Pubkey },
    #[error("无法确定 {0} 的精度")]
    DecimalsUnknown(Pubkey),
    #[error("钱包 {wallet} 的 {mint} 余额不足: 需要 {required}，可用 {available}")]
    InsufficientTokenBalance {
        wallet: Pubkey,
        mint: Pubkey,
        required: u64,
        available: u64,
    },
}

/// 只用于装配错误；普通执行失败通过 `OperationResult::failure` 返回。
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("构造 builder 请求失败: {0}")]
    Request(#[from] serde_json::Error),
    #[error("适配器装配错误: {0}")]
    Wiring(String),
}
