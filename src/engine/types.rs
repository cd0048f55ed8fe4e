use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;

use super::kind::OperationKind;

/// 部署代币时提交给 builder 的元数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// 单个操作单元的数值与目标参数；协议相关字段放在 `extra` 中原样透传。
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub mint: Option<Pubkey>,
    /// 买入/部署为每个钱包花费的 SOL，转账/销毁为数量。
    #[serde(default)]
    pub amount: Option<f64>,
    /// 卖出或轮换时卖方释放的百分比。
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub recipient: Option<Pubkey>,
    /// 轮换时买方自行再投入的百分比，仅透传给买入腿。
    #[serde(default)]
    pub buy_percentage: Option<f64>,
    /// 轮换时同一卖方对应的买方数量。
    #[serde(default)]
    pub fan_out: Option<usize>,
    #[serde(default)]
    pub metadata: Option<TokenMetadata>,
    /// token 精度；缺省时取余额快照中记录的精度。
    #[serde(default)]
    pub token_decimals: Option<u8>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_slippage_bps() -> u16 {
    100
}

impl Default for OperationParams {
    fn default() -> Self {
        Self {
            mint: None,
            amount: None,
            percentage: None,
            slippage_bps: default_slippage_bps(),
            recipient: None,
            buy_percentage: None,
            fan_out: None,
            metadata: None,
            token_decimals: None,
            extra: BTreeMap::new(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOfWork {
    #[serde(default)]
    pub label: String,
    pub kind: OperationKind,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub wallets: Vec<Pubkey>,
    #[serde(default)]
    pub params: OperationParams,
}

impl UnitOfWork {
    pub fn new(kind: OperationKind, wallets: Vec<Pubkey>, params: OperationParams) -> Self {
        Self {
            label: String::new(),
            kind,
            wallets,
            params,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn display_label(&self, index: usize) -> String {
        if self.label.trim().is_empty() {
            format!("#{index} {}", self.kind)
        } else {
            self.label.clone()
        }
    }
}

/// 一次批次：同一 `group` 在完成前不允许再次启动。
#[derive(Debug, Clone)]
pub struct Batch {
    pub group: String,
    pub units: Vec<UnitOfWork>,
}

impl Batch {
    pub fn new(group: impl Into<String>, units: Vec<UnitOfWork>) -> Self {
        Self {
            group: group.into(),
            units,
        }
    }
}

/// 单元的终态结果，创建后不再修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    pub error: Option<String>,
    /// 落地回执（bundle id 或交易签名）。
    pub receipts: Vec<String>,
}

impl OperationResult {
    pub fn success(receipts: Vec<String>) -> Self {
        Self {
            success: true,
            error: None,
            receipts,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            receipts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Preflight,
    Execute,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Preflight => "preflight",
            FailureStage::Execute => "execute",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub index: usize,
    pub label: String,
    pub stage: FailureStage,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: String,
    pub group: String,
    pub success_count: usize,
    pub fail_count: usize,
    pub failures: Vec<UnitFailure>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn new(batch_id: String, group: String) -> Self {
        Self {
            batch_id,
            group,
            success_count: 0,
            fail_count: 0,
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, failure: UnitFailure) {
        self.fail_count += 1;
        self.failures.push(failure);
    }

    pub fn total(&self) -> usize {
        self.success_count + self.fail_count
    }
}
