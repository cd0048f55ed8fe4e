use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde_json::json;
use solana_account_decoder::{UiAccountData, UiAccountEncoding};
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcTokenAccountsFilter};
use solana_client::rpc_request::RpcRequest;
use solana_client::rpc_response::{Response as RpcResponse, RpcKeyedAccount};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("RPC 请求失败: {0}")]
    Rpc(#[from] ClientError),
    #[error("账户数据解析失败: {0}")]
    Decode(String),
}

/// 余额来源，由外部协作方实现（RPC、缓存或测试桩）。
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// 原生 SOL 余额（lamports）。
    async fn native_balance(&self, owner: &Pubkey) -> Result<u64, BalanceError>;

    /// 指定 mint 的 token 余额（原始单位，所有 token account 之和）。
    async fn token_balance(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<TokenBalance, BalanceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    pub amount: u64,
    /// 没有任何 token account 时无法得知精度。
    pub decimals: Option<u8>,
}

/// 批次开始前刷新的一次性余额快照，过期数据视为可接受。
#[derive(Debug, Clone, Default)]
pub struct BalanceSnapshot {
    native: HashMap<Pubkey, u64>,
    tokens: HashMap<(Pubkey, Pubkey), u64>,
    decimals: HashMap<Pubkey, u8>,
}

impl BalanceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_native(&mut self, owner: Pubkey, lamports: u64) {
        self.native.insert(owner, lamports);
    }

    pub fn set_token(&mut self, owner: Pubkey, mint: Pubkey, amount: u64) {
        self.tokens.insert((owner, mint), amount);
    }

    pub fn set_decimals(&mut self, mint: Pubkey, decimals: u8) {
        self.decimals.insert(mint, decimals);
    }

    pub fn native(&self, owner: &Pubkey) -> Option<u64> {
        self.native.get(owner).copied()
    }

    /// 未刷新过的 (owner, mint) 组合返回 `None`。
    pub fn token(&self, owner: &Pubkey, mint: &Pubkey) -> Option<u64> {
        self.tokens.get(&(*owner, *mint)).copied()
    }

    pub fn decimals(&self, mint: &Pubkey) -> Option<u8> {
        self.decimals.get(mint).copied()
    }

    pub fn native_entries(&self) -> usize {
        self.native.len()
    }

    pub fn token_entries(&self) -> usize {
        self.tokens.len()
    }
}

type OwnerBalances = (
    Pubkey,
    Result<u64, BalanceError>,
    Vec<(Pubkey, Result<TokenBalance, BalanceError>)>,
);

/// 并发拉取余额，单个钱包失败只记录日志并跳过。
pub async fn refresh_snapshot(
    source: Arc<dyn BalanceSource>,
    owners: &[Pubkey],
    mints: &[Pubkey],
    concurrency: usize,
) -> BalanceSnapshot {
    let width = concurrency.max(1);
    let results: Vec<OwnerBalances> = stream::iter(owners.iter().copied())
        .map(|owner| {
            let source = Arc::clone(&source);
            async move {
                let native = source.native_balance(&owner).await;
                let mut tokens = Vec::with_capacity(mints.len());
                for mint in mints {
                    tokens.push((*mint, source.token_balance(&owner, mint).await));
                }
                (owner, native, tokens)
            }
        })
        .buffer_unordered(width)
        .collect()
        .await;

    let mut snapshot = BalanceSnapshot::new();
    for (owner, native, tokens) in results {
        match native {
            Ok(lamports) => snapshot.set_native(owner, lamports),
            Err(err) => warn!(
                target: "wallet::balance",
                wallet = %owner,
                error = %err,
                "native balance refresh failed"
            ),
        }
        for (mint, token) in tokens {
            match token {
                Ok(balance) => {
                    snapshot.set_token(owner, mint, balance.amount);
                    if let Some(decimals) = balance.decimals {
                        snapshot.set_decimals(mint, decimals);
                    }
                }
                Err(err) => warn!(
                    target: "wallet::balance",
                    wallet = %owner,
                    mint = %mint,
                    error = %err,
                    "token balance refresh failed"
                ),
            }
        }
    }

    debug!(
        target: "wallet::balance",
        wallets = owners.len(),
        native = snapshot.native_entries(),
        token = snapshot.token_entries(),
        "余额快照已刷新"
    );
    snapshot
}

pub struct RpcBalanceSource {
    rpc_client: Arc<RpcClient>,
}

impl RpcBalanceSource {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        Self { rpc_client }
    }
}

#[async_trait]
impl BalanceSource for RpcBalanceSource {
    async fn native_balance(&self, owner: &Pubkey) -> Result<u64, BalanceError> {
        Ok(self.rpc_client.get_balance(owner).await?)
    }

    async fn token_balance(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<TokenBalance, BalanceError> {
        let filter = RpcTokenAccountsFilter::Mint(mint.to_string());
        let config = RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::JsonParsed),
            commitment: Some(self.rpc_client.commitment()),
            data_slice: None,
            min_context_slot: None,
        };
        let params = json!([owner.to_string(), filter, config]);
        let response: RpcResponse<Vec<RpcKeyedAccount>> = self
            .rpc_client
            .send(RpcRequest::GetTokenAccountsByOwner, params)
            .await?;

        let mut balance = TokenBalance {
            amount: 0,
            decimals: None,
        };
        for keyed in response.value {
            let (amount, decimals) = parsed_token_amount(&keyed.account.data)?;
            balance.amount = balance.amount.saturating_add(amount);
            balance.decimals = Some(decimals);
        }
        Ok(balance)
    }
}

/// 返回 (原始数量, 精度)。
fn parsed_token_amount(data: &UiAccountData) -> Result<(u64, u8), BalanceError> {
    let UiAccountData::Json(parsed) = data else {
        return Err(BalanceError::Decode("token account 不是 jsonParsed 编码".into()));
    };
    let token_amount = parsed
        .parsed
        .get("info")
        .and_then(|info| info.get("tokenAmount"))
        .ok_or_else(|| BalanceError::Decode("缺少 tokenAmount 字段".into()))?;
    let amount = token_amount
        .get("amount")
        .and_then(|amount| amount.as_str())
        .ok_or_else(|| BalanceError::Decode("缺少 tokenAmount.amount 字段".into()))?
        .parse::<u64>()
        .map_err(|err| BalanceError::Decode(format!("tokenAmount 非法: {err}")))?;
    let decimals = token_amount
        .get("decimals")
        .and_then(|decimals| decimals.as_u64())
        .and_then(|decimals| u8::try_from(decimals).ok())
        .ok_or_else(|| BalanceError::Decode("缺少 tokenAmount.decimals 字段".into()))?;
    Ok((amount, decimals))
}
