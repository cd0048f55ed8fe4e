use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::info;

use super::error::{AdapterError, ValidationError};
use super::validation::{check_amount, check_slippage, non_empty, require_native, sol_to_lamports};
use super::{AdapterContext, ProtocolAdapter};
use crate::engine::{OperationKind, OperationParams, OperationResult, TokenMetadata};
use crate::wallet::{BalanceSnapshot, WalletHandle};

const ROUTE: &str = "/api/deploy";
const MAX_SYMBOL_LEN: usize = 10;
const MAX_NAME_LEN: usize = 32;

#[serde_as]
#[derive(Debug, Serialize)]
struct DeployRequest<'a> {
    #[serde_as(as = "DisplayFromStr")]
    creator: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    mint: Pubkey,
    /// 首个钱包之外参与首笔买入的钱包。
    #[serde_as(as = "Vec<DisplayFromStr>")]
    buyers: Vec<Pubkey>,
    metadata: &'a TokenMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    dev_buy_lamports: Option<u64>,
    slippage_bps: u16,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

/// 创建新代币。每次调用生成新的 mint keypair，只在本次签名中使用。
pub struct DeployAdapter {
    ctx: AdapterContext,
}

impl DeployAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn metadata(params: &OperationParams) -> Result<&TokenMetadata, ValidationError> {
        let metadata = params
            .metadata
            .as_ref()
            .ok_or(ValidationError::MissingMetadata)?;
        let name = metadata.name.trim();
        let symbol = metadata.symbol.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::InvalidMetadata(format!(
                "name 长度需在 1..={MAX_NAME_LEN}"
            )));
        }
        if symbol.is_empty() || symbol.chars().count() > MAX_SYMBOL_LEN {
            return Err(ValidationError::InvalidMetadata(format!(
                "symbol 长度需在 1..={MAX_SYMBOL_LEN}"
            )));
        }
        if metadata.uri.trim().is_empty() {
            return Err(ValidationError::InvalidMetadata("uri 不能为空".to_string()));
        }
        Ok(metadata)
    }

    fn dev_buy(params: &OperationParams) -> Result<Option<u64>, ValidationError> {
        match params.amount {
            None => Ok(None),
            Some(amount) => {
                check_amount(amount)?;
                sol_to_lamports(amount)
                    .map(Some)
                    .ok_or(ValidationError::AmountOutOfRange(amount))
            }
        }
    }
}

#[async_trait]
impl ProtocolAdapter for DeployAdapter {
    fn kind(&self) -> OperationKind {
        OperationKind::Deploy
    }

    fn validate(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
        balances: &BalanceSnapshot,
    ) -> Result<(), ValidationError> {
        non_empty(wallets)?;
        check_slippage(params)?;
        Self::metadata(params)?;
        Self::dev_buy(params)?;
        let amount = params.amount.unwrap_or(0.0);
        for wallet in wallets {
            require_native(wallet, amount, self.ctx.fee_reserve_lamports, balances)?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
    ) -> Result<OperationResult, AdapterError> {
        let Some((creator, buyers)) = wallets.split_first() else {
            return Ok(OperationResult::failure(ValidationError::EmptyWalletSet.to_string()));
        };
        let prepared =
            Self::metadata(params).and_then(|metadata| Ok((metadata, Self::dev_buy(params)?)));
        let (metadata, dev_buy_lamports) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return Ok(OperationResult::failure(err.to_string())),
        };

        let mint = Keypair::new();
        let request = DeployRequest {
            creator: creator.address,
            mint: mint.pubkey(),
            buyers: buyers.iter().map(|wallet| wallet.address).collect(),
            metadata,
            dev_buy_lamports,
            slippage_bps: params.slippage_bps,
            extra: &params.extra,
        };
        let body = serde_json::to_value(&request)?;

        let mint_address = mint.pubkey();
        let mut signers = wallets.to_vec();
        signers.push(WalletHandle::new(mint, true).with_label("mint"));

        let result = self.ctx.pipeline.run(ROUTE, &body, &signers).await;
        if result.success {
            info!(
                target: "protocol::deploy",
                mint = %mint_address,
                creator = %creator.address,
                symbol = %metadata.symbol,
                "代币已部署"
            );
        }
        Ok(result)
    }
}
