use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;

use super::error::{AdapterError, ValidationError};
use super::validation::{
    check_slippage, non_empty, require_amount, require_mint, require_native, require_percentage,
    require_token, sol_to_lamports,
};
use super::{AdapterContext, ProtocolAdapter};
use crate::engine::{Direction, OperationKind, OperationParams, OperationResult, Protocol};
use crate::wallet::{BalanceSnapshot, WalletHandle};

/// builder 上各协议的路由。Jupiter 聚合器买卖共用一个入口。
pub(crate) fn swap_route(protocol: Protocol, direction: Direction) -> String {
    match protocol {
        Protocol::Jupiter => "/api/jupiter/swap".to_string(),
        _ => format!("/api/{}/{}", protocol, direction.as_str()),
    }
}

#[serde_as]
#[derive(Debug, Serialize)]
struct SwapRequest<'a> {
    protocol: &'static str,
    side: &'static str,
    #[serde_as(as = "DisplayFromStr")]
    mint: Pubkey,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    wallets: Vec<Pubkey>,
    /// 买入时每个钱包花费的 lamports。
    #[serde(skip_serializing_if = "Option::is_none")]
    amount_lamports: Option<u64>,
    /// 卖出时每个钱包释放的持仓百分比。
    #[serde(skip_serializing_if = "Option::is_none")]
    percentage: Option<f64>,
    slippage_bps: u16,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

/// 单协议的买入或卖出。同一单元内所有钱包使用相同参数。
pub struct SwapAdapter {
    protocol: Protocol,
    direction: Direction,
    ctx: AdapterContext,
}

impl SwapAdapter {
    pub fn new(protocol: Protocol, direction: Direction, ctx: AdapterContext) -> Self {
        Self {
            protocol,
            direction,
            ctx,
        }
    }

    fn request<'a>(
        &self,
        wallets: &[WalletHandle],
        params: &'a OperationParams,
    ) -> Result<SwapRequest<'a>, ValidationError> {
        let mint = require_mint(params)?;
        let (amount_lamports, percentage) = match self.direction {
            Direction::Buy => {
                let amount = require_amount(params)?;
                let lamports =
                    sol_to_lamports(amount).ok_or(ValidationError::AmountOutOfRange(amount))?;
                (Some(lamports), None)
            }
            Direction::Sell => (None, Some(require_percentage(params)?)),
        };
        Ok(SwapRequest {
            protocol: self.protocol.as_str(),
            side: self.direction.as_str(),
            mint,
            wallets: wallets.iter().map(|wallet| wallet.address).collect(),
            amount_lamports,
            percentage,
            slippage_bps: params.slippage_bps,
            extra: &params.extra,
        })
    }
}

#[async_trait]
impl ProtocolAdapter for SwapAdapter {
    fn kind(&self) -> OperationKind {
        OperationKind::Swap(self.protocol, self.direction)
    }

    fn validate(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
        balances: &BalanceSnapshot,
    ) -> Result<(), ValidationError> {
        non_empty(wallets)?;
        check_slippage(params)?;
        let mint = require_mint(params)?;
        match self.direction {
            Direction::Buy => {
                let amount = require_amount(params)?;
                for wallet in wallets {
                    require_native(wallet, amount, self.ctx.fee_reserve_lamports, balances)?;
                }
            }
            Direction::Sell => {
                require_percentage(params)?;
                for wallet in wallets {
                    require_token(wallet, &mint, balances)?;
                }
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
    ) -> Result<OperationResult, AdapterError> {
        let request = match self.request(wallets, params) {
            Ok(request) => request,
            Err(err) => return Ok(OperationResult::failure(err.to_string())),
        };
        let body = serde_json::to_value(&request)?;
        let route = swap_route(self.protocol, self.direction);
        Ok(self.ctx.pipeline.run(&route, &body, wallets).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use solana_sdk::signature::Keypair;

    use super::*;
    use crate::protocol::testing::{RecordingSource, context};

    fn adapter(direction: Direction) -> (SwapAdapter, Arc<RecordingSource>) {
        let source = Arc::new(RecordingSource::default());
        let (ctx, _) = context(Arc::clone(&source));
        (SwapAdapter::new(Protocol::Raydium, direction, ctx), source)
    }

    #[test]
    fn routes_per_protocol() {
        assert_eq!(swap_route(Protocol::PumpFun, Direction::Buy), "/api/pumpfun/buy");
        assert_eq!(swap_route(Protocol::Boop, Direction::Sell), "/api/boop/sell");
        assert_eq!(swap_route(Protocol::Jupiter, Direction::Sell), "/api/jupiter/swap");
    }

    #[test]
    fn buy_requires_mint_amount_and_funds() {
        let (adapter, _) = adapter(Direction::Buy);
        let wallet = WalletHandle::new(Keypair::new(), true);
        let mut balances = BalanceSnapshot::new();
        balances.set_native(wallet.address, 2_000_000_000);
        let wallets = vec![wallet];

        let mut params = OperationParams::default();
        assert_eq!(
            adapter.validate(&wallets, &params, &balances),
            Err(ValidationError::MissingMint)
        );
        params.mint = Some(Pubkey::new_unique());
        assert_eq!(
            adapter.validate(&wallets, &params, &balances),
            Err(ValidationError::MissingAmount)
        );
        params.amount = Some(1.5);
        assert!(adapter.validate(&wallets, &params, &balances).is_ok());
        params.amount = Some(2.0);
        assert!(matches!(
            adapter.validate(&wallets, &params, &balances),
            Err(ValidationError::InsufficientBalance { .. })
        ));
        assert_eq!(
            adapter.validate(&[], &params, &balances),
            Err(ValidationError::EmptyWalletSet)
        );
    }

    #[test]
    fn sell_requires_percentage_and_tokens() {
        let (adapter, _) = adapter(Direction::Sell);
        let wallet = WalletHandle::new(Keypair::new(), true);
        let mint = Pubkey::new_unique();
        let mut balances = BalanceSnapshot::new();
        balances.set_token(wallet.address, mint, 10);
        let params = OperationParams {
            mint: Some(mint),
            percentage: Some(150.0),
            ..OperationParams::default()
        };
        assert_eq!(
            adapter.validate(std::slice::from_ref(&wallet), &params, &balances),
            Err(ValidationError::PercentageOutOfRange(150.0))
        );
        let params = OperationParams {
            percentage: Some(50.0),
            ..params
        };
        assert!(adapter.validate(&[wallet], &params, &balances).is_ok());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn execute_posts_request_and_reports_builder_failure() {
        let (adapter, source) = adapter(Direction::Buy);
        let wallet = WalletHandle::new(Keypair::new(), true);
        let mint = Pubkey::new_unique();
        let mut params = OperationParams {
            mint: Some(mint),
            amount: Some(0.5),
            ..OperationParams::default()
        };
        params.extra.insert("pool_id".into(), Value::from("pool-1"));

        let result = adapter
            .execute(std::slice::from_ref(&wallet), &params)
            .await
            .expect("execute");
        assert!(!result.success);

        let requests = source.requests.lock();
        assert_eq!(requests.len(), 1);
        let (route, body) = &requests[0];
        assert_eq!(route, "/api/raydium/buy");
        assert_eq!(body["mint"], mint.to_string());
        assert_eq!(body["wallets"][0], wallet.address.to_string());
        assert_eq!(body["amount_lamports"], 500_000_000u64);
        assert_eq!(body["pool_id"], "pool-1");
        assert!(body.get("percentage").is_none());
    }
}
