use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;

use super::error::{AdapterError, ValidationError};
use super::validation::{
    check_percentage, check_slippage, non_empty, require_mint, require_native, require_percentage,
    require_token,
};
use super::{AdapterContext, ProtocolAdapter};
use crate::engine::fanout::allocate;
use crate::engine::{OperationKind, OperationParams, OperationResult, Protocol};
use crate::wallet::{BalanceSnapshot, WalletHandle};

#[serde_as]
#[derive(Debug, Serialize)]
struct RotateRequest<'a> {
    protocol: &'static str,
    #[serde_as(as = "DisplayFromStr")]
    mint: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    seller: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    buyer: Pubkey,
    /// 本买方分得的卖方持仓百分比。
    sell_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    buy_percentage: Option<f64>,
    slippage_bps: u16,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

/// 卖方释放 `percentage / fan_out` 的持仓，由单个买方接手。钱包顺序为 `[seller, buyer]`。
pub struct RotateAdapter {
    protocol: Protocol,
    ctx: AdapterContext,
}

impl RotateAdapter {
    pub fn new(protocol: Protocol, ctx: AdapterContext) -> Self {
        Self { protocol, ctx }
    }

    fn fan_out(params: &OperationParams) -> Result<usize, ValidationError> {
        match params.fan_out.unwrap_or(1) {
            0 => Err(ValidationError::MissingBuyer),
            n => Ok(n),
        }
    }

    fn pair(wallets: &[WalletHandle]) -> Result<(&WalletHandle, &WalletHandle), ValidationError> {
        match wallets {
            [] => Err(ValidationError::EmptyWalletSet),
            [_] => Err(ValidationError::MissingBuyer),
            [seller, buyer] => Ok((seller, buyer)),
            _ => Err(ValidationError::WalletCount {
                expected: 2,
                actual: wallets.len(),
            }),
        }
    }
}

#[async_trait]
impl ProtocolAdapter for RotateAdapter {
    fn kind(&self) -> OperationKind {
        OperationKind::Rotate(self.protocol)
    }

    fn validate(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
        balances: &BalanceSnapshot,
    ) -> Result<(), ValidationError> {
        non_empty(wallets)?;
        Self::fan_out(params)?;
        let (seller, buyer) = Self::pair(wallets)?;
        check_slippage(params)?;
        let mint = require_mint(params)?;
        require_percentage(params)?;
        if let Some(pct) = params.buy_percentage {
            check_percentage(pct)?;
        }
        require_token(seller, &mint, balances)?;
        require_native(buyer, 0.0, self.ctx.fee_reserve_lamports, balances)?;
        Ok(())
    }

    async fn execute(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
    ) -> Result<OperationResult, AdapterError> {
        let prepared = Self::pair(wallets).and_then(|(seller, buyer)| {
            let fan_out = Self::fan_out(params)?;
            let mint = require_mint(params)?;
            let pct = require_percentage(params)?;
            Ok(RotateRequest {
                protocol: self.protocol.as_str(),
                mint,
                seller: seller.address,
                buyer: buyer.address,
                sell_percentage: allocate(pct, fan_out),
                buy_percentage: params.buy_percentage,
                slippage_bps: params.slippage_bps,
                extra: &params.extra,
            })
        });
        let request = match prepared {
            Ok(request) => request,
            Err(err) => return Ok(OperationResult::failure(err.to_string())),
        };

        let body = serde_json::to_value(&request)?;
        let route = format!("/api/{}/rotate", self.protocol);
        Ok(self.ctx.pipeline.run(&route, &body, wallets).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use solana_sdk::signature::Keypair;

    use super::*;
    use crate::protocol::testing::{RecordingSource, context};

    fn setup() -> (RotateAdapter, Arc<RecordingSource>) {
        let source = Arc::new(RecordingSource::default());
        let (ctx, _) = context(Arc::clone(&source));
        (RotateAdapter::new(Protocol::Moonshot, ctx), source)
    }

    #[test]
    fn seller_without_buyer_fails_validation() {
        let (adapter, _) = setup();
        let seller = WalletHandle::new(Keypair::new(), true);
        let params = OperationParams {
            mint: Some(Pubkey::new_unique()),
            percentage: Some(10.0),
            fan_out: Some(0),
            ..OperationParams::default()
        };
        assert_eq!(
            adapter.validate(&[seller], &params, &BalanceSnapshot::new()),
            Err(ValidationError::MissingBuyer)
        );
    }

    #[test]
    fn pair_with_balances_passes() {
        let (adapter, _) = setup();
        let seller = WalletHandle::new(Keypair::new(), true);
        let buyer = WalletHandle::new(Keypair::new(), true);
        let mint = Pubkey::new_unique();
        let mut balances = BalanceSnapshot::new();
        balances.set_token(seller.address, mint, 1_000);
        balances.set_native(buyer.address, 10_000);

        let params = OperationParams {
            mint: Some(mint),
            percentage: Some(60.0),
            buy_percentage: Some(80.0),
            fan_out: Some(3),
            ..OperationParams::default()
        };
        assert!(adapter.validate(&[seller, buyer], &params, &balances).is_ok());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn execute_sends_equal_share_and_forwards_buy_percentage() {
        let (adapter, source) = setup();
        let seller = WalletHandle::new(Keypair::new(), true);
        let buyer = WalletHandle::new(Keypair::new(), true);
        let params = OperationParams {
            mint: Some(Pubkey::new_unique()),
            percentage: Some(60.0),
            buy_percentage: Some(80.0),
            fan_out: Some(3),
            ..OperationParams::default()
        };

        adapter
            .execute(&[seller.clone(), buyer.clone()], &params)
            .await
            .expect("execute");

        let requests = source.requests.lock();
        let (route, body) = &requests[0];
        assert_eq!(route, "/api/moonshot/rotate");
        assert_eq!(body["seller"], seller.address.to_string());
        assert_eq!(body["buyer"], buyer.address.to_string());
        assert!((body["sell_percentage"].as_f64().unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(body["buy_percentage"], 80.0);
    }
}
