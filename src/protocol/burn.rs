use async_trait::async_trait;
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;

use super::error::{AdapterError, ValidationError};
use super::validation::{
    check_amount, check_percentage, non_empty, require_mint, require_token, require_token_amount,
};
use super::{AdapterContext, ProtocolAdapter};
use crate::engine::{OperationKind, OperationParams, OperationResult};
use crate::wallet::{BalanceSnapshot, WalletHandle};

const ROUTE: &str = "/api/burn";

#[serde_as]
#[derive(Debug, Serialize)]
struct BurnRequest {
    #[serde_as(as = "DisplayFromStr")]
    mint: Pubkey,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    wallets: Vec<Pubkey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentage: Option<f64>,
}

pub struct BurnAdapter {
    ctx: AdapterContext,
}

impl BurnAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    /// 数量与百分比二选一，都给出时以数量为准。
    fn request(
        wallets: &[WalletHandle],
        params: &OperationParams,
    ) -> Result<BurnRequest, ValidationError> {
        let mint = require_mint(params)?;
        let (amount, percentage) = match (params.amount, params.percentage) {
            (Some(amount), _) => {
                check_amount(amount)?;
                (Some(amount), None)
            }
            (None, Some(pct)) => {
                check_percentage(pct)?;
                (None, Some(pct))
            }
            (None, None) => return Err(ValidationError::MissingAmount),
        };
        Ok(BurnRequest {
            mint,
            wallets: wallets.iter().map(|wallet| wallet.address).collect(),
            amount,
            percentage,
        })
    }
}

#[async_trait]
impl ProtocolAdapter for BurnAdapter {
    fn kind(&self) -> OperationKind {
        OperationKind::Burn
    }

    fn validate(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
        balances: &BalanceSnapshot,
    ) -> Result<(), ValidationError> {
        non_empty(wallets)?;
        let request = Self::request(wallets, params)?;
        for wallet in wallets {
            match request.amount {
                Some(amount) => require_token_amount(
                    wallet,
                    &request.mint,
                    amount,
                    params.token_decimals,
                    balances,
                )?,
                None => require_token(wallet, &request.mint, balances)?,
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
    ) -> Result<OperationResult, AdapterError> {
        let request = match Self::request(wallets, params) {
            Ok(request) => request,
            Err(err) => return Ok(OperationResult::failure(err.to_string())),
        };
        let body = serde_json::to_value(&request)?;
        Ok(self.ctx.pipeline.run(ROUTE, &body, wallets).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use solana_sdk::signature::Keypair;

    use super::*;
    use crate::protocol::testing::{RecordingSource, context};

    #[test]
    fn needs_amount_or_percentage_and_tokens() {
        let (ctx, _) = context(Arc::new(RecordingSource::default()));
        let adapter = BurnAdapter::new(ctx);
        let wallet = WalletHandle::new(Keypair::new(), true);
        let mint = Pubkey::new_unique();
        let mut balances = BalanceSnapshot::new();
        balances.set_token(wallet.address, mint, 5);
        let wallets = vec![wallet];

        let mut params = OperationParams {
            mint: Some(mint),
            ..OperationParams::default()
        };
        assert_eq!(
            adapter.validate(&wallets, &params, &balances),
            Err(ValidationError::MissingAmount)
        );
        params.percentage = Some(100.0);
        assert!(adapter.validate(&wallets, &params, &balances).is_ok());

        let empty = BalanceSnapshot::new();
        assert!(matches!(
            adapter.validate(&wallets, &params, &empty),
            Err(ValidationError::BalanceUnknown(_))
        ));
    }

    #[test]
    fn burn_amount_cannot_exceed_token_balance() {
        let (ctx, _) = context(Arc::new(RecordingSource::default()));
        let adapter = BurnAdapter::new(ctx);
        let wallet = WalletHandle::new(Keypair::new(), true);
        let mint = Pubkey::new_unique();
        let mut balances = BalanceSnapshot::new();
        balances.set_token(wallet.address, mint, 1);
        balances.set_decimals(mint, 0);
        let wallets = vec![wallet.clone()];

        let mut params = OperationParams {
            mint: Some(mint),
            amount: Some(1_000_000.0),
            ..OperationParams::default()
        };
        assert_eq!(
            adapter.validate(&wallets, &params, &balances),
            Err(ValidationError::InsufficientTokenBalance {
                wallet: wallet.address,
                mint,
                required: 1_000_000,
                available: 1,
            })
        );

        params.amount = Some(1.0);
        assert!(adapter.validate(&wallets, &params, &balances).is_ok());

        // 百分比模式只要求持有
        params.amount = None;
        params.percentage = Some(50.0);
        assert!(adapter.validate(&wallets, &params, &balances).is_ok());
    }
}
