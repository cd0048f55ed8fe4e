use async_trait::async_trait;
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;

use super::error::{AdapterError, ValidationError};
use super::validation::{
    non_empty, require_amount, require_native, require_token_amount, sol_to_lamports,
};
use super::{AdapterContext, ProtocolAdapter};
use crate::engine::{OperationKind, OperationParams, OperationResult};
use crate::wallet::{BalanceSnapshot, WalletHandle};

const ROUTE: &str = "/api/transfer";

#[serde_as]
#[derive(Debug, Serialize)]
struct TransferRequest {
    #[serde_as(as = "Vec<DisplayFromStr>")]
    senders: Vec<Pubkey>,
    #[serde_as(as = "DisplayFromStr")]
    recipient: Pubkey,
    /// 为空表示转 SOL。
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    mint: Option<Pubkey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount_lamports: Option<u64>,
    /// token 转账的 UI 数量。
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<f64>,
}

/// 每个发送方向同一接收地址转出相同数量的 SOL 或 token。
pub struct TransferAdapter {
    ctx: AdapterContext,
}

impl TransferAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn recipient(
        wallets: &[WalletHandle],
        params: &OperationParams,
    ) -> Result<Pubkey, ValidationError> {
        let recipient = params.recipient.ok_or(ValidationError::MissingRecipient)?;
        if wallets.iter().any(|wallet| wallet.address == recipient) {
            return Err(ValidationError::SelfTransfer(recipient));
        }
        Ok(recipient)
    }

    fn request(
        wallets: &[WalletHandle],
        params: &OperationParams,
    ) -> Result<TransferRequest, ValidationError> {
        let recipient = Self::recipient(wallets, params)?;
        let amount = require_amount(params)?;
        let (amount_lamports, amount) = match params.mint {
            Some(_) => (None, Some(amount)),
            None => (
                Some(sol_to_lamports(amount).ok_or(ValidationError::AmountOutOfRange(amount))?),
                None,
            ),
        };
        Ok(TransferRequest {
            senders: wallets.iter().map(|wallet| wallet.address).collect(),
            recipient,
            mint: params.mint,
            amount_lamports,
            amount,
        })
    }
}

#[async_trait]
impl ProtocolAdapter for TransferAdapter {
    fn kind(&self) -> OperationKind {
        OperationKind::Transfer
    }

    fn validate(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
        balances: &BalanceSnapshot,
    ) -> Result<(), ValidationError> {
        non_empty(wallets)?;
        Self::recipient(wallets, params)?;
        let amount = require_amount(params)?;
        for wallet in wallets {
            match params.mint {
                Some(mint) => {
                    require_token_amount(wallet, &mint, amount, params.token_decimals, balances)?;
                    require_native(wallet, 0.0, self.ctx.fee_reserve_lamports, balances)?;
                }
                None => require_native(wallet, amount, self.ctx.fee_reserve_lamports, balances)?,
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
    fn recipient_is_required_and_must_differ_from_senders() {
        let (ctx, _) = context(Arc::new(RecordingSource::default()));
        let adapter = TransferAdapter::new(ctx);
        let sender = WalletHandle::new(Keypair::new(), true);
        let mut balances = BalanceSnapshot::new();
        balances.set_native(sender.address, 1_000_000_000);

        let mut params = OperationParams {
            amount: Some(0.1),
            ..OperationParams::default()
        };
        let wallets = vec![sender.clone()];
        assert_eq!(
            adapter.validate(&wallets, &params, &balances),
            Err(ValidationError::MissingRecipient)
        );
        params.recipient = Some(sender.address);
        assert_eq!(
            adapter.validate(&wallets, &params, &balances),
            Err(ValidationError::SelfTransfer(sender.address))
        );
        params.recipient = Some(Pubkey::new_unique());
        assert!(adapter.validate(&wallets, &params, &balances).is_ok());
    }

    #[test]
    fn token_transfer_keeps_ui_amount() {
        let sender = WalletHandle::new(Keypair::new(), true);
        let mint = Pubkey::new_unique();
        let params = OperationParams {
            amount: Some(12.5),
            mint: Some(mint),
            recipient: Some(Pubkey::new_unique()),
            ..OperationParams::default()
        };
        let request = TransferAdapter::request(&[sender], &params).expect("request");
        assert_eq!(request.amount, Some(12.5));
        assert_eq!(request.amount_lamports, None);
        assert_eq!(request.mint, Some(mint));
    }

    #[test]
    fn token_transfer_is_bounded_by_holdings() {
        let (ctx, _) = context(Arc::new(RecordingSource::default()));
        let adapter = TransferAdapter::new(ctx);
        let sender = WalletHandle::new(Keypair::new(), true);
        let mint = Pubkey::new_unique();
        let mut balances = BalanceSnapshot::new();
        balances.set_native(sender.address, 1_000_000_000);
        balances.set_token(sender.address, mint, 3_000_000);
        let wallets = vec![sender.clone()];

        let mut params = OperationParams {
            amount: Some(5.0),
            mint: Some(mint),
            recipient: Some(Pubkey::new_unique()),
            ..OperationParams::default()
        };
        assert_eq!(
            adapter.validate(&wallets, &params, &balances),
            Err(ValidationError::DecimalsUnknown(mint))
        );

        balances.set_decimals(mint, 6);
        assert_eq!(
            adapter.validate(&wallets, &params, &balances),
            Err(ValidationError::InsufficientTokenBalance {
                wallet: sender.address,
                mint,
                required: 5_000_000,
                available: 3_000_000,
            })
        );

        params.amount = Some(3.0);
        assert!(adapter.validate(&wallets, &params, &balances).is_ok());
    }
}
