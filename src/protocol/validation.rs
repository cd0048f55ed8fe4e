//! 各适配器共用的参数与余额检查。

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use solana_sdk::pubkey::Pubkey;

use super::error::ValidationError;
use crate::engine::OperationParams;
use crate::wallet::{BalanceSnapshot, WalletHandle};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
pub const MAX_SLIPPAGE_BPS: u16 = 10_000;

/// SOL 数量换算为 lamports，向下取整。非法或溢出时返回 `None`。
pub fn sol_to_lamports(sol: f64) -> Option<u64> {
    let sol = Decimal::from_f64(sol)?;
    if sol.is_sign_negative() {
        return None;
    }
    (sol * Decimal::from(LAMPORTS_PER_SOL)).floor().to_u64()
}

/// UI 数量按精度换算为原始单位，向下取整。
pub fn ui_to_raw(amount: f64, decimals: u8) -> Option<u64> {
    let amount = Decimal::from_f64(amount)?;
    if amount.is_sign_negative() {
        return None;
    }
    let scale = 10u64.checked_pow(u32::from(decimals))?;
    amount.checked_mul(Decimal::from(scale))?.floor().to_u64()
}

pub fn non_empty(wallets: &[WalletHandle]) -> Result<(), ValidationError> {
    if wallets.is_empty() {
        Err(ValidationError::EmptyWalletSet)
    } else {
        Ok(())
    }
}

pub fn require_mint(params: &OperationParams) -> Result<Pubkey, ValidationError> {
    params.mint.ok_or(ValidationError::MissingMint)
}

pub fn require_amount(params: &OperationParams) -> Result<f64, ValidationError> {
    let amount = params.amount.ok_or(ValidationError::MissingAmount)?;
    check_amount(amount)?;
    Ok(amount)
}

pub fn check_amount(amount: f64) -> Result<(), ValidationError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::AmountOutOfRange(amount))
    }
}

pub fn require_percentage(params: &OperationParams) -> Result<f64, ValidationError> {
    let pct = params.percentage.ok_or(ValidationError::MissingPercentage)?;
    check_percentage(pct)?;
    Ok(pct)
}

pub fn check_percentage(pct: f64) -> Result<(), ValidationError> {
    if pct.is_finite() && pct > 0.0 && pct <= 100.0 {
        Ok(())
    } else {
        Err(ValidationError::PercentageOutOfRange(pct))
    }
}

pub fn check_slippage(params: &OperationParams) -> Result<(), ValidationError> {
    if params.slippage_bps > MAX_SLIPPAGE_BPS {
        Err(ValidationError::SlippageOutOfRange(params.slippage_bps))
    } else {
        Ok(())
    }
}

/// 每个钱包的 SOL 余额需覆盖 `amount` 加手续费预留。
pub fn require_native(
    wallet: &WalletHandle,
    amount_sol: f64,
    fee_reserve_lamports: u64,
    balances: &BalanceSnapshot,
) -> Result<(), ValidationError> {
    let spend =
        sol_to_lamports(amount_sol).ok_or(ValidationError::AmountOutOfRange(amount_sol))?;
    let required = spend.saturating_add(fee_reserve_lamports);
    let available = balances
        .native(&wallet.address)
        .ok_or(ValidationError::BalanceUnknown(wallet.address))?;
    if available < required {
        return Err(ValidationError::InsufficientBalance {
            wallet: wallet.address,
            required,
            available,
        });
    }
    Ok(())
}

pub fn require_token(
    wallet: &WalletHandle,
    mint: &Pubkey,
    balances: &BalanceSnapshot,
) -> Result<(), ValidationError> {
    match balances.token(&wallet.address, mint) {
        None => Err(ValidationError::BalanceUnknown(wallet.address)),
        Some(0) => Err(ValidationError::NoTokenBalance {
            wallet: wallet.address,
            mint: *mint,
        }),
        Some(_) => Ok(()),
    }
}

/// token 余额需覆盖 `ui_amount` 换算后的原始数量。
/// 精度优先取 `decimals`，否则取快照中记录的 mint 精度。
pub fn require_token_amount(
    wallet: &WalletHandle,
    mint: &Pubkey,
    ui_amount: f64,
    decimals: Option<u8>,
    balances: &BalanceSnapshot,
) -> Result<(), ValidationError> {
    require_token(wallet, mint, balances)?;
    let decimals = decimals
        .or_else(|| balances.decimals(mint))
        .ok_or(ValidationError::DecimalsUnknown(*mint))?;
    let required =
        ui_to_raw(ui_amount, decimals).ok_or(ValidationError::AmountOutOfRange(ui_amount))?;
    let available = balances.token(&wallet.address, mint).unwrap_or_default();
    if available < required {
        return Err(ValidationError::InsufficientTokenBalance {
            wallet: wallet.address,
            mint: *mint,
            required,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use solana_sdk::signature::Keypair;

    use super::*;

    #[test]
    fn sol_conversion_floors_and_rejects_negatives() {
        assert_eq!(sol_to_lamports(0.25), Some(250_000_000));
        assert_eq!(sol_to_lamports(1.0), Some(LAMPORTS_PER_SOL));
        assert_eq!(sol_to_lamports(0.000_000_000_9), Some(0));
        assert_eq!(sol_to_lamports(-1.0), None);
        assert_eq!(sol_to_lamports(f64::NAN), None);
    }

    #[test]
    fn numeric_bounds() {
        assert!(check_percentage(100.0).is_ok());
        assert!(check_percentage(0.0).is_err());
        assert!(check_percentage(100.01).is_err());
        assert!(check_amount(0.0).is_err());
        assert!(check_amount(f64::INFINITY).is_err());

        let params = OperationParams {
            slippage_bps: 10_001,
            ..OperationParams::default()
        };
        assert_eq!(
            check_slippage(&params),
            Err(ValidationError::SlippageOutOfRange(10_001))
        );
    }

    #[test]
    fn native_check_includes_fee_reserve() {
        let wallet = WalletHandle::new(Keypair::new(), true);
        let mut balances = BalanceSnapshot::new();
        assert_eq!(
            require_native(&wallet, 0.1, 5_000, &balances),
            Err(ValidationError::BalanceUnknown(wallet.address))
        );

        balances.set_native(wallet.address, 100_000_000);
        assert!(matches!(
            require_native(&wallet, 0.1, 5_000, &balances),
            Err(ValidationError::InsufficientBalance {
                required: 100_005_000,
                available: 100_000_000,
                ..
            })
        ));
        balances.set_native(wallet.address, 100_005_000);
        assert!(require_native(&wallet, 0.1, 5_000, &balances).is_ok());
    }

    #[test]
    fn token_check_requires_positive_balance() {
        let wallet = WalletHandle::new(Keypair::new(), true);
        let mint = Pubkey::new_unique();
        let mut balances = BalanceSnapshot::new();
        balances.set_token(wallet.address, mint, 0);
        assert!(matches!(
            require_token(&wallet, &mint, &balances),
            Err(ValidationError::NoTokenBalance { .. })
        ));
        balances.set_token(wallet.address, mint, 1);
        assert!(require_token(&wallet, &mint, &balances).is_ok());
    }

    #[test]
    fn ui_amount_scales_by_decimals() {
        assert_eq!(ui_to_raw(1.5, 6), Some(1_500_000));
        assert_eq!(ui_to_raw(12.0, 0), Some(12));
        assert_eq!(ui_to_raw(0.000_000_1, 6), Some(0));
        assert_eq!(ui_to_raw(-1.0, 6), None);
        assert_eq!(ui_to_raw(1.0, 20), None);
    }

    #[test]
    fn token_amount_must_fit_in_balance() {
        let wallet = WalletHandle::new(Keypair::new(), true);
        let mint = Pubkey::new_unique();
        let mut balances = BalanceSnapshot::new();
        balances.set_token(wallet.address, mint, 2_000_000);
        assert_eq!(
            require_token_amount(&wallet, &mint, 1.0, None, &balances),
            Err(ValidationError::DecimalsUnknown(mint))
        );

        balances.set_decimals(mint, 6);
        assert!(require_token_amount(&wallet, &mint, 2.0, None, &balances).is_ok());
        assert_eq!(
            require_token_amount(&wallet, &mint, 2.5, None, &balances),
            Err(ValidationError::InsufficientTokenBalance {
                wallet: wallet.address,
                mint,
                required: 2_500_000,
                available: 2_000_000,
            })
        );
        // 显式精度覆盖快照
        assert!(require_token_amount(&wallet, &mint, 2.5, Some(0), &balances).is_ok());
    }
}
