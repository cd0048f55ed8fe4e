//! 卖方按比例释放持仓，平均分给多个买方。

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;

use super::kind::{OperationKind, Protocol};
use super::types::{OperationParams, UnitOfWork};

/// 每个买方分得的卖方百分比。`buy_percentage` 不参与该计算。
pub fn allocate(sell_percentage: f64, buyer_count: usize) -> f64 {
    sell_percentage / buyer_count as f64
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyerConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub wallet: Pubkey,
    pub buy_percentage: f64,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub wallet: Pubkey,
    pub sell_percentage: f64,
    #[serde(default)]
    pub buyers: Vec<BuyerConfig>,
}

/// 展开为一卖一买的轮换单元，顺序与配置一致。
///
/// 没有买方的卖方仍生成一个只含卖方的单元，由预检阶段判定失败。
pub fn expand_rotations(
    protocol: Protocol,
    base: &OperationParams,
    sellers: &[SellerConfig],
) -> Vec<UnitOfWork> {
    let kind = OperationKind::Rotate(protocol);
    let mut units = Vec::new();

    for seller in sellers {
        if seller.buyers.is_empty() {
            let mut params = base.clone();
            params.percentage = Some(seller.sell_percentage);
            params.fan_out = Some(0);
            units.push(
                UnitOfWork::new(kind, vec![seller.wallet], params)
                    .with_label(format!("{kind} {} -> <none>", seller.wallet)),
            );
            continue;
        }

        let fan_out = seller.buyers.len();
        for buyer in &seller.buyers {
            let mut params = base.clone();
            params.percentage = Some(seller.sell_percentage);
            params.buy_percentage = Some(buyer.buy_percentage);
            params.fan_out = Some(fan_out);
            units.push(
                UnitOfWork::new(kind, vec![seller.wallet, buyer.wallet], params)
                    .with_label(format!("{kind} {} -> {}", seller.wallet, buyer.wallet)),
            );
        }
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_percent_over_three_buyers() {
        assert!((allocate(60.0, 3) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn shares_sum_back_to_sell_percentage() {
        for buyers in 1..=25usize {
            for step in 1..=100 {
                let pct = step as f64 * 0.999 + 0.001;
                let pct = pct.min(100.0);
                let share = allocate(pct, buyers);
                assert!((share * buyers as f64 - pct).abs() < 1e-9);
                assert_eq!(share.to_bits(), allocate(pct, buyers).to_bits());
            }
        }
    }

    #[test]
    fn expands_one_unit_per_pair_in_order() {
        let seller = Pubkey::new_unique();
        let buyers: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        let lonely = Pubkey::new_unique();
        let sellers = vec![
            SellerConfig {
                wallet: seller,
                sell_percentage: 60.0,
                buyers: buyers
                    .iter()
                    .map(|wallet| BuyerConfig {
                        wallet: *wallet,
                        buy_percentage: 75.0,
                    })
                    .collect(),
            },
            SellerConfig {
                wallet: lonely,
                sell_percentage: 10.0,
                buyers: Vec::new(),
            },
        ];

        let units = expand_rotations(Protocol::PumpFun, &OperationParams::default(), &sellers);
        assert_eq!(units.len(), 4);
        for (unit, buyer) in units.iter().zip(&buyers) {
            assert_eq!(unit.kind, OperationKind::Rotate(Protocol::PumpFun));
            assert_eq!(unit.wallets, vec![seller, *buyer]);
            assert_eq!(unit.params.percentage, Some(60.0));
            assert_eq!(unit.params.buy_percentage, Some(75.0));
            assert_eq!(unit.params.fan_out, Some(3));
        }
        assert_eq!(units[3].wallets, vec![lonely]);
        assert_eq!(units[3].params.fan_out, Some(0));
    }
}
