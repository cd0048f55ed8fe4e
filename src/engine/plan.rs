use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;

use super::fanout::{SellerConfig, expand_rotations};
use super::kind::Protocol;
use super::types::{Batch, OperationParams, UnitOfWork};
use crate::config::ConfigError;

/// 批次计划文件（YAML）。`units` 原样执行，`rotations` 展开为一卖一买的单元并追加在后。
#[derive(Debug, Clone, Deserialize)]
pub struct BatchPlan {
    pub group: String,
    #[serde(default)]
    pub units: Vec<UnitOfWork>,
    #[serde(default)]
    pub rotations: Vec<RotationPlan>,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct RotationPlan {
    #[serde_as(as = "DisplayFromStr")]
    pub protocol: Protocol,
    #[serde_as(as = "DisplayFromStr")]
    pub mint: Pubkey,
    #[serde(default)]
    pub slippage_bps: Option<u16>,
    pub sellers: Vec<SellerConfig>,
}

impl BatchPlan {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let plan: BatchPlan = serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        if plan.group.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{}: group 不能为空",
                path.display()
            )));
        }
        Ok(plan)
    }

    pub fn into_batch(self) -> Batch {
        let mut units = self.units;
        for rotation in &self.rotations {
            let mut base = OperationParams {
                mint: Some(rotation.mint),
                ..OperationParams::default()
            };
            if let Some(slippage) = rotation.slippage_bps {
                base.slippage_bps = slippage;
            }
            units.extend(expand_rotations(rotation.protocol, &base, &rotation.sellers));
        }
        Batch::new(self.group, units)
    }

    /// 计划涉及的全部 mint，用于刷新余额快照。
    pub fn mints(&self) -> Vec<Pubkey> {
        let mints: BTreeSet<Pubkey> = self
            .units
            .iter()
            .filter_map(|unit| unit.params.mint)
            .chain(self.rotations.iter().map(|rotation| rotation.mint))
            .collect();
        mints.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::engine::kind::OperationKind;

    #[test]
    fn units_then_expanded_rotations() {
        let seller = Pubkey::new_unique();
        let buyers = [Pubkey::new_unique(), Pubkey::new_unique()];
        let mint = Pubkey::new_unique();
        let other_mint = Pubkey::new_unique();
        let yaml = format!(
            r#"
group: launch
units:
  - kind: sell@raydium
    wallets: ["{seller}"]
    params:
      mint: "{other_mint}"
      percentage: 25
rotations:
  - protocol: pumpfun
    mint: "{mint}"
    slippage_bps: 300
    sellers:
      - wallet: "{seller}"
        sell_percentage: 50
        buyers:
          - {{ wallet: "{b0}", buy_percentage: 100 }}
          - {{ wallet: "{b1}", buy_percentage: 40 }}
"#,
            b0 = buyers[0],
            b1 = buyers[1],
        );

        let plan = BatchPlan::parse(&PathBuf::from("plan.yaml"), &yaml).expect("plan");
        let mut expected_mints = vec![mint, other_mint];
        expected_mints.sort();
        assert_eq!(plan.mints(), expected_mints);

        let batch = plan.into_batch();
        assert_eq!(batch.group, "launch");
        assert_eq!(batch.units.len(), 3);
        assert_eq!(batch.units[0].kind, OperationKind::sell(Protocol::Raydium));
        let rotation = &batch.units[2];
        assert_eq!(rotation.kind, OperationKind::Rotate(Protocol::PumpFun));
        assert_eq!(rotation.wallets, vec![seller, buyers[1]]);
        assert_eq!(rotation.params.slippage_bps, 300);
        assert_eq!(rotation.params.fan_out, Some(2));
        assert_eq!(rotation.params.buy_percentage, Some(40.0));
    }

    #[test]
    fn empty_group_and_unknown_kind_are_rejected() {
        let path = PathBuf::from("plan.yaml");
        assert!(matches!(
            BatchPlan::parse(&path, "group: ' '\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BatchPlan::parse(&path, "group: g\nunits:\n  - kind: buy@nowhere\n    wallets: []\n"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
