use std::collections::{BTreeMap, HashMap};

use super::error::{EngineError, EngineResult};
use super::kind::{Direction, OperationKind};
use crate::wallet::WalletHandle;

const DEFAULT_BUY_CEILING: usize = 120;
const DEFAULT_SELL_CEILING: usize = 180;
const DEFAULT_ROTATE_CEILING: usize = 150;
const DEFAULT_TRANSFER_CEILING: usize = 120;
const DEFAULT_BURN_CEILING: usize = 120;
const DEFAULT_DEPLOY_CEILING: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityCheck {
    pub ok: bool,
    pub active_count: usize,
    pub ceiling: usize,
}

/// 每种操作类型允许同时参与的钱包上限，启动后只读。
#[derive(Debug, Clone)]
pub struct CapacityTable {
    ceilings: HashMap<OperationKind, usize>,
}

impl CapacityTable {
    pub fn empty() -> Self {
        Self {
            ceilings: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let ceilings = OperationKind::builtin()
            .into_iter()
            .map(|kind| (kind, default_ceiling(kind)))
            .collect();
        Self { ceilings }
    }

    /// 以内置表为基础，应用配置文件中的覆盖项。
    pub fn with_overrides(overrides: &BTreeMap<String, usize>) -> EngineResult<Self> {
        let mut table = Self::builtin();
        for (raw, ceiling) in overrides {
            let kind: OperationKind = raw
                .parse()
                .map_err(|err| EngineError::InvalidConfig(format!("capacity.{raw}: {err}")))?;
            table = table.with_ceiling(kind, *ceiling);
        }
        Ok(table)
    }

    pub fn with_ceiling(mut self, kind: OperationKind, ceiling: usize) -> Self {
        self.ceilings.insert(kind, ceiling);
        self
    }

    pub fn contains(&self, kind: OperationKind) -> bool {
        self.ceilings.contains_key(&kind)
    }

    /// 未配置的类型上限为 0，即永远不通过。
    pub fn ceiling(&self, kind: OperationKind) -> usize {
        self.ceilings.get(&kind).copied().unwrap_or(0)
    }

    pub fn validate<'a, I>(&self, wallets: I, kind: OperationKind) -> CapacityCheck
    where
        I: IntoIterator<Item = &'a WalletHandle>,
    {
        let active_count = wallets.into_iter().filter(|wallet| wallet.is_active).count();
        let ceiling = self.ceiling(kind);
        CapacityCheck {
            ok: active_count <= ceiling,
            active_count,
            ceiling,
        }
    }
}

fn default_ceiling(kind: OperationKind) -> usize {
    match kind {
        OperationKind::Swap(_, Direction::Buy) => DEFAULT_BUY_CEILING,
        OperationKind::Swap(_, Direction::Sell) => DEFAULT_SELL_CEILING,
        OperationKind::Rotate(_) => DEFAULT_ROTATE_CEILING,
        OperationKind::Transfer => DEFAULT_TRANSFER_CEILING,
        OperationKind::Burn => DEFAULT_BURN_CEILING,
        OperationKind::Deploy => DEFAULT_DEPLOY_CEILING,
    }
}
