//! 顺序执行批次内的单元，单元之间互不影响。
//!
//! 流程：装配检查 → 全部单元预检 → 逐个 execute（相邻网络调用之间按配置间隔）→ 汇总报告。

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};
use uuid::Uuid;

use super::capacity::CapacityTable;
use super::error::{EngineError, EngineResult};
use super::kind::OperationKind;
use super::types::{Batch, BatchReport, FailureStage, UnitFailure, UnitOfWork};
use crate::monitoring::events;
use crate::protocol::{AdapterRegistry, ProtocolAdapter};
use crate::wallet::{BalanceSnapshot, WalletHandle, WalletSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Running,
    Completed,
}

type GroupTable = Arc<Mutex<HashMap<String, BatchState>>>;

/// 同一卖方展开出的轮换单元共享一次容量检查：(kind, 卖方) -> 卖方及全部买方。
type RotationScopes = HashMap<(OperationKind, Pubkey), Vec<Pubkey>>;

fn rotation_scopes(batch: &Batch) -> RotationScopes {
    let mut scopes = RotationScopes::new();
    for unit in &batch.units {
        if !matches!(unit.kind, OperationKind::Rotate(_)) {
            continue;
        }
        let Some(seller) = unit.wallets.first() else {
            continue;
        };
        let members = scopes.entry((unit.kind, *seller)).or_default();
        for address in &unit.wallets {
            if !members.contains(address) {
                members.push(*address);
            }
        }
    }
    scopes
}

/// 持有期间该组为 `Running`，释放时改为 `Completed`。
struct GroupGuard {
    groups: GroupTable,
    group: String,
}

impl GroupGuard {
    fn acquire(groups: &GroupTable, group: &str) -> EngineResult<Self> {
        let mut table = groups.lock();
        if table.get(group) == Some(&BatchState::Running) {
            return Err(EngineError::BatchInProgress(group.to_string()));
        }
        table.insert(group.to_string(), BatchState::Running);
        Ok(Self {
            groups: Arc::clone(groups),
            group: group.to_string(),
        })
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.groups
            .lock()
            .insert(self.group.clone(), BatchState::Completed);
    }
}

struct PreparedUnit<'a> {
    index: usize,
    label: String,
    unit: &'a UnitOfWork,
    adapter: Arc<dyn ProtocolAdapter>,
    wallets: Vec<WalletHandle>,
}

#[derive(Clone)]
pub struct SequentialExecutor {
    registry: Arc<AdapterRegistry>,
    capacity: Arc<CapacityTable>,
    unit_delay: Duration,
    groups: GroupTable,
}

impl SequentialExecutor {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        capacity: Arc<CapacityTable>,
        unit_delay: Duration,
    ) -> Self {
        Self {
            registry,
            capacity,
            unit_delay,
            groups: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 从未运行过的组返回 `None`。
    #[cfg(test)]
    pub fn state(&self, group: &str) -> Option<BatchState> {
        self.groups.lock().get(group).copied()
    }

    /// 执行一个批次。只有装配错误或同组批次仍在运行时返回 `Err`，
    /// 其余失败都记录在报告中。
    pub async fn run(
        &self,
        batch: &Batch,
        wallets: &WalletSet,
        balances: &BalanceSnapshot,
    ) -> EngineResult<BatchReport> {
        let adapters = self.setup(batch)?;
        let _guard = GroupGuard::acquire(&self.groups, &batch.group)?;

        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let mut report = BatchReport::new(batch_id.clone(), batch.group.clone());
        events::batch_started(&batch_id, &batch.group, batch.units.len());

        let scopes = rotation_scopes(batch);
        let mut prepared = Vec::with_capacity(batch.units.len());
        for (index, (unit, adapter)) in batch.units.iter().zip(adapters).enumerate() {
            let label = unit.display_label(index);
            match self.preflight(unit, adapter.as_ref(), wallets, balances, &scopes) {
                Ok(handles) => prepared.push(PreparedUnit {
                    index,
                    label,
                    unit,
                    adapter,
                    wallets: handles,
                }),
                Err(reason) => {
                    events::unit_skipped(&batch_id, index, &label, unit.kind, &reason);
                    report.record_failure(UnitFailure {
                        index,
                        label,
                        stage: FailureStage::Preflight,
                        error: reason,
                    });
                }
            }
        }

        for (position, unit) in prepared.into_iter().enumerate() {
            if position > 0 && !self.unit_delay.is_zero() {
                tokio::time::sleep(self.unit_delay).await;
            }

            let unit_started = Instant::now();
            let outcome = AssertUnwindSafe(unit.adapter.execute(&unit.wallets, &unit.unit.params))
                .catch_unwind()
                .await;
            let elapsed = unit_started.elapsed();

            let failure = match outcome {
                Ok(Ok(result)) if result.success => {
                    events::unit_finished(
                        &batch_id,
                        unit.index,
                        &unit.label,
                        unit.unit.kind,
                        elapsed,
                        Ok(result.receipts.as_slice()),
                    );
                    report.record_success();
                    continue;
                }
                Ok(Ok(result)) => result
                    .error
                    .unwrap_or_else(|| "执行失败，未返回原因".to_string()),
                Ok(Err(err)) => err.to_string(),
                Err(payload) => format!("执行时发生 panic: {}", panic_message(payload.as_ref())),
            };

            events::unit_finished(
                &batch_id,
                unit.index,
                &unit.label,
                unit.unit.kind,
                elapsed,
                Err(failure.as_str()),
            );
            report.record_failure(UnitFailure {
                index: unit.index,
                label: unit.label,
                stage: FailureStage::Execute,
                error: failure,
            });
        }

        report.failures.sort_by_key(|failure| failure.index);
        report.elapsed = started.elapsed();
        events::batch_completed(&report);
        Ok(report)
    }

    /// 所有单元都必须能解析到适配器并配置了容量上限，否则整个批次不启动。
    fn setup(&self, batch: &Batch) -> EngineResult<Vec<Arc<dyn ProtocolAdapter>>> {
        batch
            .units
            .iter()
            .map(|unit| {
                if !self.capacity.contains(unit.kind) {
                    return Err(EngineError::MissingCapacity(unit.kind));
                }
                self.registry.resolve(unit.kind)
            })
            .collect()
    }

    fn preflight(
        &self,
        unit: &UnitOfWork,
        adapter: &dyn ProtocolAdapter,
        wallets: &WalletSet,
        balances: &BalanceSnapshot,
        scopes: &RotationScopes,
    ) -> Result<Vec<WalletHandle>, String> {
        let mut handles = Vec::with_capacity(unit.wallets.len());
        for address in &unit.wallets {
            let handle = wallets
                .get(address)
                .ok_or_else(|| format!("未知钱包 {address}"))?;
            if !handle.is_active {
                return Err(format!("钱包 {} 未激活", handle.display_name()));
            }
            handles.push(handle.clone());
        }

        let scope = unit
            .wallets
            .first()
            .and_then(|seller| scopes.get(&(unit.kind, *seller)));
        let check = match scope {
            Some(members) => self.capacity.validate(
                members.iter().filter_map(|address| wallets.get(address)),
                unit.kind,
            ),
            None => self.capacity.validate(&handles, unit.kind),
        };
        if !check.ok {
            return Err(format!(
                "{} 最多允许 {} 个钱包，当前 {} 个",
                unit.kind, check.ceiling, check.active_count
            ));
        }

        adapter
            .validate(&handles, &unit.params, balances)
            .map_err(|err| err.to_string())?;

        debug!(
            target: "engine::executor",
            kind = %unit.kind,
            wallets = handles.len(),
            "预检通过"
        );
        Ok(handles)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        warn!(target: "engine::executor", "panic payload 无法识别");
        "unknown panic".to_string()
    }
}
