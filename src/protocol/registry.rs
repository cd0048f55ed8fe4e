use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use super::{
    AdapterContext, BurnAdapter, DeployAdapter, ProtocolAdapter, RotateAdapter, SwapAdapter,
    TransferAdapter,
};
use crate::engine::{Direction, EngineError, EngineResult, OperationKind, Protocol};

pub type AdapterFactory = Box<dyn Fn(&AdapterContext) -> Arc<dyn ProtocolAdapter> + Send + Sync>;

struct Slot {
    factory: AdapterFactory,
    instance: OnceCell<Arc<dyn ProtocolAdapter>>,
}

/// 操作类型到适配器工厂的静态表，首次 `resolve` 时才构造实例。
pub struct AdapterRegistry {
    context: AdapterContext,
    slots: HashMap<OperationKind, Slot>,
}

impl AdapterRegistry {
    pub fn new(context: AdapterContext) -> Self {
        Self {
            context,
            slots: HashMap::new(),
        }
    }

    /// 注册全部内置操作类型：七个协议的买/卖/轮换，外加转账、销毁、部署。
    pub fn with_defaults(context: AdapterContext) -> Self {
        let mut registry = Self::new(context);
        for protocol in Protocol::ALL {
            for direction in [Direction::Buy, Direction::Sell] {
                registry.register(OperationKind::Swap(protocol, direction), move |ctx| {
                    Arc::new(SwapAdapter::new(protocol, direction, ctx.clone()))
                });
            }
            registry.register(OperationKind::Rotate(protocol), move |ctx| {
                Arc::new(RotateAdapter::new(protocol, ctx.clone()))
            });
        }
        registry.register(OperationKind::Transfer, |ctx| {
            Arc::new(TransferAdapter::new(ctx.clone()))
        });
        registry.register(OperationKind::Burn, |ctx| Arc::new(BurnAdapter::new(ctx.clone())));
        registry.register(OperationKind::Deploy, |ctx| {
            Arc::new(DeployAdapter::new(ctx.clone()))
        });
        registry
    }

    /// 同一类型重复注册时覆盖旧工厂。
    pub fn register<F>(&mut self, kind: OperationKind, factory: F)
    where
        F: Fn(&AdapterContext) -> Arc<dyn ProtocolAdapter> + Send + Sync + 'static,
    {
        self.slots.insert(
            kind,
            Slot {
                factory: Box::new(factory),
                instance: OnceCell::new(),
            },
        );
    }

    #[cfg(test)]
    pub fn kinds(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<_> = self.slots.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn resolve(&self, kind: OperationKind) -> EngineResult<Arc<dyn ProtocolAdapter>> {
        let slot = self
            .slots
            .get(&kind)
            .ok_or(EngineError::MissingAdapter(kind))?;
        let adapter = slot.instance.get_or_init(|| {
            debug!(target: "protocol::registry", kind = %kind, "构造适配器");
            (slot.factory)(&self.context)
        });
        Ok(Arc::clone(adapter))
    }

    /// 按协议标识与方向查找 swap 适配器。
    #[allow(dead_code)]
    pub fn resolve_protocol(
        &self,
        id: &str,
        direction: Direction,
    ) -> EngineResult<Arc<dyn ProtocolAdapter>> {
        let protocol = Protocol::from_str(id)
            .map_err(|err| EngineError::InvalidConfig(err.to_string()))?;
        self.resolve(OperationKind::Swap(protocol, direction))
    }
}
