//! 协议适配器：每种操作类型对应一对 `validate` / `execute` 能力。
//!
//! 适配器只负责把参数整理成 builder 请求；签名与落地统一交给
//! [`BundlePipeline`](crate::bundle::BundlePipeline)。

mod burn;
mod deploy;
pub mod error;
mod registry;
mod rotate;
mod swap;
mod transfer;
pub mod validation;

use async_trait::async_trait;

pub use burn::BurnAdapter;
pub use deploy::DeployAdapter;
pub use error::{AdapterError, ValidationError};
pub use registry::AdapterRegistry;
pub use rotate::RotateAdapter;
pub use swap::SwapAdapter;
pub use transfer::TransferAdapter;

use crate::bundle::BundlePipeline;
use crate::engine::{OperationKind, OperationParams, OperationResult};
use crate::wallet::{BalanceSnapshot, WalletHandle};

#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    fn kind(&self) -> OperationKind;

    /// 只读检查，不得发起网络请求。
    fn validate(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
        balances: &BalanceSnapshot,
    ) -> Result<(), ValidationError>;

    /// builder → 签名 → 落地。`Err` 只表示装配错误。
    async fn execute(
        &self,
        wallets: &[WalletHandle],
        params: &OperationParams,
    ) -> Result<OperationResult, AdapterError>;
}

/// 构造适配器时共享的依赖。
#[derive(Clone)]
pub struct AdapterContext {
    pub pipeline: BundlePipeline,
    pub fee_reserve_lamports: u64,
}

impl AdapterContext {
    pub fn new(pipeline: BundlePipeline, fee_reserve_lamports: u64) -> Self {
        Self {
            pipeline,
            fee_reserve_lamports,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;

    use super::AdapterContext;
    use crate::bundle::{BundleError, BundlePipeline, BundleSource, UnsignedBundle};
    use crate::lander::{DryRunLander, LanderVariant};

    /// 记录收到的请求并返回固定结果的 builder 桩。
    #[derive(Default)]
    pub struct RecordingSource {
        pub requests: Mutex<Vec<(String, Value)>>,
        pub response: Mutex<Option<Vec<UnsignedBundle>>>,
    }

    #[async_trait]
    impl BundleSource for RecordingSource {
        async fn build(
            &self,
            route: &str,
            request: &Value,
        ) -> Result<Vec<UnsignedBundle>, BundleError> {
            self.requests.lock().push((route.to_string(), request.clone()));
            self.response
                .lock()
                .clone()
                .ok_or_else(|| BundleError::Rejected("no response configured".into()))
        }
    }

    pub fn context(source: Arc<RecordingSource>) -> (AdapterContext, DryRunLander) {
        let lander = DryRunLander::new();
        let pipeline = BundlePipeline::new(source, LanderVariant::DryRun(lander.clone()));
        (AdapterContext::new(pipeline, 5_000), lander)
    }
}
