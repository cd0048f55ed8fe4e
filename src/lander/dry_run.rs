use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

use crate::bundle::SignedBundle;

use super::LanderReceipt;
use super::error::LanderError;

/// 只记录日志不上链；回执为每笔交易的首个签名。
#[derive(Clone, Default)]
pub struct DryRunLander {
    submitted: Arc<AtomicUsize>,
}

impl DryRunLander {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已"提交"的 bundle 数量。
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }

    pub async fn submit(&self, bundle: &SignedBundle) -> Result<LanderReceipt, LanderError> {
        let transactions = bundle.decode_all()?;
        if transactions.is_empty() {
            return Err(LanderError::fatal("dry-run bundle submission missing transactions"));
        }

        let ids: Vec<String> = transactions
            .iter()
            .filter_map(|tx| tx.signatures.first())
            .map(|signature| signature.to_string())
            .collect();
        self.submitted.fetch_add(1, Ordering::Relaxed);

        info!(
            target: "lander::dry_run",
            signatures = %ids.join(","),
            tx_count = transactions.len(),
            encoding = bundle.encoding.as_str(),
            "dry-run 模式：bundle 未实际提交"
        );

        Ok(LanderReceipt {
            lander: "dry_run",
            endpoint: "dry-run".to_string(),
            ids,
        })
    }
}
