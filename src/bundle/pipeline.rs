use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::builder::BundleSource;
use super::signer::sign_and_prepare;
use super::{SignedBundle, UnsignedBundle};
use crate::engine::OperationResult;
use crate::lander::LanderVariant;
use crate::wallet::WalletHandle;

/// builder → 签名 → 落地。普通失败一律转成 [`OperationResult::failure`]。
#[derive(Clone)]
pub struct BundlePipeline {
    source: Arc<dyn BundleSource>,
    lander: LanderVariant,
}

impl BundlePipeline {
    pub fn new(source: Arc<dyn BundleSource>, lander: LanderVariant) -> Self {
        Self { source, lander }
    }

    pub async fn run(
        &self,
        route: &str,
        request: &Value,
        keys: &[WalletHandle],
    ) -> OperationResult {
        let bundles = match self.source.build(route, request).await {
            Ok(bundles) => bundles,
            Err(err) => {
                warn!(target: "bundle::pipeline", route, error = %err, "builder 调用失败");
                return OperationResult::failure(err.to_string());
            }
        };

        let signed = match sign_bundles(&bundles, keys) {
            Ok(signed) => signed,
            Err(message) => return OperationResult::failure(message),
        };

        let mut receipts = Vec::new();
        for (index, bundle) in signed.iter().enumerate() {
            match self.lander.submit(bundle).await {
                Ok(receipt) => {
                    info!(
                        target: "bundle::relay",
                        route,
                        index,
                        lander = receipt.lander,
                        endpoint = %receipt.endpoint,
                        ids = ?receipt.ids,
                        "bundle 已提交"
                    );
                    receipts.extend(receipt.ids);
                }
                Err(err) => {
                    warn!(
                        target: "bundle::relay",
                        route,
                        index,
                        lander = self.lander.name(),
                        error = %err,
                        "bundle 提交失败"
                    );
                    return OperationResult::failure(format!("bundle #{index} 提交失败: {err}"));
                }
            }
        }

        OperationResult::success(receipts)
    }
}

/// 全部 bundle 签名完成后才开始提交；任一 bundle 签名后为空则整体失败，不提交任何交易。
fn sign_bundles(
    bundles: &[UnsignedBundle],
    keys: &[WalletHandle],
) -> Result<Vec<SignedBundle>, String> {
    let mut signed = Vec::with_capacity(bundles.len());
    for (index, bundle) in bundles.iter().enumerate() {
        let prepared = sign_and_prepare(bundle, keys);
        if prepared.is_empty() {
            let reason = prepared
                .first_failure()
                .map(|failure| failure.error.to_string())
                .unwrap_or_else(|| "bundle 为空".to_string());
            return Err(format!("bundle #{index} 没有可提交的交易: {reason}"));
        }
        if !prepared.is_complete() {
            warn!(
                target: "bundle::pipeline",
                index,
                dropped = prepared.failures.len(),
                remaining = prepared.transactions.len(),
                "部分 payload 已丢弃，继续提交剩余交易"
            );
        }
        signed.push(prepared);
    }
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use solana_sdk::hash::Hash;
    use solana_sdk::message::VersionedMessage;
    use solana_sdk::message::v0::Message as V0Message;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::{Keypair, Signature};
    use solana_sdk::transaction::VersionedTransaction;
    use solana_system_interface::instruction as system_instruction;

    use super::*;
    use crate::bundle::{BundleError, encode_transaction};
    use crate::config::TransactionEncoding;
    use crate::lander::DryRunLander;

    struct FixedSource(Result<Vec<UnsignedBundle>, String>);

    #[async_trait]
    impl BundleSource for FixedSource {
        async fn build(
            &self,
            _route: &str,
            _request: &Value,
        ) -> Result<Vec<UnsignedBundle>, BundleError> {
            self.0.clone().map_err(BundleError::Rejected)
        }
    }

    fn payload(payer: &Pubkey, owner: &Pubkey) -> String {
        let ix = system_instruction::transfer(owner, &Pubkey::new_unique(), 10);
        let message =
            V0Message::try_compile(payer, &[ix], &[], Hash::new_unique()).expect("compile");
        let message = VersionedMessage::V0(message);
        let required = message.header().num_required_signatures as usize;
        let tx = VersionedTransaction {
            signatures: vec![Signature::default(); required],
            message,
        };
        encode_transaction(&tx, TransactionEncoding::Base58).expect("encode")
    }

    fn pipeline(source: FixedSource) -> (BundlePipeline, DryRunLander) {
        let dry_run = DryRunLander::new();
        let pipeline =
            BundlePipeline::new(Arc::new(source), LanderVariant::DryRun(dry_run.clone()));
        (pipeline, dry_run)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unresolved_signer_submits_nothing() {
        let x = WalletHandle::new(Keypair::new(), true);
        let y = Pubkey::new_unique();
        let bundle =
            UnsignedBundle::new(vec![payload(&x.address, &y)], TransactionEncoding::Base58);
        let (pipeline, dry_run) = pipeline(FixedSource(Ok(vec![bundle])));

        let result = pipeline.run("/buy", &Value::Null, &[x]).await;
        assert!(!result.success);
        assert!(result.error.unwrap_or_default().contains(&y.to_string()));
        assert_eq!(dry_run.submitted(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn signed_bundles_are_submitted_and_receipts_collected() {
        let x = WalletHandle::new(Keypair::new(), true);
        let y = WalletHandle::new(Keypair::new(), true);
        let bundles = vec![
            UnsignedBundle::new(vec![payload(&x.address, &y.address)], TransactionEncoding::Base58),
            UnsignedBundle::new(
                vec![payload(&y.address, &x.address), payload(&x.address, &x.address)],
                TransactionEncoding::Base58,
            ),
        ];
        let (pipeline, dry_run) = pipeline(FixedSource(Ok(bundles)));

        let result = pipeline.run("/sell", &Value::Null, &[x, y]).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.receipts.len(), 3);
        assert_eq!(dry_run.submitted(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn builder_rejection_is_an_ordinary_failure() {
        let (pipeline, dry_run) = pipeline(FixedSource(Err("insufficient liquidity".into())));
        let result = pipeline.run("/buy", &Value::Null, &[]).await;
        assert!(!result.success);
        assert!(result.error.unwrap_or_default().contains("insufficient liquidity"));
        assert_eq!(dry_run.submitted(), 0);
    }
}
