use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use tracing::info;

use crate::bundle::SignedBundle;

use super::LanderReceipt;
use super::error::LanderError;

/// 不走 block engine，按顺序逐笔 `sendTransaction`。
#[derive(Clone)]
pub struct RpcLander {
    client: Arc<RpcClient>,
    config: RpcSendTransactionConfig,
}

impl RpcLander {
    pub fn new(client: Arc<RpcClient>, skip_preflight: bool) -> Self {
        let config = RpcSendTransactionConfig {
            skip_preflight,
            ..RpcSendTransactionConfig::default()
        };
        Self { client, config }
    }

    pub async fn submit(&self, bundle: &SignedBundle) -> Result<LanderReceipt, LanderError> {
        let transactions = bundle.decode_all()?;
        if transactions.is_empty() {
            return Err(LanderError::fatal("bundle 中没有交易"));
        }

        let mut signatures = Vec::with_capacity(transactions.len());
        for tx in &transactions {
            let signature = self
                .client
                .send_transaction_with_config(tx, self.config.clone())
                .await?;
            signatures.push(signature.to_string());
        }

        let endpoint = self.client.url();
        info!(
            target: "lander::rpc",
            endpoint = %endpoint,
            signatures = %signatures.join(","),
            skip_preflight = self.config.skip_preflight,
            tx_count = transactions.len(),
            "transactions submitted via rpc client"
        );
        Ok(LanderReceipt {
            lander: "rpc",
            endpoint,
            ids: signatures,
        })
    }
}
