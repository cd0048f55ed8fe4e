use std::sync::Arc;

use reqwest::Client;
use solana_client::nonblocking::rpc_client::RpcClient;
use tracing::info;

use crate::config::{LanderKind, LanderSettings};

use super::LanderVariant;
use super::dry_run::DryRunLander;
use super::error::LanderError;
use super::jito::JitoLander;
use super::rpc::RpcLander;

#[derive(Clone)]
pub struct LanderFactory {
    rpc_client: Arc<RpcClient>,
    http_client: Client,
}

impl LanderFactory {
    pub fn new(rpc_client: Arc<RpcClient>, http_client: Client) -> Self {
        Self {
            rpc_client,
            http_client,
        }
    }

    /// `dry_run` 为真时忽略配置中的落地方式。
    pub fn build(
        &self,
        settings: &LanderSettings,
        dry_run: bool,
    ) -> Result<LanderVariant, LanderError> {
        let kind = if dry_run { LanderKind::DryRun } else { settings.kind };
        let variant = match kind {
            LanderKind::Jito => {
                let lander = JitoLander::new(&settings.jito_endpoints, self.http_client.clone());
                if lander.endpoint_count() == 0 {
                    return Err(LanderError::fatal("lander.kind=jito 但未配置 jito_endpoints"));
                }
                LanderVariant::Jito(lander)
            }
            LanderKind::Rpc => LanderVariant::Rpc(RpcLander::new(
                self.rpc_client.clone(),
                settings.skip_preflight,
            )),
            LanderKind::DryRun => LanderVariant::DryRun(DryRunLander::new()),
        };
        info!(target: "lander::factory", lander = variant.name(), "落地方式已选定");
        Ok(variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> LanderFactory {
        LanderFactory::new(
            Arc::new(RpcClient::new("http://127.0.0.1:8899".to_string())),
            Client::new(),
        )
    }

    #[test]
    fn jito_without_endpoints_is_rejected() {
        let settings = LanderSettings::default();
        assert!(matches!(
            factory().build(&settings, false),
            Err(LanderError::Fatal(_))
        ));
    }

    #[test]
    fn dry_run_flag_overrides_configured_kind() {
        let settings = LanderSettings {
            kind: LanderKind::Rpc,
            ..LanderSettings::default()
        };
        assert_eq!(factory().build(&settings, false).expect("rpc").name(), "rpc");
        assert_eq!(factory().build(&settings, true).expect("dry").name(), "dry_run");
    }
}
