pub mod error;
mod dry_run;
mod factory;
mod jito;
mod rpc;

pub use dry_run::DryRunLander;
pub use error::LanderError;
pub use factory::LanderFactory;
pub use jito::JitoLander;
pub use rpc::RpcLander;

use crate::bundle::SignedBundle;

#[derive(Debug, Clone)]
pub struct LanderReceipt {
    pub lander: &'static str,
    pub endpoint: String,
    /// bundle id 或交易签名。
    pub ids: Vec<String>,
}

#[derive(Clone)]
pub enum LanderVariant {
    Jito(JitoLander),
    Rpc(RpcLander),
    DryRun(DryRunLander),
}

impl LanderVariant {
    pub fn name(&self) -> &'static str {
        match self {
            LanderVariant::Jito(_) => "jito",
            LanderVariant::Rpc(_) => "rpc",
            LanderVariant::DryRun(_) => "dry_run",
        }
    }

    pub async fn submit(&self, bundle: &SignedBundle) -> Result<LanderReceipt, LanderError> {
        match self {
            LanderVariant::Jito(lander) => lander.submit(bundle).await,
            LanderVariant::Rpc(lander) => lander.submit(bundle).await,
            LanderVariant::DryRun(lander) => lander.submit(bundle).await,
        }
    }
}
