//! 钱包句柄与只读钱包集合。
//!
//! 私钥只存在于 [`WalletHandle`] 内部，不会被序列化或写回任何持久化状态。

pub mod balance;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};

pub use balance::{BalanceSnapshot, RpcBalanceSource, refresh_snapshot};

#[derive(Clone)]
pub struct WalletHandle {
    pub address: Pubkey,
    signer: Arc<Keypair>,
    pub is_active: bool,
    pub label: Option<String>,
}

impl WalletHandle {
    pub fn new(signer: Keypair, is_active: bool) -> Self {
        Self::from_arc(Arc::new(signer), is_active)
    }

    pub fn from_arc(signer: Arc<Keypair>, is_active: bool) -> Self {
        Self {
            address: signer.pubkey(),
            signer,
            is_active,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.label = (!label.trim().is_empty()).then_some(label);
        self
    }

    pub fn signer(&self) -> &Keypair {
        self.signer.as_ref()
    }

    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => format!("{label}({})", self.address),
            None => self.address.to_string(),
        }
    }
}

impl fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletHandle")
            .field("address", &self.address)
            .field("is_active", &self.is_active)
            .field("label", &self.label)
            .field("signer", &"<redacted>")
            .finish()
    }
}

/// 已解析好的参与钱包列表，保持导入顺序。
#[derive(Debug, Clone, Default)]
pub struct WalletSet {
    handles: Vec<WalletHandle>,
    index: HashMap<Pubkey, usize>,
}

impl WalletSet {
    pub fn new(handles: Vec<WalletHandle>) -> Self {
        let mut deduped = Vec::with_capacity(handles.len());
        let mut index = HashMap::with_capacity(handles.len());
        for handle in handles {
            if index.contains_key(&handle.address) {
                continue;
            }
            index.insert(handle.address, deduped.len());
            deduped.push(handle);
        }
        Self {
            handles: deduped,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn get(&self, address: &Pubkey) -> Option<&WalletHandle> {
        self.index.get(address).map(|idx| &self.handles[*idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &WalletHandle> {
        self.handles.iter()
    }

    pub fn handles(&self) -> &[WalletHandle] {
        &self.handles
    }

    pub fn active(&self) -> impl Iterator<Item = &WalletHandle> {
        self.handles.iter().filter(|handle| handle.is_active)
    }

    pub fn addresses(&self) -> Vec<Pubkey> {
        self.handles.iter().map(|handle| handle.address).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_set_dedupes_by_address_and_keeps_order() {
        let first = WalletHandle::new(Keypair::new(), true);
        let second = WalletHandle::new(Keypair::new(), false);
        let duplicate = WalletHandle::from_arc(Arc::new(first.signer().insecure_clone()), false);

        let set = WalletSet::new(vec![first.clone(), second.clone(), duplicate]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.addresses(), vec![first.address, second.address]);
        assert!(set.get(&first.address).unwrap().is_active);
        assert_eq!(set.active().count(), 1);
    }

    #[test]
    fn debug_output_redacts_signer() {
        let handle = WalletHandle::new(Keypair::new(), true).with_label("main");
        let rendered = format!("{handle:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&handle.signer().to_base58_string()));
        assert!(handle.display_name().starts_with("main("));
    }
}
