use std::collections::HashMap;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tracing::{debug, warn};

use super::codec::{decode_transaction, encode_transaction};
use super::error::BundleError;
use super::{PayloadFailure, SignedBundle, UnsignedBundle};
use crate::config::TransactionEncoding;
use crate::wallet::WalletHandle;

/// 为 bundle 中每笔交易补齐签名。
///
/// 交易头部 `num_required_signatures` 之前的静态账户即必需签名者，必须全部能在
/// `keys` 中找到，否则该 payload 直接失败并报告缺失的地址。已有签名槽位不视为满足。
/// 不做任何提交。
pub fn sign_and_prepare(bundle: &UnsignedBundle, keys: &[WalletHandle]) -> SignedBundle {
    let lookup: HashMap<Pubkey, &Keypair> = keys
        .iter()
        .map(|handle| (handle.address, handle.signer()))
        .collect();

    let mut transactions = Vec::with_capacity(bundle.transactions.len());
    let mut failures = Vec::new();

    for (index, raw) in bundle.transactions.iter().enumerate() {
        match sign_payload(raw, bundle.encoding, &lookup) {
            Ok(encoded) => transactions.push(encoded),
            Err(error) => {
                warn!(
                    target: "bundle::signer",
                    index,
                    error = %error,
                    "payload 签名失败，已丢弃"
                );
                failures.push(PayloadFailure { index, error });
            }
        }
    }

    debug!(
        target: "bundle::signer",
        signed = transactions.len(),
        dropped = failures.len(),
        "bundle 签名完成"
    );

    SignedBundle {
        transactions,
        encoding: bundle.encoding,
        failures,
    }
}

fn sign_payload(
    raw: &str,
    encoding: TransactionEncoding,
    keys: &HashMap<Pubkey, &Keypair>,
) -> Result<String, BundleError> {
    let mut tx = decode_transaction(raw, encoding)?;

    let required = tx.message.header().num_required_signatures as usize;
    let account_keys = tx.message.static_account_keys();
    if account_keys.len() < required {
        return Err(BundleError::Decode(format!(
            "需要 {required} 个签名者，但只有 {} 个静态账户",
            account_keys.len()
        )));
    }
    let signers: Vec<Pubkey> = account_keys[..required].to_vec();

    let missing: Vec<Pubkey> = signers
        .iter()
        .filter(|key| !keys.contains_key(*key))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(BundleError::UnresolvedSigners(missing));
    }

    tx.signatures.resize(required, Signature::default());
    let message_bytes = tx.message.serialize();
    for (slot, key) in signers.iter().enumerate() {
        if let Some(keypair) = keys.get(key) {
            tx.signatures[slot] = keypair.sign_message(&message_bytes);
        }
    }

    encode_transaction(&tx, encoding)
}

#[cfg(test)]
mod tests {
    use solana_sdk::hash::Hash;
    use solana_sdk::message::VersionedMessage;
    use solana_sdk::message::v0::Message as V0Message;
    use solana_sdk::transaction::VersionedTransaction;
    use solana_system_interface::instruction as system_instruction;

    use super::*;

    fn two_signer_payload(
        payer: &Pubkey,
        owner: &Pubkey,
        encoding: TransactionEncoding,
    ) -> String {
        let recipient = Pubkey::new_unique();
        let ix = system_instruction::transfer(owner, &recipient, 1_000);
        let message = V0Message::try_compile(payer, &[ix], &[], Hash::new_unique())
            .expect("compile message");
        let message = VersionedMessage::V0(message);
        let required = message.header().num_required_signatures as usize;
        let tx = VersionedTransaction {
            signatures: vec![Signature::default(); required],
            message,
        };
        encode_transaction(&tx, encoding).expect("encode")
    }

    #[test]
    fn missing_signer_fails_payload_and_reports_it() {
        let x = WalletHandle::new(Keypair::new(), true);
        let y = Keypair::new();
        let y_address = y.pubkey();
        let raw = two_signer_payload(&x.address, &y_address, TransactionEncoding::Base58);
        let bundle = UnsignedBundle::new(vec![raw], TransactionEncoding::Base58);

        let signed = sign_and_prepare(&bundle, std::slice::from_ref(&x));
        assert!(signed.is_empty());
        assert_eq!(signed.failures.len(), 1);
        match &signed.failures[0].error {
            BundleError::UnresolvedSigners(missing) => assert_eq!(missing, &vec![y_address]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn all_signers_present_produces_valid_signatures() {
        let x = WalletHandle::new(Keypair::new(), true);
        let y = WalletHandle::new(Keypair::new(), true);
        let unrelated = WalletHandle::new(Keypair::new(), true);
        let raw = two_signer_payload(&x.address, &y.address, TransactionEncoding::Base64);
        let bundle = UnsignedBundle::new(vec![raw.clone()], TransactionEncoding::Base64);

        let keys = vec![unrelated, y.clone(), x.clone()];
        let signed = sign_and_prepare(&bundle, &keys);
        assert!(signed.is_complete());
        assert_eq!(signed.transactions.len(), 1);
        assert_ne!(signed.transactions[0], raw);

        let tx = decode_transaction(&signed.transactions[0], TransactionEncoding::Base64)
            .expect("decode signed");
        let message_bytes = tx.message.serialize();
        let signers = &tx.message.static_account_keys()[..2];
        assert_eq!(signers, &[x.address, y.address]);
        for (signature, key) in tx.signatures.iter().zip(signers) {
            assert!(signature.verify(key.as_ref(), &message_bytes));
        }

        let again = sign_and_prepare(&bundle, &keys);
        assert_eq!(again.transactions, signed.transactions);
    }

    #[test]
    fn bad_payload_is_dropped_but_others_survive() {
        let x = WalletHandle::new(Keypair::new(), true);
        let y = WalletHandle::new(Keypair::new(), true);
        let good = two_signer_payload(&x.address, &y.address, TransactionEncoding::Base58);
        let bundle = UnsignedBundle::new(
            vec!["not-a-transaction!".to_string(), good],
            TransactionEncoding::Base58,
        );

        let signed = sign_and_prepare(&bundle, &[x, y]);
        assert_eq!(signed.transactions.len(), 1);
        assert_eq!(signed.failures.len(), 1);
        assert_eq!(signed.failures[0].index, 0);
        assert!(matches!(signed.failures[0].error, BundleError::Decode(_)));
    }
}
