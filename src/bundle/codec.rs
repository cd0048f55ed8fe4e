use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use bincode::config::{Configuration, Fixint, LittleEndian};
use bincode::serde::{decode_from_slice, encode_to_vec};
use solana_sdk::transaction::VersionedTransaction;

use super::error::BundleError;
use crate::config::TransactionEncoding;

type WireConfig = Configuration<LittleEndian, Fixint>;

fn wire_config() -> WireConfig {
    bincode::config::standard()
        .with_fixed_int_encoding()
        .with_little_endian()
}

pub fn decode_transaction(
    raw: &str,
    encoding: TransactionEncoding,
) -> Result<VersionedTransaction, BundleError> {
    let trimmed = raw.trim();
    let bytes = match encoding {
        TransactionEncoding::Base58 => bs58::decode(trimmed)
            .into_vec()
            .map_err(|err| BundleError::Decode(format!("base58: {err}")))?,
        TransactionEncoding::Base64 => BASE64_STANDARD
            .decode(trimmed)
            .map_err(|err| BundleError::Decode(format!("base64: {err}")))?,
    };
    let (tx, _) = decode_from_slice::<VersionedTransaction, _>(&bytes, wire_config())
        .map_err(|err| BundleError::Decode(err.to_string()))?;
    Ok(tx)
}

pub fn encode_transaction(
    tx: &VersionedTransaction,
    encoding: TransactionEncoding,
) -> Result<String, BundleError> {
    let bytes =
        encode_to_vec(tx, wire_config()).map_err(|err| BundleError::Encode(err.to_string()))?;
    Ok(match encoding {
        TransactionEncoding::Base58 => bs58::encode(bytes).into_string(),
        TransactionEncoding::Base64 => BASE64_STANDARD.encode(bytes),
    })
}
