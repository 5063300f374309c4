//! Wallet seam for the step execution loop.
//!
//! The browser demos leaned on an ambient wagmi signer; here the capability
//! is an explicit trait so the engine carries no implicit UI state. The
//! bundled implementation speaks JSON-RPC to a wallet-enabled endpoint
//! (an unlocked node, Anvil, Frame, ...).

pub mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use rpc::RpcWalletSigner;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("failed to call wallet RPC: {0}")]
    Http(#[from] reqwest::Error),
    #[error("wallet RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("unexpected wallet RPC response: {0}")]
    Schema(String),
    #[error("invalid signature returned by wallet: {0}")]
    InvalidSignature(String),
    #[error("transaction {hash} reverted")]
    Reverted { hash: String },
    #[error("no receipt for transaction {hash} after {attempts} polls")]
    ReceiptTimeout { hash: String, attempts: u32 },
    #[error("failed to encode typed data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not infer the typed-data primary type: {0}")]
    AmbiguousPrimaryType(String),
}

/// Ethereum transaction request as the execute API describes it. Fields the
/// server sends beyond the common ones ride along untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub hash: String,
}

/// 65-byte ECDSA signature as returned by wallet signing calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 65]);

/// Canonical `r`/`s`/`v` decomposition, the shape the execute API expects
/// appended to the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParts {
    pub r: String,
    pub s: String,
    pub v: u64,
}

impl Signature {
    pub fn from_hex(input: &str) -> Result<Self, SignerError> {
        let stripped = input.strip_prefix("0x").unwrap_or(input);
        let bytes =
            hex::decode(stripped).map_err(|err| SignerError::InvalidSignature(err.to_string()))?;
        let bytes: [u8; 65] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            SignerError::InvalidSignature(format!("expected 65 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn split(&self) -> SignatureParts {
        let recovery = self.0[64] as u64;
        // Wallets return either a raw recovery id or a pre-normalized 27/28.
        let v = if recovery < 27 { recovery + 27 } else { recovery };
        SignatureParts {
            r: format!("0x{}", hex::encode(&self.0[0..32])),
            s: format!("0x{}", hex::encode(&self.0[32..64])),
            v,
        }
    }
}

#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> &str;

    async fn send_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> Result<PendingTransaction, SignerError>;

    /// Blocks until the transaction is mined; errors if it reverted.
    async fn wait_for_receipt(&self, tx: &PendingTransaction) -> Result<(), SignerError>;

    /// EIP-191 raw message signature.
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError>;

    /// EIP-712 typed-data signature over the step's domain/types/value.
    async fn sign_typed_data(
        &self,
        domain: &Value,
        types: &Value,
        value: &Value,
    ) -> Result<Signature, SignerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_signature_into_components() {
        let hex = format!("0x{}{}{:02x}", "ab".repeat(32), "cd".repeat(32), 28);
        let parts = Signature::from_hex(&hex).unwrap().split();
        assert_eq!(parts.r, format!("0x{}", "ab".repeat(32)));
        assert_eq!(parts.s, format!("0x{}", "cd".repeat(32)));
        assert_eq!(parts.v, 28);
    }

    #[test]
    fn normalizes_recovery_id_to_27_28() {
        let hex = format!("{}{}{:02x}", "00".repeat(32), "00".repeat(32), 1);
        assert_eq!(Signature::from_hex(&hex).unwrap().split().v, 28);

        let hex = format!("0x{}{}{:02x}", "00".repeat(32), "00".repeat(32), 0);
        assert_eq!(Signature::from_hex(&hex).unwrap().split().v, 27);
    }

    #[test]
    fn rejects_wrong_length_and_bad_hex() {
        assert!(matches!(
            Signature::from_hex("0xabcd"),
            Err(SignerError::InvalidSignature(_))
        ));
        assert!(matches!(
            Signature::from_hex("0xzz"),
            Err(SignerError::InvalidSignature(_))
        ));
    }

    #[test]
    fn transaction_request_keeps_unknown_fields() {
        let tx: TransactionRequest = serde_json::from_value(serde_json::json!({
            "from": "0xa",
            "to": "0xb",
            "maxFeePerGas": "0x1234"
        }))
        .unwrap();
        assert_eq!(
            tx.extra.get("maxFeePerGas"),
            Some(&serde_json::json!("0x1234"))
        );

        let round = serde_json::to_value(&tx).unwrap();
        assert_eq!(round.get("maxFeePerGas"), Some(&serde_json::json!("0x1234")));
    }
}
