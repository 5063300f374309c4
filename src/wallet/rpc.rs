use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace};
use url::Url;

use super::{PendingTransaction, Signature, SignerError, TransactionRequest, WalletSigner};

/// [`WalletSigner`] backed by a wallet-enabled JSON-RPC endpoint. Signing
/// calls (`personal_sign`, `eth_signTypedData_v4`) require the endpoint to
/// hold the key for `address`.
pub struct RpcWalletSigner {
    endpoint: Url,
    client: reqwest::Client,
    address: String,
    request_timeout: Duration,
    receipt_poll_interval: Duration,
    receipt_max_attempts: u32,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcWalletSigner {
    pub fn new(client: reqwest::Client, endpoint: Url, address: String) -> Self {
        Self {
            endpoint,
            client,
            address,
            request_timeout: Duration::from_secs(30),
            receipt_poll_interval: Duration::from_secs(2),
            receipt_max_attempts: 150,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_receipt_policy(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.receipt_poll_interval = interval;
        self.receipt_max_attempts = max_attempts;
        self
    }

    /// Chain id of the connected endpoint, for the wrong-network guard the
    /// flows run before touching the marketplace.
    pub async fn chain_id(&self) -> Result<u64, SignerError> {
        let result = self.call("eth_chainId", json!([])).await?;
        let quantity = result
            .as_str()
            .ok_or_else(|| SignerError::Schema("eth_chainId result is not a string".into()))?;
        parse_quantity(quantity)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, SignerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(target: "wallet::rpc", method, id, "sending wallet RPC request");

        let response = self
            .client
            .post(self.endpoint.as_str())
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;
        let envelope: RpcEnvelope = response.json().await?;

        if let Some(error) = envelope.error {
            return Err(SignerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        // A null result (e.g. no receipt yet) deserializes to None; keep it
        // distinguishable from a transport-level miss by mapping it back.
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    fn signature_from(&self, result: Value) -> Result<Signature, SignerError> {
        let raw = result
            .as_str()
            .ok_or_else(|| SignerError::Schema("signature result is not a string".into()))?;
        Signature::from_hex(raw)
    }
}

#[async_trait]
impl WalletSigner for RpcWalletSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> Result<PendingTransaction, SignerError> {
        let mut tx = tx.clone();
        if tx.from.is_none() {
            tx.from = Some(self.address.clone());
        }
        let result = self
            .call("eth_sendTransaction", json!([serde_json::to_value(&tx)?]))
            .await?;
        let hash = result
            .as_str()
            .ok_or_else(|| SignerError::Schema("transaction hash is not a string".into()))?
            .to_string();
        debug!(target: "wallet::rpc", %hash, "transaction submitted");
        Ok(PendingTransaction { hash })
    }

    async fn wait_for_receipt(&self, tx: &PendingTransaction) -> Result<(), SignerError> {
        let attempts = self.receipt_max_attempts.max(1);
        for attempt in 1..=attempts {
            let result = self
                .call("eth_getTransactionReceipt", json!([tx.hash]))
                .await?;
            if !result.is_null() {
                let reverted = result
                    .get("status")
                    .and_then(Value::as_str)
                    .is_some_and(|status| matches!(parse_quantity(status), Ok(0)));
                if reverted {
                    return Err(SignerError::Reverted {
                        hash: tx.hash.clone(),
                    });
                }
                debug!(target: "wallet::rpc", hash = %tx.hash, attempt, "transaction mined");
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(self.receipt_poll_interval).await;
            }
        }
        Err(SignerError::ReceiptTimeout {
            hash: tx.hash.clone(),
            attempts,
        })
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        let data = format!("0x{}", hex::encode(message));
        let result = self
            .call("personal_sign", json!([data, self.address]))
            .await?;
        self.signature_from(result)
    }

    async fn sign_typed_data(
        &self,
        domain: &Value,
        types: &Value,
        value: &Value,
    ) -> Result<Signature, SignerError> {
        let payload = build_typed_data_payload(domain, types, value)?;
        let serialized = serde_json::to_string(&payload)?;
        let result = self
            .call("eth_signTypedData_v4", json!([self.address, serialized]))
            .await?;
        self.signature_from(result)
    }
}

fn parse_quantity(input: &str) -> Result<u64, SignerError> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    u64::from_str_radix(stripped, 16)
        .map_err(|err| SignerError::Schema(format!("invalid quantity `{input}`: {err}")))
}

/// Assembles the `eth_signTypedData_v4` payload. The execute API hands out
/// `domain`/`types`/`value` the way ethers' `_signTypedData` consumes them:
/// no `primaryType` and usually no `EIP712Domain` entry, so both are derived
/// here the way ethers derives them.
fn build_typed_data_payload(
    domain: &Value,
    types: &Value,
    value: &Value,
) -> Result<Value, SignerError> {
    let primary_type = infer_primary_type(types)?;
    let mut types = types.clone();
    if let Some(map) = types.as_object_mut() {
        if !map.contains_key("EIP712Domain") {
            map.insert("EIP712Domain".into(), domain_type_entry(domain));
        }
    }
    Ok(json!({
        "domain": domain,
        "types": types,
        "primaryType": primary_type,
        "message": value,
    }))
}

/// The primary type is the struct no other struct references. Exactly one
/// must remain once `EIP712Domain` and referenced types are excluded.
fn infer_primary_type(types: &Value) -> Result<String, SignerError> {
    let map = types
        .as_object()
        .ok_or_else(|| SignerError::AmbiguousPrimaryType("types is not an object".into()))?;

    let mut referenced: Vec<String> = Vec::new();
    for fields in map.values() {
        let Some(fields) = fields.as_array() else {
            continue;
        };
        for field in fields {
            if let Some(field_type) = field.get("type").and_then(Value::as_str) {
                // Strip array suffixes: `OfferItem[]` references `OfferItem`.
                let base = field_type.split('[').next().unwrap_or(field_type);
                referenced.push(base.to_string());
            }
        }
    }

    let candidates: Vec<&String> = map
        .keys()
        .filter(|name| name.as_str() != "EIP712Domain")
        .filter(|name| !referenced.contains(name))
        .collect();

    match candidates.as_slice() {
        [single] => Ok((*single).clone()),
        [] => Err(SignerError::AmbiguousPrimaryType(
            "no unreferenced struct type found".into(),
        )),
        many => Err(SignerError::AmbiguousPrimaryType(format!(
            "multiple candidates: {}",
            many.iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Synthesizes the `EIP712Domain` type from the fields the domain actually
/// carries, in the canonical field order.
fn domain_type_entry(domain: &Value) -> Value {
    const FIELDS: [(&str, &str); 5] = [
        ("name", "string"),
        ("version", "string"),
        ("chainId", "uint256"),
        ("verifyingContract", "address"),
        ("salt", "bytes32"),
    ];
    let present: Vec<Value> = FIELDS
        .iter()
        .filter(|(name, _)| domain.get(*name).is_some())
        .map(|(name, field_type)| json!({ "name": name, "type": field_type }))
        .collect();
    Value::Array(present)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_quantity("0x5").unwrap(), 5);
        assert_eq!(parse_quantity("0x1").unwrap(), 1);
        assert_eq!(parse_quantity("4").unwrap(), 4);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn infers_single_primary_type() {
        let types = json!({
            "OrderComponents": [{ "name": "offerer", "type": "address" }]
        });
        assert_eq!(infer_primary_type(&types).unwrap(), "OrderComponents");
    }

    #[test]
    fn infers_primary_type_through_references() {
        let types = json!({
            "OrderComponents": [
                { "name": "offer", "type": "OfferItem[]" },
                { "name": "consideration", "type": "ConsiderationItem[]" }
            ],
            "OfferItem": [{ "name": "token", "type": "address" }],
            "ConsiderationItem": [{ "name": "token", "type": "address" }]
        });
        assert_eq!(infer_primary_type(&types).unwrap(), "OrderComponents");
    }

    #[test]
    fn ambiguous_primary_type_is_an_error() {
        let types = json!({
            "A": [{ "name": "x", "type": "uint256" }],
            "B": [{ "name": "y", "type": "uint256" }]
        });
        assert!(matches!(
            infer_primary_type(&types),
            Err(SignerError::AmbiguousPrimaryType(_))
        ));
    }

    #[test]
    fn synthesizes_domain_type_from_present_fields() {
        let domain = json!({ "name": "Seaport", "chainId": 5, "verifyingContract": "0xdef" });
        let entry = domain_type_entry(&domain);
        let names: Vec<&str> = entry
            .as_array()
            .unwrap()
            .iter()
            .map(|field| field["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["name", "chainId", "verifyingContract"]);
    }

    #[test]
    fn typed_data_payload_carries_primary_type_and_domain_entry() {
        let domain = json!({ "name": "Seaport", "chainId": 5 });
        let types = json!({ "OrderComponents": [{ "name": "offerer", "type": "address" }] });
        let value = json!({ "offerer": "0xabc" });
        let payload = build_typed_data_payload(&domain, &types, &value).unwrap();
        assert_eq!(payload["primaryType"], "OrderComponents");
        assert!(payload["types"].get("EIP712Domain").is_some());
        assert_eq!(payload["message"], value);
    }

    #[test]
    fn existing_domain_entry_is_left_alone() {
        let domain = json!({ "name": "X" });
        let types = json!({
            "EIP712Domain": [{ "name": "name", "type": "string" }],
            "Order": [{ "name": "maker", "type": "address" }]
        });
        let payload = build_typed_data_payload(&domain, &types, &json!({})).unwrap();
        assert_eq!(
            payload["types"]["EIP712Domain"],
            json!([{ "name": "name", "type": "string" }])
        );
        assert_eq!(payload["primaryType"], "Order");
    }
}
