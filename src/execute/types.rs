use serde::Deserialize;
use serde_json::{Map, Value};

use crate::execute::error::ExecuteError;
use crate::wallet::TransactionRequest;

/// One fetch of the `/execute/*` endpoints: the ordered step list plus any
/// follow-up query parameters the server wants echoed back.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponse {
    pub steps: Vec<Step>,
    #[serde(default)]
    pub query: Map<String, Value>,
}

impl ExecuteResponse {
    /// Validates a raw response body. A body carrying an `error` field or
    /// missing `steps` fails the whole operation, surfacing the body itself.
    pub fn from_value(body: Value) -> Result<Self, ExecuteError> {
        let has_error = body
            .as_object()
            .is_some_and(|map| map.get("error").is_some_and(|e| !e.is_null()));
        if has_error || body.get("steps").is_none() {
            return Err(ExecuteError::Api { body });
        }
        serde_json::from_value(body.clone()).map_err(|_| ExecuteError::Api { body })
    }

    /// Index of the first step still waiting on a side effect, ignoring the
    /// given indices.
    pub fn first_incomplete(&self, skip: &std::collections::BTreeSet<usize>) -> Option<usize> {
        self.steps
            .iter()
            .enumerate()
            .find(|(index, step)| step.status == StepStatus::Incomplete && !skip.contains(index))
            .map(|(index, _)| index)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: String,
    pub status: StepStatus,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Step {
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|data| !data.is_null())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Complete,
    Incomplete,
}

/// Closed view over the server's string-tagged step kinds. Payload shapes are
/// validated here, at the boundary; kinds we do not understand become
/// [`StepAction::Unknown`] so a newer server cannot crash the loop.
#[derive(Debug, Clone)]
pub enum StepAction {
    Transaction(TransactionRequest),
    Signature(SignatureRequest),
    Request(OrderPost),
    Confirmation,
    Unknown(String),
}

#[derive(Debug, Clone)]
pub enum SignatureRequest {
    /// Raw message signature over the decoded bytes of `data.message`.
    Eip191 { message: Vec<u8> },
    /// Typed-data signature over `data.domain` / `data.types` / `data.value`.
    Eip712 {
        domain: Value,
        types: Value,
        value: Value,
    },
}

#[derive(Debug, Clone)]
pub struct OrderPost {
    /// Path resolved against the execute URL's origin.
    pub endpoint: String,
    pub body: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignaturePayload {
    signature_kind: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    domain: Option<Value>,
    #[serde(default)]
    types: Option<Value>,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RequestPayload {
    endpoint: String,
    body: Value,
}

impl StepAction {
    pub fn parse(index: usize, kind: &str, data: Value) -> Result<Self, ExecuteError> {
        let malformed = |reason: String| ExecuteError::MalformedStep {
            index,
            kind: kind.to_string(),
            reason,
        };

        match kind {
            "transaction" => {
                let tx: TransactionRequest =
                    serde_json::from_value(data).map_err(|err| malformed(err.to_string()))?;
                Ok(StepAction::Transaction(tx))
            }
            "signature" => {
                let payload: SignaturePayload =
                    serde_json::from_value(data).map_err(|err| malformed(err.to_string()))?;
                match payload.signature_kind.as_str() {
                    "eip191" => {
                        let message = payload
                            .message
                            .ok_or_else(|| malformed("eip191 payload missing message".into()))?;
                        let bytes = decode_hex_message(&message)
                            .map_err(|err| malformed(format!("message is not hex: {err}")))?;
                        Ok(StepAction::Signature(SignatureRequest::Eip191 {
                            message: bytes,
                        }))
                    }
                    "eip712" => {
                        let domain = payload
                            .domain
                            .ok_or_else(|| malformed("eip712 payload missing domain".into()))?;
                        let types = payload
                            .types
                            .ok_or_else(|| malformed("eip712 payload missing types".into()))?;
                        let value = payload
                            .value
                            .ok_or_else(|| malformed("eip712 payload missing value".into()))?;
                        Ok(StepAction::Signature(SignatureRequest::Eip712 {
                            domain,
                            types,
                            value,
                        }))
                    }
                    other => Err(malformed(format!("unsupported signature kind `{other}`"))),
                }
            }
            "request" => {
                let payload: RequestPayload =
                    serde_json::from_value(data).map_err(|err| malformed(err.to_string()))?;
                Ok(StepAction::Request(OrderPost {
                    endpoint: payload.endpoint,
                    body: payload.body,
                }))
            }
            "confirmation" => Ok(StepAction::Confirmation),
            other => Ok(StepAction::Unknown(other.to_string())),
        }
    }
}

fn decode_hex_message(message: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let stripped = message.strip_prefix("0x").unwrap_or(message);
    hex::decode(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_with_error_field_surfaces_body() {
        let body = json!({ "error": "Not found", "steps": [] });
        let err = ExecuteResponse::from_value(body.clone()).unwrap_err();
        match err {
            ExecuteError::Api { body: surfaced } => assert_eq!(surfaced, body),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn response_missing_steps_surfaces_body() {
        let body = json!({ "message": "try later" });
        assert!(matches!(
            ExecuteResponse::from_value(body),
            Err(ExecuteError::Api { .. })
        ));
    }

    #[test]
    fn parses_step_list_and_locates_first_incomplete() {
        let body = json!({
            "steps": [
                { "action": "Approve", "kind": "transaction", "status": "complete" },
                { "action": "Confirm", "kind": "transaction", "status": "incomplete",
                  "data": { "from": "0xa", "to": "0xb" } },
                { "kind": "confirmation", "status": "incomplete" }
            ],
            "query": { "taker": "0xabc" }
        });
        let response = ExecuteResponse::from_value(body).unwrap();
        assert_eq!(response.steps.len(), 3);
        assert_eq!(response.first_incomplete(&Default::default()), Some(1));
        assert_eq!(response.query.get("taker"), Some(&json!("0xabc")));
    }

    #[test]
    fn first_incomplete_skips_excluded_indices() {
        let body = json!({
            "steps": [
                { "kind": "mystery", "status": "incomplete", "data": {} },
                { "kind": "confirmation", "status": "incomplete" }
            ]
        });
        let response = ExecuteResponse::from_value(body).unwrap();
        let skip = std::collections::BTreeSet::from([0usize]);
        assert_eq!(response.first_incomplete(&skip), Some(1));
    }

    #[test]
    fn null_step_data_counts_as_absent() {
        let step = Step {
            action: None,
            description: None,
            kind: "transaction".into(),
            status: StepStatus::Incomplete,
            data: Some(Value::Null),
        };
        assert!(!step.has_data());
    }

    #[test]
    fn parses_eip191_signature_payload() {
        let data = json!({ "signatureKind": "eip191", "message": "0xdeadbeef" });
        let action = StepAction::parse(0, "signature", data).unwrap();
        match action {
            StepAction::Signature(SignatureRequest::Eip191 { message }) => {
                assert_eq!(message, vec![0xde, 0xad, 0xbe, 0xef]);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn parses_eip712_signature_payload() {
        let data = json!({
            "signatureKind": "eip712",
            "domain": { "name": "Seaport" },
            "types": { "OrderComponents": [] },
            "value": { "offerer": "0xabc" }
        });
        let action = StepAction::parse(1, "signature", data).unwrap();
        assert!(matches!(
            action,
            StepAction::Signature(SignatureRequest::Eip712 { .. })
        ));
    }

    #[test]
    fn eip712_without_domain_is_malformed() {
        let data = json!({ "signatureKind": "eip712", "types": {}, "value": {} });
        assert!(matches!(
            StepAction::parse(2, "signature", data),
            Err(ExecuteError::MalformedStep { index: 2, .. })
        ));
    }

    #[test]
    fn unknown_kind_is_a_safe_variant() {
        let action = StepAction::parse(0, "teleport", json!({})).unwrap();
        assert!(matches!(action, StepAction::Unknown(kind) if kind == "teleport"));
    }

    #[test]
    fn request_payload_requires_endpoint_and_body() {
        let data = json!({ "endpoint": "/order/v2", "body": { "order": {} } });
        let action = StepAction::parse(0, "request", data).unwrap();
        match action {
            StepAction::Request(post) => {
                assert_eq!(post.endpoint, "/order/v2");
                assert_eq!(post.body, json!({ "order": {} }));
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert!(matches!(
            StepAction::parse(0, "request", json!({ "body": {} })),
            Err(ExecuteError::MalformedStep { .. })
        ));
    }
}
