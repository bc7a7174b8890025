//! JSON-RPC over HTTP client for Solana nodes.
//!
//! Requests follow the JSON-RPC 2.0 envelope used by the Solana RPC API:
//!
//! ```json
//! POST /
//! {"jsonrpc":"2.0","id":1,"method":"getSlot","params":[{"commitment":"processed"}]}
//!
//! Response:
//! {"jsonrpc":"2.0","id":1,"result":250123456}
//! ```
//!
//! There is no retry here. A failed call is reported once and the caller
//! decides what absence of data means for its metric.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use super::{ClusterRpc, Commitment, RpcError};
use crate::types::{EpochState, Identity};

/// HTTP JSON-RPC client bound to a single endpoint.
///
/// The request timeout is applied to every call and is the only wall-clock
/// bound on a collection cycle.
#[derive(Debug)]
pub struct HttpRpcClient {
    endpoint: Url,
    client: Client,
    request_id: AtomicU64,
}

impl HttpRpcClient {
    /// Constructs a client for `endpoint` with a per-request `timeout`.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("validator-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| RpcError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            endpoint,
            client,
            request_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|source| self.http_error(source))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                endpoint: self.endpoint.to_string(),
                status,
            });
        }

        let body = resp
            .json::<JsonRpcResponse>()
            .await
            .map_err(|source| self.http_error(source))?;

        if let Some(err) = body.error {
            return Err(RpcError::JsonRpc {
                endpoint: self.endpoint.to_string(),
                code: err.code,
                message: err.message,
            });
        }

        let result = body.result.ok_or_else(|| RpcError::MissingResult {
            endpoint: self.endpoint.to_string(),
        })?;

        serde_json::from_value(result).map_err(|source| RpcError::Decode {
            endpoint: self.endpoint.to_string(),
            method,
            source,
        })
    }

    fn http_error(&self, source: reqwest::Error) -> RpcError {
        RpcError::Http {
            endpoint: self.endpoint.to_string(),
            source,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

/// `getBalance` wraps the lamports in an `RpcResponse` with a context.
#[derive(Debug, Deserialize)]
struct BalanceResponse {
    value: u64,
}

fn commitment(level: Commitment) -> Value {
    json!({ "commitment": level })
}

#[async_trait]
impl ClusterRpc for HttpRpcClient {
    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn get_slot(&self) -> Result<u64, RpcError> {
        self.call("getSlot", json!([commitment(Commitment::Processed)]))
            .await
    }

    async fn get_balance(&self, identity: &Identity) -> Result<u64, RpcError> {
        let resp: BalanceResponse = self
            .call(
                "getBalance",
                json!([identity.as_str(), commitment(Commitment::Processed)]),
            )
            .await?;
        Ok(resp.value)
    }

    async fn get_epoch_info(&self) -> Result<EpochState, RpcError> {
        self.call("getEpochInfo", json!([commitment(Commitment::Finalized)]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> HttpRpcClient {
        let url = Url::parse(&server.uri()).expect("mock server uri");
        HttpRpcClient::new(url, Duration::from_secs(2)).expect("client should build")
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": result,
        }))
    }

    #[tokio::test]
    async fn get_slot_sends_processed_commitment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "jsonrpc": "2.0",
                "method": "getSlot",
                "params": [{"commitment": "processed"}],
            })))
            .respond_with(rpc_result(json!(250_123_456u64)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.get_slot().await.expect("slot"), 250_123_456);
        server.verify().await;
    }

    #[tokio::test]
    async fn get_balance_unwraps_context_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getBalance",
                "params": ["7Np41oeYqPefeNQEHSv1UDhYrehxin3NStELsSKCT4K2"],
            })))
            .respond_with(rpc_result(json!({
                "context": {"slot": 1, "apiVersion": "1.18.22"},
                "value": 1_500_000_000u64,
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let id = Identity::from("7Np41oeYqPefeNQEHSv1UDhYrehxin3NStELsSKCT4K2");
        assert_eq!(client.get_balance(&id).await.expect("balance"), 1_500_000_000);
    }

    #[tokio::test]
    async fn get_epoch_info_keeps_missing_fields_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getEpochInfo",
                "params": [{"commitment": "finalized"}],
            })))
            .respond_with(rpc_result(json!({
                "absoluteSlot": 166598,
                "epoch": 27,
                "slotIndex": 2790,
                "slotsInEpoch": 8192,
                "transactionCount": 22661093,
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let info = client.get_epoch_info().await.expect("epoch info");
        assert_eq!(info.epoch, 27);
        assert_eq!(info.slot_index, 2790);
        assert_eq!(info.absolute_slot, 166_598);
        assert_eq!(info.block_height, None);
        assert_eq!(info.transaction_count, Some(22_661_093));
    }

    #[tokio::test]
    async fn json_rpc_error_object_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32005, "message": "Node is behind by 42 slots"},
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        match client.get_slot().await {
            Err(RpcError::JsonRpc { code, message, .. }) => {
                assert_eq!(code, -32005);
                assert!(message.contains("behind"));
            }
            other => panic!("expected JSON-RPC error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.get_slot().await,
            Err(RpcError::Status { status, .. }) if status.as_u16() == 503
        ));
    }

    #[tokio::test]
    async fn unexpected_result_shape_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!("not a slot")))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.get_slot().await,
            Err(RpcError::Decode { method: "getSlot", .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_http_error() {
        // Port 9 (discard) on loopback is not expected to accept connections.
        let url = Url::parse("http://127.0.0.1:9").expect("url");
        let client = HttpRpcClient::new(url, Duration::from_millis(500)).expect("client");
        assert!(matches!(client.get_slot().await, Err(RpcError::Http { .. })));
    }
}
