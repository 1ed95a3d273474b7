use crate::client::ledger_client::{
    LedgerClient, LogEntry, LogFilter, TransactionReceipt, TransactionRequest,
};
use alloy_primitives::{Address, Bytes, B256, U64};
use anyhow::{anyhow, Context, Result};
use axum::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RpcResult<T> {
    pub id: i64,
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct RpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<Value>,
    id: i64,
}

impl Default for RpcRequest {
    fn default() -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: "".into(),
            params: vec![],
            id: 1,
        }
    }
}

/// Receipt polling after `eth_sendTransaction`.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolling {
    pub interval: Duration,
    pub attempts: u32,
}

/// JSON-RPC client for a node that holds the relay's unlocked accounts.
pub struct RpcLedgerClient {
    client: reqwest::Client,
    rpc_addr: String,
    receipt_polling: ReceiptPolling,
}

impl RpcLedgerClient {
    pub fn new(rpc_addr: String, timeout: Duration, receipt_polling: ReceiptPolling) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build rpc client")?;
        Ok(Self {
            client,
            rpc_addr,
            receipt_polling,
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        self.request_optional(method, params)
            .await?
            .ok_or_else(|| anyhow!("{} returned no result", method))
    }

    /// Like `request` but a `null` result is not an error.
    async fn request_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Option<T>> {
        let body = RpcRequest {
            method: method.into(),
            params,
            ..Default::default()
        };
        let response = self
            .client
            .post(&self.rpc_addr)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        let response = self.check_response(response).await?;
        let result: RpcResult<T> = response.json().await?;
        if let Some(error) = result.error {
            return Err(anyhow!(
                "{} failed: code={} message={}",
                method,
                error.code,
                error.message
            ));
        }
        Ok(result.result)
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        self.request_optional("eth_getTransactionReceipt", vec![json!(tx_hash)])
            .await
    }

    async fn check_response(&self, response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(anyhow!(
                "Request failed with status: {} body={:?}",
                response.status(),
                response.text().await
            ))
        }
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn accounts(&self) -> Result<Vec<Address>> {
        self.request("eth_accounts", vec![]).await
    }

    async fn block_number(&self) -> Result<u64> {
        let number: U64 = self.request("eth_blockNumber", vec![]).await?;
        Ok(number.to::<u64>())
    }

    async fn call(&self, from: Option<Address>, to: Address, data: Bytes) -> Result<Bytes> {
        let mut call = json!({ "to": to, "data": data });
        if let Some(from) = from {
            call["from"] = json!(from);
        }
        self.request("eth_call", vec![call, json!("latest")]).await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TransactionReceipt> {
        let from = tx.from;
        let tx_hash: B256 = self
            .request("eth_sendTransaction", vec![json!(tx)])
            .await?;
        debug!("sent transaction: from={} hash={}", from, tx_hash);

        for _ in 0..self.receipt_polling.attempts {
            if let Some(receipt) = self.receipt(tx_hash).await? {
                if !receipt.succeeded() {
                    return Err(anyhow!("transaction {} reverted", tx_hash));
                }
                return Ok(receipt);
            }
            tokio::time::sleep(self.receipt_polling.interval).await;
        }
        Err(anyhow!(
            "transaction {} not mined after {} attempts",
            tx_hash,
            self.receipt_polling.attempts
        ))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let params = json!({
            "address": filter.address,
            "topics": [filter.topic],
            "fromBlock": format!("0x{:x}", filter.from_block),
            "toBlock": format!("0x{:x}", filter.to_block),
        });
        self.request("eth_getLogs", vec![params]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    const TX_HASH: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";

    /// Node answering every method with a canned result and recording the requests.
    #[derive(Clone)]
    struct MockNode {
        receipt: Value,
        send_error: Option<Value>,
        requests: Arc<Mutex<Vec<Value>>>,
    }

    impl MockNode {
        fn new(receipt: Value) -> Self {
            Self {
                receipt,
                send_error: None,
                requests: Arc::new(Mutex::new(vec![])),
            }
        }

        fn methods(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r["method"].as_str().unwrap().to_string())
                .collect()
        }

        fn params(&self, method: &str) -> Value {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .find(|r| r["method"] == method)
                .map(|r| r["params"].clone())
                .unwrap()
        }
    }

    async fn handle(State(node): State<MockNode>, Json(request): Json<Value>) -> Json<Value> {
        node.requests.lock().unwrap().push(request.clone());
        let result = match request["method"].as_str() {
            Some("eth_sendTransaction") => {
                if let Some(error) = node.send_error.clone() {
                    return Json(json!({ "jsonrpc": "2.0", "id": request["id"], "error": error }));
                }
                json!(TX_HASH)
            }
            Some("eth_getTransactionReceipt") => node.receipt.clone(),
            Some("eth_getLogs") => json!([]),
            Some("eth_call") => json!("0x01"),
            _ => Value::Null,
        };
        Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }))
    }

    async fn serve(node: MockNode) -> RpcLedgerClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/", post(handle)).with_state(node);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        RpcLedgerClient::new(
            format!("http://{addr}"),
            Duration::from_secs(5),
            ReceiptPolling {
                interval: Duration::from_millis(5),
                attempts: 3,
            },
        )
        .unwrap()
    }

    fn transaction() -> TransactionRequest {
        TransactionRequest {
            from: Address::repeat_byte(0x0b),
            to: Address::repeat_byte(0xa0),
            gas: Some(U64::from(3_000_000)),
            value: None,
            data: Bytes::from(vec![0xab]),
        }
    }

    #[tokio::test]
    async fn test_send_transaction_mined() {
        let node = MockNode::new(json!({
            "transactionHash": TX_HASH,
            "blockNumber": "0x1",
            "status": "0x1",
            "logs": []
        }));
        let client = serve(node.clone()).await;

        let receipt = client.send_transaction(transaction()).await.unwrap();
        assert_eq!(receipt.transaction_hash, B256::repeat_byte(0x22));
        assert_eq!(
            node.methods(),
            vec!["eth_sendTransaction", "eth_getTransactionReceipt"]
        );
        let params = node.params("eth_sendTransaction");
        assert_eq!(params[0]["from"], json!(Address::repeat_byte(0x0b)));
        assert_eq!(params[0]["gas"], "0x2dc6c0");
        assert_eq!(params[0]["data"], "0xab");
    }

    #[tokio::test]
    async fn test_send_transaction_reverted() {
        let node = MockNode::new(json!({
            "transactionHash": TX_HASH,
            "blockNumber": "0x1",
            "status": "0x0"
        }));
        let client = serve(node).await;

        let err = client.send_transaction(transaction()).await.unwrap_err();
        assert!(err.to_string().ends_with("reverted"));
    }

    #[tokio::test]
    async fn test_send_transaction_not_mined() {
        let node = MockNode::new(Value::Null);
        let client = serve(node.clone()).await;

        let err = client.send_transaction(transaction()).await.unwrap_err();
        assert!(err.to_string().contains("not mined after 3 attempts"));
        let receipt_queries = node
            .methods()
            .iter()
            .filter(|m| *m == "eth_getTransactionReceipt")
            .count();
        assert_eq!(receipt_queries, 3);
    }

    #[tokio::test]
    async fn test_send_transaction_rpc_error() {
        let mut node = MockNode::new(Value::Null);
        node.send_error = Some(json!({ "code": -32000, "message": "sender account not recognized" }));
        let client = serve(node.clone()).await;

        let err = client.send_transaction(transaction()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "eth_sendTransaction failed: code=-32000 message=sender account not recognized"
        );
        assert_eq!(node.methods(), vec!["eth_sendTransaction"]);
    }

    #[tokio::test]
    async fn test_get_logs_block_range() {
        let node = MockNode::new(Value::Null);
        let client = serve(node.clone()).await;
        let filter = LogFilter {
            address: Address::repeat_byte(0xa0),
            topic: B256::repeat_byte(0x11),
            from_block: 0,
            to_block: 26,
        };

        let logs = client.get_logs(&filter).await.unwrap();
        assert!(logs.is_empty());
        let params = node.params("eth_getLogs");
        assert_eq!(params[0]["fromBlock"], "0x0");
        assert_eq!(params[0]["toBlock"], "0x1a");
        assert_eq!(params[0]["address"], json!(filter.address));
        assert_eq!(params[0]["topics"], json!([filter.topic]));
    }

    #[tokio::test]
    async fn test_call_with_and_without_sender() {
        let node = MockNode::new(Value::Null);
        let client = serve(node.clone()).await;
        let operator = Address::repeat_byte(0x01);
        let app = Address::repeat_byte(0xa0);

        let output = client
            .call(Some(operator), app, Bytes::from(vec![0x01, 0x02, 0x03, 0x04]))
            .await
            .unwrap();
        assert_eq!(output.as_ref(), &[0x01]);
        client
            .call(None, app, Bytes::from(vec![0x01, 0x02, 0x03, 0x04]))
            .await
            .unwrap();

        let requests = node.requests.lock().unwrap().clone();
        assert_eq!(requests[0]["params"][0]["from"], json!(operator));
        assert_eq!(requests[0]["params"][0]["data"], "0x01020304");
        assert_eq!(requests[0]["params"][1], "latest");
        assert!(requests[1]["params"][0].get("from").is_none());
    }

    #[test]
    fn test_rpc_request_body() {
        let body = RpcRequest {
            method: "eth_accounts".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "eth_accounts");
        assert_eq!(value["params"], json!([]));
    }

    #[test]
    fn test_rpc_result_with_error() {
        let result: RpcResult<String> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"revert"}}"#,
        )
        .unwrap();
        assert!(result.result.is_none());
        assert_eq!(result.error.unwrap().message, "revert");
    }

    #[test]
    fn test_rpc_result_null_receipt() {
        let result: RpcResult<TransactionReceipt> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(result.result.is_none());
    }
}
