use alloy_primitives::{Address, Bytes, B256, U256, U64};
use axum::async_trait;
use serde::{Deserialize, Serialize};

/// A log emitted by a contract, as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub log_index: Option<U64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topic: B256,
    pub from_block: u64,
    pub to_block: u64,
}

/// A transaction sent from one of the node's unlocked accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl TransactionReceipt {
    /// Pre-byzantium receipts carry no status and are treated as successful.
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| s != U64::ZERO).unwrap_or(true)
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    async fn accounts(&self) -> anyhow::Result<Vec<Address>>;

    async fn block_number(&self) -> anyhow::Result<u64>;

    async fn call(&self, from: Option<Address>, to: Address, data: Bytes) -> anyhow::Result<Bytes>;

    /// Sends the transaction and waits for its receipt. Reverted transactions are errors.
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> anyhow::Result<TransactionReceipt>;

    async fn get_logs(&self, filter: &LogFilter) -> anyhow::Result<Vec<LogEntry>>;
}
