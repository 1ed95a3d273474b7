use crate::client::ledger_client::{LedgerClient, LogEntry, LogFilter};
use alloy_primitives::{Address, B256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One item of an event feed: a log, or a transport error reported in its place.
pub type Delivery = anyhow::Result<LogEntry>;

#[derive(Debug, Clone, Copy)]
pub struct SubscriptionConfig {
    pub poll_interval: Duration,
    /// Max number of blocks per `eth_getLogs` call.
    pub batch_blocks: u64,
    pub channel_capacity: usize,
}

/// A lazy, infinite sequence of deliveries. Once it yields `None` it is closed for good.
///
/// Dropping the subscription stops the poller behind it.
pub struct Subscription {
    receiver: mpsc::Receiver<Delivery>,
    poller: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn from_receiver(receiver: mpsc::Receiver<Delivery>) -> Self {
        Self {
            receiver,
            poller: None,
        }
    }

    pub async fn next(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollProgress {
    Behind,
    CaughtUp,
    Closed,
}

/// Follows the logs of one event of one contract, from `from_block` to the chain head and on.
pub struct LogPoller<L: LedgerClient> {
    pub client: Arc<L>,
    pub address: Address,
    pub topic: B256,
    pub from_block: u64,
    pub config: SubscriptionConfig,
}

impl<L: LedgerClient> LogPoller<L> {
    pub fn subscribe(self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity.max(1));
        let poller = tokio::spawn(self.run(sender));
        Subscription {
            receiver,
            poller: Some(poller),
        }
    }

    async fn run(mut self, sender: mpsc::Sender<Delivery>) {
        info!(
            "start log subscription: address={} topic={} from_block={}",
            self.address, self.topic, self.from_block
        );
        loop {
            match self.poll(&sender).await {
                Ok(PollProgress::Behind) => continue,
                Ok(PollProgress::CaughtUp) => {}
                Ok(PollProgress::Closed) => break,
                Err(e) => {
                    if sender.send(Err(e)).await.is_err() {
                        break;
                    }
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
        info!("stop log subscription: topic={}", self.topic);
    }

    async fn poll(&mut self, sender: &mpsc::Sender<Delivery>) -> anyhow::Result<PollProgress> {
        if sender.is_closed() {
            return Ok(PollProgress::Closed);
        }
        let head = self.client.block_number().await?;
        if self.from_block > head {
            return Ok(PollProgress::CaughtUp);
        }
        let to_block = head.min(
            self.from_block
                .saturating_add(self.config.batch_blocks.max(1) - 1),
        );
        let filter = LogFilter {
            address: self.address,
            topic: self.topic,
            from_block: self.from_block,
            to_block,
        };
        let logs = self.client.get_logs(&filter).await?;
        debug!(
            "fetched logs: topic={} from={} to={} count={}",
            self.topic,
            self.from_block,
            to_block,
            logs.len()
        );
        for log in logs {
            if sender.send(Ok(log)).await.is_err() {
                return Ok(PollProgress::Closed);
            }
        }
        self.from_block = to_block + 1;
        if to_block == head {
            Ok(PollProgress::CaughtUp)
        } else {
            Ok(PollProgress::Behind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ledger_client::{TransactionReceipt, TransactionRequest};
    use alloy_primitives::{Bytes, U64};
    use anyhow::anyhow;
    use axum::async_trait;
    use std::sync::Mutex;

    struct MockLedgerClient {
        head: u64,
        logs: Vec<LogEntry>,
        failures_before_success: Mutex<u32>,
        filters: Mutex<Vec<LogFilter>>,
    }

    #[async_trait]
    impl LedgerClient for MockLedgerClient {
        async fn accounts(&self) -> anyhow::Result<Vec<Address>> {
            Ok(vec![])
        }
        async fn block_number(&self) -> anyhow::Result<u64> {
            let mut failures = self.failures_before_success.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(anyhow!("connection refused"));
            }
            Ok(self.head)
        }
        async fn call(
            &self,
            _from: Option<Address>,
            _to: Address,
            _data: Bytes,
        ) -> anyhow::Result<Bytes> {
            Err(anyhow!("unimplemented"))
        }
        async fn send_transaction(
            &self,
            _tx: TransactionRequest,
        ) -> anyhow::Result<TransactionReceipt> {
            Err(anyhow!("unimplemented"))
        }
        async fn get_logs(&self, filter: &LogFilter) -> anyhow::Result<Vec<LogEntry>> {
            self.filters.lock().unwrap().push(filter.clone());
            Ok(self
                .logs
                .iter()
                .filter(|log| {
                    let number = log.block_number.map(|n| n.to::<u64>()).unwrap_or_default();
                    number >= filter.from_block && number <= filter.to_block
                })
                .cloned()
                .collect())
        }
    }

    fn log_at(block: u64) -> LogEntry {
        LogEntry {
            address: Address::repeat_byte(0xcc),
            topics: vec![B256::repeat_byte(0x01)],
            data: Bytes::new(),
            block_number: Some(U64::from(block)),
            transaction_hash: None,
            log_index: None,
        }
    }

    fn poller(client: Arc<MockLedgerClient>, batch_blocks: u64) -> LogPoller<MockLedgerClient> {
        LogPoller {
            client,
            address: Address::repeat_byte(0xcc),
            topic: B256::repeat_byte(0x01),
            from_block: 0,
            config: SubscriptionConfig {
                poll_interval: Duration::from_millis(10),
                batch_blocks,
                channel_capacity: 4,
            },
        }
    }

    #[tokio::test]
    async fn test_replays_history_in_batches() {
        let client = Arc::new(MockLedgerClient {
            head: 25,
            logs: vec![log_at(0), log_at(3), log_at(12), log_at(25)],
            failures_before_success: Mutex::new(0),
            filters: Mutex::new(vec![]),
        });
        let mut subscription = poller(client.clone(), 10).subscribe();

        let mut blocks = vec![];
        for _ in 0..4 {
            let log = subscription.next().await.unwrap().unwrap();
            blocks.push(log.block_number.unwrap().to::<u64>());
        }
        assert_eq!(blocks, vec![0, 3, 12, 25]);

        let filters = client.filters.lock().unwrap().clone();
        assert_eq!((filters[0].from_block, filters[0].to_block), (0, 9));
        assert_eq!((filters[1].from_block, filters[1].to_block), (10, 19));
        assert_eq!((filters[2].from_block, filters[2].to_block), (20, 25));
    }

    #[tokio::test]
    async fn test_transport_error_is_delivered_and_polling_continues() {
        let client = Arc::new(MockLedgerClient {
            head: 5,
            logs: vec![log_at(5)],
            failures_before_success: Mutex::new(1),
            filters: Mutex::new(vec![]),
        });
        let mut subscription = poller(client, 100).subscribe();

        let first = subscription.next().await.unwrap();
        assert!(first.is_err());
        let second = subscription.next().await.unwrap().unwrap();
        assert_eq!(second.block_number, Some(U64::from(5)));
    }

    #[tokio::test]
    async fn test_subscription_from_receiver_closes() {
        let (sender, receiver) = mpsc::channel(1);
        let mut subscription = Subscription::from_receiver(receiver);
        sender.send(Ok(log_at(1))).await.unwrap();
        drop(sender);
        assert!(subscription.next().await.unwrap().is_ok());
        assert!(subscription.next().await.is_none());
    }
}
