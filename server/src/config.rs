//! Command line and environment configuration of the relay binary.

use crate::boundary::Contracts;
use crate::client::rpc_ledger_client::ReceiptPolling;
use crate::subscription::SubscriptionConfig;
use alloy_primitives::Address;
use clap::Parser;
use serde::Serialize;
use std::time::Duration;

const ABOUT: &str = "
oracle-relay answers flight status requests on behalf of a pool of registered oracles.
";

#[derive(Parser, Serialize, Clone, Debug)]
#[command(about = ABOUT, version)]
pub struct Config {
    /// Address of the ledger JSON-RPC endpoint. The node must hold the relay's accounts unlocked.
    #[clap(
        long,
        visible_alias = "rpc",
        env = "LEDGER_RPC_URL",
        default_value = "http://localhost:8545"
    )]
    pub ledger_rpc_url: String,

    /// Address of the flight surety app contract.
    #[clap(long, env = "APP_ADDRESS")]
    pub app_address: Address,

    /// Address of the flight surety data contract.
    #[clap(long, env = "DATA_ADDRESS")]
    pub data_address: Address,

    /// Listen address of the status API.
    #[clap(long, env = "HTTP_SERVER_ADDR", default_value = "0.0.0.0:3000")]
    pub http_server_addr: String,

    /// Gas limit of every transaction the relay sends.
    #[clap(long, default_value = "3000000")]
    pub gas_limit: u64,

    /// First block of the event replay.
    #[clap(long, default_value = "0")]
    pub from_block: u64,

    /// Interval between log polls once the feeds caught up.
    #[clap(long, default_value = "1000")]
    pub poll_interval_millis: u64,

    /// Max block range of one log query.
    #[clap(long, default_value = "5000")]
    pub log_batch_blocks: u64,

    /// Deliveries buffered per feed.
    #[clap(long, default_value = "256")]
    pub channel_capacity: usize,

    /// Timeout of a single JSON-RPC request.
    #[clap(long, default_value = "30")]
    pub rpc_timeout_seconds: u64,

    /// Max receipt polls after sending a transaction.
    #[clap(long, default_value = "60")]
    pub receipt_poll_attempts: u32,

    /// Do not register the oracle pool at startup.
    #[clap(long, default_value_t = false)]
    pub skip_pool_registration: bool,
}

impl Config {
    pub fn contracts(&self) -> Contracts {
        Contracts {
            app: self.app_address,
            data: self.data_address,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    pub fn subscription(&self) -> SubscriptionConfig {
        SubscriptionConfig {
            poll_interval: self.poll_interval(),
            batch_blocks: self.log_batch_blocks,
            channel_capacity: self.channel_capacity,
        }
    }

    pub fn receipt_polling(&self) -> ReceiptPolling {
        ReceiptPolling {
            interval: self.poll_interval(),
            attempts: self.receipt_poll_attempts,
        }
    }
}
