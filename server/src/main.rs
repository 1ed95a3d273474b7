use anyhow::Context;
use clap::Parser;
use oracle_relay::bootstrap::Bootstrap;
use oracle_relay::boundary::LedgerBoundary;
use oracle_relay::client::rpc_ledger_client::RpcLedgerClient;
use oracle_relay::config::Config;
use oracle_relay::data::oracle_registry::OracleRegistry;
use oracle_relay::dispatcher::ResponseDispatcher;
use oracle_relay::ingestor::EventIngestor;
use oracle_relay::status_code::EntropyStatusCode;
use oracle_relay::web::{start_http_server_task, SharedState};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tracing::info;
use tracing_subscriber::filter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // start tracing
    let filter = filter::EnvFilter::from_default_env().add_directive("oracle_relay=info".parse()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
    info!("start oracle-relay");

    let client = RpcLedgerClient::new(
        config.ledger_rpc_url.clone(),
        Duration::from_secs(config.rpc_timeout_seconds),
        config.receipt_polling(),
    )?;
    let boundary = Arc::new(LedgerBoundary::new(
        Arc::new(client),
        config.contracts(),
        config.gas_limit,
        config.subscription(),
    ));

    // Authorize, register the oracle pool and subscribe
    let mut bootstrap = Bootstrap::new(
        boundary.clone(),
        !config.skip_pool_registration,
        config.from_block,
    );
    let subscriptions = bootstrap.run().await.context("relay startup failed")?;

    // Start ingestion
    let registry = Arc::new(OracleRegistry::default());
    let dispatcher = ResponseDispatcher {
        registry: registry.clone(),
        submitter: boundary,
        status_codes: Arc::new(EntropyStatusCode),
    };
    let ingestor = Arc::new(EventIngestor::new(registry.clone(), dispatcher));
    let (registration_task, request_task) = ingestor.start(subscriptions);

    // Start HTTP server
    let http_server_task =
        start_http_server_task(config.http_server_addr.as_str(), SharedState { registry });

    // Wait for signal
    select! {
        result = http_server_task => {
            info!("stop http server: {:?}", result);
        }
        result = registration_task => {
            info!("stop registration ingestion: {:?}", result);
        }
        result = request_task => {
            info!("stop request ingestion: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c");
        }
    }
    info!("shutdown complete");
    Ok(())
}
