use crate::client::abi::{self, Token, WordReader};
use crate::client::ledger_client::{LedgerClient, TransactionRequest};
use crate::dispatcher::{ResponseSubmission, ResponseSubmitter};
use crate::event::Registration;
use crate::subscription::{LogPoller, Subscription, SubscriptionConfig};
use alloy_primitives::{Address, Bytes, U256, U64};
use anyhow::{anyhow, Context, Result};
use axum::async_trait;
use std::sync::Arc;
use tracing::info;

/// Deployed addresses of the flight surety contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contracts {
    /// Emits the oracle events and takes registrations and responses.
    pub app: Address,
    /// Holds the state and the list of authorized app contracts.
    pub data: Address,
}

/// Everything the relay asks of the ledger goes through here.
pub struct LedgerBoundary<L: LedgerClient> {
    client: Arc<L>,
    contracts: Contracts,
    gas_limit: u64,
    subscription: SubscriptionConfig,
}

impl<L: LedgerClient> LedgerBoundary<L> {
    pub fn new(
        client: Arc<L>,
        contracts: Contracts,
        gas_limit: u64,
        subscription: SubscriptionConfig,
    ) -> Self {
        Self {
            client,
            contracts,
            gas_limit,
            subscription,
        }
    }

    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.client.accounts().await.context("failed to list accounts")
    }

    pub async fn registration_fee(&self) -> Result<U256> {
        let output = self
            .client
            .call(None, self.contracts.app, abi::encode_call(abi::REGISTRATION_FEE, &[]))
            .await
            .context("failed to query registration fee")?;
        WordReader::new(&output)
            .uint(0)
            .ok_or_else(|| anyhow!("invalid registration fee output: {:?}", output))
    }

    /// Registers `identity` as an oracle, paying `fee`, and returns the indexes the contract
    /// assigned to it in the `OracleRegistered` event of the mined transaction.
    pub async fn register_identity(&self, identity: Address, fee: U256) -> Result<Vec<u8>> {
        let receipt = self
            .client
            .send_transaction(self.transaction(
                identity,
                self.contracts.app,
                Some(fee),
                abi::encode_call(abi::REGISTER_ORACLE, &[]),
            ))
            .await
            .with_context(|| format!("failed to register oracle {identity}"))?;
        let topic = abi::event_topic(abi::ORACLE_REGISTERED_EVENT);
        let registration = receipt
            .logs
            .iter()
            .filter(|log| log.address == self.contracts.app && log.topics.first() == Some(&topic))
            .filter_map(|log| Registration::try_from(log).ok())
            .find(|registration| registration.identity == identity)
            .ok_or_else(|| {
                anyhow!(
                    "no registration of oracle {} in tx {}",
                    identity,
                    receipt.transaction_hash
                )
            })?;
        info!(
            "registered oracle: identity={} tx={}",
            identity, receipt.transaction_hash
        );
        Ok(registration.index_set)
    }

    pub async fn is_operator_authorized(&self, operator: Address) -> Result<bool> {
        let output = self
            .client
            .call(
                Some(operator),
                self.contracts.app,
                abi::encode_call(abi::AM_I_AUTHORIZED, &[]),
            )
            .await
            .context("failed to query authorization")?;
        WordReader::new(&output)
            .bool(0)
            .ok_or_else(|| anyhow!("invalid authorization output: {:?}", output))
    }

    /// Authorizes the app contract on the data contract, sent by `operator`.
    pub async fn authorize_operator(&self, operator: Address) -> Result<()> {
        let receipt = self
            .client
            .send_transaction(self.transaction(
                operator,
                self.contracts.data,
                None,
                abi::encode_call(abi::AUTHORIZE_CONTRACT, &[Token::Address(self.contracts.app)]),
            ))
            .await
            .context("failed to authorize app contract")?;
        info!(
            "authorized app contract {}: tx={}",
            self.contracts.app, receipt.transaction_hash
        );
        Ok(())
    }

    pub fn subscribe_registrations(&self, from_block: u64) -> Subscription {
        self.subscribe(abi::ORACLE_REGISTERED_EVENT, from_block)
    }

    pub fn subscribe_requests(&self, from_block: u64) -> Subscription {
        self.subscribe(abi::ORACLE_REQUEST_EVENT, from_block)
    }

    fn subscribe(&self, event: &str, from_block: u64) -> Subscription {
        LogPoller {
            client: self.client.clone(),
            address: self.contracts.app,
            topic: abi::event_topic(event),
            from_block,
            config: self.subscription,
        }
        .subscribe()
    }

    fn transaction(
        &self,
        from: Address,
        to: Address,
        value: Option<U256>,
        data: Bytes,
    ) -> TransactionRequest {
        TransactionRequest {
            from,
            to,
            gas: Some(U64::from(self.gas_limit)),
            value,
            data,
        }
    }
}

#[async_trait]
impl<L: LedgerClient> ResponseSubmitter for LedgerBoundary<L> {
    async fn submit_response(&self, submission: &ResponseSubmission) -> Result<()> {
        let data = abi::encode_call(
            abi::SUBMIT_ORACLE_RESPONSE,
            &[
                Token::Uint(U256::from(submission.index)),
                Token::Address(submission.context),
                Token::FixedBytes(submission.subject_key),
                Token::Uint(submission.timestamp),
                Token::Uint(U256::from(submission.status_code)),
            ],
        );
        self.client
            .send_transaction(self.transaction(
                submission.identity,
                self.contracts.app,
                None,
                data,
            ))
            .await?;
        Ok(())
    }
}
