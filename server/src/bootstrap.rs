use crate::boundary::LedgerBoundary;
use crate::client::ledger_client::LedgerClient;
use crate::error::RelayError;
use crate::subscription::Subscription;
use alloy_primitives::Address;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Uninitialized,
    AccountsResolved,
    RegistrationCheckPending,
    /// Terminal until shutdown.
    Subscribed,
}

/// The accounts the relay acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatingAccounts {
    /// Sends the one-time authorization.
    pub operator: Address,
    /// The oracles, the latter half of the node's accounts.
    pub oracle_pool: Vec<Address>,
}

impl OperatingAccounts {
    pub fn from_accounts(accounts: &[Address]) -> Result<Self> {
        let operator = *accounts
            .first()
            .ok_or_else(|| anyhow!("ledger node has no unlocked accounts"))?;
        Ok(Self {
            operator,
            oracle_pool: accounts[accounts.len() / 2..].to_vec(),
        })
    }
}

pub struct Subscriptions {
    pub registrations: Subscription,
    pub requests: Subscription,
}

pub struct Bootstrap<L: LedgerClient> {
    pub boundary: Arc<LedgerBoundary<L>>,
    pub register_pool: bool,
    pub from_block: u64,
    phase: RelayPhase,
}

impl<L: LedgerClient> Bootstrap<L> {
    pub fn new(boundary: Arc<LedgerBoundary<L>>, register_pool: bool, from_block: u64) -> Self {
        Self {
            boundary,
            register_pool,
            from_block,
            phase: RelayPhase::Uninitialized,
        }
    }

    pub fn phase(&self) -> RelayPhase {
        self.phase
    }

    /// Drives the relay from `Uninitialized` to `Subscribed`.
    ///
    /// 1. Lists the node's accounts and picks the operator and the oracle pool.
    /// 2. Makes sure the app contract is authorized on the data contract. Failing to do so
    ///    stops here, since every response would be rejected afterwards.
    /// 3. Starts the oracle pool registrations without waiting for them.
    /// 4. Subscribes to both feeds from `from_block`.
    pub async fn run(&mut self) -> Result<Subscriptions> {
        let accounts = self.resolve_accounts().await?;

        self.enter(RelayPhase::RegistrationCheckPending);
        self.ensure_operator_authorized(accounts.operator).await?;

        if self.register_pool {
            self.register_oracle_pool(accounts.oracle_pool).await;
        } else {
            info!("oracle pool registration is disabled");
        }

        let subscriptions = Subscriptions {
            registrations: self.boundary.subscribe_registrations(self.from_block),
            requests: self.boundary.subscribe_requests(self.from_block),
        };
        self.enter(RelayPhase::Subscribed);
        info!("relay subscribed from block {}", self.from_block);
        Ok(subscriptions)
    }

    /// Lists the node's accounts and picks the operator and the oracle pool.
    pub async fn resolve_accounts(&mut self) -> Result<OperatingAccounts> {
        let accounts = OperatingAccounts::from_accounts(&self.boundary.accounts().await?)?;
        self.enter(RelayPhase::AccountsResolved);
        info!(
            "operator={} oracle_pool_size={}",
            accounts.operator,
            accounts.oracle_pool.len()
        );
        Ok(accounts)
    }

    fn enter(&mut self, phase: RelayPhase) {
        debug!("relay phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    async fn ensure_operator_authorized(&self, operator: Address) -> Result<(), RelayError> {
        let authorized = self
            .boundary
            .is_operator_authorized(operator)
            .await
            .map_err(|cause| RelayError::StartupAuthorization { operator, cause })?;
        if authorized {
            info!("app contract is authorized");
            return Ok(());
        }
        info!("app contract is not authorized. calling authorize contract");
        self.boundary
            .authorize_operator(operator)
            .await
            .map_err(|cause| RelayError::StartupAuthorization { operator, cause })
    }

    /// Spawns one registration per pool account. Failures are logged per account.
    pub async fn register_oracle_pool(&self, pool: Vec<Address>) -> Vec<JoinHandle<()>> {
        let fee = match self.boundary.registration_fee().await {
            Ok(fee) => fee,
            Err(e) => {
                warn!("skip oracle pool registration: {:?}", e);
                return vec![];
            }
        };
        info!("registering {} oracles with fee {}", pool.len(), fee);
        pool.into_iter()
            .map(|identity| {
                let boundary = self.boundary.clone();
                tokio::spawn(async move {
                    match boundary.register_identity(identity, fee).await {
                        Ok(index_set) => {
                            info!("oracle {} holds indexes {:?}", identity, index_set)
                        }
                        Err(e) => error!("failed to register oracle {}: {:?}", identity, e),
                    }
                })
            })
            .collect()
    }
}
