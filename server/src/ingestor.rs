use crate::bootstrap::Subscriptions;
use crate::data::oracle_registry::OracleRegistry;
use crate::dispatcher::{Dispatch, ResponseDispatcher, ResponseSubmitter};
use crate::error::RelayError;
use crate::event::{Registration, RequestEvent};
use crate::status_code::StatusCodeSource;
use crate::subscription::{Delivery, Subscription};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Turns feed deliveries into registry updates and dispatches.
pub struct EventIngestor<R: ResponseSubmitter, S: StatusCodeSource> {
    pub registry: Arc<OracleRegistry>,
    pub dispatcher: ResponseDispatcher<R, S>,
}

impl<R: ResponseSubmitter, S: StatusCodeSource> EventIngestor<R, S> {
    pub fn new(registry: Arc<OracleRegistry>, dispatcher: ResponseDispatcher<R, S>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Spawns one processing task per feed.
    pub fn start(self: Arc<Self>, subscriptions: Subscriptions) -> (JoinHandle<()>, JoinHandle<()>) {
        let Subscriptions {
            registrations,
            requests,
        } = subscriptions;
        let ingestor = self.clone();
        let registration_task =
            tokio::spawn(async move { ingestor.run_registrations(registrations).await });
        let request_task = tokio::spawn(async move { self.run_requests(requests).await });
        (registration_task, request_task)
    }

    pub async fn run_registrations(&self, mut subscription: Subscription) {
        while let Some(delivery) = subscription.next().await {
            if let Err(e) = self.handle_registration(delivery).await {
                warn!("registration delivery dropped: {}", e);
            }
        }
        warn!("registration feed closed");
    }

    pub async fn run_requests(&self, mut subscription: Subscription) {
        while let Some(delivery) = subscription.next().await {
            match self.handle_request(delivery).await {
                Ok(dispatch) if !dispatch.is_empty() => {
                    tokio::spawn(report(dispatch));
                }
                Ok(_) => {}
                Err(e) => warn!("request delivery dropped: {}", e),
            }
        }
        warn!("request feed closed");
    }

    pub async fn handle_registration(&self, delivery: Delivery) -> Result<Registration, RelayError> {
        let log = delivery.map_err(RelayError::TransportSubscription)?;
        debug!("registration log: {:?}", log);
        let registration = Registration::try_from(&log)?;
        info!(
            "oracle registered: identity={} indexes={:?}",
            registration.identity, registration.index_set
        );
        self.registry
            .upsert(registration.identity, registration.index_set.clone())
            .await;
        Ok(registration)
    }

    /// Decodes the request and starts its dispatch. Does not wait for the submissions.
    pub async fn handle_request(&self, delivery: Delivery) -> Result<Dispatch, RelayError> {
        let log = delivery.map_err(RelayError::TransportSubscription)?;
        debug!("request log: {:?}", log);
        let event = RequestEvent::try_from(&log)?;
        Ok(self.dispatcher.on_request(event).await)
    }
}

async fn report(dispatch: Dispatch) {
    let event = dispatch.event.clone();
    let outcomes = dispatch.outcomes().await;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        error!(
            "{} of {} responses failed: index={} flight_key={}",
            failed,
            outcomes.len(),
            event.index,
            event.subject_key
        );
    } else {
        info!(
            "{} responses submitted: index={} flight_key={}",
            outcomes.len(),
            event.index,
            event.subject_key
        );
    }
}
