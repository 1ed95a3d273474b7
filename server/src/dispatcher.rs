use crate::data::oracle_registry::OracleRegistry;
use crate::error::RelayError;
use crate::event::RequestEvent;
use crate::status_code::StatusCodeSource;
use alloy_primitives::{Address, B256, U256};
use anyhow::anyhow;
use axum::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// One oracle's answer to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSubmission {
    pub index: u8,
    pub context: Address,
    pub subject_key: B256,
    pub timestamp: U256,
    pub status_code: u8,
    /// The oracle the response is sent as.
    pub identity: Address,
}

impl ResponseSubmission {
    pub fn new(event: &RequestEvent, identity: Address, status_code: u8) -> Self {
        Self {
            index: event.index,
            context: event.context,
            subject_key: event.subject_key,
            timestamp: event.timestamp,
            status_code,
            identity,
        }
    }
}

#[async_trait]
pub trait ResponseSubmitter: Send + Sync + 'static {
    async fn submit_response(&self, submission: &ResponseSubmission) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct SubmissionOutcome {
    pub submission: ResponseSubmission,
    pub result: Result<(), RelayError>,
}

/// The in-flight submissions spawned for one request.
pub struct Dispatch {
    pub event: RequestEvent,
    tasks: Vec<(ResponseSubmission, JoinHandle<Result<(), RelayError>>)>,
}

impl Dispatch {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every submission on its own; a failed one never cuts the others short.
    pub async fn outcomes(self) -> Vec<SubmissionOutcome> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for (submission, task) in self.tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(RelayError::Submission {
                    identity: submission.identity,
                    cause: anyhow!("submission task did not complete: {e}"),
                }),
            };
            outcomes.push(SubmissionOutcome { submission, result });
        }
        outcomes
    }
}

pub struct ResponseDispatcher<R: ResponseSubmitter, S: StatusCodeSource> {
    pub registry: Arc<OracleRegistry>,
    pub submitter: Arc<R>,
    pub status_codes: Arc<S>,
}

impl<R: ResponseSubmitter, S: StatusCodeSource> Clone for ResponseDispatcher<R, S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            submitter: self.submitter.clone(),
            status_codes: self.status_codes.clone(),
        }
    }
}

impl<R: ResponseSubmitter, S: StatusCodeSource> ResponseDispatcher<R, S> {
    /// Spawns one submission per oracle currently holding `event.index` and returns without
    /// waiting for them. Each oracle gets its own status code.
    pub async fn on_request(&self, event: RequestEvent) -> Dispatch {
        let matched = self.registry.matching(event.index).await;
        if matched.is_empty() {
            info!("no oracle holds index {}: {:?}", event.index, event);
            return Dispatch {
                event,
                tasks: vec![],
            };
        }
        info!(
            "dispatching request to {} oracles: {:?}",
            matched.len(),
            event
        );

        let tasks = matched
            .into_iter()
            .map(|record| {
                let submission =
                    ResponseSubmission::new(&event, record.identity, self.status_codes.draw());
                let submitter = self.submitter.clone();
                let spawned = submission.clone();
                let task = tokio::spawn(async move { submit(submitter, spawned).await });
                (submission, task)
            })
            .collect();
        Dispatch { event, tasks }
    }
}

async fn submit<R: ResponseSubmitter>(
    submitter: Arc<R>,
    submission: ResponseSubmission,
) -> Result<(), RelayError> {
    info!(
        "flight response to contract: index={} airline={} flight_key={} timestamp={} status_code={} oracle={}",
        submission.index,
        submission.context,
        submission.subject_key,
        submission.timestamp,
        submission.status_code,
        submission.identity
    );
    submitter
        .submit_response(&submission)
        .await
        .map_err(|cause| {
            let e = RelayError::Submission {
                identity: submission.identity,
                cause,
            };
            error!("{}, submission={:?}", e, submission);
            e
        })
}
