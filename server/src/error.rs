use alloy_primitives::Address;
use thiserror::Error;

/// Failures the relay contains at the smallest possible scope.
///
/// Only [`RelayError::StartupAuthorization`] is allowed to stop the process; every other
/// variant is logged by the component that produced it and the relay keeps going.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A delivered event is missing or has undecodable required fields.
    #[error("malformed {event} event: {reason}")]
    MalformedEvent { event: &'static str, reason: String },

    /// A single response submission was rejected or timed out.
    #[error("response submission as {identity} failed: {cause:#}")]
    Submission {
        identity: Address,
        cause: anyhow::Error,
    },

    /// The operator could not be authorized on the data contract.
    #[error("operator {operator} could not be authorized: {cause:#}")]
    StartupAuthorization {
        operator: Address,
        cause: anyhow::Error,
    },

    /// The event feed reported an error for one delivery.
    #[error("subscription delivery failed: {0:#}")]
    TransportSubscription(anyhow::Error),
}

impl RelayError {
    pub fn malformed(event: &'static str, reason: impl Into<String>) -> Self {
        RelayError::MalformedEvent {
            event,
            reason: reason.into(),
        }
    }
}
