use crate::client::abi::{self, WordReader};
use crate::client::ledger_client::LogEntry;
use crate::error::RelayError;
use alloy_primitives::{Address, B256, U256};

/// Number of indexes the contract assigns to every oracle.
pub const INDEXES_PER_ORACLE: usize = 3;

const REGISTRATION: &str = "OracleRegistered";
const REQUEST: &str = "OracleRequest";

/// An `OracleRegistered` confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub identity: Address,
    pub index_set: Vec<u8>,
}

/// An `OracleRequest` asking the holders of `index` to report a flight status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
    pub index: u8,
    /// The airline responsible for the flight. Passed through untouched.
    pub context: Address,
    /// The flight key.
    pub subject_key: B256,
    pub timestamp: U256,
}

fn check_topic(log: &LogEntry, event: &'static str, signature: &str) -> Result<(), RelayError> {
    match log.topics.first() {
        Some(topic) if *topic == abi::event_topic(signature) => Ok(()),
        Some(topic) => Err(RelayError::malformed(event, format!("unexpected topic {topic}"))),
        None => Err(RelayError::malformed(event, "missing topic")),
    }
}

impl TryFrom<&LogEntry> for Registration {
    type Error = RelayError;

    fn try_from(log: &LogEntry) -> Result<Self, Self::Error> {
        check_topic(log, REGISTRATION, abi::ORACLE_REGISTERED_EVENT)?;
        let reader = WordReader::new(&log.data);
        let identity = reader
            .address(0)
            .ok_or_else(|| RelayError::malformed(REGISTRATION, "missing oracle"))?;
        let index_set = (1..=INDEXES_PER_ORACLE)
            .map(|position| reader.uint8(position))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| RelayError::malformed(REGISTRATION, "missing indexes"))?;
        Ok(Registration {
            identity,
            index_set,
        })
    }
}

impl TryFrom<&LogEntry> for RequestEvent {
    type Error = RelayError;

    fn try_from(log: &LogEntry) -> Result<Self, Self::Error> {
        check_topic(log, REQUEST, abi::ORACLE_REQUEST_EVENT)?;
        let reader = WordReader::new(&log.data);
        let index = reader
            .uint8(0)
            .ok_or_else(|| RelayError::malformed(REQUEST, "missing index"))?;
        let context = reader
            .address(1)
            .ok_or_else(|| RelayError::malformed(REQUEST, "missing airline"))?;
        let subject_key = reader
            .fixed_bytes(2)
            .ok_or_else(|| RelayError::malformed(REQUEST, "missing flight key"))?;
        let timestamp = reader
            .uint(3)
            .ok_or_else(|| RelayError::malformed(REQUEST, "missing timestamp"))?;
        Ok(RequestEvent {
            index,
            context,
            subject_key,
            timestamp,
        })
    }
}

/// Builds the log the contract emits for `registration`.
pub fn registration_log(contract: Address, registration: &Registration) -> LogEntry {
    let mut tokens = vec![abi::Token::Address(registration.identity)];
    tokens.extend(
        registration
            .index_set
            .iter()
            .map(|index| abi::Token::Uint(U256::from(*index))),
    );
    LogEntry {
        address: contract,
        topics: vec![abi::event_topic(abi::ORACLE_REGISTERED_EVENT)],
        data: abi::encode(&tokens).into(),
        block_number: None,
        transaction_hash: None,
        log_index: None,
    }
}

/// Builds the log the contract emits for `request`.
pub fn request_log(contract: Address, request: &RequestEvent) -> LogEntry {
    LogEntry {
        address: contract,
        topics: vec![abi::event_topic(abi::ORACLE_REQUEST_EVENT)],
        data: abi::encode(&[
            abi::Token::Uint(U256::from(request.index)),
            abi::Token::Address(request.context),
            abi::Token::FixedBytes(request.subject_key),
            abi::Token::Uint(request.timestamp),
        ])
        .into(),
        block_number: None,
        transaction_hash: None,
        log_index: None,
    }
}
