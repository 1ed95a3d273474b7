use alloy_primitives::Address;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRecord {
    #[serde(rename = "address")]
    pub identity: Address,
    #[serde(rename = "indexes")]
    pub index_set: Vec<u8>,
}

impl OracleRecord {
    pub fn holds(&self, index: u8) -> bool {
        self.index_set.contains(&index)
    }
}

/// Process-local view of the oracles registered on the ledger.
///
/// One record per identity; a later registration of the same identity replaces its index
/// set. Records are never removed. Writers are serialized by the lock while readers share it.
#[derive(Debug, Default)]
pub struct OracleRegistry {
    records: RwLock<HashMap<Address, Vec<u8>>>,
}

impl OracleRegistry {
    pub async fn upsert(&self, identity: Address, index_set: Vec<u8>) {
        self.records.write().await.insert(identity, index_set);
    }

    /// Every record holding `index`, in no particular order.
    pub async fn matching(&self, index: u8) -> Vec<OracleRecord> {
        self.records
            .read()
            .await
            .iter()
            .map(|(identity, index_set)| OracleRecord {
                identity: *identity,
                index_set: index_set.clone(),
            })
            .filter(|record| record.holds(index))
            .collect()
    }

    /// All records ordered by identity.
    pub async fn snapshot(&self) -> Vec<OracleRecord> {
        let mut records: Vec<OracleRecord> = self
            .records
            .read()
            .await
            .iter()
            .map(|(identity, index_set)| OracleRecord {
                identity: *identity,
                index_set: index_set.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.identity.cmp(&b.identity));
        records
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
