//! Persisted cost store: one record per canonical full-board state.
//!
//! The store is a lookup service with get/put-by-key semantics. Callers open
//! independent connections through [`Connect`]; writes for different keys
//! never interfere with each other.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Precomputed pattern costs for one full-board state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRecord {
    /// Canonical comma-joined key, blank as `0`.
    pub state: String,
    pub visited: bool,
    /// One pattern key per group, in grouping-table order.
    pub sub_states: Vec<String>,
    /// Optimal cost of each pattern, parallel to `sub_states`.
    pub costs: Vec<u32>,
    pub cost_total: Option<u32>,
}

impl DatabaseRecord {
    /// A record with every cost field empty.
    pub fn pending(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            visited: false,
            sub_states: Vec::new(),
            costs: Vec::new(),
            cost_total: None,
        }
    }

    /// Visited with a total cost; never recomputed.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.visited && self.cost_total.is_some()
    }
}

/// Key/value access to database records.
pub trait CostStore: Send + Sync {
    fn get(&self, state: &str) -> Result<Option<DatabaseRecord>, StoreError>;

    /// Writes a whole record, replacing any previous one for the same key.
    fn put(&self, record: DatabaseRecord) -> Result<(), StoreError>;

    /// Inserts an empty record unless the key exists. Returns whether it inserted.
    fn insert_pending(&self, state: &str) -> Result<bool, StoreError>;

    /// Keys of records that are unvisited and have no total cost, sorted.
    fn pending(&self) -> Result<Vec<String>, StoreError>;

    /// Every record, sorted by key.
    fn records(&self) -> Result<Vec<DatabaseRecord>, StoreError>;

    fn total_cost(&self, state: &str) -> Result<Option<u32>, StoreError> {
        Ok(self.get(state)?.and_then(|record| record.cost_total))
    }
}

/// Opens store connections; one per unit of work.
pub trait Connect: Sync {
    type Store: CostStore;

    fn connect(&self) -> Result<Self::Store, StoreError>;
}

/// Concurrent in-memory store. Clones are connections to the same table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    table: Arc<DashMap<String, DatabaseRecord, FxBuildHasher>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = DatabaseRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.table.insert(record.state.clone(), record);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl CostStore for MemoryStore {
    fn get(&self, state: &str) -> Result<Option<DatabaseRecord>, StoreError> {
        Ok(self.table.get(state).map(|entry| entry.value().clone()))
    }

    fn put(&self, record: DatabaseRecord) -> Result<(), StoreError> {
        self.table.insert(record.state.clone(), record);
        Ok(())
    }

    fn insert_pending(&self, state: &str) -> Result<bool, StoreError> {
        match self.table.entry(state.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(DatabaseRecord::pending(state));
                Ok(true)
            }
        }
    }

    fn pending(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .table
            .iter()
            .filter(|entry| !entry.visited && entry.cost_total.is_none())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn records(&self) -> Result<Vec<DatabaseRecord>, StoreError> {
        let mut records: Vec<DatabaseRecord> =
            self.table.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.state.cmp(&b.state));
        Ok(records)
    }
}

impl Connect for MemoryStore {
    type Store = MemoryStore;

    fn connect(&self) -> Result<MemoryStore, StoreError> {
        Ok(self.clone())
    }
}

/// Record counts by build progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: usize,
    pub complete: usize,
    pub pending: usize,
}

pub fn stats(store: &dyn CostStore) -> Result<StoreStats, StoreError> {
    let records = store.records()?;
    Ok(StoreStats {
        total: records.len(),
        complete: records.iter().filter(|r| r.is_complete()).count(),
        pending: records
            .iter()
            .filter(|r| !r.visited && r.cost_total.is_none())
            .count(),
    })
}
