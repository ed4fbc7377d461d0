//! In-process record store for unit tests.
//!
//! Holds the table and users directory in memory and records every call made
//! against it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::repos::{RecordStore, StoreError};
use crate::cache::lock::mutex_lock;
use crate::domain::entities::{AuthorIdentity, RecordTable};

const SOURCE: &str = "infra::store::memory";

#[derive(Default)]
struct MemoryState {
    table: RecordTable,
    users: HashMap<String, AuthorIdentity>,
    unavailable: bool,
    latency: Option<Duration>,
    table_calls: usize,
    user_batches: Vec<Vec<String>>,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    state: Mutex<MemoryState>,
}

impl MemoryRecordStore {
    pub fn new(table: RecordTable, users: impl IntoIterator<Item = AuthorIdentity>) -> Self {
        let users = users
            .into_iter()
            .map(|author| (author.id.clone(), author))
            .collect();
        Self {
            state: Mutex::new(MemoryState {
                table,
                users,
                ..MemoryState::default()
            }),
        }
    }

    pub fn set_table(&self, table: RecordTable) {
        mutex_lock(&self.state, SOURCE, "set_table").table = table;
    }

    pub fn set_users(&self, users: impl IntoIterator<Item = AuthorIdentity>) {
        mutex_lock(&self.state, SOURCE, "set_users").users = users
            .into_iter()
            .map(|author| (author.id.clone(), author))
            .collect();
    }

    /// While set, every call fails with [`StoreError::Transport`].
    pub fn set_unavailable(&self, unavailable: bool) {
        mutex_lock(&self.state, SOURCE, "set_unavailable").unavailable = unavailable;
    }

    /// Delay between a table fetch reading its snapshot and answering.
    pub fn set_latency(&self, latency: Option<Duration>) {
        mutex_lock(&self.state, SOURCE, "set_latency").latency = latency;
    }

    /// Number of table fetches served, failed ones included.
    pub fn table_calls(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "table_calls").table_calls
    }

    /// Id batches passed to `fetch_users`, in call order.
    pub fn user_batches(&self) -> Vec<Vec<String>> {
        mutex_lock(&self.state, SOURCE, "user_batches")
            .user_batches
            .clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_table(&self) -> Result<RecordTable, StoreError> {
        let (outcome, latency) = {
            let mut state = mutex_lock(&self.state, SOURCE, "fetch_table");
            state.table_calls += 1;
            let outcome = if state.unavailable {
                Err(StoreError::transport("memory store marked unavailable"))
            } else {
                Ok(state.table.clone())
            };
            (outcome, state.latency)
        };

        // The answer is fixed when the call starts; latency only delays it.
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        outcome
    }

    async fn fetch_users(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, AuthorIdentity>, StoreError> {
        let mut state = mutex_lock(&self.state, SOURCE, "fetch_users");
        state.user_batches.push(ids.to_vec());
        if state.unavailable {
            return Err(StoreError::transport("memory store marked unavailable"));
        }
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|user| (id.clone(), user.clone())))
            .collect())
    }
}
