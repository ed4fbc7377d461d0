//! Repository traits describing record store adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{AuthorIdentity, RecordTable};

/// Failure to obtain data from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unreachable: {0}")]
    Transport(String),
    #[error("record store answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("record store returned an unreadable payload: {0}")]
    Decode(String),
    #[error("record store io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Read access to the remote pages table and its users directory.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the full pages table, keyed by slug, in store order.
    async fn fetch_table(&self) -> Result<RecordTable, StoreError>;

    /// Look up a batch of users. Ids the store does not know are left out of the result.
    async fn fetch_users(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, AuthorIdentity>, StoreError>;
}
