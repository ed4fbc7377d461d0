//! Record store backed by a JSON snapshot on disk.
//!
//! The snapshot is re-read on every call so edits show up after the next
//! revalidation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::repos::{RecordStore, StoreError};
use crate::domain::entities::{AuthorIdentity, RecordTable};

#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
}

#[derive(Deserialize)]
struct Snapshot {
    #[serde(default)]
    table: RecordTable,
    #[serde(default)]
    users: HashMap<String, SnapshotUser>,
}

#[derive(Deserialize)]
struct SnapshotUser {
    full_name: String,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Snapshot, StoreError> {
        let bytes = tokio::fs::read(&self.path).await?;
        serde_json::from_slice(&bytes).map_err(|err| {
            StoreError::decode(format!("snapshot `{}`: {err}", self.path.display()))
        })
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn fetch_table(&self) -> Result<RecordTable, StoreError> {
        Ok(self.load().await?.table)
    }

    async fn fetch_users(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, AuthorIdentity>, StoreError> {
        let mut users = self.load().await?.users;
        Ok(ids
            .iter()
            .filter_map(|id| {
                users
                    .remove(id)
                    .map(|user| (id.clone(), AuthorIdentity::new(id.clone(), user.full_name)))
            })
            .collect())
    }
}
