//! Batched resolution of author identifiers to display names.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{RecordStore, StoreError};
use crate::domain::entities::AuthorIdentity;

/// An identifier the users lookup did not return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("author `{id}` is missing from the users lookup")]
pub struct MissingAuthorError {
    pub id: String,
}

/// Outcome of one batched users lookup.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAuthors {
    by_id: HashMap<String, AuthorIdentity>,
}

impl ResolvedAuthors {
    pub fn get(&self, id: &str) -> Option<&AuthorIdentity> {
        self.by_id.get(id)
    }

    pub fn name_for(&self, id: &str) -> Result<&str, MissingAuthorError> {
        self.by_id
            .get(id)
            .map(|author| author.full_name.as_str())
            .ok_or_else(|| MissingAuthorError { id: id.to_string() })
    }

    /// Maps `ids` to names, keeping order and duplicates.
    pub fn names_for(&self, ids: &[String]) -> Result<Vec<String>, MissingAuthorError> {
        ids.iter()
            .map(|id| self.name_for(id).map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[derive(Clone)]
pub struct AuthorResolver {
    store: Arc<dyn RecordStore>,
}

impl AuthorResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Resolves every id in `ids` with a single users lookup.
    ///
    /// An empty set returns immediately without touching the store. Ids the
    /// store does not know are simply absent from the result; callers see them
    /// as [`MissingAuthorError`] through [`ResolvedAuthors::name_for`].
    pub async fn resolve(&self, ids: &BTreeSet<String>) -> Result<ResolvedAuthors, StoreError> {
        if ids.is_empty() {
            return Ok(ResolvedAuthors::default());
        }

        let batch: Vec<String> = ids.iter().cloned().collect();
        let mut by_id = self.store.fetch_users(&batch).await?;
        by_id.retain(|id, _| ids.contains(id));

        debug!(
            target = "folio::authors",
            requested = batch.len(),
            resolved = by_id.len(),
            "resolved author batch"
        );

        Ok(ResolvedAuthors { by_id })
    }
}
