//! Record store adapters.

pub mod file;
pub mod http;
#[cfg(test)]
pub(crate) mod memory;

use std::sync::Arc;

pub use file::FileRecordStore;
pub use http::HttpRecordStore;
#[cfg(test)]
pub(crate) use memory::MemoryRecordStore;

use crate::application::repos::{RecordStore, StoreError};
use crate::config::{StoreSettings, StoreSource};

/// Build the adapter selected by the store settings.
pub fn from_settings(settings: &StoreSettings) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store: Arc<dyn RecordStore> = match &settings.source {
        StoreSource::Http(url) => Arc::new(HttpRecordStore::new(url, settings.timeout)?),
        StoreSource::Snapshot(path) => Arc::new(FileRecordStore::new(path.clone())),
    };
    Ok(store)
}
