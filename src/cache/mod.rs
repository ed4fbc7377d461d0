//! Folio Cache System
//!
//! Keeps one materialized post index per viewing mode and decides when each
//! one is rebuilt:
//!
//! - **Published**: what ordinary readers see
//! - **Preview**: drafts included, for authors checking their work
//!
//! ## Configuration
//!
//! Revalidation is controlled via `folio.toml`:
//!
//! ```toml
//! [cache]
//! revalidate_seconds = 10
//! preview_revalidate_seconds = 2
//! warm_on_startup = true
//! ```

mod config;
pub(crate) mod lock;
mod staleness;

pub use config::CacheConfig;
pub use staleness::{Freshness, IndexUnavailable, StalenessPolicy, mode_label};
