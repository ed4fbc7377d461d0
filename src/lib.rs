//! Folio: a cached post index built from a remote pages table.
//!
//! The pipeline reads every record from a [`RecordStore`](application::repos::RecordStore),
//! keeps what the viewing mode may show, resolves author ids to names with a single batched
//! lookup and hands out the result through a [`StalenessPolicy`](cache::StalenessPolicy)
//! that rebuilds it once its revalidation horizon has passed.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
