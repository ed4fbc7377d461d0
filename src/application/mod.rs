//! Application services: author resolution and index materialization.

pub mod authors;
pub mod error;
pub mod index;
pub mod repos;
