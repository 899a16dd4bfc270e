//! In-memory catalog source.
//!
//! Loads a JSON document describing every database as a nested section forest
//! and serves the [`ratebook_protocol::CatalogSource`] calls from flattened
//! records: lazy child fragments, work details with ancestor breadcrumbs,
//! prefix-routed resource references, suggestion candidates and literal
//! substring search.

mod document;
mod error;
mod memory;

pub use document::{CatalogDocument, DatabaseDocument, ResourceRecord, SectionRecord, WorkRecord};
pub use error::{Result, StoreError};
pub use memory::MemoryCatalog;
