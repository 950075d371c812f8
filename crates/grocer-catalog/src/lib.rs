//! Grocer Catalog crate - the static product catalog.
//!
//! Loads product records from a directory of JSON files once at startup and
//! exposes them read-only, together with the vendor, category, tag and brand
//! vocabularies derived from them.

pub mod store;

pub use store::CatalogStore;
