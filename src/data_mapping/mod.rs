//! Column mapping and validation
//!
//! [`engine`] rewrites a table per a mapping and filters it by the schema's
//! validators, [`validation`] scores a file against the schema without
//! touching it, and [`service`] binds both to the file store.

pub mod engine;
pub mod service;
pub mod validation;

pub use engine::{DataMappingEngine, FieldMatcher, PREVIEW_ROWS};
pub use service::DataMappingService;
