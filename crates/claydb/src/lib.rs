//! ## Crate layout
//! - `core`: runtime data model, stores, query compiler, and executors.
//! - `schema`: runtime entity/attribute/relation descriptors, the
//!   validation-rule grammar, and schema validation.
//!
//! The `prelude` module mirrors the surface an embedding transport layer
//! uses: the `Db` handle, the structured query types, and the schema
//! builder vocabulary.

pub use claydb_core as core;
pub use claydb_schema as schema;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use claydb_core::{db::Db, error::Error};

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::schema::prelude::*;
}
