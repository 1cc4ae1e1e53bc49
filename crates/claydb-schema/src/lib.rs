//! Runtime schema model for ClayDB: entity, attribute, and relation
//! descriptors, the validation-rule grammar, version lineage, and the
//! eager schema validation pass.

pub mod attribute;
pub mod entity;
pub mod relation;
pub mod rule;
pub mod validate;
pub mod version;

/// Maximum length for entity schema identifiers.
pub const MAX_ENTITY_NAME_LEN: usize = 64;

/// Maximum length for attribute schema identifiers.
pub const MAX_ATTRIBUTE_NAME_LEN: usize = 64;

///
/// System attribute names
///
/// Present on every record regardless of the entity definition. User
/// attributes and relations may not shadow them.
///

pub mod system {
    pub const ID: &str = "id";
    pub const PUBLICATION_STATUS: &str = "publicationStatus";
    pub const PUBLISHED_AT: &str = "publishedAt";
    pub const UPDATED_AT: &str = "updatedAt";

    pub const ALL: &[&str] = &[ID, PUBLICATION_STATUS, PUBLISHED_AT, UPDATED_AT];
}

///
/// Prelude
///
/// Domain vocabulary only; no validation internals.
///

pub mod prelude {
    pub use crate::{
        attribute::{Attribute, DataType, DisplayType},
        entity::EntityDefinition,
        relation::{Relation, RelationKind},
        rule::Rule,
        version::{SchemaMode, SchemaVersion, VersionLineage, VersionState},
    };
}
