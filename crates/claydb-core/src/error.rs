use claydb_schema::{rule::RuleError, validate::SchemaError};
use thiserror::Error as ThisError;

///
/// Error
///
/// The public failure taxonomy. Every variant except `Store` is a
/// recoverable, structured failure surfaced to the caller; `Store` marks a
/// fatal storage/codec fault for the current request. Messages are
/// human-readable and returned verbatim in the result envelope.
///

#[derive(Debug, ThisError)]
pub enum Error {
    /// Unknown entity, or no published schema version in default mode.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// A definition failed eager schema validation.
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// Malformed query shape: unknown field path, operator/type mismatch,
    /// or conflicting pagination parameters.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Continuation cursor does not belong to this query plan.
    #[error("cursor mismatch: {0}")]
    CursorMismatch(String),

    /// An attribute validation rule rejected a value; the rule message is
    /// carried verbatim.
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    /// Stale `updatedAt` token on a write.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Operation against a relation whose kind does not match, or a
    /// reference to a missing relation target.
    #[error("relation integrity: {0}")]
    RelationIntegrity(String),

    /// Record id absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Fatal storage or codec fault.
    #[error("store failure: {0}")]
    Store(String),
}

impl Error {
    pub fn schema_not_found(entity: &str) -> Self {
        Self::SchemaNotFound(format!("entity '{entity}' has no resolvable schema version"))
    }

    pub fn unknown_record(entity: &str, id: u64) -> Self {
        Self::NotFound(format!("record {entity}/{id} does not exist"))
    }

    pub fn invalid_path(path: &str, reason: &str) -> Self {
        Self::InvalidFilter(format!("field path '{path}': {reason}"))
    }

    pub fn stale_token(entity: &str, id: u64) -> Self {
        Self::ConcurrencyConflict(format!(
            "record {entity}/{id} was modified since it was read; reload and retry"
        ))
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::SchemaValidation(err.to_string())
    }
}

impl From<RuleError> for Error {
    fn from(err: RuleError) -> Self {
        Self::SchemaValidation(err.to_string())
    }
}

impl From<serde_cbor::Error> for Error {
    fn from(err: serde_cbor::Error) -> Self {
        Self::Store(format!("row codec: {err}"))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_prefixed_by_kind() {
        let err = Error::schema_not_found("post");
        assert_eq!(
            err.to_string(),
            "schema not found: entity 'post' has no resolvable schema version"
        );

        let err = Error::stale_token("post", 1);
        assert!(err.to_string().starts_with("concurrency conflict:"));
    }
}
