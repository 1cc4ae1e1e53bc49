//! Core runtime for ClayDB: the value model, records, stores, the schema
//! registry, the query compiler, and the executors behind the `Db` handle.

pub mod clock;
pub mod db;
pub mod error;
pub mod record;
pub mod types;
pub mod value;

///
/// Prelude
///
/// Domain vocabulary only; store internals and executors stay behind the
/// `Db` handle.
///

pub mod prelude {
    pub use crate::{
        db::{
            Db,
            publication::PublicationStatus,
            query::{
                FieldSelection, FilterNode, FilterOp, ListQuery, QueryMode, ResponseMode,
                SortOrder,
            },
            response::{JsonMap, ListResponse, LookupListResponse},
        },
        error::Error,
        record::Record,
        types::Timestamp,
        value::Value,
    };
}
