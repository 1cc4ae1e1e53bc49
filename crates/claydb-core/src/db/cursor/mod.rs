mod codec;

pub use codec::{TokenCodecError, decode_token, encode_token};

use crate::{
    db::query::{FilterNode, ListQuery, SortField},
    error::Error,
    value::Value,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Wire format version for list continuation tokens.
const LIST_TOKEN_VERSION: u8 = 1;

/// Wire format version for relation-part continuation tokens.
const RELATION_TOKEN_VERSION: u8 = 1;

///
/// PlanSignature
///
/// Deterministic hash of the continuation-relevant query plan: entity,
/// canonical filter, distinct flag, and sort spec. Windowing (offset,
/// limit) is excluded so successive pages of one plan share a signature.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlanSignature([u8; 32]);

impl PlanSignature {
    pub(in crate::db) fn of_list(query: &ListQuery) -> Result<Self, Error> {
        Self::digest(&SignatureParts {
            entity: &query.entity,
            filter: query.filter_expr.as_ref(),
            distinct: query.distinct,
            sort: &query.sort,
        })
    }

    pub(in crate::db) fn of_relation(entity: &str, relation: &str) -> Result<Self, Error> {
        Self::digest(&(entity, relation))
    }

    fn digest<T: Serialize>(parts: &T) -> Result<Self, Error> {
        let bytes = serde_cbor::to_vec(parts)
            .map_err(|err| Error::Store(format!("plan signature: {err}")))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(Self(hasher.finalize().into()))
    }
}

#[derive(Serialize)]
struct SignatureParts<'a> {
    entity: &'a str,
    filter: Option<&'a FilterNode>,
    distinct: bool,
    sort: &'a [SortField],
}

///
/// ContinuationToken
///
/// Opaque list-pagination cursor: the plan signature plus the sort-key
/// values (id tiebreaker last) of the last emitted row. Stable across
/// decode/encode cycles.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContinuationToken {
    version: u8,
    signature: PlanSignature,
    boundary: Vec<Value>,
}

impl ContinuationToken {
    pub(in crate::db) const fn new(signature: PlanSignature, boundary: Vec<Value>) -> Self {
        Self {
            version: LIST_TOKEN_VERSION,
            signature,
            boundary,
        }
    }

    pub(in crate::db) fn boundary(&self) -> &[Value] {
        &self.boundary
    }

    pub(in crate::db) fn encode(&self) -> Result<String, Error> {
        let bytes = serde_cbor::to_vec(self)
            .map_err(|err| Error::Store(format!("cursor encode: {err}")))?;
        Ok(encode_token(&bytes))
    }

    /// Decode and bind a caller token against the current plan signature.
    pub(in crate::db) fn decode(token: &str, expected: PlanSignature) -> Result<Self, Error> {
        let bytes = decode_token(token)
            .map_err(|err| Error::CursorMismatch(format!("invalid continuation cursor: {err}")))?;
        let decoded: Self = serde_cbor::from_slice(&bytes)
            .map_err(|err| Error::CursorMismatch(format!("invalid continuation cursor: {err}")))?;

        if decoded.version != LIST_TOKEN_VERSION {
            return Err(Error::CursorMismatch(format!(
                "unsupported cursor version {}",
                decoded.version
            )));
        }

        if decoded.signature != expected {
            return Err(Error::CursorMismatch(
                "continuation cursor belongs to a different filter/sort plan".to_string(),
            ));
        }

        Ok(decoded)
    }
}

///
/// RelationToken
///
/// Continuation cursor for one relation group (`relationName.limit`
/// windows): bound to the owning entity + relation, anchored at the parent
/// id and the last child id emitted for that parent.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RelationToken {
    version: u8,
    signature: PlanSignature,
    pub(in crate::db) parent_id: u64,
    pub(in crate::db) last_child_id: u64,
}

impl RelationToken {
    pub(in crate::db) const fn new(
        signature: PlanSignature,
        parent_id: u64,
        last_child_id: u64,
    ) -> Self {
        Self {
            version: RELATION_TOKEN_VERSION,
            signature,
            parent_id,
            last_child_id,
        }
    }

    pub(in crate::db) fn encode(&self) -> Result<String, Error> {
        let bytes = serde_cbor::to_vec(self)
            .map_err(|err| Error::Store(format!("cursor encode: {err}")))?;
        Ok(encode_token(&bytes))
    }

    pub(in crate::db) fn decode(token: &str, expected: PlanSignature) -> Result<Self, Error> {
        let bytes = decode_token(token)
            .map_err(|err| Error::CursorMismatch(format!("invalid relation cursor: {err}")))?;
        let decoded: Self = serde_cbor::from_slice(&bytes)
            .map_err(|err| Error::CursorMismatch(format!("invalid relation cursor: {err}")))?;

        if decoded.version != RELATION_TOKEN_VERSION {
            return Err(Error::CursorMismatch(format!(
                "unsupported cursor version {}",
                decoded.version
            )));
        }

        if decoded.signature != expected {
            return Err(Error::CursorMismatch(
                "relation cursor belongs to a different entity/relation".to_string(),
            ));
        }

        Ok(decoded)
    }
}

///
/// TESTS
///
