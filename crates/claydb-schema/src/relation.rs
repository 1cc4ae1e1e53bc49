use serde::{Deserialize, Serialize};

///
/// RelationKind
///
/// Flat tagged variant; the relation resolver dispatches one strategy per
/// tag. The link attribute names the back-reference held by child records.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RelationKind {
    /// Many-to-one; the source record stores the target id under the
    /// relation name.
    Lookup { target: String },

    /// One-to-many; target records store the parent id in `link_attribute`.
    Collection {
        target: String,
        link_attribute: String,
    },

    /// Many-to-many through an implicit link store of (subject, target)
    /// pairs.
    Junction { target: String },

    /// Self-referential parent/children collection on one entity.
    Tree { link_attribute: String },
}

///
/// Relation
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
}

impl Relation {
    #[must_use]
    pub fn lookup(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Lookup {
                target: target.into(),
            },
        }
    }

    #[must_use]
    pub fn collection(
        name: impl Into<String>,
        target: impl Into<String>,
        link_attribute: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Collection {
                target: target.into(),
                link_attribute: link_attribute.into(),
            },
        }
    }

    #[must_use]
    pub fn junction(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Junction {
                target: target.into(),
            },
        }
    }

    #[must_use]
    pub fn tree(name: impl Into<String>, link_attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Tree {
                link_attribute: link_attribute.into(),
            },
        }
    }

    /// Entity the relation points at; trees point back at their owner.
    #[must_use]
    pub fn target_entity<'a>(&'a self, owner: &'a str) -> &'a str {
        match &self.kind {
            RelationKind::Lookup { target }
            | RelationKind::Collection { target, .. }
            | RelationKind::Junction { target } => target,
            RelationKind::Tree { .. } => owner,
        }
    }

    /// Whether resolving this relation yields many rows per parent.
    #[must_use]
    pub const fn is_to_many(&self) -> bool {
        !matches!(self.kind, RelationKind::Lookup { .. })
    }

    /// Back-reference attribute on the child side, if the kind has one.
    #[must_use]
    pub fn link_attribute(&self) -> Option<&str> {
        match &self.kind {
            RelationKind::Collection { link_attribute, .. }
            | RelationKind::Tree { link_attribute } => Some(link_attribute),
            RelationKind::Lookup { .. } | RelationKind::Junction { .. } => None,
        }
    }
}

///
/// TESTS
///
