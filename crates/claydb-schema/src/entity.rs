use crate::{
    attribute::Attribute,
    relation::{Relation, RelationKind},
};
use serde::{Deserialize, Serialize};

///
/// EntityDefinition
///
/// One runtime-defined content entity: ordered attributes, relations, a
/// title attribute, and the publication flag. The name is the immutable
/// identity key; versioning lives in [`crate::version::VersionLineage`].
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub title_attribute: String,
    pub publication_enabled: bool,
    pub attributes: Vec<Attribute>,
    pub relations: Vec<Relation>,
}

impl EntityDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, title_attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title_attribute: title_attribute.into(),
            publication_enabled: false,
            attributes: Vec::new(),
            relations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_publication(mut self, enabled: bool) -> Self {
        self.publication_enabled = enabled;
        self
    }

    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    #[must_use]
    pub fn get_relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// The attribute shown as the record's display title.
    #[must_use]
    pub fn title(&self) -> Option<&Attribute> {
        self.get_attribute(&self.title_attribute)
    }

    /// Tree relations declared on this entity.
    #[must_use]
    pub fn tree_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations
            .iter()
            .filter(|r| matches!(r.kind, RelationKind::Tree { .. }))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_attributes_and_relations() {
        let def = EntityDefinition::new("post", "name")
            .attribute(Attribute::new("name", "Name"))
            .relation(Relation::lookup("author", "author"));

        assert_eq!(def.attributes.len(), 1);
        assert!(def.get_attribute("name").is_some());
        assert!(def.get_relation("author").is_some());
        assert!(def.title().is_some());
        assert!(!def.publication_enabled);
    }

    #[test]
    fn title_missing_when_not_declared() {
        let def = EntityDefinition::new("post", "name");
        assert!(def.title().is_none());
    }
}
