use crate::error::Error;
use claydb_schema::{
    entity::EntityDefinition,
    relation::RelationKind,
    validate::validate_definition,
    version::{SchemaMode, VersionLineage},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// SchemaRegistry
///
/// Versioned entity definitions for one deployment. Read-mostly: the only
/// mutations are `ensure`, `publish`, and `unpublish`, all performed under
/// the database's write lock so readers never observe a half-swapped
/// version pointer.
///

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SchemaRegistry {
    entities: BTreeMap<String, VersionLineage>,
}

impl SchemaRegistry {
    /// Resolve the definition that applies to a request.
    ///
    /// Default mode requires a published version; sandbox mode returns the
    /// latest version, draft included.
    pub fn resolve(&self, entity: &str, mode: SchemaMode) -> Result<&EntityDefinition, Error> {
        self.entities
            .get(entity)
            .and_then(|lineage| lineage.resolve(mode))
            .map(|version| &version.definition)
            .ok_or_else(|| Error::schema_not_found(entity))
    }

    #[must_use]
    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// Latest definition of every entity; used for cross-entity upkeep
    /// such as link cleanup on delete.
    pub fn latest_definitions(&self) -> impl Iterator<Item = &EntityDefinition> {
        self.entities
            .values()
            .map(|lineage| &lineage.latest().definition)
    }

    /// Idempotent create-or-update.
    ///
    /// The first definition of an entity is published immediately; later
    /// definitions land on (or replace) the draft and never touch the
    /// published version. Validation is eager: an invalid definition is
    /// rejected before any version is stored.
    pub fn ensure(&mut self, definition: EntityDefinition) -> Result<(), Error> {
        validate_definition(&definition)?;
        self.validate_relation_targets(&definition)?;

        match self.entities.get_mut(&definition.name) {
            Some(lineage) => lineage.ensure(definition),
            None => {
                self.entities
                    .insert(definition.name.clone(), VersionLineage::first(definition));
            }
        }

        Ok(())
    }

    /// Promote the draft (or re-publish the latest version). Atomic from
    /// the perspective of readers per the locking discipline above.
    pub fn publish(&mut self, entity: &str) -> Result<(), Error> {
        self.entities
            .get_mut(entity)
            .ok_or_else(|| Error::schema_not_found(entity))?
            .publish();
        Ok(())
    }

    pub fn unpublish(&mut self, entity: &str) -> Result<(), Error> {
        self.entities
            .get_mut(entity)
            .ok_or_else(|| Error::schema_not_found(entity))?
            .unpublish();
        Ok(())
    }

    // Cross-entity checks need the whole deployment: relation targets must
    // exist, and collection back-references must be a field of the target.
    fn validate_relation_targets(&self, definition: &EntityDefinition) -> Result<(), Error> {
        for relation in &definition.relations {
            let target_name = relation.target_entity(&definition.name);
            let target = if target_name == definition.name {
                definition
            } else {
                self.entities
                    .get(target_name)
                    .map(|lineage| &lineage.latest().definition)
                    .ok_or_else(|| {
                        Error::SchemaValidation(format!(
                            "relation '{}' targets unknown entity '{target_name}'",
                            relation.name
                        ))
                    })?
            };

            if let RelationKind::Collection { link_attribute, .. } = &relation.kind {
                let is_attr = target.get_attribute(link_attribute).is_some();
                let is_lookup = target
                    .get_relation(link_attribute)
                    .is_some_and(|r| !r.is_to_many());
                if !is_attr && !is_lookup {
                    return Err(Error::SchemaValidation(format!(
                        "collection '{}' links through '{link_attribute}', which is not a field of '{target_name}'",
                        relation.name
                    )));
                }
            }
        }

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use claydb_schema::{
        attribute::{Attribute, DisplayType},
        relation::Relation,
    };

    fn simple(name: &str) -> EntityDefinition {
        EntityDefinition::new(name, "name").attribute(Attribute::new("name", "Name"))
    }

    #[test]
    fn first_ensure_publishes() {
        let mut registry = SchemaRegistry::default();
        registry.ensure(simple("post")).unwrap();

        assert!(registry.resolve("post", SchemaMode::Default).is_ok());
        assert!(registry.resolve("post", SchemaMode::Sandbox).is_ok());
    }

    #[test]
    fn later_ensure_is_draft_only() {
        let mut registry = SchemaRegistry::default();
        registry
            .ensure(simple("post").attribute(Attribute::new("name1", "Name1")))
            .unwrap();
        registry.ensure(simple("post")).unwrap();

        let published = registry.resolve("post", SchemaMode::Default).unwrap();
        assert!(published.get_attribute("name1").is_some());

        let sandbox = registry.resolve("post", SchemaMode::Sandbox).unwrap();
        assert!(sandbox.get_attribute("name1").is_none());
    }

    #[test]
    fn invalid_definitions_never_store_a_version() {
        let mut registry = SchemaRegistry::default();
        let bad = EntityDefinition::new("post", "name").attribute(
            Attribute::new("name", "Name").with_display_type(DisplayType::Dropdown),
        );

        assert!(matches!(
            registry.ensure(bad),
            Err(Error::SchemaValidation(_))
        ));
        assert!(!registry.contains("post"));
    }

    #[test]
    fn relation_targets_must_exist() {
        let mut registry = SchemaRegistry::default();
        let def = simple("post").relation(Relation::lookup("author", "author"));
        assert!(matches!(
            registry.ensure(def.clone()),
            Err(Error::SchemaValidation(_))
        ));

        registry.ensure(simple("author")).unwrap();
        registry.ensure(def).unwrap();
    }

    #[test]
    fn collection_link_must_be_a_target_field() {
        let mut registry = SchemaRegistry::default();
        registry.ensure(simple("post")).unwrap();

        let attachment = simple("attachment").relation(Relation::lookup("post", "post"));
        registry.ensure(attachment).unwrap();

        let bad = simple("post").relation(Relation::collection(
            "attachments",
            "attachment",
            "owner",
        ));
        assert!(registry.ensure(bad).is_err());

        let good = simple("post").relation(Relation::collection(
            "attachments",
            "attachment",
            "post",
        ));
        registry.ensure(good).unwrap();
    }

    #[test]
    fn unpublish_hides_default_mode_only() {
        let mut registry = SchemaRegistry::default();
        registry.ensure(simple("post")).unwrap();
        registry.unpublish("post").unwrap();

        assert!(matches!(
            registry.resolve("post", SchemaMode::Default),
            Err(Error::SchemaNotFound(_))
        ));
        assert!(registry.resolve("post", SchemaMode::Sandbox).is_ok());

        registry.publish("post").unwrap();
        assert!(registry.resolve("post", SchemaMode::Default).is_ok());
    }
}
