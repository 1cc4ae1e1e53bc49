use crate::{
    MAX_ATTRIBUTE_NAME_LEN, MAX_ENTITY_NAME_LEN,
    entity::EntityDefinition,
    relation::RelationKind,
    system,
};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

///
/// SchemaError
///
/// Collected definition-time failures. Construction is eager: a definition
/// that fails here never reaches a stored schema version.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
#[error("{}", errors.join("; "))]
pub struct SchemaError {
    pub errors: Vec<String>,
}

/// Validate one entity definition in isolation.
///
/// Cross-entity checks (relation targets exist, collection link attributes
/// exist on the target) belong to the registry, which sees the whole
/// deployment.
pub fn validate_definition(def: &EntityDefinition) -> Result<(), SchemaError> {
    let mut errors = Vec::new();

    validate_ident(&def.name, "entity", MAX_ENTITY_NAME_LEN, &mut errors);

    if def.attributes.is_empty() {
        errors.push(format!("entity '{}' has no attributes", def.name));
    }

    let mut seen = BTreeSet::new();
    for attr in &def.attributes {
        validate_ident(&attr.name, "attribute", MAX_ATTRIBUTE_NAME_LEN, &mut errors);

        if system::ALL.contains(&attr.name.as_str()) {
            errors.push(format!(
                "attribute '{}' shadows a system attribute",
                attr.name
            ));
        }

        if !seen.insert(attr.name.as_str()) {
            errors.push(format!(
                "duplicate attribute name '{}' on entity '{}'",
                attr.name, def.name
            ));
        }

        if attr.display_type.requires_choices()
            && attr.choices.as_ref().is_none_or(Vec::is_empty)
        {
            errors.push(format!(
                "attribute '{}' has display type {:?} but no choices",
                attr.name, attr.display_type
            ));
        }

        // Rules see the submitted value through the attribute's own name.
        if let Some(rule) = &attr.validation {
            for referenced in rule.referenced_attributes() {
                if referenced != attr.name {
                    errors.push(format!(
                        "validation rule on '{}' references '{referenced}'; rules may only reference their own attribute",
                        attr.name
                    ));
                }
            }
        }
    }

    for relation in &def.relations {
        validate_ident(&relation.name, "relation", MAX_ATTRIBUTE_NAME_LEN, &mut errors);

        if system::ALL.contains(&relation.name.as_str()) {
            errors.push(format!(
                "relation '{}' shadows a system attribute",
                relation.name
            ));
        }

        // Relations share the record field namespace with attributes
        // (lookups store their id under the relation name).
        if !seen.insert(relation.name.as_str()) {
            errors.push(format!(
                "relation '{}' collides with another field on entity '{}'",
                relation.name, def.name
            ));
        }

        // Tree back-references point at this entity, so the link
        // attribute must exist locally.
        if let RelationKind::Tree { link_attribute } = &relation.kind
            && def.get_attribute(link_attribute).is_none()
        {
            errors.push(format!(
                "tree relation '{}' links through unknown attribute '{link_attribute}'",
                relation.name
            ));
        }
    }

    if def.get_attribute(&def.title_attribute).is_none() {
        errors.push(format!(
            "title attribute '{}' is not defined on entity '{}'",
            def.title_attribute, def.name
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaError { errors })
    }
}

fn validate_ident(name: &str, what: &str, max_len: usize, errors: &mut Vec<String>) {
    if name.is_empty() {
        errors.push(format!("{what} name is empty"));
        return;
    }

    if name.len() > max_len {
        errors.push(format!(
            "{what} name '{name}' exceeds {max_len} characters"
        ));
    }

    let mut chars = name.chars();
    let head_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !head_ok || !tail_ok {
        errors.push(format!(
            "{what} name '{name}' must start with a letter and contain only letters, digits, and underscores"
        ));
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attribute::{Attribute, DataType, DisplayType},
        relation::Relation,
    };

    fn simple(name: &str) -> EntityDefinition {
        EntityDefinition::new(name, "name").attribute(Attribute::new("name", "Name"))
    }

    #[test]
    fn accepts_a_simple_entity() {
        assert!(validate_definition(&simple("post")).is_ok());
    }

    #[test]
    fn dropdown_without_choices_is_rejected() {
        let def = EntityDefinition::new("post", "name").attribute(
            Attribute::new("name", "Name").with_display_type(DisplayType::Dropdown),
        );
        let err = validate_definition(&def).unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("no choices")), "{err}");
    }

    #[test]
    fn multiselect_with_choices_is_accepted() {
        let def = EntityDefinition::new("post", "name").attribute(
            Attribute::new("name", "Name")
                .with_display_type(DisplayType::Multiselect)
                .with_choices(["a", "b", "c"]),
        );
        assert!(validate_definition(&def).is_ok());
    }

    #[test]
    fn duplicate_and_system_names_are_rejected() {
        let def = simple("post")
            .attribute(Attribute::new("name", "Again"))
            .attribute(Attribute::new("id", "Id"));
        let err = validate_definition(&def).unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("duplicate attribute")));
        assert!(err.errors.iter().any(|e| e.contains("system attribute")));
    }

    #[test]
    fn relation_name_collision_is_rejected() {
        let def = simple("post").relation(Relation::lookup("name", "author"));
        let err = validate_definition(&def).unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("collides")));
    }

    #[test]
    fn unknown_title_attribute_is_rejected() {
        let def = EntityDefinition::new("post", "title")
            .attribute(Attribute::new("name", "Name"));
        let err = validate_definition(&def).unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("title attribute")));
    }

    #[test]
    fn tree_link_must_name_a_local_attribute() {
        let def = simple("category").relation(Relation::tree("children", "parent"));
        let err = validate_definition(&def).unwrap_err();
        assert!(err.errors.iter().any(|e| e.contains("unknown attribute")));

        let def = simple("category")
            .attribute(
                Attribute::new("parent", "Parent")
                    .with_data_type(DataType::Int)
                    .with_display_type(DisplayType::Number),
            )
            .relation(Relation::tree("children", "parent"));
        assert!(validate_definition(&def).is_ok());
    }

    #[test]
    fn bad_identifiers_are_rejected() {
        assert!(validate_definition(&simple("")).is_err());
        assert!(validate_definition(&simple("1post")).is_err());
        assert!(validate_definition(&simple("po st")).is_err());
        assert!(validate_definition(&simple(&"p".repeat(65))).is_err());
    }
}
