#![allow(dead_code)]

use claydb::Db;
use claydb::prelude::*;
use serde_json::json;

/// Entity with a single text attribute `name`, which is also the title.
pub fn simple_entity(name: &str) -> EntityDefinition {
    EntityDefinition::new(name, "name").attribute(Attribute::new("name", "Name"))
}

pub fn ensure_simple(db: &Db, name: &str) {
    db.ensure_entity(simple_entity(name)).unwrap();
}

pub fn insert_named(db: &Db, entity: &str, name: &str) -> JsonMap {
    db.insert(entity, &json!({ "name": name })).unwrap()
}

pub fn id_of(item: &JsonMap) -> u64 {
    item.get("id").and_then(serde_json::Value::as_u64).unwrap()
}

pub fn updated_at_of(item: &JsonMap) -> String {
    item.get("updatedAt")
        .and_then(serde_json::Value::as_str)
        .unwrap()
        .to_string()
}

pub fn status_of(item: &JsonMap) -> &str {
    item.get("publicationStatus")
        .and_then(serde_json::Value::as_str)
        .unwrap()
}

/// The blog fixture: author, tag, attachment, and post with one relation
/// of each kind (lookup, junction, collection) plus a tree category.
pub struct Blog {
    pub db: Db,
}

impl Blog {
    pub fn new() -> Self {
        let db = Db::new();

        db.ensure_entity(simple_entity("author")).unwrap();
        db.ensure_entity(simple_entity("tag")).unwrap();

        // Relation targets must exist before they are referenced, so post
        // starts simple and is redefined once attachment exists; the
        // second definition lands as a draft and is published explicitly.
        db.ensure_entity(simple_entity("post")).unwrap();
        db.ensure_entity(
            simple_entity("attachment").relation(Relation::lookup("post", "post")),
        )
        .unwrap();
        db.ensure_entity(
            simple_entity("post")
                .relation(Relation::lookup("author", "author"))
                .relation(Relation::junction("tags", "tag"))
                .relation(Relation::collection("attachments", "attachment", "post")),
        )
        .unwrap();
        db.publish_entity("post").unwrap();

        db.ensure_entity(
            EntityDefinition::new("category", "name")
                .attribute(Attribute::new("name", "Name"))
                .attribute(
                    Attribute::new("parent", "Parent")
                        .with_data_type(DataType::Int)
                        .with_display_type(DisplayType::Number),
                )
                .relation(Relation::tree("children", "parent")),
        )
        .unwrap();

        Self { db }
    }
}
