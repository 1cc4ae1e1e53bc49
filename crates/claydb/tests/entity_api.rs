mod common;

use claydb::Db;
use claydb::prelude::*;
use common::*;
use serde_json::json;

#[test]
fn insert_and_query_date_field() {
    let db = Db::new();
    db.ensure_entity(
        simple_entity("post").attribute(
            Attribute::new("start", "Start")
                .with_data_type(DataType::Datetime)
                .with_display_type(DisplayType::Date),
        ),
    )
    .unwrap();

    db.insert("post", &json!({"name": "post1", "start": "2025-01-01"})).unwrap();
    db.insert("post", &json!({"name": "post2", "start": "2025-01-02"})).unwrap();
    db.insert("post", &json!({"name": "post3", "start": "2025-01-03"})).unwrap();

    // Boundary excluded: exactly the records strictly after Jan 1.
    let res = db
        .query(
            &ListQuery::new("post")
                .filter(FilterNode::clause("start", FilterOp::DateAfter, json!("2025-01-01")))
                .page(0, 100),
        )
        .unwrap();
    assert_eq!(res.total_records, 2);
    assert_eq!(res.items.len(), 2);
}

#[test]
fn publication_defaults_follow_the_entity_flag() {
    let db = Db::new();
    ensure_simple(&db, "post");

    // Publication disabled: inserts land published immediately.
    let item = insert_named(&db, "post", "post1");
    assert_eq!(status_of(&item), "published");

    // Redefining with publication enabled flips the default to draft.
    db.ensure_entity(simple_entity("post").with_publication(true)).unwrap();
    let item = insert_named(&db, "post", "post2");
    assert_eq!(status_of(&item), "draft");

    // The draft is invisible to default-mode queries, visible to preview.
    let res = db.query(&ListQuery::new("post")).unwrap();
    assert_eq!(res.items.len(), 1);

    let res = db.query(&ListQuery::new("post").in_mode(QueryMode::Preview)).unwrap();
    assert_eq!(res.items.len(), 2);
}

#[test]
fn publish_unpublish_and_schedule() {
    let db = Db::new();
    db.ensure_entity(simple_entity("post").with_publication(true)).unwrap();

    let item = insert_named(&db, "post", "name1");
    assert_eq!(status_of(&item), "draft");

    db.save_publication_settings("post", 1, PublicationStatus::Published, Some("2025-01-01"))
        .unwrap();
    let item = db.single("post", 1).unwrap();
    assert_eq!(status_of(&item), "published");

    db.save_publication_settings("post", 1, PublicationStatus::Unpublished, None).unwrap();
    let item = db.single("post", 1).unwrap();
    assert_eq!(status_of(&item), "unpublished");

    db.save_publication_settings("post", 1, PublicationStatus::Scheduled, Some("2025-01-01"))
        .unwrap();
    let item = db.single("post", 1).unwrap();
    assert_eq!(status_of(&item), "scheduled");
    assert_eq!(
        item.get("publishedAt").and_then(serde_json::Value::as_str),
        Some("2025-01-01T00:00:00.000000Z")
    );

    // Scheduling without a timestamp is not a legal transition.
    let err = db
        .save_publication_settings("post", 1, PublicationStatus::Scheduled, None)
        .unwrap_err();
    assert!(matches!(err, Error::ValidationFailure(_)));
}

#[test]
fn dropdown_attribute_must_have_options() {
    let db = Db::new();
    let res = db.ensure_entity(
        EntityDefinition::new("post", "name").attribute(
            Attribute::new("name", "Name").with_display_type(DisplayType::Dropdown),
        ),
    );
    assert!(matches!(res, Err(Error::SchemaValidation(_))));

    // Construction-time failure: nothing was stored.
    assert!(db.list("post", 0, 10).is_err());
}

#[test]
fn cannot_insert_null_title_entity() {
    let db = Db::new();
    ensure_simple(&db, "post");

    let res = db.insert("post", &json!({"name": null}));
    assert!(matches!(res, Err(Error::ValidationFailure(_))));

    let res = db.insert("post", &json!({}));
    assert!(matches!(res, Err(Error::ValidationFailure(_))));
}

#[test]
fn validation_rule_message_is_verbatim() {
    let db = Db::new();
    db.ensure_entity(
        EntityDefinition::new("post", "name").attribute(
            Attribute::new("name", "Name")
                .with_validation(r#"name==null?"name-null-fail":"""#)
                .unwrap(),
        ),
    )
    .unwrap();

    let err = db.insert("post", &json!({"name": null})).unwrap_err();
    assert!(err.to_string().contains("name-null-fail"));
}

#[test]
fn regex_validator() {
    let db = Db::new();
    db.ensure_entity(
        EntityDefinition::new("post", "name").attribute(
            Attribute::new("name", "Name")
                .with_validation(
                    r#"matches(name, "^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$")?"":"regex-match-fail""#,
                )
                .unwrap(),
        ),
    )
    .unwrap();

    let err = db.insert("post", &json!({"name": "aa"})).unwrap_err();
    assert!(err.to_string().contains("regex-match-fail"));

    db.insert("post", &json!({"name": "a@b.com"})).unwrap();
}

#[test]
fn multiselect_stores_a_list() {
    let db = Db::new();
    db.ensure_entity(
        EntityDefinition::new("post", "name").attribute(
            Attribute::new("name", "Name")
                .with_display_type(DisplayType::Multiselect)
                .with_choices(["a", "b", "c", "d", "e", "f"]),
        ),
    )
    .unwrap();

    db.insert("post", &json!({"name": ["a", "b", "c"]})).unwrap();
    let item = db.single("post", 1).unwrap();
    let values = item.get("name").and_then(serde_json::Value::as_array).unwrap();
    assert_eq!(values.len(), 3);

    // Values outside the declared choice set are rejected.
    let res = db.insert("post", &json!({"name": ["a", "z"]}));
    assert!(matches!(res, Err(Error::ValidationFailure(_))));
}

#[test]
fn gallery_stores_a_list_without_choices() {
    let db = Db::new();
    db.ensure_entity(
        EntityDefinition::new("post", "name").attribute(
            Attribute::new("name", "Name").with_display_type(DisplayType::Gallery),
        ),
    )
    .unwrap();

    db.insert("post", &json!({"name": ["a", "b", "c"]})).unwrap();
    let item = db.single("post", 1).unwrap();
    let values = item.get("name").and_then(serde_json::Value::as_array).unwrap();
    assert_eq!(values.len(), 3);
}

#[test]
fn dictionary_stores_an_object() {
    let db = Db::new();
    db.ensure_entity(
        EntityDefinition::new("post", "name").attribute(
            Attribute::new("name", "Name").with_display_type(DisplayType::Dictionary),
        ),
    )
    .unwrap();

    db.insert("post", &json!({"name": {"a": 1, "b": 2}})).unwrap();
    let item = db.single("post", 1).unwrap();
    let map = item.get("name").and_then(serde_json::Value::as_object).unwrap();
    assert_eq!(map.get("a").and_then(serde_json::Value::as_i64), Some(1));
    assert_eq!(map.get("b").and_then(serde_json::Value::as_i64), Some(2));
}

#[test]
fn response_mode_items_or_count() {
    let db = Db::new();
    ensure_simple(&db, "post");
    insert_named(&db, "post", "post1");

    let res = db
        .query(&ListQuery::new("post").page(0, 1).respond(ResponseMode::Count))
        .unwrap();
    assert!(res.items.is_empty());
    assert_eq!(res.total_records, 1);

    let res = db
        .query(&ListQuery::new("post").page(0, 1).respond(ResponseMode::Items))
        .unwrap();
    assert_eq!(res.items.len(), 1);
    assert_eq!(res.total_records, 0);
}

#[test]
fn get_result_as_tree() {
    let blog = Blog::new();
    let db = &blog.db;

    db.insert("category", &json!({"name": "cat1"})).unwrap();
    db.insert("category", &json!({"name": "cat2"})).unwrap();
    db.insert("category", &json!({"name": "cat3"})).unwrap();
    db.collection_insert("category", "children", 1, &json!({"name": "cat1-1"})).unwrap();
    db.collection_insert("category", "children", 1, &json!({"name": "cat1-2"})).unwrap();

    let items = db.list_as_tree("category").unwrap();
    assert_eq!(items.len(), 3);

    let children = items[0].get("children").and_then(serde_json::Value::as_array).unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(
        children[0].get("name").and_then(serde_json::Value::as_str),
        Some("cat1-1")
    );
}

#[test]
fn prevent_dirty_write() {
    let db = Db::new();
    ensure_simple(&db, "post");
    insert_named(&db, "post", "post1");

    let item = db.single("post", 1).unwrap();
    let stale = updated_at_of(&item);

    db.update("post", 1, &json!({"name": "post2"}), &stale).unwrap();
    let fresh = db.single("post", 1).unwrap();
    assert_ne!(updated_at_of(&fresh), stale);

    // The old token can no longer update or delete.
    let res = db.delete("post", 1, &stale);
    assert!(matches!(res, Err(Error::ConcurrencyConflict(_))));

    let res = db.update("post", 1, &json!({"name": "post3"}), &stale);
    assert!(matches!(res, Err(Error::ConcurrencyConflict(_))));

    // The fresh token works.
    db.delete("post", 1, &updated_at_of(&fresh)).unwrap();
}

#[test]
fn insert_list_delete() {
    let db = Db::new();
    ensure_simple(&db, "post");
    insert_named(&db, "post", "post1");

    let res = db.list("post", 0, 10).unwrap();
    assert_eq!(res.items.len(), 1);

    let item = db.single("post", 1).unwrap();
    db.delete("post", 1, &updated_at_of(&item)).unwrap();

    let res = db.list("post", 0, 10).unwrap();
    assert!(res.items.is_empty());
    assert!(matches!(db.single("post", 1), Err(Error::NotFound(_))));
}

#[test]
fn insert_update_single() {
    let db = Db::new();
    ensure_simple(&db, "post");

    let item = insert_named(&db, "post", "post1");
    assert_eq!(id_of(&item), 1);

    let item = db.single("post", 1).unwrap();
    db.update("post", 1, &json!({"name": "post2"}), &updated_at_of(&item)).unwrap();

    let item = db.single("post", 1).unwrap();
    assert_eq!(item.get("name").and_then(serde_json::Value::as_str), Some("post2"));
}

#[test]
fn list_with_pagination() {
    let db = Db::new();
    ensure_simple(&db, "post");
    for i in 0..5 {
        insert_named(&db, "post", &format!("student{i}"));
    }
    insert_named(&db, "post", "good-student");
    insert_named(&db, "post", "good-student");

    assert_eq!(db.list("post", 0, 5).unwrap().items.len(), 5);
    assert_eq!(db.list("post", 5, 5).unwrap().items.len(), 2);
}

#[test]
fn ids_are_never_recycled() {
    let db = Db::new();
    ensure_simple(&db, "post");
    insert_named(&db, "post", "post1");

    let item = db.single("post", 1).unwrap();
    db.delete("post", 1, &updated_at_of(&item)).unwrap();

    let item = insert_named(&db, "post", "post2");
    assert_eq!(id_of(&item), 2);
}

#[test]
fn insert_lookup_with_wrong_data() {
    let db = Db::new();
    ensure_simple(&db, "author");
    db.ensure_entity(simple_entity("post").relation(Relation::lookup("author", "author")))
        .unwrap();

    let res = db.insert("post", &json!({"name": "post1", "author": 99}));
    assert!(matches!(res, Err(Error::RelationIntegrity(_))));
}

#[test]
fn insert_with_lookup_resolves_on_read() {
    let db = Db::new();
    ensure_simple(&db, "author");
    db.ensure_entity(simple_entity("post").relation(Relation::lookup("author", "author")))
        .unwrap();

    let author = insert_named(&db, "author", "author1");
    db.insert("post", &json!({"name": "post1", "author": id_of(&author)})).unwrap();

    let item = db.single("post", 1).unwrap();
    let nested = item.get("author").and_then(serde_json::Value::as_object).unwrap();
    assert_eq!(nested.get("name").and_then(serde_json::Value::as_str), Some("author1"));
}

#[test]
fn junction_add_list_delete() {
    let blog = Blog::new();
    let db = &blog.db;

    insert_named(db, "tag", "tag1");
    insert_named(db, "post", "post1");

    db.junction_add("post", "tags", 1, 1).unwrap();
    let unassigned = db.junction_list("post", "tags", 1, true).unwrap();
    assert!(unassigned.items.is_empty());

    let ids = db.junction_target_ids("post", "tags", 1).unwrap();
    assert_eq!(ids, vec![1]);

    let assigned = db.junction_list("post", "tags", 1, false).unwrap();
    assert_eq!(assigned.items.len(), 1);

    db.junction_delete("post", "tags", 1, 1).unwrap();
    assert_eq!(db.junction_list("post", "tags", 1, true).unwrap().items.len(), 1);
    assert!(db.junction_list("post", "tags", 1, false).unwrap().items.is_empty());
    assert!(db.junction_target_ids("post", "tags", 1).unwrap().is_empty());
}

#[test]
fn junction_lists_partition_the_target_set() {
    let blog = Blog::new();
    let db = &blog.db;

    insert_named(db, "post", "post1");
    for i in 1..=5 {
        insert_named(db, "tag", &format!("tag{i}"));
    }
    db.junction_add("post", "tags", 1, 2).unwrap();
    db.junction_add("post", "tags", 1, 4).unwrap();

    let assigned = db.junction_list("post", "tags", 1, false).unwrap();
    let unassigned = db.junction_list("post", "tags", 1, true).unwrap();

    let mut all: Vec<u64> = assigned.items.iter().chain(unassigned.items.iter()).map(id_of).collect();
    all.sort_unstable();
    assert_eq!(all, vec![1, 2, 3, 4, 5]);
    assert_eq!(assigned.items.len(), 2);
    assert_eq!(unassigned.items.len(), 3);
}

#[test]
fn junction_against_wrong_relation_kind() {
    let blog = Blog::new();
    let db = &blog.db;

    insert_named(db, "author", "author1");
    insert_named(db, "post", "post1");

    // author is a lookup relation of post; junction ops must refuse it.
    let res = db.junction_add("post", "author", 1, 1);
    assert!(matches!(res, Err(Error::RelationIntegrity(_))));

    let res = db.junction_list("post", "author", 1, false);
    assert!(matches!(res, Err(Error::RelationIntegrity(_))));
}

#[test]
fn deleting_a_record_drops_its_links() {
    let blog = Blog::new();
    let db = &blog.db;

    insert_named(db, "post", "post1");
    insert_named(db, "tag", "tag1");
    db.junction_add("post", "tags", 1, 1).unwrap();

    let tag = db.single("tag", 1).unwrap();
    db.delete("tag", 1, &updated_at_of(&tag)).unwrap();

    assert!(db.junction_target_ids("post", "tags", 1).unwrap().is_empty());
    // The subject endpoint survives.
    assert!(db.single("post", 1).is_ok());
}

#[test]
fn lookup_list_typeahead() {
    let db = Db::new();
    ensure_simple(&db, "tag");

    // One short of a page: no more candidates beyond the boundary.
    for i in 0..19 {
        insert_named(&db, "tag", &format!("tag{i}"));
    }
    let res = db.lookup_list("tag", "").unwrap();
    assert!(!res.has_more);
    assert_eq!(res.items.len(), 19);

    for i in 20..30 {
        insert_named(&db, "tag", &format!("tag{i}"));
    }
    let res = db.lookup_list("tag", "").unwrap();
    assert!(res.has_more);
    assert_eq!(res.items.len(), 20);

    let res = db.lookup_list("tag", "tag11").unwrap();
    assert_eq!(res.items.len(), 1);
}

#[test]
fn collection_api() {
    let blog = Blog::new();
    let db = &blog.db;

    insert_named(db, "post", "post1");
    db.collection_insert("post", "attachments", 1, &json!({"name": "attachment1"}))
        .unwrap();

    let res = db.collection_list("post", "attachments", 1).unwrap();
    assert_eq!(res.items.len(), 1);

    // Deleting the child never deletes the parent, and the parent's view
    // reflects the removal immediately.
    let item = db.single("attachment", 1).unwrap();
    db.delete("attachment", 1, &updated_at_of(&item)).unwrap();

    let res = db.collection_list("post", "attachments", 1).unwrap();
    assert!(res.items.is_empty());
    assert!(db.single("post", 1).is_ok());
}

#[test]
fn collection_insert_against_wrong_kind() {
    let blog = Blog::new();
    let db = &blog.db;
    insert_named(db, "post", "post1");

    let res = db.collection_insert("post", "tags", 1, &json!({"name": "x"}));
    assert!(matches!(res, Err(Error::RelationIntegrity(_))));
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clay.db");

    {
        let db = Db::open(&path).unwrap();
        db.ensure_entity(simple_entity("post").with_publication(true)).unwrap();
        insert_named(&db, "post", "post1");
        db.ensure_entity(simple_entity("tag")).unwrap();
        insert_named(&db, "tag", "tag1");
    }

    let db = Db::open(&path).unwrap();
    let item = db.single("post", 1).unwrap();
    assert_eq!(item.get("name").and_then(serde_json::Value::as_str), Some("post1"));
    assert_eq!(status_of(&item), "draft");

    // Schema metadata survived too: publication stays enabled and the id
    // sequence continues instead of recycling.
    let item = insert_named(&db, "post", "post2");
    assert_eq!(id_of(&item), 2);
    assert_eq!(status_of(&item), "draft");
}
