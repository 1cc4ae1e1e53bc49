use crate::{
    db::{
        DEFAULT_PAGE_SIZE, DbInner,
        cursor::{PlanSignature, RelationToken},
        executor::project_scalars,
        publication,
        query::{FieldSelection, QueryMode, RelationArgs},
        response::{JsonMap, ListResponse, LookupListResponse},
    },
    error::Error,
    record::Record,
    types::Timestamp,
    value::value_to_json,
};
use claydb_schema::{
    entity::EntityDefinition,
    relation::{Relation, RelationKind},
    system,
};
use std::collections::{BTreeMap, BTreeSet};

///
/// Resolver
///
/// Resolves nested field selections into record JSON trees. Each relation
/// of a parent page is resolved in one batched pass over the related
/// store (never one query per parent), and each group is independently
/// windowed by its per-relation limit/cursor.
///

pub(in crate::db) struct Resolver<'a> {
    inner: &'a DbInner,
    mode: QueryMode,
    now: Timestamp,
}

impl<'a> Resolver<'a> {
    pub(in crate::db) const fn new(inner: &'a DbInner, mode: QueryMode, now: Timestamp) -> Self {
        Self { inner, mode, now }
    }

    /// Project a page of records against a field selection tree.
    ///
    /// An empty selection projects every scalar attribute plus the system
    /// attributes; relation args only apply to the root level.
    pub(in crate::db) fn project(
        &self,
        def: &EntityDefinition,
        records: &[Record],
        selections: &[FieldSelection],
        args: &BTreeMap<String, RelationArgs>,
    ) -> Result<Vec<JsonMap>, Error> {
        if selections.is_empty() {
            return Ok(records.iter().map(|r| project_scalars(def, r)).collect());
        }

        let mut out = vec![JsonMap::new(); records.len()];

        for selection in selections {
            let name = selection.field.as_str();

            if system::ALL.contains(&name) || def.get_attribute(name).is_some() {
                for (idx, record) in records.iter().enumerate() {
                    out[idx].insert(name.to_string(), value_to_json(record.get(name)));
                }
                continue;
            }

            let relation = def.get_relation(name).ok_or_else(|| {
                Error::invalid_path(name, &format!("unknown field on entity '{}'", def.name))
            })?;

            match &relation.kind {
                RelationKind::Lookup { .. } => {
                    self.resolve_lookup(def, relation, records, selection, &mut out)?;
                }
                RelationKind::Collection { .. }
                | RelationKind::Tree { .. }
                | RelationKind::Junction { .. } => {
                    self.resolve_many(def, relation, records, selection, args.get(name), &mut out)?;
                }
            }
        }

        Ok(out)
    }

    // One batched pass: fetch each distinct target id once, then fan the
    // projected targets back out to the parents. A dangling reference
    // resolves to null, never a failure.
    fn resolve_lookup(
        &self,
        def: &EntityDefinition,
        relation: &Relation,
        records: &[Record],
        selection: &FieldSelection,
        out: &mut [JsonMap],
    ) -> Result<(), Error> {
        let target_name = relation.target_entity(&def.name).to_string();
        let target_def = self
            .inner
            .registry
            .resolve(&target_name, self.mode.schema_mode())?;

        let ids: Vec<Option<u64>> = records
            .iter()
            .map(|r| r.get(&relation.name).as_id())
            .collect();

        let mut resolved: BTreeMap<u64, JsonMap> = BTreeMap::new();
        for id in ids.iter().flatten() {
            if resolved.contains_key(id) {
                continue;
            }
            let Some(target) = self.inner.data.record(&target_name, *id)? else {
                continue;
            };
            if !publication::visible(&target, self.mode, self.now) {
                continue;
            }
            let projected = self
                .project(target_def, std::slice::from_ref(&target), &selection.selections, &BTreeMap::new())?
                .pop()
                .unwrap_or_default();
            resolved.insert(*id, projected);
        }

        for (idx, id) in ids.iter().enumerate() {
            let json = id
                .and_then(|id| resolved.get(&id).cloned())
                .map_or(serde_json::Value::Null, serde_json::Value::Object);
            out[idx].insert(relation.name.clone(), json);
        }

        Ok(())
    }

    fn resolve_many(
        &self,
        def: &EntityDefinition,
        relation: &Relation,
        records: &[Record],
        selection: &FieldSelection,
        args: Option<&RelationArgs>,
        out: &mut [JsonMap],
    ) -> Result<(), Error> {
        let target_name = relation.target_entity(&def.name).to_string();
        let target_def = self
            .inner
            .registry
            .resolve(&target_name, self.mode.schema_mode())?;

        let parent_ids: BTreeSet<u64> = records.iter().filter_map(Record::id).collect();
        let mut groups = self.group_related(def, relation, &parent_ids)?;

        let signature = PlanSignature::of_relation(&def.name, &relation.name)?;
        let anchor = args
            .and_then(|a| a.cursor.as_deref())
            .map(|token| RelationToken::decode(token, signature))
            .transpose()?;
        let limit = args.and_then(|a| a.limit);

        for (idx, record) in records.iter().enumerate() {
            let children = record
                .id()
                .and_then(|id| groups.remove(&id))
                .unwrap_or_default();
            let parent_id = record.id().unwrap_or_default();

            let (page, next) =
                window_group(children, parent_id, limit, anchor.as_ref(), signature)?;

            let mut projected =
                self.project(target_def, &page, &selection.selections, &BTreeMap::new())?;
            if let (Some(token), Some(last)) = (next, projected.last_mut()) {
                last.insert("cursor".to_string(), serde_json::Value::String(token));
            }

            out[idx].insert(
                relation.name.clone(),
                serde_json::Value::Array(projected.into_iter().map(serde_json::Value::Object).collect()),
            );
        }

        Ok(())
    }

    /// Children for every parent on the page, grouped by parent id, in
    /// creation (id) order, publication-filtered by the request mode.
    fn group_related(
        &self,
        def: &EntityDefinition,
        relation: &Relation,
        parents: &BTreeSet<u64>,
    ) -> Result<BTreeMap<u64, Vec<Record>>, Error> {
        let target_name = relation.target_entity(&def.name).to_string();
        let mut groups: BTreeMap<u64, Vec<Record>> = BTreeMap::new();

        match &relation.kind {
            RelationKind::Collection { link_attribute, .. }
            | RelationKind::Tree { link_attribute } => {
                for child in self.inner.data.records(&target_name)? {
                    let Some(parent) = child.get(link_attribute).as_id() else {
                        continue;
                    };
                    if !parents.contains(&parent) {
                        continue;
                    }
                    if !publication::visible(&child, self.mode, self.now) {
                        continue;
                    }
                    groups.entry(parent).or_default().push(child);
                }
            }
            RelationKind::Junction { .. } => {
                for parent in parents {
                    let mut children = Vec::new();
                    for target_id in
                        self.inner.links.targets_of(&def.name, &relation.name, *parent)
                    {
                        let Some(child) = self.inner.data.record(&target_name, target_id)? else {
                            continue;
                        };
                        if publication::visible(&child, self.mode, self.now) {
                            children.push(child);
                        }
                    }
                    groups.insert(*parent, children);
                }
            }
            RelationKind::Lookup { .. } => {
                return Err(Error::RelationIntegrity(format!(
                    "relation '{}' is a lookup, not a collection",
                    relation.name
                )));
            }
        }

        Ok(groups)
    }

    /// Next chunk of one relation group, resumed from a relation cursor.
    pub(in crate::db) fn relation_part(
        &self,
        def: &EntityDefinition,
        relation_name: &str,
        token: &str,
        limit: u64,
    ) -> Result<ListResponse, Error> {
        let relation = def.get_relation(relation_name).ok_or_else(|| {
            Error::RelationIntegrity(format!(
                "entity '{}' has no relation '{relation_name}'",
                def.name
            ))
        })?;
        if !relation.is_to_many() {
            return Err(Error::RelationIntegrity(format!(
                "relation '{relation_name}' is a lookup; only to-many relations paginate"
            )));
        }

        let signature = PlanSignature::of_relation(&def.name, relation_name)?;
        let anchor = RelationToken::decode(token, signature)?;

        let parents = BTreeSet::from([anchor.parent_id]);
        let mut groups = self.group_related(def, relation, &parents)?;
        let children = groups.remove(&anchor.parent_id).unwrap_or_default();

        let (page, next) = window_group(
            children,
            anchor.parent_id,
            Some(limit),
            Some(&anchor),
            signature,
        )?;

        let target_def = self
            .inner
            .registry
            .resolve(relation.target_entity(&def.name), self.mode.schema_mode())?;
        let items = self.project(target_def, &page, &[], &BTreeMap::new())?;
        let total = items.len() as u64;

        Ok(ListResponse {
            items,
            total_records: total,
            cursor: next,
        })
    }

    /// Typeahead accessor: up to one page of candidates whose title
    /// attribute matches the prefix, plus a has-more probe.
    pub(in crate::db) fn lookup_list(
        &self,
        def: &EntityDefinition,
        prefix: &str,
    ) -> Result<LookupListResponse, Error> {
        let page = usize::try_from(DEFAULT_PAGE_SIZE).unwrap_or(usize::MAX);
        let needle = prefix.to_lowercase();
        let mut items = Vec::new();

        for record in self.inner.data.records(&def.name)? {
            let matched = needle.is_empty()
                || record
                    .get(&def.title_attribute)
                    .as_text()
                    .is_some_and(|title| title.to_lowercase().starts_with(&needle));
            if !matched {
                continue;
            }

            items.push(record);
            // One extra candidate decides has_more; never a count query.
            if items.len() > page {
                break;
            }
        }

        let has_more = items.len() > page;
        items.truncate(page);

        Ok(LookupListResponse {
            items: items.iter().map(|r| project_scalars(def, r)).collect(),
            has_more,
        })
    }

    /// Assemble the full tree for a tree-bearing entity: roots are records
    /// whose link attribute is null, children nested one level per pass.
    pub(in crate::db) fn list_as_tree(
        &self,
        def: &EntityDefinition,
    ) -> Result<Vec<serde_json::Value>, Error> {
        let relation = def.tree_relations().next().ok_or_else(|| {
            Error::RelationIntegrity(format!("entity '{}' has no tree relation", def.name))
        })?;
        let Some(link_attribute) = relation.link_attribute() else {
            return Err(Error::RelationIntegrity(format!(
                "tree relation '{}' has no link attribute",
                relation.name
            )));
        };

        let records = self.inner.data.records(&def.name)?;
        let mut children_of: BTreeMap<u64, Vec<&Record>> = BTreeMap::new();
        let mut roots: Vec<&Record> = Vec::new();

        for record in &records {
            match record.get(link_attribute).as_id() {
                Some(parent) => children_of.entry(parent).or_default().push(record),
                None => roots.push(record),
            }
        }

        let mut visited = BTreeSet::new();
        Ok(roots
            .iter()
            .map(|r| self.tree_node(def, &relation.name, r, &children_of, &mut visited))
            .collect())
    }

    fn tree_node(
        &self,
        def: &EntityDefinition,
        relation_name: &str,
        record: &Record,
        children_of: &BTreeMap<u64, Vec<&Record>>,
        visited: &mut BTreeSet<u64>,
    ) -> serde_json::Value {
        let mut json = project_scalars(def, record);

        let children = record
            .id()
            .filter(|id| visited.insert(*id))
            .and_then(|id| children_of.get(&id))
            .map(|children| {
                children
                    .iter()
                    .map(|c| self.tree_node(def, relation_name, c, children_of, visited))
                    .collect()
            })
            .unwrap_or_default();

        json.insert(relation_name.to_string(), serde_json::Value::Array(children));
        serde_json::Value::Object(json)
    }
}

// Window one relation group: resume past the cursor anchor (when it
// targets this parent), apply the limit, and mint a fresh token when rows
// remain past the boundary.
fn window_group(
    children: Vec<Record>,
    parent_id: u64,
    limit: Option<u64>,
    anchor: Option<&RelationToken>,
    signature: PlanSignature,
) -> Result<(Vec<Record>, Option<String>), Error> {
    let mut children = children;

    if let Some(anchor) = anchor
        && anchor.parent_id == parent_id
    {
        let last = anchor.last_child_id;
        children.retain(|c| c.id().is_some_and(|id| id > last));
    }

    let Some(limit) = limit else {
        return Ok((children, None));
    };

    let keep = usize::try_from(limit).unwrap_or(usize::MAX);
    let truncated = children.len() > keep;
    children.truncate(keep);

    let next = if truncated {
        children
            .last()
            .and_then(Record::id)
            .map(|last| RelationToken::new(signature, parent_id, last).encode())
            .transpose()?
    } else {
        None
    };

    Ok((children, next))
}
