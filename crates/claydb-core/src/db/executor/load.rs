use crate::{
    db::{
        DbInner,
        cursor::{ContinuationToken, PlanSignature},
        executor::{Resolver, project_scalars},
        publication,
        query::{
            CompiledSortField, ListQuery, QueryMode, ResponseMode, after_boundary, compile_query,
            compute_page_window, evaluate_filter, order_records,
        },
        response::{JsonMap, ListResponse},
    },
    error::Error,
    record::Record,
    types::Timestamp,
    value::Value,
};
use claydb_schema::{relation::RelationKind, version::SchemaMode};
use tracing::debug;

///
/// LoadExecutor
///

pub(in crate::db) struct LoadExecutor<'a> {
    inner: &'a DbInner,
}

impl<'a> LoadExecutor<'a> {
    pub(in crate::db) const fn new(inner: &'a DbInner) -> Self {
        Self { inner }
    }

    /// Execute a structured list query.
    ///
    /// Pipeline: resolve schema → compile filter/sort → visibility filter
    /// → predicate evaluation (with join multiplicity) → order → window
    /// (offset or cursor) → relation resolution → projection.
    pub(in crate::db) fn query(&self, query: &ListQuery) -> Result<ListResponse, Error> {
        let compiled = compile_query(&self.inner.registry, query)?;
        let now = Timestamp::wall_now();

        let mut matched: Vec<(Record, usize)> = Vec::new();
        for record in self.inner.data.records(&query.entity)? {
            if !publication::visible(&record, query.mode, now) {
                continue;
            }

            let multiplicity = match &compiled.filter {
                Some(filter) => evaluate_filter(filter, &record, self.inner)?,
                None => 1,
            };
            if multiplicity == 0 {
                continue;
            }

            // Distinct collapses join fan-out duplicates without dropping
            // matching parents.
            let multiplicity = if query.distinct { 1 } else { multiplicity };
            matched.push((record, multiplicity));
        }

        let total: u64 = matched
            .iter()
            .map(|(_, m)| u64::try_from(*m).unwrap_or(u64::MAX))
            .sum();

        if query.response_mode == Some(ResponseMode::Count) {
            debug!(entity = %query.entity, total, "count-only query");
            return Ok(ListResponse {
                items: Vec::new(),
                total_records: total,
                cursor: None,
            });
        }

        let mut rows = Vec::with_capacity(matched.len());
        for (record, multiplicity) in matched {
            for _ in 1..multiplicity {
                rows.push(record.clone());
            }
            rows.push(record);
        }

        order_records(&mut rows, &compiled.sort, self.inner)?;

        let signature = PlanSignature::of_list(query)?;
        if let Some(token) = &query.cursor {
            let token = ContinuationToken::decode(token, signature)?;
            rows = self.rows_after_boundary(rows, &compiled.sort, token.boundary())?;
        }

        let offset = query.offset.unwrap_or(0);
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let (page, next_cursor) = if let Some(limit) = query.limit {
            // One probe row past the window decides whether a fresh
            // continuation token is minted.
            let window = compute_page_window(offset, limit, true);
            let truncated = rows.len() >= window.fetch_count;
            rows.truncate(window.keep_count);

            let page: Vec<Record> = rows.split_off(skip.min(rows.len()));
            let next = if truncated {
                self.page_cursor(&page, &compiled.sort, signature)?
            } else {
                None
            };
            (page, next)
        } else {
            (rows.split_off(skip.min(rows.len())), None)
        };

        let total_records = if query.response_mode == Some(ResponseMode::Items) {
            0
        } else {
            total
        };

        let resolver = Resolver::new(self.inner, query.mode, now);
        let items = resolver.project(compiled.def, &page, &query.fields, &query.relation_args)?;

        debug!(entity = %query.entity, rows = items.len(), total, "query executed");

        Ok(ListResponse {
            items,
            total_records,
            cursor: next_cursor,
        })
    }

    // Keep only rows strictly after the cursor boundary in sort order.
    fn rows_after_boundary(
        &self,
        rows: Vec<Record>,
        sort: &[CompiledSortField],
        boundary: &[Value],
    ) -> Result<Vec<Record>, Error> {
        let mut kept = Vec::with_capacity(rows.len());
        for record in rows {
            let mut keys = Vec::with_capacity(sort.len());
            for field in sort {
                keys.push(field.key_of(&record, self.inner)?);
            }
            if after_boundary(&record, &keys, sort, boundary) {
                kept.push(record);
            }
        }
        Ok(kept)
    }

    // Fresh continuation token describing the last row of a full page.
    fn page_cursor(
        &self,
        page: &[Record],
        sort: &[CompiledSortField],
        signature: PlanSignature,
    ) -> Result<Option<String>, Error> {
        let Some(last) = page.last() else {
            return Ok(None);
        };

        let mut boundary = Vec::with_capacity(sort.len() + 1);
        for field in sort {
            boundary.push(field.key_of(last, self.inner)?);
        }
        boundary.push(last.id().map_or(Value::Null, Value::from));

        Some(ContinuationToken::new(signature, boundary).encode()).transpose()
    }

    /// Fetch one record with every scalar plus lookups resolved one level.
    pub(in crate::db) fn single(&self, entity: &str, id: u64) -> Result<JsonMap, Error> {
        let def = self.inner.registry.resolve(entity, SchemaMode::Sandbox)?;
        let record = self
            .inner
            .data
            .record(entity, id)?
            .ok_or_else(|| Error::unknown_record(entity, id))?;

        let mut json = project_scalars(def, &record);

        for relation in &def.relations {
            if !matches!(relation.kind, RelationKind::Lookup { .. }) {
                continue;
            }

            let target_name = relation.target_entity(entity);
            let nested = match record.get(&relation.name).as_id() {
                Some(target_id) => self
                    .inner
                    .data
                    .record(target_name, target_id)?
                    .map(|target| {
                        let target_def = self
                            .inner
                            .registry
                            .resolve(target_name, SchemaMode::Sandbox)?;
                        Ok::<_, Error>(serde_json::Value::Object(project_scalars(
                            target_def, &target,
                        )))
                    })
                    .transpose()?
                    .unwrap_or(serde_json::Value::Null),
                None => serde_json::Value::Null,
            };
            json.insert(relation.name.clone(), nested);
        }

        Ok(json)
    }

    /// Admin convenience: plain offset listing without a filter.
    pub(in crate::db) fn list(
        &self,
        entity: &str,
        offset: u64,
        limit: u64,
    ) -> Result<ListResponse, Error> {
        self.query(&ListQuery::new(entity).page(offset, limit).in_mode(QueryMode::Preview))
    }
}
