use serde::Serialize;
use serde_json::Value;

use super::store::{Collection, Document, DocumentStore, FindOptions, StoreError};
use crate::filter::{field_value, Condition, PageRef, QueryDescriptor};

/// Related documents attached to each record of a page
#[derive(Debug, Clone, Copy)]
pub enum Include {
    /// Children whose `foreign_key` equals the record's id, as an array
    HasMany { collection: Collection, foreign_key: &'static str, as_field: &'static str },
    /// The parent referenced by the record's `local_key`, reduced to `fields`
    BelongsTo { collection: Collection, local_key: &'static str, fields: &'static [&'static str] },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaginationLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

#[derive(Debug, Clone)]
pub struct PageResult {
    pub records: Vec<Document>,
    /// Matching documents before pagination
    pub total: u64,
    pub next: Option<PageRef>,
    pub prev: Option<PageRef>,
}

impl PageResult {
    pub fn links(&self) -> PaginationLinks {
        PaginationLinks { next: self.next, prev: self.prev }
    }
}

/// Run a translated list query: filter, sort, page, then project and attach
/// related documents to the records on the page.
pub async fn execute(
    store: &dyn DocumentStore,
    collection: Collection,
    query: &QueryDescriptor,
    include: Option<Include>,
) -> Result<PageResult, StoreError> {
    let pagination = query.pagination;
    let total = store.count(collection, &query.filter).await?;

    let options = FindOptions {
        filter: &query.filter,
        sort: &query.sort,
        skip: pagination.start_index(),
        limit: Some(pagination.limit as u64),
    };
    let mut records: Vec<Document> = store
        .find(collection, options)
        .await?
        .into_iter()
        .map(|doc| project(doc, &query.select))
        .collect();

    if let Some(include) = include {
        for record in records.iter_mut() {
            include_related(store, record, include).await?;
        }
    }

    let next = (pagination.end_index() < total).then(|| PageRef { page: pagination.page + 1, limit: pagination.limit });
    let prev = (pagination.start_index() > 0).then(|| PageRef { page: pagination.page - 1, limit: pagination.limit });

    Ok(PageResult { records, total, next, prev })
}

/// Keep only `fields`; a dotted field keeps just that nested value inside
/// its parent object. `id` always survives.
pub fn project(doc: Document, fields: &[String]) -> Document {
    if fields.is_empty() {
        return doc;
    }
    let mut out = Document::new();
    if let Some(id) = doc.get("id") {
        out.insert("id".into(), id.clone());
    }
    for field in fields {
        if let Some(value) = field_value(&doc, field) {
            insert_path(&mut out, field, value.clone());
        }
    }
    out
}

fn insert_path(target: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let parent = target.entry(head.to_string()).or_insert_with(|| Value::Object(Document::new()));
            if let Value::Object(inner) = parent {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// Attach one relation to a single record
pub async fn include_related(store: &dyn DocumentStore, record: &mut Document, include: Include) -> Result<(), StoreError> {
    match include {
        Include::HasMany { collection, foreign_key, as_field } => {
            let Some(id) = record.get("id").and_then(Value::as_str).map(str::to_string) else {
                return Ok(());
            };
            let filter = [Condition::eq(foreign_key, id)];
            let children = store.find(collection, FindOptions::filter(&filter)).await?;
            record.insert(as_field.to_string(), Value::Array(children.into_iter().map(Value::Object).collect()));
        }
        Include::BelongsTo { collection, local_key, fields } => {
            let Some(parent_id) = record.get(local_key).and_then(Value::as_str).map(str::to_string) else {
                return Ok(());
            };
            let parent = match store.find_by_id(collection, &parent_id).await {
                Ok(parent) => parent,
                Err(StoreError::InvalidId(_)) => None,
                Err(e) => return Err(e),
            };
            if let Some(parent) = parent {
                let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
                record.insert(local_key.to_string(), Value::Object(project(parent, &fields)));
            }
        }
    }
    Ok(())
}
