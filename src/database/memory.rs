use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{parse_id, sanitize_changes, Collection, Document, DocumentStore, FindOptions, StoreError};
use crate::filter::filter_order::FilterOrder;
use crate::filter::Condition;

/// In-process store used for local development and tests. Documents keep
/// insertion order, which is the tie-break for equal sort keys.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_all(doc: &Document, filter: &[Condition]) -> bool {
    filter.iter().all(|c| c.matches(doc))
}

fn doc_id(doc: &Document) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

fn check_unique(collection: Collection, docs: &[Document], candidate: &Document) -> Result<(), StoreError> {
    let own_id = doc_id(candidate);
    for field in collection.unique_fields() {
        let Some(value) = candidate.get(*field) else { continue };
        if docs.iter().any(|d| doc_id(d) != own_id && d.get(*field) == Some(value)) {
            return Err(StoreError::Duplicate { field: field.to_string() });
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, options: FindOptions<'_>) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| matches_all(d, options.filter)).cloned().collect())
            .unwrap_or_default();
        drop(collections);

        if !options.sort.is_empty() {
            // stable: ties keep insertion order
            docs.sort_by(|a, b| FilterOrder::compare(a, b, options.sort));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let take = options.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(docs.into_iter().skip(skip).take(take).collect())
    }

    async fn count(&self, collection: Collection, filter: &[Condition]) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| matches_all(d, filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        parse_id(id)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| doc_id(d) == Some(id)).cloned()))
    }

    async fn insert(&self, collection: Collection, mut doc: Document) -> Result<Document, StoreError> {
        match doc.get("id").and_then(Value::as_str) {
            Some(id) => {
                parse_id(id)?;
            }
            None => {
                doc.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
            }
        }
        if !doc.contains_key("created_at") {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            doc.insert("created_at".into(), Value::String(now));
        }

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|d| doc_id(d) == doc_id(&doc)) {
            return Err(StoreError::Duplicate { field: "id".into() });
        }
        check_unique(collection, docs, &doc)?;
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: Collection, id: &str, changes: Document) -> Result<Option<Document>, StoreError> {
        parse_id(id)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        let Some(pos) = docs.iter().position(|d| doc_id(d) == Some(id)) else {
            return Ok(None);
        };

        let mut updated = docs[pos].clone();
        updated.extend(sanitize_changes(changes));
        check_unique(collection, docs, &updated)?;
        docs[pos] = updated.clone();
        Ok(Some(updated))
    }

    async fn update_matching(
        &self,
        collection: Collection,
        id: &str,
        filter: &[Condition],
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        parse_id(id)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        let Some(pos) = docs.iter().position(|d| doc_id(d) == Some(id) && matches_all(d, filter)) else {
            return Ok(None);
        };

        let mut updated = docs[pos].clone();
        updated.extend(sanitize_changes(changes));
        check_unique(collection, docs, &updated)?;
        docs[pos] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        parse_id(id)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        Ok(docs.iter().position(|d| doc_id(d) == Some(id)).map(|pos| docs.remove(pos)))
    }

    async fn delete_many(&self, collection: Collection, filter: &[Condition]) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        let before = docs.len();
        docs.retain(|d| !matches_all(d, filter));
        Ok((before - docs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_order::FilterOrder;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_id_and_created_at() {
        let store = MemoryStore::new();
        let saved = store.insert(Collection::Courses, doc(json!({"title": "Rust"}))).await.unwrap();
        let id = saved["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert!(saved.contains_key("created_at"));
        let found = store.find_by_id(Collection::Courses, id).await.unwrap().unwrap();
        assert_eq!(found["title"], "Rust");
    }

    #[tokio::test]
    async fn malformed_ids_are_rejected() {
        let store = MemoryStore::new();
        let err = store.find_by_id(Collection::Bootcamps, "5d725a1b7b292f5f8ceff788").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(id) if id == "5d725a1b7b292f5f8ceff788"));
    }

    #[tokio::test]
    async fn unique_fields_are_enforced_on_insert_and_update() {
        let store = MemoryStore::new();
        store.insert(Collection::Users, doc(json!({"email": "a@x.io"}))).await.unwrap();
        let other = store.insert(Collection::Users, doc(json!({"email": "b@x.io"}))).await.unwrap();

        let err = store.insert(Collection::Users, doc(json!({"email": "a@x.io"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field } if field == "email"));

        let id = other["id"].as_str().unwrap();
        let err = store.update(Collection::Users, id, doc(json!({"email": "a@x.io"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));

        // Re-saving its own value is fine
        assert!(store.update(Collection::Users, id, doc(json!({"email": "b@x.io"}))).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_matching_only_writes_while_the_filter_holds() {
        let store = MemoryStore::new();
        let saved = store.insert(Collection::Users, doc(json!({"reset_password_token": "abc"}))).await.unwrap();
        let id = saved["id"].as_str().unwrap();
        let filter = [Condition::eq("reset_password_token", "abc")];

        let first = store
            .update_matching(Collection::Users, id, &filter, doc(json!({"reset_password_token": null})))
            .await
            .unwrap();
        assert_eq!(first.unwrap()["reset_password_token"], Value::Null);

        let second = store
            .update_matching(Collection::Users, id, &filter, doc(json!({"reset_password_token": null})))
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn update_keeps_identity_fields() {
        let store = MemoryStore::new();
        let saved = store.insert(Collection::Courses, doc(json!({"title": "Old"}))).await.unwrap();
        let id = saved["id"].as_str().unwrap().to_string();
        let updated = store
            .update(Collection::Courses, &id, doc(json!({"id": "other", "created_at": "x", "title": "New"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["id"], json!(id));
        assert_eq!(updated["created_at"], saved["created_at"]);
        assert_eq!(updated["title"], "New");
    }

    #[tokio::test]
    async fn find_filters_sorts_and_slices() {
        let store = MemoryStore::new();
        for (title, weeks) in [("c", 3), ("a", 1), ("b", 2), ("d", 4)] {
            store.insert(Collection::Courses, doc(json!({"title": title, "weeks": weeks}))).await.unwrap();
        }
        let filter = vec![Condition {
            field: "weeks".into(),
            comparison: crate::filter::Comparison::Gte("2".into()),
        }];
        let sort = FilterOrder::parse("title");
        let docs = store
            .find(Collection::Courses, FindOptions { filter: &filter, sort: &sort, skip: 1, limit: Some(1) })
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["title"], "c");
        assert_eq!(store.count(Collection::Courses, &filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn delete_many_removes_matching_documents_only() {
        let store = MemoryStore::new();
        for bootcamp in ["x", "x", "y"] {
            store.insert(Collection::Courses, doc(json!({"bootcamp": bootcamp}))).await.unwrap();
        }
        let removed = store.delete_many(Collection::Courses, &[Condition::eq("bootcamp", "x")]).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count(Collection::Courses, &[]).await.unwrap(), 1);
    }
}
