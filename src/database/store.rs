use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{Condition, FilterError, SortField};

/// A stored record. Every document carries `id` (uuid) and `created_at`.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Bootcamps,
    Courses,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Bootcamps, Collection::Courses, Collection::Users];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Bootcamps => "bootcamps",
            Collection::Courses => "courses",
            Collection::Users => "users",
        }
    }

    /// Fields that must be unique across the collection
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Bootcamps => &["name"],
            Collection::Courses => &[],
            Collection::Users => &["email"],
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Duplicate value for unique field '{field}'")]
    Duplicate { field: String },

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Parameters of a multi-document read
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions<'a> {
    pub filter: &'a [Condition],
    pub sort: &'a [SortField],
    pub skip: u64,
    pub limit: Option<u64>,
}

impl<'a> FindOptions<'a> {
    pub fn filter(filter: &'a [Condition]) -> Self {
        Self { filter, ..Default::default() }
    }
}

pub fn parse_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

/// Data layer seen by handlers and the paginated executor
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, options: FindOptions<'_>) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: Collection, filter: &[Condition]) -> Result<u64, StoreError>;

    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Assigns `id` and `created_at` when absent.
    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, StoreError>;

    /// Shallow-merges `changes` into the stored document. `id` and
    /// `created_at` are never overwritten.
    async fn update(&self, collection: Collection, id: &str, changes: Document) -> Result<Option<Document>, StoreError>;

    /// Like `update`, but only while the stored document still matches
    /// `filter`; the check and the write are one atomic step. `None` when
    /// the document is missing or no longer matches.
    async fn update_matching(
        &self,
        collection: Collection,
        id: &str,
        filter: &[Condition],
        changes: Document,
    ) -> Result<Option<Document>, StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    async fn delete_many(&self, collection: Collection, filter: &[Condition]) -> Result<u64, StoreError>;

    async fn find_one(&self, collection: Collection, filter: &[Condition]) -> Result<Option<Document>, StoreError> {
        let options = FindOptions { filter, limit: Some(1), ..Default::default() };
        Ok(self.find(collection, options).await?.into_iter().next())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Strip immutable keys from an update payload
pub(crate) fn sanitize_changes(mut changes: Document) -> Document {
    changes.remove("id");
    changes.remove("created_at");
    changes
}
