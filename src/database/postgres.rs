use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Row};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::store::{parse_id, sanitize_changes, Collection, Document, DocumentStore, FindOptions, StoreError};
use crate::config::DatabaseConfig;
use crate::filter::filter_where::FilterWhere;
use crate::filter::{Condition, Filter, SqlResult};

/// PostgreSQL-backed document store: one table per collection holding the
/// document as `jsonb`, with unique expression indexes per unique field.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;
        info!("Connected to database (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create collection tables and unique indexes if missing
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            let table = collection.table_name();
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS \"{table}\" (\
                 id uuid PRIMARY KEY, \
                 doc jsonb NOT NULL, \
                 created_at timestamptz NOT NULL DEFAULT now())"
            ))
            .execute(&self.pool)
            .await?;

            for field in collection.unique_fields() {
                sqlx::query(&format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS \"{table}_{field}_key\" ON \"{table}\" ((doc ->> '{field}'))"
                ))
                .execute(&self.pool)
                .await?;
            }
        }
        info!("Database schema ready");
        Ok(())
    }

    fn bind_all<'q>(
        mut q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
        params: &'q [String],
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        for p in params {
            q = q.bind(p);
        }
        q
    }

    fn statement(collection: Collection) -> Result<Filter, StoreError> {
        Ok(Filter::new(collection.table_name())?)
    }
}

/// Map unique violations to `Duplicate`, naming the field from the index
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let field = db_err
                .constraint()
                .and_then(|c| c.strip_suffix("_key"))
                .and_then(|c| c.split_once('_').map(|(_, f)| f.to_string()))
                .unwrap_or_else(|| "unknown".to_string());
            return StoreError::Duplicate { field };
        }
    }
    StoreError::Sqlx(err)
}

fn row_doc(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    match row.try_get::<Value, _>("doc")? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::QueryError(format!("unexpected document shape: {}", other))),
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, collection: Collection, options: FindOptions<'_>) -> Result<Vec<Document>, StoreError> {
        let mut filter = Self::statement(collection)?;
        filter.where_clause(options.filter).order(options.sort).limit(options.limit, options.skip);
        let SqlResult { query, params } = filter.to_sql()?;
        tracing::debug!("find: {}", query);

        let rows = Self::bind_all(sqlx::query(&query), &params).fetch_all(&self.pool).await?;
        rows.iter().map(row_doc).collect()
    }

    async fn count(&self, collection: Collection, filter: &[Condition]) -> Result<u64, StoreError> {
        let mut statement = Self::statement(collection)?;
        statement.where_clause(filter);
        let SqlResult { query, params } = statement.to_count_sql()?;

        let row = Self::bind_all(sqlx::query(&query), &params).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let uuid = parse_id(id)?;
        let query = format!("SELECT doc FROM \"{}\" WHERE id = $1", collection.table_name());
        let row = sqlx::query(&query).bind(uuid).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_doc).transpose()
    }

    async fn insert(&self, collection: Collection, mut doc: Document) -> Result<Document, StoreError> {
        let uuid = match doc.get("id").and_then(Value::as_str) {
            Some(id) => parse_id(id)?,
            None => Uuid::new_v4(),
        };
        doc.insert("id".into(), Value::String(uuid.to_string()));
        if !doc.contains_key("created_at") {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            doc.insert("created_at".into(), Value::String(now));
        }

        let query = format!(
            "INSERT INTO \"{}\" (id, doc) VALUES ($1, $2) RETURNING doc",
            collection.table_name()
        );
        let row = sqlx::query(&query)
            .bind(uuid)
            .bind(Json(Value::Object(doc)))
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        row_doc(&row)
    }

    async fn update(&self, collection: Collection, id: &str, changes: Document) -> Result<Option<Document>, StoreError> {
        let uuid = parse_id(id)?;
        let query = format!(
            "UPDATE \"{}\" SET doc = doc || $2 WHERE id = $1 RETURNING doc",
            collection.table_name()
        );
        let row = sqlx::query(&query)
            .bind(uuid)
            .bind(Json(Value::Object(sanitize_changes(changes))))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        row.as_ref().map(row_doc).transpose()
    }

    async fn update_matching(
        &self,
        collection: Collection,
        id: &str,
        filter: &[Condition],
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let uuid = parse_id(id)?;
        let (where_clause, params) = FilterWhere::generate(filter, 2)?;
        let query = format!(
            "UPDATE \"{}\" SET doc = doc || $2 WHERE id = $1 AND {} RETURNING doc",
            collection.table_name(),
            where_clause
        );
        let q = sqlx::query(&query).bind(uuid).bind(Json(Value::Object(sanitize_changes(changes))));
        let row = Self::bind_all(q, &params)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        row.as_ref().map(row_doc).transpose()
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let uuid = parse_id(id)?;
        let query = format!("DELETE FROM \"{}\" WHERE id = $1 RETURNING doc", collection.table_name());
        let row = sqlx::query(&query).bind(uuid).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_doc).transpose()
    }

    async fn delete_many(&self, collection: Collection, filter: &[Condition]) -> Result<u64, StoreError> {
        let mut statement = Self::statement(collection)?;
        statement.where_clause(filter);
        let SqlResult { query, params } = statement.to_delete_sql()?;
        let result = Self::bind_all(sqlx::query(&query), &params).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
