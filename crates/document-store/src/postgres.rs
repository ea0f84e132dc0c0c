use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Document, DocumentQuery, Result, StoreError, Version,
    store::{DocumentStore, PutOptions, validate_document_for_put},
};

/// PostgreSQL-backed document store implementation.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            collection: row.try_get("collection")?,
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }

    async fn current_version(&self, collection: &str, id: &str) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(version.map(Version::new).unwrap_or(Version::initial()))
    }

    async fn conflict(&self, document: &Document, expected: Version) -> StoreError {
        match self.current_version(&document.collection, &document.id).await {
            Ok(actual) => StoreError::ConcurrencyConflict {
                collection: document.collection.clone(),
                id: document.id.clone(),
                expected,
                actual,
            },
            Err(e) => e,
        }
    }

    /// Appends the WHERE clause shared by `query` and `count`, returning the
    /// number of bound parameters.
    fn push_filters(sql: &mut String, query: &DocumentQuery) -> usize {
        let mut param_count = 1;
        sql.push_str(" WHERE collection = $1");

        if query.owner.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND owner = ${param_count}"));
        }
        if query.field.is_some() {
            sql.push_str(&format!(
                " AND body ->> ${} = ${}",
                param_count + 1,
                param_count + 2
            ));
            param_count += 2;
        }
        param_count
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT collection, id, owner, version, created_at, updated_at, body
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn put(&self, document: Document, options: PutOptions) -> Result<Version> {
        validate_document_for_put(&document)?;
        let now = Utc::now();

        match options.expected_version {
            Some(expected) if expected == Version::initial() => {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, owner, version, created_at, updated_at, body)
                    VALUES ($1, $2, $3, 1, $4, $4, $5)
                    ON CONFLICT (collection, id) DO NOTHING
                    "#,
                )
                .bind(&document.collection)
                .bind(&document.id)
                .bind(&document.owner)
                .bind(now)
                .bind(&document.body)
                .execute(&self.pool)
                .await?;

                if inserted.rows_affected() == 0 {
                    return Err(self.conflict(&document, expected).await);
                }
                Ok(Version::first())
            }
            Some(expected) => {
                let updated = sqlx::query(
                    r#"
                    UPDATE documents
                    SET owner = $3, version = version + 1, updated_at = $4, body = $5
                    WHERE collection = $1 AND id = $2 AND version = $6
                    "#,
                )
                .bind(&document.collection)
                .bind(&document.id)
                .bind(&document.owner)
                .bind(now)
                .bind(&document.body)
                .bind(expected.as_i64())
                .execute(&self.pool)
                .await?;

                if updated.rows_affected() == 0 {
                    return Err(self.conflict(&document, expected).await);
                }
                Ok(expected.next())
            }
            None => {
                let version: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO documents (collection, id, owner, version, created_at, updated_at, body)
                    VALUES ($1, $2, $3, 1, $4, $4, $5)
                    ON CONFLICT (collection, id) DO UPDATE SET
                        owner = EXCLUDED.owner,
                        version = documents.version + 1,
                        updated_at = EXCLUDED.updated_at,
                        body = EXCLUDED.body
                    RETURNING version
                    "#,
                )
                .bind(&document.collection)
                .bind(&document.id)
                .bind(&document.owner)
                .bind(now)
                .bind(&document.body)
                .fetch_one(&self.pool)
                .await?;

                Ok(Version::new(version))
            }
        }
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let mut sql = String::from(
            "SELECT collection, id, owner, version, created_at, updated_at, body FROM documents",
        );
        let mut param_count = Self::push_filters(&mut sql, &query);

        sql.push_str(" ORDER BY seq ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql).bind(&query.collection);

        if let Some(ref owner) = query.owner {
            sqlx_query = sqlx_query.bind(owner);
        }
        if let Some((ref name, ref value)) = query.field {
            sqlx_query = sqlx_query.bind(name).bind(value);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM documents");
        Self::push_filters(&mut sql, &query);

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&sql).bind(&query.collection);

        if let Some(ref owner) = query.owner {
            sqlx_query = sqlx_query.bind(owner);
        }
        if let Some((ref name, ref value)) = query.field {
            sqlx_query = sqlx_query.bind(name).bind(value);
        }

        let count = sqlx_query.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}
