use async_trait::async_trait;
use lingocore::{
    error::BackendError,
    store::{
        ConnectorOption,
        KeyedStore,
        RangeQuery,
        ancestors,
        nest,
        split_leaf,
    },
};
use serde_json::Value;
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;

use crate::SqliteBackend;

/// Split a path into its parent and its last segment.
fn split_path(path: &str) -> (&str, &str) {
    path.trim_matches('/')
        .rsplit_once('/')
        .unwrap_or(("", path.trim_matches('/')))
}

/// The exclusive bounds of every path strictly below `path`; `0`
/// immediately follows `/` in byte order.
fn descendant_bounds(path: &str) -> (String, String) {
    let path = path.trim_matches('/');
    (format!("{path}/"), format!("{path}0"))
}

async fn insert_node(
    conn: &mut SqliteConnection,
    path: &str,
    value: &Value,
) -> Result<(), BackendError> {
    let (parent, key) = split_path(path);
    sqlx::query(r#"
INSERT INTO node ( path, parent, key, value )
VALUES ( ?1, ?2, ?3, ?4 )
ON CONFLICT(path) DO UPDATE SET value = excluded.value
    "#)
        .bind(path)
        .bind(parent)
        .bind(key)
        .bind(serde_json::to_string(value)?)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Replace the nearest ancestor of `path` stored as a single row with
/// rows for its remaining children.
async fn split_ancestor(
    conn: &mut SqliteConnection,
    path: &str,
) -> Result<(), BackendError> {
    for ancestor in ancestors(path) {
        let row = sqlx::query(r#"
SELECT value
FROM node
WHERE path = ?1
        "#)
            .bind(ancestor)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            continue;
        };
        let value: String = row.try_get("value")?;
        let value: Value = serde_json::from_str(&value)?;
        log::trace!("splitting {ancestor} to reach {path}");
        sqlx::query(r#"
DELETE FROM node
WHERE path = ?1
        "#)
            .bind(ancestor)
            .execute(&mut *conn)
            .await?;
        for (child, value) in split_leaf(ancestor, value, path) {
            insert_node(&mut *conn, &child, &value).await?;
        }
        break;
    }
    Ok(())
}

impl SqliteBackend {
    pub async fn connect(opts: ConnectorOption) -> Result<SqliteBackend, sqlx::Error> {
        if opts.auto_create_db && !Sqlite::database_exists(&opts.url).await.unwrap_or(false) {
            log::warn!("sqlite database {} does not exist; creating...", &opts.url);
            Sqlite::create_database(&opts.url).await?
        }

        let pool = SqlitePool::connect(&opts.url).await?;
        Ok(SqliteBackend {
            pool: Arc::new(pool),
            url: opts.url,
        })
    }

    pub async fn migrate(self) -> Result<Self, sqlx::Error> {
        sqlx::migrate!("./migrations").run(&*self.pool).await?;
        Ok(self)
    }

    pub fn url(&self) -> &str {
        self.url.as_ref()
    }
}

#[async_trait]
impl KeyedStore for SqliteBackend {
    async fn range_query(
        &self,
        query: &RangeQuery,
    ) -> Result<Vec<(String, Value)>, BackendError> {
        let limit = i64::try_from(query.limit)
            .map_err(|_| BackendError::AppInvariantViolation(format!(
                "range query limit {} out of bounds", query.limit
            )))?;
        let rows = sqlx::query(r#"
SELECT key, value
FROM node
WHERE parent = ?1 AND (?2 IS NULL OR key > ?2)
ORDER BY key
LIMIT ?3
        "#)
            .bind(query.collection.trim_matches('/'))
            .bind(query.start_after.as_deref())
            .bind(limit)
            .fetch_all(&*self.pool)
            .await?;
        log::trace!(
            "range query on {} after {:?} returned {} rows",
            query.collection,
            query.start_after,
            rows.len(),
        );
        rows.into_iter()
            .map(|row| -> Result<(String, Value), BackendError> {
                let key: String = row.try_get("key")?;
                let value: String = row.try_get("value")?;
                Ok((key, serde_json::from_str(&value)?))
            })
            .collect()
    }

    async fn get(
        &self,
        path: &str,
    ) -> Result<Option<Value>, BackendError> {
        let path = path.trim_matches('/');
        let row = sqlx::query(r#"
SELECT value
FROM node
WHERE path = ?1
        "#)
            .bind(path)
            .fetch_optional(&*self.pool)
            .await?;
        if let Some(row) = row {
            let value: String = row.try_get("value")?;
            return Ok(Some(serde_json::from_str(&value)?));
        }

        let (lower, upper) = descendant_bounds(path);
        let rows = sqlx::query(r#"
SELECT path, value
FROM node
WHERE path > ?1 AND path < ?2
ORDER BY path
        "#)
            .bind(&lower)
            .bind(&upper)
            .fetch_all(&*self.pool)
            .await?;
        let entries = rows.into_iter()
            .map(|row| -> Result<(String, Value), BackendError> {
                let full: String = row.try_get("path")?;
                let value: String = row.try_get("value")?;
                Ok((full[lower.len()..].to_string(), serde_json::from_str(&value)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nest(entries))
    }

    async fn write(
        &self,
        path: &str,
        value: Value,
    ) -> Result<(), BackendError> {
        let path = path.trim_matches('/');
        let (lower, upper) = descendant_bounds(path);

        let mut tx = self.pool.begin().await?;
        split_ancestor(&mut *tx, path).await?;
        sqlx::query(r#"
DELETE FROM node
WHERE path > ?1 AND path < ?2
        "#)
            .bind(&lower)
            .bind(&upper)
            .execute(&mut *tx)
            .await?;
        insert_node(&mut *tx, path, &value).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(
        &self,
        path: &str,
    ) -> Result<(), BackendError> {
        let path = path.trim_matches('/');
        let (lower, upper) = descendant_bounds(path);

        let mut tx = self.pool.begin().await?;
        split_ancestor(&mut *tx, path).await?;
        sqlx::query(r#"
DELETE FROM node
WHERE path = ?1 OR (path > ?2 AND path < ?3)
        "#)
            .bind(path)
            .bind(&lower)
            .bind(&upper)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
